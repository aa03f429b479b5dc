//! Integration tests for photovault-client
//!
//! Uses wiremock to stand in for the PhotoVault server and verifies
//! request shapes, response decoding and status-to-error mapping.

mod common;

mod test_photos;
mod test_reachability;
mod test_upload;
