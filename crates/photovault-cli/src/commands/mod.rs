pub mod config;
pub mod history;
pub mod photos;
pub mod status;
pub mod sync;
pub mod watch;
