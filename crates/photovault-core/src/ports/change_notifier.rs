//! Change notifier port (driven/secondary port)
//!
//! Passively informs the client that new assets appeared in the library.
//!
//! ## Design Notes
//!
//! - The sink is a synchronous callback because OS watchers deliver events
//!   on their own threads. It must not block.
//! - Delivery is off the engine's main sequence; the consumer is expected to
//!   queue changes and handle them one batch at a time.

use std::sync::Arc;

use crate::domain::{errors::PhotoResult, newtypes::LocalAssetId};

/// A batch of newly added assets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryChange {
    pub added: Vec<LocalAssetId>,
}

impl LibraryChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

/// Callback receiving library changes
pub type ChangeSink = Arc<dyn Fn(LibraryChange) + Send + Sync>;

/// Port trait for library change notifications
pub trait IChangeNotifier: Send + Sync {
    /// Starts delivering changes to `sink`, replacing any previous sink
    fn start(&self, sink: ChangeSink) -> PhotoResult<()>;

    /// Stops delivery; further changes are dropped
    fn stop(&self);
}
