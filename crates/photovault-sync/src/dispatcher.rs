//! Change dispatcher - feeds library change notifications into the engine
//!
//! The [`ChangeDispatcher`] sits between an
//! [`IChangeNotifier`](photovault_core::ports::IChangeNotifier) and the
//! [`SyncEngine`]. Notifications arrive on OS threads through a
//! non-blocking sink; the dispatcher handles them one batch at a time on
//! the async side.
//!
//! ## Flow
//!
//! ```text
//! notifier ──→ ChangeSink ──→ mpsc ──→ ChangeDispatcher ──→ SyncEngine
//!                                          │
//!                               coalesce queued changes
//! ```
//!
//! Changes that queue up while the engine is busy are merged into a single
//! batch before the next call.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use photovault_core::ports::{ChangeSink, LibraryChange};

use crate::engine::SyncEngine;

/// Serializes library changes into targeted engine passes
pub struct ChangeDispatcher {
    engine: Arc<SyncEngine>,
    change_rx: mpsc::UnboundedReceiver<LibraryChange>,
    shutdown: CancellationToken,
}

impl ChangeDispatcher {
    /// Creates the dispatcher and the sink to hand to a notifier
    pub fn new(engine: Arc<SyncEngine>, shutdown: CancellationToken) -> (Self, ChangeSink) {
        let (tx, change_rx) = mpsc::unbounded_channel::<LibraryChange>();
        let sink: ChangeSink = Arc::new(move |change: LibraryChange| {
            if change.is_empty() {
                return;
            }
            if tx.send(change).is_err() {
                debug!("Change dispatcher stopped, dropping notification");
            }
        });

        (
            Self {
                engine,
                change_rx,
                shutdown,
            },
            sink,
        )
    }

    /// Main loop; returns the number of batches handed to the engine
    ///
    /// Ends when the shutdown token fires or every sink has been dropped.
    pub async fn run(mut self) -> usize {
        info!("Change dispatcher starting");
        let mut batches = 0;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, change dispatcher stopping");
                    break;
                }
                change = self.change_rx.recv() => {
                    let Some(first) = change else {
                        info!("Change channel closed, dispatcher shutting down");
                        break;
                    };

                    let batch = self.coalesce(first);
                    debug!(added = batch.added.len(), "Dispatching library change");
                    batches += 1;
                    if let Some(summary) = self.engine.handle_library_change(batch).await {
                        info!(
                            uploaded = summary.uploaded,
                            failed = summary.failed,
                            "Library change handled"
                        );
                    }
                }
            }
        }

        batches
    }

    /// Merges `first` with everything already queued, keeping first-seen order
    fn coalesce(&mut self, first: LibraryChange) -> LibraryChange {
        let mut seen = HashSet::new();
        let mut added = Vec::new();

        let queued = std::iter::from_fn(|| self.change_rx.try_recv().ok());
        for change in std::iter::once(first).chain(queued) {
            for id in change.added {
                if seen.insert(id.clone()) {
                    added.push(id);
                }
            }
        }

        LibraryChange { added }
    }
}
