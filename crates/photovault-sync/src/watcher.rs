//! Folder change notifier
//!
//! Wraps the `notify` crate to report image files newly added under the
//! library root as [`LibraryChange`] batches.
//!
//! ## Architecture
//!
//! ```text
//! inotify / FSEvents / kqueue
//!       │
//!       ▼
//!  notify callback ──→ mpsc::channel ──→ debounce task ──→ ChangeSink
//! ```
//!
//! Creations and rename targets join the pending batch; data writes to a
//! pending file restart the quiet period. A batch is emitted only once the
//! quiet period passes with every pending file's size and mtime unchanged,
//! so a file that is still being copied in is not reported early.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use photovault_core::domain::{PhotoError, PhotoResult};
use photovault_core::ports::{ChangeSink, IChangeNotifier, LibraryChange};

use crate::library::{asset_id_for, image_mime_type};
use crate::SyncError;

/// Watcher and debounce task of a running notifier
struct ActiveWatch {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

/// Change notifier for a [`FolderPhotoLibrary`](crate::library::FolderPhotoLibrary) root
pub struct FolderChangeNotifier {
    root: PathBuf,
    debounce: Duration,
    active: Mutex<Option<ActiveWatch>>,
}

impl FolderChangeNotifier {
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            root: root.into(),
            debounce,
            active: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn spawn_watch(&self, sink: ChangeSink) -> Result<ActiveWatch, SyncError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::Watch(format!("no tokio runtime: {e}")))?;

        // notify reports canonical paths; strip against the same form
        let root = std::fs::canonicalize(&self.root)?;
        let (signal_tx, signal_rx) = mpsc::channel::<WatchSignal>(1024);

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let signals = added_paths(&event)
                        .into_iter()
                        .map(WatchSignal::Added)
                        .chain(written_paths(&event).into_iter().map(WatchSignal::Written));
                    for signal in signals {
                        if let Err(e) = signal_tx.blocking_send(signal) {
                            warn!(error = %e, "Failed to queue watch event (receiver dropped)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "Library watcher error");
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| SyncError::Watch(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| SyncError::Watch(format!("{}: {}", root.display(), e)))?;

        let task = runtime.spawn(debounce_loop(root, signal_rx, self.debounce, sink));

        Ok(ActiveWatch {
            _watcher: watcher,
            task,
        })
    }
}

impl IChangeNotifier for FolderChangeNotifier {
    fn start(&self, sink: ChangeSink) -> PhotoResult<()> {
        let watch = self.spawn_watch(sink).map_err(PhotoError::from)?;

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.replace(watch) {
            previous.task.abort();
        }

        info!(
            root = %self.root.display(),
            debounce_ms = self.debounce.as_millis() as u64,
            "Library change notifier started"
        );
        Ok(())
    }

    fn stop(&self) {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watch) = previous {
            watch.task.abort();
            info!(root = %self.root.display(), "Library change notifier stopped");
        }
    }
}

impl Drop for FolderChangeNotifier {
    fn drop(&mut self) {
        self.stop();
    }
}

/// What the notify callback forwards to the debounce task
#[derive(Debug)]
enum WatchSignal {
    /// A path that may be a new image file
    Added(PathBuf),
    /// Content of a path was written
    Written(PathBuf),
}

/// Paths that may be new image files
///
/// Creations and rename targets count; edits and deletions do not.
fn added_paths(event: &notify::Event) -> Vec<PathBuf> {
    let candidates: &[PathBuf] = match &event.kind {
        EventKind::Create(CreateKind::Folder) => &[],
        EventKind::Create(_) => &event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => &event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1..).unwrap_or_default()
        }
        _ => &[],
    };

    candidates
        .iter()
        .filter(|p| image_mime_type(p).is_some())
        .cloned()
        .collect()
}

/// Image paths whose content was written
fn written_paths(event: &notify::Event) -> Vec<PathBuf> {
    match &event.kind {
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Access(AccessKind::Close(AccessMode::Write)) => event
            .paths
            .iter()
            .filter(|p| image_mime_type(p).is_some())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

/// Size and mtime of a file, `None` while it cannot be read
type FileStamp = Option<(u64, SystemTime)>;

fn stamp(path: &Path) -> FileStamp {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.len(), meta.modified().ok()?))
}

/// Pending paths with the stamp seen when each was last signalled
#[derive(Default)]
struct PendingBatch {
    paths: BTreeMap<PathBuf, FileStamp>,
}

impl PendingBatch {
    fn note(&mut self, signal: WatchSignal) {
        match signal {
            WatchSignal::Added(path) => {
                let current = stamp(&path);
                self.paths.insert(path, current);
            }
            // Writes to files outside the batch are edits, not additions
            WatchSignal::Written(path) => {
                if let Some(seen) = self.paths.get_mut(&path) {
                    *seen = stamp(&path);
                }
            }
        }
    }

    /// True when no pending file changed since it was last looked at
    ///
    /// Refreshes the stamps of files that did change.
    fn settle(&mut self) -> bool {
        let mut settled = true;
        for (path, seen) in self.paths.iter_mut() {
            let current = stamp(path);
            if current != *seen {
                *seen = current;
                settled = false;
            }
        }
        settled
    }

    fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Collects added paths until `debounce` passes with no event and no pending
/// file changing on disk, then emits them as one change
async fn debounce_loop(
    root: PathBuf,
    mut signal_rx: mpsc::Receiver<WatchSignal>,
    debounce: Duration,
    sink: ChangeSink,
) {
    while let Some(first) = signal_rx.recv().await {
        let mut batch = PendingBatch::default();
        batch.note(first);
        if batch.is_empty() {
            continue;
        }

        loop {
            match tokio::time::timeout(debounce, signal_rx.recv()).await {
                Ok(Some(signal)) => batch.note(signal),
                Err(_) => {
                    if batch.settle() {
                        break;
                    }
                    debug!("Pending file still changing, extending quiet period");
                }
                // Watcher is gone
                Ok(None) => break,
            }
        }

        let change = to_change(&root, &batch);
        if change.is_empty() {
            continue;
        }
        debug!(added = change.added.len(), "Emitting library change");
        sink(change);
    }
}

fn to_change(root: &Path, batch: &PendingBatch) -> LibraryChange {
    LibraryChange {
        added: batch
            .paths
            .keys()
            .filter(|p| p.is_file())
            .filter_map(|p| asset_id_for(root, p))
            .collect(),
    }
}
