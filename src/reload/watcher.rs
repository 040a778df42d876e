//! Polling file watcher.
//!
//! Each [`FileWatcher`] is a tokio task that polls one file's metadata on an
//! interval and sends [`ReloadEvent::Changed`] when it differs from the last
//! observation. Dropping the watcher aborts the task.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// A change notification for one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReloadEvent {
    Changed(PathBuf),
}

impl ReloadEvent {
    pub fn path(&self) -> &Path {
        match self {
            ReloadEvent::Changed(path) => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot watch {}: no tokio runtime is running", path.display())]
    NoRuntime { path: PathBuf },
}

// ---------------------------------------------------------------------------
// ChangeDetector
// ---------------------------------------------------------------------------

/// What a poll observed about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileStamp {
    /// Stamp of the file at `path`, `None` if it can't be read.
    pub async fn read(path: &Path) -> Option<FileStamp> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        Some(FileStamp {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

/// Compares successive observations of one file.
///
/// The first observation is the baseline and never reports a change. A file
/// appearing or disappearing counts as a change.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Option<Option<FileStamp>>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation; `true` if it differs from the previous one.
    pub fn observe(&mut self, stamp: Option<FileStamp>) -> bool {
        let changed = self.last.is_some_and(|last| last != stamp);
        self.last = Some(stamp);
        changed
    }
}

// ---------------------------------------------------------------------------
// FileWatcher
// ---------------------------------------------------------------------------

/// A running poll task for one file.
#[derive(Debug)]
pub struct FileWatcher {
    path: PathBuf,
    task: JoinHandle<()>,
}

impl FileWatcher {
    /// Start polling `path` every `interval` on the current tokio runtime.
    pub fn spawn(
        path: impl Into<PathBuf>,
        interval: Duration,
        sender: UnboundedSender<ReloadEvent>,
    ) -> Result<Self, WatchError> {
        let path = path.into();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return Err(WatchError::NoRuntime { path });
        };
        let watched = path.clone();
        let task = runtime.spawn(async move {
            let mut detector = ChangeDetector::new();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let stamp = FileStamp::read(&watched).await;
                if detector.observe(stamp) {
                    debug!(path = %watched.display(), "file changed");
                    if sender.send(ReloadEvent::Changed(watched.clone())).is_err() {
                        break;
                    }
                }
            }
        });
        debug!(path = %path.display(), ?interval, "watching");
        Ok(Self { path, task })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the poll task has exited (receiver gone or aborted).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling. The task is aborted and the channel sender it holds is
    /// dropped.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn stamp(len: u64) -> Option<FileStamp> {
        Some(FileStamp {
            modified: None,
            len,
        })
    }

    // ── ChangeDetector ───────────────────────────────────────────────

    #[test]
    fn first_observation_is_baseline() {
        let mut detector = ChangeDetector::new();
        assert!(!detector.observe(stamp(3)));
        assert!(!detector.observe(stamp(3)));
        assert!(detector.observe(stamp(4)));
        assert!(!detector.observe(stamp(4)));
    }

    #[test]
    fn appearing_and_disappearing_are_changes() {
        let mut detector = ChangeDetector::new();
        assert!(!detector.observe(None));
        assert!(detector.observe(stamp(1)));
        assert!(detector.observe(None));
    }

    // ── FileStamp ────────────────────────────────────────────────────

    #[test]
    fn stamp_tracks_length() {
        let path = std::env::temp_dir().join(format!("live-layout-stamp-{}.ui.xml", std::process::id()));
        std::fs::write(&path, "abcd").unwrap();
        let stamp = tokio_test::block_on(FileStamp::read(&path)).unwrap();
        assert_eq!(stamp.len, 4);
        let _ = std::fs::remove_file(&path);

        assert_eq!(tokio_test::block_on(FileStamp::read(Path::new("missing.ui.xml"))), None);
    }

    // ── FileWatcher ──────────────────────────────────────────────────

    #[test]
    fn spawn_needs_runtime() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = FileWatcher::spawn("x.ui.xml", Duration::from_millis(5), tx).unwrap_err();
        assert!(err.to_string().contains("no tokio runtime"));
    }

    #[tokio::test]
    async fn reports_modifications() {
        let path = std::env::temp_dir().join(format!("live-layout-watch-{}.ui.xml", std::process::id()));
        std::fs::write(&path, "a").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = FileWatcher::spawn(&path, Duration::from_millis(5), tx).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        std::fs::write(&path, "abc").unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, ReloadEvent::Changed(path.clone()));
        assert_eq!(event.path(), path.as_path());

        watcher.stop();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn stopping_closes_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = FileWatcher::spawn("missing.ui.xml", Duration::from_millis(5), tx).unwrap();
        watcher.stop();
        let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(closed, None);
    }

    #[tokio::test]
    async fn dropping_closes_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = FileWatcher::spawn("missing.ui.xml", Duration::from_millis(5), tx).unwrap();
        drop(watcher);
        let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(closed, None);
    }
}
