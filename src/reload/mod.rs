//! Live reload: file watching, definition caching, and re-application.

pub mod config;
pub mod diagnostics;
pub mod manager;
pub mod registry;
pub mod watcher;

pub use config::ReloadConfig;
pub use diagnostics::Diagnostics;
pub use manager::{ReloadError, ReloadManager, ReloadOutcome, RootId};
pub use registry::{DefinitionEntry, DefinitionRegistry};
pub use watcher::{ChangeDetector, FileStamp, FileWatcher, ReloadEvent, WatchError};
