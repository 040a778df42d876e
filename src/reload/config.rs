//! Reload configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the [`ReloadManager`](super::ReloadManager).
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadConfig {
    /// How often watched files are polled for changes.
    pub poll_interval: Duration,
    /// Suffix of component documents.
    pub extension: String,
    /// Shared style group documents loaded on start.
    pub shared_style_paths: Vec<PathBuf>,
    /// Directory scanned for documents on start.
    pub discovery_root: Option<PathBuf>,
    /// Types already compiled into the host; discovery skips them.
    pub compiled_types: BTreeSet<String>,
    /// Spawn file watchers. Without them changes are only picked up through
    /// queued events.
    pub watch_files: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            extension: ".ui.xml".to_string(),
            shared_style_paths: Vec::new(),
            discovery_root: None,
            compiled_types: BTreeSet::new(),
            watch_files: true,
        }
    }
}

impl ReloadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Add a shared style group document (builder).
    pub fn with_shared_styles(mut self, path: impl Into<PathBuf>) -> Self {
        self.shared_style_paths.push(path.into());
        self
    }

    pub fn with_discovery_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.discovery_root = Some(root.into());
        self
    }

    /// Mark a type as compiled into the host (builder).
    pub fn with_compiled_type(mut self, type_name: impl Into<String>) -> Self {
        self.compiled_types.insert(type_name.into());
        self
    }

    pub fn with_watch_files(mut self, watch: bool) -> Self {
        self.watch_files = watch;
        self
    }

    /// Whether `path` names a component document.
    pub fn is_document(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.extension) && name.len() > self.extension.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ReloadConfig::new();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.extension, ".ui.xml");
        assert!(config.shared_style_paths.is_empty());
        assert!(config.discovery_root.is_none());
        assert!(config.watch_files);
    }

    #[test]
    fn builder() {
        let config = ReloadConfig::new()
            .with_poll_interval(Duration::from_millis(10))
            .with_extension(".layout.xml")
            .with_shared_styles("styles/theme.xml")
            .with_discovery_root("ui")
            .with_compiled_type("Header")
            .with_watch_files(false);
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.shared_style_paths, vec![PathBuf::from("styles/theme.xml")]);
        assert_eq!(config.discovery_root, Some(PathBuf::from("ui")));
        assert!(config.compiled_types.contains("Header"));
        assert!(!config.watch_files);
        assert!(config.is_document(Path::new("ui/card.layout.xml")));
    }

    #[test]
    fn document_names() {
        let config = ReloadConfig::new();
        assert!(config.is_document(Path::new("screens/Profile.ui.xml")));
        assert!(!config.is_document(Path::new("screens/Profile.xml")));
        assert!(!config.is_document(Path::new(".ui.xml")));
    }
}
