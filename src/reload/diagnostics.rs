//! Per-document error state for the reload overlay.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

/// The latest error for each document that failed to reload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: BTreeMap<PathBuf, String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the error for `path`.
    pub fn record(&mut self, path: impl Into<PathBuf>, error: impl fmt::Display) {
        self.entries.insert(path.into(), error.to_string());
    }

    /// Clear the entry for `path`. Returns `true` if there was one.
    pub fn clear(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.entries
            .iter()
            .map(|(path, message)| (path.as_path(), message.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries sorted by path, one block per document. Empty when there
    /// are no errors.
    pub fn overlay(&self) -> String {
        let mut out = String::new();
        for (path, message) in &self.entries {
            let _ = writeln!(out, "{}", path.display());
            for line in message.lines() {
                let _ = writeln!(out, "  {line}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_clear() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("a.ui.xml", "first");
        diagnostics.record("a.ui.xml", "second");
        diagnostics.record("b.ui.xml", "other");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.get(Path::new("a.ui.xml")), Some("second"));

        assert!(diagnostics.clear(Path::new("a.ui.xml")));
        assert!(!diagnostics.clear(Path::new("a.ui.xml")));
        assert_eq!(diagnostics.get(Path::new("b.ui.xml")), Some("other"));
    }

    #[test]
    fn overlay_is_sorted_by_path() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("screens/z.ui.xml", "unknown element <Foo>");
        diagnostics.record("screens/a.ui.xml", "bad\nthings");
        insta::assert_snapshot!(diagnostics.overlay().trim_end(), @r"
        screens/a.ui.xml
          bad
          things
        screens/z.ui.xml
          unknown element <Foo>
        ");
    }

    #[test]
    fn empty_overlay() {
        assert_eq!(Diagnostics::new().overlay(), "");
    }
}
