//! Loaded definitions keyed by type name, with change generations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::live::DefinitionLookup;
use crate::markup::ComponentDefinition;

/// One loaded definition.
#[derive(Debug, Clone)]
pub struct DefinitionEntry {
    pub definition: ComponentDefinition,
    /// Document the definition was read from.
    pub path: PathBuf,
    pub loaded_at: Instant,
    /// Bumped on every store and on every shared style change, together
    /// with `loaded_at`.
    pub generation: u64,
}

/// Every definition currently known to the reload manager.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    entries: HashMap<String, DefinitionEntry>,
    next_generation: u64,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Store (or replace) a definition. Returns its new generation.
    pub fn insert(&mut self, definition: ComponentDefinition, path: impl Into<PathBuf>) -> u64 {
        let generation = self.bump();
        self.entries.insert(
            definition.type_name.clone(),
            DefinitionEntry {
                definition,
                path: path.into(),
                loaded_at: Instant::now(),
                generation,
            },
        );
        generation
    }

    /// Store a document's definition and every definition nested in it,
    /// replacing whatever that path provided before. Returns the stored
    /// type names, outermost first.
    pub fn insert_document(&mut self, definition: &ComponentDefinition, path: &Path) -> Vec<String> {
        self.remove_path(path);
        definition
            .component_definitions()
            .into_iter()
            .map(|nested| {
                self.insert(nested.clone(), path);
                nested.type_name.clone()
            })
            .collect()
    }

    pub fn get(&self, type_name: &str) -> Option<&DefinitionEntry> {
        self.entries.get(type_name)
    }

    pub fn generation(&self, type_name: &str) -> Option<u64> {
        self.entries.get(type_name).map(|entry| entry.generation)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Give every entry a new generation and load time, as after a shared
    /// style change.
    pub fn bump_all(&mut self) {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort_unstable();
        let now = Instant::now();
        for name in names {
            let generation = self.bump();
            if let Some(entry) = self.entries.get_mut(&name) {
                entry.generation = generation;
                entry.loaded_at = now;
            }
        }
    }

    /// Drop every entry loaded from `path`. Returns the removed type names,
    /// sorted.
    pub fn remove_path(&mut self, path: &Path) -> Vec<String> {
        let mut removed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.path == path)
            .map(|(name, _)| name.clone())
            .collect();
        removed.sort_unstable();
        for name in &removed {
            self.entries.remove(name);
        }
        removed
    }

    /// Generation of `type_name` and of every type it references, directly
    /// or through other definitions. Types not loaded yet map to `None`.
    pub fn dependencies(&self, type_name: &str) -> HashMap<String, Option<u64>> {
        let mut out = HashMap::new();
        let mut pending = vec![type_name.to_string()];
        while let Some(name) = pending.pop() {
            if out.contains_key(&name) {
                continue;
            }
            let entry = self.entries.get(&name);
            if let Some(entry) = entry {
                pending.extend(entry.definition.component_types());
            }
            out.insert(name, entry.map(|entry| entry.generation));
        }
        out
    }

    /// Known type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DefinitionLookup for DefinitionRegistry {
    fn definition(&self, type_name: &str) -> Option<&ComponentDefinition> {
        self.entries.get(type_name).map(|entry| &entry.definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_definition;

    const SCREEN: &str = r#"
<Component type="Screen">
    <Component field="card" type="Card"><Label field="title"/></Component>
    <Component field="footer"><Label field="title"/></Component>
</Component>"#;

    #[test]
    fn documents_store_nested_definitions() {
        let mut registry = DefinitionRegistry::new();
        let def = parse_definition(SCREEN).unwrap();
        let stored = registry.insert_document(&def, Path::new("screen.ui.xml"));
        assert_eq!(stored, ["Screen", "Card", "Screen_footer"]);
        assert_eq!(registry.type_names(), ["Card", "Screen", "Screen_footer"]);
        assert_eq!(
            registry.definition("Card").unwrap().children[0].name(),
            "title"
        );
        assert_eq!(registry.get("Card").unwrap().path, PathBuf::from("screen.ui.xml"));
    }

    #[test]
    fn generations_advance() {
        let mut registry = DefinitionRegistry::new();
        let def = parse_definition(SCREEN).unwrap();
        registry.insert_document(&def, Path::new("screen.ui.xml"));
        let before = registry.generation("Screen").unwrap();

        registry.insert_document(&def, Path::new("screen.ui.xml"));
        let reloaded = registry.generation("Screen").unwrap();
        assert!(reloaded > before);

        registry.bump_all();
        assert!(registry.generation("Screen").unwrap() > reloaded);
        assert!(registry.generation("Card").unwrap() > reloaded);
    }

    #[test]
    fn style_invalidation_refreshes_load_time() {
        let mut registry = DefinitionRegistry::new();
        registry.insert(ComponentDefinition::new("A"), "a.ui.xml");
        let loaded = registry.get("A").unwrap().loaded_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.bump_all();
        assert!(registry.get("A").unwrap().loaded_at > loaded);
    }

    #[test]
    fn dependencies_follow_references() {
        let mut registry = DefinitionRegistry::new();
        let screen = parse_definition(SCREEN).unwrap();
        registry.insert_document(&screen, Path::new("screen.ui.xml"));
        let badge = parse_definition(r#"<Component type="Badge"/>"#).unwrap();
        registry.insert_document(&badge, Path::new("badge.ui.xml"));

        let mut names: Vec<String> = registry.dependencies("Screen").into_keys().collect();
        names.sort();
        assert_eq!(names, ["Card", "Screen", "Screen_footer"]);
        assert_eq!(
            registry.dependencies("Card")["Card"],
            registry.generation("Card")
        );

        let missing = registry.dependencies("Missing");
        assert_eq!(missing.len(), 1);
        assert_eq!(missing["Missing"], None);
    }

    #[test]
    fn remove_by_path() {
        let mut registry = DefinitionRegistry::new();
        registry.insert(ComponentDefinition::new("A"), "a.ui.xml");
        registry.insert(ComponentDefinition::new("B"), "b.ui.xml");
        assert_eq!(registry.remove_path(Path::new("a.ui.xml")), ["A"]);
        assert!(!registry.contains("A"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reloading_drops_vanished_types() {
        let mut registry = DefinitionRegistry::new();
        let def = parse_definition(SCREEN).unwrap();
        registry.insert_document(&def, Path::new("screen.ui.xml"));
        let smaller = parse_definition(r#"<Component type="Screen"/>"#).unwrap();
        registry.insert_document(&smaller, Path::new("screen.ui.xml"));
        assert_eq!(registry.type_names(), ["Screen"]);
    }
}
