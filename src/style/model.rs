//! Style model: named property bundles and references to them.

use std::fmt;

use crate::markup::ElementKind;

/// A named bundle of raw property values.
///
/// Values stay as text until resolution: the same style may be applied to
/// elements of different kinds, and each kind types its own properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub name: String,
    /// Kind named by the declaring tag (`LabelStyle` → Label).
    pub kind: ElementKind,
    /// Styles applied before this one, in order.
    pub extends: Vec<String>,
    /// Raw `(property, value)` pairs in declaration order.
    pub properties: Vec<(String, String)>,
}

impl Style {
    /// Create an empty style.
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            extends: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Builder: add a raw property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// Builder: extend another style.
    pub fn extending(mut self, name: impl Into<String>) -> Self {
        self.extends.push(name.into());
        self
    }
}

/// Styles loaded from one shared stylesheet document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleGroup {
    pub name: String,
    pub styles: Vec<Style>,
}

impl StyleGroup {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            styles: Vec::new(),
        }
    }

    /// Find a style by name.
    pub fn get(&self, name: &str) -> Option<&Style> {
        self.styles.iter().find(|s| s.name == name)
    }
}

/// A reference from an element's `style` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleReference {
    /// `Group:name`, a style in a shared group.
    Shared { group: String, name: String },
    /// `name`, a style declared in the document (or any shared group).
    Local(String),
}

impl StyleReference {
    /// Parse one reference.
    pub fn parse(text: &str) -> StyleReference {
        match text.split_once(':') {
            Some((group, name)) => StyleReference::Shared {
                group: group.trim().to_string(),
                name: name.trim().to_string(),
            },
            None => StyleReference::Local(text.trim().to_string()),
        }
    }

    /// Parse a `style` attribute: references separated by commas or spaces.
    pub fn parse_list(text: &str) -> Vec<StyleReference> {
        text.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(StyleReference::parse)
            .collect()
    }

    /// The referenced style's name, without the group.
    pub fn name(&self) -> &str {
        match self {
            StyleReference::Shared { name, .. } | StyleReference::Local(name) => name,
        }
    }
}

impl fmt::Display for StyleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleReference::Shared { group, name } => write!(f, "{group}:{name}"),
            StyleReference::Local(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_references() {
        assert_eq!(
            StyleReference::parse_list("Theme:title, accent  big"),
            vec![
                StyleReference::Shared {
                    group: "Theme".into(),
                    name: "title".into()
                },
                StyleReference::Local("accent".into()),
                StyleReference::Local("big".into()),
            ]
        );
    }

    #[test]
    fn display_round_trips() {
        for text in ["Theme:title", "accent"] {
            assert_eq!(StyleReference::parse(text).to_string(), text);
        }
    }

    #[test]
    fn group_lookup() {
        let mut group = StyleGroup::new("Theme");
        group
            .styles
            .push(Style::new("title", ElementKind::Label).with_property("font", ":bold@20"));
        assert!(group.get("title").is_some());
        assert!(group.get("body").is_none());
    }
}
