//! Style cascade: shared styles → local styles → inline properties.
//!
//! For one element the resolver applies, in order:
//!
//! 1. styles referenced as `Group:name` from the shared groups,
//! 2. styles referenced by plain name, looked up in the document's local
//!    styles first and the shared groups second,
//! 3. the element's own inline properties.
//!
//! Each referenced style applies its `extend` chain before itself. Later
//! sources override identical keys. Only names in the element kind's
//! catalogue are eligible; everything else lands in [`Resolved::skipped`].

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::markup::{ComponentDefinition, Element, ElementKind};
use crate::style::catalogue;
use crate::style::model::{Style, StyleGroup, StyleReference};
use crate::style::value::{Property, PropertyError, PropertyValue};

/// A style entry (or reference) that could not be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedProperty {
    /// The style the entry came from, as referenced.
    pub style: String,
    pub error: PropertyError,
}

/// The outcome of resolving one element's properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolved {
    /// Final assignments, in first-assignment order.
    pub properties: Vec<Property>,
    pub skipped: Vec<SkippedProperty>,
}

impl Resolved {
    /// The resolved value of a property, if assigned.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    fn assign(&mut self, property: Property) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => existing.value = property.value,
            None => self.properties.push(property),
        }
    }
}

/// Holds the shared style groups and resolves element properties against
/// them.
#[derive(Debug, Clone, Default)]
pub struct StyleResolver {
    groups: BTreeMap<String, StyleGroup>,
}

impl StyleResolver {
    /// Create a resolver with no shared groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) a shared group, returning the previous one.
    pub fn insert_group(&mut self, group: StyleGroup) -> Option<StyleGroup> {
        debug!(group = %group.name, styles = group.styles.len(), "installing style group");
        self.groups.insert(group.name.clone(), group)
    }

    /// Remove a shared group.
    pub fn remove_group(&mut self, name: &str) -> Option<StyleGroup> {
        self.groups.remove(name)
    }

    /// Look up a shared group.
    pub fn group(&self, name: &str) -> Option<&StyleGroup> {
        self.groups.get(name)
    }

    /// Names of all installed groups, sorted.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Resolve the properties of `element`, declared inside `definition`.
    pub fn resolve(&self, element: &Element, definition: &ComponentDefinition) -> Resolved {
        self.resolve_parts(
            element.kind,
            &element.styles,
            &element.properties,
            &definition.styles,
        )
    }

    /// Resolve a definition's root properties (container catalogue).
    pub fn resolve_root(&self, definition: &ComponentDefinition) -> Resolved {
        self.resolve_parts(
            ElementKind::Container,
            &[],
            &definition.properties,
            &definition.styles,
        )
    }

    /// Resolve from explicit parts.
    pub fn resolve_parts(
        &self,
        kind: ElementKind,
        references: &[StyleReference],
        inline: &[Property],
        local: &[Style],
    ) -> Resolved {
        let mut resolved = Resolved::default();

        let shared = references
            .iter()
            .filter(|r| matches!(r, StyleReference::Shared { .. }));
        let plain = references
            .iter()
            .filter(|r| matches!(r, StyleReference::Local(_)));

        for reference in shared.chain(plain) {
            let mut chain = Vec::new();
            let mut visiting = Vec::new();
            if let Err(error) =
                self.expand(reference, local, None, &mut visiting, &mut chain)
            {
                warn!(style = %reference, element = %kind, %error, "style skipped");
                resolved.skipped.push(SkippedProperty {
                    style: reference.to_string(),
                    error,
                });
                continue;
            }
            for style in chain {
                self.apply_style(kind, reference, style, &mut resolved);
            }
        }

        for property in inline {
            resolved.assign(property.clone());
        }
        resolved
    }

    fn apply_style(
        &self,
        kind: ElementKind,
        reference: &StyleReference,
        style: &Style,
        resolved: &mut Resolved,
    ) {
        for (name, raw) in &style.properties {
            let outcome = match catalogue::lookup(kind, name) {
                Some(descriptor) => descriptor.property_type.parse_property(name, raw),
                None => Err(PropertyError::UnknownProperty {
                    property: name.clone(),
                    element: kind.tag().to_string(),
                }),
            };
            match outcome {
                Ok(property) => resolved.assign(property),
                Err(error) => {
                    warn!(style = %style.name, element = %kind, %error, "style property skipped");
                    resolved.skipped.push(SkippedProperty {
                        style: reference.to_string(),
                        error,
                    });
                }
            }
        }
    }

    /// Find the style a reference names, and the group it lives in.
    fn find<'a>(
        &'a self,
        reference: &StyleReference,
        local: &'a [Style],
        scope: Option<&'a StyleGroup>,
    ) -> Option<(&'a Style, Option<&'a StyleGroup>)> {
        match reference {
            StyleReference::Shared { group, name } => {
                let group = self.groups.get(group)?;
                group.get(name).map(|s| (s, Some(group)))
            }
            StyleReference::Local(name) => {
                if let Some(group) = scope {
                    if let Some(style) = group.get(name) {
                        return Some((style, Some(group)));
                    }
                }
                if let Some(style) = local.iter().find(|s| &s.name == name) {
                    return Some((style, None));
                }
                self.groups
                    .values()
                    .find_map(|g| g.get(name).map(|s| (s, Some(g))))
            }
        }
    }

    /// Push `reference`'s extend chain, then the style itself, onto `out`.
    fn expand<'a>(
        &'a self,
        reference: &StyleReference,
        local: &'a [Style],
        scope: Option<&'a StyleGroup>,
        visiting: &mut Vec<String>,
        out: &mut Vec<&'a Style>,
    ) -> Result<(), PropertyError> {
        let (style, group) = self
            .find(reference, local, scope)
            .ok_or_else(|| PropertyError::UnknownStyle(reference.to_string()))?;

        let key = match group {
            Some(g) => format!("{}:{}", g.name, style.name),
            None => style.name.clone(),
        };
        if visiting.contains(&key) {
            return Err(PropertyError::CyclicStyle(key));
        }
        visiting.push(key);
        for parent in &style.extends {
            let parent = StyleReference::parse(parent);
            self.expand(&parent, local, group, visiting, out)?;
        }
        visiting.pop();

        out.push(style);
        Ok(())
    }
}
