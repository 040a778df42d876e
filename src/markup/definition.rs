//! ComponentDefinition: one parsed component type.

use crate::markup::element::Element;
use crate::style::{Property, Style};

/// The parsed description of one component type's visual tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentDefinition {
    pub type_name: String,
    /// Declared `rootView="true"`.
    pub is_root: bool,
    /// Synthesized name (`<Parent>_<identity>`), no declared type.
    pub is_anonymous: bool,
    /// Styles declared in the document's `<styles>` blocks.
    pub styles: Vec<Style>,
    /// Typed properties of the component's own root view.
    pub properties: Vec<Property>,
    pub children: Vec<Element>,
}

impl ComponentDefinition {
    /// Create an empty definition.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Pre-order walk of every element in this definition's own scope.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().flat_map(Element::walk)
    }

    /// Find an element of this scope by identity.
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name() == name)
    }

    /// Self plus every nested definition, pre-order.
    pub fn component_definitions(&self) -> Vec<&ComponentDefinition> {
        let mut out = vec![self];
        for element in self.elements() {
            if let Some(nested) = element.nested_definition() {
                out.extend(nested.component_definitions());
            }
        }
        out
    }

    /// Every referenced type name in this definition and its nested
    /// definitions, deduplicated, in document order.
    pub fn component_types(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        self.collect_types(&mut out);
        out
    }

    fn collect_types(&self, out: &mut Vec<String>) {
        for element in self.elements() {
            let Some(reference) = &element.type_ref else {
                continue;
            };
            if !out.contains(&reference.type_name) {
                out.push(reference.type_name.clone());
            }
            if let Some(nested) = &reference.definition {
                nested.collect_types(out);
            }
        }
    }

    /// Field names declared in this scope, in document order.
    pub fn fields(&self) -> Vec<&str> {
        self.elements().filter_map(|e| e.field.as_deref()).collect()
    }
}
