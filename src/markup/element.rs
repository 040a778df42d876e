//! Element tree node types.

use std::fmt;

use crate::layout::Layout;
use crate::markup::definition::ComponentDefinition;
use crate::style::{Property, StyleReference};

// ---------------------------------------------------------------------------
// ElementKind
// ---------------------------------------------------------------------------

/// The closed set of element kinds a document may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Container,
    Label,
    TextField,
    Button,
    ImageView,
    ScrollView,
    StackView,
    ActivityIndicator,
    TextView,
    ListView,
    Switch,
    Slider,
    Stepper,
    SegmentedControl,
    PageControl,
    SearchBar,
    ComponentReference,
}

impl ElementKind {
    /// Every kind, in declaration order.
    pub const ALL: [ElementKind; 17] = [
        ElementKind::Container,
        ElementKind::Label,
        ElementKind::TextField,
        ElementKind::Button,
        ElementKind::ImageView,
        ElementKind::ScrollView,
        ElementKind::StackView,
        ElementKind::ActivityIndicator,
        ElementKind::TextView,
        ElementKind::ListView,
        ElementKind::Switch,
        ElementKind::Slider,
        ElementKind::Stepper,
        ElementKind::SegmentedControl,
        ElementKind::PageControl,
        ElementKind::SearchBar,
        ElementKind::ComponentReference,
    ];

    /// The markup tag for this kind.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Container => "View",
            ElementKind::Label => "Label",
            ElementKind::TextField => "TextField",
            ElementKind::Button => "Button",
            ElementKind::ImageView => "ImageView",
            ElementKind::ScrollView => "ScrollView",
            ElementKind::StackView => "StackView",
            ElementKind::ActivityIndicator => "ActivityIndicator",
            ElementKind::TextView => "TextView",
            ElementKind::ListView => "ListView",
            ElementKind::Switch => "Switch",
            ElementKind::Slider => "Slider",
            ElementKind::Stepper => "Stepper",
            ElementKind::SegmentedControl => "SegmentedControl",
            ElementKind::PageControl => "PageControl",
            ElementKind::SearchBar => "SearchBar",
            ElementKind::ComponentReference => "Component",
        }
    }

    /// Dispatch a markup tag to its kind. `Container` is accepted as an
    /// alias of `View`.
    pub fn from_tag(tag: &str) -> Option<ElementKind> {
        if tag == "Container" {
            return Some(ElementKind::Container);
        }
        ElementKind::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// Whether elements of this kind own ordered child elements.
    pub fn accepts_children(self) -> bool {
        matches!(
            self,
            ElementKind::Container | ElementKind::ScrollView | ElementKind::StackView
        )
    }

    /// Whether children of this kind are attached as arranged subviews.
    pub fn arranges_children(self) -> bool {
        self == ElementKind::StackView
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// TypeReference
// ---------------------------------------------------------------------------

/// A reference to a custom component type, with its inline nested
/// definition when the document declares one.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReference {
    pub type_name: String,
    pub definition: Option<Box<ComponentDefinition>>,
}

impl TypeReference {
    /// A bare reference to an externally defined type.
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            definition: None,
        }
    }

    /// Whether the referenced definition is anonymous (synthesized name).
    pub fn is_anonymous(&self) -> bool {
        self.definition.as_ref().is_some_and(|d| d.is_anonymous)
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// One node of the element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    /// Stable field name bound on the owning component.
    pub field: Option<String>,
    pub layout: Layout,
    /// Typed inline properties, in attribute order.
    pub properties: Vec<Property>,
    /// Style references, in attribute order.
    pub styles: Vec<StyleReference>,
    pub children: Vec<Element>,
    /// Referenced type for component references, cell type for list views.
    pub type_ref: Option<TypeReference>,
    pub(crate) identity: String,
}

impl Element {
    /// Create an element with an explicit identity and no content.
    pub fn new(kind: ElementKind, identity: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            layout: Layout::new(),
            properties: Vec::new(),
            styles: Vec::new(),
            children: Vec::new(),
            type_ref: None,
            identity: identity.into(),
        }
    }

    /// Identity within the owning definition: the field name, else the
    /// layout id, else a synthesized positional name.
    pub fn name(&self) -> &str {
        &self.identity
    }

    /// Whether the identity was synthesized rather than declared.
    pub fn is_synthesized(&self) -> bool {
        self.field.is_none() && self.layout.id.is_none()
    }

    /// The nested definition carried by this element, if any.
    pub fn nested_definition(&self) -> Option<&ComponentDefinition> {
        self.type_ref.as_ref().and_then(|t| t.definition.as_deref())
    }

    /// Pre-order walk of this element and its descendants.
    ///
    /// Nested definitions are separate scopes and are not entered.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Pre-order iterator returned by [`Element::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ElementKind::from_tag("Container"), Some(ElementKind::Container));
        assert_eq!(ElementKind::from_tag("Foo"), None);
    }

    #[test]
    fn walk_is_pre_order() {
        let mut root = Element::new(ElementKind::Container, "root");
        let mut stack = Element::new(ElementKind::StackView, "stack");
        stack.children.push(Element::new(ElementKind::Label, "a"));
        stack.children.push(Element::new(ElementKind::Label, "b"));
        root.children.push(stack);
        root.children.push(Element::new(ElementKind::Button, "c"));

        let names: Vec<_> = root.walk().map(Element::name).collect();
        assert_eq!(names, ["root", "stack", "a", "b", "c"]);
    }

    #[test]
    fn only_stack_views_arrange() {
        assert!(ElementKind::StackView.arranges_children());
        assert!(!ElementKind::Container.arranges_children());
        assert!(ElementKind::ScrollView.accepts_children());
        assert!(!ElementKind::Label.accepts_children());
    }
}
