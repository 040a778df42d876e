//! Markup parser: XML document → [`ComponentDefinition`] / [`StyleGroup`].
//!
//! The document is first read with quick-xml into a small owned node tree,
//! then each node is dispatched on its tag to an [`ElementKind`].

use std::collections::{HashMap, HashSet};

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, instrument, warn};

use crate::layout::{Layout, LayoutError};
use crate::markup::definition::ComponentDefinition;
use crate::markup::element::{Element, ElementKind, TypeReference};
use crate::style::{catalogue, Property, Style, StyleGroup, StyleReference};

/// Prefix marking layout attributes.
pub const LAYOUT_PREFIX: &str = "layout:";

const COMPONENT_TAG: &str = "Component";
const STYLES_TAG: &str = "styles";
const STYLE_GROUP_TAG: &str = "styleGroup";
const CELL_TAG: &str = "cell";

/// Errors from markup parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Attribute(#[from] AttrError),
    #[error("document has no root element")]
    Empty,
    #[error("expected root <{expected}>, found <{found}>")]
    UnexpectedRoot { expected: String, found: String },
    #[error("unexpected second root element <{0}>")]
    TrailingContent(String),
    #[error("unknown element <{0}>")]
    UnknownElement(String),
    #[error("unknown style tag <{0}>")]
    UnknownStyleTag(String),
    #[error("<{tag}> is missing required attribute `{attribute}`")]
    MissingAttribute { tag: String, attribute: String },
    #[error("<{0}> cannot contain child elements")]
    UnexpectedChildren(String),
    #[error("duplicate element name `{name}` in {type_name}")]
    DuplicateName { name: String, type_name: String },
    #[error("<{tag}>: {source}")]
    Layout {
        tag: String,
        #[source]
        source: LayoutError,
    },
}

// ---------------------------------------------------------------------------
// XML node tree
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct XmlNode {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn from_start(start: &BytesStart<'_>) -> Result<XmlNode, ParseError> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(XmlNode {
            tag: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
        })
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, name: &str) -> Result<&str, ParseError> {
        self.attribute(name).ok_or_else(|| ParseError::MissingAttribute {
            tag: self.tag.clone(),
            attribute: name.to_string(),
        })
    }

    /// Children that belong to the element tree (style blocks excluded).
    fn element_children(&self) -> impl Iterator<Item = &XmlNode> {
        self.children.iter().filter(|c| c.tag != STYLES_TAG)
    }
}

fn read_tree(text: &str) -> Result<XmlNode, ParseError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        let finished = match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                stack.push(XmlNode::from_start(e)?);
                None
            }
            Event::Empty(ref e) => Some(XmlNode::from_start(e)?),
            Event::End(_) => stack.pop(),
            Event::Eof => break,
            _ => None,
        };
        if let Some(node) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None if root.is_some() => return Err(ParseError::TrailingContent(node.tag)),
                None => root = Some(node),
            }
        }
        buf.clear();
    }

    root.ok_or(ParseError::Empty)
}

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

fn parse_style(node: &XmlNode) -> Result<Style, ParseError> {
    let kind = node
        .tag
        .strip_suffix("Style")
        .and_then(ElementKind::from_tag)
        .ok_or_else(|| ParseError::UnknownStyleTag(node.tag.clone()))?;
    let mut style = Style::new(node.require("name")?, kind);
    for (key, value) in &node.attributes {
        match key.as_str() {
            "name" => {}
            "extend" => style.extends.extend(
                value
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            _ => style.properties.push((key.clone(), value.clone())),
        }
    }
    Ok(style)
}

/// Collect every `<styles>` block anywhere in the document.
fn collect_styles(node: &XmlNode, out: &mut Vec<Style>) -> Result<(), ParseError> {
    for child in &node.children {
        if child.tag == STYLES_TAG {
            for entry in &child.children {
                out.push(parse_style(entry)?);
            }
        } else {
            collect_styles(child, out)?;
        }
    }
    Ok(())
}

/// Parse a shared stylesheet document (`<styleGroup name="...">`).
#[instrument(skip(text), fields(len = text.len()))]
pub fn parse_style_group(text: &str) -> Result<StyleGroup, ParseError> {
    let root = read_tree(text)?;
    if root.tag != STYLE_GROUP_TAG {
        return Err(ParseError::UnexpectedRoot {
            expected: STYLE_GROUP_TAG.into(),
            found: root.tag,
        });
    }
    let mut group = StyleGroup::new(root.require("name")?);
    for entry in &root.children {
        group.styles.push(parse_style(entry)?);
    }
    debug!(group = %group.name, styles = group.styles.len(), "parsed style group");
    Ok(group)
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Naming state for one definition scope.
struct Scope {
    type_name: String,
    names: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl Scope {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            names: HashSet::new(),
            counters: HashMap::new(),
        }
    }

    fn declare(&mut self, name: &str) -> Result<(), ParseError> {
        if !self.names.insert(name.to_string()) {
            return Err(ParseError::DuplicateName {
                name: name.to_string(),
                type_name: self.type_name.clone(),
            });
        }
        Ok(())
    }

    fn synthesize(&mut self, tag: &str) -> String {
        let tag = tag.to_ascii_lowercase();
        loop {
            let counter = self.counters.entry(tag.clone()).or_insert(0);
            *counter += 1;
            let candidate = format!("temp_{tag}_{counter}");
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

struct DefinitionParser {
    styles: Vec<Style>,
}

/// Parse a property attribute against a kind's catalogue; failures are
/// logged and skipped.
fn inline_property(kind: ElementKind, name: &str, raw: &str) -> Option<Property> {
    let outcome = match catalogue::lookup(kind, name) {
        Some(descriptor) => descriptor.property_type.parse_property(name, raw),
        None => Err(crate::style::PropertyError::UnknownProperty {
            property: name.to_string(),
            element: kind.tag().to_string(),
        }),
    };
    outcome
        .map_err(|error| warn!(element = %kind, property = name, %error, "property skipped"))
        .ok()
}

impl DefinitionParser {
    fn definition(
        &self,
        type_name: &str,
        is_anonymous: bool,
        nodes: Vec<&XmlNode>,
    ) -> Result<ComponentDefinition, ParseError> {
        let mut scope = Scope::new(type_name);
        let mut definition = ComponentDefinition::new(type_name);
        definition.is_anonymous = is_anonymous;
        definition.styles = self.styles.clone();
        for node in nodes {
            definition.children.push(self.element(node, &mut scope)?);
        }
        Ok(definition)
    }

    fn element(&self, node: &XmlNode, scope: &mut Scope) -> Result<Element, ParseError> {
        let kind = ElementKind::from_tag(&node.tag)
            .ok_or_else(|| ParseError::UnknownElement(node.tag.clone()))?;

        let mut field = None;
        let mut styles = Vec::new();
        let mut layout = Layout::new();
        let mut properties = Vec::new();

        for (key, value) in &node.attributes {
            if let Some(name) = key.strip_prefix(LAYOUT_PREFIX) {
                layout
                    .apply_attribute(name, value)
                    .map_err(|source| ParseError::Layout {
                        tag: node.tag.clone(),
                        source,
                    })?;
                continue;
            }
            match key.as_str() {
                "field" => field = Some(value.trim().to_string()),
                "style" => styles = StyleReference::parse_list(value),
                "type" | "cell" => {}
                k if k.starts_with("xmlns") => {}
                _ => properties.extend(inline_property(kind, key, value)),
            }
        }

        if let Some(name) = &field {
            scope.declare(name)?;
        }
        if let Some(id) = &layout.id {
            if field.as_ref() != Some(id) {
                scope.declare(id)?;
            }
        }
        let identity = match (&field, &layout.id) {
            (Some(name), _) | (None, Some(name)) => name.clone(),
            (None, None) => scope.synthesize(&node.tag),
        };

        let mut element = Element::new(kind, identity);
        element.field = field;
        element.layout = layout;
        element.properties = properties;
        element.styles = styles;

        match kind {
            _ if kind.accepts_children() => {
                for child in node.element_children() {
                    element.children.push(self.element(child, scope)?);
                }
            }
            ElementKind::ComponentReference => {
                element.type_ref = Some(self.component(node, &element, scope)?);
            }
            ElementKind::ListView => {
                element.type_ref = self.cell(node, &element, scope)?;
            }
            _ => {
                if let Some(child) = node.element_children().next() {
                    debug!(parent = %node.tag, child = %child.tag, "unexpected child element");
                    return Err(ParseError::UnexpectedChildren(node.tag.clone()));
                }
            }
        }
        Ok(element)
    }

    /// `<Component type="T"/>`, with an inline or anonymous nested definition
    /// when it has children.
    fn component(
        &self,
        node: &XmlNode,
        element: &Element,
        scope: &Scope,
    ) -> Result<TypeReference, ParseError> {
        let children: Vec<&XmlNode> = node.element_children().collect();
        self.type_reference(node, node.attribute("type"), children, element, scope)?
            .ok_or_else(|| ParseError::MissingAttribute {
                tag: node.tag.clone(),
                attribute: "type".into(),
            })
    }

    /// `<ListView cell="T"/>` or `<ListView><cell type="T">...</cell></ListView>`.
    fn cell(
        &self,
        node: &XmlNode,
        element: &Element,
        scope: &Scope,
    ) -> Result<Option<TypeReference>, ParseError> {
        let mut template = None;
        for child in node.element_children() {
            if child.tag != CELL_TAG || template.is_some() {
                return Err(ParseError::UnexpectedChildren(node.tag.clone()));
            }
            template = Some(child);
        }
        match template {
            Some(cell) => {
                let children: Vec<&XmlNode> = cell.element_children().collect();
                self.type_reference(cell, cell.attribute("type"), children, element, scope)
            }
            None => Ok(node.attribute("cell").map(TypeReference::named)),
        }
    }

    fn type_reference(
        &self,
        node: &XmlNode,
        declared: Option<&str>,
        children: Vec<&XmlNode>,
        element: &Element,
        scope: &Scope,
    ) -> Result<Option<TypeReference>, ParseError> {
        if children.is_empty() {
            return Ok(declared.map(TypeReference::named));
        }
        let (type_name, is_anonymous) = match declared {
            Some(name) => (name.to_string(), false),
            None => (format!("{}_{}", scope.type_name, element.name()), true),
        };
        debug!(tag = %node.tag, %type_name, is_anonymous, "nested definition");
        let definition = self.definition(&type_name, is_anonymous, children)?;
        Ok(Some(TypeReference {
            type_name,
            definition: Some(Box::new(definition)),
        }))
    }
}

/// Parse a component document (`<Component type="..." rootView="...">`).
#[instrument(skip(text), fields(len = text.len()))]
pub fn parse_definition(text: &str) -> Result<ComponentDefinition, ParseError> {
    let root = read_tree(text)?;
    if root.tag != COMPONENT_TAG {
        return Err(ParseError::UnexpectedRoot {
            expected: COMPONENT_TAG.into(),
            found: root.tag,
        });
    }
    let type_name = root.require("type")?.to_string();

    let mut styles = Vec::new();
    collect_styles(&root, &mut styles)?;
    let parser = DefinitionParser { styles };

    let mut definition =
        parser.definition(&type_name, false, root.element_children().collect())?;
    for (key, value) in &root.attributes {
        match key.as_str() {
            "type" => {}
            "rootView" => definition.is_root = value.trim() == "true",
            k if k.starts_with("xmlns") || k.starts_with(LAYOUT_PREFIX) => {}
            _ => definition
                .properties
                .extend(inline_property(ElementKind::Container, key, value)),
        }
    }

    debug!(
        type_name = %definition.type_name,
        elements = definition.elements().count(),
        nested = definition.component_definitions().len() - 1,
        "parsed definition"
    );
    Ok(definition)
}
