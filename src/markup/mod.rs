//! Markup documents: element tree model and the XML parser.

pub mod definition;
pub mod element;
pub mod parser;

pub use definition::ComponentDefinition;
pub use element::{Element, ElementKind, TypeReference, Walk};
pub use parser::{parse_definition, parse_style_group, ParseError, LAYOUT_PREFIX};
