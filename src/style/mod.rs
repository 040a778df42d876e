//! Typed property values, per-kind catalogues and the style cascade.

pub mod catalogue;
pub mod color;
pub mod model;
pub mod resolver;
pub mod value;

pub use catalogue::{lookup, properties_for, PropertyDescriptor};
pub use color::{Color, Font, FontWeight};
pub use model::{Style, StyleGroup, StyleReference};
pub use resolver::{Resolved, SkippedProperty, StyleResolver};
pub use value::{
    ActivityIndicatorStyle, Alignment, Axis, BarStyle, ContentMode, Distribution, LineBreakMode,
    Property, PropertyError, PropertyType, PropertyValue, TextAlignment,
};
