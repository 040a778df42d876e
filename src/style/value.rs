//! Typed property values: raw markup text → [`PropertyValue`].
//!
//! Each property an element accepts has a declared [`PropertyType`] (see
//! [`crate::style::catalogue`]). Parsing is per-property and never aborts the
//! surrounding element: callers skip a failed property and record the error.

use std::fmt;

use crate::geometry::{EdgeInsets, Point, Rect, Size};
use crate::style::color::{Color, Font};

/// Errors from property parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    #[error("unknown property `{property}` for <{element}>")]
    UnknownProperty { property: String, element: String },
    #[error("invalid value for {property}: {message}")]
    InvalidValue { property: String, message: String },
    #[error("unknown style `{0}`")]
    UnknownStyle(String),
    #[error("style `{0}` extends itself")]
    CyclicStyle(String),
}

impl PropertyError {
    /// Re-label an `InvalidValue` error with the concrete property name.
    fn for_property(self, property: &str) -> PropertyError {
        match self {
            PropertyError::InvalidValue { message, .. } => PropertyError::InvalidValue {
                property: property.to_string(),
                message,
            },
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Keyword enums
// ---------------------------------------------------------------------------

/// Declares a fieldless enum whose variants are spelled by markup keywords.
macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $keyword:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The markup keyword for this variant.
            pub fn keyword(self) -> &'static str {
                match self {
                    $($name::$variant => $keyword),+
                }
            }

            /// Look up a variant by markup keyword.
            pub fn from_keyword(keyword: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.keyword() == keyword)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.keyword())
            }
        }
    };
}

keyword_enum!(
    /// Horizontal text alignment.
    TextAlignment {
        Left => "left",
        Center => "center",
        Right => "right",
        Justified => "justified",
        Natural => "natural",
    }
);

keyword_enum!(
    /// How image content is scaled inside its bounds.
    ContentMode {
        ScaleToFill => "scaleToFill",
        ScaleAspectFit => "scaleAspectFit",
        ScaleAspectFill => "scaleAspectFill",
        Redraw => "redraw",
        Center => "center",
        Top => "top",
        Bottom => "bottom",
        Left => "left",
        Right => "right",
        TopLeft => "topLeft",
        TopRight => "topRight",
        BottomLeft => "bottomLeft",
        BottomRight => "bottomRight",
    }
);

keyword_enum!(
    /// Bar appearance.
    BarStyle {
        Default => "default",
        Black => "black",
    }
);

keyword_enum!(
    /// Text wrapping and truncation.
    LineBreakMode {
        ByWordWrapping => "byWordWrapping",
        ByCharWrapping => "byCharWrapping",
        ByClipping => "byClipping",
        ByTruncatingHead => "byTruncatingHead",
        ByTruncatingTail => "byTruncatingTail",
        ByTruncatingMiddle => "byTruncatingMiddle",
    }
);

keyword_enum!(
    /// Stacking axis.
    Axis {
        Horizontal => "horizontal",
        Vertical => "vertical",
    }
);

keyword_enum!(
    /// How a stack distributes its arranged children along its axis.
    Distribution {
        Fill => "fill",
        FillEqually => "fillEqually",
        FillProportionally => "fillProportionally",
        EqualSpacing => "equalSpacing",
        EqualCentering => "equalCentering",
    }
);

keyword_enum!(
    /// How a stack aligns its arranged children across its axis.
    Alignment {
        Fill => "fill",
        Leading => "leading",
        FirstBaseline => "firstBaseline",
        Center => "center",
        Trailing => "trailing",
        LastBaseline => "lastBaseline",
    }
);

keyword_enum!(
    /// Activity indicator appearance.
    ActivityIndicatorStyle {
        WhiteLarge => "whiteLarge",
        White => "white",
        Gray => "gray",
    }
);

// ---------------------------------------------------------------------------
// PropertyType / PropertyValue
// ---------------------------------------------------------------------------

/// The closed catalogue of parseable property types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Color,
    String,
    Font,
    Integer,
    Float,
    Double,
    Bool,
    TextAlignment,
    ContentMode,
    BarStyle,
    LineBreakMode,
    Axis,
    Distribution,
    Alignment,
    ActivityIndicatorStyle,
    Point,
    Size,
    Rect,
    EdgeInsets,
    Image,
}

/// A parsed, typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Color(Color),
    String(String),
    Font(Font),
    Integer(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    TextAlignment(TextAlignment),
    ContentMode(ContentMode),
    BarStyle(BarStyle),
    LineBreakMode(LineBreakMode),
    Axis(Axis),
    Distribution(Distribution),
    Alignment(Alignment),
    ActivityIndicatorStyle(ActivityIndicatorStyle),
    Point(Point),
    Size(Size),
    Rect(Rect),
    EdgeInsets(EdgeInsets),
    Image(String),
}

/// A named, typed property assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    /// Create a property assignment.
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Parse a keyword for a keyword enum, producing a descriptive error.
fn keyword<T: Copy>(
    raw: &str,
    property: &str,
    lookup: fn(&str) -> Option<T>,
    all: &[T],
    name: fn(T) -> &'static str,
) -> Result<T, PropertyError> {
    lookup(raw.trim()).ok_or_else(|| PropertyError::InvalidValue {
        property: property.into(),
        message: format!(
            "expected one of {}, got: {raw}",
            all.iter().map(|v| name(*v)).collect::<Vec<_>>().join("|")
        ),
    })
}

/// Parse a comma separated list of numbers.
fn numbers(raw: &str, property: &str) -> Result<Vec<f64>, PropertyError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| PropertyError::InvalidValue {
                    property: property.into(),
                    message: format!("invalid number: {}", part.trim()),
                })
        })
        .collect()
}

/// Parse a tuple of exactly `N` numbers.
fn tuple<const N: usize>(raw: &str, property: &str) -> Result<[f64; N], PropertyError> {
    let values = numbers(raw, property)?;
    <[f64; N]>::try_from(values.as_slice()).map_err(|_| PropertyError::InvalidValue {
        property: property.into(),
        message: format!("expected {N} comma separated values, got {}", values.len()),
    })
}

impl PropertyType {
    /// Type name used in diagnostics and generated code.
    pub fn name(self) -> &'static str {
        match self {
            PropertyType::Color => "color",
            PropertyType::String => "string",
            PropertyType::Font => "font",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Double => "double",
            PropertyType::Bool => "bool",
            PropertyType::TextAlignment => "textAlignment",
            PropertyType::ContentMode => "contentMode",
            PropertyType::BarStyle => "barStyle",
            PropertyType::LineBreakMode => "lineBreakMode",
            PropertyType::Axis => "axis",
            PropertyType::Distribution => "distribution",
            PropertyType::Alignment => "alignment",
            PropertyType::ActivityIndicatorStyle => "activityIndicatorStyle",
            PropertyType::Point => "point",
            PropertyType::Size => "size",
            PropertyType::Rect => "rect",
            PropertyType::EdgeInsets => "edgeInsets",
            PropertyType::Image => "image",
        }
    }

    /// Parse raw markup text into a value of this type.
    pub fn parse(self, raw: &str) -> Result<PropertyValue, PropertyError> {
        let property = self.name();
        let invalid = |message: String| PropertyError::InvalidValue {
            property: property.into(),
            message,
        };

        Ok(match self {
            PropertyType::Color => PropertyValue::Color(Color::parse(raw)?),
            PropertyType::String => PropertyValue::String(raw.to_string()),
            PropertyType::Font => PropertyValue::Font(Font::parse(raw)?),
            PropertyType::Integer => PropertyValue::Integer(
                raw.trim()
                    .parse()
                    .map_err(|_| invalid(format!("expected an integer, got: {raw}")))?,
            ),
            PropertyType::Float => PropertyValue::Float(
                raw.trim()
                    .parse()
                    .map_err(|_| invalid(format!("expected a number, got: {raw}")))?,
            ),
            PropertyType::Double => PropertyValue::Double(
                raw.trim()
                    .parse()
                    .map_err(|_| invalid(format!("expected a number, got: {raw}")))?,
            ),
            PropertyType::Bool => PropertyValue::Bool(match raw.trim() {
                "true" | "yes" => true,
                "false" | "no" => false,
                other => return Err(invalid(format!("expected true|false, got: {other}"))),
            }),
            PropertyType::TextAlignment => PropertyValue::TextAlignment(keyword(
                raw,
                property,
                TextAlignment::from_keyword,
                TextAlignment::ALL,
                TextAlignment::keyword,
            )?),
            PropertyType::ContentMode => PropertyValue::ContentMode(keyword(
                raw,
                property,
                ContentMode::from_keyword,
                ContentMode::ALL,
                ContentMode::keyword,
            )?),
            PropertyType::BarStyle => PropertyValue::BarStyle(keyword(
                raw,
                property,
                BarStyle::from_keyword,
                BarStyle::ALL,
                BarStyle::keyword,
            )?),
            PropertyType::LineBreakMode => PropertyValue::LineBreakMode(keyword(
                raw,
                property,
                LineBreakMode::from_keyword,
                LineBreakMode::ALL,
                LineBreakMode::keyword,
            )?),
            PropertyType::Axis => PropertyValue::Axis(keyword(
                raw,
                property,
                Axis::from_keyword,
                Axis::ALL,
                Axis::keyword,
            )?),
            PropertyType::Distribution => PropertyValue::Distribution(keyword(
                raw,
                property,
                Distribution::from_keyword,
                Distribution::ALL,
                Distribution::keyword,
            )?),
            PropertyType::Alignment => PropertyValue::Alignment(keyword(
                raw,
                property,
                Alignment::from_keyword,
                Alignment::ALL,
                Alignment::keyword,
            )?),
            PropertyType::ActivityIndicatorStyle => PropertyValue::ActivityIndicatorStyle(keyword(
                raw,
                property,
                ActivityIndicatorStyle::from_keyword,
                ActivityIndicatorStyle::ALL,
                ActivityIndicatorStyle::keyword,
            )?),
            PropertyType::Point => {
                let [x, y] = tuple::<2>(raw, property)?;
                PropertyValue::Point(Point::new(x, y))
            }
            PropertyType::Size => {
                let [width, height] = tuple::<2>(raw, property)?;
                PropertyValue::Size(Size::new(width, height))
            }
            PropertyType::Rect => {
                let [x, y, width, height] = tuple::<4>(raw, property)?;
                PropertyValue::Rect(Rect::new(x, y, width, height))
            }
            PropertyType::EdgeInsets => {
                let values = numbers(raw, property)?;
                PropertyValue::EdgeInsets(match values.as_slice() {
                    [all] => EdgeInsets::all(*all),
                    [vertical, horizontal] => EdgeInsets::symmetric(*vertical, *horizontal),
                    [top, left, bottom, right] => EdgeInsets::new(*top, *left, *bottom, *right),
                    other => {
                        return Err(invalid(format!("expected 1, 2 or 4 values, got {}", other.len())))
                    }
                })
            }
            PropertyType::Image => {
                let name = raw.trim();
                if name.is_empty() {
                    return Err(invalid("image name must not be empty".into()));
                }
                PropertyValue::Image(name.to_string())
            }
        })
    }

    /// Parse raw text for a named property, labelling errors with that name.
    pub fn parse_property(self, name: &str, raw: &str) -> Result<Property, PropertyError> {
        self.parse(raw)
            .map(|value| Property::new(name, value))
            .map_err(|e| e.for_property(name))
    }
}

impl PropertyValue {
    /// The type of this value.
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Color(_) => PropertyType::Color,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Font(_) => PropertyType::Font,
            PropertyValue::Integer(_) => PropertyType::Integer,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::TextAlignment(_) => PropertyType::TextAlignment,
            PropertyValue::ContentMode(_) => PropertyType::ContentMode,
            PropertyValue::BarStyle(_) => PropertyType::BarStyle,
            PropertyValue::LineBreakMode(_) => PropertyType::LineBreakMode,
            PropertyValue::Axis(_) => PropertyType::Axis,
            PropertyValue::Distribution(_) => PropertyType::Distribution,
            PropertyValue::Alignment(_) => PropertyType::Alignment,
            PropertyValue::ActivityIndicatorStyle(_) => PropertyType::ActivityIndicatorStyle,
            PropertyValue::Point(_) => PropertyType::Point,
            PropertyValue::Size(_) => PropertyType::Size,
            PropertyValue::Rect(_) => PropertyType::Rect,
            PropertyValue::EdgeInsets(_) => PropertyType::EdgeInsets,
            PropertyValue::Image(_) => PropertyType::Image,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Color(c) => write!(f, "{c}"),
            PropertyValue::String(s) | PropertyValue::Image(s) => write!(f, "{s}"),
            PropertyValue::Font(font) => write!(f, "{font}"),
            PropertyValue::Integer(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::TextAlignment(v) => write!(f, "{v}"),
            PropertyValue::ContentMode(v) => write!(f, "{v}"),
            PropertyValue::BarStyle(v) => write!(f, "{v}"),
            PropertyValue::LineBreakMode(v) => write!(f, "{v}"),
            PropertyValue::Axis(v) => write!(f, "{v}"),
            PropertyValue::Distribution(v) => write!(f, "{v}"),
            PropertyValue::Alignment(v) => write!(f, "{v}"),
            PropertyValue::ActivityIndicatorStyle(v) => write!(f, "{v}"),
            PropertyValue::Point(p) => write!(f, "{p}"),
            PropertyValue::Size(s) => write!(f, "{s}"),
            PropertyValue::Rect(r) => write!(f, "{r}"),
            PropertyValue::EdgeInsets(insets) => write!(f, "{insets}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scalars() {
        assert_eq!(PropertyType::Integer.parse("3").unwrap(), PropertyValue::Integer(3));
        assert_eq!(PropertyType::Float.parse(" 0.5 ").unwrap(), PropertyValue::Float(0.5));
        assert_eq!(PropertyType::Double.parse("2").unwrap(), PropertyValue::Double(2.0));
        assert_eq!(PropertyType::Bool.parse("true").unwrap(), PropertyValue::Bool(true));
        assert_eq!(PropertyType::Bool.parse("no").unwrap(), PropertyValue::Bool(false));
    }

    #[test]
    fn strings_keep_whitespace() {
        assert_eq!(
            PropertyType::String.parse("  Hello  ").unwrap(),
            PropertyValue::String("  Hello  ".into())
        );
    }

    #[test]
    fn parse_keywords() {
        assert_eq!(
            PropertyType::TextAlignment.parse("center").unwrap(),
            PropertyValue::TextAlignment(TextAlignment::Center)
        );
        assert_eq!(
            PropertyType::ContentMode.parse("scaleAspectFit").unwrap(),
            PropertyValue::ContentMode(ContentMode::ScaleAspectFit)
        );
        assert_eq!(
            PropertyType::Axis.parse("vertical").unwrap(),
            PropertyValue::Axis(Axis::Vertical)
        );
    }

    #[test]
    fn unknown_keyword_lists_choices() {
        let err = PropertyType::Axis.parse("diagonal").unwrap_err();
        assert!(err.to_string().contains("horizontal|vertical"), "{err}");
    }

    #[test]
    fn parse_geometry() {
        assert_eq!(
            PropertyType::Point.parse("1, 2").unwrap(),
            PropertyValue::Point(Point::new(1.0, 2.0))
        );
        assert_eq!(
            PropertyType::Rect.parse("0,0,320,44").unwrap(),
            PropertyValue::Rect(Rect::new(0.0, 0.0, 320.0, 44.0))
        );
        assert_eq!(
            PropertyType::EdgeInsets.parse("8").unwrap(),
            PropertyValue::EdgeInsets(EdgeInsets::all(8.0))
        );
        assert_eq!(
            PropertyType::EdgeInsets.parse("4, 8").unwrap(),
            PropertyValue::EdgeInsets(EdgeInsets::symmetric(4.0, 8.0))
        );
    }

    #[test]
    fn geometry_displays_as_markup() {
        for (ty, raw) in [
            (PropertyType::Point, "1, 2"),
            (PropertyType::Size, "320, 44"),
            (PropertyType::Rect, "0, 8, 320, 44"),
            (PropertyType::EdgeInsets, "1, 2, 3, 4"),
        ] {
            assert_eq!(ty.parse(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn geometry_arity_errors() {
        assert!(PropertyType::Size.parse("1").is_err());
        assert!(PropertyType::Rect.parse("1, 2, 3").is_err());
        assert!(PropertyType::EdgeInsets.parse("1, 2, 3").is_err());
        assert!(PropertyType::Point.parse("1, x").is_err());
    }

    #[test]
    fn parse_property_labels_errors() {
        let err = PropertyType::Integer
            .parse_property("numberOfLines", "many")
            .unwrap_err();
        assert_eq!(
            err,
            PropertyError::InvalidValue {
                property: "numberOfLines".into(),
                message: "expected an integer, got: many".into(),
            }
        );
    }

    #[test]
    fn value_reports_its_type() {
        let value = PropertyType::Font.parse(":bold@12").unwrap();
        assert_eq!(value.property_type(), PropertyType::Font);
        assert_eq!(value.to_string(), ":bold@12");
    }
}
