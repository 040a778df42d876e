//! Literal emission for typed property values and constraint numbers.

use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::quote;

use crate::codegen::GenerateError;
use crate::layout::{Anchor, Priority};
use crate::style::{Color, Font, PropertyValue};

/// A float literal; negative values become a `-` punct followed by the
/// absolute value.
pub(crate) fn number(value: f64) -> Result<TokenStream, GenerateError> {
    if !value.is_finite() {
        return Err(GenerateError::NonFiniteNumber(value.to_string()));
    }
    let literal = Literal::f64_unsuffixed(value.abs());
    Ok(if value < 0.0 {
        quote!(-#literal)
    } else {
        quote!(#literal)
    })
}

fn number_f32(value: f32) -> Result<TokenStream, GenerateError> {
    if !value.is_finite() {
        return Err(GenerateError::NonFiniteNumber(value.to_string()));
    }
    let literal = Literal::f32_unsuffixed(value.abs());
    Ok(if value < 0.0 {
        quote!(-#literal)
    } else {
        quote!(#literal)
    })
}

fn integer(value: i64) -> TokenStream {
    let literal = Literal::u64_unsuffixed(value.unsigned_abs());
    if value < 0 {
        quote!(-#literal)
    } else {
        quote!(#literal)
    }
}

/// `Variant` path segment for a keyword enum value.
fn variant(value: impl std::fmt::Debug) -> Ident {
    Ident::new(&format!("{value:?}"), Span::call_site())
}

fn color(c: &Color) -> Result<TokenStream, GenerateError> {
    let (r, g, b, a) = (
        number(c.red)?,
        number(c.green)?,
        number(c.blue)?,
        number(c.alpha)?,
    );
    Ok(quote!(Color::rgba(#r, #g, #b, #a)))
}

fn font(f: &Font) -> Result<TokenStream, GenerateError> {
    let size = number(f.size())?;
    Ok(match f {
        Font::System { weight, .. } => {
            let weight = variant(weight);
            quote!(Font::system(FontWeight::#weight, #size))
        }
        Font::Named { name, .. } => quote!(Font::named(#name, #size)),
    })
}

/// The expression for a typed property value.
pub(crate) fn property_value(value: &PropertyValue) -> Result<TokenStream, GenerateError> {
    Ok(match value {
        PropertyValue::Color(c) => color(c)?,
        PropertyValue::String(s) => quote!(#s),
        PropertyValue::Font(f) => font(f)?,
        PropertyValue::Integer(v) => integer(*v),
        PropertyValue::Float(v) => number_f32(*v)?,
        PropertyValue::Double(v) => number(*v)?,
        PropertyValue::Bool(v) => quote!(#v),
        PropertyValue::TextAlignment(v) => {
            let v = variant(v);
            quote!(TextAlignment::#v)
        }
        PropertyValue::ContentMode(v) => {
            let v = variant(v);
            quote!(ContentMode::#v)
        }
        PropertyValue::BarStyle(v) => {
            let v = variant(v);
            quote!(BarStyle::#v)
        }
        PropertyValue::LineBreakMode(v) => {
            let v = variant(v);
            quote!(LineBreakMode::#v)
        }
        PropertyValue::Axis(v) => {
            let v = variant(v);
            quote!(Axis::#v)
        }
        PropertyValue::Distribution(v) => {
            let v = variant(v);
            quote!(Distribution::#v)
        }
        PropertyValue::Alignment(v) => {
            let v = variant(v);
            quote!(Alignment::#v)
        }
        PropertyValue::ActivityIndicatorStyle(v) => {
            let v = variant(v);
            quote!(ActivityIndicatorStyle::#v)
        }
        PropertyValue::Point(p) => {
            let (x, y) = (number(p.x)?, number(p.y)?);
            quote!(Point::new(#x, #y))
        }
        PropertyValue::Size(s) => {
            let (w, h) = (number(s.width)?, number(s.height)?);
            quote!(Size::new(#w, #h))
        }
        PropertyValue::Rect(r) => {
            let (x, y) = (number(r.origin.x)?, number(r.origin.y)?);
            let (w, h) = (number(r.size.width)?, number(r.size.height)?);
            quote!(Rect::new(#x, #y, #w, #h))
        }
        PropertyValue::EdgeInsets(i) => {
            let (t, l) = (number(i.top)?, number(i.left)?);
            let (b, r) = (number(i.bottom)?, number(i.right)?);
            quote!(EdgeInsets::new(#t, #l, #b, #r))
        }
        PropertyValue::Image(name) => quote!(Image::named(#name)),
    })
}

/// `Anchor::X`.
pub(crate) fn anchor(anchor: Anchor) -> TokenStream {
    let v = variant(anchor);
    quote!(Anchor::#v)
}

/// `Priority::X`, or `Priority::Custom(n)`.
pub(crate) fn priority(priority: Priority) -> Result<TokenStream, GenerateError> {
    Ok(match priority {
        Priority::Custom(v) => {
            let v = number_f32(v)?;
            quote!(Priority::Custom(#v))
        }
        other => {
            let v = variant(other);
            quote!(Priority::#v)
        }
    })
}

/// `backgroundColor` → `background_color`.
pub(crate) fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EdgeInsets;
    use crate::style::{FontWeight, TextAlignment};

    #[test]
    fn negative_numbers_split_sign() {
        assert_eq!(number(-8.0).unwrap().to_string(), quote!(-8.0).to_string());
        assert_eq!(number(16.0).unwrap().to_string(), "16.0");
    }

    #[test]
    fn non_finite_numbers_fail() {
        assert!(number(f64::INFINITY).is_err());
        assert!(number(f64::NAN).is_err());
    }

    #[test]
    fn keyword_values_are_paths() {
        let tokens = property_value(&PropertyValue::TextAlignment(TextAlignment::Center)).unwrap();
        assert_eq!(tokens.to_string(), quote!(TextAlignment::Center).to_string());
    }

    #[test]
    fn font_values() {
        let tokens = property_value(&PropertyValue::Font(Font::System {
            weight: FontWeight::Bold,
            size: 20.0,
        }))
        .unwrap();
        assert_eq!(
            tokens.to_string(),
            quote!(Font::system(FontWeight::Bold, 20.0)).to_string()
        );
    }

    #[test]
    fn insets_values() {
        let tokens = property_value(&PropertyValue::EdgeInsets(EdgeInsets::new(
            1.0, 2.0, 3.0, 4.0,
        )))
        .unwrap();
        assert_eq!(
            tokens.to_string(),
            quote!(EdgeInsets::new(1.0, 2.0, 3.0, 4.0)).to_string()
        );
    }

    #[test]
    fn custom_priority() {
        assert_eq!(
            priority(Priority::Custom(999.0)).unwrap().to_string(),
            quote!(Priority::Custom(999.0)).to_string()
        );
        assert_eq!(
            priority(Priority::High).unwrap().to_string(),
            quote!(Priority::High).to_string()
        );
    }

    #[test]
    fn snake_case_names() {
        assert_eq!(snake_case("backgroundColor"), "background_color");
        assert_eq!(snake_case("text"), "text");
        assert_eq!(snake_case("showsHorizontalScrollIndicator"), "shows_horizontal_scroll_indicator");
    }
}
