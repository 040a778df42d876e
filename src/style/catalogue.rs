//! Per-kind property catalogue.
//!
//! Each [`ElementKind`] accepts the concatenation of a fixed sequence of
//! capability layers, most general first (view, then control, then the
//! kind's own properties). A name declared in a later layer shadows the
//! same name in an earlier one.

use crate::markup::ElementKind;
use crate::style::value::PropertyType;
use crate::style::value::PropertyType as T;

/// A property a kind accepts, with its declared value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub property_type: PropertyType,
}

const fn prop(name: &'static str, property_type: PropertyType) -> PropertyDescriptor {
    PropertyDescriptor {
        name,
        property_type,
    }
}

// ---- Capability layers ----

const VIEW: &[PropertyDescriptor] = &[
    prop("backgroundColor", T::Color),
    prop("tintColor", T::Color),
    prop("alpha", T::Double),
    prop("hidden", T::Bool),
    prop("clipsToBounds", T::Bool),
    prop("userInteractionEnabled", T::Bool),
    prop("cornerRadius", T::Double),
    prop("borderWidth", T::Double),
    prop("borderColor", T::Color),
    prop("frame", T::Rect),
    prop("layoutMargins", T::EdgeInsets),
    prop("tag", T::Integer),
    prop("accessibilityIdentifier", T::String),
    prop("accessibilityLabel", T::String),
];

const CONTROL: &[PropertyDescriptor] = &[
    prop("enabled", T::Bool),
    prop("selected", T::Bool),
    prop("highlighted", T::Bool),
];

const TEXT: &[PropertyDescriptor] = &[
    prop("text", T::String),
    prop("textColor", T::Color),
    prop("font", T::Font),
    prop("textAlignment", T::TextAlignment),
];

const LABEL: &[PropertyDescriptor] = &[
    prop("numberOfLines", T::Integer),
    prop("lineBreakMode", T::LineBreakMode),
    prop("adjustsFontSizeToFitWidth", T::Bool),
    prop("minimumScaleFactor", T::Double),
];

const TEXT_FIELD: &[PropertyDescriptor] = &[
    prop("placeholder", T::String),
    prop("secureTextEntry", T::Bool),
    prop("clearsOnBeginEditing", T::Bool),
];

const BUTTON: &[PropertyDescriptor] = &[
    prop("title", T::String),
    prop("titleColor", T::Color),
    prop("font", T::Font),
    prop("image", T::Image),
    prop("backgroundImage", T::Image),
    prop("contentEdgeInsets", T::EdgeInsets),
];

const IMAGE_VIEW: &[PropertyDescriptor] = &[
    prop("image", T::Image),
    prop("highlightedImage", T::Image),
    prop("contentMode", T::ContentMode),
];

const SCROLL_VIEW: &[PropertyDescriptor] = &[
    prop("contentSize", T::Size),
    prop("contentOffset", T::Point),
    prop("contentInset", T::EdgeInsets),
    prop("bounces", T::Bool),
    prop("pagingEnabled", T::Bool),
    prop("scrollEnabled", T::Bool),
    prop("showsHorizontalScrollIndicator", T::Bool),
    prop("showsVerticalScrollIndicator", T::Bool),
];

const TEXT_VIEW: &[PropertyDescriptor] = &[
    prop("editable", T::Bool),
    prop("selectable", T::Bool),
];

const LIST_VIEW: &[PropertyDescriptor] = &[
    prop("rowHeight", T::Double),
    prop("estimatedRowHeight", T::Double),
    prop("separatorColor", T::Color),
    prop("allowsSelection", T::Bool),
];

const STACK_VIEW: &[PropertyDescriptor] = &[
    prop("axis", T::Axis),
    prop("distribution", T::Distribution),
    prop("alignment", T::Alignment),
    prop("spacing", T::Double),
    prop("layoutMarginsRelativeArrangement", T::Bool),
];

const ACTIVITY_INDICATOR: &[PropertyDescriptor] = &[
    prop("activityIndicatorViewStyle", T::ActivityIndicatorStyle),
    prop("color", T::Color),
    prop("hidesWhenStopped", T::Bool),
    prop("animating", T::Bool),
];

const SWITCH: &[PropertyDescriptor] = &[
    prop("on", T::Bool),
    prop("onTintColor", T::Color),
    prop("thumbTintColor", T::Color),
];

const SLIDER: &[PropertyDescriptor] = &[
    prop("value", T::Float),
    prop("minimumValue", T::Float),
    prop("maximumValue", T::Float),
    prop("continuous", T::Bool),
    prop("minimumTrackTintColor", T::Color),
    prop("maximumTrackTintColor", T::Color),
];

const STEPPER: &[PropertyDescriptor] = &[
    prop("value", T::Double),
    prop("minimumValue", T::Double),
    prop("maximumValue", T::Double),
    prop("stepValue", T::Double),
    prop("wraps", T::Bool),
    prop("autorepeat", T::Bool),
];

const SEGMENTED_CONTROL: &[PropertyDescriptor] = &[
    prop("selectedSegmentIndex", T::Integer),
    prop("momentary", T::Bool),
];

const PAGE_CONTROL: &[PropertyDescriptor] = &[
    prop("numberOfPages", T::Integer),
    prop("currentPage", T::Integer),
    prop("hidesForSinglePage", T::Bool),
    prop("pageIndicatorTintColor", T::Color),
    prop("currentPageIndicatorTintColor", T::Color),
];

const SEARCH_BAR: &[PropertyDescriptor] = &[
    prop("text", T::String),
    prop("placeholder", T::String),
    prop("prompt", T::String),
    prop("barStyle", T::BarStyle),
    prop("barTintColor", T::Color),
    prop("showsCancelButton", T::Bool),
];

/// The capability layers of a kind, most general first.
fn layers(kind: ElementKind) -> &'static [&'static [PropertyDescriptor]] {
    match kind {
        ElementKind::Container | ElementKind::ComponentReference => &[VIEW],
        ElementKind::Label => &[VIEW, TEXT, LABEL],
        ElementKind::TextField => &[VIEW, CONTROL, TEXT, TEXT_FIELD],
        ElementKind::Button => &[VIEW, CONTROL, BUTTON],
        ElementKind::ImageView => &[VIEW, IMAGE_VIEW],
        ElementKind::ScrollView => &[VIEW, SCROLL_VIEW],
        ElementKind::TextView => &[VIEW, SCROLL_VIEW, TEXT, TEXT_VIEW],
        ElementKind::ListView => &[VIEW, SCROLL_VIEW, LIST_VIEW],
        ElementKind::StackView => &[VIEW, STACK_VIEW],
        ElementKind::ActivityIndicator => &[VIEW, ACTIVITY_INDICATOR],
        ElementKind::Switch => &[VIEW, CONTROL, SWITCH],
        ElementKind::Slider => &[VIEW, CONTROL, SLIDER],
        ElementKind::Stepper => &[VIEW, CONTROL, STEPPER],
        ElementKind::SegmentedControl => &[VIEW, CONTROL, SEGMENTED_CONTROL],
        ElementKind::PageControl => &[VIEW, CONTROL, PAGE_CONTROL],
        ElementKind::SearchBar => &[VIEW, SEARCH_BAR],
    }
}

/// Every property a kind accepts, concatenated from its capability layers.
///
/// Shadowed names appear once, at the position of their first declaration,
/// with the type of their last.
pub fn properties_for(kind: ElementKind) -> Vec<PropertyDescriptor> {
    let mut out: Vec<PropertyDescriptor> = Vec::new();
    for descriptor in layers(kind).iter().flat_map(|layer| layer.iter()) {
        match out.iter_mut().find(|d| d.name == descriptor.name) {
            Some(existing) => *existing = *descriptor,
            None => out.push(*descriptor),
        }
    }
    out
}

/// Look up one property of a kind.
pub fn lookup(kind: ElementKind, name: &str) -> Option<PropertyDescriptor> {
    layers(kind)
        .iter()
        .rev()
        .find_map(|layer| layer.iter().find(|d| d.name == name))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_inherits_view() {
        for kind in ElementKind::ALL {
            assert_eq!(
                lookup(kind, "backgroundColor").map(|d| d.property_type),
                Some(PropertyType::Color),
                "{kind}"
            );
        }
    }

    #[test]
    fn controls_inherit_control_layer() {
        assert!(lookup(ElementKind::Button, "enabled").is_some());
        assert!(lookup(ElementKind::Slider, "enabled").is_some());
        assert!(lookup(ElementKind::Label, "enabled").is_none());
    }

    #[test]
    fn list_view_inherits_scroll_view() {
        let names: Vec<_> = properties_for(ElementKind::ListView)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert!(names.contains(&"contentInset"));
        assert!(names.contains(&"rowHeight"));
        assert!(!names.contains(&"text"));
    }

    #[test]
    fn later_layers_shadow_earlier() {
        assert_eq!(
            lookup(ElementKind::Stepper, "value").map(|d| d.property_type),
            Some(PropertyType::Double)
        );
        assert_eq!(
            lookup(ElementKind::Slider, "value").map(|d| d.property_type),
            Some(PropertyType::Float)
        );
    }

    #[test]
    fn concatenation_has_no_duplicates() {
        for kind in ElementKind::ALL {
            let list = properties_for(kind);
            for (i, d) in list.iter().enumerate() {
                assert!(
                    list[i + 1..].iter().all(|other| other.name != d.name),
                    "{kind} lists {} twice",
                    d.name
                );
            }
        }
    }

    #[test]
    fn unknown_property() {
        assert_eq!(lookup(ElementKind::Label, "title"), None);
    }
}
