//! Constraint model: Anchor, Relation, Priority, ConstraintTarget, Constraint, Layout.

use std::fmt;

use crate::layout::parser::parse_constraints;

/// Errors from the constraint language.
///
/// Every variant carries the offending fragment of the attribute so that the
/// diagnostic overlay can point at the exact typo.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("unknown layout attribute `{0}`")]
    UnknownAttribute(String),
    #[error("unknown relation `{0}`")]
    UnknownRelation(String),
    #[error("unknown target anchor `{0}`")]
    UnknownTargetAnchor(String),
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("invalid argument for modifier `{modifier}`: `{fragment}`")]
    InvalidModifier { modifier: String, fragment: String },
    #[error("unknown priority `{0}`")]
    UnknownPriority(String),
    #[error("`{attribute}` expands to several anchors and cannot take the explicit target anchor `{target_anchor}`")]
    AmbiguousTargetAnchor {
        attribute: String,
        target_anchor: String,
    },
    #[error("numeric target `{value}` is only valid for width, height or size, not `{attribute}`")]
    NumericTargetNotAllowed { attribute: String, value: String },
    #[error("unexpected character `{fragment}` at offset {position}")]
    UnexpectedCharacter { fragment: String, position: usize },
    #[error("unexpected `{0}` in constraint")]
    UnexpectedToken(String),
    #[error("unexpected end of constraint: {0}")]
    UnexpectedEnd(String),
}

// ---------------------------------------------------------------------------
// Anchor
// ---------------------------------------------------------------------------

/// A single edge, dimension or alignment line of a visual element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Top,
    Bottom,
    Leading,
    Trailing,
    Left,
    Right,
    Width,
    Height,
    CenterX,
    CenterY,
    FirstBaseline,
    LastBaseline,
}

impl Anchor {
    /// Every anchor, in declaration order.
    pub const ALL: [Anchor; 12] = [
        Anchor::Top,
        Anchor::Bottom,
        Anchor::Leading,
        Anchor::Trailing,
        Anchor::Left,
        Anchor::Right,
        Anchor::Width,
        Anchor::Height,
        Anchor::CenterX,
        Anchor::CenterY,
        Anchor::FirstBaseline,
        Anchor::LastBaseline,
    ];

    /// The markup keyword for this anchor.
    pub fn keyword(self) -> &'static str {
        match self {
            Anchor::Top => "top",
            Anchor::Bottom => "bottom",
            Anchor::Leading => "leading",
            Anchor::Trailing => "trailing",
            Anchor::Left => "left",
            Anchor::Right => "right",
            Anchor::Width => "width",
            Anchor::Height => "height",
            Anchor::CenterX => "centerX",
            Anchor::CenterY => "centerY",
            Anchor::FirstBaseline => "firstBaseline",
            Anchor::LastBaseline => "lastBaseline",
        }
    }

    /// Look up an anchor by its markup keyword.
    pub fn from_keyword(keyword: &str) -> Option<Anchor> {
        Anchor::ALL.into_iter().find(|a| a.keyword() == keyword)
    }

    /// Whether this anchor is a dimension (accepts numeric literal targets).
    pub fn is_size(self) -> bool {
        matches!(self, Anchor::Width | Anchor::Height)
    }

    /// Sign applied to `inset(..)` amounts so that insets always shrink the
    /// element: positive for leading-side anchors, negative for trailing-side
    /// anchors and dimensions.
    pub fn inset_direction(self) -> f64 {
        match self {
            Anchor::Top
            | Anchor::Leading
            | Anchor::Left
            | Anchor::CenterX
            | Anchor::CenterY
            | Anchor::FirstBaseline => 1.0,
            Anchor::Bottom
            | Anchor::Trailing
            | Anchor::Right
            | Anchor::Width
            | Anchor::Height
            | Anchor::LastBaseline => -1.0,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// How the anchor relates to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Relation {
    #[default]
    Equal,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl Relation {
    /// Parse a relation token: `==`, `<=`, `>=` or a `:eq`-style keyword.
    pub fn from_token(text: &str) -> Option<Relation> {
        match text {
            "==" | ":eq" => Some(Relation::Equal),
            "<=" | ":lt" | ":lte" => Some(Relation::LessThanOrEqual),
            ">=" | ":gt" | ":gte" => Some(Relation::GreaterThanOrEqual),
            _ => None,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::Equal => "==",
            Relation::LessThanOrEqual => "<=",
            Relation::GreaterThanOrEqual => ">=",
        })
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Constraint (and content compression/hugging) priority.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Priority {
    #[default]
    Required,
    High,
    Medium,
    Low,
    Custom(f32),
}

impl Priority {
    /// Numeric value on the 0..=1000 scale.
    pub fn value(self) -> f32 {
        match self {
            Priority::Required => 1000.0,
            Priority::High => 750.0,
            Priority::Medium => 500.0,
            Priority::Low => 250.0,
            Priority::Custom(v) => v,
        }
    }

    /// Parse `required`, `high`, `medium`, `low` or a number.
    pub fn parse(text: &str) -> Result<Priority, LayoutError> {
        match text {
            "required" => Ok(Priority::Required),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => other
                .parse::<f32>()
                .ok()
                .filter(|v| (0.0..=1000.0).contains(v))
                .map(Priority::Custom)
                .ok_or_else(|| LayoutError::UnknownPriority(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Constraint
// ---------------------------------------------------------------------------

/// What a constraint's anchor is related to.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintTarget {
    /// The element's parent (`super`).
    Parent,
    /// A sibling referenced by field name.
    Field(String),
    /// A sibling referenced by `id:<name>`.
    LayoutId(String),
    /// A numeric literal; only legal for size anchors.
    Constant(f64),
}

impl fmt::Display for ConstraintTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintTarget::Parent => f.write_str("super"),
            ConstraintTarget::Field(name) => f.write_str(name),
            ConstraintTarget::LayoutId(name) => write!(f, "id:{name}"),
            ConstraintTarget::Constant(value) => write!(f, "{value}"),
        }
    }
}

/// One parsed layout relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Name under which the built constraint is captured for external use.
    pub field: Option<String>,
    pub anchor: Anchor,
    pub target: ConstraintTarget,
    /// `None` for numeric targets.
    pub target_anchor: Option<Anchor>,
    pub relation: Relation,
    pub multiplier: f64,
    pub constant: f64,
    pub priority: Priority,
}

impl Constraint {
    /// A required `anchor == super.anchor` constraint.
    pub fn new(anchor: Anchor) -> Self {
        Self {
            field: None,
            anchor,
            target: ConstraintTarget::Parent,
            target_anchor: Some(anchor),
            relation: Relation::Equal,
            multiplier: 1.0,
            constant: 0.0,
            priority: Priority::Required,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout attributes
// ---------------------------------------------------------------------------

/// The anchor keyword named by a `layout:` attribute.
///
/// Plain anchors map to themselves; the remaining keywords either expand to
/// several anchors or imply a different target anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKeyword {
    Single(Anchor),
    Size,
    Center,
    Edges,
    FillHorizontally,
    FillVertically,
    Before,
    After,
    Above,
    Below,
}

impl AnchorKeyword {
    /// Look up a keyword by attribute name (without the `layout:` prefix).
    pub fn from_name(name: &str) -> Option<AnchorKeyword> {
        if let Some(anchor) = Anchor::from_keyword(name) {
            return Some(AnchorKeyword::Single(anchor));
        }
        Some(match name {
            "size" => AnchorKeyword::Size,
            "center" => AnchorKeyword::Center,
            "edges" => AnchorKeyword::Edges,
            "fillHorizontally" => AnchorKeyword::FillHorizontally,
            "fillVertically" => AnchorKeyword::FillVertically,
            "before" => AnchorKeyword::Before,
            "after" => AnchorKeyword::After,
            "above" => AnchorKeyword::Above,
            "below" => AnchorKeyword::Below,
            _ => return None,
        })
    }

    /// The `(anchor, default target anchor)` pairs this keyword expands to.
    pub fn expansion(self) -> Vec<(Anchor, Anchor)> {
        use Anchor::*;
        match self {
            AnchorKeyword::Single(anchor) => vec![(anchor, anchor)],
            AnchorKeyword::Size => vec![(Width, Width), (Height, Height)],
            AnchorKeyword::Center => vec![(CenterX, CenterX), (CenterY, CenterY)],
            AnchorKeyword::Edges => {
                vec![(Left, Left), (Right, Right), (Top, Top), (Bottom, Bottom)]
            }
            AnchorKeyword::FillHorizontally => vec![(Left, Left), (Right, Right)],
            AnchorKeyword::FillVertically => vec![(Top, Top), (Bottom, Bottom)],
            AnchorKeyword::Before => vec![(Trailing, Leading)],
            AnchorKeyword::After => vec![(Leading, Trailing)],
            AnchorKeyword::Above => vec![(Bottom, Top)],
            AnchorKeyword::Below => vec![(Top, Bottom)],
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Per-axis priority override (content compression resistance or hugging).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisPriorities {
    pub horizontal: Option<Priority>,
    pub vertical: Option<Priority>,
}

impl AxisPriorities {
    /// Whether neither axis is set.
    pub fn is_empty(&self) -> bool {
        self.horizontal.is_none() && self.vertical.is_none()
    }
}

/// Everything declared by an element's `layout:` attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    /// Explicit `layout:id`, referenced by `id:<name>` targets.
    pub id: Option<String>,
    pub constraints: Vec<Constraint>,
    pub content_compression: AxisPriorities,
    pub content_hugging: AxisPriorities,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one `layout:<name>="<value>"` attribute.
    pub fn apply_attribute(&mut self, name: &str, value: &str) -> Result<(), LayoutError> {
        match name {
            "id" => self.id = Some(value.trim().to_string()),
            "compressionPriority" => {
                let p = Priority::parse(value.trim())?;
                self.content_compression = AxisPriorities {
                    horizontal: Some(p),
                    vertical: Some(p),
                };
            }
            "horizontalCompressionPriority" => {
                self.content_compression.horizontal = Some(Priority::parse(value.trim())?);
            }
            "verticalCompressionPriority" => {
                self.content_compression.vertical = Some(Priority::parse(value.trim())?);
            }
            "huggingPriority" => {
                let p = Priority::parse(value.trim())?;
                self.content_hugging = AxisPriorities {
                    horizontal: Some(p),
                    vertical: Some(p),
                };
            }
            "horizontalHuggingPriority" => {
                self.content_hugging.horizontal = Some(Priority::parse(value.trim())?);
            }
            "verticalHuggingPriority" => {
                self.content_hugging.vertical = Some(Priority::parse(value.trim())?);
            }
            _ => self.constraints.extend(parse_constraints(name, value)?),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_keyword_round_trip() {
        for anchor in Anchor::ALL {
            assert_eq!(Anchor::from_keyword(anchor.keyword()), Some(anchor));
        }
        assert_eq!(Anchor::from_keyword("middle"), None);
    }

    #[test]
    fn inset_direction_shrinks_from_both_sides() {
        assert_eq!(Anchor::Leading.inset_direction(), 1.0);
        assert_eq!(Anchor::Trailing.inset_direction(), -1.0);
        assert_eq!(Anchor::Top.inset_direction(), 1.0);
        assert_eq!(Anchor::Bottom.inset_direction(), -1.0);
    }

    #[test]
    fn priority_values() {
        assert_eq!(Priority::Required.value(), 1000.0);
        assert_eq!(Priority::High.value(), 750.0);
        assert_eq!(Priority::Medium.value(), 500.0);
        assert_eq!(Priority::Low.value(), 250.0);
        assert_eq!(Priority::parse("999").unwrap(), Priority::Custom(999.0));
    }

    #[test]
    fn priority_rejects_unknown_keyword() {
        assert_eq!(
            Priority::parse("urgent"),
            Err(LayoutError::UnknownPriority("urgent".into()))
        );
        assert!(Priority::parse("1200").is_err());
    }

    #[test]
    fn relation_tokens() {
        assert_eq!(Relation::from_token("=="), Some(Relation::Equal));
        assert_eq!(Relation::from_token(":lt"), Some(Relation::LessThanOrEqual));
        assert_eq!(Relation::from_token(">="), Some(Relation::GreaterThanOrEqual));
        assert_eq!(Relation::from_token(":ne"), None);
    }

    #[test]
    fn keyword_expansion() {
        assert_eq!(AnchorKeyword::from_name("edges").unwrap().expansion().len(), 4);
        assert_eq!(
            AnchorKeyword::from_name("below").unwrap().expansion(),
            vec![(Anchor::Top, Anchor::Bottom)]
        );
        assert_eq!(AnchorKeyword::from_name("nowhere"), None);
    }

    #[test]
    fn layout_priority_attributes() {
        let mut layout = Layout::new();
        layout.apply_attribute("compressionPriority", "low").unwrap();
        layout.apply_attribute("verticalHuggingPriority", "high").unwrap();
        assert_eq!(layout.content_compression.horizontal, Some(Priority::Low));
        assert_eq!(layout.content_compression.vertical, Some(Priority::Low));
        assert_eq!(layout.content_hugging.horizontal, None);
        assert_eq!(layout.content_hugging.vertical, Some(Priority::High));
    }

    #[test]
    fn layout_id_and_constraints_accumulate() {
        let mut layout = Layout::new();
        layout.apply_attribute("id", "header").unwrap();
        layout.apply_attribute("top", "super").unwrap();
        layout.apply_attribute("fillHorizontally", "super inset(8)").unwrap();
        assert_eq!(layout.id.as_deref(), Some("header"));
        assert_eq!(layout.constraints.len(), 3);
    }

    #[test]
    fn layout_unknown_attribute() {
        let mut layout = Layout::new();
        let err = layout.apply_attribute("diagonal", "super").unwrap_err();
        assert_eq!(err, LayoutError::UnknownAttribute("diagonal".into()));
    }
}
