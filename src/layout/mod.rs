//! Layout constraint language: tokenizer, model, parser.

pub mod tokenizer;
pub mod model;
pub mod parser;

pub use model::{
    Anchor, AnchorKeyword, AxisPriorities, Constraint, ConstraintTarget, Layout, LayoutError,
    Priority, Relation,
};
pub use parser::parse_constraints;
