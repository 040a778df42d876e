//! Live application of definitions onto a running visual tree.

pub mod apply;
pub mod capability;
pub mod view;

pub use apply::{
    ApplyError, ApplyReport, ApplyWarning, ConstraintHandle, DefinitionLookup, LiveApplier,
    NoDefinitions, RootBinding,
};
pub use capability::{CapabilityRegistry, Factory, SetOutcome, Setter};
pub use view::{
    AxisPair, GenericElement, NodeId, ResolvedConstraint, ResolvedTarget, ViewNode, ViewTree,
    VisualElement,
};
