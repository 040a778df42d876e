//! Two-pass application of a component definition onto a live subtree.
//!
//! Pass 1 rebuilds the element hierarchy under the root: previous markup
//! children are detached, non-field nodes are destroyed, and every element is
//! reused (fields) or created, styled and attached. Pass 2 rebuilds every
//! node's constraint set from scratch once all nodes of the scope exist, so
//! constraints may reference elements declared later in the document.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::layout::{AxisPriorities, ConstraintTarget};
use crate::live::capability::{CapabilityRegistry, SetOutcome};
use crate::live::view::{
    AxisPair, GenericElement, NodeId, ResolvedConstraint, ResolvedTarget, ViewNode, ViewTree,
    VisualElement,
};
use crate::markup::{ComponentDefinition, Element, ElementKind};
use crate::style::{Resolved, StyleResolver};

// ---------------------------------------------------------------------------
// Errors and warnings
// ---------------------------------------------------------------------------

/// A failure that aborts one apply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("root node for `{0}` is no longer in the tree")]
    MissingRoot(String),

    #[error("`{type_name}` has no field `{field}`")]
    UnresolvedField { field: String, type_name: String },

    #[error("no factory or definition for type `{0}`")]
    UnresolvedType(String),

    #[error("unresolved constraint target `{target}` on `{element}` in {type_name}")]
    UnresolvedTarget {
        target: String,
        element: String,
        type_name: String,
    },
}

/// A property that could not be applied. The rest of the apply continues.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyWarning {
    pub type_name: String,
    pub element: String,
    pub property: Option<String>,
    pub message: String,
}

impl fmt::Display for ApplyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.element)?;
        if let Some(property) = &self.property {
            write!(f, ".{property}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Summary of a successful apply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplyReport {
    /// Nodes of the root's own scope, by element identity.
    pub named: BTreeMap<String, NodeId>,
    pub warnings: Vec<ApplyWarning>,
    /// Type names whose definitions were applied, outermost first.
    pub definitions: Vec<String>,
}

impl ApplyReport {
    fn push_warning(&mut self, warning: ApplyWarning) {
        warn!(
            type_name = %warning.type_name,
            element = %warning.element,
            property = warning.property.as_deref().unwrap_or(""),
            "{}",
            warning.message
        );
        self.warnings.push(warning);
    }
}

// ---------------------------------------------------------------------------
// RootBinding
// ---------------------------------------------------------------------------

/// Location of a captured constraint inside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintHandle {
    pub node: NodeId,
    pub index: usize,
}

/// A live component instance that markup is applied onto.
#[derive(Debug, Clone)]
pub struct RootBinding {
    pub node: NodeId,
    pub type_name: String,
    /// Document the definition is loaded from.
    pub path: Option<PathBuf>,
    /// Pre-existing field instances owned by the component.
    pub fields: HashMap<String, NodeId>,
    /// Create field instances that don't exist yet instead of failing.
    pub adopt_missing_fields: bool,
    /// Constraints captured under a name by the last apply.
    pub constraints: HashMap<String, ConstraintHandle>,
}

impl RootBinding {
    /// A binding whose fields must all be provided up front.
    pub fn new(node: NodeId, type_name: impl Into<String>) -> Self {
        Self {
            node,
            type_name: type_name.into(),
            path: None,
            fields: HashMap::new(),
            adopt_missing_fields: false,
            constraints: HashMap::new(),
        }
    }

    /// A binding that creates its field instances on first apply.
    pub fn anonymous(node: NodeId, type_name: impl Into<String>) -> Self {
        Self {
            adopt_missing_fields: true,
            ..Self::new(node, type_name)
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, node: NodeId) -> Self {
        self.fields.insert(name.into(), node);
        self
    }

    /// The field instance bound under `name`.
    pub fn field(&self, name: &str) -> Option<NodeId> {
        self.fields.get(name).copied()
    }

    /// A constraint captured under `name` by the last apply.
    pub fn captured<'t>(&self, tree: &'t ViewTree, name: &str) -> Option<&'t ResolvedConstraint> {
        let handle = self.constraints.get(name)?;
        tree.get(handle.node)?.constraints.get(handle.index)
    }
}

// ---------------------------------------------------------------------------
// Definition lookup
// ---------------------------------------------------------------------------

/// Source of definitions for component references that carry no inline one.
pub trait DefinitionLookup {
    fn definition(&self, type_name: &str) -> Option<&ComponentDefinition>;
}

impl DefinitionLookup for HashMap<String, ComponentDefinition> {
    fn definition(&self, type_name: &str) -> Option<&ComponentDefinition> {
        self.get(type_name)
    }
}

/// A lookup that knows no definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefinitions;

impl DefinitionLookup for NoDefinitions {
    fn definition(&self, _type_name: &str) -> Option<&ComponentDefinition> {
        None
    }
}

// ---------------------------------------------------------------------------
// LiveApplier
// ---------------------------------------------------------------------------

struct Placed<'d> {
    element: &'d Element,
    node: NodeId,
    parent: NodeId,
}

/// Elements placed in one definition scope during pass 1.
#[derive(Default)]
struct Scope<'d> {
    placed: Vec<Placed<'d>>,
    by_field: HashMap<&'d str, NodeId>,
    by_id: HashMap<&'d str, NodeId>,
    named: BTreeMap<String, NodeId>,
}

impl<'d> Scope<'d> {
    fn record(&mut self, element: &'d Element, node: NodeId, parent: NodeId) {
        if let Some(field) = &element.field {
            self.by_field.insert(field, node);
        }
        if let Some(id) = &element.layout.id {
            self.by_id.insert(id, node);
        }
        self.named.insert(element.name().to_string(), node);
        self.placed.push(Placed {
            element,
            node,
            parent,
        });
    }

    fn target(&self, target: &ConstraintTarget, parent: NodeId) -> Option<ResolvedTarget> {
        match target {
            ConstraintTarget::Parent => Some(ResolvedTarget::Node(parent)),
            ConstraintTarget::Field(name) => self
                .by_field
                .get(name.as_str())
                .or_else(|| self.by_id.get(name.as_str()))
                .map(|&node| ResolvedTarget::Node(node)),
            ConstraintTarget::LayoutId(id) => {
                self.by_id.get(id.as_str()).map(|&node| ResolvedTarget::Node(node))
            }
            ConstraintTarget::Constant(value) => Some(ResolvedTarget::Constant(*value)),
        }
    }
}

fn with_overrides(defaults: AxisPair, overrides: AxisPriorities) -> AxisPair {
    AxisPair {
        horizontal: overrides.horizontal.unwrap_or(defaults.horizontal),
        vertical: overrides.vertical.unwrap_or(defaults.vertical),
    }
}

/// Applies definitions onto live subtrees through a capability registry.
pub struct LiveApplier<'a> {
    registry: &'a CapabilityRegistry,
    styles: &'a StyleResolver,
    definitions: &'a dyn DefinitionLookup,
}

impl<'a> LiveApplier<'a> {
    pub fn new(registry: &'a CapabilityRegistry, styles: &'a StyleResolver) -> Self {
        Self {
            registry,
            styles,
            definitions: &NoDefinitions,
        }
    }

    /// Builder: resolve component references without inline definitions
    /// through `lookup`.
    pub fn with_definitions(mut self, lookup: &'a dyn DefinitionLookup) -> Self {
        self.definitions = lookup;
        self
    }

    /// Make the subtree under `root` match `definition`.
    ///
    /// Applying the same definition twice leaves the same named nodes and
    /// the same constraint sets.
    #[instrument(skip_all, fields(type_name = %definition.type_name))]
    pub fn apply(
        &self,
        tree: &mut ViewTree,
        root: &mut RootBinding,
        definition: &ComponentDefinition,
    ) -> Result<ApplyReport, ApplyError> {
        let mut report = ApplyReport::default();
        let mut active = Vec::new();
        let named = self.apply_scope(tree, root, definition, &mut report, &mut active)?;
        report.named = named;
        debug!(
            nodes = report.named.len(),
            warnings = report.warnings.len(),
            "applied definition"
        );
        Ok(report)
    }

    fn apply_scope(
        &self,
        tree: &mut ViewTree,
        root: &mut RootBinding,
        definition: &ComponentDefinition,
        report: &mut ApplyReport,
        active: &mut Vec<String>,
    ) -> Result<BTreeMap<String, NodeId>, ApplyError> {
        if !tree.contains(root.node) {
            return Err(ApplyError::MissingRoot(root.type_name.clone()));
        }
        active.push(definition.type_name.clone());
        report.definitions.push(definition.type_name.clone());

        // ---- Pass 1: hierarchy and properties ----
        self.clear(tree, root);
        let resolved = self.styles.resolve_root(definition);
        self.assign(
            tree,
            root.node,
            ElementKind::Container,
            resolved,
            (&definition.type_name, "self"),
            report,
        );

        let mut scope = Scope::default();
        for element in &definition.children {
            self.place(
                tree,
                root,
                definition,
                element,
                (root.node, ElementKind::Container),
                &mut scope,
                report,
                active,
            )?;
        }

        // ---- Pass 2: constraints ----
        self.constrain(tree, root, definition, &scope)?;

        active.pop();
        Ok(scope.named)
    }

    /// Detach everything under the root and destroy what isn't a field.
    fn clear(&self, tree: &mut ViewTree, root: &RootBinding) {
        let keep: HashSet<NodeId> = root.fields.values().copied().collect();
        let descendants = tree.descendants(root.node);
        for &node in &descendants {
            tree.detach(node);
        }
        for node in descendants {
            if !keep.contains(&node) {
                tree.remove(node);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn place<'d>(
        &self,
        tree: &mut ViewTree,
        root: &mut RootBinding,
        definition: &'d ComponentDefinition,
        element: &'d Element,
        (parent, parent_kind): (NodeId, ElementKind),
        scope: &mut Scope<'d>,
        report: &mut ApplyReport,
        active: &mut Vec<String>,
    ) -> Result<(), ApplyError> {
        let node = self.instance(tree, root, element)?;

        if let Some(view) = tree.get_mut(node) {
            view.name = Some(element.name().to_string());
            view.constraints.clear();
            view.compression = with_overrides(
                ViewNode::DEFAULT_COMPRESSION,
                element.layout.content_compression,
            );
            view.hugging = with_overrides(ViewNode::DEFAULT_HUGGING, element.layout.content_hugging);
        }

        let resolved = self.styles.resolve(element, definition);
        self.assign(
            tree,
            node,
            element.kind,
            resolved,
            (&definition.type_name, element.name()),
            report,
        );

        tree.attach(node, parent, parent_kind.arranges_children());
        scope.record(element, node, parent);

        if element.kind.accepts_children() {
            for child in &element.children {
                self.place(
                    tree,
                    root,
                    definition,
                    child,
                    (node, element.kind),
                    scope,
                    report,
                    active,
                )?;
            }
        }
        if element.kind == ElementKind::ComponentReference {
            self.apply_nested(tree, element, node, report, active)?;
        }
        Ok(())
    }

    /// The root's field instance for `element`, or a fresh node.
    fn instance(
        &self,
        tree: &mut ViewTree,
        root: &mut RootBinding,
        element: &Element,
    ) -> Result<NodeId, ApplyError> {
        let Some(field) = &element.field else {
            return Ok(tree.insert(ViewNode::new(self.create(element)?)));
        };
        if let Some(node) = root.field(field).filter(|&node| tree.contains(node)) {
            return Ok(node);
        }
        if !root.adopt_missing_fields {
            return Err(ApplyError::UnresolvedField {
                field: field.clone(),
                type_name: root.type_name.clone(),
            });
        }
        let node = tree.insert(ViewNode::new(self.create(element)?));
        root.fields.insert(field.clone(), node);
        Ok(node)
    }

    /// Factory, built-in factory, or anonymous wrapper, in that order.
    fn create(&self, element: &Element) -> Result<Box<dyn VisualElement>, ApplyError> {
        match &element.type_ref {
            Some(type_ref) if element.kind == ElementKind::ComponentReference => {
                let name = &type_ref.type_name;
                if let Some(created) = self.registry.create(name) {
                    return Ok(created);
                }
                if type_ref.definition.is_some() || self.definitions.definition(name).is_some() {
                    return Ok(Box::new(GenericElement::anonymous(name.clone())));
                }
                Err(ApplyError::UnresolvedType(name.clone()))
            }
            _ => self
                .registry
                .create_primitive(element.kind)
                .ok_or_else(|| ApplyError::UnresolvedType(element.kind.tag().to_string())),
        }
    }

    fn apply_nested(
        &self,
        tree: &mut ViewTree,
        element: &Element,
        node: NodeId,
        report: &mut ApplyReport,
        active: &mut Vec<String>,
    ) -> Result<(), ApplyError> {
        let Some(type_ref) = &element.type_ref else {
            return Ok(());
        };
        let nested = match type_ref.definition.as_deref() {
            Some(definition) => definition,
            None => match self.definitions.definition(&type_ref.type_name) {
                Some(definition) => definition,
                None => return Ok(()),
            },
        };
        if active.contains(&nested.type_name) {
            report.push_warning(ApplyWarning {
                type_name: active.last().cloned().unwrap_or_default(),
                element: element.name().to_string(),
                property: None,
                message: format!("`{}` contains itself; nested content skipped", nested.type_name),
            });
            return Ok(());
        }
        let mut binding = RootBinding::anonymous(node, nested.type_name.clone());
        self.apply_scope(tree, &mut binding, nested, report, active)?;
        Ok(())
    }

    fn assign(
        &self,
        tree: &mut ViewTree,
        node: NodeId,
        kind: ElementKind,
        resolved: Resolved,
        (type_name, element): (&str, &str),
        report: &mut ApplyReport,
    ) {
        let warning = |property: Option<&str>, message: String| ApplyWarning {
            type_name: type_name.to_string(),
            element: element.to_string(),
            property: property.map(str::to_string),
            message,
        };

        for skipped in resolved.skipped {
            report.push_warning(warning(
                None,
                format!("style `{}`: {}", skipped.style, skipped.error),
            ));
        }
        let Some(view) = tree.get_mut(node) else {
            return;
        };
        for property in resolved.properties {
            match self
                .registry
                .set(kind, view.element.as_mut(), &property.name, &property.value)
            {
                SetOutcome::Applied => {}
                SetOutcome::Unsupported => report.push_warning(warning(
                    Some(&property.name),
                    format!("unsupported on {}", view.element.type_name()),
                )),
                SetOutcome::Rejected(message) => {
                    report.push_warning(warning(Some(&property.name), message))
                }
            }
        }
    }

    /// Rebuild every placed node's constraints. All targets are resolved
    /// before any node is touched.
    fn constrain(
        &self,
        tree: &mut ViewTree,
        root: &mut RootBinding,
        definition: &ComponentDefinition,
        scope: &Scope<'_>,
    ) -> Result<(), ApplyError> {
        let mut rebuilt = Vec::with_capacity(scope.placed.len());
        for placed in &scope.placed {
            let mut constraints = Vec::with_capacity(placed.element.layout.constraints.len());
            for constraint in &placed.element.layout.constraints {
                let target = scope.target(&constraint.target, placed.parent).ok_or_else(|| {
                    ApplyError::UnresolvedTarget {
                        target: constraint.target.to_string(),
                        element: placed.element.name().to_string(),
                        type_name: definition.type_name.clone(),
                    }
                })?;
                constraints.push(ResolvedConstraint {
                    field: constraint.field.clone(),
                    anchor: constraint.anchor,
                    target,
                    target_anchor: constraint.target_anchor,
                    relation: constraint.relation,
                    multiplier: constraint.multiplier,
                    constant: constraint.constant,
                    priority: constraint.priority,
                });
            }
            rebuilt.push((placed.node, constraints));
        }

        root.constraints.clear();
        for (node, constraints) in rebuilt {
            for (index, constraint) in constraints.iter().enumerate() {
                if let Some(field) = &constraint.field {
                    root.constraints
                        .insert(field.clone(), ConstraintHandle { node, index });
                }
            }
            if let Some(view) = tree.get_mut(node) {
                view.constraints = constraints;
            }
        }
        Ok(())
    }
}
