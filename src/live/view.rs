//! The live visual tree: opaque elements in a slotmap arena.

use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::layout::{Anchor, Priority, Relation};
use crate::markup::ElementKind;
use crate::style::PropertyValue;

new_key_type! {
    /// Unique identifier for a live view node.
    pub struct NodeId;
}

const EMPTY_CHILDREN: &[NodeId] = &[];

// ---------------------------------------------------------------------------
// VisualElement
// ---------------------------------------------------------------------------

/// An opaque visual element instance owned by the tree.
///
/// Host code implements this for its own widget types and downcasts through
/// [`as_any`](VisualElement::as_any) inside registered setters.
pub trait VisualElement: Any + fmt::Debug {
    /// The type name used for diagnostics and factory lookup.
    fn type_name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Built-in element: records every property assigned to it.
///
/// Used for primitive kinds without a host factory and as the anonymous
/// wrapper for definitions with no registered type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenericElement {
    type_name: String,
    kind: Option<ElementKind>,
    properties: BTreeMap<String, PropertyValue>,
}

impl GenericElement {
    /// An element of a primitive kind.
    pub fn for_kind(kind: ElementKind) -> Self {
        Self {
            type_name: kind.tag().to_string(),
            kind: Some(kind),
            properties: BTreeMap::new(),
        }
    }

    /// A wrapper standing in for a component type.
    pub fn anonymous(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            kind: None,
            properties: BTreeMap::new(),
        }
    }

    /// The primitive kind, `None` for component wrappers.
    pub fn kind(&self) -> Option<ElementKind> {
        self.kind
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.properties.insert(name.into(), value);
    }
}

impl VisualElement for GenericElement {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// ViewNode
// ---------------------------------------------------------------------------

/// What an active constraint is attached to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedTarget {
    Node(NodeId),
    Constant(f64),
}

/// A constraint with its target resolved to a live node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConstraint {
    /// Captured name, if the markup declared one.
    pub field: Option<String>,
    pub anchor: Anchor,
    pub target: ResolvedTarget,
    pub target_anchor: Option<Anchor>,
    pub relation: Relation,
    pub multiplier: f64,
    pub constant: f64,
    pub priority: Priority,
}

/// A horizontal/vertical priority pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPair {
    pub horizontal: Priority,
    pub vertical: Priority,
}

impl AxisPair {
    /// Both axes at `priority`.
    pub const fn uniform(priority: Priority) -> Self {
        Self {
            horizontal: priority,
            vertical: priority,
        }
    }
}

/// One node of the live tree.
#[derive(Debug)]
pub struct ViewNode {
    pub element: Box<dyn VisualElement>,
    /// Identity from the markup that produced the node.
    pub name: Option<String>,
    pub constraints: Vec<ResolvedConstraint>,
    pub compression: AxisPair,
    pub hugging: AxisPair,
    /// Attached as an arranged child of a stacking parent.
    pub arranged: bool,
}

impl ViewNode {
    /// Default content compression resistance.
    pub const DEFAULT_COMPRESSION: AxisPair = AxisPair::uniform(Priority::High);
    /// Default content hugging.
    pub const DEFAULT_HUGGING: AxisPair = AxisPair::uniform(Priority::Low);

    /// Wrap an element with default priorities and no constraints.
    pub fn new(element: Box<dyn VisualElement>) -> Self {
        Self {
            element,
            name: None,
            constraints: Vec::new(),
            compression: Self::DEFAULT_COMPRESSION,
            hugging: Self::DEFAULT_HUGGING,
            arranged: false,
        }
    }

    /// Builder: set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Downcast the element.
    pub fn element_as<T: VisualElement>(&self) -> Option<&T> {
        self.element.as_any().downcast_ref::<T>()
    }

    /// Downcast the element mutably.
    pub fn element_as_mut<T: VisualElement>(&mut self) -> Option<&mut T> {
        self.element.as_any_mut().downcast_mut::<T>()
    }
}

// ---------------------------------------------------------------------------
// ViewTree
// ---------------------------------------------------------------------------

/// The live visual tree, backed by a slotmap arena.
///
/// Parent/child relationships are stored in secondary maps so that detaching
/// is O(siblings) and removal is O(subtree size). Nodes may exist detached
/// (no parent) without being removed.
#[derive(Debug, Default)]
pub struct ViewTree {
    nodes: SlotMap<NodeId, ViewNode>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
}

impl ViewTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a detached node.
    pub fn insert(&mut self, node: ViewNode) -> NodeId {
        let id = self.nodes.insert(node);
        self.children.insert(id, Vec::new());
        id
    }

    /// Insert a node as the last child of `parent`.
    ///
    /// Returns `None` (and inserts nothing) if `parent` does not exist.
    pub fn insert_child(&mut self, parent: NodeId, node: ViewNode) -> Option<NodeId> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        let id = self.insert(node);
        self.attach(id, parent, false);
        Some(id)
    }

    /// Attach `node` as the last child of `parent`, detaching it from any
    /// previous parent. Returns `false` if either node is missing or the
    /// attachment would create a cycle.
    pub fn attach(&mut self, node: NodeId, parent: NodeId, arranged: bool) -> bool {
        if !self.nodes.contains_key(node)
            || !self.nodes.contains_key(parent)
            || node == parent
            || self.ancestors(parent).contains(&node)
        {
            return false;
        }
        self.detach(node);
        self.parent.insert(node, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(node);
        }
        if let Some(view) = self.nodes.get_mut(node) {
            view.arranged = arranged;
        }
        true
    }

    /// Detach `node` from its parent, keeping its subtree.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.parent.remove(node) {
            if let Some(siblings) = self.children.get_mut(parent) {
                siblings.retain(|&child| child != node);
            }
        }
        if let Some(view) = self.nodes.get_mut(node) {
            view.arranged = false;
        }
    }

    /// Remove a node and all its descendants.
    ///
    /// Returns the removed node, or `None` if it didn't exist.
    pub fn remove(&mut self, id: NodeId) -> Option<ViewNode> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        self.detach(id);

        let mut queue = VecDeque::from([id]);
        let mut removed = None;
        while let Some(current) = queue.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                queue.extend(kids);
            }
            self.parent.remove(current);
            let node = self.nodes.remove(current);
            if current == id {
                removed = node;
            }
        }
        removed
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Children of a node; empty if it has none or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Ancestors from the immediate parent up to the topmost node.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    pub fn get(&self, id: NodeId) -> Option<&ViewNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order depth-first traversal starting from (and including) `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    /// Every descendant of `start`, pre-order, excluding `start`.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut all = self.walk_depth_first(start);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    /// First descendant of `start` (pre-order) with the given name.
    pub fn find_named(&self, start: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(start)
            .into_iter()
            .find(|&id| self.nodes.get(id).and_then(|n| n.name.as_deref()) == Some(name))
    }
}
