//! Integration tests for live-layout.
//!
//! These tests exercise the public API from outside the crate: parsing a
//! document, generating code for it, applying it live, and reloading it from
//! disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use live_layout::codegen::generate_source;
use live_layout::layout::{parse_constraints, Anchor, ConstraintTarget, Priority, Relation};
use live_layout::live::{
    CapabilityRegistry, GenericElement, LiveApplier, NodeId, ResolvedTarget, RootBinding,
    ViewNode, ViewTree,
};
use live_layout::markup::{parse_definition, ParseError};
use live_layout::reload::{Diagnostics, ReloadConfig, ReloadEvent, ReloadManager};
use live_layout::style::{Color, PropertyValue, StyleResolver};
use pretty_assertions::assert_eq;

const PROFILE: &str = r##"
<Component type="ProfileView" rootView="true" backgroundColor="white">
    <styles>
        <LabelStyle name="caption" textColor="#00FF0080" font="12"/>
    </styles>
    <ImageView field="avatar" layout:id="avatarImage" layout:top="super offset(16)"
               layout:size="== 64" layout:centerX="super"/>
    <Label field="name" style="caption" text="Name"
           layout:below="nameTop = id:avatarImage offset(8) @low"
           layout:fillHorizontally="super inset(16)"/>
    <StackView field="buttons" axis="horizontal" layout:below="name offset(12)">
        <Button title="Follow"/>
        <Button title="Message"/>
    </StackView>
</Component>
"##;

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "live-layout-integration-{}-{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.0.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Named nodes with their constraints rendered against node names.
fn constraint_sets(tree: &ViewTree, named: &BTreeMap<String, NodeId>) -> Vec<(String, Vec<String>)> {
    named
        .iter()
        .map(|(name, &node)| {
            let rendered = tree
                .get(node)
                .unwrap()
                .constraints
                .iter()
                .map(|c| {
                    let target = match c.target {
                        ResolvedTarget::Node(id) => tree
                            .get(id)
                            .and_then(|n| n.name.clone())
                            .unwrap_or_else(|| "root".to_string()),
                        ResolvedTarget::Constant(value) => value.to_string(),
                    };
                    format!(
                        "{:?} {} {target} x{} {:+} {:?}",
                        c.anchor, c.relation, c.multiplier, c.constant, c.priority
                    )
                })
                .collect();
            (name.clone(), rendered)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Constraint language
// ---------------------------------------------------------------------------

#[test]
fn test_edges_expand_to_four_parent_constraints() {
    let constraints = parse_constraints("edges", "== super").unwrap();
    let anchors: Vec<_> = constraints.iter().map(|c| c.anchor).collect();
    assert_eq!(anchors, [Anchor::Left, Anchor::Right, Anchor::Top, Anchor::Bottom]);
    for c in &constraints {
        assert_eq!(c.relation, Relation::Equal);
        assert_eq!(c.target, ConstraintTarget::Parent);
        assert_eq!(c.multiplier, 1.0);
        assert_eq!(c.constant, 0.0);
        assert_eq!(c.priority, Priority::Required);
    }
}

#[test]
fn test_numeric_width_with_priority() {
    let constraints = parse_constraints("width", "== 44 @high").unwrap();
    assert_eq!(constraints.len(), 1);
    assert_eq!(constraints[0].anchor, Anchor::Width);
    assert_eq!(constraints[0].target, ConstraintTarget::Constant(44.0));
    assert_eq!(constraints[0].priority, Priority::High);
}

#[test]
fn test_below_with_captured_field() {
    let constraints = parse_constraints("below", "headerBottom = id:header offset(8) @low").unwrap();
    let c = &constraints[0];
    assert_eq!(c.field.as_deref(), Some("headerBottom"));
    assert_eq!(c.anchor, Anchor::Top);
    assert_eq!(c.target, ConstraintTarget::LayoutId("header".into()));
    assert_eq!(c.target_anchor, Some(Anchor::Bottom));
    assert_eq!(c.constant, 8.0);
    assert_eq!(c.priority, Priority::Low);
}

// ---------------------------------------------------------------------------
// Markup and values
// ---------------------------------------------------------------------------

#[test]
fn test_unknown_element_names_the_tag() {
    let err = parse_definition(r#"<Component type="A"><Foo/></Component>"#).unwrap_err();
    assert!(matches!(err, ParseError::UnknownElement(_)));
    assert!(err.to_string().contains("Foo"));
}

#[test]
fn test_color_values() {
    let translucent = Color::parse("#00FF0080").unwrap();
    assert_eq!(
        (translucent.red, translucent.green, translucent.blue),
        (0.0, 1.0, 0.0)
    );
    assert_eq!(translucent.alpha, 128.0 / 255.0);
    assert_eq!(Color::parse("white").unwrap(), Color::rgba(1.0, 1.0, 1.0, 1.0));
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

#[test]
fn test_generated_source_builds_every_element() {
    let def = parse_definition(PROFILE).unwrap();
    let source = generate_source(&def, &StyleResolver::new()).unwrap();
    assert!(source.contains("impl ProfileView"));
    assert!(source.contains("fn build_layout"));
    assert!(source.contains("add_arranged_subview"));
    assert!(source.contains("self . nameTop ="), "{source}");
}

// ---------------------------------------------------------------------------
// Live application
// ---------------------------------------------------------------------------

#[test]
fn test_apply_twice_is_idempotent() {
    let def = parse_definition(PROFILE).unwrap();
    let registry = CapabilityRegistry::with_builtins();
    let styles = StyleResolver::new();
    let applier = LiveApplier::new(&registry, &styles);

    let mut tree = ViewTree::new();
    let node = tree.insert(ViewNode::new(Box::new(GenericElement::anonymous("ProfileView"))));
    let mut root = RootBinding::anonymous(node, "ProfileView");

    let first = applier.apply(&mut tree, &mut root, &def).unwrap();
    let first_sets = constraint_sets(&tree, &first.named);
    let second = applier.apply(&mut tree, &mut root, &def).unwrap();

    assert_eq!(
        first.named.keys().collect::<Vec<_>>(),
        second.named.keys().collect::<Vec<_>>()
    );
    assert_eq!(first_sets, constraint_sets(&tree, &second.named));
    assert!(second.warnings.is_empty());

    let captured = root.captured(&tree, "nameTop").unwrap();
    assert_eq!(captured.target, ResolvedTarget::Node(root.field("avatar").unwrap()));
    assert_eq!(captured.priority, Priority::Low);
}

#[test]
fn test_apply_sets_styled_properties() {
    let def = parse_definition(PROFILE).unwrap();
    let registry = CapabilityRegistry::with_builtins();
    let styles = StyleResolver::new();
    let mut tree = ViewTree::new();
    let node = tree.insert(ViewNode::new(Box::new(GenericElement::anonymous("ProfileView"))));
    let mut root = RootBinding::anonymous(node, "ProfileView");
    LiveApplier::new(&registry, &styles)
        .apply(&mut tree, &mut root, &def)
        .unwrap();

    let root_element = tree.get(node).unwrap().element_as::<GenericElement>().unwrap();
    assert_eq!(
        root_element.property("backgroundColor"),
        Some(&PropertyValue::Color(Color::rgba(1.0, 1.0, 1.0, 1.0)))
    );
    let name = tree
        .get(root.field("name").unwrap())
        .unwrap()
        .element_as::<GenericElement>()
        .unwrap();
    assert_eq!(name.property("text"), Some(&PropertyValue::String("Name".into())));
    assert!(name.property("textColor").is_some());
}

// ---------------------------------------------------------------------------
// Reload
// ---------------------------------------------------------------------------

#[test]
fn test_shared_style_change_reapplies_each_root_once() {
    let dir = TempDir::new("styles");
    let theme = dir.write(
        "theme.xml",
        r#"<styleGroup name="Theme"><LabelStyle name="title" text="v1"/></styleGroup>"#,
    );
    let doc = r#"<Component type="Card"><Label field="title" style="Theme:title"/></Component>"#;
    let card = dir.write("card.ui.xml", doc);

    let mut manager = ReloadManager::new(
        ReloadConfig::new()
            .with_watch_files(false)
            .with_shared_styles(&theme),
        CapabilityRegistry::with_builtins(),
    );
    manager.start().unwrap();

    let mut roots = Vec::new();
    for _ in 0..3 {
        let node = manager
            .tree_mut()
            .insert(ViewNode::new(Box::new(GenericElement::anonymous("Card"))));
        roots.push(
            manager
                .register(RootBinding::anonymous(node, "Card").with_path(&card))
                .unwrap(),
        );
    }
    manager.process_pending();

    std::fs::remove_file(&card).unwrap();
    dir.write(
        "theme.xml",
        r#"<styleGroup name="Theme"><LabelStyle name="title" text="v2"/></styleGroup>"#,
    );
    let mut outcome = manager.handle(ReloadEvent::Changed(theme));
    outcome.reapplied.sort();
    roots.sort();
    assert_eq!(outcome.reapplied, roots);
    assert!(manager.diagnostics().is_empty());

    for id in roots {
        let title = manager.root(id).unwrap().field("title").unwrap();
        let text = manager
            .tree()
            .get(title)
            .unwrap()
            .element_as::<GenericElement>()
            .unwrap()
            .property("text")
            .cloned();
        assert_eq!(text, Some(PropertyValue::String("v2".into())));
    }
}

#[test]
fn test_broken_document_shows_in_overlay() {
    let dir = TempDir::new("overlay");
    let card = dir.write("card.ui.xml", r#"<Component type="Card"><Foo/></Component>"#);
    let mut manager = ReloadManager::new(
        ReloadConfig::new().with_watch_files(false),
        CapabilityRegistry::with_builtins(),
    );
    let node = manager
        .tree_mut()
        .insert(ViewNode::new(Box::new(GenericElement::anonymous("Card"))));
    manager
        .register(RootBinding::anonymous(node, "Card").with_path(&card))
        .unwrap();
    manager.process_pending();

    // Re-key the overlay by file name so the snapshot is stable.
    let mut relative = Diagnostics::new();
    for (path, message) in manager.diagnostics().iter() {
        relative.record(path.file_name().unwrap(), message);
    }
    insta::assert_snapshot!(relative.overlay().trim_end(), @r"
    card.ui.xml
      invalid document: unknown element <Foo>
    ");
}

#[tokio::test]
async fn test_watcher_drives_reload() {
    let dir = TempDir::new("watch");
    let card = dir.write(
        "card.ui.xml",
        r#"<Component type="Card"><Label field="title" text="before"/></Component>"#,
    );
    let mut manager = ReloadManager::new(
        ReloadConfig::new().with_poll_interval(std::time::Duration::from_millis(5)),
        CapabilityRegistry::with_builtins(),
    );
    let node = manager
        .tree_mut()
        .insert(ViewNode::new(Box::new(GenericElement::anonymous("Card"))));
    let id = manager
        .register(RootBinding::anonymous(node, "Card").with_path(&card))
        .unwrap();
    manager.process_pending();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    dir.write(
        "card.ui.xml",
        r#"<Component type="Card"><Label field="title" text="after the edit"/></Component>"#,
    );
    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), manager.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.reapplied, vec![id]);
}
