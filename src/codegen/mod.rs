//! Static code generation: [`ComponentDefinition`] → Rust construction code.
//!
//! Every non-anonymous definition reachable from the document becomes one
//!
//! ```text
//! impl <Type> {
//!     pub fn build_layout(&mut self) { ... }
//! }
//! ```
//!
//! item. The body is emitted in two passes: pass 1 creates, configures and
//! attaches every element in document pre-order, pass 2 activates each
//! element's constraints. Constraint targets are resolved only after pass 1
//! has named every element, so forward references are legal.

mod value;

use std::collections::{HashMap, HashSet};

use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};
use tracing::{debug, instrument, warn};

use crate::layout::{Constraint, ConstraintTarget, Priority, Relation};
use crate::markup::{ComponentDefinition, Element, ElementKind};
use crate::style::StyleResolver;

/// Errors from code generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerateError {
    #[error("unresolved constraint target `{target}` on `{element}` in {type_name}")]
    UnresolvedTarget {
        target: String,
        element: String,
        type_name: String,
    },
    #[error("`{0}` is not a valid Rust identifier")]
    InvalidIdentifier(String),
    #[error("non-finite number `{0}` cannot be emitted")]
    NonFiniteNumber(String),
}

/// Generate one `impl` block per non-anonymous definition in `definition`.
#[instrument(skip_all, fields(type_name = %definition.type_name))]
pub fn generate(
    definition: &ComponentDefinition,
    styles: &StyleResolver,
) -> Result<TokenStream, GenerateError> {
    let mut items = Vec::new();
    for def in definition.component_definitions() {
        if def.is_anonymous {
            continue;
        }
        items.push(DefinitionBuilder::new(def, styles).build()?);
    }
    debug!(items = items.len(), "generated layout code");
    Ok(quote!(#(#items)*))
}

/// [`generate`], rendered as source text.
pub fn generate_source(
    definition: &ComponentDefinition,
    styles: &StyleResolver,
) -> Result<String, GenerateError> {
    generate(definition, styles).map(|tokens| tokens.to_string())
}

/// Parse `name` as a Rust identifier.
fn ident(name: &str) -> Result<Ident, GenerateError> {
    syn::parse_str::<Ident>(name).map_err(|_| GenerateError::InvalidIdentifier(name.to_string()))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// The element an element is attached to.
#[derive(Clone)]
enum Parent {
    /// The component being built (`self`).
    Root,
    Local(Ident),
}

impl Parent {
    fn receiver(&self) -> TokenStream {
        match self {
            Parent::Root => quote!(self),
            Parent::Local(ident) => quote!(#ident),
        }
    }

    fn reference(&self) -> TokenStream {
        match self {
            Parent::Root => quote!(&*self),
            Parent::Local(ident) => quote!(&#ident),
        }
    }
}

/// Name lookup for one definition scope (the built type or an inlined
/// anonymous definition).
#[derive(Default)]
struct ScopeTable {
    by_field: HashMap<String, Ident>,
    by_id: HashMap<String, Ident>,
}

/// An element that passed pass 1, with what pass 2 needs to constrain it.
struct Placed<'a> {
    element: &'a Element,
    ident: Ident,
    parent: Parent,
    scope: usize,
}

struct DefinitionBuilder<'a> {
    definition: &'a ComponentDefinition,
    styles: &'a StyleResolver,
    used: HashSet<String>,
    scopes: Vec<ScopeTable>,
    placed: Vec<Placed<'a>>,
    statements: Vec<TokenStream>,
}

impl<'a> DefinitionBuilder<'a> {
    fn new(definition: &'a ComponentDefinition, styles: &'a StyleResolver) -> Self {
        Self {
            definition,
            styles,
            used: HashSet::new(),
            scopes: Vec::new(),
            placed: Vec::new(),
            statements: Vec::new(),
        }
    }

    fn build(mut self) -> Result<TokenStream, GenerateError> {
        let type_ident = ident(&self.definition.type_name)?;

        let root = self.styles.resolve_root(self.definition);
        self.report_skipped("self", &root.skipped);
        for property in &root.properties {
            let setter = format_ident!("set_{}", value::snake_case(&property.name));
            let value = value::property_value(&property.value)?;
            self.statements.push(quote!(self.#setter(#value);));
        }

        let definition = self.definition;
        self.scopes.push(ScopeTable::default());
        for element in &definition.children {
            self.place(element, definition, Parent::Root, false, 0, None)?;
        }

        let mut constraints = Vec::new();
        for placed in &self.placed {
            for constraint in &placed.element.layout.constraints {
                constraints.push(self.constraint(placed, constraint)?);
            }
        }

        let statements = &self.statements;
        Ok(quote! {
            impl #type_ident {
                pub fn build_layout(&mut self) {
                    #(#statements)*
                    #(#constraints)*
                }
            }
        })
    }

    fn report_skipped(&self, element: &str, skipped: &[crate::style::SkippedProperty]) {
        for entry in skipped {
            warn!(
                type_name = %self.definition.type_name,
                element,
                style = %entry.style,
                error = %entry.error,
                "property not emitted"
            );
        }
    }

    /// A fresh local identifier for an element.
    fn local_ident(&mut self, element: &Element, prefix: Option<&str>) -> Result<Ident, GenerateError> {
        ident(element.name())?;
        let base = match prefix {
            Some(prefix) => format!("{prefix}_{}", element.name()),
            None => element.name().to_string(),
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while !self.used.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{base}_{n}");
        }
        ident(&candidate)
    }

    /// Pass 1 for one element and its subtree.
    fn place(
        &mut self,
        element: &'a Element,
        scope_definition: &'a ComponentDefinition,
        parent: Parent,
        arranged: bool,
        scope: usize,
        prefix: Option<String>,
    ) -> Result<(), GenerateError> {
        let local = self.local_ident(element, prefix.as_deref())?;
        let owned_field = match (&element.field, scope) {
            (Some(field), 0) => Some(ident(field)?),
            _ => None,
        };

        let nested = element.nested_definition();
        let constructor = if let Some(field) = &owned_field {
            quote!(self.#field.clone())
        } else {
            match (element.kind, &element.type_ref) {
                (ElementKind::ComponentReference, Some(reference)) if reference.is_anonymous() => {
                    let name = &reference.type_name;
                    quote!(AnonymousComponent::new(#name))
                }
                (ElementKind::ComponentReference, Some(reference)) => {
                    let ty = ident(&reference.type_name)?;
                    quote!(#ty::new())
                }
                (kind, _) => {
                    let ty = Ident::new(kind.tag(), Span::call_site());
                    quote!(#ty::new())
                }
            }
        };
        self.statements.push(quote!(let #local = #constructor;));

        let resolved = self.styles.resolve(element, scope_definition);
        self.report_skipped(element.name(), &resolved.skipped);
        for property in &resolved.properties {
            let setter = format_ident!("set_{}", value::snake_case(&property.name));
            let value = value::property_value(&property.value)?;
            self.statements.push(quote!(#local.#setter(#value);));
        }

        if element.kind == ElementKind::ListView {
            if let Some(cell) = &element.type_ref {
                if cell.is_anonymous() {
                    let name = &cell.type_name;
                    self.statements
                        .push(quote!(#local.register_cell_template(#name);));
                } else {
                    let ty = ident(&cell.type_name)?;
                    self.statements.push(quote!(#local.register_cell::<#ty>();));
                }
            }
        }

        let receiver = parent.receiver();
        self.statements.push(if arranged {
            quote!(#receiver.add_arranged_subview(&#local);)
        } else {
            quote!(#receiver.add_subview(&#local);)
        });

        let table = &mut self.scopes[scope];
        if let Some(field) = &element.field {
            table.by_field.insert(field.clone(), local.clone());
        }
        if let Some(id) = &element.layout.id {
            table.by_id.insert(id.clone(), local.clone());
        }
        self.placed.push(Placed {
            element,
            ident: local.clone(),
            parent,
            scope,
        });

        if element.kind.accepts_children() {
            for child in &element.children {
                self.place(
                    child,
                    scope_definition,
                    Parent::Local(local.clone()),
                    element.kind.arranges_children(),
                    scope,
                    prefix.clone(),
                )?;
            }
        } else if let Some(anonymous) = nested.filter(|d| {
            d.is_anonymous && element.kind == ElementKind::ComponentReference
        }) {
            self.scopes.push(ScopeTable::default());
            let inner = self.scopes.len() - 1;
            for child in &anonymous.children {
                self.place(
                    child,
                    anonymous,
                    Parent::Local(local.clone()),
                    false,
                    inner,
                    Some(local.to_string()),
                )?;
            }
        }
        Ok(())
    }

    /// Pass 2 for one constraint.
    fn constraint(
        &self,
        placed: &Placed<'a>,
        constraint: &Constraint,
    ) -> Result<TokenStream, GenerateError> {
        let local = &placed.ident;
        let anchor = value::anchor(constraint.anchor);
        let relation = match constraint.relation {
            Relation::Equal => "equal_to",
            Relation::LessThanOrEqual => "less_than_or_equal_to",
            Relation::GreaterThanOrEqual => "greater_than_or_equal_to",
        };

        let mut chain = match &constraint.target {
            ConstraintTarget::Constant(c) => {
                let method = format_ident!("{}_constant", relation);
                let c = value::number(*c)?;
                quote!(#local.constrain(#anchor).#method(#c))
            }
            target => {
                let reference = self.target(placed, target)?;
                let method = Ident::new(relation, Span::call_site());
                let target_anchor =
                    value::anchor(constraint.target_anchor.unwrap_or(constraint.anchor));
                quote!(#local.constrain(#anchor).#method(#reference, #target_anchor))
            }
        };
        if constraint.multiplier != 1.0 {
            let m = value::number(constraint.multiplier)?;
            chain = quote!(#chain.multiplied_by(#m));
        }
        if constraint.constant != 0.0 {
            let c = value::number(constraint.constant)?;
            chain = quote!(#chain.offset(#c));
        }
        if constraint.priority != Priority::Required {
            let p = value::priority(constraint.priority)?;
            chain = quote!(#chain.priority(#p));
        }

        Ok(match &constraint.field {
            Some(field) => {
                let field = ident(field)?;
                quote!(self.#field = #chain.activate();)
            }
            None => quote!(#chain.activate();),
        })
    }

    fn target(
        &self,
        placed: &Placed<'a>,
        target: &ConstraintTarget,
    ) -> Result<TokenStream, GenerateError> {
        let table = &self.scopes[placed.scope];
        let found = match target {
            ConstraintTarget::Parent => return Ok(placed.parent.reference()),
            ConstraintTarget::Field(name) => {
                table.by_field.get(name).or_else(|| table.by_id.get(name))
            }
            ConstraintTarget::LayoutId(name) => table.by_id.get(name),
            ConstraintTarget::Constant(_) => None,
        };
        match found {
            Some(ident) => Ok(quote!(&#ident)),
            None => Err(GenerateError::UnresolvedTarget {
                target: target.to_string(),
                element: placed.element.name().to_string(),
                type_name: self.definition.type_name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_definition;
    use crate::style::{Style, StyleGroup};

    fn source(markup: &str) -> String {
        let def = parse_definition(markup).unwrap();
        generate_source(&def, &StyleResolver::new()).unwrap()
    }

    fn assert_emits(code: &str, expected: TokenStream) {
        let expected = expected.to_string();
        assert!(code.contains(&expected), "missing:\n  {expected}\nin:\n  {code}");
    }

    const PROFILE: &str = r#"
<Component type="ProfileView" backgroundColor="white">
    <ImageView field="avatar" image="avatar" layout:id="avatarImage"
               layout:top="super offset(16)" layout:width="== 64"/>
    <Label field="name" text="Name"
           layout:below="nameTop = id:avatarImage offset(8) @low"
           layout:fillHorizontally="super inset(16)"/>
    <StackView axis="horizontal" layout:height="== id:avatarImage.width multiplied(by: 0.5)">
        <Button title="Follow"/>
    </StackView>
</Component>
"#;

    // ── Pass 1 ───────────────────────────────────────────────────────

    #[test]
    fn emits_one_impl_per_type() {
        let code = source(PROFILE);
        assert!(code.starts_with("impl ProfileView"), "{code}");
        assert_emits(&code, quote!(pub fn build_layout(&mut self)));
    }

    #[test]
    fn root_properties_set_on_self() {
        let code = source(PROFILE);
        assert_emits(
            &code,
            quote!(self.set_background_color(Color::rgba(1.0, 1.0, 1.0, 1.0));),
        );
    }

    #[test]
    fn field_elements_reuse_owner_fields() {
        let code = source(PROFILE);
        assert_emits(&code, quote!(let avatar = self.avatar.clone();));
        assert_emits(&code, quote!(avatar.set_image(Image::named("avatar"));));
        assert_emits(&code, quote!(self.add_subview(&avatar);));
    }

    #[test]
    fn unnamed_elements_are_constructed() {
        let code = source(PROFILE);
        assert_emits(&code, quote!(let temp_stackview_1 = StackView::new();));
        assert_emits(&code, quote!(temp_stackview_1.set_axis(Axis::Horizontal);));
        assert_emits(&code, quote!(let temp_button_1 = Button::new();));
        assert_emits(&code, quote!(temp_button_1.set_title("Follow");));
    }

    #[test]
    fn stack_children_are_arranged() {
        let code = source(PROFILE);
        assert_emits(
            &code,
            quote!(temp_stackview_1.add_arranged_subview(&temp_button_1);),
        );
    }

    #[test]
    fn construction_precedes_constraints() {
        let code = source(PROFILE);
        let last_let = code.rfind("let ").unwrap();
        let first_constraint = code.find(". constrain").unwrap();
        assert!(last_let < first_constraint);
    }

    // ── Pass 2 ───────────────────────────────────────────────────────

    #[test]
    fn parent_constraints() {
        let code = source(PROFILE);
        assert_emits(
            &code,
            quote!(avatar.constrain(Anchor::Top).equal_to(&*self, Anchor::Top).offset(16.0).activate();),
        );
        assert_emits(
            &code,
            quote!(name.constrain(Anchor::Right).equal_to(&*self, Anchor::Right).offset(-16.0).activate();),
        );
    }

    #[test]
    fn numeric_targets_use_constant_form() {
        let code = source(PROFILE);
        assert_emits(
            &code,
            quote!(avatar.constrain(Anchor::Width).equal_to_constant(64.0).activate();),
        );
    }

    #[test]
    fn captured_constraint_fields() {
        let code = source(PROFILE);
        assert_emits(
            &code,
            quote!(self.nameTop = name.constrain(Anchor::Top).equal_to(&avatar, Anchor::Bottom).offset(8.0).priority(Priority::Low).activate();),
        );
    }

    #[test]
    fn multiplier_and_target_anchor() {
        let code = source(PROFILE);
        assert_emits(
            &code,
            quote!(temp_stackview_1.constrain(Anchor::Height).equal_to(&avatar, Anchor::Width).multiplied_by(0.5).activate();),
        );
    }

    #[test]
    fn relations_and_custom_priority() {
        let code = source(
            r#"<Component type="A"><Label field="x" layout:width="<= 200 @999"/></Component>"#,
        );
        assert_emits(
            &code,
            quote!(x.constrain(Anchor::Width).less_than_or_equal_to_constant(200.0).priority(Priority::Custom(999.0)).activate();),
        );
    }

    #[test]
    fn forward_references_resolve() {
        let code = source(
            r#"<Component type="A">
                <Label field="a" layout:top="b"/>
                <Label field="b"/>
            </Component>"#,
        );
        assert_emits(
            &code,
            quote!(a.constrain(Anchor::Top).equal_to(&b, Anchor::Top).activate();),
        );
    }

    // ── Nested definitions ───────────────────────────────────────────

    #[test]
    fn inline_definitions_get_their_own_impl() {
        let code = source(
            r#"<Component type="Screen">
                <Component field="card" type="Card"><Label field="title"/></Component>
            </Component>"#,
        );
        assert_emits(&code, quote!(let card = self.card.clone();));
        assert!(code.contains("impl Card"), "{code}");
        assert_emits(&code, quote!(let title = self.title.clone();));
    }

    #[test]
    fn anonymous_definitions_are_inlined() {
        let code = source(
            r#"<Component type="Screen">
                <Component layout:id="footer">
                    <Label field="title" text="Hi" layout:center="super"/>
                </Component>
            </Component>"#,
        );
        assert_emits(&code, quote!(let footer = AnonymousComponent::new("Screen_footer");));
        assert_emits(&code, quote!(let footer_title = Label::new();));
        assert_emits(&code, quote!(footer_title.set_text("Hi");));
        assert_emits(&code, quote!(footer.add_subview(&footer_title);));
        assert_emits(
            &code,
            quote!(footer_title.constrain(Anchor::CenterX).equal_to(&footer, Anchor::CenterX).activate();),
        );
        assert!(!code.contains("impl Screen_footer"), "{code}");
    }

    #[test]
    fn list_view_cells_are_registered() {
        let code = source(
            r#"<Component type="Feed"><ListView field="list" cell="PostCell"/></Component>"#,
        );
        assert_emits(&code, quote!(list.register_cell::<PostCell>();));
    }

    #[test]
    fn shared_styles_are_resolved() {
        let mut styles = StyleResolver::new();
        let mut group = StyleGroup::new("Theme");
        group
            .styles
            .push(Style::new("title", ElementKind::Label).with_property("font", ":bold@20"));
        styles.insert_group(group);

        let def = parse_definition(
            r#"<Component type="A"><Label field="t" style="Theme:title"/></Component>"#,
        )
        .unwrap();
        let code = generate_source(&def, &styles).unwrap();
        assert_emits(&code, quote!(t.set_font(Font::system(FontWeight::Bold, 20.0));));
    }

    // ── Errors ───────────────────────────────────────────────────────

    #[test]
    fn unresolved_target() {
        let def = parse_definition(
            r#"<Component type="A"><Label field="x" layout:top="missing"/></Component>"#,
        )
        .unwrap();
        let err = generate(&def, &StyleResolver::new()).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnresolvedTarget {
                target: "missing".into(),
                element: "x".into(),
                type_name: "A".into(),
            }
        );
    }

    #[test]
    fn invalid_identifiers() {
        let def = parse_definition(r#"<Component type="A"><Label field="type"/></Component>"#)
            .unwrap();
        assert_eq!(
            generate(&def, &StyleResolver::new()).unwrap_err(),
            GenerateError::InvalidIdentifier("type".into())
        );

        let def = parse_definition(r#"<Component type="not-a-type"/>"#).unwrap();
        assert_eq!(
            generate(&def, &StyleResolver::new()).unwrap_err(),
            GenerateError::InvalidIdentifier("not-a-type".into())
        );
    }
}
