//! Capability registry: typed property setters and element factories.
//!
//! Live application never assigns properties by name reflection. Every
//! `(ElementKind, property)` pair it can set has an explicit setter here, and
//! every type it can instantiate has a factory. Anything else is reported as
//! [`SetOutcome::Unsupported`] or an unresolved type.

use std::collections::HashMap;
use std::fmt;

use crate::live::view::{GenericElement, VisualElement};
use crate::markup::ElementKind;
use crate::style::{catalogue, PropertyValue};

/// Result of one property assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum SetOutcome {
    Applied,
    /// No setter handles this element/property combination.
    Unsupported,
    /// A setter exists but refused the value.
    Rejected(String),
}

/// Assigns one property on an element.
pub type Setter = Box<dyn Fn(&mut dyn VisualElement, &PropertyValue) -> SetOutcome>;

/// Creates a fresh element instance.
pub type Factory = Box<dyn Fn() -> Box<dyn VisualElement>>;

/// Setters and factories available to live application.
pub struct CapabilityRegistry {
    setters: HashMap<(ElementKind, String), Setter>,
    factories: HashMap<String, Factory>,
    builtins: HashMap<ElementKind, Factory>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut factories: Vec<_> = self.factories.keys().collect();
        factories.sort();
        f.debug_struct("CapabilityRegistry")
            .field("setters", &self.setters.len())
            .field("factories", &factories)
            .field("builtins", &self.builtins.len())
            .finish()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CapabilityRegistry {
    /// A registry with no setters and no factories.
    pub fn empty() -> Self {
        Self {
            setters: HashMap::new(),
            factories: HashMap::new(),
            builtins: HashMap::new(),
        }
    }

    /// A registry with a [`GenericElement`] factory for every primitive kind
    /// and a storing setter for every catalogue property.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for kind in ElementKind::ALL {
            if kind != ElementKind::ComponentReference {
                registry.register_builtin(kind, move || {
                    Box::new(GenericElement::for_kind(kind)) as Box<dyn VisualElement>
                });
            }
            for descriptor in catalogue::properties_for(kind) {
                let name = descriptor.name;
                registry.register_typed(kind, name, move |element: &mut GenericElement, value| {
                    element.set_property(name, value.clone());
                    SetOutcome::Applied
                });
            }
        }
        registry
    }

    // ---- Registration ----

    /// Register (or replace) a setter for `kind.property`.
    pub fn register_setter<F>(&mut self, kind: ElementKind, property: impl Into<String>, setter: F)
    where
        F: Fn(&mut dyn VisualElement, &PropertyValue) -> SetOutcome + 'static,
    {
        self.setters.insert((kind, property.into()), Box::new(setter));
    }

    /// Register a setter for elements of concrete type `T`. Elements of any
    /// other type report [`SetOutcome::Unsupported`].
    pub fn register_typed<T, F>(&mut self, kind: ElementKind, property: impl Into<String>, setter: F)
    where
        T: VisualElement,
        F: Fn(&mut T, &PropertyValue) -> SetOutcome + 'static,
    {
        self.register_setter(kind, property, move |element, value| {
            match element.as_any_mut().downcast_mut::<T>() {
                Some(typed) => setter(typed, value),
                None => SetOutcome::Unsupported,
            }
        });
    }

    /// Register (or replace) the factory for a type name. Type names that
    /// match a primitive tag override the built-in factory for that kind.
    pub fn register_factory<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn VisualElement> + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    /// Register (or replace) the built-in factory for a primitive kind.
    pub fn register_builtin<F>(&mut self, kind: ElementKind, factory: F)
    where
        F: Fn() -> Box<dyn VisualElement> + 'static,
    {
        self.builtins.insert(kind, Box::new(factory));
    }

    // ---- Queries ----

    /// Whether a factory is registered for `type_name`.
    pub fn has_factory(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered component type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Instantiate a registered type.
    pub fn create(&self, type_name: &str) -> Option<Box<dyn VisualElement>> {
        self.factories.get(type_name).map(|factory| factory())
    }

    /// Instantiate a primitive kind: a factory registered under its tag
    /// wins over the built-in.
    pub fn create_primitive(&self, kind: ElementKind) -> Option<Box<dyn VisualElement>> {
        self.create(kind.tag())
            .or_else(|| self.builtins.get(&kind).map(|factory| factory()))
    }

    /// Assign one property.
    pub fn set(
        &self,
        kind: ElementKind,
        element: &mut dyn VisualElement,
        property: &str,
        value: &PropertyValue,
    ) -> SetOutcome {
        match self.setters.get(&(kind, property.to_string())) {
            Some(setter) => setter(element, value),
            None => SetOutcome::Unsupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    #[derive(Debug, Default)]
    struct Badge {
        count: i64,
    }

    impl VisualElement for Badge {
        fn type_name(&self) -> &str {
            "Badge"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn builtins_cover_primitives() {
        let registry = CapabilityRegistry::with_builtins();
        for kind in ElementKind::ALL {
            let created = registry.create_primitive(kind);
            assert_eq!(created.is_some(), kind != ElementKind::ComponentReference, "{kind}");
        }
    }

    #[test]
    fn storing_setter_records_values() {
        let registry = CapabilityRegistry::with_builtins();
        let mut element = GenericElement::for_kind(ElementKind::Label);
        let outcome = registry.set(
            ElementKind::Label,
            &mut element,
            "text",
            &PropertyValue::String("hi".into()),
        );
        assert_eq!(outcome, SetOutcome::Applied);
        assert_eq!(element.property("text"), Some(&PropertyValue::String("hi".into())));
    }

    #[test]
    fn unknown_combination_is_unsupported() {
        let registry = CapabilityRegistry::with_builtins();
        let mut element = GenericElement::for_kind(ElementKind::Label);
        assert_eq!(
            registry.set(ElementKind::Label, &mut element, "title", &PropertyValue::Bool(true)),
            SetOutcome::Unsupported
        );
        assert_eq!(
            CapabilityRegistry::empty().set(
                ElementKind::Label,
                &mut element,
                "text",
                &PropertyValue::Bool(true)
            ),
            SetOutcome::Unsupported
        );
    }

    #[test]
    fn typed_setters_downcast() {
        let mut registry = CapabilityRegistry::empty();
        registry.register_typed(ElementKind::ComponentReference, "tag", |badge: &mut Badge, value| {
            match value {
                PropertyValue::Integer(n) => {
                    badge.count = *n;
                    SetOutcome::Applied
                }
                other => SetOutcome::Rejected(format!("expected integer, got {other}")),
            }
        });

        let mut badge = Badge::default();
        assert_eq!(
            registry.set(ElementKind::ComponentReference, &mut badge, "tag", &PropertyValue::Integer(3)),
            SetOutcome::Applied
        );
        assert_eq!(badge.count, 3);

        // A different concrete type is not handled by the typed setter.
        let mut generic = GenericElement::anonymous("Other");
        assert_eq!(
            registry.set(
                ElementKind::ComponentReference,
                &mut generic,
                "tag",
                &PropertyValue::Integer(3)
            ),
            SetOutcome::Unsupported
        );
    }

    #[test]
    fn host_factories_override_builtins() {
        let mut registry = CapabilityRegistry::with_builtins();
        registry.register_factory("Label", || Box::new(Badge::default()));
        registry.register_factory("Avatar", || Box::new(GenericElement::anonymous("Avatar")));

        let label = registry.create_primitive(ElementKind::Label).unwrap();
        assert_eq!(label.type_name(), "Badge");
        assert!(registry.has_factory("Avatar"));
        assert_eq!(registry.type_names(), ["Avatar", "Label"]);
        assert!(registry.create("Missing").is_none());
    }
}
