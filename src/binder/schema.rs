//! Per-type binding schemas
//!
//! A type declares what it accepts by implementing [`Configurable`] and
//! filling in a [`SchemaBuilder`]: attribute setters, slot setters, a text
//! handler, nested-element creators and adders, and optionally a task
//! container hook that receives unrecognized child elements verbatim.
//! Setters are plain `fn` pointers over the concrete type; the builder erases
//! them behind `&mut dyn Any` so the configurator can drive any type.

use crate::binder::Binder;
use crate::config::Element;
use crate::error::{ConfigError, ConfigResult};
use crate::project::{Project, Reference, Slot};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::rc::Rc;

/// How a type is instantiated by the configurator
pub enum Constructor<T> {
    /// Zero-argument construction
    Default(fn() -> T),
    /// Construction from the owning project
    ProjectAware(fn(&Project) -> T),
    /// The configurator cannot create this type on its own
    Unavailable,
}

/// A type the binder can configure from a declared element
pub trait Configurable: Any + Sized {
    /// Declare attributes, nested elements and text handling
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self>;

    fn constructor() -> Constructor<Self>;
}

/// Create a fresh, unconfigured instance of `T`
pub fn construct<T: Configurable>(project: &Project) -> Option<Box<dyn Any>> {
    match T::constructor() {
        Constructor::Default(create) => Some(Box::new(create()) as Box<dyn Any>),
        Constructor::ProjectAware(create) => Some(Box::new(create(project)) as Box<dyn Any>),
        Constructor::Unavailable => None,
    }
}

/// Schema lookup usable as a plain function pointer
pub fn discover_schema<T: Configurable>(binder: &Binder) -> ConfigResult<Rc<Schema>> {
    binder.discover::<T>()
}

/// Last path segment of a Rust type name
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Declared type of an attribute, selecting its coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Boolean,
    Integer,
    Path,
    Reference,
}

/// A coerced attribute value
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Text(String),
    Boolean(bool),
    Integer(i64),
    Path(PathBuf),
    Reference(Reference),
}

type SetterFn = Box<dyn Fn(&mut dyn Any, AttributeValue) -> Result<(), String>>;
type SlotFn = Box<dyn Fn(&mut dyn Any, Slot) -> bool>;
type TextFn = Box<dyn Fn(&mut dyn Any, String) -> bool>;
type ContainerFn = Box<dyn Fn(&mut dyn Any, Element) -> bool>;
type CreateFn = Box<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any>>;
type AttachFn = Box<dyn Fn(&mut dyn Any, Box<dyn Any>) -> bool>;

pub struct AttributeBinding {
    pub kind: AttributeKind,
    setter: SetterFn,
}

impl AttributeBinding {
    pub fn set(&self, object: &mut dyn Any, value: AttributeValue) -> Result<(), String> {
        (self.setter)(object, value)
    }
}

/// The type produced for a nested element
#[derive(Clone)]
pub struct ChildType {
    pub type_name: &'static str,
    pub type_id: TypeId,
    pub discover: fn(&Binder) -> ConfigResult<Rc<Schema>>,
    pub construct: fn(&Project) -> Option<Box<dyn Any>>,
}

impl ChildType {
    fn of<C: Configurable>() -> Self {
        ChildType {
            type_name: short_type_name::<C>(),
            type_id: TypeId::of::<C>(),
            discover: discover_schema::<C>,
            construct: construct::<C>,
        }
    }
}

pub struct Creator {
    pub child: ChildType,
    create: CreateFn,
    replace: fn(&mut dyn Any, Box<dyn Any>) -> bool,
}

impl Creator {
    /// Ask the parent for a new child it keeps itself
    pub fn create<'a>(&self, parent: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.create)(parent)
    }

    /// Overwrite a created child with a referenced value
    pub fn replace(&self, child: &mut dyn Any, value: Box<dyn Any>) -> bool {
        (self.replace)(child, value)
    }
}

pub struct Adder {
    pub child: ChildType,
    attach: AttachFn,
}

impl Adder {
    /// Hand a fully configured child to the parent
    pub fn attach(&self, parent: &mut dyn Any, child: Box<dyn Any>) -> bool {
        (self.attach)(parent, child)
    }
}

/// How a nested element is produced
pub enum ChildBinding {
    Creator(Creator),
    Adder(Adder),
}

impl ChildBinding {
    pub fn child_type(&self) -> &ChildType {
        match self {
            ChildBinding::Creator(creator) => &creator.child,
            ChildBinding::Adder(adder) => &adder.child,
        }
    }
}

/// Binding metadata for one type
pub struct Schema {
    type_name: &'static str,
    attributes: HashMap<String, AttributeBinding>,
    slots: HashMap<String, SlotFn>,
    children: HashMap<String, ChildBinding>,
    text: Option<TextFn>,
    container: Option<ContainerFn>,
}

impl Schema {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeBinding> {
        self.attributes.get(name)
    }

    pub fn child(&self, name: &str) -> Option<&ChildBinding> {
        self.children.get(name)
    }

    pub fn supports_slot(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn set_slot(&self, object: &mut dyn Any, name: &str, slot: Slot) -> bool {
        match self.slots.get(name) {
            Some(setter) => setter(object, slot),
            None => false,
        }
    }

    pub fn supports_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn set_text(&self, object: &mut dyn Any, text: String) -> bool {
        match &self.text {
            Some(setter) => setter(object, text),
            None => false,
        }
    }

    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }

    pub fn add_raw_child(&self, object: &mut dyn Any, element: Element) -> bool {
        match &self.container {
            Some(hook) => hook(object, element),
            None => false,
        }
    }

    /// Attribute names in sorted order
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Nested element names in sorted order
    pub fn child_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.children.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("attributes", &self.attribute_names())
            .field("children", &self.child_names())
            .field("text", &self.text.is_some())
            .field("container", &self.container.is_some())
            .finish()
    }
}

fn constrain_create<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any>,
{
    f
}

fn replace_with<C: Any>(child: &mut dyn Any, value: Box<dyn Any>) -> bool {
    match (child.downcast_mut::<C>(), value.downcast::<C>()) {
        (Some(slot), Ok(value)) => {
            *slot = *value;
            true
        }
        _ => false,
    }
}

fn mismatch(kind: AttributeKind) -> String {
    format!("expected a {:?} value", kind)
}

/// Collects the bindings of `T`
pub struct SchemaBuilder<T> {
    schema: Schema,
    errors: Vec<ConfigError>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: Configurable> SchemaBuilder<T> {
    pub fn new() -> Self {
        SchemaBuilder {
            schema: Schema {
                type_name: short_type_name::<T>(),
                attributes: HashMap::new(),
                slots: HashMap::new(),
                children: HashMap::new(),
                text: None,
                container: None,
            },
            errors: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn duplicate(&mut self, name: &str) {
        self.errors.push(ConfigError::AmbiguousBinding {
            type_name: self.schema.type_name.to_string(),
            name: name.to_string(),
        });
    }

    fn attribute(mut self, name: &str, kind: AttributeKind, setter: SetterFn) -> Self {
        let key = name.to_ascii_lowercase();
        if self.schema.attributes.contains_key(&key) {
            self.duplicate(name);
        } else {
            self.schema
                .attributes
                .insert(key, AttributeBinding { kind, setter });
        }
        self
    }

    pub fn string(self, name: &str, f: fn(&mut T, String)) -> Self {
        self.try_string(name, move |t, value| {
            f(t, value);
            Ok(())
        })
    }

    /// A string attribute whose setter may reject the value
    pub fn try_string(
        self,
        name: &str,
        f: impl Fn(&mut T, String) -> Result<(), String> + 'static,
    ) -> Self {
        let setter = move |object: &mut dyn Any, value: AttributeValue| {
            let target = object
                .downcast_mut::<T>()
                .ok_or_else(|| "receiver type mismatch".to_string())?;
            match value {
                AttributeValue::Text(s) => f(target, s),
                _ => Err(mismatch(AttributeKind::String)),
            }
        };
        self.attribute(name, AttributeKind::String, Box::new(setter))
    }

    pub fn boolean(self, name: &str, f: fn(&mut T, bool)) -> Self {
        let setter = move |object: &mut dyn Any, value: AttributeValue| {
            let target = object
                .downcast_mut::<T>()
                .ok_or_else(|| "receiver type mismatch".to_string())?;
            match value {
                AttributeValue::Boolean(b) => {
                    f(target, b);
                    Ok(())
                }
                _ => Err(mismatch(AttributeKind::Boolean)),
            }
        };
        self.attribute(name, AttributeKind::Boolean, Box::new(setter))
    }

    pub fn integer(self, name: &str, f: fn(&mut T, i64)) -> Self {
        let setter = move |object: &mut dyn Any, value: AttributeValue| {
            let target = object
                .downcast_mut::<T>()
                .ok_or_else(|| "receiver type mismatch".to_string())?;
            match value {
                AttributeValue::Integer(n) => {
                    f(target, n);
                    Ok(())
                }
                _ => Err(mismatch(AttributeKind::Integer)),
            }
        };
        self.attribute(name, AttributeKind::Integer, Box::new(setter))
    }

    pub fn path(self, name: &str, f: fn(&mut T, PathBuf)) -> Self {
        let setter = move |object: &mut dyn Any, value: AttributeValue| {
            let target = object
                .downcast_mut::<T>()
                .ok_or_else(|| "receiver type mismatch".to_string())?;
            match value {
                AttributeValue::Path(p) => {
                    f(target, p);
                    Ok(())
                }
                _ => Err(mismatch(AttributeKind::Path)),
            }
        };
        self.attribute(name, AttributeKind::Path, Box::new(setter))
    }

    /// An attribute naming a registered object of type `R`
    pub fn reference<R: Any>(self, name: &str, f: fn(&mut T, Reference)) -> Self {
        let expected = short_type_name::<R>();
        let setter = move |object: &mut dyn Any, value: AttributeValue| {
            let target = object
                .downcast_mut::<T>()
                .ok_or_else(|| "receiver type mismatch".to_string())?;
            match value {
                AttributeValue::Reference(reference) => {
                    if reference.object.type_id() != TypeId::of::<R>() {
                        return Err(format!(
                            "reference '{}' is a {}, expected {}",
                            reference.id,
                            reference.object.type_name(),
                            expected
                        ));
                    }
                    f(target, reference);
                    Ok(())
                }
                _ => Err(mismatch(AttributeKind::Reference)),
            }
        };
        self.attribute(name, AttributeKind::Reference, Box::new(setter))
    }

    /// Accept a live slot for `name` instead of a literal value
    pub fn slot(mut self, name: &str, f: fn(&mut T, Slot)) -> Self {
        let key = name.to_ascii_lowercase();
        if self.schema.slots.contains_key(&key) {
            self.duplicate(name);
            return self;
        }
        let setter = move |object: &mut dyn Any, slot: Slot| match object.downcast_mut::<T>() {
            Some(target) => {
                f(target, slot);
                true
            }
            None => false,
        };
        self.schema.slots.insert(key, Box::new(setter));
        self
    }

    pub fn text(mut self, f: fn(&mut T, String)) -> Self {
        if self.schema.text.is_some() {
            self.duplicate("#text");
            return self;
        }
        let setter = move |object: &mut dyn Any, text: String| match object.downcast_mut::<T>() {
            Some(target) => {
                f(target, text);
                true
            }
            None => false,
        };
        self.schema.text = Some(Box::new(setter));
        self
    }

    /// Nested element created by the parent, which keeps it
    pub fn creator<C: Configurable>(mut self, name: &str, f: fn(&mut T) -> &mut C) -> Self {
        let key = name.to_ascii_lowercase();
        if self.schema.children.contains_key(&key) {
            self.duplicate(name);
            return self;
        }
        let create = constrain_create(move |object| {
            object
                .downcast_mut::<T>()
                .map(|target| f(target) as &mut dyn Any)
        });
        self.schema.children.insert(
            key,
            ChildBinding::Creator(Creator {
                child: ChildType::of::<C>(),
                create: Box::new(create),
                replace: replace_with::<C>,
            }),
        );
        self
    }

    /// Nested element constructed by the framework, configured, then added
    pub fn adder<C: Configurable>(mut self, name: &str, f: fn(&mut T, C)) -> Self {
        let key = name.to_ascii_lowercase();
        if self.schema.children.contains_key(&key) {
            self.duplicate(name);
            return self;
        }
        if matches!(C::constructor(), Constructor::Unavailable) {
            self.errors.push(ConfigError::UnconstructibleAdder {
                type_name: self.schema.type_name.to_string(),
                child: name.to_string(),
                child_type: short_type_name::<C>().to_string(),
            });
            return self;
        }
        let attach = move |object: &mut dyn Any, child: Box<dyn Any>| {
            match (object.downcast_mut::<T>(), child.downcast::<C>()) {
                (Some(target), Ok(child)) => {
                    f(target, *child);
                    true
                }
                _ => false,
            }
        };
        self.schema.children.insert(
            key,
            ChildBinding::Adder(Adder {
                child: ChildType::of::<C>(),
                attach: Box::new(attach),
            }),
        );
        self
    }

    /// Receive nested elements no binding claims, unconfigured
    pub fn container(mut self, f: fn(&mut T, Element)) -> Self {
        if self.schema.container.is_some() {
            self.duplicate("#container");
            return self;
        }
        let hook = move |object: &mut dyn Any, element: Element| match object.downcast_mut::<T>()
        {
            Some(target) => {
                f(target, element);
                true
            }
            None => false,
        };
        self.schema.container = Some(Box::new(hook));
        self
    }

    /// Finish discovery; the first recorded problem is fatal
    pub fn build(self) -> ConfigResult<Schema> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.schema),
        }
    }
}

impl<T: Configurable> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Part {
        label: String,
    }

    impl Configurable for Part {
        fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            schema.string("label", |p, v| p.label = v)
        }

        fn constructor() -> Constructor<Self> {
            Constructor::Default(Self::default)
        }
    }

    #[derive(Default)]
    struct Machine {
        verbose: bool,
        parts: Vec<Part>,
    }

    impl Configurable for Machine {
        fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            schema
                .boolean("verbose", |m, v| m.verbose = v)
                .creator("part", |m| {
                    m.parts.push(Part::default());
                    m.parts.last_mut().unwrap()
                })
        }

        fn constructor() -> Constructor<Self> {
            Constructor::Default(Self::default)
        }
    }

    #[test]
    fn test_setters_downcast() {
        let schema = Machine::describe(SchemaBuilder::new()).build().unwrap();
        let mut machine = Machine::default();

        schema
            .attribute("verbose")
            .unwrap()
            .set(&mut machine, AttributeValue::Boolean(true))
            .unwrap();
        assert!(machine.verbose);

        let err = schema
            .attribute("verbose")
            .unwrap()
            .set(&mut machine, AttributeValue::Text("x".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_creator_returns_retained_child() {
        let schema = Machine::describe(SchemaBuilder::new()).build().unwrap();
        let mut machine = Machine::default();

        let ChildBinding::Creator(creator) = schema.child("part").unwrap() else {
            panic!("expected a creator");
        };
        let child = creator.create(&mut machine).unwrap();
        child.downcast_mut::<Part>().unwrap().label = "gear".to_string();

        assert_eq!(machine.parts.len(), 1);
        assert_eq!(machine.parts[0].label, "gear");
    }

    #[test]
    fn test_duplicate_attribute_is_ambiguous() {
        let result = SchemaBuilder::<Part>::new()
            .string("label", |p, v| p.label = v)
            .string("Label", |p, v| p.label = v)
            .build();
        assert!(matches!(result, Err(ConfigError::AmbiguousBinding { .. })));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Machine>(), "Machine");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }
}
