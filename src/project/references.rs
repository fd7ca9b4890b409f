//! Reference registry
//!
//! Maps ids to shared objects. An id is first *declared* with its element and
//! only configured when something resolves it, so references may point forward
//! in the project file. Configured objects are shared by identity (`Rc`);
//! consumers that need their own copy clone the stored value.
//!
//! The registry also owns the slot namespace: named live cells an enclosing
//! task updates while nested tasks read them.

use crate::config::Element;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A configured object held by the registry
pub struct StoredObject {
    type_name: String,
    type_id: TypeId,
    value: Box<dyn Any>,
    clone_fn: fn(&dyn Any) -> Option<Box<dyn Any>>,
}

impl StoredObject {
    pub fn new<T: Clone + 'static>(type_name: impl Into<String>, value: T) -> Self {
        StoredObject {
            type_name: type_name.into(),
            type_id: TypeId::of::<T>(),
            value: Box::new(value),
            clone_fn: clone_any::<T>,
        }
    }

    /// Wrap an already boxed value; `clone_fn` must accept the boxed type
    pub fn from_boxed(
        type_name: impl Into<String>,
        value: Box<dyn Any>,
        clone_fn: fn(&dyn Any) -> Option<Box<dyn Any>>,
    ) -> Self {
        let type_id = (*value).type_id();
        StoredObject {
            type_name: type_name.into(),
            type_id,
            value,
            clone_fn,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// A fresh copy of the stored value
    pub fn clone_value(&self) -> Option<Box<dyn Any>> {
        (self.clone_fn)(self.value.as_ref())
    }
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Clone a type-erased value of type `T`
pub fn clone_any<T: Clone + 'static>(value: &dyn Any) -> Option<Box<dyn Any>> {
    value
        .downcast_ref::<T>()
        .map(|v| Box::new(v.clone()) as Box<dyn Any>)
}

/// A resolved reference handed to reference-typed attributes
#[derive(Debug, Clone)]
pub struct Reference {
    pub id: String,
    pub object: Rc<StoredObject>,
}

impl Reference {
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }
}

/// A live value cell shared between a producer and its consumers
#[derive(Debug, Clone, Default)]
pub struct Slot(Rc<RefCell<Option<String>>>);

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Option<String>) {
        *self.0.borrow_mut() = value;
    }

    pub fn ptr_eq(&self, other: &Slot) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Registry entry
#[derive(Debug, Clone)]
pub enum Entry {
    /// Declared but not configured yet
    Declared(Element),
    /// Configured and shared
    Ready(Rc<StoredObject>),
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistry {
    entries: HashMap<String, Entry>,
    slots: HashMap<String, Slot>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an id whose element will be configured on first use
    pub fn declare(&mut self, id: impl Into<String>, element: Element) {
        self.entries.insert(id.into(), Entry::Declared(element));
    }

    pub fn insert(&mut self, id: impl Into<String>, object: Rc<StoredObject>) {
        self.entries.insert(id.into(), Entry::Ready(object));
    }

    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// The configured object for `id`, if it has been configured
    pub fn ready(&self, id: &str) -> Option<Rc<StoredObject>> {
        match self.entries.get(id) {
            Some(Entry::Ready(object)) => Some(Rc::clone(object)),
            _ => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Register a fresh slot, returning the one it shadows
    pub fn define_slot(&mut self, name: impl Into<String>, slot: Slot) -> Option<Slot> {
        self.slots.insert(name.into(), slot)
    }

    /// Restore or remove a slot after its producer finished
    pub fn restore_slot(&mut self, name: &str, previous: Option<Slot>) {
        match previous {
            Some(slot) => {
                self.slots.insert(name.to_string(), slot);
            }
            None => {
                self.slots.remove(name);
            }
        }
    }

    pub fn slot(&self, name: &str) -> Option<Slot> {
        self.slots.get(name).cloned()
    }

    /// A registry sharing this one's slots but no references
    pub fn slots_only(&self) -> Self {
        ReferenceRegistry {
            entries: HashMap::new(),
            slots: self.slots.clone(),
        }
    }
}
