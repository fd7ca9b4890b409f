//! Attribute and nested-element binding
//!
//! The [`Binder`] owns the per-type schema cache for one build context. The
//! [`Configurator`] walks declared elements and drives the schemas: it sets
//! attributes, creates or adds nested elements, hands over text and resolves
//! `refid` references with cycle detection.

pub mod coerce;
pub mod configure;
pub mod schema;

pub use coerce::*;
pub use configure::*;
pub use schema::*;

use crate::error::ConfigResult;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Schema cache, populated at most once per type
#[derive(Default)]
pub struct Binder {
    cache: RefCell<HashMap<TypeId, Rc<Schema>>>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema of `T`, discovering it on first use
    pub fn discover<T: Configurable>(&self) -> ConfigResult<Rc<Schema>> {
        let key = TypeId::of::<T>();
        if let Some(schema) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(schema));
        }

        let schema = Rc::new(T::describe(SchemaBuilder::new()).build()?);
        debug!(
            type_name = schema.type_name(),
            attributes = ?schema.attribute_names(),
            children = ?schema.child_names(),
            "Discovered binding schema"
        );
        self.cache.borrow_mut().insert(key, Rc::clone(&schema));
        Ok(schema)
    }

    /// Number of cached schemas
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[derive(Default)]
    struct Sample {
        name: String,
    }

    impl Configurable for Sample {
        fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            schema.string("name", |s, v| s.name = v)
        }

        fn constructor() -> Constructor<Self> {
            Constructor::Default(Self::default)
        }
    }

    struct NeedsArgs {
        _size: usize,
    }

    impl Configurable for NeedsArgs {
        fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            schema
        }

        fn constructor() -> Constructor<Self> {
            Constructor::Unavailable
        }
    }

    #[derive(Default)]
    struct Holder {
        items: Vec<NeedsArgs>,
    }

    impl Configurable for Holder {
        fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            schema.adder("item", |h, item| h.items.push(item))
        }

        fn constructor() -> Constructor<Self> {
            Constructor::Default(Self::default)
        }
    }

    #[test]
    fn test_discover_is_cached() {
        let binder = Binder::new();
        let first = binder.discover::<Sample>().unwrap();
        let second = binder.discover::<Sample>().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(binder.cached(), 1);

        let mut sample = Sample::default();
        first
            .attribute("name")
            .unwrap()
            .set(&mut sample, AttributeValue::Text("x".to_string()))
            .unwrap();
        assert_eq!(sample.name, "x");
    }

    #[test]
    fn test_unconstructible_adder_fails_discovery() {
        let binder = Binder::new();
        let err = binder.discover::<Holder>().unwrap_err();
        match err {
            ConfigError::UnconstructibleAdder {
                child, child_type, ..
            } => {
                assert_eq!(child, "item");
                assert_eq!(child_type, "NeedsArgs");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(binder.cached(), 0);
    }
}
