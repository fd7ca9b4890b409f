//! Element configuration
//!
//! Turns declared elements into configured objects. Registered types are
//! looked up by tag, constructed, and then configured attribute by attribute
//! and child by child through their [`Schema`]. `refid` elements resolve to a
//! copy of a registered object instead.

use crate::binder::coerce::{slot_reference, Coercion};
use crate::binder::schema::{AttributeKind, AttributeValue, ChildBinding, Schema};
use crate::config::Element;
use crate::error::{ConfigError, RantError, Result};
use crate::project::{BuildContext, Entry, Project, Reference, StoredObject};
use std::any::{Any, TypeId};
use std::rc::Rc;
use tracing::debug;

const ID: &str = "id";
const REFID: &str = "refid";

fn uncloneable(_value: &dyn Any) -> Option<Box<dyn Any>> {
    None
}

/// Configures elements against one project
pub struct Configurator<'p> {
    project: &'p mut Project,
    context: Rc<BuildContext>,
    /// Reference ids currently being resolved, outermost first
    chain: Vec<String>,
}

impl<'p> Configurator<'p> {
    pub fn new(project: &'p mut Project) -> Self {
        let context = project.context();
        Configurator {
            project,
            context,
            chain: Vec::new(),
        }
    }

    /// Instantiate and configure a registered element
    pub fn configure(&mut self, element: &Element) -> Result<Box<dyn Any>> {
        self.configure_element(element)
            .map_err(|err| err.at(&element.location))
    }

    fn configure_element(&mut self, element: &Element) -> Result<Box<dyn Any>> {
        let context = Rc::clone(&self.context);
        let definition = context
            .types
            .get(&element.tag)
            .ok_or_else(|| ConfigError::UnknownElement(element.tag.clone()))?;

        if let Some(refid) = element.attribute(REFID) {
            check_exclusive_refid(element)?;
            let refid = self.project.properties.resolve(refid);
            return self.referenced_value(&refid, definition.type_id, definition.type_name);
        }

        let schema = (definition.discover)(&context.binder)?;
        let mut object = (definition.construct)(self.project)
            .ok_or_else(|| ConfigError::Unconstructible(definition.type_name.to_string()))?;
        self.configure_object(element, object.as_mut(), &schema, true)?;
        Ok(object)
    }

    /// Resolve a registered id, configuring a pending declaration on first use
    pub fn resolve_reference(&mut self, id: &str) -> Result<Rc<StoredObject>> {
        if let Some(start) = self.chain.iter().position(|seen| seen == id) {
            let mut cycle: Vec<&str> = self.chain[start..].iter().map(String::as_str).collect();
            cycle.push(id);
            return Err(ConfigError::CircularReference(cycle.join(" -> ")).into());
        }

        match self.project.references.entry(id).cloned() {
            None => Err(ConfigError::ReferenceNotFound(id.to_string()).into()),
            Some(Entry::Ready(object)) => Ok(object),
            Some(Entry::Declared(element)) => {
                self.chain.push(id.to_string());
                let result = self.configure_declaration(&element);
                self.chain.pop();

                let object = result?;
                debug!(id, type_name = object.type_name(), "Registered reference");
                self.project.references.insert(id, Rc::clone(&object));
                Ok(object)
            }
        }
    }

    fn configure_declaration(&mut self, element: &Element) -> Result<Rc<StoredObject>> {
        let value = self.configure(element)?;
        let clone_fn = self
            .context
            .types
            .get(&element.tag)
            .and_then(|definition| definition.clone_fn)
            .unwrap_or(uncloneable);
        Ok(Rc::new(StoredObject::from_boxed(
            element.tag.to_ascii_lowercase(),
            value,
            clone_fn,
        )))
    }

    /// A fresh copy of a registered object of the expected type
    fn referenced_value(
        &mut self,
        id: &str,
        expected: TypeId,
        expected_name: &str,
    ) -> Result<Box<dyn Any>> {
        let object = self.resolve_reference(id)?;
        if object.type_id() != expected {
            return Err(ConfigError::ReferenceTypeMismatch {
                id: id.to_string(),
                expected: expected_name.to_string(),
                actual: object.type_name().to_string(),
            }
            .into());
        }
        object
            .clone_value()
            .ok_or_else(|| ConfigError::Unconstructible(object.type_name().to_string()).into())
    }

    /// Apply attributes, nested elements and text of `element` to `object`
    pub fn configure_object(
        &mut self,
        element: &Element,
        object: &mut dyn Any,
        schema: &Schema,
        top_level: bool,
    ) -> Result<()> {
        for (name, value) in &element.attributes {
            if top_level && name.eq_ignore_ascii_case(ID) {
                continue;
            }
            self.set_attribute(element, object, schema, name, value)?;
        }

        for child in &element.children {
            self.create_or_add_child(object, schema, child)
                .map_err(|err| err.at(&child.location))?;
        }

        self.set_text(element, object, schema)
    }

    fn set_attribute(
        &mut self,
        element: &Element,
        object: &mut dyn Any,
        schema: &Schema,
        name: &str,
        raw: &str,
    ) -> Result<()> {
        let key = name.to_ascii_lowercase();

        if let Some(slot_name) = slot_reference(raw) {
            if !schema.supports_slot(&key) {
                return Err(ConfigError::NotDynamic {
                    element: element.tag.clone(),
                    attribute: name.to_string(),
                }
                .into());
            }
            let slot = self
                .project
                .references
                .slot(slot_name)
                .ok_or_else(|| ConfigError::UnknownSlot(slot_name.to_string()))?;
            schema.set_slot(object, &key, slot);
            return Ok(());
        }

        let binding = schema
            .attribute(&key)
            .ok_or_else(|| ConfigError::UnsupportedAttribute {
                element: element.tag.clone(),
                attribute: name.to_string(),
            })?;
        let resolved = self.project.properties.resolve(raw);

        let value = match binding.kind {
            AttributeKind::Reference => {
                let object = self.resolve_reference(&resolved)?;
                AttributeValue::Reference(Reference {
                    id: resolved,
                    object,
                })
            }
            kind => Coercion {
                element: &element.tag,
                attribute: name,
                base_dir: self.project.base_dir(),
                legacy_booleans: self.context.options.legacy_booleans,
            }
            .apply(kind, resolved)?,
        };

        binding.set(object, value).map_err(|error| {
            ConfigError::InvalidValue {
                element: element.tag.clone(),
                attribute: name.to_string(),
                error,
            }
            .into()
        })
    }

    fn create_or_add_child(
        &mut self,
        object: &mut dyn Any,
        schema: &Schema,
        child: &Element,
    ) -> Result<()> {
        let binding = match schema.child(&child.key()) {
            Some(binding) => binding,
            None if schema.is_container() => {
                schema.add_raw_child(object, child.clone());
                return Ok(());
            }
            None => {
                return Err(ConfigError::UnsupportedElement {
                    element: schema.type_name().to_ascii_lowercase(),
                    child: child.tag.clone(),
                }
                .into())
            }
        };

        let child_type = binding.child_type().clone();
        let referenced = match child.attribute(REFID) {
            Some(refid) => {
                check_exclusive_refid(child)?;
                let refid = self.project.properties.resolve(refid);
                Some(self.referenced_value(&refid, child_type.type_id, child_type.type_name)?)
            }
            None => None,
        };

        let attached = match binding {
            ChildBinding::Creator(creator) => {
                let created = match creator.create(object) {
                    Some(created) => created,
                    None => return Err(attach_failed(schema, child)),
                };
                match referenced {
                    Some(value) => creator.replace(created, value),
                    None => {
                        let child_schema = (child_type.discover)(&self.context.binder)?;
                        self.configure_object(child, created, &child_schema, false)?;
                        true
                    }
                }
            }
            ChildBinding::Adder(adder) => {
                let value = match referenced {
                    Some(value) => value,
                    None => {
                        let child_schema = (child_type.discover)(&self.context.binder)?;
                        let mut instance = (child_type.construct)(self.project).ok_or_else(
                            || ConfigError::Unconstructible(child_type.type_name.to_string()),
                        )?;
                        self.configure_object(child, instance.as_mut(), &child_schema, false)?;
                        instance
                    }
                };
                adder.attach(object, value)
            }
        };

        if attached {
            Ok(())
        } else {
            Err(attach_failed(schema, child))
        }
    }

    fn set_text(&mut self, element: &Element, object: &mut dyn Any, schema: &Schema) -> Result<()> {
        let Some(text) = element.text.as_deref() else {
            return Ok(());
        };
        if schema.supports_text() {
            let resolved = self.project.properties.resolve(text);
            schema.set_text(object, resolved);
            Ok(())
        } else if element.significant_text().is_some() {
            Err(ConfigError::UnsupportedText(element.tag.clone()).into())
        } else {
            Ok(())
        }
    }
}

fn attach_failed(schema: &Schema, child: &Element) -> RantError {
    ConfigError::InvalidValue {
        element: schema.type_name().to_ascii_lowercase(),
        attribute: child.tag.clone(),
        error: "nested element could not be attached".to_string(),
    }
    .into()
}

/// `refid` may only be accompanied by `id`
fn check_exclusive_refid(element: &Element) -> Result<()> {
    let extra_attribute = element
        .attributes
        .iter()
        .any(|(name, _)| !name.eq_ignore_ascii_case(REFID) && !name.eq_ignore_ascii_case(ID));
    if extra_attribute || !element.children.is_empty() || element.significant_text().is_some() {
        return Err(ConfigError::TooManyAttributes(element.tag.clone()).into());
    }
    Ok(())
}

/// Check an element against its schema without configuring anything
///
/// Catches unknown tags, unsupported attributes and nested elements,
/// misplaced text, `refid` misuse and malformed literal booleans or integers
/// before a build starts.
pub fn check_element(context: &BuildContext, element: &Element) -> Result<()> {
    let definition = context
        .types
        .get(&element.tag)
        .ok_or_else(|| RantError::from(ConfigError::UnknownElement(element.tag.clone())))
        .map_err(|err| err.at(&element.location))?;
    let schema = (definition.discover)(&context.binder)
        .map_err(|err| RantError::from(err).at(&element.location))?;
    check_against(context, element, &schema, true)
}

fn check_against(
    context: &BuildContext,
    element: &Element,
    schema: &Schema,
    top_level: bool,
) -> Result<()> {
    check_shape(element, schema, top_level, context.options.legacy_booleans)
        .map_err(|err| err.at(&element.location))?;
    if element.has_attribute(REFID) {
        return Ok(());
    }

    for child in &element.children {
        match schema.child(&child.key()) {
            Some(binding) => {
                let child_schema = (binding.child_type().discover)(&context.binder)
                    .map_err(|err| RantError::from(err).at(&child.location))?;
                check_against(context, child, &child_schema, false)?;
            }
            None if schema.is_container() => check_element(context, child)?,
            None => {
                return Err(RantError::from(ConfigError::UnsupportedElement {
                    element: element.tag.clone(),
                    child: child.tag.clone(),
                })
                .at(&child.location))
            }
        }
    }
    Ok(())
}

fn check_shape(
    element: &Element,
    schema: &Schema,
    top_level: bool,
    legacy_booleans: bool,
) -> Result<()> {
    if element.has_attribute(REFID) {
        return check_exclusive_refid(element);
    }

    for (name, value) in &element.attributes {
        if top_level && name.eq_ignore_ascii_case(ID) {
            continue;
        }
        let key = name.to_ascii_lowercase();
        if slot_reference(value).is_some() {
            if !schema.supports_slot(&key) {
                return Err(ConfigError::NotDynamic {
                    element: element.tag.clone(),
                    attribute: name.clone(),
                }
                .into());
            }
            continue;
        }

        let binding = schema
            .attribute(&key)
            .ok_or_else(|| ConfigError::UnsupportedAttribute {
                element: element.tag.clone(),
                attribute: name.clone(),
            })?;
        // Values with property references are only known at run time
        if matches!(binding.kind, AttributeKind::Boolean | AttributeKind::Integer)
            && !value.contains('$')
        {
            Coercion {
                element: &element.tag,
                attribute: name,
                base_dir: std::path::Path::new(""),
                legacy_booleans,
            }
            .apply(binding.kind, value.clone())?;
        }
    }

    if element.significant_text().is_some() && !schema.supports_text() {
        return Err(ConfigError::UnsupportedText(element.tag.clone()).into());
    }
    Ok(())
}
