//! Property store
//!
//! Properties are immutable once set: the first writer wins. User properties
//! (command line definitions, sub-build parameters) take precedence over
//! anything a build sets and can never be replaced by it.

use crate::project::interpolate::interpolate;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    values: HashMap<String, String>,
    user: BTreeSet<String>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property unless it already exists
    ///
    /// Returns `true` if the value was stored.
    pub fn set_new(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if let Some(existing) = self.values.get(&name) {
            debug!(property = %name, value = %existing, "Override ignored for property");
            return false;
        }
        self.values.insert(name, value.into());
        true
    }

    /// Set a user property, replacing any previous value
    pub fn set_user(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.values.insert(name.clone(), value.into());
        self.user.insert(name);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_user(&self, name: &str) -> bool {
        self.user.contains(name)
    }

    /// Property names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// User properties and their values
    pub fn user_properties(&self) -> Vec<(String, String)> {
        self.user
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    /// Expand `${name}` references against this store
    pub fn resolve(&self, template: &str) -> String {
        interpolate(template, &self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
