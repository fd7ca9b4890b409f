//! Targets
//!
//! A target is a named, ordered list of task elements with dependencies and
//! optional `if` / `unless` guards. Its tasks stay unconfigured until the
//! target runs.

use crate::config::{Element, Location};
use crate::error::{ConfigError, ConfigResult};

/// A named unit of build work
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub name: String,

    /// Dependency names in declaration order
    pub depends: Vec<String>,

    /// Run only if this property is set (or resolves to a true token)
    pub if_condition: Option<String>,

    /// Skip if this property is set (or resolves to a true token)
    pub unless_condition: Option<String>,

    pub description: Option<String>,

    /// Task elements in declaration order
    pub tasks: Vec<Element>,

    pub location: Location,
}

impl Target {
    /// A target with no tasks or dependencies
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Target {
            location: Location::new("", format!("target[{}]", name)),
            name,
            depends: Vec::new(),
            if_condition: None,
            unless_condition: None,
            description: None,
            tasks: Vec::new(),
        }
    }

    /// Read a `target` element
    pub fn from_element(element: &Element) -> ConfigResult<Self> {
        let mut name = None;
        let mut target = Target::new("");

        for (key, value) in &element.attributes {
            match key.to_ascii_lowercase().as_str() {
                "name" => name = Some(value.clone()),
                "depends" => target.depends = parse_depends(value)?,
                "if" => target.if_condition = Some(value.clone()),
                "unless" => target.unless_condition = Some(value.clone()),
                "description" => target.description = Some(value.clone()),
                _ => {
                    return Err(ConfigError::UnsupportedAttribute {
                        element: "target".to_string(),
                        attribute: key.clone(),
                    })
                }
            }
        }

        target.name = match name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(ConfigError::MissingAttribute {
                    element: "target".to_string(),
                    attribute: "name".to_string(),
                })
            }
        };
        if element.significant_text().is_some() {
            return Err(ConfigError::UnsupportedText("target".to_string()));
        }
        target.tasks = element.children.clone();
        target.location = element.location.clone();
        Ok(target)
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends.push(name.into());
        self
    }

    pub fn with_task(mut self, task: Element) -> Self {
        let segment = format!("{}[{}]", task.tag, self.tasks.len());
        let mut task = task;
        task.relocate(self.location.child(&segment));
        self.tasks.push(task);
        self
    }
}

/// Split a comma-separated dependency list
fn parse_depends(value: &str) -> ConfigResult<Vec<String>> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|name| {
            let name = name.trim();
            if name.is_empty() {
                Err(ConfigError::Invalid(format!(
                    "Syntax error in depends attribute '{}'",
                    value
                )))
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_element() {
        let element = Element::new("target")
            .attr("name", "dist")
            .attr("depends", "compile, test")
            .attr("unless", "skip.dist")
            .child(Element::new("echo").text("packaging"));

        let target = Target::from_element(&element).unwrap();
        assert_eq!(target.name, "dist");
        assert_eq!(target.depends, vec!["compile", "test"]);
        assert_eq!(target.unless_condition.as_deref(), Some("skip.dist"));
        assert_eq!(target.tasks.len(), 1);
    }

    #[test]
    fn test_empty_dependency_entry() {
        let element = Element::new("target")
            .attr("name", "a")
            .attr("depends", "b,,c");
        assert!(matches!(
            Target::from_element(&element),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_name() {
        let element = Element::new("target").attr("depends", "b");
        assert!(matches!(
            Target::from_element(&element),
            Err(ConfigError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_unknown_attribute() {
        let element = Element::new("target").attr("name", "a").attr("when", "x");
        assert!(matches!(
            Target::from_element(&element),
            Err(ConfigError::UnsupportedAttribute { .. })
        ));
    }
}
