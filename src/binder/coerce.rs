//! String-to-value coercions for attribute setters

use crate::binder::schema::{AttributeKind, AttributeValue};
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

const TRUE_TOKENS: &[&str] = &["true", "yes", "on"];
const FALSE_TOKENS: &[&str] = &["false", "no", "off"];

/// Parse one of the recognized boolean tokens (case-insensitive)
pub fn parse_boolean(value: &str) -> Option<bool> {
    let value = value.trim();
    if TRUE_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(value)) {
        Some(true)
    } else if FALSE_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(value)) {
        Some(false)
    } else {
        None
    }
}

/// Resolve a path attribute against the project base directory
pub fn resolve_path(base_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Inputs to a literal coercion
pub struct Coercion<'a> {
    pub element: &'a str,
    pub attribute: &'a str,
    pub base_dir: &'a Path,
    pub legacy_booleans: bool,
}

impl Coercion<'_> {
    /// Coerce a property-resolved value; references are resolved by the caller
    pub fn apply(&self, kind: AttributeKind, value: String) -> ConfigResult<AttributeValue> {
        match kind {
            AttributeKind::String => {
                if self.legacy_booleans {
                    if let Some(b) = parse_boolean(&value) {
                        return Ok(AttributeValue::Text(b.to_string()));
                    }
                }
                Ok(AttributeValue::Text(value))
            }
            AttributeKind::Boolean => match parse_boolean(&value) {
                Some(b) => Ok(AttributeValue::Boolean(b)),
                None => Err(ConfigError::InvalidBoolean {
                    element: self.element.to_string(),
                    attribute: self.attribute.to_string(),
                    value,
                }),
            },
            AttributeKind::Integer => match value.trim().parse::<i64>() {
                Ok(n) => Ok(AttributeValue::Integer(n)),
                Err(_) => Err(ConfigError::InvalidInteger {
                    element: self.element.to_string(),
                    attribute: self.attribute.to_string(),
                    value,
                }),
            },
            AttributeKind::Path => Ok(AttributeValue::Path(resolve_path(self.base_dir, &value))),
            AttributeKind::Reference => Err(ConfigError::InvalidValue {
                element: self.element.to_string(),
                attribute: self.attribute.to_string(),
                error: "references must be resolved through the registry".to_string(),
            }),
        }
    }
}

/// The slot name if `value` is exactly a slot reference `@{name}`
pub fn slot_reference(value: &str) -> Option<&str> {
    let name = value.strip_prefix("@{")?.strip_suffix('}')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    valid.then_some(name)
}
