//! Property expansion for strings
//!
//! Replaces `${name}` references in a single pass. Unknown names are left as
//! written and `$$` stands for a literal `$`.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\$|\$\{([^}]*)\}").expect("valid property pattern"))
}

/// Expand property references in a string
pub fn interpolate(s: &str, vars: &HashMap<String, String>) -> String {
    if !s.contains('$') {
        return s.to_string();
    }

    reference_pattern()
        .replace_all(s, |caps: &Captures| match caps.get(1) {
            None => "$".to_string(),
            Some(name) => match vars.get(name.as_str()) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            },
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_interpolation() {
        let result = interpolate("Hello, ${name}!", &vars(&[("name", "world")]));
        assert_eq!(result, "Hello, world!");
    }

    #[test]
    fn test_multiple_variables() {
        let result = interpolate("${first} ${last}", &vars(&[("first", "John"), ("last", "Doe")]));
        assert_eq!(result, "John Doe");
    }

    #[test]
    fn test_undefined_variable_is_kept() {
        let result = interpolate("Hello, ${undefined}!", &HashMap::new());
        assert_eq!(result, "Hello, ${undefined}!");
    }

    #[test]
    fn test_single_pass() {
        let vars = vars(&[("outer", "${inner}"), ("inner", "value")]);
        let once = interpolate("Result: ${outer}", &vars);
        assert_eq!(once, "Result: ${inner}");
        assert_eq!(interpolate("Result: ${outer}", &vars), once);
    }

    #[test]
    fn test_dollar_escape() {
        let result = interpolate("cost: $$5 and $${name}", &vars(&[("name", "x")]));
        assert_eq!(result, "cost: $5 and ${name}");
    }

    #[test]
    fn test_empty_variable_name() {
        let result = interpolate("Value: ${}", &HashMap::new());
        assert_eq!(result, "Value: ${}");
    }
}
