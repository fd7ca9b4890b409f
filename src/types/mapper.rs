//! File name mappers
//!
//! A `mapper` element names how a source file name translates to the names
//! of the files derived from it.

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::NameMapper;
use regex::Regex;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MapperKind {
    /// The name itself
    #[default]
    Identity,
    /// The name without its directories
    Flatten,
    /// Always `to`
    Merge,
    /// `from` and `to` with a single `*` wildcard
    Glob,
    /// A regular expression `from` rewritten by `to` (`\1` style groups)
    Regexp,
}

impl FromStr for MapperKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" => Ok(MapperKind::Identity),
            "flatten" => Ok(MapperKind::Flatten),
            "merge" => Ok(MapperKind::Merge),
            "glob" => Ok(MapperKind::Glob),
            "regexp" => Ok(MapperKind::Regexp),
            other => Err(format!(
                "unknown mapper type '{}' (expected identity, flatten, merge, glob or regexp)",
                other
            )),
        }
    }
}

/// Declared mapper settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapper {
    pub kind: MapperKind,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl Mapper {
    pub fn new(kind: MapperKind) -> Self {
        Mapper {
            kind,
            ..Default::default()
        }
    }

    pub fn from_pattern(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    pub fn to_pattern(mut self, to: &str) -> Self {
        self.to = Some(to.to_string());
        self
    }

    fn require<'a>(&self, value: &'a Option<String>, attribute: &str) -> ConfigResult<&'a str> {
        value.as_deref().ok_or_else(|| ConfigError::MissingAttribute {
            element: "mapper".to_string(),
            attribute: attribute.to_string(),
        })
    }

    /// Check the settings and prepare the mapping
    pub fn compile(&self) -> ConfigResult<CompiledMapper> {
        Ok(match self.kind {
            MapperKind::Identity => CompiledMapper::Identity,
            MapperKind::Flatten => CompiledMapper::Flatten,
            MapperKind::Merge => CompiledMapper::Merge(self.require(&self.to, "to")?.to_string()),
            MapperKind::Glob => {
                let (from_prefix, from_suffix) = split_wildcard(self.require(&self.from, "from")?);
                let to = self.require(&self.to, "to")?;
                CompiledMapper::Glob {
                    from_prefix: from_prefix.to_string(),
                    from_suffix: from_suffix.map(str::to_string),
                    to: to.to_string(),
                }
            }
            MapperKind::Regexp => {
                let from = self.require(&self.from, "from")?;
                let pattern = Regex::new(from).map_err(|e| ConfigError::InvalidValue {
                    element: "mapper".to_string(),
                    attribute: "from".to_string(),
                    error: e.to_string(),
                })?;
                CompiledMapper::Regexp {
                    pattern,
                    replacement: group_references(self.require(&self.to, "to")?),
                }
            }
        })
    }
}

/// Split a glob at its `*`
fn split_wildcard(pattern: &str) -> (&str, Option<&str>) {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => (prefix, Some(suffix)),
        None => (pattern, None),
    }
}

/// Rewrite `\N` group references to the `${N}` form
fn group_references(to: &str) -> String {
    let mut out = String::with_capacity(to.len());
    let mut chars = to.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(d)) if d.is_ascii_digit() => {
                out.push_str(&format!("${{{}}}", d));
                chars.next();
            }
            ('$', _) => out.push_str("$$"),
            _ => out.push(c),
        }
    }
    out
}

/// A validated mapper
#[derive(Debug, Clone)]
pub enum CompiledMapper {
    Identity,
    Flatten,
    Merge(String),
    Glob {
        from_prefix: String,
        from_suffix: Option<String>,
        to: String,
    },
    Regexp {
        pattern: Regex,
        replacement: String,
    },
}

impl NameMapper for CompiledMapper {
    fn map_name(&self, name: &str) -> Vec<String> {
        match self {
            CompiledMapper::Identity => vec![name.to_string()],
            CompiledMapper::Flatten => Path::new(name)
                .file_name()
                .map(|n| vec![n.to_string_lossy().into_owned()])
                .unwrap_or_default(),
            CompiledMapper::Merge(to) => vec![to.clone()],
            CompiledMapper::Glob {
                from_prefix,
                from_suffix,
                to,
            } => {
                let Some(from_suffix) = from_suffix else {
                    return if name == from_prefix.as_str() {
                        vec![to.clone()]
                    } else {
                        Vec::new()
                    };
                };
                let matched = name.len() >= from_prefix.len() + from_suffix.len()
                    && name.starts_with(from_prefix.as_str())
                    && name.ends_with(from_suffix.as_str());
                if !matched {
                    return Vec::new();
                }
                let middle = &name[from_prefix.len()..name.len() - from_suffix.len()];
                vec![to.replacen('*', middle, 1)]
            }
            CompiledMapper::Regexp {
                pattern,
                replacement,
            } => match pattern.captures(name) {
                Some(captures) => {
                    let mut out = String::new();
                    captures.expand(replacement, &mut out);
                    vec![out]
                }
                None => Vec::new(),
            },
        }
    }
}

impl Configurable for Mapper {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .try_string("type", |m, v| {
                m.kind = v.parse()?;
                Ok(())
            })
            .string("from", |m, v| m.from = Some(v))
            .string("to", |m, v| m.to = Some(v))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(mapper: Mapper, name: &str) -> Vec<String> {
        mapper.compile().unwrap().map_name(name)
    }

    #[test]
    fn test_identity_and_flatten() {
        assert_eq!(map(Mapper::default(), "a/b.c"), vec!["a/b.c"]);
        assert_eq!(map(Mapper::new(MapperKind::Flatten), "a/b.c"), vec!["b.c"]);
    }

    #[test]
    fn test_merge() {
        let mapper = Mapper::new(MapperKind::Merge).to_pattern("all.zip");
        assert_eq!(map(mapper, "x/y.txt"), vec!["all.zip"]);
    }

    #[test]
    fn test_glob() {
        let mapper = Mapper::new(MapperKind::Glob).from_pattern("*.java").to_pattern("*.class");
        assert_eq!(
            map(mapper.clone(), "org/demo/Main.java"),
            vec!["org/demo/Main.class"]
        );
        assert!(map(mapper, "README.md").is_empty());
    }

    #[test]
    fn test_glob_prefix_and_suffix_do_not_overlap() {
        let mapper = Mapper::new(MapperKind::Glob).from_pattern("ab*ba").to_pattern("*");
        assert!(map(mapper.clone(), "aba").is_empty());
        assert_eq!(map(mapper, "abba"), vec![""]);
    }

    #[test]
    fn test_regexp() {
        let mapper = Mapper::new(MapperKind::Regexp)
            .from_pattern(r"^(.*)\.src$")
            .to_pattern(r"out/\1.bin");
        assert_eq!(map(mapper.clone(), "a/b.src"), vec!["out/a/b.bin"]);
        assert!(map(mapper, "b.txt").is_empty());
    }

    #[test]
    fn test_missing_attribute() {
        let result = Mapper::new(MapperKind::Glob).from_pattern("*.a").compile();
        assert!(matches!(result, Err(ConfigError::MissingAttribute { .. })));
    }

    #[test]
    fn test_unknown_kind() {
        assert!("zip".parse::<MapperKind>().is_err());
        assert_eq!("GLOB".parse::<MapperKind>(), Ok(MapperKind::Glob));
    }

    #[test]
    fn test_group_references() {
        assert_eq!(group_references(r"\1-\2$"), "${1}-${2}$$");
    }
}
