//! File sets
//!
//! A directory plus include and exclude patterns. Patterns use `/` as the
//! separator on every platform; `*` stays within one path segment, `**`
//! crosses segments, and a pattern ending in `/` matches everything below
//! that directory.

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::error::{ConfigError, ExecutionError, Result};
use crate::fs::FileSystem;
use crate::runner::SourceFile;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// One `include` or `exclude` entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternEntry {
    pub name: String,
}

impl Configurable for PatternEntry {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema.string("name", |p, v| p.name = v)
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    pub dir: Option<PathBuf>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    /// Nested `include` elements
    pub include_entries: Vec<PatternEntry>,
    pub case_sensitive: bool,
}

impl FileSet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSet {
            dir: Some(dir.into()),
            case_sensitive: true,
            ..Default::default()
        }
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.includes.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.excludes.push(pattern.to_string());
        self
    }

    /// Base directory, required before the set can be listed
    pub fn base(&self) -> Result<&Path> {
        self.dir.as_deref().ok_or_else(|| {
            ConfigError::MissingAttribute {
                element: "fileset".to_string(),
                attribute: "dir".to_string(),
            }
            .into()
        })
    }

    fn patterns(&self, patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(compile_pattern(pattern, self.case_sensitive)?);
        }
        builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("invalid pattern set: {}", e)).into())
    }

    /// Matching files in directory walk order
    pub fn files(&self, fs: &dyn FileSystem) -> Result<Vec<SourceFile>> {
        let base = self.base()?;
        if !fs.is_dir(base) {
            return Err(ExecutionError::File {
                path: base.to_path_buf(),
                error: "fileset directory does not exist".to_string(),
            }
            .into());
        }

        let mut include_patterns = self.includes.clone();
        include_patterns.extend(self.include_entries.iter().map(|e| e.name.clone()));
        if include_patterns.is_empty() {
            include_patterns.push("**".to_string());
        }
        let includes = self.patterns(&include_patterns)?;
        let excludes = self.patterns(&self.excludes)?;

        let mut names = Vec::new();
        collect(fs, base, "", &mut names)?;
        Ok(names
            .into_iter()
            .filter(|name| includes.is_match(name) && !excludes.is_match(name))
            .map(|name| SourceFile::new(base, name))
            .collect())
    }
}

/// Pattern list attribute: comma or whitespace separated
fn split_patterns(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Glob> {
    let mut pattern = pattern.replace('\\', "/");
    if pattern.ends_with('/') {
        pattern.push_str("**");
    }
    GlobBuilder::new(&pattern)
        .literal_separator(true)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| ConfigError::Invalid(format!("invalid pattern '{}': {}", pattern, e)).into())
}

/// Relative names of every file below `dir`
fn collect(fs: &dyn FileSystem, dir: &Path, prefix: &str, names: &mut Vec<String>) -> Result<()> {
    let entries = fs.list(dir).map_err(|e| ExecutionError::File {
        path: dir.to_path_buf(),
        error: e.to_string(),
    })?;
    for entry in entries {
        let Some(file_name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let name = if prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", prefix, file_name)
        };
        if fs.is_dir(&entry) {
            collect(fs, &entry, &name, names)?;
        } else {
            names.push(name);
        }
    }
    Ok(())
}

impl Configurable for FileSet {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .path("dir", |f, v| f.dir = Some(v))
            .string("includes", |f, v| f.includes.extend(split_patterns(&v)))
            .string("excludes", |f, v| f.excludes.extend(split_patterns(&v)))
            .boolean("casesensitive", |f, v| f.case_sensitive = v)
            .creator("include", |f| {
                let index = f.include_entries.len();
                f.include_entries.push(PatternEntry::default());
                &mut f.include_entries[index]
            })
            .adder("exclude", |f, p: PatternEntry| f.excludes.push(p.name))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(|| FileSet {
            case_sensitive: true,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    fn tree() -> MemoryFs {
        let fs = MemoryFs::new();
        for path in [
            "/p/src/main.rs",
            "/p/src/lib.rs",
            "/p/src/util/mod.rs",
            "/p/src/util/README.md",
            "/p/src/gen/out.rs",
        ] {
            fs.write(Path::new(path), "").unwrap();
        }
        fs
    }

    fn names(files: Vec<SourceFile>) -> Vec<String> {
        files.into_iter().map(|f| f.name).collect()
    }

    #[test]
    fn test_everything_by_default() {
        let fs = tree();
        let files = FileSet::new("/p/src").files(&fs).unwrap();
        assert_eq!(files.len(), 5);
        assert!(files.iter().all(|f| f.base == Path::new("/p/src")));
    }

    #[test]
    fn test_includes_and_excludes() {
        let fs = tree();
        let set = FileSet::new("/p/src").include("**/*.rs").exclude("gen/");
        assert_eq!(
            names(set.files(&fs).unwrap()),
            vec!["lib.rs", "main.rs", "util/mod.rs"]
        );
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let fs = tree();
        let set = FileSet::new("/p/src").include("*.rs");
        assert_eq!(names(set.files(&fs).unwrap()), vec!["lib.rs", "main.rs"]);
    }

    #[test]
    fn test_case_insensitive() {
        let fs = tree();
        let mut set = FileSet::new("/p/src").include("**/readme.md");
        assert!(set.files(&fs).unwrap().is_empty());
        set.case_sensitive = false;
        assert_eq!(names(set.files(&fs).unwrap()), vec!["util/README.md"]);
    }

    #[test]
    fn test_missing_dir() {
        let fs = tree();
        assert!(FileSet::new("/p/nope").files(&fs).is_err());
        assert!(FileSet::default().files(&fs).is_err());
    }

    #[test]
    fn test_split_patterns() {
        let patterns: Vec<String> = split_patterns("a/**, *.txt  b").collect();
        assert_eq!(patterns, vec!["a/**", "*.txt", "b"]);
    }
}
