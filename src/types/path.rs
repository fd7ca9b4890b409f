//! Path lists
//!
//! An ordered list of locations built from single locations, separated path
//! strings, nested paths and file sets.

use crate::binder::{resolve_path, Configurable, Constructor, SchemaBuilder};
use crate::error::Result;
use crate::fs::FileSystem;
use crate::project::Project;
use crate::types::FileSet;
use std::path::PathBuf;

/// Separator used when a path list is rendered as a string
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// A nested `pathelement`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathElement {
    pub locations: Vec<PathBuf>,
    base_dir: PathBuf,
}

impl Configurable for PathElement {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .path("location", |e, v| e.locations.push(v))
            .string("path", |e, v| {
                let base = e.base_dir.clone();
                e.locations.extend(split_path(&base, &v));
            })
    }

    fn constructor() -> Constructor<Self> {
        Constructor::ProjectAware(|project| PathElement {
            locations: Vec::new(),
            base_dir: project.base_dir().to_path_buf(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPart {
    Location(PathBuf),
    Files(FileSet),
    Nested(PathList),
}

/// An ordered list of filesystem locations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathList {
    parts: Vec<PathPart>,
    base_dir: PathBuf,
}

impl PathList {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        PathList {
            parts: Vec::new(),
            base_dir: base_dir.into(),
        }
    }

    pub fn add_location(&mut self, location: PathBuf) {
        self.parts.push(PathPart::Location(location));
    }

    pub fn add_fileset(&mut self, files: FileSet) {
        self.parts.push(PathPart::Files(files));
    }

    pub fn add_path(&mut self, path: PathList) {
        self.parts.push(PathPart::Nested(path));
    }

    /// Every location in order; file sets expand to their matching files
    pub fn list(&self, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for part in &self.parts {
            match part {
                PathPart::Location(location) => out.push(location.clone()),
                PathPart::Files(files) => {
                    out.extend(files.files(fs)?.into_iter().map(|f| f.path()))
                }
                PathPart::Nested(path) => out.extend(path.list(fs)?),
            }
        }
        Ok(out)
    }

    /// The list joined with the platform path separator
    pub fn render(&self, fs: &dyn FileSystem) -> Result<String> {
        Ok(self
            .list(fs)?
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(&PATH_SEPARATOR.to_string()))
    }
}

/// Split a `:` or `;` separated path string
fn split_path(base: &std::path::Path, value: &str) -> Vec<PathBuf> {
    value
        .split([':', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| resolve_path(base, p))
        .collect()
}

impl Configurable for PathList {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .path("location", |p, v| p.add_location(v))
            .string("path", |p, v| {
                let base = p.base_dir.clone();
                for location in split_path(&base, &v) {
                    p.add_location(location);
                }
            })
            .adder("pathelement", |p, e: PathElement| {
                for location in e.locations {
                    p.add_location(location);
                }
            })
            .adder("fileset", |p, f: FileSet| p.add_fileset(f))
            .adder("path", |p, nested: PathList| p.add_path(nested))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::ProjectAware(project_path)
    }
}

fn project_path(project: &Project) -> PathList {
    PathList::new(project.base_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use std::path::Path;

    #[test]
    fn test_split_path_resolves_against_base() {
        assert_eq!(
            split_path(Path::new("/p"), "lib/a.jar: /opt/b.jar;;c"),
            vec![
                PathBuf::from("/p/lib/a.jar"),
                PathBuf::from("/opt/b.jar"),
                PathBuf::from("/p/c"),
            ]
        );
    }

    #[test]
    fn test_list_expands_filesets_in_order() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/p/lib/x.jar"), "").unwrap();
        fs.write(Path::new("/p/lib/y.jar"), "").unwrap();

        let mut nested = PathList::new("/p");
        nested.add_location(PathBuf::from("/p/last"));

        let mut path = PathList::new("/p");
        path.add_location(PathBuf::from("/p/classes"));
        path.add_fileset(FileSet::new("/p/lib").include("*.jar"));
        path.add_path(nested);

        assert_eq!(
            path.list(&fs).unwrap(),
            vec![
                PathBuf::from("/p/classes"),
                PathBuf::from("/p/lib/x.jar"),
                PathBuf::from("/p/lib/y.jar"),
                PathBuf::from("/p/last"),
            ]
        );
    }

    #[test]
    fn test_render() {
        let fs = MemoryFs::new();
        let mut path = PathList::new("/p");
        path.add_location(PathBuf::from("/a"));
        path.add_location(PathBuf::from("/b"));
        assert_eq!(path.render(&fs).unwrap(), format!("/a{}/b", PATH_SEPARATOR));
    }
}
