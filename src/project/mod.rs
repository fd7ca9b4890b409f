//! Projects and their build context
//!
//! A [`Project`] is one loaded project file: its targets, the top-level task
//! list, and the property and reference state a build mutates. The
//! [`BuildContext`] holds what a build invocation shares across the project
//! and every sub-build it delegates to: the type table, the binder's schema
//! cache, the filesystem and the build options.

pub mod interpolate;
pub mod properties;
pub mod references;
pub mod target;
pub mod types;

pub use properties::*;
pub use references::*;
pub use target::*;
pub use types::*;

use crate::binder::Binder;
use crate::config::{parse_project_file, validate_project, Element, Location};
use crate::error::{ConfigError, RantError, Result};
use crate::fs::{FileSystem, LocalFs};
use crate::runner::Verbosity;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Settings for one build invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Coerce boolean-looking string attributes to `true` / `false`
    pub legacy_booleans: bool,

    pub verbosity: Verbosity,
}

/// State shared by a build and its sub-builds
pub struct BuildContext {
    pub types: TypeTable,
    pub binder: Binder,
    pub fs: Rc<dyn FileSystem>,
    pub options: BuildOptions,
}

impl BuildContext {
    pub fn new(types: TypeTable, fs: Rc<dyn FileSystem>, options: BuildOptions) -> Self {
        BuildContext {
            types,
            binder: Binder::new(),
            fs,
            options,
        }
    }

    /// Built-in types on the local filesystem
    pub fn local(options: BuildOptions) -> Self {
        Self::new(TypeTable::with_builtins(), Rc::new(LocalFs), options)
    }
}

/// Root project attributes
const PROJECT_ATTRIBUTES: &[&str] = &["name", "default", "basedir", "description"];

/// A loaded project
pub struct Project {
    context: Rc<BuildContext>,
    name: Option<String>,
    description: Option<String>,
    base_dir: PathBuf,
    file: Option<PathBuf>,
    default_target: Option<String>,
    targets: Rc<Vec<Target>>,
    implicit: Rc<Vec<Element>>,
    pub properties: PropertyStore,
    pub references: ReferenceRegistry,
    halt_on_failure: bool,
    implicit_done: bool,
}

impl Project {
    /// Build a project from a parsed `project` element
    ///
    /// Relative paths, including the root's `basedir`, resolve against
    /// `dir`. The project is validated before it is returned.
    pub fn load(context: Rc<BuildContext>, root: Element, dir: &Path) -> Result<Self> {
        if !root.tag.eq_ignore_ascii_case("project") {
            return Err(RantError::from(ConfigError::Invalid(format!(
                "root element must be <project>, found <{}>",
                root.tag
            )))
            .at(&root.location));
        }

        for (key, _) in &root.attributes {
            if !PROJECT_ATTRIBUTES.contains(&key.to_ascii_lowercase().as_str()) {
                return Err(RantError::from(ConfigError::UnsupportedAttribute {
                    element: "project".to_string(),
                    attribute: key.clone(),
                })
                .at(&root.location));
            }
        }
        if root.significant_text().is_some() {
            return Err(RantError::from(ConfigError::UnsupportedText("project".to_string()))
                .at(&root.location));
        }

        let base_dir = match root.attribute("basedir") {
            Some(base) => crate::binder::resolve_path(dir, base),
            None => dir.to_path_buf(),
        };

        let mut targets = Vec::new();
        let mut implicit = Vec::new();
        for child in &root.children {
            if child.tag.eq_ignore_ascii_case("target") {
                targets.push(Target::from_element(child).map_err(|e| {
                    RantError::from(e).at(&child.location)
                })?);
            } else {
                implicit.push(child.clone());
            }
        }

        validate_project(&context, &targets, &implicit)?;

        let mut project = Project {
            name: root.attribute("name").map(str::to_string),
            description: root.attribute("description").map(str::to_string),
            default_target: root.attribute("default").map(str::to_string),
            base_dir,
            file: None,
            targets: Rc::new(targets),
            implicit: Rc::new(implicit),
            properties: PropertyStore::new(),
            references: ReferenceRegistry::new(),
            halt_on_failure: false,
            implicit_done: false,
            context,
        };

        if let Some(default) = &project.default_target {
            if project.target(default).is_none() {
                return Err(RantError::from(ConfigError::TargetNotFound(default.clone()))
                    .at(&root.location));
            }
        }

        project.declare_top_level();
        project.set_builtin_properties();
        debug!(
            name = ?project.name,
            targets = project.targets.len(),
            base_dir = %project.base_dir.display(),
            "Loaded project"
        );
        Ok(project)
    }

    /// Parse, load and validate a project file
    pub fn load_file(context: Rc<BuildContext>, path: &Path) -> Result<Self> {
        let root = parse_project_file(path)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut project = Self::load(context, root, dir)?;
        project.file = Some(path.to_path_buf());
        project
            .properties
            .set_new("rant.file", path.display().to_string());
        Ok(project)
    }

    /// Declare top-level data types carrying an `id`
    fn declare_top_level(&mut self) {
        let implicit = Rc::clone(&self.implicit);
        for element in implicit.iter() {
            let is_data_type = self
                .context
                .types
                .get(&element.tag)
                .is_some_and(|d| d.kind == TypeKind::DataType);
            if let (true, Some(id)) = (is_data_type, element.attribute("id")) {
                self.references.declare(id, element.clone());
            }
        }
    }

    fn set_builtin_properties(&mut self) {
        self.properties
            .set_new("basedir", self.base_dir.display().to_string());
        if let Some(name) = &self.name {
            self.properties.set_new("project.name", name.clone());
        }
        if let Some(file) = &self.file {
            self.properties
                .set_new("rant.file", file.display().to_string());
        }
    }

    /// A project for a sub-build of this one
    ///
    /// Properties are copied when `inherit_all` is set; otherwise only user
    /// properties carry over. References are shared by identity when
    /// `inherit_refs` is set; otherwise only top-level declarations and the
    /// live slots are visible. The derived project halts on any failure and
    /// runs its own top-level tasks.
    pub fn derive(&self, inherit_all: bool, inherit_refs: bool) -> Project {
        let properties = if inherit_all {
            self.properties.clone()
        } else {
            let mut clean = PropertyStore::new();
            for (name, value) in self.properties.user_properties() {
                clean.set_user(name, value);
            }
            clean
        };
        let references = if inherit_refs {
            self.references.clone()
        } else {
            self.references.slots_only()
        };

        let mut derived = Project {
            context: Rc::clone(&self.context),
            name: self.name.clone(),
            description: self.description.clone(),
            base_dir: self.base_dir.clone(),
            file: self.file.clone(),
            default_target: self.default_target.clone(),
            targets: Rc::clone(&self.targets),
            implicit: Rc::clone(&self.implicit),
            properties,
            references,
            halt_on_failure: true,
            implicit_done: false,
        };
        if !inherit_refs {
            derived.declare_top_level();
        }
        derived.set_builtin_properties();
        derived
    }

    pub fn context(&self) -> Rc<BuildContext> {
        Rc::clone(&self.context)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn default_target(&self) -> Option<&str> {
        self.default_target.as_deref()
    }

    pub fn targets(&self) -> Rc<Vec<Target>> {
        Rc::clone(&self.targets)
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Top-level elements outside any target
    pub fn implicit_tasks(&self) -> Rc<Vec<Element>> {
        Rc::clone(&self.implicit)
    }

    pub fn verbosity(&self) -> Verbosity {
        self.context.options.verbosity
    }

    /// Whether every task failure aborts the build regardless of its policy
    pub fn halts_on_failure(&self) -> bool {
        self.halt_on_failure
    }

    pub fn set_halt_on_failure(&mut self, halt: bool) {
        self.halt_on_failure = halt;
    }

    /// Mark the top-level tasks as run, returning whether they still had to
    pub(crate) fn take_implicit(&mut self) -> bool {
        !std::mem::replace(&mut self.implicit_done, true)
    }

    /// Location of the project root element
    pub fn location(&self) -> Location {
        let file = self
            .file
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_default();
        Location::new(file, "project")
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("base_dir", &self.base_dir)
            .field("targets", &self.targets.len())
            .field("properties", &self.properties.len())
            .field("halt_on_failure", &self.halt_on_failure)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_project;
    use crate::fs::MemoryFs;

    fn context() -> Rc<BuildContext> {
        Rc::new(BuildContext::new(
            TypeTable::with_builtins(),
            Rc::new(MemoryFs::new()),
            BuildOptions::default(),
        ))
    }

    fn load(yaml: &str) -> Result<Project> {
        let root = parse_project(yaml, None)?;
        Project::load(context(), root, Path::new("/work"))
    }

    #[test]
    fn test_builtin_properties() {
        let project = load("project: { name: demo, basedir: sub }").unwrap();
        assert_eq!(project.properties.get("basedir"), Some("/work/sub"));
        assert_eq!(project.properties.get("project.name"), Some("demo"));
        assert_eq!(project.base_dir(), Path::new("/work/sub"));
    }

    #[test]
    fn test_targets_and_implicit_tasks() {
        let project = load(
            r#"
project:
  default: b
  children:
    - property: { name: x, value: "1" }
    - target: { name: a }
    - target: { name: b, depends: a }
"#,
        )
        .unwrap();
        assert_eq!(project.targets().len(), 2);
        assert_eq!(project.implicit_tasks().len(), 1);
        assert_eq!(project.target("b").unwrap().depends, vec!["a"]);
        assert_eq!(project.default_target(), Some("b"));
    }

    #[test]
    fn test_top_level_ids_are_declared() {
        let project = load(
            r#"
project:
  children:
    - fileset: { id: sources, dir: src }
    - echo: { message: hi }
"#,
        )
        .unwrap();
        assert!(matches!(
            project.references.entry("sources"),
            Some(Entry::Declared(_))
        ));
    }

    #[test]
    fn test_unknown_element_fails_validation() {
        let err = load(
            r#"
project:
  children:
    - target:
        name: build
        children:
          - javac: { srcdir: src }
"#,
        )
        .unwrap_err();
        assert!(matches!(err.as_config(), Some(ConfigError::UnknownElement(_))));
        assert!(err.to_string().contains("project/target[build]/javac[0]"));
    }

    #[test]
    fn test_unsupported_attribute_fails_validation() {
        let err = load(
            r#"
project:
  children:
    - echo: { message: hi, colour: red }
"#,
        )
        .unwrap_err();
        match err.as_config() {
            Some(ConfigError::UnsupportedAttribute { element, attribute }) => {
                assert_eq!(element, "echo");
                assert_eq!(attribute, "colour");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_default_target() {
        let err = load("project: { default: nope }").unwrap_err();
        assert!(matches!(err.as_config(), Some(ConfigError::TargetNotFound(_))));
    }

    #[test]
    fn test_root_must_be_project() {
        let err = Project::load(context(), Element::new("module"), Path::new("/")).err();
        assert!(matches!(
            err.as_ref().and_then(|e| e.as_config()),
            Some(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_derive_without_inheritance() {
        let mut project = load("project: { name: demo }").unwrap();
        project.properties.set_new("x", "1");
        project.properties.set_user("mode", "release");
        project.references.define_slot("file", Slot::new());

        let derived = project.derive(false, false);
        assert_eq!(derived.properties.get("x"), None);
        assert_eq!(derived.properties.get("mode"), Some("release"));
        assert_eq!(derived.properties.get("project.name"), Some("demo"));
        assert!(derived.references.slot("file").is_some());
        assert!(derived.halts_on_failure());
    }

    #[test]
    fn test_derive_shares_references_by_identity() {
        let mut project = load("project: {}").unwrap();
        let object = Rc::new(StoredObject::new("fileset", 7u32));
        project.references.insert("shared", Rc::clone(&object));

        let derived = project.derive(true, true);
        assert!(Rc::ptr_eq(&derived.references.ready("shared").unwrap(), &object));
        assert!(project.derive(true, false).references.ready("shared").is_none());
    }
}
