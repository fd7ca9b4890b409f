//! The generic declarative tree
//!
//! A project file is loaded into a tree of [`Element`]s: a tag name, ordered
//! attributes, ordered child elements and optional text. Nothing in this
//! module knows what a tag means; that is decided by the binder.

use std::fmt;

/// Where an element was declared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Project file the element came from (empty for in-memory trees)
    pub file: String,

    /// Breadcrumb path from the document root, e.g. `project/target[build]/echo[1]`
    pub path: String,
}

impl Location {
    pub fn new(file: impl Into<String>, path: impl Into<String>) -> Self {
        Location {
            file: file.into(),
            path: path.into(),
        }
    }

    /// Location of a child element below this one
    pub fn child(&self, segment: &str) -> Self {
        let path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", self.path, segment)
        };
        Location {
            file: self.file.clone(),
            path,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file.is_empty(), self.path.is_empty()) {
            (true, true) => write!(f, "<unknown>"),
            (true, false) => write!(f, "{}", self.path),
            (false, true) => write!(f, "{}", self.file),
            (false, false) => write!(f, "{}: {}", self.file, self.path),
        }
    }
}

/// A declared element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Tag name as written in the project file
    pub tag: String,

    /// Attributes in declaration order
    pub attributes: Vec<(String, String)>,

    /// Nested elements in declaration order
    pub children: Vec<Element>,

    /// Literal text content
    pub text: Option<String>,

    /// Declaration site
    pub location: Location,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Element {
            location: Location::new("", tag.clone()),
            tag,
            ..Default::default()
        }
    }

    /// Add an attribute (builder style)
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a nested element (builder style)
    pub fn child(mut self, mut child: Element) -> Self {
        let segment = format!("{}[{}]", child.tag, self.children.len());
        child.relocate(self.location.child(&segment));
        self.children.push(child);
        self
    }

    /// Set the text content (builder style)
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the location of this element and re-derive its children's
    pub fn relocate(&mut self, location: Location) {
        for (index, child) in self.children.iter_mut().enumerate() {
            let segment = format!("{}[{}]", child.tag, index);
            child.relocate(location.child(&segment));
        }
        self.location = location;
    }

    /// Look up an attribute by name (case-insensitive)
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Text content, if it contains anything but whitespace
    pub fn significant_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.trim().is_empty())
    }

    /// Tag name normalized for lookups
    pub fn key(&self) -> String {
        self.tag.to_ascii_lowercase()
    }
}
