//! Filesystem capability
//!
//! The staleness evaluator and the built-in tasks only touch files through
//! [`FileSystem`], so builds can run against the real disk ([`LocalFs`]) or a
//! deterministic in-memory tree ([`MemoryFs`]).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Last modification time
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Direct children of a directory, sorted by path
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn append(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Update the modification time, creating an empty file if needed
    fn touch(&self, path: &Path, time: SystemTime) -> io::Result<()>;

    /// Current time as seen by this filesystem
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// The real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn append(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(contents.as_bytes())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn touch(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.set_modified(time)
    }
}

#[derive(Debug, Clone)]
enum Node {
    File { contents: String, modified: SystemTime },
    Dir { modified: SystemTime },
}

/// An in-memory filesystem with a manual clock
///
/// Every write stamps the file with the current clock value; the clock only
/// moves when [`MemoryFs::advance`] or [`MemoryFs::set_clock`] is called, which
/// makes timestamp comparisons exact.
#[derive(Debug)]
pub struct MemoryFs {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    clock: RefCell<SystemTime>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        MemoryFs {
            nodes: RefCell::new(BTreeMap::new()),
            clock: RefCell::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)),
        }
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut clock = self.clock.borrow_mut();
        *clock += by;
    }

    pub fn set_clock(&self, time: SystemTime) {
        *self.clock.borrow_mut() = time;
    }

    /// Create a file stamped with an explicit time
    pub fn add_file(&self, path: impl AsRef<Path>, contents: &str, modified: SystemTime) {
        let path = normalize(path.as_ref());
        self.ensure_parents(&path);
        self.nodes.borrow_mut().insert(
            path,
            Node::File {
                contents: contents.to_string(),
                modified,
            },
        );
    }

    fn ensure_parents(&self, path: &Path) {
        let now = self.now();
        let mut nodes = self.nodes.borrow_mut();
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Dir { modified: now });
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}: no such file or directory", path.display()),
        )
    }
}

/// Lexically normalize a path (`.` and `..` components)
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.nodes.borrow().contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.nodes.borrow().get(&normalize(path)),
            Some(Node::Dir { .. })
        )
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        match self.nodes.borrow().get(&normalize(path)) {
            Some(Node::File { modified, .. }) | Some(Node::Dir { modified }) => Ok(*modified),
            None => Err(Self::not_found(path)),
        }
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let dir = normalize(dir);
        if !self.is_dir(&dir) {
            return Err(Self::not_found(&dir));
        }
        Ok(self
            .nodes
            .borrow()
            .keys()
            .filter(|path| path.parent() == Some(dir.as_path()))
            .cloned()
            .collect())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get(&path) {
            Some(Node::File { .. }) => {
                nodes.remove(&path);
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            )),
            None => Err(Self::not_found(&path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        if !self.is_dir(&path) {
            return Err(Self::not_found(&path));
        }
        self.nodes
            .borrow_mut()
            .retain(|candidate, _| !candidate.starts_with(&path));
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.nodes.borrow().get(&normalize(path)) {
            Some(Node::File { contents, .. }) => Ok(contents.clone()),
            _ => Err(Self::not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let now = self.now();
        self.add_file(path, contents, now);
        Ok(())
    }

    fn append(&self, path: &Path, contents: &str) -> io::Result<()> {
        let existing = self.read_to_string(path).unwrap_or_default();
        self.write(path, &(existing + contents))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        self.ensure_parents(&path);
        let now = self.now();
        self.nodes
            .borrow_mut()
            .entry(path)
            .or_insert(Node::Dir { modified: now });
        Ok(())
    }

    fn touch(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        let path = normalize(path);
        let contents = self.read_to_string(&path).unwrap_or_default();
        self.add_file(&path, &contents, time);
        Ok(())
    }

    fn now(&self) -> SystemTime {
        *self.clock.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_fs_write_and_list() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/p/src/a.rs"), "fn a() {}").unwrap();
        fs.write(Path::new("/p/src/b.rs"), "fn b() {}").unwrap();

        assert!(fs.is_dir(Path::new("/p/src")));
        assert_eq!(
            fs.list(Path::new("/p/src")).unwrap(),
            vec![PathBuf::from("/p/src/a.rs"), PathBuf::from("/p/src/b.rs")]
        );
        assert_eq!(fs.read_to_string(Path::new("/p/./src/a.rs")).unwrap(), "fn a() {}");
    }

    #[test]
    fn test_memory_fs_clock() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/a"), "").unwrap();
        fs.advance(Duration::from_secs(5));
        fs.write(Path::new("/b"), "").unwrap();

        let a = fs.modified(Path::new("/a")).unwrap();
        let b = fs.modified(Path::new("/b")).unwrap();
        assert_eq!(b.duration_since(a).unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_memory_fs_remove_dir_all() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/out/x/y.txt"), "").unwrap();
        fs.write(Path::new("/keep.txt"), "").unwrap();
        fs.remove_dir_all(Path::new("/out")).unwrap();

        assert!(!fs.exists(Path::new("/out/x/y.txt")));
        assert!(!fs.exists(Path::new("/out")));
        assert!(fs.exists(Path::new("/keep.txt")));
    }

    #[test]
    fn test_local_fs_touch_sets_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stamp");
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);

        LocalFs.touch(&path, time).unwrap();
        assert!(LocalFs.exists(&path));
        assert_eq!(LocalFs.modified(&path).unwrap(), time);
    }
}
