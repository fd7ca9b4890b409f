//! Source/target freshness checks
//!
//! A pure query over file modification times. Nothing is written and the
//! answer only changes when the filesystem does.

use crate::error::{ConfigError, ConfigResult};
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Maps a source name to the names of the files derived from it
pub trait NameMapper {
    /// Zero or more candidate names; an empty result means "no derived file"
    fn map_name(&self, name: &str) -> Vec<String>;
}

/// A source file, named relative to its base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub base: PathBuf,
    pub name: String,
}

impl SourceFile {
    pub fn new(base: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        SourceFile {
            base: base.into(),
            name: name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.base.join(&self.name)
    }
}

fn source_time(fs: &dyn FileSystem, source: &SourceFile) -> ConfigResult<SystemTime> {
    let path = source.path();
    if !fs.exists(&path) {
        return Err(ConfigError::MissingSource(path));
    }
    fs.modified(&path)
        .map_err(|_| ConfigError::MissingSource(path))
}

/// Whether every source is at least as old as what was built from it
///
/// Without a mapper `target` is the single derived file. With a mapper
/// `target` is the directory the mapped names resolve against, and a source
/// is stale when any of its candidates is missing or older than it. Equal
/// timestamps count as up to date. A missing source is an error.
pub fn is_up_to_date(
    fs: &dyn FileSystem,
    target: &Path,
    sources: &[SourceFile],
    mapper: Option<&dyn NameMapper>,
) -> ConfigResult<bool> {
    let mut times = Vec::with_capacity(sources.len());
    for source in sources {
        times.push(source_time(fs, source)?);
    }

    match mapper {
        None => {
            if !fs.exists(target) {
                debug!(target = %target.display(), "Target is missing");
                return Ok(false);
            }
            let target_time = match fs.modified(target) {
                Ok(time) => time,
                Err(_) => return Ok(false),
            };
            Ok(times.iter().all(|time| *time <= target_time))
        }
        Some(mapper) => {
            for (source, time) in sources.iter().zip(&times) {
                for candidate in mapper.map_name(&source.name) {
                    let derived = target.join(&candidate);
                    let fresh = fs.exists(&derived)
                        && fs.modified(&derived).is_ok_and(|derived_time| derived_time >= *time);
                    if !fresh {
                        debug!(
                            source = %source.path().display(),
                            derived = %derived.display(),
                            "Source is newer than its derived file"
                        );
                        return Ok(false);
                    }
                }
            }
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use std::time::Duration;

    struct Suffix(&'static str);

    impl NameMapper for Suffix {
        fn map_name(&self, name: &str) -> Vec<String> {
            match name.strip_suffix(".src") {
                Some(stem) => vec![format!("{}{}", stem, self.0)],
                None => Vec::new(),
            }
        }
    }

    #[test]
    fn test_equal_timestamps_are_up_to_date() {
        let fs = MemoryFs::new();
        let t = fs.now();
        fs.add_file("/p/a.src", "", t);
        fs.add_file("/p/out.bin", "", t);

        let sources = vec![SourceFile::new("/p", "a.src")];
        assert!(is_up_to_date(&fs, Path::new("/p/out.bin"), &sources, None).unwrap());
    }

    #[test]
    fn test_newer_source_is_stale() {
        let fs = MemoryFs::new();
        let t = fs.now();
        fs.add_file("/p/out.bin", "", t);
        fs.add_file("/p/a.src", "", t + Duration::from_millis(1));

        let sources = vec![SourceFile::new("/p", "a.src")];
        assert!(!is_up_to_date(&fs, Path::new("/p/out.bin"), &sources, None).unwrap());
    }

    #[test]
    fn test_missing_target_is_stale() {
        let fs = MemoryFs::new();
        fs.add_file("/p/a.src", "", fs.now());
        let sources = vec![SourceFile::new("/p", "a.src")];
        assert!(!is_up_to_date(&fs, Path::new("/p/out.bin"), &sources, None).unwrap());
    }

    #[test]
    fn test_missing_source_is_error() {
        let fs = MemoryFs::new();
        fs.add_file("/p/out.bin", "", fs.now());
        let sources = vec![SourceFile::new("/p", "gone.src")];
        let result = is_up_to_date(&fs, Path::new("/p/out.bin"), &sources, None);
        assert!(matches!(result, Err(ConfigError::MissingSource(_))));
    }

    #[test]
    fn test_query_is_idempotent() {
        let fs = MemoryFs::new();
        let t = fs.now();
        fs.add_file("/p/a.src", "", t);
        fs.add_file("/p/out.bin", "", t + Duration::from_secs(1));
        let sources = vec![SourceFile::new("/p", "a.src")];

        let first = is_up_to_date(&fs, Path::new("/p/out.bin"), &sources, None).unwrap();
        let second = is_up_to_date(&fs, Path::new("/p/out.bin"), &sources, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mapper_checks_each_candidate() {
        let fs = MemoryFs::new();
        let t = fs.now();
        fs.add_file("/p/src/a.src", "", t);
        fs.add_file("/p/src/b.src", "", t);
        fs.add_file("/p/out/a.out", "", t);

        let sources = vec![
            SourceFile::new("/p/src", "a.src"),
            SourceFile::new("/p/src", "b.src"),
        ];
        let mapper = Suffix(".out");
        assert!(!is_up_to_date(&fs, Path::new("/p/out"), &sources, Some(&mapper)).unwrap());

        fs.add_file("/p/out/b.out", "", t);
        assert!(is_up_to_date(&fs, Path::new("/p/out"), &sources, Some(&mapper)).unwrap());

        fs.add_file("/p/src/b.src", "", t + Duration::from_secs(1));
        assert!(!is_up_to_date(&fs, Path::new("/p/out"), &sources, Some(&mapper)).unwrap());
    }

    #[test]
    fn test_unmapped_source_is_not_stale() {
        let fs = MemoryFs::new();
        fs.add_file("/p/notes.txt", "", fs.now());
        let sources = vec![SourceFile::new("/p", "notes.txt")];
        let mapper = Suffix(".out");
        assert!(is_up_to_date(&fs, Path::new("/p/out"), &sources, Some(&mapper)).unwrap());
    }
}
