//! Integration tests for the `uptodate` task and file freshness

mod common;

use common::{load, names, read};
use rant::error::ConfigError;
use rant::fs::{FileSystem, MemoryFs};
use rant::runner::Executor;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

const SINGLE: &str = r#"
project:
  children:
    - target:
        name: check
        children:
          - uptodate: { property: fresh, srcfile: src/a.c, targetfile: out/a.o }
"#;

fn check(fs: &Rc<MemoryFs>, yaml: &str) -> Option<String> {
    let mut project = load(yaml, Rc::clone(fs));
    Executor::new(&mut project).run(&names(&["check"])).unwrap();
    project.properties.get("fresh").map(str::to_string)
}

#[test]
fn test_equal_timestamps_count_as_up_to_date() {
    let fs = Rc::new(MemoryFs::new());
    let t = fs.now();
    fs.add_file("/work/src/a.c", "", t);
    fs.add_file("/work/out/a.o", "", t);

    assert_eq!(check(&fs, SINGLE), Some("true".to_string()));
}

#[test]
fn test_newer_source_is_stale() {
    let fs = Rc::new(MemoryFs::new());
    let t = fs.now();
    fs.add_file("/work/out/a.o", "", t);
    fs.add_file("/work/src/a.c", "", t + Duration::from_millis(1));

    assert_eq!(check(&fs, SINGLE), None);
}

#[test]
fn test_missing_target_is_stale() {
    let fs = Rc::new(MemoryFs::new());
    fs.add_file("/work/src/a.c", "", fs.now());

    assert_eq!(check(&fs, SINGLE), None);
}

#[test]
fn test_missing_source_is_an_error() {
    let fs = Rc::new(MemoryFs::new());
    fs.add_file("/work/out/a.o", "", fs.now());

    let mut project = load(SINGLE, fs);
    let err = Executor::new(&mut project)
        .run(&names(&["check"]))
        .unwrap_err();
    assert!(matches!(
        err.as_config(),
        Some(ConfigError::MissingSource(_))
    ));
}

#[test]
fn test_evaluation_is_idempotent_and_read_only() {
    let fs = Rc::new(MemoryFs::new());
    let t = fs.now();
    fs.add_file("/work/src/a.c", "", t);
    fs.add_file("/work/out/a.o", "", t + Duration::from_secs(1));
    fs.advance(Duration::from_secs(10));

    let first = check(&fs, SINGLE);
    let second = check(&fs, SINGLE);
    assert_eq!(first, Some("true".to_string()));
    assert_eq!(first, second);
    assert_eq!(fs.modified(Path::new("/work/src/a.c")).unwrap(), t);
    assert_eq!(
        fs.modified(Path::new("/work/out/a.o")).unwrap(),
        t + Duration::from_secs(1)
    );
}

#[test]
fn test_touch_then_check() {
    let fs = Rc::new(MemoryFs::new());
    let t = fs.now();
    fs.add_file("/work/src/a.c", "", t);
    fs.advance(Duration::from_millis(5));

    let mut project = load(
        r#"
project:
  children:
    - target:
        name: build
        children:
          - uptodate: { property: fresh, srcfile: src/a.c, targetfile: out/a.o }
          - touch: { file: out/a.o }
          - uptodate: { property: fresh.after, srcfile: src/a.c, targetfile: out/a.o }
"#,
        Rc::clone(&fs),
    );
    Executor::new(&mut project).run(&names(&["build"])).unwrap();

    assert_eq!(project.properties.get("fresh"), None);
    assert_eq!(project.properties.get("fresh.after"), Some("true"));
    assert_eq!(
        fs.modified(Path::new("/work/out/a.o")).unwrap(),
        t + Duration::from_millis(5)
    );
}

const MAPPED: &str = r#"
project:
  children:
    - fileset: { id: sources, dir: src, includes: "**/*.c" }
    - target:
        name: check
        children:
          - uptodate:
              property: fresh
              value: "yes"
              srcfilesref: sources
              targetfile: out
              children:
                - mapper: { type: glob, from: "*.c", to: "*.o" }
"#;

#[test]
fn test_mapped_sources() {
    let fs = Rc::new(MemoryFs::new());
    let t = fs.now();
    fs.add_file("/work/src/a.c", "", t);
    fs.add_file("/work/src/lib/b.c", "", t);
    fs.add_file("/work/src/notes.txt", "", t + Duration::from_secs(5));
    fs.add_file("/work/out/a.o", "", t);
    fs.add_file("/work/out/lib/b.o", "", t + Duration::from_secs(1));

    assert_eq!(check(&fs, MAPPED), Some("yes".to_string()));

    fs.add_file("/work/src/lib/b.c", "", t + Duration::from_secs(2));
    assert_eq!(check(&fs, MAPPED), None);
}

#[test]
fn test_nested_source_sets() {
    let fs = Rc::new(MemoryFs::new());
    let t = fs.now();
    fs.add_file("/work/src/a.c", "", t);
    fs.add_file("/work/src/b.c", "", t + Duration::from_secs(1));
    fs.add_file("/work/app.bin", "", t + Duration::from_secs(1));

    let yaml = r#"
project:
  children:
    - target:
        name: check
        children:
          - uptodate:
              property: fresh
              targetfile: app.bin
              children:
                - srcfiles: { dir: src, includes: "*.c" }
"#;
    assert_eq!(check(&fs, yaml), Some("true".to_string()));
}

#[test]
fn test_delete_and_mkdir() {
    let fs = Rc::new(MemoryFs::new());
    let t = fs.now();
    fs.add_file("/work/build/a.o", "", t);
    fs.add_file("/work/build/keep.txt", "", t);
    fs.add_file("/work/tmp/x", "", t);

    let mut project = load(
        r#"
project:
  children:
    - target:
        name: clean
        children:
          - delete:
              children:
                - fileset: { dir: build, includes: "*.o" }
          - delete: { dir: tmp }
          - delete: { file: missing.txt }
          - mkdir: { dir: dist/pkg }
          - echo: { message: done, file: dist/pkg/status.txt }
"#,
        Rc::clone(&fs),
    );
    Executor::new(&mut project).run(&names(&["clean"])).unwrap();

    assert!(!fs.exists(Path::new("/work/build/a.o")));
    assert!(fs.exists(Path::new("/work/build/keep.txt")));
    assert!(!fs.exists(Path::new("/work/tmp")));
    assert!(fs.is_dir(Path::new("/work/dist/pkg")));
    assert_eq!(read(&fs, "dist/pkg/status.txt"), "done\n");
}
