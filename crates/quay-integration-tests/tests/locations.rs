//! Integration tests for location discovery feeding module loaders.

use std::path::PathBuf;
use std::sync::Arc;

use quay_loader::{LocationKind, LocationResolver, Resolver, build_locations, create_loader};
use quay_test::write_tree;

#[test]
fn test_directories_precede_their_children() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("classes");
    write_tree(&root, &[("a/b.wasm", "b")]);
    std::fs::create_dir_all(root.join("a/c")).unwrap();

    let set = build_locations(&[root.clone()]);
    let position = |p: PathBuf| set.position(&p).unwrap();

    let a = position(root.join("a"));
    let b = position(root.join("a/b.wasm"));
    let c = position(root.join("a/c"));
    assert!(position(root.clone()) < a);
    assert!(a < b);
    assert!(a < c);

    let locations = set.into_locations();
    let kind_of = |p: PathBuf| {
        locations
            .iter()
            .find(|l| l.path() == p)
            .map(quay_loader::Location::kind)
            .unwrap()
    };
    assert_eq!(kind_of(root.join("a/b.wasm")), LocationKind::File);
    assert_eq!(kind_of(root.join("a/c")), LocationKind::Directory);
}

#[test]
fn test_file_and_directory_locations_resolve_independently() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("classes");
    write_tree(&root, &[("a/b.wasm", "b"), ("a/c/d.wasm", "d")]);

    let parent: Arc<dyn Resolver> = Arc::new(LocationResolver::new("host", Vec::new()));
    let loader = create_loader("demo", &[root.clone()], parent);

    // Through the root directory.
    assert_eq!(&*loader.resolve("a::b").unwrap().bytes, b"b");
    // Through the `a/c` directory location itself.
    assert_eq!(&*loader.resolve("d").unwrap().bytes, b"d");
    // Through the plain file location answering its own name.
    let by_name = loader.resource("b.wasm").unwrap();
    assert_eq!(by_name.defined_by, "demo");
    // The `a/c` location is addressable as a resource.
    let dir = loader.resource("a/c").unwrap();
    assert_eq!(dir.source, quay_loader::ResourceSource::Path(root.join("a/c")));
}

#[test]
fn test_overlapping_roots_do_not_duplicate_locations() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("lib");
    write_tree(&root, &[("x/One.wasm", "1")]);

    let once = build_locations(&[root.clone()]).len();
    let twice = build_locations(&[root.clone(), root.join("x")]).len();
    assert_eq!(once, twice);
}

#[test]
fn test_missing_roots_contribute_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let set = build_locations(&[dir.path().join("nope")]);
    assert!(set.is_empty());
}
