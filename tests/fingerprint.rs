//! Fingerprint cache properties and the symlinked-directory alias
//! scenario, against real temp directories.

use pkgdepot::model::{Te, TeFile, TeType};
use pkgdepot::FingerprintCache;
use tempfile::tempdir;

#[test]
fn equality_is_reflexive_symmetric_and_transitive() {
    let dir = tempdir().unwrap();
    let mut cache = FingerprintCache::new();

    let a = cache.lookup(dir.path().to_str().unwrap(), "file.txt");
    assert_eq!(a, a, "reflexive");

    let b = cache.lookup(dir.path().to_str().unwrap(), "file.txt");
    assert_eq!(a, b, "symmetric: a == b");
    assert_eq!(b, a, "symmetric: b == a");

    let c = cache.lookup(&format!("{}/", dir.path().to_str().unwrap()), "file.txt");
    assert_eq!(b, c, "transitive: b == c");
    assert_eq!(a, c, "transitive: a == c");
}

#[test]
fn different_directories_are_not_equal() {
    let dir_a = tempdir().unwrap();
    let dir_b = tempdir().unwrap();
    let mut cache = FingerprintCache::new();
    let a = cache.lookup(dir_a.path().to_str().unwrap(), "file.txt");
    let b = cache.lookup(dir_b.path().to_str().unwrap(), "file.txt");
    assert_ne!(a, b);
}

#[test]
fn symlinked_directory_alias_resolves_to_the_same_fingerprint() {
    let root = tempdir().unwrap();
    let real_dir = root.path().join("usr/bin");
    std::fs::create_dir_all(&real_dir).unwrap();
    std::fs::write(real_dir.join("tool"), b"binary").unwrap();

    let alias = root.path().join("bin");
    std::os::unix::fs::symlink("usr/bin", &alias).unwrap();

    let mut cache = FingerprintCache::new();

    let mut te = Te::new("pkg", "1.0-1", TeType::Added);
    te.files.push(TeFile {
        dir: format!("{}/", root.path().join("usr/bin").display()),
        base: "tool".into(),
        is_symlink: false,
        link_target: None,
    });
    te.files.push(TeFile {
        dir: format!("{}/", root.path().display()),
        base: "bin".into(),
        is_symlink: true,
        link_target: Some("usr/bin".into()),
    });

    let fps = cache.populate(std::slice::from_ref(&te));
    let real_fp = fps[&(0, 0)];

    let via_alias = cache.lookup(&format!("{}/", alias.display()), "tool");
    assert_eq!(real_fp, via_alias);
}

#[test]
fn populate_is_empty_for_a_transaction_with_no_added_elements() {
    let mut cache = FingerprintCache::new();
    let mut te = Te::new("pkg", "1.0-1", TeType::Removed);
    te.files.push(TeFile {
        dir: "/tmp/".into(),
        base: "gone".into(),
        is_symlink: false,
        link_target: None,
    });
    let fps = cache.populate(std::slice::from_ref(&te));
    assert!(fps.is_empty());
}
