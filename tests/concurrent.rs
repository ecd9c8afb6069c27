//! Concurrency-facing guarantees: environment-lock exclusivity and the
//! primary-store shared/exclusive lock.

use pkgdepot::header::SimpleHeader;
use pkgdepot::lock::{EnvLock, LockMode, PrimaryLock};
use pkgdepot::{Config, PkgDb};
use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn a_second_pkgdb_open_on_the_same_root_is_busy_while_the_first_is_held() {
    let dir = tempdir().unwrap();
    let _first = PkgDb::open(dir.path(), Config::benchmark(), vec![]).unwrap();

    let second = PkgDb::open(
        dir.path(),
        Config {
            lock_retry_ms: 50,
            ..Config::benchmark()
        },
        vec![],
    );
    assert!(second.is_err());
}

#[test]
#[serial]
fn the_environment_lock_releases_on_drop_so_a_later_open_succeeds() {
    let dir = tempdir().unwrap();
    {
        let _db = PkgDb::open(dir.path(), Config::benchmark(), vec![]).unwrap();
    }
    let db2 = PkgDb::open(dir.path(), Config::benchmark(), vec![]);
    assert!(db2.is_ok());
}

#[test]
#[serial]
fn shared_locks_on_the_primary_store_file_coexist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.bin");
    let _a = PrimaryLock::acquire(&path, LockMode::Shared, 200).unwrap();
    let _b = PrimaryLock::acquire(&path, LockMode::Shared, 200).unwrap();
}

#[test]
#[serial]
fn an_exclusive_lock_blocks_a_second_exclusive_lock() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.bin");
    let _held = PrimaryLock::acquire(&path, LockMode::Exclusive, 50).unwrap();
    let second = PrimaryLock::acquire(&path, LockMode::Exclusive, 50);
    assert!(second.is_err());
}

#[test]
#[serial]
fn writes_are_visible_to_a_fresh_handle_opened_after_a_sync() {
    let dir = tempdir().unwrap();
    let hdr_num = {
        let db = PkgDb::open(dir.path(), Config::benchmark(), vec![]).unwrap();
        let hdr_num = db.put_header(&SimpleHeader::new(b"concurrent".to_vec())).unwrap();
        db.sync().unwrap();
        hdr_num
    };
    let db2 = PkgDb::open(dir.path(), Config::benchmark(), vec![]).unwrap();
    assert_eq!(db2.get_header(hdr_num).unwrap(), Some(b"concurrent".to_vec()));
}
