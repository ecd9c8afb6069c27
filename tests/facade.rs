//! Facade integration tests against the file-backed store (no legacy
//! marker present, so `detect_backend` binds `BackendKind::File`).

use pkgdepot::header::SimpleHeader;
use pkgdepot::{Config, IndexedTag, PkgDb};
use tempfile::tempdir;

const PROVIDENAME: u32 = 1047;
const REQUIRENAME: u32 = 1049;

fn open_db(root: &std::path::Path) -> PkgDb {
    PkgDb::open(
        root,
        Config {
            min_writes: false,
            ..Config::benchmark()
        },
        vec![
            IndexedTag {
                tag: PROVIDENAME,
                file_name: "Providename".into(),
            },
            IndexedTag {
                tag: REQUIRENAME,
                file_name: "Requirename".into(),
            },
        ],
    )
    .unwrap()
}

#[test]
fn put_then_get_round_trips_the_blob() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    let header = SimpleHeader::new(b"hello header".to_vec());
    let hdr_num = db.put_header(&header).unwrap();
    assert_eq!(db.get_header(hdr_num).unwrap(), Some(b"hello header".to_vec()));
}

#[test]
fn put_header_indexes_every_tag_occurrence() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    let header = SimpleHeader::new(vec![]).with_tag(PROVIDENAME, vec![b"libfoo.so.1".to_vec(), b"libfoo".to_vec()]);
    let hdr_num = db.put_header(&header).unwrap();

    let set = db.iter_by_key(PROVIDENAME, b"libfoo.so.1").unwrap().unwrap();
    let hits: Vec<_> = set.iter().map(|r| (r.hdr_num, r.tag_num)).collect();
    assert_eq!(hits, vec![(hdr_num, 0)]);

    let set2 = db.iter_by_key(PROVIDENAME, b"libfoo").unwrap().unwrap();
    let hits2: Vec<_> = set2.iter().map(|r| (r.hdr_num, r.tag_num)).collect();
    assert_eq!(hits2, vec![(hdr_num, 1)]);
}

#[test]
fn remove_prunes_every_index_entry_and_the_primary_record() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    let header = SimpleHeader::new(b"x".to_vec()).with_tag(PROVIDENAME, vec![b"thing".to_vec()]);
    let hdr_num = db.put_header(&header).unwrap();

    db.remove(hdr_num, &header).unwrap();

    assert_eq!(db.get_header(hdr_num).unwrap(), None);
    assert!(db.iter_by_key(PROVIDENAME, b"thing").unwrap().is_none());
}

#[test]
fn iter_headers_sees_every_non_removed_record() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    let a = db.put_header(&SimpleHeader::new(b"a".to_vec())).unwrap();
    let b = db.put_header(&SimpleHeader::new(b"b".to_vec())).unwrap();
    let c = db.put_header(&SimpleHeader::new(b"c".to_vec())).unwrap();
    db.remove(b, &SimpleHeader::new(b"b".to_vec())).unwrap();

    let mut remaining: Vec<u32> = db.iter_headers().unwrap().into_iter().map(|(h, _)| h).collect();
    remaining.sort();
    assert_eq!(remaining, vec![a, c]);
}

#[test]
fn min_writes_config_skips_secondary_indexes() {
    let dir = tempdir().unwrap();
    let db = PkgDb::open(
        dir.path(),
        Config {
            min_writes: true,
            ..Config::benchmark()
        },
        vec![IndexedTag {
            tag: PROVIDENAME,
            file_name: "Providename".into(),
        }],
    )
    .unwrap();
    let header = SimpleHeader::new(vec![]).with_tag(PROVIDENAME, vec![b"thing".to_vec()]);
    db.put_header(&header).unwrap();
    assert!(db.iter_by_key(PROVIDENAME, b"thing").unwrap().is_none());
}

#[test]
fn sync_persists_primary_and_index_data_across_reopen() {
    let dir = tempdir().unwrap();
    let hdr_num = {
        let db = open_db(dir.path());
        let header = SimpleHeader::new(b"persisted".to_vec()).with_tag(PROVIDENAME, vec![b"thing".to_vec()]);
        let hdr_num = db.put_header(&header).unwrap();
        db.sync().unwrap();
        hdr_num
    };

    let db2 = open_db(dir.path());
    assert_eq!(db2.get_header(hdr_num).unwrap(), Some(b"persisted".to_vec()));
    assert!(db2.iter_by_key(PROVIDENAME, b"thing").unwrap().is_some());
}
