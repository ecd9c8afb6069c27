//! Read-only reader for the legacy on-disk hash/btree page format (§4.A),
//! grounded on `examples/original_source/lib/backend/bdb_ro.c`.

pub mod btreefmt;
pub mod cursor;
pub mod hash;
pub mod meta;
pub mod overflow;
pub mod page;

use std::fs;
use std::path::Path;

use crate::backend::{Backend, Cursor as CursorTrait, SearchType};
use crate::config::BackendKind;
use crate::error::{PkgDbError, Result};
use crate::indexset::IndexSet;
use cursor::LegacyCursor;
use meta::MetaPage;

/// Marker file name the backend-detection probe checks for (§6 "Persisted
/// state layout").
pub const MARKER_FILE: &str = "Packages";

pub struct LegacyBackend {
    file: Vec<u8>,
    meta: MetaPage,
}

impl LegacyBackend {
    /// Opens `root_dir`/`file_name` as a legacy hash/btree database.
    pub fn open(root_dir: &Path, file_name: &str) -> Result<Self> {
        let path = root_dir.join(file_name);
        let file = fs::read(&path)?;
        let meta = meta::parse_meta(&file)?;
        Ok(LegacyBackend { file, meta })
    }

    pub fn is_swapped_flag(&self) -> bool {
        self.meta.swapped
    }
}

impl Backend for LegacyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LegacyRo
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn is_swapped(&self) -> bool {
        self.meta.swapped
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn verify(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn cursor_open(&self, write: bool) -> Result<Box<dyn CursorTrait + '_>> {
        if write {
            return Err(PkgDbError::ReadOnly("legacy backend"));
        }
        Ok(Box::new(LegacyDbCursor {
            cur: LegacyCursor::new(&self.file, &self.meta),
            swapped: self.meta.swapped,
        }))
    }
}

struct LegacyDbCursor<'a> {
    cur: LegacyCursor<'a>,
    swapped: bool,
}

fn encode_hdr_key(hdr_num: u32, swapped: bool) -> [u8; 4] {
    if swapped {
        hdr_num.swap_bytes().to_ne_bytes()
    } else {
        hdr_num.to_ne_bytes()
    }
}

impl<'a> CursorTrait for LegacyDbCursor<'a> {
    fn pkg_get(&mut self, hdr_num: u32) -> Result<Option<Vec<u8>>> {
        let key = encode_hdr_key(hdr_num, self.swapped);
        Ok(self.cur.lookup(&key)?.map(|(_, v)| v))
    }

    fn pkg_put(&mut self, _hdr_num: u32, _blob: &[u8]) -> Result<()> {
        Err(PkgDbError::ReadOnly("legacy backend"))
    }

    fn pkg_del(&mut self, _hdr_num: u32) -> Result<()> {
        Err(PkgDbError::ReadOnly("legacy backend"))
    }

    fn pkg_new(&mut self) -> Result<u32> {
        Err(PkgDbError::ReadOnly("legacy backend"))
    }

    fn pkg_key(&self) -> Option<u32> {
        None
    }

    fn idx_get(&mut self, key: &[u8], search: SearchType) -> Result<Option<IndexSet>> {
        match search {
            SearchType::Exact => match self.cur.lookup(key)? {
                Some((_, val)) => Ok(Some(IndexSet::decode(&val, self.swapped)?)),
                None => Ok(None),
            },
            SearchType::Prefix => {
                let mut combined: Option<IndexSet> = None;
                let mut next = self.cur.lookup_ge(key)?;
                loop {
                    match next {
                        Some((k, v)) if k.len() >= key.len() && &k[..key.len()] == key => {
                            let set = IndexSet::decode(&v, self.swapped)?;
                            match &mut combined {
                                Some(acc) => acc.append_set(&set),
                                None => combined = Some(set),
                            }
                            next = self.cur.next()?;
                        }
                        _ => break,
                    }
                }
                Ok(combined)
            }
        }
    }

    fn idx_put(&mut self, _key: &[u8], _set: &IndexSet) -> Result<()> {
        Err(PkgDbError::ReadOnly("legacy backend"))
    }

    fn idx_del(&mut self, _key: &[u8]) -> Result<()> {
        Err(PkgDbError::ReadOnly("legacy backend"))
    }

    fn idx_key(&self) -> Option<Vec<u8>> {
        None
    }

    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        self.cur.next()
    }
}
