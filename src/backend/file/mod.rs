//! Modern single-file backend: a writable alternative to the legacy
//! reader for newly-created database roots.

pub mod pager;

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;

use crate::backend::{Backend, Cursor as CursorTrait, SearchType};
use crate::config::BackendKind;
use crate::error::{PkgDbError, Result};
use crate::indexset::{IndexRecord, IndexSet};
use pager::{Pager, StoreState};

struct Store {
    max_hdr_num: u32,
    primary: BTreeMap<u32, Vec<u8>>,
    index: BTreeMap<Vec<u8>, IndexSet>,
}

impl Store {
    fn from_state(state: StoreState) -> Self {
        let mut index = BTreeMap::new();
        for (key, recs) in state.index {
            let mut set = IndexSet::new(recs.len());
            for (h, t) in recs {
                set.append(IndexRecord::new(h, t), false);
            }
            index.insert(key, set);
        }
        Store {
            max_hdr_num: state.max_hdr_num,
            primary: state.primary.into_iter().collect(),
            index,
        }
    }

    fn to_state(&self) -> StoreState {
        StoreState {
            max_hdr_num: self.max_hdr_num,
            primary: self.primary.iter().map(|(k, v)| (*k, v.clone())).collect(),
            index: self
                .index
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().map(|r| (r.hdr_num, r.tag_num)).collect()))
                .collect(),
        }
    }
}

pub struct FileBackend {
    pager: Pager,
    store: Mutex<Store>,
    read_only: bool,
}

impl FileBackend {
    pub fn open(root_dir: &Path, file_name: &str, read_only: bool, no_fsync: bool) -> Result<Self> {
        let pager = Pager::new(root_dir.join(file_name), no_fsync);
        let state = pager.load()?;
        Ok(FileBackend {
            pager,
            store: Mutex::new(Store::from_state(state)),
            read_only,
        })
    }
}

impl Backend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_swapped(&self) -> bool {
        false
    }

    fn sync(&self) -> Result<()> {
        let store = self.store.lock();
        self.pager.save(&store.to_state())
    }

    fn verify(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.sync()
    }

    fn cursor_open(&self, write: bool) -> Result<Box<dyn CursorTrait + '_>> {
        if write && self.read_only {
            return Err(PkgDbError::ReadOnly("file backend"));
        }
        Ok(Box::new(FileCursor {
            backend: self,
            write,
            iter_state: None,
            position: None,
        }))
    }
}

enum IterState {
    Primary(Vec<u32>),
    Index(Vec<Vec<u8>>),
}

struct FileCursor<'a> {
    backend: &'a FileBackend,
    write: bool,
    iter_state: Option<IterState>,
    position: Option<u32>,
}

impl<'a> CursorTrait for FileCursor<'a> {
    fn pkg_get(&mut self, hdr_num: u32) -> Result<Option<Vec<u8>>> {
        let store = self.backend.store.lock();
        self.position = Some(hdr_num);
        Ok(store.primary.get(&hdr_num).cloned())
    }

    fn pkg_put(&mut self, hdr_num: u32, blob: &[u8]) -> Result<()> {
        if !self.write {
            return Err(PkgDbError::ReadOnly("file backend cursor opened read-only"));
        }
        let mut store = self.backend.store.lock();
        if hdr_num > store.max_hdr_num {
            store.max_hdr_num = hdr_num;
        }
        store.primary.insert(hdr_num, blob.to_vec());
        self.position = Some(hdr_num);
        Ok(())
    }

    fn pkg_del(&mut self, hdr_num: u32) -> Result<()> {
        if !self.write {
            return Err(PkgDbError::ReadOnly("file backend cursor opened read-only"));
        }
        let mut store = self.backend.store.lock();
        store.primary.remove(&hdr_num);
        Ok(())
    }

    fn pkg_new(&mut self) -> Result<u32> {
        if !self.write {
            return Err(PkgDbError::ReadOnly("file backend cursor opened read-only"));
        }
        let mut store = self.backend.store.lock();
        store.max_hdr_num += 1;
        let hdr_num = store.max_hdr_num;
        self.position = Some(hdr_num);
        Ok(hdr_num)
    }

    fn pkg_key(&self) -> Option<u32> {
        self.position
    }

    fn idx_get(&mut self, key: &[u8], search: SearchType) -> Result<Option<IndexSet>> {
        let store = self.backend.store.lock();
        match search {
            SearchType::Exact => Ok(store.index.get(key).cloned()),
            SearchType::Prefix => {
                let mut combined: Option<IndexSet> = None;
                for (k, v) in store.index.range(key.to_vec()..) {
                    if !k.starts_with(key) {
                        break;
                    }
                    match &mut combined {
                        Some(acc) => acc.append_set(v),
                        None => combined = Some(v.clone()),
                    }
                }
                Ok(combined)
            }
        }
    }

    fn idx_put(&mut self, key: &[u8], set: &IndexSet) -> Result<()> {
        if !self.write {
            return Err(PkgDbError::ReadOnly("file backend cursor opened read-only"));
        }
        let mut store = self.backend.store.lock();
        store.index.insert(key.to_vec(), set.clone());
        Ok(())
    }

    fn idx_del(&mut self, key: &[u8]) -> Result<()> {
        if !self.write {
            return Err(PkgDbError::ReadOnly("file backend cursor opened read-only"));
        }
        let mut store = self.backend.store.lock();
        store.index.remove(key);
        Ok(())
    }

    fn idx_key(&self) -> Option<Vec<u8>> {
        None
    }

    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let store = self.backend.store.lock();
        if self.iter_state.is_none() {
            self.iter_state = Some(IterState::Primary(store.primary.keys().copied().collect()));
        }
        match self.iter_state.as_mut().unwrap() {
            IterState::Primary(keys) => {
                if keys.is_empty() {
                    return Ok(None);
                }
                let k = keys.remove(0);
                let v = store.primary.get(&k).cloned().unwrap_or_default();
                Ok(Some((k.to_ne_bytes().to_vec(), v)))
            }
            IterState::Index(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path(), "store.json", false, true).unwrap();
        let mut cur = backend.cursor_open(true).unwrap();
        let hdr_num = cur.pkg_new().unwrap();
        cur.pkg_put(hdr_num, b"hello").unwrap();
        assert_eq!(cur.pkg_get(hdr_num).unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn sync_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let backend = FileBackend::open(dir.path(), "store.json", false, true).unwrap();
            let mut cur = backend.cursor_open(true).unwrap();
            let hdr_num = cur.pkg_new().unwrap();
            cur.pkg_put(hdr_num, b"persisted").unwrap();
            drop(cur);
            backend.sync().unwrap();
        }
        let backend2 = FileBackend::open(dir.path(), "store.json", true, true).unwrap();
        let mut cur = backend2.cursor_open(false).unwrap();
        assert_eq!(cur.pkg_get(1).unwrap(), Some(b"persisted".to_vec()));
    }

    #[test]
    fn read_only_backend_rejects_writes() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path(), "store.json", true, true).unwrap();
        assert!(backend.cursor_open(true).is_err());
    }
}
