//! Accepts no operations; every write fails, every read misses. Grounded
//! on `examples/original_source/lib/backend/dummydb.c`, whose `dbops`
//! vtable returns `RPMRC_FAIL` for every data operation and is a no-op
//! for lifecycle calls. Used to make error paths (`ReadOnly`, backend
//! fallback) cheap to exercise in tests.

use crate::backend::{Backend, Cursor, SearchType};
use crate::config::BackendKind;
use crate::error::{PkgDbError, Result};
use crate::indexset::IndexSet;

#[derive(Debug, Default)]
pub struct DummyBackend;

impl DummyBackend {
    pub fn new() -> Self {
        DummyBackend
    }
}

impl Backend for DummyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Dummy
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn is_swapped(&self) -> bool {
        false
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

    fn cursor_open(&self, _write: bool) -> Result<Box<dyn Cursor + '_>> {
        Ok(Box::new(DummyCursor))
    }
}

struct DummyCursor;

impl Cursor for DummyCursor {
    fn pkg_get(&mut self, _hdr_num: u32) -> Result<Option<Vec<u8>>> {
        Err(PkgDbError::ReadOnly("dummy backend"))
    }

    fn pkg_put(&mut self, _hdr_num: u32, _blob: &[u8]) -> Result<()> {
        Err(PkgDbError::ReadOnly("dummy backend"))
    }

    fn pkg_del(&mut self, _hdr_num: u32) -> Result<()> {
        Err(PkgDbError::ReadOnly("dummy backend"))
    }

    fn pkg_new(&mut self) -> Result<u32> {
        Err(PkgDbError::ReadOnly("dummy backend"))
    }

    fn pkg_key(&self) -> Option<u32> {
        None
    }

    fn idx_get(&mut self, _key: &[u8], _search: SearchType) -> Result<Option<IndexSet>> {
        Err(PkgDbError::ReadOnly("dummy backend"))
    }

    fn idx_put(&mut self, _key: &[u8], _set: &IndexSet) -> Result<()> {
        Err(PkgDbError::ReadOnly("dummy backend"))
    }

    fn idx_del(&mut self, _key: &[u8]) -> Result<()> {
        Err(PkgDbError::ReadOnly("dummy backend"))
    }

    fn idx_key(&self) -> Option<Vec<u8>> {
        None
    }

    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_fail_reads_miss() {
        let backend = DummyBackend::new();
        let mut cur = backend.cursor_open(true).unwrap();
        assert!(cur.pkg_put(1, b"x").is_err());
        assert!(cur.pkg_new().is_err());
        assert!(cur.next().unwrap().is_none());
    }
}
