//! Backend abstraction (§4.B): a capability set dispatched over concrete
//! storage engines, mirroring the `rpmdbOps_s` vtable this spec is
//! grounded on (`examples/original_source/lib/backend/dbi.h`,
//! `dbi.c`).

pub mod dummy;
pub mod file;
pub mod legacy;
pub mod select;

use crate::config::BackendKind;
use crate::error::Result;
use crate::indexset::IndexSet;

pub use dummy::DummyBackend;
pub use file::FileBackend;
pub use legacy::LegacyBackend;
pub use select::detect_backend;

/// Exact vs prefix key lookup on a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Exact,
    Prefix,
}

/// A cursor open against one of a backend's stores. Cursors borrow from
/// the backend and must not outlive it.
pub trait Cursor {
    fn pkg_get(&mut self, hdr_num: u32) -> Result<Option<Vec<u8>>>;
    fn pkg_put(&mut self, hdr_num: u32, blob: &[u8]) -> Result<()>;
    fn pkg_del(&mut self, hdr_num: u32) -> Result<()>;
    fn pkg_new(&mut self) -> Result<u32>;
    fn pkg_key(&self) -> Option<u32>;

    fn idx_get(&mut self, key: &[u8], search: SearchType) -> Result<Option<IndexSet>>;
    fn idx_put(&mut self, key: &[u8], set: &IndexSet) -> Result<()>;
    fn idx_del(&mut self, key: &[u8]) -> Result<()>;
    fn idx_key(&self) -> Option<Vec<u8>>;

    /// Iterates every record in the store the cursor was opened against.
    /// Used by `PkgDb::iter_headers` / `iter_by_key`.
    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
}

/// Concrete storage engine bound to a database root for the lifetime of
/// the open handle.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;
    fn is_read_only(&self) -> bool;
    fn is_swapped(&self) -> bool;

    fn sync(&self) -> Result<()>;
    fn verify(&self) -> Result<()>;
    fn close(&self) -> Result<()>;

    fn cursor_open(&self, write: bool) -> Result<Box<dyn Cursor + '_>>;
}
