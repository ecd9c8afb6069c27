//! # pkgdepot - Package Database and Transaction Ordering Engine
//!
//! `pkgdepot` is a backend-abstracted package metadata store with the
//! dependency-ordering engine a package manager needs to sequence an
//! install/erase transaction safely.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pkgdepot::{Config, IndexedTag, PkgDb};
//!
//! let db = PkgDb::open("/var/lib/pkgdepot", Config::default(), vec![
//!     IndexedTag { tag: pkgdepot::model::tag::PROVIDENAME, file_name: "Providename".into() },
//!     IndexedTag { tag: pkgdepot::model::tag::REQUIRENAME, file_name: "Requirename".into() },
//! ])?;
//! let headers = db.iter_headers()?;
//! # Ok::<(), pkgdepot::PkgDbError>(())
//! ```
//!
//! ## Architecture
//!
//! - **Backend layer**: a `Backend`/`Cursor` vtable dispatched over a
//!   read-only legacy reader, a modern single-file pager store, or a
//!   no-op dummy, selected by [`backend::select::detect_backend`].
//! - **Facade**: [`PkgDb`] owns the primary store plus lazily opened
//!   secondary indexes, and enforces the tag-ordered write/removal
//!   sequencing that keeps concurrent readers consistent.
//! - **Availability set**: [`AvailSet`] answers "what satisfies this
//!   dependency" against a staged transaction's provides/obsoletes/file
//!   lists.
//! - **Fingerprint cache**: [`FingerprintCache`] resolves `(dirName,
//!   baseName)` pairs that reach the same on-disk file through different
//!   directory spellings.
//! - **Ordering engine**: [`order::order`] sequences a transaction's
//!   elements into an install/erase-safe order, breaking true dependency
//!   cycles via strongly-connected-component collapse instead of failing.

pub mod avail;
pub mod backend;
pub mod config;
pub mod error;
pub mod facade;
pub mod fingerprint;
pub mod header;
pub mod indexset;
pub mod lock;
pub mod logging;
pub mod model;
pub mod order;
pub mod strpool;

pub use crate::avail::AvailSet;
pub use crate::config::{BackendKind, Config};
pub use crate::error::{PkgDbError, Result};
pub use crate::facade::{IndexedTag, PkgDb};
pub use crate::fingerprint::FingerprintCache;
pub use crate::header::{HeaderOps, SimpleHeader};
pub use crate::model::{Ds, SenseFlags, Te, TeType};
pub use crate::order::order;
