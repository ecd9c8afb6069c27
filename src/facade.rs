//! Package DB facade (§4.C): owns the open primary + secondary-index
//! backends, assigns header instance numbers, and translates between
//! header blobs and index-set records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backend::{detect_backend, Backend, DummyBackend, FileBackend, LegacyBackend, SearchType};
use crate::config::{BackendKind, Config};
use crate::error::{PkgDbError, Result};
use crate::header::HeaderOps;
use crate::indexset::{IndexRecord, IndexSet};
use crate::lock::EnvLock;

/// One secondary index: a tag number paired with the file name its
/// backend is opened against.
#[derive(Debug, Clone)]
pub struct IndexedTag {
    pub tag: u32,
    pub file_name: String,
}

/// Owns the open backend handle tuple `(primary, indexes)` for one
/// database root.
pub struct PkgDb {
    root_dir: PathBuf,
    config: Config,
    primary: Box<dyn Backend>,
    indexes: BTreeMap<u32, Box<dyn Backend>>,
    _env_lock: EnvLock,
}

fn open_backend(root_dir: &Path, file_name: &str, kind: BackendKind, read_only: bool, no_fsync: bool) -> Result<Box<dyn Backend>> {
    match kind {
        BackendKind::LegacyRo => Ok(Box::new(LegacyBackend::open(root_dir, file_name)?)),
        BackendKind::File => Ok(Box::new(FileBackend::open(root_dir, file_name, read_only, no_fsync)?)),
        BackendKind::Dummy => Ok(Box::new(DummyBackend::new())),
    }
}

impl PkgDb {
    /// Opens (or creates) the database at `root_dir`. `indexed_tags`
    /// declares which header tags are secondary-indexed and which file
    /// backs each index; they are opened lazily on first use.
    pub fn open(root_dir: impl Into<PathBuf>, config: Config, indexed_tags: Vec<IndexedTag>) -> Result<Self> {
        let root_dir = root_dir.into();
        std::fs::create_dir_all(&root_dir)?;
        let env_lock = EnvLock::acquire(&root_dir, config.lock_retry_ms)?;

        let kind = detect_backend(&root_dir, config.backend);
        let primary_file = match kind {
            BackendKind::LegacyRo => crate::backend::legacy::MARKER_FILE,
            BackendKind::File => "pkgdepot.json",
            BackendKind::Dummy => "",
        };
        let read_only = kind == BackendKind::LegacyRo;
        let primary = open_backend(&root_dir, primary_file, kind, read_only, config.no_fsync)?;

        let mut indexes = BTreeMap::new();
        for it in indexed_tags {
            let idx = open_backend(&root_dir, &it.file_name, kind, read_only, config.no_fsync)?;
            indexes.insert(it.tag, idx);
        }

        Ok(PkgDb {
            root_dir,
            config,
            primary,
            indexes,
            _env_lock: env_lock,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn index_for(&self, tag: u32) -> Result<&dyn Backend> {
        self.indexes
            .get(&tag)
            .map(|b| b.as_ref())
            .ok_or(PkgDbError::NotFound("index for tag"))
    }

    /// Stores `header`, assigning and returning its `hdrNum`. Writes the
    /// primary record first, then each indexed tag's occurrences in
    /// tag-ascending order (§5 ordering guarantee).
    pub fn put_header(&self, header: &dyn HeaderOps) -> Result<u32> {
        let mut primary_cur = self.primary.cursor_open(true)?;
        let hdr_num = primary_cur.pkg_new()?;
        primary_cur.pkg_put(hdr_num, header.blob())?;
        drop(primary_cur);

        if self.config.min_writes {
            return Ok(hdr_num);
        }

        for (&tag, backend) in self.indexes.iter() {
            let occurrences = header.tag_occurrences(tag);
            if occurrences.is_empty() {
                continue;
            }
            let mut cur = backend.cursor_open(true)?;
            for occ in occurrences {
                let mut set = cur.idx_get(&occ.key, SearchType::Exact)?.unwrap_or_else(|| IndexSet::new(1));
                set.append(IndexRecord::new(hdr_num, occ.tag_num), false);
                cur.idx_put(&occ.key, &set)?;
            }
        }
        debug!(hdr_num, "put_header committed");
        Ok(hdr_num)
    }

    /// Removes the header stored at `hdr_num`. `header` must be the
    /// already-imported form of that same header (the facade does not
    /// parse header bytes itself); its indexed occurrences are pruned
    /// index-first, then the primary record is deleted.
    pub fn remove(&self, hdr_num: u32, header: &dyn HeaderOps) -> Result<()> {
        for (&tag, backend) in self.indexes.iter().rev() {
            let occurrences = header.tag_occurrences(tag);
            if occurrences.is_empty() {
                continue;
            }
            let mut cur = backend.cursor_open(true)?;
            for occ in occurrences {
                if let Some(mut set) = cur.idx_get(&occ.key, SearchType::Exact)? {
                    set.prune(IndexRecord::new(hdr_num, occ.tag_num), true);
                    if set.is_empty() {
                        cur.idx_del(&occ.key)?;
                    } else {
                        cur.idx_put(&occ.key, &set)?;
                    }
                }
            }
        }
        let mut primary_cur = self.primary.cursor_open(true)?;
        primary_cur.pkg_del(hdr_num)?;
        debug!(hdr_num, "remove committed");
        Ok(())
    }

    /// Reads the raw header blob for `hdr_num`.
    pub fn get_header(&self, hdr_num: u32) -> Result<Option<Vec<u8>>> {
        let mut cur = self.primary.cursor_open(false)?;
        cur.pkg_get(hdr_num)
    }

    /// Iterates every primary record as `(hdrNum, blob)`.
    pub fn iter_headers(&self) -> Result<Vec<(u32, Vec<u8>)>> {
        let swapped = self.primary.is_swapped();
        let mut cur = self.primary.cursor_open(false)?;
        let mut out = Vec::new();
        while let Some((key, val)) = cur.next()? {
            if key.len() == 4 {
                let mut b = [0u8; 4];
                b.copy_from_slice(&key);
                let hdr_num = if swapped {
                    u32::from_ne_bytes(b).swap_bytes()
                } else {
                    u32::from_ne_bytes(b)
                };
                out.push((hdr_num, val));
            }
        }
        Ok(out)
    }

    /// Exact secondary-index lookup.
    pub fn iter_by_key(&self, tag: u32, key: &[u8]) -> Result<Option<IndexSet>> {
        let backend = self.index_for(tag)?;
        let mut cur = backend.cursor_open(false)?;
        cur.idx_get(key, SearchType::Exact)
    }

    /// Prefix secondary-index lookup.
    pub fn prefix_search(&self, tag: u32, key: &[u8]) -> Result<Option<IndexSet>> {
        let backend = self.index_for(tag)?;
        let mut cur = backend.cursor_open(false)?;
        cur.idx_get(key, SearchType::Prefix)
    }

    /// Allocates the next `hdrNum` without writing a header, for callers
    /// that need to reserve an id ahead of time.
    pub fn allocate_next_hdrnum(&self) -> Result<u32> {
        let mut cur = self.primary.cursor_open(true)?;
        cur.pkg_new()
    }

    pub fn sync(&self) -> Result<()> {
        self.primary.sync()?;
        for backend in self.indexes.values() {
            backend.sync()?;
        }
        Ok(())
    }
}
