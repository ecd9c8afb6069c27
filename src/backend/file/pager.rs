//! On-disk persistence for the modern single-file backend: the whole
//! store state is serialized as one JSON document and rewritten on each
//! sync point. Simple rather than fast — this backend exists to give the
//! facade a writable alternative to the read-only legacy reader, not to
//! compete with a real storage engine.
//!
//! With the `mmap` feature, [`Pager::load`] maps the file instead of
//! copying it into a `Vec` before handing it to `serde_json`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub max_hdr_num: u32,
    pub primary: Vec<(u32, Vec<u8>)>,
    pub index: Vec<(Vec<u8>, Vec<(u32, u32)>)>,
}

pub struct Pager {
    path: PathBuf,
    no_fsync: bool,
}

impl Pager {
    pub fn new(path: impl Into<PathBuf>, no_fsync: bool) -> Self {
        Pager {
            path: path.into(),
            no_fsync,
        }
    }

    #[cfg(not(feature = "mmap"))]
    pub fn load(&self) -> Result<StoreState> {
        if !self.path.exists() {
            return Ok(StoreState::default());
        }
        let bytes = fs::read(&self.path)?;
        if bytes.is_empty() {
            return Ok(StoreState::default());
        }
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[cfg(feature = "mmap")]
    pub fn load(&self) -> Result<StoreState> {
        if !self.path.exists() {
            return Ok(StoreState::default());
        }
        let file = File::open(&self.path)?;
        if file.metadata()?.len() == 0 {
            return Ok(StoreState::default());
        }
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(serde_json::from_slice(&mmap).unwrap_or_default())
    }

    pub fn save(&self, state: &StoreState) -> Result<()> {
        let bytes = serde_json::to_vec(state).expect("StoreState serialization cannot fail");
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut f = File::create(&tmp_path)?;
            f.write_all(&bytes)?;
            if !self.no_fsync {
                f.sync_all()?;
            }
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
