//! Fingerprint cache (§4.F), grounded on
//! `examples/original_source/lib/fprint.c`: canonicalizes `(dirName,
//! baseName)` pairs to `(dev, ino, subDir, baseName)` so two paths that
//! reach the same on-disk file through different directory spellings
//! (bind mounts, symlinked directories) compare equal.
//!
//! This is "really a directory and symlink cache" per the original's own
//! comment — it never differentiates a directory from a symlink that
//! resolves to one, which is what lets a fake/offline install still
//! detect colliding files.

use rustc_hash::FxHashMap;

use crate::model::{Te, TeType};
use crate::strpool::{StrId, StrPool};

const MAX_SYMLINK_HOPS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DirIdentity {
    dev: u64,
    ino: u64,
}

/// A canonicalized file identity: the stat-able directory it bottoms
/// out at, any unresolved trailing subdirectory, and the final base
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FingerPrint {
    dir: DirIdentity,
    sub_dir: StrId,
    base_name: StrId,
}

struct SymlinkEntry {
    fp: FingerPrint,
    link_target: String,
}

/// Directory/symlink fingerprint cache. Holds its own string pool so
/// `FingerPrint`s stay valid independent of callers' pools.
pub struct FingerprintCache {
    pool: StrPool,
    dir_table: FxHashMap<StrId, DirIdentity>,
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintCache {
    pub fn new() -> Self {
        FingerprintCache {
            pool: StrPool::new(),
            dir_table: FxHashMap::default(),
        }
    }

    /// Looks up `(dirName, baseName)`, walking up parent directories
    /// until one resolves via `stat`, caching every directory identity
    /// it discovers along the way.
    pub fn lookup(&mut self, dir_name: &str, base_name: &str) -> FingerPrint {
        let dir_id = self.pool.intern(&canon_dir(dir_name));
        let base_id = self.pool.intern(base_name);
        self.lookup_id(dir_id, base_id)
    }

    fn lookup_id(&mut self, dir_id: StrId, base_id: StrId) -> FingerPrint {
        let full = self.pool.get(dir_id).to_string();
        let mut cur_len = full.len();
        let mut cur_id = dir_id;

        loop {
            if let Some(&identity) = self.dir_table.get(&cur_id) {
                let sub = sub_dir_id(&mut self.pool, &full, cur_len);
                return FingerPrint {
                    dir: identity,
                    sub_dir: sub,
                    base_name: base_id,
                };
            }
            let candidate = self.pool.get(cur_id).to_string();
            if let Ok(meta) = std::fs::metadata(&candidate) {
                use std::os::unix::fs::MetadataExt;
                let identity = DirIdentity {
                    dev: meta.dev(),
                    ino: meta.ino(),
                };
                self.dir_table.insert(cur_id, identity);
                let sub = sub_dir_id(&mut self.pool, &full, cur_len);
                return FingerPrint {
                    dir: identity,
                    sub_dir: sub,
                    base_name: base_id,
                };
            }

            if cur_len <= 1 {
                // stat("/") failed; treat as an always-distinct identity
                // rather than aborting the process.
                let identity = DirIdentity { dev: 0, ino: 0 };
                return FingerPrint {
                    dir: identity,
                    sub_dir: StrId::NONE,
                    base_name: base_id,
                };
            }
            cur_len -= 1;
            while cur_len > 1 && full.as_bytes()[cur_len - 1] != b'/' {
                cur_len -= 1;
            }
            cur_id = self.pool.intern(&full[..cur_len]);
        }
    }

    /// Whether `fp` and the fingerprint of `(dir_name, base_name)`
    /// identify the same file.
    pub fn equals(&mut self, fp: &FingerPrint, dir_name: &str, base_name: &str) -> bool {
        let other = self.lookup(dir_name, base_name);
        *fp == other
    }

    pub fn equals_id(&mut self, fp: &FingerPrint, dir_id: StrId, base_id: StrId) -> bool {
        let other = self.lookup_id(dir_id, base_id);
        *fp == other
    }

    /// Computes fingerprints for every file of every `Added` element in
    /// `tes`, resolving trailing symlinked subdirectories against the
    /// transaction's own to-be-installed symlinks (capped at
    /// [`MAX_SYMLINK_HOPS`] to break cycles). Returns one `FingerPrint`
    /// per `(te_index, file_index)`.
    pub fn populate(&mut self, tes: &[Te]) -> FxHashMap<(usize, usize), FingerPrint> {
        let mut symlinks: Vec<SymlinkEntry> = Vec::new();
        let mut out = FxHashMap::default();

        for (te_idx, te) in tes.iter().enumerate() {
            if te.ty != TeType::Added {
                continue;
            }
            for (file_idx, f) in te.files.iter().enumerate() {
                let fp = self.lookup(&f.dir, &f.base);
                out.insert((te_idx, file_idx), fp);
                if f.is_symlink {
                    if let Some(target) = &f.link_target {
                        if !target.is_empty() {
                            symlinks.push(SymlinkEntry {
                                fp,
                                link_target: target.clone(),
                            });
                        }
                    }
                }
            }
        }

        if symlinks.is_empty() {
            return out;
        }

        for (te_idx, te) in tes.iter().enumerate() {
            if te.ty != TeType::Added {
                continue;
            }
            for (file_idx, _) in te.files.iter().enumerate() {
                let key = (te_idx, file_idx);
                let mut hops = 0;
                loop {
                    let fp = *out.get(&key).unwrap();
                    if fp.sub_dir.is_none() {
                        break;
                    }
                    let sub_dir = self.pool.get(fp.sub_dir).to_string();
                    let Some(hit) = symlinks.iter().find(|s| s.fp.dir == fp.dir && s.fp.sub_dir == StrId::NONE) else {
                        break;
                    };
                    let resolved_dir = format!("{}/{}", hit.link_target.trim_end_matches('/'), sub_dir);
                    let base_name = self.pool.get(fp.base_name).to_string();
                    let new_fp = self.lookup(&resolved_dir, &base_name);
                    out.insert(key, new_fp);

                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        break;
                    }
                }
            }
        }

        out
    }
}

/// Interns the trailing sub-directory left over after `stat_len` bytes
/// of `full` resolved to a real directory; `StrId::NONE` when nothing
/// is left (the directory itself was stat-able).
fn sub_dir_id(pool: &mut StrPool, full: &str, stat_len: usize) -> StrId {
    let rest = &full[stat_len.min(full.len())..];
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        StrId::NONE
    } else {
        pool.intern(rest)
    }
}

/// Lightweight canonicalization: collapses repeated slashes and `.`
/// segments and ensures a trailing slash, without resolving symlinks
/// (that is precisely what the stat-walk in [`FingerprintCache::lookup_id`]
/// does instead).
fn canon_dir(dir_name: &str) -> String {
    let mut segments = Vec::new();
    for seg in dir_name.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut out = String::from("/");
    out.push_str(&segments.join("/"));
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TeFile;

    #[test]
    fn canon_dir_collapses_dot_segments() {
        assert_eq!(canon_dir("/usr//./bin"), "/usr/bin/");
        assert_eq!(canon_dir("/usr/bin/../lib"), "/usr/lib/");
    }

    #[test]
    fn same_directory_two_ways_produces_equal_fingerprint() {
        let mut cache = FingerprintCache::new();
        let a = cache.lookup("/tmp", "file.txt");
        let b = cache.lookup("/tmp/", "file.txt");
        assert_eq!(a, b);
    }

    #[test]
    fn different_basenames_differ() {
        let mut cache = FingerprintCache::new();
        let a = cache.lookup("/tmp", "a");
        let b = cache.lookup("/tmp", "b");
        assert_ne!(a, b);
    }

    #[test]
    fn populate_skips_removed_elements() {
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
}
