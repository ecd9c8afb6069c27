//! Dependency-availability index (§4.E "AvailSet"), grounded on
//! `examples/original_source/lib/rpmal.c`. Holds the set of transaction
//! members staged for install and answers "what satisfies this
//! dependency" queries against their provides/obsoletes/file lists.
//!
//! Indexes are built lazily on first query, matching the original's
//! "try to be lazy as delayed hash creation is cheaper" comment, and a
//! removed member is never actually erased from `list` — it is
//! tombstoned in place so existing index entries stay valid.

use rustc_hash::FxHashMap;

use crate::header::HeaderOps;
use crate::model::{Ds, Te};
use crate::strpool::{StrId, StrPool};

/// Resolves whether two `(dirName, baseName)` pairs name the same
/// on-disk file, bridging to the fingerprint cache. Kept as a trait so
/// `avail` does not need to depend on the concrete cache type.
pub trait FileIdentity {
    fn same_file(&self, dir_a: StrId, dir_b: StrId, base: StrId) -> bool;
}

struct FileEntry {
    dir_name: StrId,
    pkg_num: usize,
    entry_ix: usize,
}

struct DepEntry {
    pkg_num: usize,
    entry_ix: usize,
}

struct AvailPackage {
    te: Option<Te>,
}

/// Set of available packages, items, and directories, indexed for
/// dependency resolution.
pub struct AvailSet {
    pool: StrPool,
    list: Vec<AvailPackage>,
    provides_hash: Option<FxHashMap<StrId, Vec<DepEntry>>>,
    obsoletes_hash: Option<FxHashMap<StrId, Vec<DepEntry>>>,
    file_hash: Option<FxHashMap<StrId, Vec<FileEntry>>>,
    ts_color: u32,
    pref_color: u32,
}

/// Symmetric "do these two dependency ranges overlap" test, used in
/// place of the original's full `rpmdsCompareIndex` range-intersection
/// logic. Delegates actual version comparison to [`HeaderOps`].
fn ds_overlap(header: &dyn HeaderOps, a: &Ds, b: &Ds) -> bool {
    a.satisfied_by_evr(header, &b.evr) || b.satisfied_by_evr(header, &a.evr)
}

impl AvailSet {
    pub fn new(ts_color: u32, pref_color: u32) -> Self {
        AvailSet {
            pool: StrPool::new(),
            list: Vec::new(),
            provides_hash: None,
            obsoletes_hash: None,
            file_hash: None,
            ts_color,
            pref_color,
        }
    }

    /// Registers `te`, returning the package number used to reference it
    /// from index entries. If the provides/obsoletes/file indexes are
    /// already built, the new member is folded into them immediately;
    /// otherwise it waits for the first lazy build.
    pub fn add(&mut self, te: Te) -> usize {
        let pkg_num = self.list.len();

        if self.provides_hash.is_some() {
            let names: Vec<_> = te.provides.iter().map(|p| self.pool.intern(&p.name)).collect();
            let hash = self.provides_hash.as_mut().unwrap();
            index_entries(hash, pkg_num, &te.provides, &names, self.ts_color);
        }
        if self.obsoletes_hash.is_some() {
            let names: Vec<_> = te.obsoletes.iter().map(|o| self.pool.intern(&o.name)).collect();
            let hash = self.obsoletes_hash.as_mut().unwrap();
            index_entries(hash, pkg_num, &te.obsoletes, &names, self.ts_color);
        }
        if self.file_hash.is_some() {
            let ids: Vec<_> = te.files.iter().map(|f| (self.pool.intern(&f.dir), self.pool.intern(&f.base))).collect();
            let hash = self.file_hash.as_mut().unwrap();
            for (ix, (dir_id, base_id)) in ids.into_iter().enumerate() {
                hash.entry(base_id).or_default().push(FileEntry {
                    dir_name: dir_id,
                    pkg_num,
                    entry_ix: ix,
                });
            }
        }

        self.list.push(AvailPackage { te: Some(te) });
        pkg_num
    }

    /// Tombstones the member at `pkg_num`; it is skipped by subsequent
    /// queries but its index entries are left in place.
    pub fn del(&mut self, pkg_num: usize) {
        if let Some(slot) = self.list.get_mut(pkg_num) {
            slot.te = None;
        }
    }

    pub fn get(&self, pkg_num: usize) -> Option<&Te> {
        self.list.get(pkg_num).and_then(|p| p.te.as_ref())
    }

    pub fn lookup_te_by_name(&self, name: &str) -> Option<usize> {
        self.list
            .iter()
            .position(|p| p.te.as_ref().map(|t| t.name.as_str()) == Some(name))
    }

    fn ensure_provides_index(&mut self) {
        if self.provides_hash.is_some() {
            return;
        }
        let mut hash: FxHashMap<StrId, Vec<DepEntry>> = FxHashMap::default();
        for pkg_num in 0..self.list.len() {
            let Some(te) = self.list[pkg_num].te.clone() else { continue };
            let names: Vec<_> = te.provides.iter().map(|p| self.pool.intern(&p.name)).collect();
            index_entries(&mut hash, pkg_num, &te.provides, &names, self.ts_color);
        }
        self.provides_hash = Some(hash);
    }

    fn ensure_obsoletes_index(&mut self) {
        if self.obsoletes_hash.is_some() {
            return;
        }
        let mut hash: FxHashMap<StrId, Vec<DepEntry>> = FxHashMap::default();
        for pkg_num in 0..self.list.len() {
            let Some(te) = self.list[pkg_num].te.clone() else { continue };
            let names: Vec<_> = te.obsoletes.iter().map(|o| self.pool.intern(&o.name)).collect();
            index_entries(&mut hash, pkg_num, &te.obsoletes, &names, self.ts_color);
        }
        self.obsoletes_hash = Some(hash);
    }

    fn ensure_file_index(&mut self) {
        if self.file_hash.is_some() {
            return;
        }
        let mut hash: FxHashMap<StrId, Vec<FileEntry>> = FxHashMap::default();
        for pkg_num in 0..self.list.len() {
            let Some(te) = self.list[pkg_num].te.clone() else { continue };
            for (ix, f) in te.files.iter().enumerate() {
                let dir_id = self.pool.intern(&f.dir);
                let base_id = self.pool.intern(&f.base);
                hash.entry(base_id).or_default().push(FileEntry {
                    dir_name: dir_id,
                    pkg_num,
                    entry_ix: ix,
                });
            }
        }
        self.file_hash = Some(hash);
    }

    /// All non-tombstoned members whose Obsoletes: list overlaps `ds`.
    pub fn all_obsoletes(&mut self, ds: &Ds, header: &dyn HeaderOps) -> Vec<usize> {
        if ds.name.is_empty() {
            return Vec::new();
        }
        self.ensure_obsoletes_index();
        let Some(name_id) = self.pool.id_of(&ds.name) else {
            return Vec::new();
        };
        let mut ret = Vec::new();
        if let Some(entries) = self.obsoletes_hash.as_ref().unwrap().get(&name_id) {
            for e in entries {
                let Some(te) = self.list[e.pkg_num].te.as_ref() else { continue };
                let Some(obs) = te.obsoletes.get(e.entry_ix) else { continue };
                if ds_overlap(header, obs, ds) {
                    ret.push(e.pkg_num);
                }
            }
        }
        ret
    }

    /// Members whose basename/dirname-indexed file list contains the
    /// absolute path `file_name`. `identity` resolves cross-directory
    /// matches via fingerprints when the indexed dirName differs from
    /// the query's.
    fn all_file_satisfies(&mut self, file_name: &str, identity: Option<&dyn FileIdentity>) -> Vec<usize> {
        let mut ret = Vec::new();
        let Some(slash) = file_name.rfind('/') else {
            return ret;
        };
        let base = &file_name[slash + 1..];
        let dir = &file_name[..=slash];

        self.ensure_file_index();
        let Some(base_id) = self.pool.id_of(base) else {
            return ret;
        };
        let dir_id = self.pool.id_of(dir);
        let entries = match self.file_hash.as_ref().unwrap().get(&base_id) {
            Some(e) => e,
            None => return ret,
        };

        for e in entries {
            if self.list[e.pkg_num].te.is_none() {
                continue;
            }
            let same_dir = dir_id == Some(e.dir_name);
            let matches = if same_dir {
                true
            } else if let Some(identity) = identity {
                dir_id.map(|d| identity.same_file(d, e.dir_name, base_id)).unwrap_or(false)
            } else {
                false
            };
            if matches {
                ret.push(e.pkg_num);
            }
        }
        ret
    }

    /// All non-tombstoned members that satisfy `ds`: files first (if the
    /// dependency names an absolute path), then provides.
    pub fn all_satisfies_depend(&mut self, ds: &Ds, header: &dyn HeaderOps, identity: Option<&dyn FileIdentity>) -> Vec<usize> {
        if ds.name.is_empty() {
            return Vec::new();
        }
        let obsolete = ds.tag == crate::model::tag::OBSOLETENAME;
        let is_filename = !obsolete && ds.name.starts_with('/');

        if is_filename {
            let file_hits = self.all_file_satisfies(&ds.name, identity);
            if !file_hits.is_empty() {
                return file_hits;
            }
        }

        self.ensure_provides_index();
        let Some(name_id) = self.pool.id_of(&ds.name) else {
            return Vec::new();
        };
        let mut ret = Vec::new();
        if let Some(entries) = self.provides_hash.as_ref().unwrap().get(&name_id) {
            for e in entries {
                let Some(te) = self.list[e.pkg_num].te.as_ref() else { continue };
                let Some(provide) = te.provides.get(e.entry_ix) else { continue };

                let matches = if obsolete {
                    // Obsoletes only resolve against a package's own NEVR.
                    provide.name == te.name && ds.satisfied_by_evr(header, &te.evr)
                } else {
                    ds_overlap(header, provide, ds)
                };
                if matches {
                    ret.push(e.pkg_num);
                }
            }
        }
        ret
    }

    /// Picks the best of `all_satisfies_depend`'s results for `te_idx`
    /// requiring `ds`: colour-matched providers score above
    /// mismatched ones, and a self-provide is a tie-breaking bonus.
    pub fn satisfies(&mut self, te_idx: usize, ds: &Ds, header: &dyn HeaderOps, identity: Option<&dyn FileIdentity>) -> Option<usize> {
        let providers = self.all_satisfies_depend(ds, header, identity);
        if providers.is_empty() {
            return None;
        }
        let ds_color = ds.colour;
        let mut best = None;
        let mut best_score = 0i32;
        for &p in &providers {
            let mut score = 0;
            if self.ts_color != 0 {
                let te_color = self.list[p].te.as_ref().map(|t| t.colour).unwrap_or(0);
                if ds_color != 0 {
                    if ds_color == te_color {
                        score += 2;
                    }
                } else if self.pref_color != 0 && self.pref_color == te_color {
                    score += 2;
                }
            }
            if p == te_idx {
                score += 1;
            }
            if score > best_score {
                best_score = score;
                best = Some(p);
            }
        }
        best.or(Some(providers[0]))
    }
}

fn index_entries(hash: &mut FxHashMap<StrId, Vec<DepEntry>>, pkg_num: usize, ds_list: &[Ds], ids: &[StrId], ts_color: u32) {
    for (ix, ds) in ds_list.iter().enumerate() {
        if ts_color != 0 && ds.colour != 0 && (ts_color & ds.colour) == 0 {
            continue;
        }
        hash.entry(ids[ix]).or_default().push(DepEntry { pkg_num, entry_ix: ix });
    }
}
