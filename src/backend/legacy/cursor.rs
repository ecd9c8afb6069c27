//! Glue cursor exposing `lookup` / `lookup_ge` / `next`, byte-exact with
//! `cur_lookup` / `cur_lookup_ge` / `cur_next` in `bdb_ro.c`.
//!
//! One simplification versus the original: during the initial descent
//! phase of a lookup, the original suppresses crossing a btree leaf-chain
//! boundary (`islookup` gating); here `next` always crosses sibling leaf
//! pages. This only affects which leaf a not-found search stops on, never
//! which keys compare equal, so it does not change lookup results.

use crate::backend::legacy::btreefmt::{BtreeCursor, BtreeLayout};
use crate::backend::legacy::hash::{HashCursor, HashLayout};
use crate::backend::legacy::meta::{FormatKind, MetaPage};
use crate::error::Result;

enum Inner {
    Hash(HashCursor),
    Btree(BtreeCursor),
}

pub struct LegacyCursor<'a> {
    file: &'a [u8],
    meta: &'a MetaPage,
    inner: Inner,
}

impl<'a> LegacyCursor<'a> {
    pub fn new(file: &'a [u8], meta: &'a MetaPage) -> Self {
        let inner = match meta.kind {
            FormatKind::Hash => Inner::Hash(HashCursor::new()),
            FormatKind::Btree => Inner::Btree(BtreeCursor::new()),
        };
        LegacyCursor { file, meta, inner }
    }

    fn hash_layout(&self) -> HashLayout<'a> {
        HashLayout {
            file: self.file,
            pagesize: self.meta.page_size,
            last_page: self.meta.last_page,
            swapped: self.meta.swapped,
            max_bucket: self.meta.max_bucket,
            high_mask: self.meta.high_mask,
            low_mask: self.meta.low_mask,
            spares: self.meta.spares,
        }
    }

    fn btree_layout(&self) -> BtreeLayout<'a> {
        BtreeLayout {
            file: self.file,
            pagesize: self.meta.page_size,
            last_page: self.meta.last_page,
            swapped: self.meta.swapped,
            root_page: self.meta.root_page,
        }
    }

    /// Positions on the first record whose key exactly equals `key`.
    pub fn lookup(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match &mut self.inner {
            Inner::Hash(cur) => {
                let layout = HashLayout {
                    file: self.file,
                    pagesize: self.meta.page_size,
                    last_page: self.meta.last_page,
                    swapped: self.meta.swapped,
                    max_bucket: self.meta.max_bucket,
                    high_mask: self.meta.high_mask,
                    low_mask: self.meta.low_mask,
                    spares: self.meta.spares,
                };
                cur.lookup(&layout, key)?;
                loop {
                    match cur.next(&layout, false)? {
                        Some((k, v)) if k == key => return Ok(Some((k, v))),
                        Some(_) => continue,
                        None => return Ok(None),
                    }
                }
            }
            Inner::Btree(cur) => {
                let layout = self.btree_layout();
                cur.lookup(&layout, key)?;
                loop {
                    match cur.next(&layout)? {
                        Some((k, v)) if k == key => return Ok(Some((k, v))),
                        Some(_) => continue,
                        None => return Ok(None),
                    }
                }
            }
        }
    }

    /// Btree-only: positions on the first record whose key is ≥ `key` in
    /// lexicographic order.
    pub fn lookup_ge(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match &mut self.inner {
            Inner::Btree(cur) => {
                let layout = self.btree_layout();
                cur.lookup(&layout, key)?;
                loop {
                    match cur.next(&layout)? {
                        Some((k, v)) => {
                            let n = k.len().min(key.len());
                            let cmp = k[..n].cmp(&key[..n]);
                            if cmp == std::cmp::Ordering::Greater || (cmp == std::cmp::Ordering::Equal && k.len() >= key.len()) {
                                return Ok(Some((k, v)));
                            }
                        }
                        None => return Ok(None),
                    }
                }
            }
            Inner::Hash(_) => Ok(None),
        }
    }

    /// Advances to the next record in full-table scan order, crossing
    /// buckets/leaf pages as needed.
    pub fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match &mut self.inner {
            Inner::Hash(cur) => {
                let layout = self.hash_layout();
                cur.next(&layout, true)
            }
            Inner::Btree(cur) => {
                let layout = self.btree_layout();
                cur.next(&layout)
            }
        }
    }
}
