//! Btree-format descent/iteration, byte-exact with `btree_lookup` /
//! `btree_next` / `btree_getkv` in `bdb_ro.c`.

use std::cmp::Ordering;

use crate::backend::legacy::overflow::read_overflow;
use crate::backend::legacy::page::{get_page, page_u16, page_u32, PAGE_TYPE_BTREE_INTERNAL, PAGE_TYPE_BTREE_LEAF};
use crate::error::{PkgDbError, Result};

pub struct BtreeLayout<'a> {
    pub file: &'a [u8],
    pub pagesize: u32,
    pub last_page: u32,
    pub swapped: bool,
    pub root_page: u32,
}

pub struct BtreeCursor {
    page: Vec<u8>,
    idx: i64,
    numidx: i64,
    positioned: bool,
}

impl BtreeCursor {
    pub fn new() -> Self {
        BtreeCursor {
            page: Vec::new(),
            idx: -2,
            numidx: 0,
            positioned: false,
        }
    }

    fn resolve_internal_key(&self, layout: &BtreeLayout, off: usize, ekeylen: usize) -> Result<Vec<u8>> {
        let flag = self.page[off + 2] & 0x7f;
        if flag == 3 {
            if ekeylen != 12 {
                return Err(PkgDbError::FormatCorrupt("oversized internal key has wrong length".into()));
            }
            let ekey_off = off + 12;
            let pageno = page_u32(&self.page, ekey_off + 4);
            let len = page_u32(&self.page, ekey_off + 8);
            read_overflow(layout.file, layout.pagesize, layout.last_page, layout.swapped, pageno, len)
        } else if flag == 1 {
            Ok(self.page[off + 12..off + 12 + ekeylen].to_vec())
        } else {
            Err(PkgDbError::FormatCorrupt("unrecognized internal key type".into()))
        }
    }

    fn resolve_leaf_item(&self, layout: &BtreeLayout, off: usize) -> Result<Vec<u8>> {
        if off & 3 != 0 {
            return Err(PkgDbError::FormatCorrupt("leaf item offset not 4-byte aligned".into()));
        }
        let pagesize = layout.pagesize as usize;
        match self.page[off + 2] {
            1 => {
                let len = page_u16(&self.page, off) as usize;
                if off + 3 + len > pagesize {
                    return Err(PkgDbError::FormatCorrupt("leaf item length overruns page".into()));
                }
                Ok(self.page[off + 3..off + 3 + len].to_vec())
            }
            3 => {
                if off + 12 > pagesize {
                    return Err(PkgDbError::FormatCorrupt("overflow reference overruns page".into()));
                }
                let pageno = page_u32(&self.page, off + 4);
                let len = page_u32(&self.page, off + 8);
                read_overflow(layout.file, layout.pagesize, layout.last_page, layout.swapped, pageno, len)
            }
            _ => Err(PkgDbError::FormatCorrupt("unrecognized leaf item type".into())),
        }
    }

    /// Descends from the root to the leaf that would contain `key`
    /// (empty `key` descends the leftmost path).
    pub fn lookup(&mut self, layout: &BtreeLayout, key: &[u8]) -> Result<()> {
        let mut pg = layout.root_page;
        loop {
            let page = get_page(layout.file, layout.pagesize, layout.last_page, layout.swapped, pg)?;
            if page[25] == PAGE_TYPE_BTREE_LEAF {
                self.numidx = page_u16(&page, 20) as i64;
                self.page = page;
                self.idx = -2;
                self.positioned = true;
                return Ok(());
            }
            if page[25] != PAGE_TYPE_BTREE_INTERNAL {
                return Err(PkgDbError::FormatCorrupt(format!(
                    "expected btree internal/leaf page, found type {}",
                    page[25]
                )));
            }
            let numidx = page_u16(&page, 20) as usize;
            if numidx == 0 {
                return Err(PkgDbError::FormatCorrupt("empty internal page".into()));
            }
            let pagesize = layout.pagesize as usize;
            let mut lastoff = 0usize;
            let mut chosen = None;
            for idx in 0..numidx {
                let off = page_u16(&page, 26 + 2 * idx) as usize;
                if off & 3 != 0 || off + 3 > pagesize {
                    return Err(PkgDbError::FormatCorrupt("internal item offset misaligned".into()));
                }
                let ekeylen = page_u16(&page, off) as usize;
                if off + 12 + ekeylen > pagesize {
                    return Err(PkgDbError::FormatCorrupt("internal key overruns page".into()));
                }
                if key.is_empty() {
                    lastoff = off;
                    chosen = Some(lastoff);
                    break;
                }
                if idx == 0 {
                    lastoff = off;
                    continue;
                }
                self.page = page.clone();
                let ekey = self.resolve_internal_key(layout, off, ekeylen)?;
                let n = key.len().min(ekey.len());
                let cmp = ekey[..n].cmp(&key[..n]);
                if cmp == Ordering::Greater || (cmp == Ordering::Equal && ekey.len() > key.len()) {
                    chosen = Some(lastoff);
                    break;
                }
                lastoff = off;
            }
            let lastoff = chosen.unwrap_or(lastoff);
            pg = page_u32(&page, lastoff + 4);
        }
    }

    /// Advances to the next non-deleted `(key, value)` pair, crossing
    /// leaf-chain pages. Returns `Ok(None)` at the end of the chain.
    pub fn next(&mut self, layout: &BtreeLayout) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        if !self.positioned {
            self.lookup(layout, &[])?;
        }
        self.idx += 2;
        loop {
            if self.idx + 1 >= self.numidx {
                let next_page = page_u32(&self.page, 16);
                self.idx = 0;
                self.numidx = 0;
                if next_page == 0 {
                    return Ok(None);
                }
                let page = get_page(layout.file, layout.pagesize, layout.last_page, layout.swapped, next_page)?;
                if page[25] != PAGE_TYPE_BTREE_LEAF {
                    return Err(PkgDbError::FormatCorrupt("expected btree leaf page".into()));
                }
                self.numidx = page_u16(&page, 20) as i64;
                self.page = page;
                continue;
            }

            let pagesize = layout.pagesize as usize;
            let idx = self.idx as usize;
            let koff = page_u16(&self.page, 26 + 2 * idx) as usize;
            let voff = page_u16(&self.page, 28 + 2 * idx) as usize;
            if koff + 3 > pagesize || voff + 3 > pagesize {
                return Err(PkgDbError::FormatCorrupt("leaf item offset out of page".into()));
            }
            if self.page[koff + 2] & 0x80 != 0 || self.page[voff + 2] & 0x80 != 0 {
                self.idx += 2;
                continue;
            }
            let key = self.resolve_leaf_item(layout, koff)?;
            let val = self.resolve_leaf_item(layout, voff)?;
            return Ok(Some((key, val)));
        }
    }
}

impl Default for BtreeCursor {
    fn default() -> Self {
        Self::new()
    }
}
