//! Page-0 metadata parsing (§4.A "File format contract"), byte-exact with
//! `examples/original_source/lib/backend/bdb_ro.c`'s `bdb_open` /
//! `bdb_swapmetapage`.

use crate::error::{PkgDbError, Result};

pub const META_HASH_MAGIC_NATIVE: u32 = 0x00061561;
pub const META_HASH_MAGIC_SWAPPED: u32 = 0x61150600;
pub const META_BTREE_MAGIC_NATIVE: u32 = 0x00053162;
pub const META_BTREE_MAGIC_SWAPPED: u32 = 0x62310500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Hash,
    Btree,
}

#[derive(Debug, Clone)]
pub struct MetaPage {
    pub kind: FormatKind,
    pub swapped: bool,
    pub version: u32,
    pub page_size: u32,
    pub last_page: u32,
    // hash-only
    pub max_bucket: u32,
    pub high_mask: u32,
    pub low_mask: u32,
    pub spares: [u32; 32],
    // btree-only
    pub root_page: u32,
}

fn read_u32_at(buf: &[u8], offset: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_ne_bytes(b)
}

fn write_u32_at(buf: &mut [u8], offset: usize, v: u32) {
    buf[offset..offset + 4].copy_from_slice(&v.to_ne_bytes());
}

/// Byte-swaps every DWORD from offset 8 to `maxi` (exclusive), then
/// re-swaps offset 24 a second time — the on-disk "unique id" field at
/// that offset is opaque and must NOT end up byte-reversed, so the extra
/// swap cancels the one the loop already applied. Preserved verbatim from
/// `bdb_swapmetapage`; do not "simplify" away the apparent double-swap.
fn swap_meta_page(buf: &mut [u8], kind: FormatKind) {
    let maxi = if kind == FormatKind::Hash { 224 } else { 92 };
    let mut i = 8;
    while i < maxi {
        let v = read_u32_at(buf, i);
        write_u32_at(buf, i, v.swap_bytes());
        i += 4;
    }
    let v = read_u32_at(buf, 24);
    write_u32_at(buf, 24, v.swap_bytes());
}

/// Parses the 512-byte metadata page at the start of a legacy database
/// file.
pub fn parse_meta(raw: &[u8]) -> Result<MetaPage> {
    if raw.len() < 512 {
        return Err(PkgDbError::FormatCorrupt(format!(
            "metadata page too short: {} bytes",
            raw.len()
        )));
    }
    let mut page = raw[..512].to_vec();

    let magic = read_u32_at(&page, 12);
    let (kind, swapped) = if magic == META_HASH_MAGIC_NATIVE {
        (FormatKind::Hash, false)
    } else if magic == META_HASH_MAGIC_SWAPPED {
        (FormatKind::Hash, true)
    } else if magic == META_BTREE_MAGIC_NATIVE {
        (FormatKind::Btree, false)
    } else if magic == META_BTREE_MAGIC_SWAPPED {
        (FormatKind::Btree, true)
    } else {
        return Err(PkgDbError::FormatCorrupt(
            "not a legacy hash/btree database".into(),
        ));
    };

    if swapped {
        swap_meta_page(&mut page, kind);
    }

    let version = read_u32_at(&page, 16);
    let page_size = read_u32_at(&page, 20);
    let last_page = read_u32_at(&page, 32);

    if page_size == 0 {
        return Err(PkgDbError::FormatCorrupt("page_size is zero".into()));
    }

    let mut meta = MetaPage {
        kind,
        swapped,
        version,
        page_size,
        last_page,
        max_bucket: 0,
        high_mask: 0,
        low_mask: 0,
        spares: [0u32; 32],
        root_page: 0,
    };

    match kind {
        FormatKind::Hash => {
            if !(8..=10).contains(&version) {
                return Err(PkgDbError::FormatCorrupt(format!(
                    "unsupported hash version {version}"
                )));
            }
            meta.max_bucket = read_u32_at(&page, 72);
            meta.high_mask = read_u32_at(&page, 76);
            meta.low_mask = read_u32_at(&page, 80);
            for i in 0..32 {
                meta.spares[i] = read_u32_at(&page, 96 + 4 * i);
            }
        }
        FormatKind::Btree => {
            if !(9..=10).contains(&version) {
                return Err(PkgDbError::FormatCorrupt(format!(
                    "unsupported btree version {version}"
                )));
            }
            meta.root_page = read_u32_at(&page, 88);
        }
    }

    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_hash_meta(page_size: u32, last_page: u32, swapped: bool) -> Vec<u8> {
        let mut page = vec![0u8; 512];
        let magic = if swapped {
            META_HASH_MAGIC_SWAPPED
        } else {
            META_HASH_MAGIC_NATIVE
        };
        write_u32_at(&mut page, 12, magic);
        let maybe_swap = |v: u32| if swapped { v.swap_bytes() } else { v };
        write_u32_at(&mut page, 16, maybe_swap(9));
        write_u32_at(&mut page, 20, maybe_swap(page_size));
        write_u32_at(&mut page, 32, maybe_swap(last_page));
        // offset 24 is expected to round-trip through the double-swap
        // unchanged, so store it in native order regardless of `swapped`.
        write_u32_at(&mut page, 24, 0xdead_beef);
        page
    }

    #[test]
    fn too_short_is_corrupt() {
        assert!(parse_meta(&[0u8; 100]).is_err());
    }

    #[test]
    fn unknown_magic_is_corrupt() {
        let mut page = vec![0u8; 512];
        write_u32_at(&mut page, 12, 0xffff_ffff);
        assert!(parse_meta(&page).is_err());
    }

    #[test]
    fn zero_page_size_is_corrupt() {
        let page = make_hash_meta(0, 1, false);
        assert!(parse_meta(&page).is_err());
    }

    #[test]
    fn native_hash_meta_parses() {
        let page = make_hash_meta(4096, 10, false);
        let meta = parse_meta(&page).unwrap();
        assert_eq!(meta.kind, FormatKind::Hash);
        assert!(!meta.swapped);
        assert_eq!(meta.page_size, 4096);
        assert_eq!(meta.last_page, 10);
    }

    #[test]
    fn swapped_hash_meta_parses_and_unique_field_round_trips() {
        let page = make_hash_meta(4096, 10, true);
        let meta = parse_meta(&page).unwrap();
        assert!(meta.swapped);
        assert_eq!(meta.page_size, 4096);
        assert_eq!(meta.last_page, 10);
        assert_eq!(read_u32_at(&page, 24), 0xdead_beef);
    }
}
