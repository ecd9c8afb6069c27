//! Overflow chain reader, byte-exact with `ovfl_get` in `bdb_ro.c`.

use crate::backend::legacy::page::{get_page, page_u16, page_u32};
use crate::error::{PkgDbError, Result};

/// Follows an overflow chain starting at `(pageno, len)`, returning the
/// fully reassembled value. `pageno`/`len` come from a `(u32, u32)`
/// reference embedded in a hash or btree item (already byte-swapped to
/// native order by the caller).
pub fn read_overflow(
    file: &[u8],
    pagesize: u32,
    last_page: u32,
    swapped: bool,
    mut pageno: u32,
    mut len: u32,
) -> Result<Vec<u8>> {
    if len == 0 {
        return Err(PkgDbError::FormatCorrupt("overflow length is zero".into()));
    }
    let mut out = Vec::with_capacity(len as usize);
    while len > 0 {
        let page = get_page(file, pagesize, last_page, swapped, pageno)?;
        if page[25] != super::page::PAGE_TYPE_OVERFLOW {
            return Err(PkgDbError::FormatCorrupt(format!(
                "expected overflow page at {pageno}, found type {}",
                page[25]
            )));
        }
        let plen = page_u16(&page, 22) as u32;
        if plen as usize + 26 > pagesize as usize || plen > len {
            return Err(PkgDbError::FormatCorrupt(
                "overflow page length inconsistent with remaining length".into(),
            ));
        }
        out.extend_from_slice(&page[26..26 + plen as usize]);
        len -= plen;
        pageno = page_u32(&page, 16);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_overflow_page(pagesize: usize, next: u32, data: &[u8]) -> Vec<u8> {
        let mut page = vec![0u8; pagesize];
        page[8..12].copy_from_slice(&1u32.to_ne_bytes());
        page[16..20].copy_from_slice(&next.to_ne_bytes());
        page[22..24].copy_from_slice(&(data.len() as u16).to_ne_bytes());
        page[25] = super::super::page::PAGE_TYPE_OVERFLOW;
        page[26..26 + data.len()].copy_from_slice(data);
        page
    }

    #[test]
    fn single_page_overflow_reads_back() {
        let pagesize = 512usize;
        let mut file = vec![0u8; pagesize * 2];
        let page = make_overflow_page(pagesize, 0, b"hello world");
        file[pagesize..pagesize * 2].copy_from_slice(&page);
        let data = read_overflow(&file, pagesize as u32, 1, false, 1, 11).unwrap();
        assert_eq!(data, b"hello world");
    }

    #[test]
    fn chained_overflow_pages_concatenate() {
        let pagesize = 512usize;
        let mut file = vec![0u8; pagesize * 3];
        let p1 = make_overflow_page(pagesize, 2, b"part-one-");
        let mut p2 = make_overflow_page(pagesize, 0, b"part-two");
        p2[8..12].copy_from_slice(&2u32.to_ne_bytes());
        file[pagesize..pagesize * 2].copy_from_slice(&p1);
        file[pagesize * 2..pagesize * 3].copy_from_slice(&p2);
        let total_len = b"part-one-".len() + b"part-two".len();
        let data = read_overflow(&file, pagesize as u32, 2, false, 1, total_len as u32).unwrap();
        assert_eq!(data, b"part-one-part-two");
    }
}
