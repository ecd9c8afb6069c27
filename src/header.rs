//! The Header collaborator (§6): an opaque blob plus a tag-indexed view.
//! The real format, signature verification, and on-disk package writer
//! live outside this crate's scope; this module defines the trait
//! boundary and ships one reference implementation sufficient to drive
//! the facade and ordering engine in tests.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::Result;

/// One occurrence of an indexed tag value, paired with its ordinal
/// (`tagNum`) within that tag's array.
#[derive(Debug, Clone)]
pub struct TagOccurrence {
    pub tag_num: u32,
    pub key: Vec<u8>,
}

/// Opaque header collaborator. The core only ever asks a `Header` for
/// its indexable tag occurrences and for EVR comparisons; it never
/// inspects header bytes directly.
pub trait HeaderOps: Send + Sync {
    /// Returns the blob this header was imported from.
    fn blob(&self) -> &[u8];

    /// Returns every occurrence of `tag`'s value(s) as index keys, in tag
    /// array order (so the n-th element's `tag_num` is `n`).
    fn tag_occurrences(&self, tag: u32) -> Vec<TagOccurrence>;

    /// Compares two EVR strings; delegated here because EVR comparison
    /// has package-manager-specific tilde/segment semantics this crate
    /// does not implement.
    fn compare_evr(&self, a: &str, b: &str) -> Ordering;
}

/// Minimal in-memory `Header` used by tests and by callers that do not
/// need real package-header parsing: a blob plus a handful of declared
/// tag->occurrences maps, and a naive EVR comparator (lexicographic on
/// `(epoch, version, release)` split on `-`/`:`).
#[derive(Debug, Clone, Default)]
pub struct SimpleHeader {
    blob: Vec<u8>,
    tags: BTreeMap<u32, Vec<TagOccurrence>>,
}

impl SimpleHeader {
    pub fn new(blob: Vec<u8>) -> Self {
        SimpleHeader {
            blob,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: u32, keys: impl IntoIterator<Item = Vec<u8>>) -> Self {
        let occurrences = keys
            .into_iter()
            .enumerate()
            .map(|(i, key)| TagOccurrence {
                tag_num: i as u32,
                key,
            })
            .collect();
        self.tags.insert(tag, occurrences);
        self
    }

    pub fn import(bytes: &[u8]) -> Result<SimpleHeader> {
        Ok(SimpleHeader::new(bytes.to_vec()))
    }
}

impl HeaderOps for SimpleHeader {
    fn blob(&self) -> &[u8] {
        &self.blob
    }

    fn tag_occurrences(&self, tag: u32) -> Vec<TagOccurrence> {
        self.tags.get(&tag).cloned().unwrap_or_default()
    }

    fn compare_evr(&self, a: &str, b: &str) -> Ordering {
        compare_evr_naive(a, b)
    }
}

/// Splits `epoch:version-release` and compares numerically-aware
/// segment-by-segment; entirely a test/reference fallback, not a
/// bit-compatible reimplementation of any real version comparator.
fn compare_evr_naive(a: &str, b: &str) -> Ordering {
    fn parts(s: &str) -> (i64, &str, &str) {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => (e.parse().unwrap_or(0), r),
            None => (0, s),
        };
        match rest.split_once('-') {
            Some((v, r)) => (epoch, v, r),
            None => (epoch, rest, ""),
        }
    }
    let (ea, va, ra) = parts(a);
    let (eb, vb, rb) = parts(b);
    ea.cmp(&eb)
        .then_with(|| compare_version_segment(va, vb))
        .then_with(|| compare_version_segment(ra, rb))
}

fn compare_version_segment(a: &str, b: &str) -> Ordering {
    let split = |s: &str| -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = String::new();
        let mut cur_is_digit: Option<bool> = None;
        for c in s.chars() {
            let is_digit = c.is_ascii_digit();
            if cur_is_digit == Some(is_digit) || cur_is_digit.is_none() {
                cur.push(c);
            } else {
                out.push(std::mem::take(&mut cur));
                cur.push(c);
            }
            cur_is_digit = Some(is_digit);
        }
        if !cur.is_empty() {
            out.push(cur);
        }
        out
    };
    let sa = split(a);
    let sb = split(b);
    for (x, y) in sa.iter().zip(sb.iter()) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(nx), Ok(ny)) => nx.cmp(&ny),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    sa.len().cmp(&sb.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evr_numeric_segments_compare_numerically() {
        assert_eq!(compare_evr_naive("1.9", "1.10"), Ordering::Less);
        assert_eq!(compare_evr_naive("2-1", "1-9"), Ordering::Greater);
        assert_eq!(compare_evr_naive("1:1.0-1", "2.0-1"), Ordering::Greater);
    }

    #[test]
    fn tag_occurrences_preserve_ordinal() {
        let h = SimpleHeader::new(vec![]).with_tag(1000, vec![b"a".to_vec(), b"b".to_vec()]);
        let occ = h.tag_occurrences(1000);
        assert_eq!(occ[0].tag_num, 0);
        assert_eq!(occ[1].tag_num, 1);
    }
}
