//! Backend detection, byte-for-precedence grounded on `dbDetectBackend` in
//! `examples/original_source/lib/backend/dbi.c`: prefer the configured
//! backend's marker file, else scan all registered backends in table
//! order, else fall back to the configured backend even without a
//! marker, else fall back to `Dummy`.

use std::path::Path;

use tracing::warn;

use crate::config::BackendKind;

/// Registered backends in detection-scan order, paired with the marker
/// file name the probe checks for.
const REGISTRY: &[(BackendKind, &str)] = &[
    (BackendKind::LegacyRo, crate::backend::legacy::MARKER_FILE),
    (BackendKind::File, "pkgdepot.json"),
];

/// Decides which backend to bind for `root_dir`, given an optionally
/// preferred backend from [`crate::config::Config`].
pub fn detect_backend(root_dir: &Path, preferred: Option<BackendKind>) -> BackendKind {
    if let Some(pref) = preferred {
        if pref == BackendKind::Dummy {
            return BackendKind::Dummy;
        }
        if let Some((_, marker)) = REGISTRY.iter().find(|(k, _)| *k == pref) {
            if root_dir.join(marker).exists() {
                return pref;
            }
        }
    }

    for (kind, marker) in REGISTRY {
        if root_dir.join(marker).exists() {
            if let Some(pref) = preferred {
                if pref != *kind {
                    warn!(
                        "preferred backend {:?} has no marker file at {}; using {:?} instead",
                        pref,
                        root_dir.display(),
                        kind
                    );
                }
            }
            return *kind;
        }
    }

    if let Some(pref) = preferred {
        return pref;
    }

    warn!(
        "no backend marker found under {} and none configured; falling back to dummy",
        root_dir.display()
    );
    BackendKind::Dummy
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_root_with_no_preference_falls_back_to_dummy() {
        let dir = tempdir().unwrap();
        assert_eq!(detect_backend(dir.path(), None), BackendKind::Dummy);
    }

    #[test]
    fn empty_root_with_preference_uses_preference() {
        let dir = tempdir().unwrap();
        assert_eq!(detect_backend(dir.path(), Some(BackendKind::File)), BackendKind::File);
    }

    #[test]
    fn marker_file_wins_over_preference() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("pkgdepot.json"), b"{}").unwrap();
        assert_eq!(
            detect_backend(dir.path(), Some(BackendKind::LegacyRo)),
            BackendKind::File
        );
    }

    #[test]
    fn dummy_preference_is_honored_even_with_markers_present() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Packages"), b"").unwrap();
        assert_eq!(detect_backend(dir.path(), Some(BackendKind::Dummy)), BackendKind::Dummy);
    }
}
