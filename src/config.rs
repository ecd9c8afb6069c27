use serde::{Deserialize, Serialize};

/// Backend kind selectable at open time. See §4.B / §6 of the design docs
/// for the detection precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Read-only reader for the legacy hash/btree page format.
    LegacyRo,
    /// Modern single-file pager-backed store.
    File,
    /// Accepts no operations; every write fails, every read misses.
    Dummy,
}

/// Database-wide tunables.
///
/// Mirrors the teacher's preset-constructor convention: a conservative
/// [`Config::default`] plus named presets for common deployment shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Preferred backend; `None` lets [`crate::backend::select`] probe the
    /// database root for marker files.
    pub backend: Option<BackendKind>,
    /// Hint passed to backends that support memory mapping.
    pub mmap_size: u64,
    /// Hint passed to backends with an in-memory page cache.
    pub cache_size: u64,
    /// Best-effort disable of fsync/fdatasync in the backend.
    pub no_fsync: bool,
    /// Unix permission bits for newly created database files.
    pub db_perms: u16,
    /// Skip optional secondary index writes.
    pub min_writes: bool,
    /// Milliseconds to retry the environment lock before returning `Busy`.
    pub lock_retry_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: None,
            mmap_size: 16 * 1024 * 1024,
            cache_size: 8 * 1024 * 1024,
            no_fsync: false,
            db_perms: 0o644,
            min_writes: false,
            lock_retry_ms: 200,
        }
    }
}

impl Config {
    /// Conservative preset for production installs: full fsync, modest
    /// caches, legacy-compatible backend detection only.
    pub fn production() -> Self {
        Config {
            no_fsync: false,
            cache_size: 8 * 1024 * 1024,
            lock_retry_ms: 500,
            ..Config::default()
        }
    }

    /// Balances write durability and throughput for interactive use.
    pub fn balanced() -> Self {
        Config {
            no_fsync: false,
            cache_size: 32 * 1024 * 1024,
            mmap_size: 32 * 1024 * 1024,
            lock_retry_ms: 200,
            ..Config::default()
        }
    }

    /// Fastest possible configuration for throwaway benchmarking; not
    /// crash-safe.
    pub fn benchmark() -> Self {
        Config {
            no_fsync: true,
            cache_size: 64 * 1024 * 1024,
            mmap_size: 64 * 1024 * 1024,
            min_writes: true,
            lock_retry_ms: 50,
            ..Config::default()
        }
    }

    /// Forces every fsync on, even for backends that would otherwise skip
    /// redundant syncs.
    pub fn fully_durable() -> Self {
        Config {
            no_fsync: false,
            min_writes: false,
            ..Config::default()
        }
    }
}
