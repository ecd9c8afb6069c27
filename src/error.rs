use std::io;
use std::sync::Mutex;

use thiserror::Error;
use tracing::error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PkgDbError>;

/// Error taxonomy for the package database engine.
///
/// Variants map directly onto the kinds enumerated by the propagation
/// policy: `NotFound` is always surfaced, `FormatCorrupt` aborts only the
/// current cursor, `NoMem` is routed through the installed [`OomHandler`]
/// instead of being returned.
#[derive(Debug, Error)]
pub enum PkgDbError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("format corrupt: {0}")]
    FormatCorrupt(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("read-only backend: {0}")]
    ReadOnly(&'static str),

    #[error("database busy: {0}")]
    Busy(String),

    #[error("invalid argument: {0}")]
    Invalid(String),

    #[error("out of memory")]
    NoMem,

    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

/// Hook invoked when the core hits an unrecoverable allocation failure.
///
/// The original database aborts the process on out-of-memory; tests want
/// to observe that decision rather than have the harness actually killed,
/// so the handler is injectable via [`set_oom_handler`].
pub trait OomHandler: Send + Sync {
    fn handle(&self);
}

struct ExitOnOom;

impl OomHandler for ExitOnOom {
    fn handle(&self) {
        error!("out of memory - aborting process");
        std::process::exit(1);
    }
}

static OOM_HANDLER: Mutex<Option<Box<dyn OomHandler>>> = Mutex::new(None);

/// Installs a custom out-of-memory handler, replacing the default
/// process-exit behavior. Intended for tests.
pub fn set_oom_handler(handler: Box<dyn OomHandler>) {
    *OOM_HANDLER.lock().unwrap_or_else(|e| e.into_inner()) = Some(handler);
}

/// Invokes the installed OOM handler, or the default exit-the-process one.
pub fn handle_oom() -> PkgDbError {
    let guard = OOM_HANDLER.lock().unwrap_or_else(|e| e.into_inner());
    match guard.as_ref() {
        Some(h) => h.handle(),
        None => ExitOnOom.handle(),
    }
    PkgDbError::NoMem
}
