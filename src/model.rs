//! Value types shared by the facade, availability set, and ordering engine:
//! transaction elements, dependency specs, and the per-element file-state
//! table.

use std::cmp::Ordering as CmpOrdering;

use crate::header::HeaderOps;

/// Sense flags on a [`Ds`]. Only the bits the ordering engine and
/// availability set actually branch on are modeled; others are kept as
/// opaque passthrough bits in the same word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SenseFlags(pub u32);

impl SenseFlags {
    pub const ANY: u32 = 0;
    pub const LESS: u32 = 1 << 1;
    pub const GREATER: u32 = 1 << 2;
    pub const EQUAL: u32 = 1 << 3;
    pub const PREREQ: u32 = 1 << 6;
    pub const INSTALL_PRE: u32 = 1 << 9;
    pub const ERASE_PRE: u32 = 1 << 10;
    pub const SCRIPT_PRE: u32 = 1 << 11;
    pub const SCRIPT_POST: u32 = 1 << 12;
    pub const SCRIPT_PREUN: u32 = 1 << 13;
    pub const SCRIPT_POSTUN: u32 = 1 << 14;
    pub const CONFIG: u32 = 1 << 18;
    pub const RPMLIB: u32 = 1 << 24;
    pub const PRETRANS: u32 = 1 << 25;
    pub const POSTTRANS: u32 = 1 << 26;

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn intersects(self, other: u32) -> bool {
        self.0 & other != 0
    }
}

impl std::ops::BitOr for SenseFlags {
    type Output = SenseFlags;
    fn bitor(self, rhs: SenseFlags) -> SenseFlags {
        SenseFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for SenseFlags {
    fn bitor_assign(&mut self, rhs: SenseFlags) {
        self.0 |= rhs.0;
    }
}

/// Flags excluded from ordering-graph edge construction (§4.G step 4).
pub const ORDER_IGNORE_FLAGS: u32 =
    SenseFlags::RPMLIB | SenseFlags::CONFIG | SenseFlags::PRETRANS | SenseFlags::POSTTRANS;

/// Well-known dependency tag numbers, kept numerically aligned with the
/// header tags the original implementation indexes by.
pub mod tag {
    pub const NAME: u32 = 1000;
    pub const PROVIDENAME: u32 = 1047;
    pub const REQUIRENAME: u32 = 1049;
    pub const CONFLICTNAME: u32 = 1054;
    pub const OBSOLETENAME: u32 = 1090;
    pub const BASENAMES: u32 = 1117;
    pub const DIRNAMES: u32 = 1118;
}

/// Dependency spec: name + EVR + sense flags + colour, as consumed by the
/// availability set and ordering engine. Version comparison is delegated
/// to the [`HeaderOps`] collaborator, never performed here.
#[derive(Debug, Clone)]
pub struct Ds {
    pub tag: u32,
    pub name: String,
    pub evr: String,
    pub sense: SenseFlags,
    pub colour: u32,
}

impl Ds {
    pub fn new(tag: u32, name: impl Into<String>, evr: impl Into<String>, sense: SenseFlags, colour: u32) -> Self {
        Ds {
            tag,
            name: name.into(),
            evr: evr.into(),
            sense,
            colour,
        }
    }

    pub fn is_filename(&self) -> bool {
        self.name.starts_with('/')
    }

    pub fn basename(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn dirname(&self) -> &str {
        match self.name.rfind('/') {
            Some(0) => "/",
            Some(i) => &self.name[..i],
            None => "",
        }
    }

    /// Compares this dependency's EVR against `other` using the header
    /// module's comparator, honoring this spec's sense flags.
    pub fn satisfied_by_evr(&self, header: &dyn HeaderOps, other_evr: &str) -> bool {
        if self.evr.is_empty() {
            return true;
        }
        let cmp = header.compare_evr(other_evr, &self.evr);
        (self.sense.contains(SenseFlags::LESS) && cmp == CmpOrdering::Less)
            || (self.sense.contains(SenseFlags::GREATER) && cmp == CmpOrdering::Greater)
            || (self.sense.contains(SenseFlags::EQUAL) && cmp == CmpOrdering::Equal)
    }
}

/// A file entry owned by a transaction element.
#[derive(Debug, Clone)]
pub struct TeFile {
    pub dir: String,
    pub base: String,
    pub is_symlink: bool,
    pub link_target: Option<String>,
}

/// Whether a transaction element is being installed or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeType {
    Added,
    Removed,
}

/// Mutable scratch state owned exclusively by the ordering engine while it
/// runs (invariant I6); cleared before the element list is returned.
#[derive(Debug, Clone, Default)]
pub struct TsortInfo {
    pub tsi_count: i32,
    pub tsi_qcnt: i32,
    pub scc_id: i32,
    pub queued: bool,
}

/// A package plus its transaction-local dependency and file state.
#[derive(Debug, Clone)]
pub struct Te {
    pub name: String,
    pub evr: String,
    pub arch: String,
    pub colour: u32,
    pub ty: TeType,
    pub requires: Vec<Ds>,
    pub conflicts: Vec<Ds>,
    pub obsoletes: Vec<Ds>,
    pub provides: Vec<Ds>,
    pub order_hints: Vec<Ds>,
    pub files: Vec<TeFile>,
    /// Name of a "grouped collection" this element belongs to, if any
    /// (§4.G collection grouping supplement).
    pub collection: Option<String>,
    pub tsi: Option<TsortInfo>,
}

impl Te {
    pub fn new(name: impl Into<String>, evr: impl Into<String>, ty: TeType) -> Self {
        Te {
            name: name.into(),
            evr: evr.into(),
            arch: String::new(),
            colour: 0,
            ty,
            requires: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            provides: Vec::new(),
            order_hints: Vec::new(),
            files: Vec::new(),
            collection: None,
            tsi: None,
        }
    }

    pub fn nevr(&self) -> String {
        format!("{}-{}", self.name, self.evr)
    }
}

/// Per-file install disposition, mirroring `rpmFileAction` in the
/// original (§3 supplement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Unknown,
    Create,
    Skip,
    Backup,
    Save,
    Remove,
    SkipNState,
    SkipNetshared,
}

/// Per-file on-disk state, mirroring `rpmfileState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Normal,
    Replaced,
    NotInstalled,
    NetShared,
    WrongColor,
    Missing,
}

/// Record of one file shared between two packages, one of which supersedes
/// the other's copy (§3 supplement, grounded on `rpmfs.c`'s
/// `sharedFileInfo`).
#[derive(Debug, Clone, Copy)]
pub struct SharedFileInfo {
    pub pkg_file_idx: usize,
    pub other_pkg_idx: usize,
    pub other_file_idx: usize,
    pub replaced_state: FileState,
}

/// Parallel per-element file bookkeeping table, mirroring `rpmfs_s`.
#[derive(Debug, Clone, Default)]
pub struct FileStates {
    states: Vec<FileState>,
    actions: Vec<FileAction>,
    replaced: Vec<SharedFileInfo>,
}

impl FileStates {
    pub fn new(file_count: usize, init_state: bool) -> Self {
        FileStates {
            states: if init_state {
                vec![FileState::Normal; file_count]
            } else {
                Vec::new()
            },
            actions: vec![FileAction::Unknown; file_count],
            replaced: Vec::new(),
        }
    }

    pub fn file_count(&self) -> usize {
        self.actions.len()
    }

    pub fn set_state(&mut self, idx: usize, state: FileState) {
        self.states[idx] = state;
    }

    pub fn action(&self, idx: usize) -> FileAction {
        self.actions.get(idx).copied().unwrap_or(FileAction::Unknown)
    }

    pub fn set_action(&mut self, idx: usize, action: FileAction) {
        if idx < self.actions.len() {
            self.actions[idx] = action;
        }
    }

    /// Resets every action back to `Unknown`, except entries already
    /// pinned to `SkipNState` by earlier `--excludepaths`-equivalent
    /// processing.
    pub fn reset_actions(&mut self) {
        for action in &mut self.actions {
            if *action != FileAction::SkipNState {
                *action = FileAction::Unknown;
            }
        }
    }

    pub fn add_replaced(&mut self, info: SharedFileInfo) {
        self.replaced.push(info);
    }

    pub fn replaced(&self) -> &[SharedFileInfo] {
        &self.replaced
    }
}
