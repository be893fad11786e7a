//! error — закрытый набор результатов ядра (redundant page store).
//!
//! Ошибки (`StoreError`) и успешные исходы (`PageStatus`) разделены:
//! BackupRecovered / NewVersionFound — это успех с пометкой, а не ошибка,
//! поэтому они приходят в `Ok(..)`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which media primitive exhausted its retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallbackKind {
    Erase,
    Write,
    Read,
    Crc,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackKind::Erase => write!(f, "erase"),
            CallbackKind::Write => write!(f, "write"),
            CallbackKind::Read => write!(f, "read"),
            CallbackKind::Crc => write!(f, "crc32"),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Caller handed over something unusable at construction time (scratch buffers).
    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("bad parameter: {0}")]
    BadParam(String),

    #[error("store is not initialized")]
    NotInitialized,

    #[error("corrupt context: {0}")]
    CorruptContext(String),

    #[error(
        "{kind} callback failed{} after {attempts} attempt(s)",
        .page.map(|p| format!(" on page {p}")).unwrap_or_default()
    )]
    Callback {
        kind: CallbackKind,
        page: Option<u32>,
        attempts: u32,
    },

    #[error("page {page}: readback does not match written data")]
    WriteNoMatchRead { page: u32 },

    #[error("no valid page in pair (original={original}, backup={backup})")]
    NotValidPage { original: u32, backup: u32 },
}

impl StoreError {
    /// Callback kind for `Callback` errors, None otherwise.
    pub fn callback_kind(&self) -> Option<CallbackKind> {
        match self {
            StoreError::Callback { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for `NotValidPage`: nothing left to recover without a reformat.
    pub fn is_not_valid_page(&self) -> bool {
        matches!(self, StoreError::NotValidPage { .. })
    }
}

/// Successful load outcome.
///
/// Ordered by severity: `Ok < BackupRecovered < NewVersionFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PageStatus {
    /// Valid page, pair already in sync.
    Ok,
    /// Valid page; the pair was out of sync and has just been repaired.
    BackupRecovered,
    /// Valid page carrying a different format version (migration is up to the caller).
    NewVersionFound,
}

impl PageStatus {
    /// Combine two statuses, keeping the more significant one.
    pub fn worst(self, other: PageStatus) -> PageStatus {
        self.max(other)
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStatus::Ok => write!(f, "ok"),
            PageStatus::BackupRecovered => write!(f, "backup_recovered"),
            PageStatus::NewVersionFound => write!(f, "new_version_found"),
        }
    }
}
