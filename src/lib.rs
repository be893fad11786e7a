#![allow(non_snake_case)]

// Базовые модули
pub mod config;
pub mod consts;
pub mod error;
pub mod lock;
pub mod metrics;

// Формат страницы и носители
pub mod media; // src/media/{mod,mem,file}.rs
pub mod page;  // src/page/{mod,common,codec,checksum}.rs

// Движок пар
pub mod pager; // src/pager/{mod,core,io,load,flush,inspect}.rs

// Потребители и инструменты
pub mod blob;
pub mod doctor;
pub mod util;  // src/util/mod.rs

pub mod cli;

// Удобные реэкспорты
pub use blob::{BlobInfo, BlobStore};
pub use config::{Endian, SettingsBuilder, StorageSettings};
pub use doctor::{DoctorReport, RepairReport};
pub use error::{CallbackKind, PageStatus, StoreError, StoreResult};
pub use lock::{try_acquire_exclusive_lock, try_acquire_shared_lock, LockGuard, LockMode};
pub use media::{FileMedia, ImageHeader, Media, MemMedia};
pub use page::{Expect, PageMeta, Verdict, PAGE_MAGIC, TRAILER_LEN};
pub use pager::{Loaded, PairReport, PairState, PairStore, SlotState, SyncReport, UsableLayout};
