//! File-based locking for single-writer access to a media image.
//!
//! Cross-platform (fs2) advisory locks:
//! - Exclusive: the process that drives the pair engine (writes, healing reads).
//! - Shared: read-only inspection (check, dump), several may coexist.
//!
//! Lock file path: <image>.lock
//! Lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
    mode: LockMode,
}

impl LockGuard {
    fn new(file: std::fs::File, path: PathBuf, mode: LockMode) -> Self {
        Self { file, path, mode }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

/// `<image>.lock` next to the image file.
pub fn lock_file_path(image: &Path) -> PathBuf {
    let mut s: OsString = image.as_os_str().to_owned();
    s.push(".lock");
    PathBuf::from(s)
}

fn open_lock_file(image: &Path) -> Result<std::fs::File> {
    let path = lock_file_path(image);
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    Ok(f)
}

/// Try to acquire a lock in the requested mode. Returns Err if already locked.
pub fn try_acquire_lock(image: &Path, mode: LockMode) -> Result<LockGuard> {
    let file = open_lock_file(image)?;
    let path = lock_file_path(image);
    match mode {
        LockMode::Shared => file
            .try_lock_shared()
            .with_context(|| format!("try_lock_shared failed: {}", path.display()))?,
        LockMode::Exclusive => file
            .try_lock_exclusive()
            .with_context(|| format!("try_lock_exclusive failed: {}", path.display()))?,
    }
    Ok(LockGuard::new(file, path, mode))
}

pub fn try_acquire_exclusive_lock(image: &Path) -> Result<LockGuard> {
    try_acquire_lock(image, LockMode::Exclusive)
}

pub fn try_acquire_shared_lock(image: &Path) -> Result<LockGuard> {
    try_acquire_lock(image, LockMode::Shared)
}
