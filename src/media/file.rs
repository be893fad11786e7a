//! media/file — образ носителя в одном файле.
//!
//! Формат:
//! - <image>       — total_pages * page_len байт, страница i по смещению i*page_len;
//!   стёртая страница = 0xFF;
//! - <image>.json  — sidecar ImageHeader (serde_json, pretty), запись tmp+rename;
//! - <image>.lock  — fs2-lock на всё время жизни FileMedia
//!   (exclusive для open/create, shared для open_ro).
//!
//! Ошибки ввода-вывода логируются (warn!) и превращаются в false —
//! классификацию и повторы делает RetryIo.

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::StorageSettings;
use crate::consts::{ERASED_BYTE, IMAGE_MAGIC};
use crate::lock::{try_acquire_exclusive_lock, try_acquire_shared_lock, LockGuard};
use crate::util::now_unix;

use super::Media;

/// Geometry sidecar of a media image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHeader {
    pub magic: String,
    pub settings: StorageSettings,
    pub created_unix: u64,
}

/// Page media backed by a single image file.
#[derive(Debug)]
pub struct FileMedia {
    path: PathBuf,
    file: File,
    header: ImageHeader,
    read_only: bool,
    data_fsync: bool,
    erased: Vec<u8>,
    _lock: LockGuard,
}

/// `<image>.json` next to the image file.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut s: OsString = image.as_os_str().to_owned();
    s.push(".json");
    PathBuf::from(s)
}

fn header_save(image: &Path, h: &ImageHeader) -> Result<()> {
    let path = sidecar_path(image);
    let mut tmp_s: OsString = path.as_os_str().to_owned();
    tmp_s.push(".tmp");
    let tmp = PathBuf::from(tmp_s);

    let mut f = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp)
        .with_context(|| format!("open {}", tmp.display()))?;
    let data = serde_json::to_vec_pretty(h).context("serialize image header")?;
    f.write_all(&data)?;
    let _ = f.sync_all();

    fs::rename(&tmp, &path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Read and check the geometry sidecar of an image.
pub fn header_load(image: &Path) -> Result<ImageHeader> {
    let path = sidecar_path(image);
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let h: ImageHeader = serde_json::from_slice(&bytes).context("parse image header json")?;
    if h.magic != IMAGE_MAGIC {
        return Err(anyhow!(
            "bad image magic '{}' in {} (expected '{}')",
            h.magic,
            path.display(),
            IMAGE_MAGIC
        ));
    }
    h.settings
        .validate()
        .with_context(|| format!("image geometry in {}", path.display()))?;
    Ok(h)
}

impl FileMedia {
    /// Create a new, fully erased image. Fails if the image already exists.
    pub fn create(image: &Path, settings: &StorageSettings) -> Result<Self> {
        settings.validate().context("image settings")?;
        let lock = try_acquire_exclusive_lock(image)?;

        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(image)
            .with_context(|| format!("create image {}", image.display()))?;

        let erased = vec![ERASED_BYTE; settings.page_len];
        for _ in 0..settings.total_pages {
            file.write_all(&erased)?;
        }
        file.sync_all()?;

        let header = ImageHeader {
            magic: IMAGE_MAGIC.to_string(),
            settings: settings.clone(),
            created_unix: now_unix(),
        };
        header_save(image, &header)?;

        debug!(
            "media/file: created {} ({} pages x {} B)",
            image.display(),
            settings.total_pages,
            settings.page_len
        );

        Ok(Self {
            path: image.to_path_buf(),
            file,
            header,
            read_only: false,
            data_fsync: true,
            erased,
            _lock: lock,
        })
    }

    /// Open an existing image for read/write (exclusive lock).
    pub fn open(image: &Path) -> Result<Self> {
        let lock = try_acquire_exclusive_lock(image)?;
        Self::open_with(image, lock, false)
    }

    /// Open an existing image read-only (shared lock); erase/write always fail.
    pub fn open_ro(image: &Path) -> Result<Self> {
        let lock = try_acquire_shared_lock(image)?;
        Self::open_with(image, lock, true)
    }

    fn open_with(image: &Path, lock: LockGuard, read_only: bool) -> Result<Self> {
        let header = header_load(image)?;
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(image)
            .with_context(|| format!("open image {}", image.display()))?;

        let need = header.settings.media_bytes();
        let have = file.metadata()?.len();
        if have != need {
            return Err(anyhow!(
                "image {} has {} bytes, geometry requires {}",
                image.display(),
                have,
                need
            ));
        }

        let erased = vec![ERASED_BYTE; header.settings.page_len];
        Ok(Self {
            path: image.to_path_buf(),
            file,
            header,
            read_only,
            data_fsync: true,
            erased,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.header.settings
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Enable/disable fsync after every erase/write.
    pub fn set_data_fsync(&mut self, on: bool) {
        self.data_fsync = on;
    }

    /// Flip bits of one stored byte, bypassing the engine (fault drills).
    pub fn corrupt_byte(&mut self, page: u32, offset: usize, xor: u8) -> Result<()> {
        if self.read_only {
            return Err(anyhow!("image opened read-only"));
        }
        let ps = self.header.settings.page_len;
        if page >= self.header.settings.total_pages || offset >= ps {
            return Err(anyhow!(
                "page {} offset {} out of range (pages={}, page_len={})",
                page,
                offset,
                self.header.settings.total_pages,
                ps
            ));
        }
        let pos = self.offset_of(page) + offset as u64;
        let mut b = [0u8; 1];
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.read_exact(&mut b)?;
        b[0] ^= xor;
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.write_all(&b)?;
        self.file.sync_data()?;
        Ok(())
    }

    #[inline]
    fn offset_of(&self, page: u32) -> u64 {
        page as u64 * self.header.settings.page_len as u64
    }

    fn check(&self, page: u32, len: usize) -> bool {
        page < self.header.settings.total_pages && len == self.header.settings.page_len
    }

    fn put(&mut self, page: u32, data: &[u8]) -> std::io::Result<()> {
        let off = self.offset_of(page);
        self.file.seek(SeekFrom::Start(off))?;
        self.file.write_all(data)?;
        if self.data_fsync {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

impl Media for FileMedia {
    fn erase(&mut self, page: u32) -> bool {
        if self.read_only || !self.check(page, self.header.settings.page_len) {
            return false;
        }
        let erased = std::mem::take(&mut self.erased);
        let res = self.put(page, &erased);
        self.erased = erased;
        match res {
            Ok(()) => true,
            Err(e) => {
                warn!("media/file: erase page {} failed: {}", page, e);
                false
            }
        }
    }

    fn write(&mut self, page: u32, data: &[u8]) -> bool {
        if self.read_only || !self.check(page, data.len()) {
            return false;
        }
        match self.put(page, data) {
            Ok(()) => true,
            Err(e) => {
                warn!("media/file: write page {} failed: {}", page, e);
                false
            }
        }
    }

    fn read(&mut self, page: u32, buf: &mut [u8]) -> bool {
        if !self.check(page, buf.len()) {
            return false;
        }
        let off = self.offset_of(page);
        let res = self
            .file
            .seek(SeekFrom::Start(off))
            .and_then(|_| self.file.read_exact(buf));
        match res {
            Ok(()) => true,
            Err(e) => {
                warn!("media/file: read page {} failed: {}", page, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_image(prefix: &str) -> PathBuf {
        let t = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("twp-file-{}-{}-{}.img", prefix, std::process::id(), t))
    }

    fn cleanup(img: &Path) {
        let _ = fs::remove_file(img);
        let _ = fs::remove_file(sidecar_path(img));
        let _ = fs::remove_file(crate::lock::lock_file_path(img));
    }

    #[test]
    fn create_write_reopen_read() -> Result<()> {
        let img = unique_image("rw");
        let s = StorageSettings::new(4, 64);
        {
            let mut m = FileMedia::create(&img, &s)?;
            m.set_data_fsync(false);
            let mut page = vec![0x5Au8; 64];
            page[0] = 1;
            assert!(m.erase(2));
            assert!(m.write(2, &page));
            // second create on the same path is refused
            assert!(FileMedia::create(&img, &s).is_err());
        }
        {
            let mut m = FileMedia::open_ro(&img)?;
            assert_eq!(m.settings(), &s);
            let mut buf = vec![0u8; 64];
            assert!(m.read(2, &mut buf));
            assert_eq!(buf[0], 1);
            assert_eq!(buf[1], 0x5A);
            assert!(m.read(0, &mut buf));
            assert!(buf.iter().all(|b| *b == 0xFF));
            // read-only media refuses to program
            assert!(!m.erase(0));
            assert!(!m.write(0, &buf));
        }
        cleanup(&img);
        Ok(())
    }

    #[test]
    fn rejects_truncated_image() -> Result<()> {
        let img = unique_image("trunc");
        let s = StorageSettings::new(4, 64);
        drop(FileMedia::create(&img, &s)?);
        let f = OpenOptions::new().write(true).open(&img)?;
        f.set_len(100)?;
        drop(f);
        let err = FileMedia::open(&img).unwrap_err();
        assert!(err.to_string().contains("geometry requires"), "{err:#}");
        cleanup(&img);
        Ok(())
    }

    #[test]
    fn corrupt_byte_flips_stored_data() -> Result<()> {
        let img = unique_image("corrupt");
        let s = StorageSettings::new(2, 32);
        let mut m = FileMedia::create(&img, &s)?;
        m.corrupt_byte(1, 3, 0x0F)?;
        let mut buf = vec![0u8; 32];
        assert!(m.read(1, &mut buf));
        assert_eq!(buf[3], 0xF0);
        assert!(m.corrupt_byte(2, 0, 1).is_err());
        drop(m);
        cleanup(&img);
        Ok(())
    }
}
