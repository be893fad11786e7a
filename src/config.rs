//! Storage settings and builder for TwinPage.
//!
//! Goals:
//! - One immutable value describing the media geometry and the page format.
//! - validate() enforces the invariants the pair engine relies on
//!   (even page count, page larger than the trailer, non-zero retry budget).
//! - from_env() seeds tool defaults; the engine itself never reads ENV.
//!
//! Env (used by the `twinpage` CLI only):
//! - TP_PAGE_LEN        (default 256)
//! - TP_TOTAL_PAGES     (default 64)
//! - TP_FORMAT_VERSION  (default 1)
//! - TP_RETRY_COUNT     (default 3)
//! - TP_BIG_ENDIAN      = 0|1|true|false (default false)

use std::fmt;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::page::TRAILER_LEN;

/// Integer byte order of the trailer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    #[inline]
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    #[inline]
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    #[inline]
    pub fn write_u16(self, buf: &mut [u8], v: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(buf, v),
            Endian::Big => BigEndian::write_u16(buf, v),
        }
    }

    #[inline]
    pub fn write_u32(self, buf: &mut [u8], v: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, v),
            Endian::Big => BigEndian::write_u32(buf, v),
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endian::Little => write!(f, "little"),
            Endian::Big => write!(f, "big"),
        }
    }
}

/// Media geometry + page format. Immutable once handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Total number of physical pages (original half + backup half).
    pub total_pages: u32,
    /// Page size in bytes, trailer included.
    pub page_len: usize,
    /// Format version stamped on flush and compared on load.
    pub version: u16,
    /// Attempts per media primitive before the call is classified as failed.
    pub retry_count: u32,
    /// Byte order of trailer integers.
    #[serde(default)]
    pub endian: Endian,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            total_pages: 64,
            page_len: 256,
            version: 1,
            retry_count: 3,
            endian: Endian::Little,
        }
    }
}

impl StorageSettings {
    pub fn new(total_pages: u32, page_len: usize) -> Self {
        Self {
            total_pages,
            page_len,
            ..Self::default()
        }
    }

    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Load tool defaults from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("TP_PAGE_LEN") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.page_len = n;
            }
        }
        if let Ok(v) = std::env::var("TP_TOTAL_PAGES") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.total_pages = n;
            }
        }
        if let Ok(v) = std::env::var("TP_FORMAT_VERSION") {
            if let Ok(n) = v.trim().parse::<u16>() {
                cfg.version = n;
            }
        }
        if let Ok(v) = std::env::var("TP_RETRY_COUNT") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.retry_count = n;
            }
        }
        if let Ok(v) = std::env::var("TP_BIG_ENDIAN") {
            let s = v.trim().to_ascii_lowercase();
            if s == "1" || s == "true" || s == "yes" || s == "on" {
                cfg.endian = Endian::Big;
            }
        }

        cfg
    }

    pub fn with_total_pages(mut self, n: u32) -> Self {
        self.total_pages = n;
        self
    }

    pub fn with_page_len(mut self, n: usize) -> Self {
        self.page_len = n;
        self
    }

    pub fn with_version(mut self, v: u16) -> Self {
        self.version = v;
        self
    }

    pub fn with_retry_count(mut self, n: u32) -> Self {
        self.retry_count = n;
        self
    }

    pub fn with_endian(mut self, e: Endian) -> Self {
        self.endian = e;
        self
    }

    /// Check the invariants the pair engine relies on.
    pub fn validate(&self) -> StoreResult<()> {
        if self.total_pages < 2 || self.total_pages % 2 != 0 {
            return Err(StoreError::BadParam(format!(
                "total_pages must be even and >= 2, got {}",
                self.total_pages
            )));
        }
        if self.page_len <= TRAILER_LEN {
            return Err(StoreError::BadParam(format!(
                "page_len {} must exceed trailer size {}",
                self.page_len, TRAILER_LEN
            )));
        }
        if self.page_len % 2 != 0 {
            return Err(StoreError::BadParam(format!(
                "page_len must be even, got {}",
                self.page_len
            )));
        }
        if self.retry_count == 0 {
            return Err(StoreError::BadParam("retry_count must be >= 1".into()));
        }
        Ok(())
    }

    /// Pages in one half (= logical pages of the halves layout).
    #[inline]
    pub fn half(&self) -> u32 {
        self.total_pages / 2
    }

    /// Payload bytes per page.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.page_len.saturating_sub(TRAILER_LEN)
    }

    /// Raw media size in bytes.
    #[inline]
    pub fn media_bytes(&self) -> u64 {
        self.total_pages as u64 * self.page_len as u64
    }
}

impl fmt::Display for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StorageSettings {{ \
             total_pages: {}, \
             page_len: {}, \
             payload_len: {}, \
             version: {}, \
             retry_count: {}, \
             endian: {} \
             }}",
            self.total_pages,
            self.page_len,
            self.payload_len(),
            self.version,
            self.retry_count,
            self.endian,
        )
    }
}

/// Fluent builder producing validated StorageSettings.
#[derive(Clone, Debug)]
pub struct SettingsBuilder {
    cfg: StorageSettings,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            cfg: StorageSettings::default(),
        }
    }
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from ENV defaults (CLI behaviour).
    pub fn from_env() -> Self {
        Self {
            cfg: StorageSettings::from_env(),
        }
    }

    pub fn total_pages(mut self, n: u32) -> Self {
        self.cfg.total_pages = n;
        self
    }

    pub fn page_len(mut self, n: usize) -> Self {
        self.cfg.page_len = n;
        self
    }

    pub fn version(mut self, v: u16) -> Self {
        self.cfg.version = v;
        self
    }

    pub fn retry_count(mut self, n: u32) -> Self {
        self.cfg.retry_count = n;
        self
    }

    pub fn endian(mut self, e: Endian) -> Self {
        self.cfg.endian = e;
        self
    }

    /// Finish the builder; fails with BadParam on incoherent geometry.
    pub fn build(self) -> StoreResult<StorageSettings> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}
