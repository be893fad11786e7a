//! pager/core — контекст движка пар: структура PairStore, init(), самопроверка,
//! отображение логических страниц на (original, backup) и доступ к буферам.
//!
//! Буферы (arena): два буфера по page_len байт, принадлежат вызывающему и
//! одалживаются на всё время жизни PairStore:
//! - work   — рабочая страница (payload ‖ trailer);
//! - mirror — readback/сравнение; после любого вызова содержимое не специфицировано.

use log::debug;

use crate::config::StorageSettings;
use crate::error::{StoreError, StoreResult};
use crate::media::Media;

use super::io::RetryIo;

/// Redundant pair engine over borrowed media, settings and scratch buffers.
pub struct PairStore<'a, M: Media + ?Sized> {
    pub(crate) io: RetryIo<'a, M>,
    pub(crate) settings: &'a StorageSettings,
    pub(crate) work: &'a mut [u8],
    pub(crate) mirror: &'a mut [u8],
    pub(crate) initialized: bool,
}

/// Payload view of the working buffer plus the number of logical pages.
pub struct UsableLayout<'b> {
    pub payload: &'b mut [u8],
    pub pages: u32,
}

impl<'a, M: Media + ?Sized> PairStore<'a, M> {
    /// Validate settings and scratch buffers and build the context.
    pub fn init(
        media: &'a mut M,
        settings: &'a StorageSettings,
        work: &'a mut [u8],
        mirror: &'a mut [u8],
    ) -> StoreResult<Self> {
        settings.validate()?;
        if work.len() != settings.page_len {
            return Err(StoreError::BadArgument(format!(
                "working buffer is {} bytes, page_len is {}",
                work.len(),
                settings.page_len
            )));
        }
        if mirror.len() != settings.page_len {
            return Err(StoreError::BadArgument(format!(
                "mirror buffer is {} bytes, page_len is {}",
                mirror.len(),
                settings.page_len
            )));
        }
        debug!("pager: init {}", settings);
        Ok(Self {
            io: RetryIo::new(media, settings.retry_count),
            settings,
            work,
            mirror,
            initialized: true,
        })
    }

    /// Mark the context unusable; every later state-touching call fails with NotInitialized.
    pub fn deinit(&mut self) {
        self.initialized = false;
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub fn settings(&self) -> &StorageSettings {
        self.settings
    }

    /// Logical pages of the halves layout.
    #[inline]
    pub fn usable_pages(&self) -> u32 {
        self.settings.half()
    }

    /// Payload view of the working buffer and the usable (logical) page count.
    pub fn usable_layout(&mut self) -> StoreResult<UsableLayout<'_>> {
        self.check_context()?;
        let pages = self.settings.half();
        let pl = self.settings.payload_len();
        Ok(UsableLayout {
            payload: &mut self.work[..pl],
            pages,
        })
    }

    /// Working buffer (whole page).
    #[inline]
    pub fn work(&self) -> &[u8] {
        &self.work[..]
    }

    #[inline]
    pub fn work_mut(&mut self) -> &mut [u8] {
        &mut self.work[..]
    }

    /// Payload part of the working buffer.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.work[..self.settings.payload_len()]
    }

    /// Stage payload for the next flush here.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let pl = self.settings.payload_len();
        &mut self.work[..pl]
    }

    /// Mirror buffer: last readback, contents unspecified between calls.
    #[inline]
    pub fn mirror(&self) -> &[u8] {
        &self.mirror[..]
    }

    /// Backend access (fault drills, diagnostics). Bypasses the engine.
    pub fn media(&mut self) -> &mut M {
        self.io.media()
    }

    /// Retry adapter (diagnostics, fault drills).
    pub fn retry_io_mut(&mut self) -> &mut RetryIo<'a, M> {
        &mut self.io
    }

    /// crc32 primitive through the retry adapter (consumer-level checksums).
    pub fn crc32(&mut self, seed: u32, data: &[u8]) -> StoreResult<u32> {
        self.check_context()?;
        self.io.crc32(seed, data)
    }

    /// (original, backup) slots of logical page `index` in the halves layout.
    pub fn pair_of(&self, index: u32) -> StoreResult<(u32, u32)> {
        let half = self.settings.half();
        if index >= half {
            return Err(StoreError::BadParam(format!(
                "logical page {} out of range (usable pages {})",
                index, half
            )));
        }
        Ok((index, index + half))
    }

    // ---------------- internal checks ----------------

    /// Self-check at the start of every state-touching call.
    pub(crate) fn check_context(&self) -> StoreResult<()> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }
        let ps = self.settings.page_len;
        // init() проверил длины; заимствованные буферы размер не меняют
        if self.work.len() != ps || self.mirror.len() != ps {
            return Err(StoreError::CorruptContext(format!(
                "scratch buffers {}/{} bytes, page_len {}",
                self.work.len(),
                self.mirror.len(),
                ps
            )));
        }
        if self.settings.validate().is_err() || self.io.retries() != self.settings.retry_count {
            return Err(StoreError::CorruptContext(format!(
                "settings incoherent: {}",
                self.settings
            )));
        }
        Ok(())
    }

    pub(crate) fn check_slot(&self, idx: u32) -> StoreResult<()> {
        if idx >= self.settings.total_pages {
            return Err(StoreError::BadParam(format!(
                "page {} out of range (total pages {})",
                idx, self.settings.total_pages
            )));
        }
        Ok(())
    }

    pub(crate) fn check_pair(&self, original: u32, backup: u32) -> StoreResult<()> {
        self.check_slot(original)?;
        self.check_slot(backup)?;
        if original == backup {
            return Err(StoreError::BadParam(format!(
                "original and backup are the same page {}",
                original
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MemMedia;
    use crate::page::TRAILER_LEN;

    #[test]
    fn init_rejects_wrong_buffers_and_settings() {
        let s = StorageSettings::new(4, 64);
        let mut m = MemMedia::new(4, 64);
        let mut w = vec![0u8; 63];
        let mut r = vec![0u8; 64];
        let err = PairStore::init(&mut m, &s, &mut w, &mut r).err().unwrap();
        assert!(matches!(err, StoreError::BadArgument(_)));

        let bad = StorageSettings::new(3, 64);
        let mut w = vec![0u8; 64];
        let err = PairStore::init(&mut m, &bad, &mut w, &mut r).err().unwrap();
        assert!(matches!(err, StoreError::BadParam(_)));
    }

    #[test]
    fn layout_and_pair_mapping() {
        let s = StorageSettings::new(8, 64);
        let mut m = MemMedia::new(8, 64);
        let (mut w, mut r) = (vec![0u8; 64], vec![0u8; 64]);
        let mut st = PairStore::init(&mut m, &s, &mut w, &mut r).unwrap();
        assert_eq!(st.pair_of(0).unwrap(), (0, 4));
        assert_eq!(st.pair_of(3).unwrap(), (3, 7));
        assert!(matches!(st.pair_of(4), Err(StoreError::BadParam(_))));
        let layout = st.usable_layout().unwrap();
        assert_eq!(layout.pages, 4);
        assert_eq!(layout.payload.len(), 64 - TRAILER_LEN);
        assert!(st.check_pair(1, 1).is_err());
        assert!(st.check_pair(1, 8).is_err());
        assert!(st.check_pair(1, 2).is_ok());
    }

    #[test]
    fn deinit_blocks_operations() {
        let s = StorageSettings::new(2, 64);
        let mut m = MemMedia::new(2, 64);
        let (mut w, mut r) = (vec![0u8; 64], vec![0u8; 64]);
        let mut st = PairStore::init(&mut m, &s, &mut w, &mut r).unwrap();
        assert!(st.is_initialized());
        st.deinit();
        assert_eq!(st.usable_layout().err(), Some(StoreError::NotInitialized));
        assert_eq!(st.crc32(0, b"x").err(), Some(StoreError::NotInitialized));
    }

    #[test]
    fn retry_budget_drift_is_corrupt_context() {
        let s = StorageSettings::new(2, 64).with_retry_count(3);
        let mut m = MemMedia::new(2, 64);
        let (mut w, mut r) = (vec![0u8; 64], vec![0u8; 64]);
        let mut st = PairStore::init(&mut m, &s, &mut w, &mut r).unwrap();
        assert_eq!(st.retry_io_mut().retries(), 3);

        st.retry_io_mut().set_retries(5);
        assert!(matches!(st.usable_layout(), Err(StoreError::CorruptContext(_))));
        assert!(matches!(st.crc32(0, b"x"), Err(StoreError::CorruptContext(_))));

        st.retry_io_mut().set_retries(3);
        assert!(st.usable_layout().is_ok());
    }
}
