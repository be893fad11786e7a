//! pager/flush — запись пары (original, затем backup), клонирование слотов,
//! сравнение слотов и массовая синхронизация backup-области.
//!
//! Порядок записи важен: backup трогается только после того, как original
//! стёрт, записан и подтверждён readback’ом. Сбой между шагами оставляет
//! новый original и предыдущий валидный backup; load_page выровняет пару.

use log::{debug, info};
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::media::Media;
use crate::metrics::record_page_flushed;
use crate::page::{read_trailer, seal, validate, Expect, PageMeta, PAGE_MAGIC};

use super::core::PairStore;

/// Outcome of sync_backup_area().
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Backups rewritten from their original.
    pub cloned: u32,
    /// Backups already byte-identical to a valid original.
    pub in_sync: u32,
    /// Pairs skipped because the original is not valid.
    pub skipped_invalid: u32,
}

impl<'a, M: Media + ?Sized> PairStore<'a, M> {
    /// Flush logical page `index` of the halves layout.
    pub fn flush(&mut self, index: u32, meta: &PageMeta) -> StoreResult<PageMeta> {
        let (original, backup) = self.pair_of(index)?;
        self.flush_page(original, backup, meta)
    }

    /// Seal the payload staged in `payload_mut()` with `meta` and write it to
    /// `original`, then to `backup`, verifying each by readback.
    ///
    /// Magic and version are stamped by the store. Returns the metadata as stored.
    /// Buffers afterwards: `work()` = sealed page, `mirror()` = readback of the last slot written.
    pub fn flush_page(&mut self, original: u32, backup: u32, meta: &PageMeta) -> StoreResult<PageMeta> {
        self.check_context()?;
        self.check_pair(original, backup)?;

        let stamped = PageMeta {
            magic: PAGE_MAGIC,
            version: self.settings.version,
            crc: 0,
            ..*meta
        };
        let sealed = seal(&mut self.io, &mut self.work[..], &stamped, self.settings.endian)?;

        self.program_slot(original)?;
        self.program_slot(backup)?;

        debug!(
            "flush: pair ({}, {}) type={} crc={:08x}",
            original, backup, sealed.page_type, sealed.crc
        );
        record_page_flushed();
        Ok(sealed)
    }

    /// Copy a valid page from `src` into `dst` (erase + write + verify), unconditionally.
    ///
    /// Buffers afterwards: `work()` = the copied page.
    pub fn clone_slot(&mut self, src: u32, dst: u32, expect: &Expect) -> StoreResult<PageMeta> {
        self.check_context()?;
        self.check_pair(src, dst)?;

        let meta = self.read_checked(src, dst, expect)?;
        self.program_slot(dst)?;
        debug!("clone: page {} -> {}", src, dst);
        Ok(meta)
    }

    /// Byte equality of two slots.
    ///
    /// Buffers afterwards: `work()` = slot `a`, `mirror()` = slot `b`.
    pub fn are_equal(&mut self, a: u32, b: u32) -> StoreResult<bool> {
        self.check_context()?;
        self.check_slot(a)?;
        self.check_slot(b)?;
        self.io.read(a, &mut self.work[..])?;
        self.io.read(b, &mut self.mirror[..])?;
        Ok(self.work[..] == self.mirror[..])
    }

    /// Copy every valid original of the halves layout into its backup slot.
    /// Backups already identical to their original are left untouched.
    pub fn sync_backup_area(&mut self, expect: &Expect) -> StoreResult<SyncReport> {
        self.check_context()?;
        let mut rep = SyncReport::default();

        for index in 0..self.settings.half() {
            let (original, backup) = self.pair_of(index)?;
            match self.read_checked(original, backup, expect) {
                Ok(_) => {}
                Err(StoreError::NotValidPage { .. }) => {
                    rep.skipped_invalid += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
            let same = self.io.read(backup, &mut self.mirror[..]).is_ok()
                && self.mirror[..] == self.work[..];
            if same {
                rep.in_sync += 1;
            } else {
                self.program_slot(backup)?;
                rep.cloned += 1;
            }
        }

        info!(
            "sync: cloned={} in_sync={} skipped_invalid={}",
            rep.cloned, rep.in_sync, rep.skipped_invalid
        );
        Ok(rep)
    }

    /// Read `src` into work (read errors propagate) and require a valid page.
    fn read_checked(&mut self, src: u32, dst: u32, expect: &Expect) -> StoreResult<PageMeta> {
        self.io.read(src, &mut self.work[..])?;
        let endian = self.settings.endian;
        let verdict = validate(&mut self.io, &self.work[..], expect, endian)?;
        if !verdict.is_valid() {
            debug!("clone: source {} invalid: {:?}", src, verdict);
            return Err(StoreError::NotValidPage {
                original: src,
                backup: dst,
            });
        }
        Ok(read_trailer(&self.work[..], endian))
    }
}
