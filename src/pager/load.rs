//! pager/load — чтение логической страницы с откатом на backup и лечением пары.
//!
//! Алгоритм load_page(original, backup, expect):
//! 1) original читается в work и проверяется (magic/type/CRC);
//! 2) original валиден → backup читается в mirror; не читается / не совпадает
//!    байт-в-байт → backup перезаписывается из work (BackupRecovered);
//! 3) original невалиден/не читается → backup читается в work; валиден →
//!    original перезаписывается из work (BackupRecovered);
//! 4) оба невалидны → NotValidPage, ни один слот не пишется;
//! 5) версия выжившей страницы ниже ожидаемой → NewVersionFound (лечение уже выполнено);
//!    страница более нового формата грузится как Ok/BackupRecovered.
//!
//! После вызова: work = авторитетная страница, mirror — последний readback.

use log::{debug, warn};
use serde::Serialize;

use crate::error::{PageStatus, StoreError, StoreResult};
use crate::media::Media;
use crate::metrics::{
    record_backup_heal, record_original_heal, record_page_loaded, record_pair_lost,
    record_verify_mismatch,
};
use crate::page::{read_trailer, validate, Expect, PageMeta};

use super::core::PairStore;

/// Result of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Loaded {
    pub status: PageStatus,
    pub meta: PageMeta,
    /// One side of the pair was rewritten during this call.
    pub healed: bool,
}

impl<'a, M: Media + ?Sized> PairStore<'a, M> {
    /// Load logical page `index` of the halves layout.
    pub fn load(&mut self, index: u32, expect: &Expect) -> StoreResult<Loaded> {
        let (original, backup) = self.pair_of(index)?;
        self.load_page(original, backup, expect)
    }

    /// Load an explicit (original, backup) pair, healing whichever side is stale.
    ///
    /// Buffers afterwards: `work()` holds the loaded page, `mirror()` is unspecified.
    /// If the heal write fails (`Callback`/`WriteNoMatchRead`), `work()` still holds
    /// the valid page that was being copied, so the caller can salvage it.
    pub fn load_page(&mut self, original: u32, backup: u32, expect: &Expect) -> StoreResult<Loaded> {
        self.check_context()?;
        self.check_pair(original, backup)?;

        let healed = if self.read_valid(original, expect)? {
            let same = match self.io.read(backup, &mut self.mirror[..]) {
                Ok(()) => self.mirror[..] == self.work[..],
                Err(e) => {
                    debug!("load: backup {} unreadable: {}", backup, e);
                    false
                }
            };
            if same {
                false
            } else {
                debug!("load: backup {} stale, rewriting from original {}", backup, original);
                self.program_slot(backup)?;
                record_backup_heal();
                true
            }
        } else if self.read_valid(backup, expect)? {
            debug!("load: original {} invalid, restoring from backup {}", original, backup);
            self.program_slot(original)?;
            record_original_heal();
            true
        } else {
            record_pair_lost();
            warn!("load: no valid page in pair ({}, {})", original, backup);
            return Err(StoreError::NotValidPage { original, backup });
        };

        let meta = read_trailer(&self.work[..], self.settings.endian);
        let want = expect.version.unwrap_or(self.settings.version);
        let status = if meta.version < want {
            debug!(
                "load: pair ({}, {}) carries version {}, expected {}",
                original, backup, meta.version, want
            );
            PageStatus::NewVersionFound
        } else if healed {
            PageStatus::BackupRecovered
        } else {
            PageStatus::Ok
        };

        record_page_loaded();
        Ok(Loaded { status, meta, healed })
    }

    // ---------------- shared helpers (load/flush/clone) ----------------

    /// Read `idx` into work and run the validity predicate.
    /// Unreadable → Ok(false); crc primitive failure → Err.
    pub(crate) fn read_valid(&mut self, idx: u32, expect: &Expect) -> StoreResult<bool> {
        if let Err(e) = self.io.read(idx, &mut self.work[..]) {
            debug!("load: slot {} unreadable: {}", idx, e);
            return Ok(false);
        }
        let verdict = validate(&mut self.io, &self.work[..], expect, self.settings.endian)?;
        if !verdict.is_valid() {
            debug!("load: slot {} invalid: {:?}", idx, verdict);
        }
        Ok(verdict.is_valid())
    }

    /// erase → write(work) → read(mirror) → byte compare.
    pub(crate) fn program_slot(&mut self, idx: u32) -> StoreResult<()> {
        self.io.erase(idx)?;
        self.io.write(idx, &self.work[..])?;
        self.io.read(idx, &mut self.mirror[..])?;
        if self.mirror[..] != self.work[..] {
            record_verify_mismatch();
            warn!("pager: page {} readback differs from written data", idx);
            return Err(StoreError::WriteNoMatchRead { page: idx });
        }
        Ok(())
    }
}
