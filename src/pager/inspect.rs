//! pager/inspect — диагностика пары без записи на носитель.
//!
//! original читается в work, backup — в mirror; каждый слот классифицируется
//! (valid / invalid / unreadable / blank), затем пара целиком (PairState).
//! Ошибка crc-примитива пробрасывается, отказ чтения — это состояние слота.

use serde::Serialize;

use crate::config::Endian;
use crate::consts::ERASED_BYTE;
use crate::error::StoreResult;
use crate::media::Media;
use crate::page::{read_trailer, validate, Expect, Verdict};

use super::core::PairStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    Valid { version: u16 },
    Invalid { verdict: Verdict },
    Unreadable,
    /// Erased, never programmed.
    Blank,
}

impl SlotState {
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, SlotState::Valid { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairState {
    /// Both valid and byte-identical.
    InSync,
    /// Both valid but different (interrupted flush of the backup).
    Diverged,
    OriginalOnly,
    BackupOnly,
    /// Neither side valid, at least one side programmed or unreadable.
    Lost,
    /// Both sides erased.
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairReport {
    pub original: u32,
    pub backup: u32,
    pub original_state: SlotState,
    pub backup_state: SlotState,
    pub state: PairState,
    /// A valid side carries a version below the expected one.
    pub old_version: bool,
}

impl PairReport {
    /// A load() of this pair would rewrite a slot.
    pub fn needs_heal(&self) -> bool {
        matches!(
            self.state,
            PairState::Diverged | PairState::OriginalOnly | PairState::BackupOnly
        )
    }
}

impl<'a, M: Media + ?Sized> PairStore<'a, M> {
    /// Classify logical page `index` of the halves layout.
    pub fn inspect(&mut self, index: u32, expect: &Expect) -> StoreResult<PairReport> {
        let (original, backup) = self.pair_of(index)?;
        self.inspect_pair(original, backup, expect)
    }

    /// Classify an explicit pair. Never writes to the media.
    ///
    /// Buffers afterwards: `work()` = original slot, `mirror()` = backup slot.
    pub fn inspect_pair(&mut self, original: u32, backup: u32, expect: &Expect) -> StoreResult<PairReport> {
        self.check_context()?;
        self.check_pair(original, backup)?;

        let endian = self.settings.endian;
        let original_state = match self.io.read(original, &mut self.work[..]) {
            Err(_) => SlotState::Unreadable,
            Ok(()) => classify(validate(&mut self.io, &self.work[..], expect, endian)?, &self.work[..], endian),
        };
        let backup_state = match self.io.read(backup, &mut self.mirror[..]) {
            Err(_) => SlotState::Unreadable,
            Ok(()) => classify(validate(&mut self.io, &self.mirror[..], expect, endian)?, &self.mirror[..], endian),
        };

        let state = match (original_state.is_valid(), backup_state.is_valid()) {
            (true, true) if self.work[..] == self.mirror[..] => PairState::InSync,
            (true, true) => PairState::Diverged,
            (true, false) => PairState::OriginalOnly,
            (false, true) => PairState::BackupOnly,
            (false, false) => {
                if original_state == SlotState::Blank && backup_state == SlotState::Blank {
                    PairState::Blank
                } else {
                    PairState::Lost
                }
            }
        };

        let want = expect.version.unwrap_or(self.settings.version);
        let old_version = [original_state, backup_state]
            .iter()
            .any(|s| matches!(s, SlotState::Valid { version } if *version < want));

        Ok(PairReport {
            original,
            backup,
            original_state,
            backup_state,
            state,
            old_version,
        })
    }
}

fn classify(verdict: Verdict, page: &[u8], endian: Endian) -> SlotState {
    if verdict.is_valid() {
        return SlotState::Valid {
            version: read_trailer(page, endian).version,
        };
    }
    if page.iter().all(|b| *b == ERASED_BYTE) {
        SlotState::Blank
    } else {
        SlotState::Invalid { verdict }
    }
}
