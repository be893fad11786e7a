//! pager/io — обёртка над примитивами носителя с ограниченным числом повторов.
//!
//! - erase/write/read/crc32 пробуются до retry_count раз;
//! - первый успех возвращается сразу, без задержек (носитель синхронный);
//! - исчерпанный бюджет → StoreError::Callback{kind, page, attempts};
//! - отказ никогда не «понижается»: вызывающая сторона не продолжает после ошибки.

use log::{trace, warn};

use crate::error::{CallbackKind, StoreError, StoreResult};
use crate::media::Media;
use crate::metrics::{record_io_exhausted, record_io_retry};

/// Media primitives with a bounded retry budget.
pub struct RetryIo<'a, M: Media + ?Sized> {
    media: &'a mut M,
    retries: u32,
}

impl<'a, M: Media + ?Sized> RetryIo<'a, M> {
    pub fn new(media: &'a mut M, retries: u32) -> Self {
        Self {
            media,
            retries: retries.max(1),
        }
    }

    #[inline]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Change the retry budget. The owning PairStore rejects a budget that
    /// no longer matches its settings on the next call.
    pub fn set_retries(&mut self, retries: u32) {
        self.retries = retries.max(1);
    }

    /// Direct access to the backend (tests, diagnostics).
    pub fn media(&mut self) -> &mut M {
        &mut *self.media
    }

    pub fn erase(&mut self, page: u32) -> StoreResult<()> {
        let retries = self.retries;
        let media = &mut *self.media;
        attempt(CallbackKind::Erase, Some(page), retries, || media.erase(page))
    }

    pub fn write(&mut self, page: u32, data: &[u8]) -> StoreResult<()> {
        let retries = self.retries;
        let media = &mut *self.media;
        attempt(CallbackKind::Write, Some(page), retries, || media.write(page, data))
    }

    pub fn read(&mut self, page: u32, buf: &mut [u8]) -> StoreResult<()> {
        let retries = self.retries;
        let media = &mut *self.media;
        attempt(CallbackKind::Read, Some(page), retries, || media.read(page, buf))
    }

    pub fn crc32(&mut self, seed: u32, data: &[u8]) -> StoreResult<u32> {
        let mut out = 0u32;
        let retries = self.retries;
        let media = &mut *self.media;
        attempt(CallbackKind::Crc, None, retries, || match media.crc32(seed, data) {
            Some(v) => {
                out = v;
                true
            }
            None => false,
        })?;
        Ok(out)
    }
}

fn attempt<F>(kind: CallbackKind, page: Option<u32>, retries: u32, mut op: F) -> StoreResult<()>
where
    F: FnMut() -> bool,
{
    for n in 1..=retries {
        if op() {
            return Ok(());
        }
        if n < retries {
            record_io_retry();
            trace!("io: {} page={:?} attempt {}/{} failed, retrying", kind, page, n, retries);
        }
    }
    record_io_exhausted(kind);
    warn!("io: {} page={:?} failed after {} attempt(s)", kind, page, retries);
    Err(StoreError::Callback {
        kind,
        page,
        attempts: retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MemMedia;

    #[test]
    fn transient_failure_is_absorbed_by_budget() {
        let mut m = MemMedia::new(2, 8);
        m.fail_write_next(0, 2);
        let mut io = RetryIo::new(&mut m, 3);
        io.write(0, &[0u8; 8]).unwrap();
        assert_eq!(m.write_count(0), 3);
    }

    #[test]
    fn exhausted_budget_is_classified() {
        let mut m = MemMedia::new(2, 8);
        m.fail_erase_always(1);
        let mut io = RetryIo::new(&mut m, 4);
        let err = io.erase(1).unwrap_err();
        assert_eq!(
            err,
            StoreError::Callback {
                kind: CallbackKind::Erase,
                page: Some(1),
                attempts: 4
            }
        );
        assert_eq!(m.erase_count(1), 4);
    }

    #[test]
    fn crc_failure_is_classified() {
        let mut m = MemMedia::new(2, 8);
        m.fail_crc_next(5);
        let mut io = RetryIo::new(&mut m, 2);
        let err = io.crc32(0, b"abc").unwrap_err();
        assert_eq!(err.callback_kind(), Some(CallbackKind::Crc));

        let mut m2 = MemMedia::new(2, 8);
        m2.fail_crc_next(1);
        let mut io2 = RetryIo::new(&mut m2, 2);
        assert_eq!(io2.crc32(0, b"abc").unwrap(), crc32fast::hash(b"abc"));
    }

    #[test]
    fn zero_budget_still_attempts_once() {
        let mut m = MemMedia::new(2, 8);
        let mut io = RetryIo::new(&mut m, 0);
        assert_eq!(io.retries(), 1);
        let mut buf = [0u8; 8];
        io.read(0, &mut buf).unwrap();
    }
}
