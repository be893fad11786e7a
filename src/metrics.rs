//! Lightweight global metrics for TwinPage.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - Retrying I/O (повторы и исчерпанные бюджеты по примитивам)
//! - Pair engine (load/flush, лечение пар, readback mismatch, потерянные пары)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CallbackKind;

// ----- Retrying I/O -----
static IO_RETRIES: AtomicU64 = AtomicU64::new(0);
static IO_ERASE_FAILURES: AtomicU64 = AtomicU64::new(0);
static IO_WRITE_FAILURES: AtomicU64 = AtomicU64::new(0);
static IO_READ_FAILURES: AtomicU64 = AtomicU64::new(0);
static IO_CRC_FAILURES: AtomicU64 = AtomicU64::new(0);

// ----- Pair engine -----
static PAGES_LOADED: AtomicU64 = AtomicU64::new(0);
static PAGES_FLUSHED: AtomicU64 = AtomicU64::new(0);
static BACKUP_HEALS: AtomicU64 = AtomicU64::new(0);
static ORIGINAL_HEALS: AtomicU64 = AtomicU64::new(0);
static VERIFY_MISMATCHES: AtomicU64 = AtomicU64::new(0);
static PAIRS_LOST: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    // Retrying I/O
    pub io_retries: u64,
    pub io_erase_failures: u64,
    pub io_write_failures: u64,
    pub io_read_failures: u64,
    pub io_crc_failures: u64,

    // Pair engine
    pub pages_loaded: u64,
    pub pages_flushed: u64,
    pub backup_heals: u64,
    pub original_heals: u64,
    pub verify_mismatches: u64,
    pub pairs_lost: u64,
}

impl MetricsSnapshot {
    pub fn heals_total(&self) -> u64 {
        self.backup_heals + self.original_heals
    }

    pub fn io_failures_total(&self) -> u64 {
        self.io_erase_failures + self.io_write_failures + self.io_read_failures + self.io_crc_failures
    }
}

// ----- Recorders (Retrying I/O) -----
pub fn record_io_retry() {
    IO_RETRIES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_io_exhausted(kind: CallbackKind) {
    let c = match kind {
        CallbackKind::Erase => &IO_ERASE_FAILURES,
        CallbackKind::Write => &IO_WRITE_FAILURES,
        CallbackKind::Read => &IO_READ_FAILURES,
        CallbackKind::Crc => &IO_CRC_FAILURES,
    };
    c.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Pair engine) -----
pub fn record_page_loaded() {
    PAGES_LOADED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_page_flushed() {
    PAGES_FLUSHED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_backup_heal() {
    BACKUP_HEALS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_original_heal() {
    ORIGINAL_HEALS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_verify_mismatch() {
    VERIFY_MISMATCHES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_pair_lost() {
    PAIRS_LOST.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        io_retries: IO_RETRIES.load(Ordering::Relaxed),
        io_erase_failures: IO_ERASE_FAILURES.load(Ordering::Relaxed),
        io_write_failures: IO_WRITE_FAILURES.load(Ordering::Relaxed),
        io_read_failures: IO_READ_FAILURES.load(Ordering::Relaxed),
        io_crc_failures: IO_CRC_FAILURES.load(Ordering::Relaxed),

        pages_loaded: PAGES_LOADED.load(Ordering::Relaxed),
        pages_flushed: PAGES_FLUSHED.load(Ordering::Relaxed),
        backup_heals: BACKUP_HEALS.load(Ordering::Relaxed),
        original_heals: ORIGINAL_HEALS.load(Ordering::Relaxed),
        verify_mismatches: VERIFY_MISMATCHES.load(Ordering::Relaxed),
        pairs_lost: PAIRS_LOST.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    IO_RETRIES.store(0, Ordering::Relaxed);
    IO_ERASE_FAILURES.store(0, Ordering::Relaxed);
    IO_WRITE_FAILURES.store(0, Ordering::Relaxed);
    IO_READ_FAILURES.store(0, Ordering::Relaxed);
    IO_CRC_FAILURES.store(0, Ordering::Relaxed);

    PAGES_LOADED.store(0, Ordering::Relaxed);
    PAGES_FLUSHED.store(0, Ordering::Relaxed);
    BACKUP_HEALS.store(0, Ordering::Relaxed);
    ORIGINAL_HEALS.store(0, Ordering::Relaxed);
    VERIFY_MISMATCHES.store(0, Ordering::Relaxed);
    PAIRS_LOST.store(0, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Counters are process-wide and tests run in parallel: assert on deltas only.
    #[test]
    fn recorders_increase_counters() {
        let before = snapshot();
        record_io_retry();
        record_io_exhausted(CallbackKind::Crc);
        record_backup_heal();
        record_original_heal();
        let after = snapshot();
        assert!(after.io_retries >= before.io_retries + 1);
        assert!(after.io_crc_failures >= before.io_crc_failures + 1);
        assert!(after.heals_total() >= before.heals_total() + 2);
    }
}
