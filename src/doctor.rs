//! doctor — проверка и ремонт всех пар раскладки halves.
//!
//! - scan()   — только чтение: inspect каждой пары, счётчики состояний и список
//!              проблемных пар (всё, что не InSync/Blank);
//! - repair() — load каждой пары (лечение как побочный эффект) и сводка:
//!              ok / healed / old_version / lost / blank.
//!
//! Отчёты сериализуются в JSON (serde) для `twinpage check --json` / `repair --json`.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::error::{PageStatus, StoreError};
use crate::media::Media;
use crate::page::Expect;
use crate::pager::{PairReport, PairState, PairStore};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorReport {
    pub pairs_total: u32,
    pub in_sync: u32,
    pub diverged: u32,
    pub original_only: u32,
    pub backup_only: u32,
    pub lost: u32,
    pub blank: u32,
    pub old_version: u32,
    /// Pairs that are neither in sync nor blank.
    pub problems: Vec<PairReport>,
}

impl DoctorReport {
    /// Pairs a repair() would rewrite.
    pub fn healable(&self) -> u32 {
        self.diverged + self.original_only + self.backup_only
    }

    /// Nothing to heal and nothing lost.
    pub fn is_clean(&self) -> bool {
        self.healable() == 0 && self.lost == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub pairs_total: u32,
    pub ok: u32,
    pub healed: u32,
    pub old_version: u32,
    pub lost: u32,
    pub blank: u32,
}

/// Inspect every pair without writing.
pub fn scan<M: Media + ?Sized>(store: &mut PairStore<'_, M>, expect: &Expect) -> Result<DoctorReport> {
    let mut rep = DoctorReport {
        pairs_total: store.usable_pages(),
        ..DoctorReport::default()
    };

    for index in 0..rep.pairs_total {
        let pr = store
            .inspect(index, expect)
            .with_context(|| format!("inspect logical page {}", index))?;
        match pr.state {
            PairState::InSync => rep.in_sync += 1,
            PairState::Diverged => rep.diverged += 1,
            PairState::OriginalOnly => rep.original_only += 1,
            PairState::BackupOnly => rep.backup_only += 1,
            PairState::Lost => rep.lost += 1,
            PairState::Blank => rep.blank += 1,
        }
        if pr.old_version {
            rep.old_version += 1;
        }
        if !matches!(pr.state, PairState::InSync | PairState::Blank) {
            rep.problems.push(pr);
        }
    }

    info!(
        "doctor: scan pairs={} in_sync={} healable={} lost={} blank={} old_version={}",
        rep.pairs_total,
        rep.in_sync,
        rep.healable(),
        rep.lost,
        rep.blank,
        rep.old_version
    );
    Ok(rep)
}

/// Load every pair, healing what can be healed.
pub fn repair<M: Media + ?Sized>(store: &mut PairStore<'_, M>, expect: &Expect) -> Result<RepairReport> {
    let mut rep = RepairReport {
        pairs_total: store.usable_pages(),
        ..RepairReport::default()
    };

    for index in 0..rep.pairs_total {
        match store.load(index, expect) {
            Ok(l) => {
                if l.healed {
                    rep.healed += 1;
                } else {
                    rep.ok += 1;
                }
                if l.status == PageStatus::NewVersionFound {
                    rep.old_version += 1;
                }
            }
            Err(StoreError::NotValidPage { .. }) => {
                let pr = store
                    .inspect(index, expect)
                    .with_context(|| format!("inspect logical page {}", index))?;
                if pr.state == PairState::Blank {
                    rep.blank += 1;
                } else {
                    warn!("doctor: logical page {} lost (pair {}, {})", index, pr.original, pr.backup);
                    rep.lost += 1;
                }
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("repair logical page {}", index)));
            }
        }
    }

    info!(
        "doctor: repair pairs={} ok={} healed={} old_version={} lost={} blank={}",
        rep.pairs_total, rep.ok, rep.healed, rep.old_version, rep.lost, rep.blank
    );
    Ok(rep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageSettings;
    use crate::media::MemMedia;
    use crate::page::PageMeta;

    const PS: usize = 48;

    fn damaged() -> (StorageSettings, MemMedia) {
        let s = StorageSettings::new(10, PS);
        let mut m = MemMedia::new(10, PS);
        {
            let (mut w, mut r) = (vec![0u8; PS], vec![0u8; PS]);
            let mut st = PairStore::init(&mut m, &s, &mut w, &mut r).unwrap();
            for i in 0..4 {
                st.payload_mut()[0] = i as u8 + 1;
                st.flush(i, &PageMeta::new(2, 0)).unwrap();
            }
        }
        // pairs: (0,5) (1,6) (2,7) (3,8) (4,9)
        m.corrupt_byte(5, 0, 0x01); // backup of 0
        m.corrupt_byte(1, 0, 0x01); // original of 1
        m.corrupt_byte(2, 0, 0x01); // both of 2
        m.corrupt_byte(7, 0, 0x01);
        (s, m)
    }

    #[test]
    fn scan_counts_without_writing() {
        let (s, mut m) = damaged();
        let writes = m.total_writes();
        let (mut w, mut r) = (vec![0u8; PS], vec![0u8; PS]);
        let mut st = PairStore::init(&mut m, &s, &mut w, &mut r).unwrap();
        let rep = scan(&mut st, &Expect::page(2)).unwrap();
        assert_eq!(rep.pairs_total, 5);
        assert_eq!(rep.in_sync, 1);
        assert_eq!(rep.original_only, 1);
        assert_eq!(rep.backup_only, 1);
        assert_eq!(rep.lost, 1);
        assert_eq!(rep.blank, 1);
        assert_eq!(rep.healable(), 2);
        assert_eq!(rep.problems.len(), 3);
        assert!(!rep.is_clean());
        drop(st);
        assert_eq!(m.total_writes(), writes);
    }

    #[test]
    fn repair_heals_then_scan_is_clean_except_lost() {
        let (s, mut m) = damaged();
        let (mut w, mut r) = (vec![0u8; PS], vec![0u8; PS]);
        let mut st = PairStore::init(&mut m, &s, &mut w, &mut r).unwrap();
        let rep = repair(&mut st, &Expect::page(2)).unwrap();
        assert_eq!(
            rep,
            RepairReport {
                pairs_total: 5,
                ok: 1,
                healed: 2,
                old_version: 0,
                lost: 1,
                blank: 1
            }
        );
        let after = scan(&mut st, &Expect::page(2)).unwrap();
        assert_eq!(after.in_sync, 3);
        assert_eq!(after.healable(), 0);
        assert_eq!(after.lost, 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let (s, mut m) = damaged();
        let (mut w, mut r) = (vec![0u8; PS], vec![0u8; PS]);
        let mut st = PairStore::init(&mut m, &s, &mut w, &mut r).unwrap();
        let rep = scan(&mut st, &Expect::page(2)).unwrap();
        let v = serde_json::to_value(&rep).unwrap();
        assert_eq!(v["lost"], 1);
        assert_eq!(v["problems"][0]["state"], "original_only");
        assert_eq!(v["problems"][0]["backup_state"]["state"], "invalid");
    }
}
