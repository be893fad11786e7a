// tests/bit_flips.rs
//
// Рандомизированные повреждения (oorandom, фиксированный seed):
// - один перевёрнутый бит в любом месте одного слота всегда лечится из второго;
// - по биту в обоих слотах → NotValidPage, носитель не меняется.

use anyhow::Result;
use oorandom::Rand64;

use TwinPage::{Expect, MemMedia, PageMeta, PageStatus, PairStore, StorageSettings, StoreError};

const PAGES: u32 = 8;
const PS: usize = 64;
const TYPE: u8 = 0x21;

fn fill_random(rng: &mut Rand64, buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = rng.rand_u64() as u8;
    }
}

#[test]
fn any_single_bit_flip_is_healed() -> Result<()> {
    let s = StorageSettings::new(PAGES, PS);
    let mut m = MemMedia::new(PAGES, PS);
    let (mut w, mut r) = (vec![0u8; PS], vec![0u8; PS]);
    let mut st = PairStore::init(&mut m, &s, &mut w, &mut r)?;
    let mut rng = Rand64::new(0x5457_5047);
    let half = st.usable_pages();

    for round in 0..300u32 {
        let index = rng.rand_range(0..half as u64) as u32;
        let mut payload = vec![0u8; s.payload_len()];
        fill_random(&mut rng, &mut payload);
        st.payload_mut().copy_from_slice(&payload);
        st.flush(index, &PageMeta::new(TYPE, 0).with_field(0, round))?;

        let (original, backup) = st.pair_of(index)?;
        let victim = if rng.rand_u64() & 1 == 0 { original } else { backup };
        let byte = rng.rand_range(0..PS as u64) as usize;
        let bit = rng.rand_range(0..8) as u8;
        st.media().corrupt_byte(victim, byte, 1 << bit);

        st.payload_mut().fill(0);
        let l = st.load(index, &Expect::page(TYPE))?;
        assert_eq!(
            l.status,
            PageStatus::BackupRecovered,
            "round {round}: slot {victim} byte {byte} bit {bit}"
        );
        assert_eq!(l.meta.field(0), round);
        assert_eq!(st.payload(), &payload[..]);
        assert!(st.are_equal(original, backup)?);
    }
    Ok(())
}

#[test]
fn flips_in_both_slots_are_unrecoverable() -> Result<()> {
    let s = StorageSettings::new(PAGES, PS);
    let mut m = MemMedia::new(PAGES, PS);
    let (mut w, mut r) = (vec![0u8; PS], vec![0u8; PS]);
    let mut st = PairStore::init(&mut m, &s, &mut w, &mut r)?;
    let mut rng = Rand64::new(7);

    for _ in 0..50 {
        let index = rng.rand_range(0..st.usable_pages() as u64) as u32;
        st.flush(index, &PageMeta::new(TYPE, 0))?;
        let (original, backup) = st.pair_of(index)?;
        for slot in [original, backup] {
            let byte = rng.rand_range(0..PS as u64) as usize;
            let bit = rng.rand_range(0..8) as u8;
            st.media().corrupt_byte(slot, byte, 1 << bit);
        }
        let writes = st.media().total_writes();
        let err = st.load(index, &Expect::page(TYPE)).unwrap_err();
        assert_eq!(err, StoreError::NotValidPage { original, backup });
        assert_eq!(st.media().total_writes(), writes);
    }
    Ok(())
}
