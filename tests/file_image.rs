// tests/file_image.rs
//
// Файловый образ end-to-end:
// - PairStore поверх FileMedia переживает переоткрытие;
// - blob через команды CLI (init/put/get) и лечение после corrupt;
// - check (без записи) и repair;
// - блокировки: второй writer отклоняется, read-only открытия сосуществуют.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use TwinPage::cli::{
    check_image, corrupt_slot, dump_slot, get_bytes, init_image, put_bytes, repair_image,
};
use TwinPage::lock::lock_file_path;
use TwinPage::media::file::sidecar_path;
use TwinPage::{
    Endian, Expect, FileMedia, PageMeta, PageStatus, PairStore, StorageSettings, PAGE_MAGIC,
    TRAILER_LEN,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("twptest-{prefix}-{pid}-{t}-{id}"))
}

fn image_in(root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(root)?;
    Ok(root.join("disk.img"))
}

#[test]
fn pair_store_over_file_survives_reopen() -> Result<()> {
    let root = unique_root("reopen");
    let img = image_in(&root)?;
    let s = StorageSettings::new(8, 96).with_endian(Endian::Big);

    {
        let mut media = FileMedia::create(&img, &s)?;
        media.set_data_fsync(false);
        let (mut w, mut r) = (vec![0u8; 96], vec![0u8; 96]);
        let mut st = PairStore::init(&mut media, &s, &mut w, &mut r)?;
        st.payload_mut()[..5].copy_from_slice(b"hello");
        st.flush(3, &PageMeta::new(9, 1))?;
    }
    assert!(sidecar_path(&img).exists());

    {
        let mut media = FileMedia::open(&img)?;
        let settings = media.settings().clone();
        assert_eq!(settings, s);
        let (mut w, mut r) = (vec![0u8; 96], vec![0u8; 96]);
        let mut st = PairStore::init(&mut media, &settings, &mut w, &mut r)?;
        let l = st.load(3, &Expect::page(9).sub_type(1))?;
        assert_eq!(l.status, PageStatus::Ok);
        assert_eq!(&st.payload()[..5], b"hello");
    }

    // big-endian magic в последних байтах трейлера
    let raw = dump_slot(&img, 3)?;
    let t = 96 - TRAILER_LEN;
    assert_eq!(&raw[t + 20..t + 24], &PAGE_MAGIC.to_be_bytes());

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn cli_blob_roundtrip_and_healing() -> Result<()> {
    let root = unique_root("blob");
    let img = image_in(&root)?;
    let s = StorageSettings::new(16, 64);
    let cap = init_image(&img, &s)?;
    assert_eq!(cap, 7 * (64 - TRAILER_LEN));

    let data: Vec<u8> = (0..100u32).map(|i| (i * 7) as u8).collect();
    assert_eq!(put_bytes(&img, &data)?, 1);
    let (got, info) = get_bytes(&img)?;
    assert_eq!(got, data);
    assert_eq!(info.status, PageStatus::Ok);
    assert_eq!(info.pages, 3);

    // backup заголовка (8) и original data-страницы 1 (2)
    corrupt_slot(&img, 8, 0, 0x40)?;
    corrupt_slot(&img, 2, 10, 0x01)?;

    let rep = check_image(&img)?;
    assert_eq!(rep.original_only, 1);
    assert_eq!(rep.backup_only, 1);
    assert_eq!(rep.lost, 0);

    let (got, info) = get_bytes(&img)?;
    assert_eq!(got, data);
    assert_eq!(info.status, PageStatus::BackupRecovered);
    assert_eq!(info.healed, 2);

    let rep = check_image(&img)?;
    assert!(rep.is_clean());
    assert_eq!(rep.in_sync, 4);
    assert_eq!(rep.blank, 4);

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn cli_repair_and_lost_pairs() -> Result<()> {
    let root = unique_root("repair");
    let img = image_in(&root)?;
    let s = StorageSettings::new(8, 64);
    init_image(&img, &s)?;
    put_bytes(&img, b"twinpage")?;

    // пара (1, 5): data-страница 0 — ломаем обе стороны; пара (0, 4) — только original
    corrupt_slot(&img, 1, 0, 0x01)?;
    corrupt_slot(&img, 5, 0, 0x01)?;
    corrupt_slot(&img, 0, 0, 0x01)?;

    let rep = repair_image(&img)?;
    assert_eq!(rep.pairs_total, 4);
    assert_eq!(rep.healed, 1);
    assert_eq!(rep.lost, 1);
    assert_eq!(rep.blank, 2);

    let err = get_bytes(&img).unwrap_err();
    assert!(format!("{err:#}").contains("load blob data page 0"), "{err:#}");

    // новая запись перезаписывает потерянную пару
    put_bytes(&img, b"again")?;
    assert_eq!(get_bytes(&img)?.0, b"again");

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn second_writer_is_refused() -> Result<()> {
    let root = unique_root("lock");
    let img = image_in(&root)?;
    let s = StorageSettings::new(4, 64);
    let writer = FileMedia::create(&img, &s)?;
    assert!(FileMedia::open(&img).is_err());
    assert!(FileMedia::open_ro(&img).is_err());
    assert!(lock_file_path(&img).exists());
    drop(writer);

    let r1 = FileMedia::open_ro(&img)?;
    let r2 = FileMedia::open_ro(&img)?;
    assert!(r1.is_read_only() && r2.is_read_only());
    assert!(FileMedia::open(&img).is_err());
    drop((r1, r2));

    assert!(FileMedia::open(&img).is_ok());
    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn init_refuses_existing_image_and_bad_geometry() -> Result<()> {
    let root = unique_root("init");
    let img = image_in(&root)?;
    assert!(init_image(&img, &StorageSettings::new(3, 64)).is_err());
    init_image(&img, &StorageSettings::new(4, 64))?;
    assert!(init_image(&img, &StorageSettings::new(4, 64)).is_err());
    fs::remove_dir_all(&root)?;
    Ok(())
}
