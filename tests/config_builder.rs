// tests/config_builder.rs
//
// StorageSettings: дефолты, ENV-слой (TP_*) и builder с валидацией.
// Все обращения к ENV — в одном тесте, чтобы не гоняться с параллельными тестами.

use anyhow::Result;

use TwinPage::{Endian, SettingsBuilder, StorageSettings, StoreError, TRAILER_LEN};

#[test]
fn env_defaults_and_overrides() -> Result<()> {
    std::env::set_var("TP_PAGE_LEN", "128");
    std::env::set_var("TP_TOTAL_PAGES", "10");
    std::env::set_var("TP_FORMAT_VERSION", "4");
    std::env::set_var("TP_RETRY_COUNT", "2");
    std::env::set_var("TP_BIG_ENDIAN", "yes");

    let s = StorageSettings::from_env();
    assert_eq!(s.page_len, 128);
    assert_eq!(s.total_pages, 10);
    assert_eq!(s.version, 4);
    assert_eq!(s.retry_count, 2);
    assert_eq!(s.endian, Endian::Big);

    // флаги CLI перекрывают ENV
    let s = SettingsBuilder::from_env().total_pages(12).endian(Endian::Little).build()?;
    assert_eq!(s.total_pages, 12);
    assert_eq!(s.page_len, 128);
    assert_eq!(s.endian, Endian::Little);

    // мусор в ENV игнорируется
    std::env::set_var("TP_PAGE_LEN", "lots");
    std::env::set_var("TP_BIG_ENDIAN", "0");
    let s = StorageSettings::from_env();
    assert_eq!(s.page_len, StorageSettings::default().page_len);
    assert_eq!(s.endian, Endian::Little);

    for k in [
        "TP_PAGE_LEN",
        "TP_TOTAL_PAGES",
        "TP_FORMAT_VERSION",
        "TP_RETRY_COUNT",
        "TP_BIG_ENDIAN",
    ] {
        std::env::remove_var(k);
    }
    Ok(())
}

#[test]
fn builder_rejects_incoherent_geometry() {
    let err = StorageSettings::builder().page_len(TRAILER_LEN).build().unwrap_err();
    assert!(matches!(err, StoreError::BadParam(_)));
    let err = StorageSettings::builder().total_pages(7).build().unwrap_err();
    assert!(matches!(err, StoreError::BadParam(_)));
    let s = StorageSettings::builder()
        .total_pages(4)
        .page_len(TRAILER_LEN + 2)
        .build()
        .unwrap();
    assert_eq!(s.payload_len(), 2);
    assert_eq!(s.half(), 2);
    assert_eq!(s.media_bytes(), 4 * (TRAILER_LEN as u64 + 2));
}

#[test]
fn settings_display_and_json() -> Result<()> {
    let s = StorageSettings::new(6, 64).with_endian(Endian::Big);
    let text = s.to_string();
    assert!(text.contains("total_pages: 6"), "{text}");
    assert!(text.contains("endian: big"), "{text}");
    let v = serde_json::to_value(&s)?;
    assert_eq!(v["endian"], "big");
    let back: StorageSettings = serde_json::from_value(v)?;
    assert_eq!(back, s);
    Ok(())
}
