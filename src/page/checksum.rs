//! page/checksum — CRC трейлера и предикат валидности страницы.
//!
//! CRC режим (единственный): crc32(seed = 0xFFFF_FFFF, page[0 .. page_len-4]).
//! Поле CRC — последние 4 байта страницы, поэтому в расчёт не входит.
//! CRC считает примитив носителя через RetryIo: отказ примитива — ошибка
//! Callback{Crc}, а не «невалидная страница».
//!
//! Порядок проверок validate():
//!   magic → page_type → sub_type → CRC.
//! Версия страницы валидность не определяет (см. pager::load, NewVersionFound).

use serde::Serialize;

use crate::config::Endian;
use crate::error::StoreResult;
use crate::media::Media;
use crate::pager::io::RetryIo;

use super::codec::{read_trailer, store_crc, write_trailer, PageMeta};
use super::common::{crc_span, CRC_SEED, PAGE_MAGIC};

/// Constraints a freshly read page must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Expect {
    /// Required page type (None = any).
    pub page_type: Option<u8>,
    /// Required sub type (None = any).
    pub sub_type: Option<u8>,
    /// Expected format version (None = the store's configured version).
    pub version: Option<u16>,
}

impl Expect {
    /// Any structurally valid page.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn page(page_type: u8) -> Self {
        Self {
            page_type: Some(page_type),
            ..Self::default()
        }
    }

    pub fn sub_type(mut self, sub_type: u8) -> Self {
        self.sub_type = Some(sub_type);
        self
    }

    pub fn version(mut self, version: u16) -> Self {
        self.version = Some(version);
        self
    }
}

/// Outcome of the validity predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    BadMagic,
    TypeMismatch,
    SubTypeMismatch,
    CrcMismatch,
}

impl Verdict {
    #[inline]
    pub fn is_valid(self) -> bool {
        self == Verdict::Valid
    }
}

/// CRC of a page as the trailer stores it.
pub fn page_crc<M: Media + ?Sized>(io: &mut RetryIo<'_, M>, page: &[u8]) -> StoreResult<u32> {
    io.crc32(CRC_SEED, &page[..crc_span(page.len())])
}

/// Encode `meta` into the trailer and seal it with the page CRC (written last).
///
/// Returns the metadata as stored, CRC included.
pub fn seal<M: Media + ?Sized>(
    io: &mut RetryIo<'_, M>,
    page: &mut [u8],
    meta: &PageMeta,
    endian: Endian,
) -> StoreResult<PageMeta> {
    write_trailer(page, meta, endian);
    let crc = page_crc(io, page)?;
    store_crc(page, crc, endian);
    Ok(PageMeta { crc, ..*meta })
}

/// Validity predicate: magic, type constraints, CRC.
pub fn validate<M: Media + ?Sized>(
    io: &mut RetryIo<'_, M>,
    page: &[u8],
    expect: &Expect,
    endian: Endian,
) -> StoreResult<Verdict> {
    let meta = read_trailer(page, endian);

    if meta.magic != PAGE_MAGIC {
        return Ok(Verdict::BadMagic);
    }
    if let Some(t) = expect.page_type {
        if meta.page_type != t {
            return Ok(Verdict::TypeMismatch);
        }
    }
    if let Some(s) = expect.sub_type {
        if meta.sub_type != s {
            return Ok(Verdict::SubTypeMismatch);
        }
    }
    let calc = page_crc(io, page)?;
    if calc != meta.crc {
        return Ok(Verdict::CrcMismatch);
    }
    Ok(Verdict::Valid)
}

/// Boolean form of validate().
pub fn is_valid<M: Media + ?Sized>(
    io: &mut RetryIo<'_, M>,
    page: &[u8],
    expect: &Expect,
    endian: Endian,
) -> StoreResult<bool> {
    Ok(validate(io, page, expect, endian)?.is_valid())
}
