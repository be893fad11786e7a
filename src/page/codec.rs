//! page/codec — сериализация трейлера страницы (PageMeta <-> байты).
//!
//! write_trailer() пишет все поля, кроме CRC; CRC ставит checksum::seal()
//! последним шагом. read_trailer() — точная инверсия, без ошибок для буфера
//! длиной >= TRAILER_LEN.

use serde::Serialize;

use crate::config::Endian;

use super::common::{
    trailer_start, FIELD_COUNT, OFF_CRC, OFF_FIELDS, OFF_MAGIC, OFF_PAGE_TYPE, OFF_SUB_TYPE,
    OFF_VERSION, PAGE_MAGIC, TRAILER_LEN,
};

/// Decoded page trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PageMeta {
    pub page_type: u8,
    pub sub_type: u8,
    pub version: u16,
    /// Consumer-defined fields (payload length, payload CRC, sequence number, ...).
    pub fields: [u32; FIELD_COUNT],
    pub magic: u32,
    pub crc: u32,
}

impl PageMeta {
    /// Fresh metadata with the format magic; version and CRC are filled on flush.
    pub fn new(page_type: u8, sub_type: u8) -> Self {
        Self {
            page_type,
            sub_type,
            version: 0,
            fields: [0; FIELD_COUNT],
            magic: PAGE_MAGIC,
            crc: 0,
        }
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Set consumer field `i` (0..4).
    pub fn with_field(mut self, i: usize, v: u32) -> Self {
        self.fields[i] = v;
        self
    }

    #[inline]
    pub fn field(&self, i: usize) -> u32 {
        self.fields[i]
    }
}

/// Write every trailer field except the CRC, which is zeroed.
///
/// # Panics
/// If `page` is shorter than the trailer.
pub fn write_trailer(page: &mut [u8], meta: &PageMeta, endian: Endian) {
    let t = trailer_start(page.len());
    let tr = &mut page[t..t + TRAILER_LEN];

    for (i, v) in meta.fields.iter().enumerate() {
        let off = OFF_FIELDS + i * 4;
        endian.write_u32(&mut tr[off..off + 4], *v);
    }
    tr[OFF_SUB_TYPE] = meta.sub_type;
    tr[OFF_PAGE_TYPE] = meta.page_type;
    endian.write_u16(&mut tr[OFF_VERSION..OFF_VERSION + 2], meta.version);
    endian.write_u32(&mut tr[OFF_MAGIC..OFF_MAGIC + 4], meta.magic);
    endian.write_u32(&mut tr[OFF_CRC..OFF_CRC + 4], 0);
}

/// Decode the trailer of a page.
///
/// # Panics
/// If `page` is shorter than the trailer.
pub fn read_trailer(page: &[u8], endian: Endian) -> PageMeta {
    let t = trailer_start(page.len());
    let tr = &page[t..t + TRAILER_LEN];

    let mut fields = [0u32; FIELD_COUNT];
    for (i, f) in fields.iter_mut().enumerate() {
        let off = OFF_FIELDS + i * 4;
        *f = endian.read_u32(&tr[off..off + 4]);
    }
    PageMeta {
        page_type: tr[OFF_PAGE_TYPE],
        sub_type: tr[OFF_SUB_TYPE],
        version: endian.read_u16(&tr[OFF_VERSION..OFF_VERSION + 2]),
        fields,
        magic: endian.read_u32(&tr[OFF_MAGIC..OFF_MAGIC + 4]),
        crc: endian.read_u32(&tr[OFF_CRC..OFF_CRC + 4]),
    }
}

/// Store a computed CRC into the trailer.
#[inline]
pub(crate) fn store_crc(page: &mut [u8], crc: u32, endian: Endian) {
    let off = trailer_start(page.len()) + OFF_CRC;
    endian.write_u32(&mut page[off..off + 4], crc);
}

/// Stored CRC value (no verification).
#[inline]
pub fn stored_crc(page: &[u8], endian: Endian) -> u32 {
    let off = trailer_start(page.len()) + OFF_CRC;
    endian.read_u32(&page[off..off + 4])
}
