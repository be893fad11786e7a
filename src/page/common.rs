//! page/common — константы трейлера страницы и offset’ы полей.
//!
//! Трейлер лежит в конце страницы (T = page_len - TRAILER_LEN):
//!   [T+0 ..T+16) field[0..4] u32
//!   [T+16]       sub_type u8
//!   [T+17]       page_type u8
//!   [T+18..T+20) version u16
//!   [T+20..T+24) magic u32
//!   [T+24..T+28) crc u32 — CRC32 по [0 .. page_len-4)

/// Magic number proving the trailer was written by this format ("TWPG").
pub const PAGE_MAGIC: u32 = 0x5457_5047;

/// Seed passed to the crc32 primitive.
pub const CRC_SEED: u32 = 0xFFFF_FFFF;

/// Number of consumer-defined u32 fields in the trailer.
pub const FIELD_COUNT: usize = 4;

/// Fixed trailer size in bytes.
pub const TRAILER_LEN: usize = 28;

// ---------- offsets relative to the trailer start ----------
pub const OFF_FIELDS: usize = 0;
pub const OFF_SUB_TYPE: usize = 16;
pub const OFF_PAGE_TYPE: usize = 17;
pub const OFF_VERSION: usize = 18;
pub const OFF_MAGIC: usize = 20;
pub const OFF_CRC: usize = 24;

/// Start of the trailer inside a page of `page_len` bytes.
#[inline]
pub fn trailer_start(page_len: usize) -> usize {
    page_len - TRAILER_LEN
}

/// Span covered by the page CRC (everything except the CRC field itself).
#[inline]
pub fn crc_span(page_len: usize) -> usize {
    page_len - 4
}
