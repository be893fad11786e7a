//! page — формат страницы: payload ‖ фиксированный 28-байтовый трейлер.
//!
//! Разделение по подмодулям:
//! - common.rs   — MAGIC, seed CRC, размер трейлера и offset’ы полей.
//! - codec.rs    — PageMeta и (де)сериализация трейлера с выбранным порядком байт.
//! - checksum.rs — seal() (CRC пишется последним) и предикат валидности.

pub mod checksum;
pub mod codec;
pub mod common;

// ---------------- re-exports (внешний API модуля page) ----------------

pub use common::{CRC_SEED, FIELD_COUNT, PAGE_MAGIC, TRAILER_LEN};

pub use codec::{read_trailer, stored_crc, write_trailer, PageMeta};

pub use checksum::{is_valid, page_crc, seal, validate, Expect, Verdict};
