//! Общие константы форматов (образ носителя, blob-потребитель).
//!
//! Константы трейлера страницы живут в page::common.

// -------- Media image --------
/// Magic in the `<image>.json` sidecar.
pub const IMAGE_MAGIC: &str = "TWPGIMG1";
/// Value of every byte of an erased page (NOR flash).
pub const ERASED_BYTE: u8 = 0xFF;

// -------- Blob store (consumer) --------
/// Header page of the blob store (logical page 0).
pub const PAGE_TYPE_BLOB_HEADER: u8 = 0xB0;
/// Data page of the blob store (logical pages 1..).
pub const PAGE_TYPE_BLOB_DATA: u8 = 0xB1;

// Header page fields
pub const BLOB_HDR_FIELD_LEN: usize = 0;
pub const BLOB_HDR_FIELD_CRC: usize = 1;
pub const BLOB_HDR_FIELD_PAGES: usize = 2;
pub const BLOB_HDR_FIELD_SEQ: usize = 3;

// Data page fields
pub const BLOB_DATA_FIELD_CHUNK_LEN: usize = 0;
pub const BLOB_DATA_FIELD_INDEX: usize = 1;
pub const BLOB_DATA_FIELD_SEQ: usize = 2;

/// Seed of the whole-blob CRC (chained across data pages).
pub const BLOB_CRC_SEED: u32 = 0;
