//! blob — один большой объект поверх раскладки halves.
//!
//! Раскладка:
//! - логическая страница 0 — заголовок (PAGE_TYPE_BLOB_HEADER):
//!   fields = [длина, CRC blob’а, число data-страниц, seq];
//! - логические страницы 1.. — данные (PAGE_TYPE_BLOB_DATA):
//!   fields = [длина куска, индекс куска, seq].
//!
//! write(): сначала data-страницы с новым seq, заголовок последним (точка коммита).
//! Прерванная запись оставляет старый заголовок и data-страницы с чужим seq —
//! read() сообщает об этом как о torn blob, а не отдаёт смесь версий.
//! CRC blob’а считается примитивом носителя (store.crc32), цепочкой по кускам.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Serialize;

use crate::consts::{
    BLOB_CRC_SEED, BLOB_DATA_FIELD_CHUNK_LEN, BLOB_DATA_FIELD_INDEX, BLOB_DATA_FIELD_SEQ,
    BLOB_HDR_FIELD_CRC, BLOB_HDR_FIELD_LEN, BLOB_HDR_FIELD_PAGES, BLOB_HDR_FIELD_SEQ,
    PAGE_TYPE_BLOB_DATA, PAGE_TYPE_BLOB_HEADER,
};
use crate::error::PageStatus;
use crate::media::Media;
use crate::page::{Expect, PageMeta};
use crate::pager::PairStore;

/// Header of a committed blob plus the aggregated load status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlobInfo {
    pub status: PageStatus,
    pub len: u32,
    pub crc: u32,
    pub pages: u32,
    pub seq: u32,
    /// Pairs rewritten while reading.
    pub healed: u32,
}

/// Blob consumer owning a pair store.
pub struct BlobStore<'a, M: Media + ?Sized> {
    store: PairStore<'a, M>,
}

impl<'a, M: Media + ?Sized> BlobStore<'a, M> {
    pub fn new(store: PairStore<'a, M>) -> Self {
        Self { store }
    }

    /// Largest blob that fits: every logical page but the header.
    pub fn capacity(&self) -> usize {
        self.data_slots() as usize * self.store.settings().payload_len()
    }

    pub fn store_mut(&mut self) -> &mut PairStore<'a, M> {
        &mut self.store
    }

    pub fn into_inner(self) -> PairStore<'a, M> {
        self.store
    }

    /// Write an empty blob (sequence 0).
    pub fn format(&mut self) -> Result<()> {
        self.commit_header(0, BLOB_CRC_SEED, 0, 0)?;
        info!("blob: formatted, capacity {} bytes", self.capacity());
        Ok(())
    }

    /// Replace the blob. Returns the new sequence number.
    pub fn write(&mut self, data: &[u8]) -> Result<u32> {
        let cap = self.capacity();
        if data.len() > cap {
            bail!("blob of {} bytes exceeds capacity {} bytes", data.len(), cap);
        }
        let seq = match self.header() {
            Ok(h) => h.field(BLOB_HDR_FIELD_SEQ).wrapping_add(1),
            Err(e) => {
                debug!("blob: no readable header ({:#}), starting at seq 1", e);
                1
            }
        };

        let pl = self.store.settings().payload_len();
        let mut crc = BLOB_CRC_SEED;
        let mut pages = 0u32;
        for (i, chunk) in data.chunks(pl).enumerate() {
            let index = i as u32;
            crc = self.store.crc32(crc, chunk).context("blob crc")?;
            let payload = self.store.payload_mut();
            payload.fill(0);
            payload[..chunk.len()].copy_from_slice(chunk);
            let meta = PageMeta::new(PAGE_TYPE_BLOB_DATA, 0)
                .with_field(BLOB_DATA_FIELD_CHUNK_LEN, chunk.len() as u32)
                .with_field(BLOB_DATA_FIELD_INDEX, index)
                .with_field(BLOB_DATA_FIELD_SEQ, seq);
            self.store
                .flush(1 + index, &meta)
                .with_context(|| format!("flush blob data page {}", index))?;
            pages += 1;
        }

        self.commit_header(data.len() as u32, crc, pages, seq)?;
        info!("blob: wrote {} bytes in {} page(s), seq {}", data.len(), pages, seq);
        Ok(seq)
    }

    /// Read and verify the committed blob.
    pub fn read(&mut self) -> Result<(Vec<u8>, BlobInfo)> {
        let hdr_expect = Expect::page(PAGE_TYPE_BLOB_HEADER);
        let hl = self.store.load(0, &hdr_expect).context("load blob header")?;
        let len = hl.meta.field(BLOB_HDR_FIELD_LEN);
        let want_crc = hl.meta.field(BLOB_HDR_FIELD_CRC);
        let pages = hl.meta.field(BLOB_HDR_FIELD_PAGES);
        let seq = hl.meta.field(BLOB_HDR_FIELD_SEQ);

        let pl = self.store.settings().payload_len();
        if pages > self.data_slots() || len as usize > pages as usize * pl {
            bail!(
                "blob header inconsistent: len={} pages={} (data slots {})",
                len,
                pages,
                self.data_slots()
            );
        }

        let mut status = hl.status;
        let mut healed = u32::from(hl.healed);
        let mut out = Vec::with_capacity(len as usize);
        let mut crc = BLOB_CRC_SEED;
        let data_expect = Expect::page(PAGE_TYPE_BLOB_DATA);

        for index in 0..pages {
            let l = self
                .store
                .load(1 + index, &data_expect)
                .with_context(|| format!("load blob data page {}", index))?;
            let page_seq = l.meta.field(BLOB_DATA_FIELD_SEQ);
            if page_seq != seq {
                bail!(
                    "torn blob: data page {} has seq {}, header seq {}",
                    index,
                    page_seq,
                    seq
                );
            }
            if l.meta.field(BLOB_DATA_FIELD_INDEX) != index {
                bail!(
                    "blob data page {} carries index {}",
                    index,
                    l.meta.field(BLOB_DATA_FIELD_INDEX)
                );
            }
            let chunk_len = l.meta.field(BLOB_DATA_FIELD_CHUNK_LEN) as usize;
            if chunk_len > pl {
                bail!("blob data page {} chunk length {} > payload {}", index, chunk_len, pl);
            }
            status = status.worst(l.status);
            healed += u32::from(l.healed);

            let start = out.len();
            out.extend_from_slice(&self.store.payload()[..chunk_len]);
            crc = self.store.crc32(crc, &out[start..]).context("blob crc")?;
        }

        if out.len() != len as usize {
            bail!("blob length {} does not match header length {}", out.len(), len);
        }
        if crc != want_crc {
            bail!("blob crc mismatch: computed {:08x}, header {:08x}", crc, want_crc);
        }

        debug!("blob: read {} bytes, seq {}, status {}", len, seq, status);
        Ok((
            out,
            BlobInfo {
                status,
                len,
                crc,
                pages,
                seq,
                healed,
            },
        ))
    }

    // ---------- helpers ----------

    fn data_slots(&self) -> u32 {
        self.store.usable_pages().saturating_sub(1)
    }

    fn header(&mut self) -> Result<PageMeta> {
        let l = self.store.load(0, &Expect::page(PAGE_TYPE_BLOB_HEADER))?;
        Ok(l.meta)
    }

    fn commit_header(&mut self, len: u32, crc: u32, pages: u32, seq: u32) -> Result<()> {
        self.store.payload_mut().fill(0);
        let meta = PageMeta::new(PAGE_TYPE_BLOB_HEADER, 0)
            .with_field(BLOB_HDR_FIELD_LEN, len)
            .with_field(BLOB_HDR_FIELD_CRC, crc)
            .with_field(BLOB_HDR_FIELD_PAGES, pages)
            .with_field(BLOB_HDR_FIELD_SEQ, seq);
        self.store.flush(0, &meta).context("flush blob header")?;
        Ok(())
    }
}
