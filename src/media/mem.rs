//! media/mem — RAM-эмуляция NOR-флеша.
//!
//! Семантика:
//! - erase(page) заполняет страницу 0xFF;
//! - write(page, data) может только сбрасывать биты (AND), как настоящий NOR:
//!   запись без стирания видна при readback;
//! - read(page, buf) копирует страницу.
//!
//! Инъекция отказов (для тестов и учений):
//! - fail_*_always(page) / fail_*_next(page, n) — примитив возвращает false;
//! - corrupt_writes(page) — write() отвечает true, но пишет данные с инвертированным байтом 0;
//! - corrupt_byte(page, off, xor) — прямая порча хранимого байта;
//! - счётчики erase/write по страницам.

use std::collections::HashMap;

use crate::consts::ERASED_BYTE as ERASED;

use super::Media;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Erase,
    Write,
    Read,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Always,
    Next(u32),
}

/// RAM-backed NOR flash with fault injection.
#[derive(Debug, Clone)]
pub struct MemMedia {
    page_len: usize,
    data: Vec<u8>,
    faults: HashMap<(Op, u32), Fault>,
    silent_corrupt: HashMap<u32, bool>,
    crc_fail_next: u32,
    erase_calls: Vec<u64>,
    write_calls: Vec<u64>,
}

impl MemMedia {
    /// Fresh media, every page erased.
    pub fn new(total_pages: u32, page_len: usize) -> Self {
        Self {
            page_len,
            data: vec![ERASED; total_pages as usize * page_len],
            faults: HashMap::new(),
            silent_corrupt: HashMap::new(),
            crc_fail_next: 0,
            erase_calls: vec![0; total_pages as usize],
            write_calls: vec![0; total_pages as usize],
        }
    }

    #[inline]
    pub fn total_pages(&self) -> u32 {
        // page_len 0 → пустой носитель, все примитивы отказывают
        self.data.len().checked_div(self.page_len).unwrap_or(0) as u32
    }

    #[inline]
    pub fn page_len(&self) -> usize {
        self.page_len
    }

    /// Raw view of a stored page.
    pub fn page(&self, page: u32) -> &[u8] {
        let off = page as usize * self.page_len;
        &self.data[off..off + self.page_len]
    }

    /// Raw mutable view of a stored page (bypasses flash semantics).
    pub fn page_mut(&mut self, page: u32) -> &mut [u8] {
        let off = page as usize * self.page_len;
        &mut self.data[off..off + self.page_len]
    }

    /// Whole media image.
    pub fn image(&self) -> &[u8] {
        &self.data
    }

    /// Flip bits of one stored byte.
    pub fn corrupt_byte(&mut self, page: u32, offset: usize, xor: u8) {
        self.page_mut(page)[offset] ^= xor;
    }

    pub fn fail_erase_always(&mut self, page: u32) {
        self.faults.insert((Op::Erase, page), Fault::Always);
    }

    pub fn fail_write_always(&mut self, page: u32) {
        self.faults.insert((Op::Write, page), Fault::Always);
    }

    pub fn fail_read_always(&mut self, page: u32) {
        self.faults.insert((Op::Read, page), Fault::Always);
    }

    pub fn fail_erase_next(&mut self, page: u32, n: u32) {
        self.faults.insert((Op::Erase, page), Fault::Next(n));
    }

    pub fn fail_write_next(&mut self, page: u32, n: u32) {
        self.faults.insert((Op::Write, page), Fault::Next(n));
    }

    pub fn fail_read_next(&mut self, page: u32, n: u32) {
        self.faults.insert((Op::Read, page), Fault::Next(n));
    }

    /// Fail the next `n` crc32 calls.
    pub fn fail_crc_next(&mut self, n: u32) {
        self.crc_fail_next = n;
    }

    /// write() on `page` reports success but stores damaged data.
    pub fn corrupt_writes(&mut self, page: u32) {
        self.silent_corrupt.insert(page, true);
    }

    /// Drop every injected fault.
    pub fn heal_all(&mut self) {
        self.faults.clear();
        self.silent_corrupt.clear();
        self.crc_fail_next = 0;
    }

    pub fn erase_count(&self, page: u32) -> u64 {
        self.erase_calls[page as usize]
    }

    pub fn write_count(&self, page: u32) -> u64 {
        self.write_calls[page as usize]
    }

    /// Total write calls across all pages.
    pub fn total_writes(&self) -> u64 {
        self.write_calls.iter().sum()
    }

    fn in_range(&self, page: u32, len: usize) -> bool {
        page < self.total_pages() && len == self.page_len
    }

    /// Consume an injected fault; true = this call must fail.
    fn should_fail(&mut self, op: Op, page: u32) -> bool {
        let key = (op, page);
        let (fail, expired) = match self.faults.get_mut(&key) {
            Some(Fault::Always) => (true, false),
            Some(Fault::Next(n)) => {
                if *n == 0 {
                    (false, true)
                } else {
                    *n -= 1;
                    (true, *n == 0)
                }
            }
            None => (false, false),
        };
        if expired {
            self.faults.remove(&key);
        }
        fail
    }
}

impl Media for MemMedia {
    fn erase(&mut self, page: u32) -> bool {
        if !self.in_range(page, self.page_len) {
            return false;
        }
        self.erase_calls[page as usize] += 1;
        if self.should_fail(Op::Erase, page) {
            return false;
        }
        self.page_mut(page).fill(ERASED);
        true
    }

    fn write(&mut self, page: u32, data: &[u8]) -> bool {
        if !self.in_range(page, data.len()) {
            return false;
        }
        self.write_calls[page as usize] += 1;
        if self.should_fail(Op::Write, page) {
            return false;
        }
        let corrupt = self.silent_corrupt.get(&page).copied().unwrap_or(false);
        let dst = self.page_mut(page);
        for (d, s) in dst.iter_mut().zip(data.iter()) {
            *d &= *s;
        }
        if corrupt {
            dst[0] ^= 0x01;
        }
        true
    }

    fn read(&mut self, page: u32, buf: &mut [u8]) -> bool {
        if !self.in_range(page, buf.len()) {
            return false;
        }
        if self.should_fail(Op::Read, page) {
            return false;
        }
        buf.copy_from_slice(self.page(page));
        true
    }

    fn crc32(&mut self, seed: u32, data: &[u8]) -> Option<u32> {
        if self.crc_fail_next > 0 {
            self.crc_fail_next -= 1;
            return None;
        }
        let mut h = crc32fast::Hasher::new_with_initial(seed);
        h.update(data);
        Some(h.finalize())
    }
}
