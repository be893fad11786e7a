//! media — четыре примитива носителя (erase/write/read/crc32) как трейт.
//!
//! Бэкенды:
//! - mem.rs  — RAM-эмуляция NOR-флеша с инъекцией отказов (тесты, учения);
//! - file.rs — образ в одном файле + JSON sidecar с геометрией + fs2-lock.
//!
//! Примитивы возвращают bool/Option: носитель не обязан объяснять отказ,
//! классификацию и повторы делает pager::io::RetryIo.

pub mod file;
pub mod mem;

pub use file::{FileMedia, ImageHeader};
pub use mem::MemMedia;

/// Erase-before-write page media.
pub trait Media {
    /// Erase one page. After success the page reads back as erased bytes.
    fn erase(&mut self, page: u32) -> bool;

    /// Program `data` (exactly one page) into an erased page.
    fn write(&mut self, page: u32, data: &[u8]) -> bool;

    /// Read one page into `buf`.
    fn read(&mut self, page: u32, buf: &mut [u8]) -> bool;

    /// CRC32 of `data` continuing from `seed`. None means the primitive failed.
    ///
    /// Default: IEEE CRC32 via crc32fast.
    fn crc32(&mut self, seed: u32, data: &[u8]) -> Option<u32> {
        let mut h = crc32fast::Hasher::new_with_initial(seed);
        h.update(data);
        Some(h.finalize())
    }
}

impl<M: Media + ?Sized> Media for &mut M {
    fn erase(&mut self, page: u32) -> bool {
        (**self).erase(page)
    }
    fn write(&mut self, page: u32, data: &[u8]) -> bool {
        (**self).write(page, data)
    }
    fn read(&mut self, page: u32, buf: &mut [u8]) -> bool {
        (**self).read(page, buf)
    }
    fn crc32(&mut self, seed: u32, data: &[u8]) -> Option<u32> {
        (**self).crc32(seed, data)
    }
}

impl<M: Media + ?Sized> Media for Box<M> {
    fn erase(&mut self, page: u32) -> bool {
        (**self).erase(page)
    }
    fn write(&mut self, page: u32, data: &[u8]) -> bool {
        (**self).write(page, data)
    }
    fn read(&mut self, page: u32, buf: &mut [u8]) -> bool {
        (**self).read(page, buf)
    }
    fn crc32(&mut self, seed: u32, data: &[u8]) -> Option<u32> {
        (**self).crc32(seed, data)
    }
}
