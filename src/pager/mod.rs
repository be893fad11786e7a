//! pager — движок избыточных пар страниц (original + backup).
//!
//! Подмодули:
//! - core.rs    — PairStore, init()/deinit(), самопроверка контекста, буферы, раскладка halves.
//! - io.rs      — RetryIo: примитивы носителя с ограниченным числом повторов.
//! - load.rs    — load/load_page с откатом на backup и лечением пары.
//! - flush.rs   — flush/flush_page (original → backup), clone_slot, are_equal, sync_backup_area.
//! - inspect.rs — классификация пары без записи (doctor, CLI status/check).
//!
//! Раскладка halves: логическая страница i ↔ (i, i + total_pages/2).

pub mod core;
pub mod flush;
pub mod inspect;
pub mod io;
pub mod load;

// Re-exports для внешнего API
pub use self::core::{PairStore, UsableLayout};
pub use flush::SyncReport;
pub use inspect::{PairReport, PairState, SlotState};
pub use io::RetryIo;
pub use load::Loaded;
