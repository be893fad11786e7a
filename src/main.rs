use env_logger::{Builder, Env};
use log::error;

use TwinPage::StoreError;

/// Код выхода: 2 — обе копии пары потеряны, 3 — носитель не отвечает, иначе 1.
fn exit_code(e: &anyhow::Error) -> i32 {
    match e.chain().find_map(|c| c.downcast_ref::<StoreError>()) {
        Some(StoreError::NotValidPage { .. }) => 2,
        Some(StoreError::Callback { .. }) | Some(StoreError::WriteNoMatchRead { .. }) => 3,
        _ => 1,
    }
}

fn main() {
    // RUST_LOG=debug twinpage check --path disk.img
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_target(false)
        .init();

    if let Err(e) = TwinPage::cli::run() {
        error!("twinpage: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}
