//! cli — `twinpage`: образ носителя в файле, blob поверх пар и доктор.
//!
//! Команды:
//! - init     — создать образ + sidecar и записать пустой blob;
//! - status   — геометрия, ёмкость и сводка по парам (только чтение);
//! - put/get  — записать/прочитать blob (значение или файл);
//! - check    — doctor scan (без записи), repair — load всех пар с лечением;
//! - dump     — hex сырого слота, corrupt — порча байта для учений;
//! - metrics  — прочитать blob и показать счётчики процесса.
//!
//! Дефолты геометрии берутся из TP_* (StorageSettings::from_env), флаги их перекрывают.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::blob::{BlobInfo, BlobStore};
use crate::config::{Endian, SettingsBuilder, StorageSettings};
use crate::doctor::{self, DoctorReport, RepairReport};
use crate::media::{FileMedia, Media};
use crate::metrics;
use crate::page::Expect;
use crate::pager::PairStore;
use crate::util::{display_text, hex_dump, parse_u8_byte};

#[derive(Parser, Debug)]
#[command(
    name = "twinpage",
    version,
    about = "Redundant page store over erase-before-write media",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    Init {
        #[arg(long)]
        path: PathBuf,
        /// Physical pages (even); default TP_TOTAL_PAGES or 64.
        #[arg(long)]
        total_pages: Option<u32>,
        /// Page length in bytes, trailer included; default TP_PAGE_LEN or 256.
        #[arg(long)]
        page_len: Option<usize>,
        #[arg(long)]
        format_version: Option<u16>,
        #[arg(long)]
        retry_count: Option<u32>,
        #[arg(long, default_value_t = false)]
        big_endian: bool,
    },
    Status {
        #[arg(long)]
        path: PathBuf,
    },
    Put {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, conflicts_with = "file")]
        value: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Get {
        #[arg(long)]
        path: PathBuf,
        /// Write the blob here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Check {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Repair {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Dump {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long)]
        len: Option<usize>,
    },
    Corrupt {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long)]
        offset: usize,
        #[arg(long, value_parser = parse_u8_byte, default_value_t = 0x01)]
        xor: u8,
    },
    Metrics {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Init {
            path,
            total_pages,
            page_len,
            format_version,
            retry_count,
            big_endian,
        } => {
            let mut b = SettingsBuilder::from_env();
            if let Some(n) = total_pages {
                b = b.total_pages(n);
            }
            if let Some(n) = page_len {
                b = b.page_len(n);
            }
            if let Some(v) = format_version {
                b = b.version(v);
            }
            if let Some(n) = retry_count {
                b = b.retry_count(n);
            }
            if big_endian {
                b = b.endian(Endian::Big);
            }
            let settings = b.build()?;
            let cap = init_image(&path, &settings)?;
            println!("Initialized image at {}", path.display());
            println!("  {}", settings);
            println!("  capacity = {} bytes", cap);
        }
        Cmd::Status { path } => {
            let media = FileMedia::open_ro(&path)?;
            let h = media.header().clone();
            drop(media);
            let rep = check_image(&path)?;
            println!("Image at {}", path.display());
            println!("  magic        = {}", h.magic);
            println!("  created_unix = {}", h.created_unix);
            println!("  total_pages  = {}", h.settings.total_pages);
            println!("  page_len     = {} bytes", h.settings.page_len);
            println!("  payload_len  = {} bytes", h.settings.payload_len());
            println!("  version      = {}", h.settings.version);
            println!("  retry_count  = {}", h.settings.retry_count);
            println!("  endian       = {}", h.settings.endian);
            println!(
                "  capacity     = {} bytes",
                h.settings.half().saturating_sub(1) as usize * h.settings.payload_len()
            );
            println!("  pairs        = {}", rep.pairs_total);
            println!("  in_sync      = {}", rep.in_sync);
            println!("  healable     = {}", rep.healable());
            println!("  lost         = {}", rep.lost);
            println!("  blank        = {}", rep.blank);
        }
        Cmd::Put { path, value, file } => {
            let data = match (value, file) {
                (Some(v), None) => v.into_bytes(),
                (None, Some(f)) => {
                    std::fs::read(&f).with_context(|| format!("read {}", f.display()))?
                }
                _ => return Err(anyhow!("pass exactly one of --value or --file")),
            };
            let seq = put_bytes(&path, &data)?;
            println!("Stored {} bytes (seq {})", data.len(), seq);
        }
        Cmd::Get { path, out } => {
            let (data, info) = get_bytes(&path)?;
            match out {
                Some(f) => {
                    std::fs::write(&f, &data).with_context(|| format!("write {}", f.display()))?;
                    println!("Wrote {} bytes to {} (status {})", data.len(), f.display(), info.status);
                }
                None => println!("{}", display_text(&data)),
            }
        }
        Cmd::Check { path, json } => {
            let rep = check_image(&path)?;
            if json {
                println!("{}", serde_json::to_string(&rep)?);
            } else {
                print_doctor(&path, &rep);
            }
        }
        Cmd::Repair { path, json } => {
            let rep = repair_image(&path)?;
            if json {
                println!("{}", serde_json::to_string(&rep)?);
            } else {
                println!("Repair report for {}:", path.display());
                println!("  pairs_total = {}", rep.pairs_total);
                println!("  ok          = {}", rep.ok);
                println!("  healed      = {}", rep.healed);
                println!("  old_version = {}", rep.old_version);
                println!("  lost        = {}", rep.lost);
                println!("  blank       = {}", rep.blank);
            }
        }
        Cmd::Dump { path, page, len } => {
            let buf = dump_slot(&path, page)?;
            let n = len.unwrap_or(buf.len()).min(buf.len());
            println!("First {} bytes of page {}:", n, page);
            println!("{}", hex_dump(&buf[..n]));
        }
        Cmd::Corrupt {
            path,
            page,
            offset,
            xor,
        } => {
            corrupt_slot(&path, page, offset, xor)?;
            println!("Flipped page {} offset {} with 0x{:02x}", page, offset, xor);
        }
        Cmd::Metrics { path, json } => {
            // чтение blob’а прогоняет load по всем его парам
            metrics::reset();
            if let Err(e) = get_bytes(&path) {
                log::warn!("metrics: blob read failed: {:#}", e);
            }
            let m = metrics::snapshot();
            if json {
                println!("{}", serde_json::to_string(&m)?);
            } else {
                println!("Metrics:");
                println!("  pages_loaded      = {}", m.pages_loaded);
                println!("  pages_flushed     = {}", m.pages_flushed);
                println!("  backup_heals      = {}", m.backup_heals);
                println!("  original_heals    = {}", m.original_heals);
                println!("  verify_mismatches = {}", m.verify_mismatches);
                println!("  pairs_lost        = {}", m.pairs_lost);
                println!("  io_retries        = {}", m.io_retries);
                println!("  io_failures       = {}", m.io_failures_total());
            }
        }
    }
    Ok(())
}

// ---------- commands as library calls ----------

/// Create the image and format an empty blob. Returns the blob capacity.
pub fn init_image(path: &Path, settings: &StorageSettings) -> Result<usize> {
    let mut media = FileMedia::create(path, settings)?;
    with_store(&mut media, |store| {
        let mut blob = BlobStore::new(store);
        blob.format()?;
        Ok(blob.capacity())
    })
}

/// Replace the blob. Returns the new sequence number.
pub fn put_bytes(path: &Path, data: &[u8]) -> Result<u32> {
    let mut media = FileMedia::open(path)?;
    with_store(&mut media, |store| BlobStore::new(store).write(data))
}

/// Read the blob (healing pairs on the way).
pub fn get_bytes(path: &Path) -> Result<(Vec<u8>, BlobInfo)> {
    let mut media = FileMedia::open(path)?;
    with_store(&mut media, |store| BlobStore::new(store).read())
}

/// Doctor scan over a read-only open.
pub fn check_image(path: &Path) -> Result<DoctorReport> {
    let mut media = FileMedia::open_ro(path)?;
    with_store(&mut media, |mut store| doctor::scan(&mut store, &Expect::any()))
}

pub fn repair_image(path: &Path) -> Result<RepairReport> {
    let mut media = FileMedia::open(path)?;
    with_store(&mut media, |mut store| doctor::repair(&mut store, &Expect::any()))
}

/// Raw slot contents, bypassing validation.
pub fn dump_slot(path: &Path, page: u32) -> Result<Vec<u8>> {
    let mut media = FileMedia::open_ro(path)?;
    let s = media.settings();
    if page >= s.total_pages {
        return Err(anyhow!("page {} out of range (total pages {})", page, s.total_pages));
    }
    let mut buf = vec![0u8; s.page_len];
    if !media.read(page, &mut buf) {
        return Err(anyhow!("read of page {} failed", page));
    }
    Ok(buf)
}

pub fn corrupt_slot(path: &Path, page: u32, offset: usize, xor: u8) -> Result<()> {
    let mut media = FileMedia::open(path)?;
    media.corrupt_byte(page, offset, xor)
}

fn with_store<R, F>(media: &mut FileMedia, f: F) -> Result<R>
where
    F: FnOnce(PairStore<'_, FileMedia>) -> Result<R>,
{
    let settings = media.settings().clone();
    let mut work = vec![0u8; settings.page_len];
    let mut mirror = vec![0u8; settings.page_len];
    let store = PairStore::init(media, &settings, &mut work, &mut mirror)?;
    f(store)
}

fn print_doctor(path: &Path, rep: &DoctorReport) {
    println!("Doctor report for {}:", path.display());
    println!("  pairs_total   = {}", rep.pairs_total);
    println!("  in_sync       = {}", rep.in_sync);
    println!("  diverged      = {}", rep.diverged);
    println!("  original_only = {}", rep.original_only);
    println!("  backup_only   = {}", rep.backup_only);
    println!("  lost          = {}", rep.lost);
    println!("  blank         = {}", rep.blank);
    println!("  old_version   = {}", rep.old_version);
    for p in &rep.problems {
        println!(
            "    pair ({}, {}): {:?} original={:?} backup={:?}",
            p.original, p.backup, p.state, p.original_state, p.backup_state
        );
    }
}
