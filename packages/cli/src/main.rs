use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use gctrace::{TraceEventKind, TraceLog, TraceReader};

/// Offline inspector for gctrace binary logs.
#[derive(Parser)]
#[command(name = "gctrace")]
#[command(about = "GC trace log inspector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a trace log: record counts and allocation volume
    Summary {
        /// Trace log file
        file: PathBuf,
        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List trace records with recomputed absolute addresses
    Dump {
        /// Trace log file
        file: PathBuf,
        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
        /// Emit one JSON object per record
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Summary {
    base_address: u64,
    events: usize,
    allocations: u64,
    marks: u64,
    allocated_bytes: u64,
}

impl Summary {
    fn of(log: &TraceLog) -> Self {
        let mut allocations = 0u64;
        let mut marks = 0u64;
        let mut allocated_bytes = 0u64;
        for event in &log.events {
            match event.kind {
                TraceEventKind::Allocate => {
                    allocations += 1;
                    allocated_bytes += u64::from(event.size);
                }
                TraceEventKind::GCMark => marks += 1,
                TraceEventKind::BaseAddress => {}
            }
        }
        Self {
            base_address: log.base.absolute_address,
            events: log.events.len(),
            allocations,
            marks,
            allocated_bytes,
        }
    }
}

#[derive(Serialize)]
struct DumpRecord {
    kind: TraceEventKind,
    relative_address: u32,
    absolute_address: u64,
    size: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Summary { file, json } => summary(&file, json),
        Commands::Dump { file, limit, json } => dump(&file, limit, json),
    }
}

fn load(file: &Path) -> Result<TraceLog> {
    let log = TraceReader::read_path(file)
        .with_context(|| format!("reading trace log {}", file.display()))?;
    debug!(events = log.events.len(), "parsed trace log");
    Ok(log)
}

fn summary(file: &Path, json: bool) -> Result<()> {
    let log = load(file)?;
    let summary = Summary::of(&log);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("base address:    0x{:x}", summary.base_address);
        println!("events:          {}", summary.events);
        println!("allocations:     {}", summary.allocations);
        println!("marks:           {}", summary.marks);
        println!("allocated bytes: {}", summary.allocated_bytes);
    }
    Ok(())
}

fn dump(file: &Path, limit: Option<usize>, json: bool) -> Result<()> {
    let log = load(file)?;
    let count = limit.unwrap_or(log.events.len());

    for event in log.events.iter().take(count) {
        let absolute = log.absolute_address(event);
        if json {
            let record = DumpRecord {
                kind: event.kind,
                relative_address: event.relative_address,
                absolute_address: absolute,
                size: event.size,
            };
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!(
                "{:<11} address=0x{:x} (+0x{:x}) size={}",
                event.kind, absolute, event.relative_address, event.size
            );
        }
    }
    Ok(())
}
