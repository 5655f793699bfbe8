mod sinks;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use fs_adapter::{FsEvidenceSource, DEFAULT_NAME_PATTERN};
use log::{warn, LevelFilter};
use markdown_adapter::MarkdownReportSink;
use sinks::{FanOutSink, LogProgress, StdoutSink};
use sqlite_adapter::SqliteEventSink;
use triage_core::application::error_chain;
use triage_core::ports::{EvidenceSource, IngestSink};
use triage_core::{EventAssembler, LineClassifier, RunSummary, ScanConfig, TriageServiceImpl};

/// Recovers chat, presence, contact and media events from WhatsApp Desktop log files
#[derive(Parser, Debug)]
#[command(name = "wa-triage", version)]
#[command(about = "Extracts WhatsApp Desktop activity events from raw or damaged log files")]
struct Cli {
    /// Log files or directories to search (repeatable)
    #[arg(short = 'i', long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// File name pattern for directory inputs; `%` matches any run, `_` one character
    #[arg(short = 'p', long = "pattern", default_value = DEFAULT_NAME_PATTERN)]
    pattern: String,

    /// Case database (SQLite) to store events in
    #[arg(short = 'd', long = "output-db")]
    output_db: Option<PathBuf>,

    /// Folder for the Markdown triage report
    #[arg(short = 'o', long = "report-dir")]
    report_dir: Option<PathBuf>,

    /// Bytes read per chunk
    #[arg(long = "chunk-size", default_value_t = 4096)]
    chunk_size: usize,

    /// Shortest printable run kept as a line
    #[arg(long = "min-run", default_value_t = 4)]
    min_run: usize,

    /// Drop a trailing printable run that is not followed by a binary byte
    #[arg(long = "no-eof-flush")]
    no_eof_flush: bool,

    /// Split recovered text at line breaks
    #[arg(long = "split-lines")]
    split_lines: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            chunk_size: self.chunk_size.max(1),
            min_run_len: self.min_run,
            flush_at_eof: !self.no_eof_flush,
            split_on_newline: self.split_lines,
        }
    }

    fn build_sink(&self) -> triage_core::ports::Result<Box<dyn IngestSink>> {
        let mut sinks: Vec<Box<dyn IngestSink>> = Vec::new();
        if let Some(db) = &self.output_db {
            sinks.push(Box::new(SqliteEventSink::open(db)?));
        }
        if let Some(dir) = &self.report_dir {
            sinks.push(Box::new(MarkdownReportSink::new(dir.clone())));
        }
        if sinks.is_empty() {
            sinks.push(Box::new(StdoutSink::stdout()));
        }
        Ok(Box::new(FanOutSink::new(sinks)))
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Found {} files", summary.files_processed);
    println!("{} events recovered", summary.events_emitted);
    if !summary.failures.is_empty() {
        println!("{} files could not be read", summary.failures.len());
    }
    if summary.cancelled {
        println!(
            "Cancelled after {} of {} files",
            summary.files_processed, summary.files_found
        );
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging (RUST_LOG still refines per module)
    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level())
        .init();

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        if let Err(e) = ctrlc::set_handler(move || cancelled.store(true, Ordering::SeqCst)) {
            warn!("cannot install Ctrl-C handler: {}", e);
        }
    }

    // Instantiate concrete implementations of secondary adapters
    let evidence_source: Box<dyn EvidenceSource> =
        match FsEvidenceSource::new(cli.inputs.clone(), &cli.pattern) {
            Ok(source) => Box::new(source),
            Err(e) => {
                eprintln!("Error: {}", error_chain(e.as_ref()));
                std::process::exit(1);
            }
        };

    let sink = match cli.build_sink() {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Error opening output: {}", error_chain(e.as_ref()));
            std::process::exit(1);
        }
    };

    // Instantiate the core business service with dependency injection
    let assembler = EventAssembler::new(LineClassifier::default(), cli.scan_config());
    let mut service = TriageServiceImpl::new(evidence_source, sink, assembler);

    let outcome = service.execute_triage(cancelled.as_ref(), &mut LogProgress::default());
    // Sinks commit on drop, and process::exit skips destructors
    drop(service);

    match outcome {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            eprintln!("Error during triage: {}", error_chain(&e));
            std::process::exit(1);
        }
    }
}
