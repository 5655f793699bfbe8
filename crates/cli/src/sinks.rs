use std::io::{self, Write};

use log::info;
use triage_core::domain::{Event, FileReport, RunSummary, SourceFile};
use triage_core::ports::{IngestSink, ProgressReporter, Result};

/// Forwards every call to each inner sink in turn.
pub struct FanOutSink {
    sinks: Vec<Box<dyn IngestSink>>,
}

impl FanOutSink {
    pub fn new(sinks: Vec<Box<dyn IngestSink>>) -> Self {
        Self { sinks }
    }
}

impl IngestSink for FanOutSink {
    fn begin_file(&mut self, file: &SourceFile) -> Result<()> {
        self.sinks.iter_mut().try_for_each(|s| s.begin_file(file))
    }

    fn record(&mut self, event: Event) -> Result<()> {
        if let Some((last, rest)) = self.sinks.split_last_mut() {
            for sink in rest {
                sink.record(event.clone())?;
            }
            last.record(event)?;
        }
        Ok(())
    }

    fn end_file(&mut self, file: &SourceFile, report: &FileReport) -> Result<()> {
        self.sinks.iter_mut().try_for_each(|s| s.end_file(file, report))
    }

    fn finish(&mut self) -> Result<()> {
        self.sinks.iter_mut().try_for_each(|s| s.finish())
    }
}

/// Tab separated `timestamp  category  value  file` lines, `-` for absent fields.
pub struct StdoutSink<W: Write> {
    out: W,
    current_source: String,
}

impl<W: Write> StdoutSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            current_source: String::new(),
        }
    }
}

impl StdoutSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> IngestSink for StdoutSink<W> {
    fn begin_file(&mut self, file: &SourceFile) -> Result<()> {
        self.current_source = file.path.display().to_string();
        Ok(())
    }

    fn record(&mut self, event: Event) -> Result<()> {
        writeln!(
            self.out,
            "{}\t{}\t{}\t{}",
            event.timestamp.as_deref().unwrap_or("-"),
            event.category.artifact_type(),
            event.field_value.as_deref().unwrap_or("-"),
            self.current_source
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Default)]
pub struct LogProgress {
    total: usize,
}

impl ProgressReporter for LogProgress {
    fn start(&mut self, total_files: usize) {
        self.total = total_files;
        info!("{} candidate files", total_files);
    }

    fn advance(&mut self, completed: usize, file: &SourceFile) {
        info!("[{}/{}] {}", completed, self.total, file.path.display());
    }

    fn finish(&mut self, summary: &RunSummary) {
        for failure in &summary.failures {
            info!("failed: {} ({})", failure.file.path.display(), failure.reason);
        }
    }
}
