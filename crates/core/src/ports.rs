use crate::domain::{Event, FileReport, RunSummary, SourceFile};
use std::error::Error;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

pub type BoxError = Box<dyn Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, BoxError>;

/// Locates candidate log files and opens them for reading.
pub trait EvidenceSource {
    fn find_files(&self) -> Result<Vec<SourceFile>>;
    fn open(&self, file: &SourceFile) -> std::io::Result<Box<dyn Read>>;
}

/// Consumer of recovered events.
///
/// Events arrive in the order their lines were recovered. A failure returned from
/// any method stops the run and is reported to the caller.
pub trait IngestSink {
    fn begin_file(&mut self, _file: &SourceFile) -> Result<()> {
        Ok(())
    }

    fn record(&mut self, event: Event) -> Result<()>;

    fn end_file(&mut self, _file: &SourceFile, _report: &FileReport) -> Result<()> {
        Ok(())
    }

    /// Called once after the last file.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: IngestSink + ?Sized> IngestSink for Box<S> {
    fn begin_file(&mut self, file: &SourceFile) -> Result<()> {
        (**self).begin_file(file)
    }

    fn record(&mut self, event: Event) -> Result<()> {
        (**self).record(event)
    }

    fn end_file(&mut self, file: &SourceFile, report: &FileReport) -> Result<()> {
        (**self).end_file(file, report)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Sink that keeps every event in memory.
impl IngestSink for Vec<Event> {
    fn record(&mut self, event: Event) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Checked once before each file.
pub trait CancellationCheck {
    fn is_cancelled(&self) -> bool;
}

impl CancellationCheck for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

pub struct NeverCancel;

impl CancellationCheck for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

pub trait ProgressReporter {
    fn start(&mut self, _total_files: usize) {}
    fn advance(&mut self, _completed: usize, _file: &SourceFile) {}
    fn finish(&mut self, _summary: &RunSummary) {}
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {}
