use std::collections::VecDeque;
use std::io::Read;

use log::{debug, info, warn};

use crate::classifier::LineClassifier;
use crate::config::ScanConfig;
use crate::domain::{Event, FileFailure, FileReport, RunSummary};
use crate::error::TriageError;
use crate::extract;
use crate::ports::{CancellationCheck, EvidenceSource, IngestSink, ProgressReporter};
use crate::scanner::ByteStreamScanner;

/// Turns recovered lines into events: one event per matched category.
#[derive(Debug, Clone, Default)]
pub struct EventAssembler {
    classifier: LineClassifier,
    config: ScanConfig,
}

impl EventAssembler {
    pub fn new(classifier: LineClassifier, config: ScanConfig) -> Self {
        Self { classifier, config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Events for a single line, in rule table order.
    pub fn assemble_line(&self, line: &str) -> Vec<Event> {
        let mut rules = self.classifier.matching(line).peekable();
        if rules.peek().is_none() {
            return Vec::new();
        }
        let timestamp = extract::timestamp(line);
        rules
            .map(|rule| Event {
                category: rule.category,
                field_value: rule.field.extract(line),
                timestamp: timestamp.clone(),
            })
            .collect()
    }

    /// Lazily recovered events of a byte source.
    pub fn events<R: Read>(&self, reader: R, total_len: Option<u64>) -> EventStream<'_, R> {
        let scanner = ByteStreamScanner::new(reader, self.config.clone());
        let scanner = match total_len {
            Some(len) => scanner.with_total_len(len),
            None => scanner,
        };
        EventStream {
            assembler: self,
            scanner,
            pending: VecDeque::new(),
        }
    }

    /// Scan one file, forwarding every event to `sink` as soon as it is built.
    ///
    /// A read error ends the file with [`TriageError::Read`]; events already forwarded
    /// stay forwarded. A sink error is returned immediately.
    pub fn process_file<R: Read>(
        &self,
        reader: R,
        total_len: Option<u64>,
        sink: &mut dyn IngestSink,
    ) -> Result<FileReport, TriageError> {
        let mut scanner = ByteStreamScanner::new(reader, self.config.clone());
        if let Some(len) = total_len {
            scanner = scanner.with_total_len(len);
        }

        let mut report = FileReport::default();
        while let Some(line) = scanner.next() {
            let line = line?;
            report.lines_scanned += 1;
            if report.hostname.is_none() {
                report.hostname = extract::hostname(&line);
            }
            for event in self.assemble_line(&line) {
                sink.record(event).map_err(TriageError::Sink)?;
                report.events_emitted += 1;
            }
        }
        report.bytes_read = scanner.position();
        Ok(report)
    }
}

/// Iterator returned by [`EventAssembler::events`].
pub struct EventStream<'a, R: Read> {
    assembler: &'a EventAssembler,
    scanner: ByteStreamScanner<R>,
    pending: VecDeque<Event>,
}

impl<R: Read> Iterator for EventStream<'_, R> {
    type Item = Result<Event, TriageError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            match self.scanner.next()? {
                Ok(line) => self.pending.extend(self.assembler.assemble_line(&line)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Application service driving a whole evidence source through the assembler
pub struct TriageServiceImpl {
    evidence_source: Box<dyn EvidenceSource>,
    sink: Box<dyn IngestSink>,
    assembler: EventAssembler,
}

impl TriageServiceImpl {
    /// Creates a new TriageServiceImpl with the given dependencies
    pub fn new(
        evidence_source: Box<dyn EvidenceSource>,
        sink: Box<dyn IngestSink>,
        assembler: EventAssembler,
    ) -> Self {
        Self {
            evidence_source,
            sink,
            assembler,
        }
    }

    pub fn into_sink(self) -> Box<dyn IngestSink> {
        self.sink
    }

    /// Processes every discovered file, checking `cancel` before each one.
    ///
    /// Open and read failures are recorded in the summary and the run continues;
    /// discovery and sink failures abort the run.
    pub fn execute_triage(
        &mut self,
        cancel: &dyn CancellationCheck,
        progress: &mut dyn ProgressReporter,
    ) -> Result<RunSummary, TriageError> {
        let files = self
            .evidence_source
            .find_files()
            .map_err(TriageError::Discovery)?;

        let mut summary = RunSummary {
            files_found: files.len(),
            ..RunSummary::default()
        };
        progress.start(files.len());

        for (index, file) in files.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!("run cancelled before {}", file.path.display());
                summary.cancelled = true;
                break;
            }
            summary.files_processed += 1;

            let outcome = self
                .evidence_source
                .open(&file)
                .map_err(|source| TriageError::Open {
                    path: file.path.clone(),
                    source,
                })
                .and_then(|reader| {
                    self.sink.begin_file(&file).map_err(TriageError::Sink)?;
                    self.assembler
                        .process_file(reader, Some(file.size), self.sink.as_mut())
                });

            match outcome {
                Ok(report) => {
                    debug!(
                        "{}: {} lines, {} events",
                        file.path.display(),
                        report.lines_scanned,
                        report.events_emitted
                    );
                    summary.events_emitted += report.events_emitted;
                    self.sink
                        .end_file(&file, &report)
                        .map_err(TriageError::Sink)?;
                }
                Err(err) if err.is_per_file() => {
                    warn!("skipping {}: {}", file.path.display(), error_chain(&err));
                    summary.failures.push(FileFailure {
                        reason: error_chain(&err),
                        file: file.clone(),
                    });
                }
                Err(err) => return Err(err),
            }

            progress.advance(index + 1, &file);
        }

        self.sink.finish().map_err(TriageError::Sink)?;
        info!(
            "processed {} of {} files, {} events",
            summary.files_processed, summary.files_found, summary.events_emitted
        );
        progress.finish(&summary);
        Ok(summary)
    }
}

/// `err: cause: cause` rendering of an error and its sources.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
