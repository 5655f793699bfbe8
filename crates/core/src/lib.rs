//! Recovery of structured events from messaging-app log files for forensic triage.
//!
//! Raw bytes go through [`scanner::ByteStreamScanner`], each recovered line is
//! matched against every rule of a [`classifier::LineClassifier`], and the
//! [`application::EventAssembler`] forwards one [`domain::Event`] per match to an
//! [`ports::IngestSink`].

pub mod application;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod ports;
pub mod scanner;
pub mod utils;

pub use application::{EventAssembler, EventStream, TriageServiceImpl};
pub use classifier::{LineClassifier, Rule, DEFAULT_RULES};
pub use config::ScanConfig;
pub use domain::{Category, Event, FileReport, RunSummary, SourceFile};
pub use error::TriageError;
