use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use triage_core::domain::{Category, Event, SourceFile};
use triage_core::ports::{IngestSink, Result};
use triage_core::utils::{extract_year_month, sanitize_filename};

#[derive(Debug, Clone)]
struct ReportEntry {
    source: String,
    event: Event,
}

/// Markdown triage report adapter
///
/// Collects events during the run and, on `finish`, writes one file per
/// category and month named `<category>-<YYYY-MM>.md`.
pub struct MarkdownReportSink {
    output_folder: PathBuf,
    current_source: String,
    entries: Vec<ReportEntry>,
}

impl MarkdownReportSink {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
            current_source: String::new(),
            entries: Vec::new(),
        }
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Formats entries into markdown for a single category-month group
    fn format_markdown(&self, category: Category, year_month: &str, entries: &[&ReportEntry]) -> String {
        if entries.is_empty() {
            return String::new();
        }

        let mut output = String::new();
        output.push_str(&format!("# {} ({})\n\n", category.display_name(), year_month));
        output.push_str(&format!("*{} events*\n\n", entries.len()));
        output.push_str("---\n\n");

        for entry in entries {
            let timestamp = entry.event.timestamp.as_deref().unwrap_or("no timestamp");
            output.push_str(&format!("**{}** *{}*\n\n", timestamp, entry.source));

            match entry.event.field_value.as_deref() {
                Some(value) => output.push_str(&format!("{}\n\n", value)),
                None => output.push_str("*[No value]*\n\n"),
            }

            output.push_str("---\n\n");
        }

        output
    }

    fn write_report(&self) -> Result<usize> {
        if self.entries.is_empty() {
            return Ok(0);
        }

        fs::create_dir_all(&self.output_folder)?;

        // (category, year_month) -> entries, in arrival order
        let mut grouped: BTreeMap<(Category, String), Vec<&ReportEntry>> = BTreeMap::new();
        for entry in &self.entries {
            let year_month = entry
                .event
                .timestamp
                .as_deref()
                .and_then(extract_year_month)
                .unwrap_or_else(|| "unknown".to_string());
            grouped
                .entry((entry.event.category, year_month))
                .or_default()
                .push(entry);
        }

        for ((category, year_month), group) in grouped.iter() {
            let filename = format!("{}-{}.md", sanitize_filename(category.display_name()), year_month);
            let markdown_content = self.format_markdown(*category, year_month, group);
            fs::write(self.output_folder.join(filename), markdown_content)?;
        }

        Ok(grouped.len())
    }
}

impl IngestSink for MarkdownReportSink {
    fn begin_file(&mut self, file: &SourceFile) -> Result<()> {
        self.current_source = file.name.clone();
        Ok(())
    }

    fn record(&mut self, event: Event) -> Result<()> {
        self.entries.push(ReportEntry {
            source: self.current_source.clone(),
            event,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let files = self.write_report()?;
        info!(
            "wrote {} report files to {}",
            files,
            self.output_folder.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> SourceFile {
        SourceFile {
            id: 1,
            name: name.to_string(),
            path: PathBuf::from(name),
            size: 0,
        }
    }

    fn event(category: Category, value: Option<&str>, timestamp: Option<&str>) -> Event {
        Event {
            category,
            field_value: value.map(str::to_string),
            timestamp: timestamp.map(str::to_string),
        }
    }

    #[test]
    fn test_groups_by_category_and_month() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = MarkdownReportSink::new(dir.path());
        sink.begin_file(&source("main.log")).unwrap();
        sink.record(event(Category::ChatState, Some("composing"), Some("2023-01-01 10:00:00.000")))
            .unwrap();
        sink.record(event(Category::ChatState, Some("paused"), Some("2023-01-02 10:00:00.000")))
            .unwrap();
        sink.record(event(Category::ChatState, Some("recording"), Some("2023-02-01 10:00:00.000")))
            .unwrap();
        sink.record(event(Category::StatusAction, None, None)).unwrap();
        sink.finish().unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "Chat State-2023-01.md",
                "Chat State-2023-02.md",
                "Status-Story Actions-unknown.md",
            ]
        );

        let january = fs::read_to_string(dir.path().join("Chat State-2023-01.md")).unwrap();
        assert!(january.starts_with("# Chat State (2023-01)\n\n*2 events*"));
        assert!(january.contains("**2023-01-01 10:00:00.000** *main.log*\n\ncomposing"));
        assert!(january.find("composing").unwrap() < january.find("paused").unwrap());

        let unknown = fs::read_to_string(dir.path().join("Status-Story Actions-unknown.md")).unwrap();
        assert!(unknown.contains("**no timestamp** *main.log*\n\n*[No value]*"));
    }

    #[test]
    fn test_no_events_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let report_dir = dir.path().join("report");
        let mut sink = MarkdownReportSink::new(&report_dir);
        sink.finish().unwrap();
        assert!(!report_dir.exists());
    }

    #[test]
    fn test_events_keep_their_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = MarkdownReportSink::new(dir.path());
        sink.begin_file(&source("first.log")).unwrap();
        sink.record(event(Category::Battery, Some("40"), Some("2023-01-01 10:00:00.000")))
            .unwrap();
        sink.begin_file(&source("second.log")).unwrap();
        sink.record(event(Category::Battery, Some("39"), Some("2023-01-01 11:00:00.000")))
            .unwrap();
        sink.finish().unwrap();

        let content = fs::read_to_string(dir.path().join("Battery Percent-2023-01.md")).unwrap();
        assert!(content.contains("*first.log*\n\n40"));
        assert!(content.contains("*second.log*\n\n39"));
    }
}
