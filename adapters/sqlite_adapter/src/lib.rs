use std::collections::HashMap;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use triage_core::domain::{
    Category, Event, FileReport, SourceFile, TIMESTAMP_ATTRIBUTE_DESCRIPTION,
    TIMESTAMP_ATTRIBUTE_TYPE,
};
use triage_core::ports::{IngestSink, Result};
use triage_core::utils::timestamp_to_unix_millis;

const CURRENT_SCHEMA_VERSION: i32 = 1;

/// An event as stored in the case database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub source_path: String,
    pub artifact_type: String,
    pub attribute_type: String,
    pub field_value: Option<String>,
    pub timestamp: Option<String>,
    pub occurred_at_ms: Option<i64>,
}

/// SQLite case database implementing the IngestSink port
///
/// Each event becomes one artifact linked to its source file, carrying a value
/// attribute and a timestamp attribute. Artifact and attribute types are created on
/// first use and reused afterwards.
pub struct SqliteEventSink {
    conn: Connection,
    current_file: Option<i64>,
    artifact_types: HashMap<Category, i64>,
    attribute_types: HashMap<&'static str, i64>,
}

impl SqliteEventSink {
    /// Opens (or creates) the case database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        run_migrations(&mut conn)?;
        Ok(Self {
            conn,
            current_file: None,
            artifact_types: HashMap::new(),
            attribute_types: HashMap::new(),
        })
    }

    fn artifact_type_id(&mut self, category: Category) -> Result<i64> {
        if let Some(id) = self.artifact_types.get(&category) {
            return Ok(*id);
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO artifact_types (name, display_name) VALUES (?1, ?2)",
            params![category.artifact_type(), category.display_name()],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM artifact_types WHERE name = ?1",
            params![category.artifact_type()],
            |row| row.get(0),
        )?;
        self.artifact_types.insert(category, id);
        Ok(id)
    }

    fn attribute_type_id(&mut self, name: &'static str, description: &str) -> Result<i64> {
        if let Some(id) = self.attribute_types.get(name) {
            return Ok(*id);
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO attribute_types (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM attribute_types WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        self.attribute_types.insert(name, id);
        Ok(id)
    }

    fn commit_open_transaction(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Reads back every stored event in insertion order.
    pub fn fetch_all_records(&self) -> Result<Vec<StoredEvent>> {
        let timestamp_type: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM attribute_types WHERE name = ?1",
                params![TIMESTAMP_ATTRIBUTE_TYPE],
                |row| row.get(0),
            )
            .optional()?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                COALESCE(s.path, '') AS source_path,
                t.name AS artifact_type,
                COALESCE(vt.name, '') AS attribute_type,
                v.value AS field_value,
                ts.value AS timestamp,
                a.occurred_at_ms AS occurred_at_ms
            FROM artifacts a
            JOIN artifact_types t ON t.id = a.artifact_type_id
            LEFT JOIN source_files s ON s.id = a.source_file_id
            LEFT JOIN attributes v ON v.artifact_id = a.id AND v.attribute_type_id IS NOT ?1
            LEFT JOIN attribute_types vt ON vt.id = v.attribute_type_id
            LEFT JOIN attributes ts ON ts.artifact_id = a.id AND ts.attribute_type_id IS ?1
            ORDER BY a.id ASC
            "#,
        )?;

        let records = stmt
            .query_map(params![timestamp_type], |row: &Row| {
                Ok(StoredEvent {
                    source_path: row.get("source_path")?,
                    artifact_type: row.get("artifact_type")?,
                    attribute_type: row.get("attribute_type")?,
                    field_value: row.get("field_value")?,
                    timestamp: row.get("timestamp")?,
                    occurred_at_ms: row.get("occurred_at_ms")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        Ok(records)
    }

    /// Hostname recorded for a source file, by evidence id.
    pub fn source_hostname(&self, evidence_id: u64) -> Result<Option<String>> {
        let hostname = self
            .conn
            .query_row(
                "SELECT hostname FROM source_files WHERE evidence_id = ?1 ORDER BY id DESC LIMIT 1",
                params![i64::try_from(evidence_id)?],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(hostname.flatten())
    }
}

impl IngestSink for SqliteEventSink {
    fn begin_file(&mut self, file: &SourceFile) -> Result<()> {
        self.commit_open_transaction()?;
        self.conn.execute_batch("BEGIN")?;
        self.conn.execute(
            "INSERT INTO source_files (evidence_id, path, name, size_bytes, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                i64::try_from(file.id)?,
                file.path.to_string_lossy().into_owned(),
                file.name,
                i64::try_from(file.size)?,
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ],
        )?;
        self.current_file = Some(self.conn.last_insert_rowid());
        Ok(())
    }

    fn record(&mut self, event: Event) -> Result<()> {
        let artifact_type = self.artifact_type_id(event.category)?;
        let value_type = self.attribute_type_id(
            event.category.attribute_type(),
            event.category.attribute_description(),
        )?;
        let timestamp_type =
            self.attribute_type_id(TIMESTAMP_ATTRIBUTE_TYPE, TIMESTAMP_ATTRIBUTE_DESCRIPTION)?;
        let occurred_at_ms = event.timestamp.as_deref().and_then(timestamp_to_unix_millis);

        self.conn.execute(
            "INSERT INTO artifacts (source_file_id, artifact_type_id, occurred_at_ms)
             VALUES (?1, ?2, ?3)",
            params![self.current_file, artifact_type, occurred_at_ms],
        )?;
        let artifact_id = self.conn.last_insert_rowid();

        let mut insert = self.conn.prepare_cached(
            "INSERT INTO attributes (artifact_id, attribute_type_id, value) VALUES (?1, ?2, ?3)",
        )?;
        insert.execute(params![artifact_id, value_type, event.field_value])?;
        insert.execute(params![artifact_id, timestamp_type, event.timestamp])?;
        Ok(())
    }

    fn end_file(&mut self, _file: &SourceFile, report: &FileReport) -> Result<()> {
        if let Some(source_id) = self.current_file.take() {
            self.conn.execute(
                "UPDATE source_files SET hostname = ?1, lines_scanned = ?2, events_emitted = ?3
                 WHERE id = ?4",
                params![
                    report.hostname,
                    i64::try_from(report.lines_scanned)?,
                    i64::try_from(report.events_emitted)?,
                    source_id,
                ],
            )?;
        }
        self.commit_open_transaction()
    }

    fn finish(&mut self) -> Result<()> {
        self.current_file = None;
        self.commit_open_transaction()
    }
}

/// Commits whatever the current file has written so far.
impl Drop for SqliteEventSink {
    fn drop(&mut self) {
        if let Err(e) = self.commit_open_transaction() {
            warn!("cannot commit case database on close: {}", e);
        }
    }
}

fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(format!(
            "case database version ({}) is newer than supported schema ({})",
            version, CURRENT_SCHEMA_VERSION
        )
        .into());
    }
    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    debug!("migrating case database from version {}", version);
    let tx = conn.transaction()?;
    tx.execute_batch(include_str!("schema_v1.sql"))?;
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(id: u64, name: &str) -> SourceFile {
        SourceFile {
            id,
            name: name.to_string(),
            path: PathBuf::from(format!("/evidence/{}", name)),
            size: 128,
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
    fn test_records_round_trip_with_types() {
        let mut sink = SqliteEventSink::open_in_memory().unwrap();
        let file = source(7, "main.log");
        sink.begin_file(&file).unwrap();
        sink.record(event(
            Category::ContactBlocked,
            Some("491701234567 blocked"),
            Some("2023-01-01 10:00:00.000"),
        ))
        .unwrap();
        sink.record(event(Category::Battery, None, None)).unwrap();
        sink.end_file(&file, &FileReport::default()).unwrap();
        sink.finish().unwrap();

        let records = sink.fetch_all_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            StoredEvent {
                source_path: "/evidence/main.log".to_string(),
                artifact_type: "TSK_BLOCKED".to_string(),
                attribute_type: "TSK_IF_BLOCKED".to_string(),
                field_value: Some("491701234567 blocked".to_string()),
                timestamp: Some("2023-01-01 10:00:00.000".to_string()),
                occurred_at_ms: Some(1_672_567_200_000),
            }
        );
        assert_eq!(records[1].artifact_type, "TSK_BATTERY");
        assert_eq!(records[1].field_value, None);
        assert_eq!(records[1].timestamp, None);
        assert_eq!(records[1].occurred_at_ms, None);
    }

    #[test]
    fn test_zero_value_is_stored() {
        let mut sink = SqliteEventSink::open_in_memory().unwrap();
        sink.begin_file(&source(1, "a.log")).unwrap();
        sink.record(event(Category::Battery, Some("0"), None)).unwrap();
        sink.finish().unwrap();
        assert_eq!(
            sink.fetch_all_records().unwrap()[0].field_value.as_deref(),
            Some("0")
        );
    }

    #[test]
    fn test_types_are_created_once() {
        let mut sink = SqliteEventSink::open_in_memory().unwrap();
        sink.begin_file(&source(1, "a.log")).unwrap();
        for _ in 0..3 {
            sink.record(event(Category::ChatState, Some("paused"), None)).unwrap();
        }
        sink.finish().unwrap();
        let types: i64 = sink
            .conn
            .query_row("SELECT COUNT(*) FROM artifact_types", [], |row| row.get(0))
            .unwrap();
        let attributes: i64 = sink
            .conn
            .query_row("SELECT COUNT(*) FROM attribute_types", [], |row| row.get(0))
            .unwrap();
        assert_eq!(types, 1);
        assert_eq!(attributes, 2);
    }

    #[test]
    fn test_end_file_stores_report() {
        let mut sink = SqliteEventSink::open_in_memory().unwrap();
        let file = source(3, "b.log");
        sink.begin_file(&file).unwrap();
        let report = FileReport {
            lines_scanned: 12,
            events_emitted: 0,
            bytes_read: 128,
            hostname: Some("WIN-EVIDENCE".to_string()),
        };
        sink.end_file(&file, &report).unwrap();
        assert_eq!(
            sink.source_hostname(3).unwrap().as_deref(),
            Some("WIN-EVIDENCE")
        );
        assert_eq!(sink.source_hostname(99).unwrap(), None);
    }

    #[test]
    fn test_unfinished_file_is_kept() {
        let mut sink = SqliteEventSink::open_in_memory().unwrap();
        sink.begin_file(&source(1, "broken.log")).unwrap();
        sink.record(event(Category::GroupAction, Some("group created"), None))
            .unwrap();
        // no end_file: a read error interrupted the file
        sink.begin_file(&source(2, "next.log")).unwrap();
        sink.record(event(Category::GroupAction, Some("group deleted"), None))
            .unwrap();
        sink.finish().unwrap();

        let records = sink.fetch_all_records().unwrap();
        let paths: Vec<&str> = records.iter().map(|r| r.source_path.as_str()).collect();
        assert_eq!(paths, vec!["/evidence/broken.log", "/evidence/next.log"]);
    }

    #[test]
    fn test_dropped_sink_keeps_in_flight_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("case.db");
        {
            let mut sink = SqliteEventSink::open(&db_path).unwrap();
            sink.begin_file(&source(1, "a.log")).unwrap();
            sink.record(event(Category::ChatState, Some("composing"), None))
                .unwrap();
            // run aborted: neither end_file nor finish
        }
        let sink = SqliteEventSink::open(&db_path).unwrap();
        let records = sink.fetch_all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field_value.as_deref(), Some("composing"));
    }

    #[test]
    fn test_reopen_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("case.db");
        {
            let mut sink = SqliteEventSink::open(&db_path).unwrap();
            sink.begin_file(&source(1, "a.log")).unwrap();
            sink.record(event(Category::MediaSent, Some("Message sent in group: 1"), None))
                .unwrap();
            sink.finish().unwrap();
        }
        let mut sink = SqliteEventSink::open(&db_path).unwrap();
        sink.begin_file(&source(2, "b.log")).unwrap();
        sink.record(event(Category::MediaSent, Some("Message sent in group: 2"), None))
            .unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.fetch_all_records().unwrap().len(), 2);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("future.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION + 1)
                .unwrap();
        }
        let err = SqliteEventSink::open(&db_path).err().unwrap();
        assert!(err.to_string().contains("newer than supported"));
    }
}
