//! Readers for the three annotation sources and the import entry points
//! that hand their batches to the merge engine.

pub mod clippings;
pub mod dates;
pub mod pages;
pub mod peer;
pub mod vocab;

use std::fmt;
use std::path::Path;

use chrono::Local;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::{KmError, Result};
use crate::frequency;
use crate::keys::TIMESTAMP_FORMAT;
use crate::merge;
use crate::storage::AnnotationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Clippings,
    Vocabulary,
    Peer,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub clippings: usize,
    pub originals: usize,
    pub lookups: usize,
    pub vocabs: usize,
}

impl EntityCounts {
    pub fn total(&self) -> usize {
        self.clippings + self.originals + self.lookups + self.vocabs
    }
}

/// Outcome of one import. A rolled-back batch reports zero inserted rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub source: SourceKind,
    pub parsed: EntityCounts,
    pub inserted: EntityCounts,
    /// Rows rejected as duplicates or for empty content.
    pub skipped: usize,
    pub committed: bool,
}

impl ImportSummary {
    pub fn rolled_back(source: SourceKind, parsed: EntityCounts) -> Self {
        Self {
            source,
            parsed,
            inserted: EntityCounts::default(),
            skipped: 0,
            committed: false,
        }
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            SourceKind::Clippings => write!(
                f,
                "Clippings: parsed {} records, imported {}",
                self.parsed.clippings, self.inserted.clippings
            )?,
            SourceKind::Vocabulary => write!(
                f,
                "Vocabulary: parsed {} lookups, imported {} lookups and {} words",
                self.parsed.lookups, self.inserted.lookups, self.inserted.vocabs
            )?,
            SourceKind::Peer => write!(
                f,
                "Database: parsed {} records, imported {} clippings, {} lookups and {} words",
                self.parsed.clippings + self.parsed.lookups,
                self.inserted.clippings,
                self.inserted.lookups,
                self.inserted.vocabs
            )?,
        }
        if !self.committed {
            write!(f, " (rolled back)")?;
        }
        Ok(())
    }
}

/// Opens a source database read-only, failing before anything else happens
/// when the file is missing.
pub(crate) fn open_source(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(KmError::SourceUnavailable(format!(
            "{} does not exist",
            path.display()
        )));
    }
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| KmError::SourceUnavailable(format!("{}: {}", path.display(), e)))
}

pub(crate) fn require_tables(conn: &Connection, tables: &[&str]) -> Result<()> {
    for table in tables {
        let found: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| KmError::SourceUnavailable(e.to_string()))?;
        if found == 0 {
            return Err(KmError::SourceUnavailable(format!("missing table {}", table)));
        }
    }
    Ok(())
}

/// Reads every row of `sql` as raw values. A query that cannot run against
/// the source (missing column, not a database) means the source is unusable.
pub(crate) fn read_rows(conn: &Connection, sql: &str) -> Result<Vec<Vec<Value>>> {
    let unavailable = |e: rusqlite::Error| KmError::SourceUnavailable(e.to_string());
    let mut stmt = conn.prepare(sql).map_err(unavailable)?;
    let width = stmt.column_count();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .map_err(unavailable)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(unavailable)?;
    Ok(rows)
}

/// Text rendering of a column, NULL as empty.
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

/// Numeric reading of a column, 0 when it does not parse.
pub(crate) fn int_of(value: &Value) -> i64 {
    match value {
        Value::Integer(i) => *i,
        Value::Real(r) => *r as i64,
        Value::Text(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

pub(crate) fn now_local() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn recount_after_import<S: AnnotationStore>(store: &S) {
    if let Err(e) = frequency::recalculate(store) {
        warn!("frequency recount failed: {}", e);
    }
}

pub fn import_clippings_file<S: AnnotationStore>(store: &S, path: &Path) -> Result<ImportSummary> {
    if !path.is_file() {
        return Err(KmError::SourceUnavailable(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)?;
    let summary = import_clippings_text(store, &text);
    info!("{} from {}", summary, path.display());
    Ok(summary)
}

pub fn import_clippings_text<S: AnnotationStore>(store: &S, text: &str) -> ImportSummary {
    let batch = clippings::parse_clippings(text, &now_local());
    merge::merge_clippings(store, &batch)
}

/// Imports a device vocabulary database, then recounts frequencies whether
/// or not the merge committed.
pub fn import_vocab_file<S: AnnotationStore>(store: &S, path: &Path) -> Result<ImportSummary> {
    let batch = vocab::read_vocab_db(path)?;
    let summary = merge::merge_vocabulary(store, &batch);
    recount_after_import(store);
    info!("{} from {}", summary, path.display());
    Ok(summary)
}

pub fn import_peer_file<S: AnnotationStore>(store: &S, path: &Path) -> Result<ImportSummary> {
    let snapshot = peer::read_snapshot(path)?;
    let summary = merge::merge_peer(store, &snapshot);
    recount_after_import(store);
    info!("{} from {}", summary, path.display());
    Ok(summary)
}

/// Each device source is imported on its own; one failing does not stop
/// the other.
pub struct DeviceImport {
    pub clippings: Result<ImportSummary>,
    pub vocabulary: Result<ImportSummary>,
}

pub fn import_device<S: AnnotationStore>(store: &S, root: &Path, config: &Config) -> DeviceImport {
    let clippings = import_clippings_file(store, &config.device_clippings(root));
    let vocabulary = import_vocab_file(store, &config.device_vocab(root));
    DeviceImport {
        clippings,
        vocabulary,
    }
}
