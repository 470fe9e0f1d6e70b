//! Reader for the device's `vocab.db` (Vocabulary Builder) file.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::Value;

use super::{int_of, open_source, read_rows, require_tables, text_of};
use crate::errors::Result;
use crate::keys;
use crate::storage::models::{LookupEntry, VocabEntry};
use crate::storage::schema::DEVICE_VOCAB_TABLES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInfo {
    pub id: String,
    pub guid: String,
    pub title: String,
    pub authors: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRow {
    pub id: String,
    pub word: String,
    pub stem: String,
    pub category: i64,
    pub millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRow {
    pub word_key: String,
    pub book_key: String,
    pub usage: String,
    pub millis: i64,
}

/// Book id/guid to `(title, authors)`. The first row to claim a key keeps
/// it, the same answer a front-to-back scan would give.
#[derive(Debug, Default)]
pub struct BookIndex {
    books: HashMap<String, (String, String)>,
}

impl BookIndex {
    pub fn build(rows: &[BookInfo]) -> Self {
        let mut books = HashMap::new();
        for row in rows {
            let entry = (row.title.clone(), row.authors.clone());
            books.entry(row.id.clone()).or_insert_with(|| entry.clone());
            books.entry(row.guid.clone()).or_insert(entry);
        }
        Self { books }
    }

    pub fn resolve(&self, book_key: &str) -> Option<(&str, &str)> {
        self.books
            .get(book_key)
            .map(|(title, authors)| (title.as_str(), authors.as_str()))
    }
}

#[derive(Debug, Default)]
pub struct VocabBatch {
    pub words: Vec<VocabEntry>,
    pub lookups: Vec<LookupEntry>,
}

/// Turns device rows into store records. Frequencies start at 0; they are
/// recounted from the lookups after merging.
pub fn build_batch(books: &[BookInfo], words: &[WordRow], lookups: &[LookupRow]) -> VocabBatch {
    let index = BookIndex::build(books);

    let words = words
        .iter()
        .map(|row| VocabEntry {
            id: keys::vocab_key(&row.word, row.millis),
            word_key: row.id.clone(),
            word: row.word.clone(),
            stem: row.stem.clone(),
            category: row.category,
            timestamp: keys::format_millis_local(row.millis),
            frequency: 0,
        })
        .collect();

    let lookups = lookups
        .iter()
        .map(|row| {
            let (title, authors) = index.resolve(&row.book_key).unwrap_or(("", ""));
            LookupEntry {
                word_key: row.word_key.clone(),
                usage: row.usage.clone(),
                title: title.to_string(),
                authors: authors.to_string(),
                timestamp: keys::format_millis_local(row.millis),
            }
        })
        .collect();

    VocabBatch { words, lookups }
}

fn book_info(values: &[Value]) -> BookInfo {
    BookInfo {
        id: text_of(&values[0]),
        guid: text_of(&values[1]),
        title: text_of(&values[2]),
        authors: text_of(&values[3]),
    }
}

fn word_row(values: &[Value]) -> WordRow {
    WordRow {
        id: text_of(&values[0]),
        word: text_of(&values[1]),
        stem: text_of(&values[2]),
        category: int_of(&values[3]),
        millis: int_of(&values[4]),
    }
}

fn lookup_row(values: &[Value]) -> LookupRow {
    LookupRow {
        word_key: text_of(&values[0]),
        book_key: text_of(&values[1]),
        usage: text_of(&values[2]),
        millis: int_of(&values[3]),
    }
}

pub fn read_vocab_db(path: &Path) -> Result<VocabBatch> {
    let conn = open_source(path)?;
    require_tables(&conn, &DEVICE_VOCAB_TABLES)?;

    let books: Vec<BookInfo> = read_rows(&conn, "SELECT id, guid, title, authors FROM BOOK_INFO")?
        .iter()
        .map(|r| book_info(r))
        .collect();
    let words: Vec<WordRow> = read_rows(&conn, "SELECT id, word, stem, category, timestamp FROM WORDS")?
        .iter()
        .map(|r| word_row(r))
        .collect();
    let lookups: Vec<LookupRow> =
        read_rows(&conn, "SELECT word_key, book_key, usage, timestamp FROM LOOKUPS")?
            .iter()
            .map(|r| lookup_row(r))
            .collect();

    Ok(build_batch(&books, &words, &lookups))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::KmError;
    use rusqlite::{Connection, params};
    use tempfile::TempDir;

    fn book(id: &str, guid: &str, title: &str) -> BookInfo {
        BookInfo {
            id: id.into(),
            guid: guid.into(),
            title: title.into(),
            authors: format!("{} author", title),
        }
    }

    /// Writes a device-format vocab.db with one book, two words and three lookups.
    pub(crate) fn write_device_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE BOOK_INFO (id TEXT PRIMARY KEY, asin TEXT, guid TEXT, lang TEXT, title TEXT, authors TEXT);
             CREATE TABLE WORDS (id TEXT PRIMARY KEY, word TEXT, stem TEXT, lang TEXT, category INTEGER, timestamp INTEGER, profileid TEXT);
             CREATE TABLE LOOKUPS (id TEXT PRIMARY KEY, word_key TEXT, book_key TEXT, dict_key TEXT, pos TEXT, usage TEXT, timestamp INTEGER);",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO BOOK_INFO (id, guid, title, authors) VALUES (?, ?, ?, ?)",
            params!["B1", "G1", "Dune", "Frank Herbert"],
        )
        .unwrap();
        for (id, word, ts) in [("en:spice", "spice", 1_688_437_815_000_i64), ("en:sietch", "sietch", 1_688_437_900_000)] {
            conn.execute(
                "INSERT INTO WORDS (id, word, stem, category, timestamp) VALUES (?, ?, ?, 0, ?)",
                params![id, word, word, ts],
            )
            .unwrap();
        }
        for (id, word_key, book_key, ts) in [
            ("L1", "en:spice", "B1", 1_688_437_815_000_i64),
            ("L2", "en:spice", "G1", 1_688_437_820_000),
            ("L3", "en:sietch", "unknown", 1_688_437_900_000),
        ] {
            conn.execute(
                "INSERT INTO LOOKUPS (id, word_key, book_key, usage, timestamp) VALUES (?, ?, ?, ?, ?)",
                params![id, word_key, book_key, format!("usage {}", id), ts],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_book_index_first_match_wins() {
        let rows = [book("A", "X", "First"), book("X", "B", "Second"), book("A", "C", "Third")];
        let index = BookIndex::build(&rows);
        // `X` is row 0's guid before it is row 1's id.
        assert_eq!(index.resolve("X").map(|(t, _)| t), Some("First"));
        assert_eq!(index.resolve("A").map(|(t, _)| t), Some("First"));
        assert_eq!(index.resolve("B").map(|(t, _)| t), Some("Second"));
        assert_eq!(index.resolve("C").map(|(t, _)| t), Some("Third"));
        assert_eq!(index.resolve("missing"), None);
    }

    #[test]
    fn test_build_batch_keys_and_resolution() {
        let books = [book("B1", "G1", "Dune")];
        let words = [WordRow {
            id: "en:spice".into(),
            word: "spice".into(),
            stem: "spice".into(),
            category: 0,
            millis: 1_688_437_815_000,
        }];
        let lookups = [
            LookupRow {
                word_key: "en:spice".into(),
                book_key: "G1".into(),
                usage: "The spice must flow".into(),
                millis: 1_688_437_815_000,
            },
            LookupRow {
                word_key: "en:spice".into(),
                book_key: "nowhere".into(),
                usage: "again".into(),
                millis: 1_688_437_816_000,
            },
        ];
        let batch = build_batch(&books, &words, &lookups);
        assert_eq!(batch.words[0].id, "spice1688437815000");
        assert_eq!(batch.words[0].word_key, "en:spice");
        assert_eq!(batch.words[0].frequency, 0);
        assert_eq!(batch.words[0].timestamp, keys::format_millis_local(1_688_437_815_000));
        assert_eq!(batch.lookups[0].title, "Dune");
        assert_eq!(batch.lookups[0].authors, "Dune author");
        assert_eq!(batch.lookups[1].title, "");
        assert_eq!(batch.lookups[1].authors, "");
    }

    #[test]
    fn test_read_vocab_db() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocab.db");
        write_device_db(&path);
        let batch = read_vocab_db(&path).unwrap();
        assert_eq!(batch.words.len(), 2);
        assert_eq!(batch.lookups.len(), 3);
        assert_eq!(batch.lookups[0].title, "Dune");
        assert_eq!(batch.lookups[1].authors, "Frank Herbert");
        assert_eq!(batch.lookups[2].title, "");
    }

    #[test]
    fn test_read_vocab_db_missing_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocab.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE WORDS (id TEXT);").unwrap();
        drop(conn);
        assert!(matches!(read_vocab_db(&path), Err(KmError::SourceUnavailable(_))));
    }

    #[test]
    fn test_read_vocab_db_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_vocab_db(&dir.path().join("vocab.db")),
            Err(KmError::SourceUnavailable(_))
        ));
    }
}
