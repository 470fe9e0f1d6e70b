use rusqlite::{Connection, OptionalExtension, Row, params};

use super::AnnotationStore;
use super::models::{
    BookSummary, Clipping, ClippingFilter, ClippingKind, LookupEntry, OriginalClipping,
    StoreStats, VocabEntry,
};
use super::schema;
use crate::errors::{KmError, Result};
use crate::hash::hash_content;

const CLIPPING_COLUMNS: &str = "
    key, content, bookname, authorname, brieftype, clippingtypelocation, clippingdate,
    read, clipping_importdate, tag, sync, newbookname, colorRGB, pagenumber
";

pub struct SqliteStorage {
    conn: Connection,
}

fn row_to_clipping(row: &Row) -> rusqlite::Result<Clipping> {
    let brief_type: i64 = row.get(4)?;
    Ok(Clipping {
        key: row.get(0)?,
        content: row.get(1)?,
        book_name: row.get(2)?,
        author_name: row.get(3)?,
        kind: ClippingKind::from_i64(brief_type),
        location: row.get(5)?,
        date: row.get(6)?,
        read: row.get(7)?,
        import_date: row.get(8)?,
        tag: row.get(9)?,
        sync: row.get(10)?,
        new_book_name: row.get(11)?,
        color_rgb: row.get(12)?,
        page_number: row.get(13)?,
    })
}

fn row_to_original(row: &Row) -> rusqlite::Result<OriginalClipping> {
    Ok(OriginalClipping {
        key: row.get(0)?,
        line1: row.get(1)?,
        line2: row.get(2)?,
        line3: row.get(3)?,
        line4: row.get(4)?,
        line5: row.get(5)?,
    })
}

fn row_to_vocab(row: &Row) -> rusqlite::Result<VocabEntry> {
    Ok(VocabEntry {
        id: row.get(0)?,
        word_key: row.get(1)?,
        word: row.get(2)?,
        stem: row.get(3)?,
        category: row.get(4)?,
        timestamp: row.get(5)?,
        frequency: row.get(6)?,
    })
}

fn row_to_lookup(row: &Row) -> rusqlite::Result<LookupEntry> {
    Ok(LookupEntry {
        word_key: row.get(0)?,
        usage: row.get(1)?,
        title: row.get(2)?,
        authors: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

impl SqliteStorage {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute(schema::CREATE_CLIPPINGS_TABLE, [])?;
        conn.execute(schema::CREATE_ORIGINAL_LINES_TABLE, [])?;
        conn.execute(schema::CREATE_LOOKUPS_TABLE, [])?;
        conn.execute(schema::CREATE_VOCAB_TABLE, [])?;
        conn.execute(schema::CREATE_INDEX_CONTENT_HASH, [])?;
        conn.execute(schema::CREATE_INDEX_BOOKNAME, [])?;
        conn.execute(schema::CREATE_INDEX_LOOKUP_TIMESTAMP, [])?;
        conn.execute(schema::CREATE_INDEX_LOOKUP_WORD_KEY, [])?;
        conn.execute(schema::CREATE_INDEX_VOCAB_WORD, [])?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::new(conn)
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&str> {
        self.conn.path().filter(|p| !p.is_empty())
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn exists(&self, sql: &str, value: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(sql, params![value], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn count(&self, sql: &str) -> Result<i64> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }
}

impl AnnotationStore for SqliteStorage {
    fn clipping_exists(&self, key: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM clippings WHERE key = ? LIMIT 1", key)
    }

    fn clipping_content_exists(&self, content: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM clippings WHERE content_hash = ? AND content = ? LIMIT 1",
                params![hash_content(content.as_bytes()), content],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_clipping(&self, clipping: &Clipping) -> Result<usize> {
        let changes = self.conn.execute(
            "INSERT INTO clippings (key, content, bookname, authorname, brieftype,
                clippingtypelocation, clippingdate, read, clipping_importdate, tag, sync,
                newbookname, colorRGB, pagenumber, content_hash)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                clipping.key,
                clipping.content,
                clipping.book_name,
                clipping.author_name,
                clipping.kind.as_i64(),
                clipping.location,
                clipping.date,
                clipping.read,
                clipping.import_date,
                clipping.tag,
                clipping.sync,
                clipping.new_book_name,
                clipping.color_rgb,
                clipping.page_number,
                hash_content(clipping.content.as_bytes()),
            ],
        )?;
        Ok(changes)
    }

    fn get_clipping(&self, key: &str) -> Result<Clipping> {
        let sql = format!("SELECT {} FROM clippings WHERE key = ?", CLIPPING_COLUMNS);
        self.conn
            .query_row(&sql, params![key], row_to_clipping)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    KmError::NotFound(format!("Clipping with key {} not found", key))
                }
                other => KmError::Storage(other),
            })
    }

    fn clippings(&self) -> Result<Vec<Clipping>> {
        let sql = format!("SELECT {} FROM clippings ORDER BY key", CLIPPING_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let clippings = stmt
            .query_map([], row_to_clipping)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(clippings)
    }

    fn list_clippings(&self, filter: &ClippingFilter) -> Result<Vec<Clipping>> {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref book) = filter.book_name {
            conditions.push("bookname = ?");
            param_values.push(Box::new(book.clone()));
        }
        if let Some(kind) = filter.kind {
            conditions.push("brieftype = ?");
            param_values.push(Box::new(kind.as_i64()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM clippings {} ORDER BY clippingdate DESC, key DESC LIMIT ? OFFSET ?",
            CLIPPING_COLUMNS, where_clause
        );

        param_values.push(Box::new(filter.effective_limit()));
        param_values.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let clippings = stmt
            .query_map(param_refs.as_slice(), row_to_clipping)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(clippings)
    }

    fn update_clipping_content(&self, key: &str, content: &str) -> Result<bool> {
        let changes = self.conn.execute(
            "UPDATE clippings SET content = ?, content_hash = ? WHERE key = ?",
            params![content, hash_content(content.as_bytes()), key],
        )?;
        Ok(changes > 0)
    }

    fn rename_book(&self, book_name: &str, new_title: &str, new_author: &str) -> Result<usize> {
        let changes = self.conn.execute(
            "UPDATE clippings SET bookname = ?, authorname = ?, newbookname = ? WHERE bookname = ?",
            params![new_title, new_author, new_title, book_name],
        )?;
        Ok(changes)
    }

    fn delete_clipping(&self, key: &str) -> Result<bool> {
        let changes = self
            .conn
            .execute("DELETE FROM clippings WHERE key = ?", params![key])?;
        Ok(changes > 0)
    }

    fn delete_clippings_by_book(&self, book_name: &str) -> Result<usize> {
        let changes = self
            .conn
            .execute("DELETE FROM clippings WHERE bookname = ?", params![book_name])?;
        Ok(changes)
    }

    fn books(&self) -> Result<Vec<BookSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT bookname, MAX(authorname), COUNT(*)
             FROM clippings GROUP BY bookname ORDER BY bookname",
        )?;
        let books = stmt
            .query_map([], |row| {
                Ok(BookSummary {
                    book_name: row.get(0)?,
                    author_name: row.get(1)?,
                    clippings: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(books)
    }

    fn original_exists(&self, key: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM original_clipping_lines WHERE key = ? LIMIT 1",
            key,
        )
    }

    fn insert_original(&self, original: &OriginalClipping) -> Result<usize> {
        let changes = self.conn.execute(
            "INSERT INTO original_clipping_lines (key, line1, line2, line3, line4, line5)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                original.key,
                original.line1,
                original.line2,
                original.line3,
                original.line4,
                original.line5,
            ],
        )?;
        Ok(changes)
    }

    fn original_clippings(&self) -> Result<Vec<OriginalClipping>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, line1, line2, line3, line4, line5
             FROM original_clipping_lines ORDER BY key",
        )?;
        let originals = stmt
            .query_map([], row_to_original)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(originals)
    }

    fn vocab_exists(&self, id: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM vocab WHERE id = ? LIMIT 1", id)
    }

    fn insert_vocab(&self, entry: &VocabEntry) -> Result<usize> {
        let changes = self.conn.execute(
            "INSERT INTO vocab (id, word_key, word, stem, category, timestamp, frequency)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.id,
                entry.word_key,
                entry.word,
                entry.stem,
                entry.category,
                entry.timestamp,
                entry.frequency,
            ],
        )?;
        Ok(changes)
    }

    fn vocab_entries(&self) -> Result<Vec<VocabEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, word_key, word, stem, category, timestamp, frequency
             FROM vocab ORDER BY timestamp DESC, id",
        )?;
        let entries = stmt
            .query_map([], row_to_vocab)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn set_vocab_frequency(&self, id: &str, frequency: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE vocab SET frequency = ? WHERE id = ?",
            params![frequency, id],
        )?;
        Ok(())
    }

    fn delete_vocab_by_word(&self, word: &str) -> Result<usize> {
        let changes = self
            .conn
            .execute("DELETE FROM vocab WHERE word = ?", params![word])?;
        Ok(changes)
    }

    fn lookup_exists(&self, timestamp: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM lookups WHERE timestamp = ? LIMIT 1", timestamp)
    }

    fn insert_lookup(&self, lookup: &LookupEntry) -> Result<usize> {
        let changes = self.conn.execute(
            "INSERT INTO lookups (word_key, usage, title, authors, timestamp)
             VALUES (?, ?, ?, ?, ?)",
            params![
                lookup.word_key,
                lookup.usage,
                lookup.title,
                lookup.authors,
                lookup.timestamp,
            ],
        )?;
        Ok(changes)
    }

    fn lookups(&self) -> Result<Vec<LookupEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT word_key, usage, title, authors, timestamp
             FROM lookups ORDER BY timestamp DESC",
        )?;
        let lookups = stmt
            .query_map([], row_to_lookup)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lookups)
    }

    fn rename_lookup_book(&self, title: &str, new_title: &str, new_authors: &str) -> Result<usize> {
        let changes = self.conn.execute(
            "UPDATE lookups SET title = ?, authors = ? WHERE title = ?",
            params![new_title, new_authors, title],
        )?;
        Ok(changes)
    }

    fn delete_lookup(&self, timestamp: &str) -> Result<bool> {
        let changes = self
            .conn
            .execute("DELETE FROM lookups WHERE timestamp = ?", params![timestamp])?;
        Ok(changes > 0)
    }

    fn delete_lookups_by_word_key(&self, word_key: &str) -> Result<usize> {
        let changes = self
            .conn
            .execute("DELETE FROM lookups WHERE word_key = ?", params![word_key])?;
        Ok(changes)
    }

    fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM")?;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM clippings;
             DELETE FROM original_clipping_lines;
             DELETE FROM lookups;
             DELETE FROM vocab;",
        )?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let (oldest, newest) = self.conn.query_row(
            "SELECT MIN(NULLIF(clippingdate, '')), MAX(NULLIF(clippingdate, '')) FROM clippings",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StoreStats {
            clippings: self.count("SELECT COUNT(*) FROM clippings")?,
            books: self.count("SELECT COUNT(DISTINCT bookname) FROM clippings")?,
            originals: self.count("SELECT COUNT(*) FROM original_clipping_lines")?,
            vocabs: self.count("SELECT COUNT(*) FROM vocab")?,
            lookups: self.count("SELECT COUNT(*) FROM lookups")?,
            oldest,
            newest,
        })
    }
}
