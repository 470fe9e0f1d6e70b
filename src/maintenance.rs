//! Edits and housekeeping on an existing store: cleanup, renames, deletes
//! and re-export of the original clipping lines.
//!
//! Unlike imports, these propagate transaction failures to the caller.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::errors::{KmError, Result};
use crate::frequency;
use crate::storage::AnnotationStore;

const LEADING_NOISE: [char; 4] = [' ', '.', '，', '。'];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub emptied: usize,
    pub trimmed: usize,
    pub bytes_reclaimed: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub clippings: usize,
    pub lookups: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct WordDeletion {
    pub vocabs: usize,
    pub lookups: usize,
}

/// Strips the punctuation the device leaves at the start of highlights that
/// began mid-sentence.
pub fn trim_leading_noise(content: &str) -> &str {
    content.trim_start_matches(LEADING_NOISE).trim()
}

fn file_size(path: Option<&Path>) -> u64 {
    path.and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0)
}

/// Trims every clipping, deletes the ones left empty, then vacuums.
/// `db_file` is the backing file, if any, used to measure reclaimed space.
pub fn clean_database<S: AnnotationStore>(store: &S, db_file: Option<&Path>) -> Result<CleanReport> {
    let before = file_size(db_file);
    let mut report = store.in_transaction(|store| {
        let mut report = CleanReport::default();
        for clipping in store.clippings()? {
            let cleaned = trim_leading_noise(&clipping.content);
            if cleaned.is_empty() {
                store.delete_clipping(&clipping.key)?;
                report.emptied += 1;
            } else if cleaned != clipping.content {
                store.update_clipping_content(&clipping.key, cleaned)?;
                report.trimmed += 1;
            }
        }
        Ok(report)
    })?;
    store.vacuum()?;
    report.bytes_reclaimed = before.saturating_sub(file_size(db_file));
    info!(
        "cleaned store: {} emptied, {} trimmed, {} bytes reclaimed",
        report.emptied, report.trimmed, report.bytes_reclaimed
    );
    Ok(report)
}

/// Renames a book across clippings and lookups. A blank `new_author` keeps
/// the current author.
pub fn rename_book<S: AnnotationStore>(
    store: &S,
    book_name: &str,
    new_title: &str,
    new_author: &str,
) -> Result<RenameReport> {
    let new_title = new_title.trim();
    if new_title.is_empty() {
        return Err(KmError::InvalidInput("book title cannot be empty".into()));
    }
    let current = store
        .books()?
        .into_iter()
        .find(|b| b.book_name == book_name)
        .ok_or_else(|| KmError::NotFound(format!("book {}", book_name)))?;

    let author = match new_author.trim() {
        "" => current.author_name.as_str(),
        author => author,
    };
    if new_title == book_name && author == current.author_name {
        return Err(KmError::InvalidInput("nothing to rename".into()));
    }

    let report = store.in_transaction(|store| {
        Ok(RenameReport {
            clippings: store.rename_book(book_name, new_title, author)?,
            lookups: store.rename_lookup_book(book_name, new_title, author)?,
        })
    })?;
    info!("renamed {} to {} ({} clippings)", book_name, new_title, report.clippings);
    Ok(report)
}

pub fn edit_content<S: AnnotationStore>(store: &S, key: &str, content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(KmError::InvalidInput("content cannot be empty".into()));
    }
    let updated = store.in_transaction(|store| store.update_clipping_content(key, content))?;
    if !updated {
        return Err(KmError::NotFound(format!("clipping {}", key)));
    }
    Ok(())
}

pub fn delete_clipping<S: AnnotationStore>(store: &S, key: &str) -> Result<()> {
    if !store.in_transaction(|store| store.delete_clipping(key))? {
        return Err(KmError::NotFound(format!("clipping {}", key)));
    }
    Ok(())
}

pub fn delete_book<S: AnnotationStore>(store: &S, book_name: &str) -> Result<usize> {
    let deleted = store.in_transaction(|store| store.delete_clippings_by_book(book_name))?;
    if deleted == 0 {
        return Err(KmError::NotFound(format!("book {}", book_name)));
    }
    info!("deleted {} clippings of {}", deleted, book_name);
    Ok(deleted)
}

pub fn delete_lookup<S: AnnotationStore>(store: &S, timestamp: &str) -> Result<()> {
    if !store.in_transaction(|store| store.delete_lookup(timestamp))? {
        return Err(KmError::NotFound(format!("lookup at {}", timestamp)));
    }
    frequency::recalculate(store)?;
    Ok(())
}

/// Deletes a word's vocab rows and every lookup of it, then recounts.
pub fn delete_word<S: AnnotationStore>(store: &S, word: &str) -> Result<WordDeletion> {
    let mut word_keys: Vec<String> = store
        .vocab_entries()?
        .into_iter()
        .filter(|v| v.word == word)
        .map(|v| v.word_key)
        .collect();
    if word_keys.is_empty() {
        return Err(KmError::NotFound(format!("word {}", word)));
    }
    word_keys.sort();
    word_keys.dedup();

    let deletion = store.in_transaction(|store| {
        let mut deletion = WordDeletion {
            vocabs: store.delete_vocab_by_word(word)?,
            lookups: 0,
        };
        for word_key in &word_keys {
            deletion.lookups += store.delete_lookups_by_word_key(word_key)?;
        }
        Ok(deletion)
    })?;
    frequency::recalculate(store)?;
    Ok(deletion)
}

/// Empties all four tables and compacts the file.
pub fn clear_all<S: AnnotationStore>(store: &S) -> Result<()> {
    store.in_transaction(|store| store.clear_all())?;
    store.vacuum()?;
    info!("cleared store");
    Ok(())
}

/// Writes the stored original blocks back out in clippings-file layout,
/// ordered by key. Returns the number of blocks written.
pub fn export_originals<S: AnnotationStore, W: Write>(store: &S, writer: &mut W) -> Result<usize> {
    let originals = store.original_clippings()?;
    for original in &originals {
        for line in [
            &original.line1,
            &original.line2,
            &original.line3,
            &original.line4,
            &original.line5,
        ] {
            writeln!(writer, "{}", line)?;
        }
    }
    Ok(originals.len())
}

pub fn export_originals_to_path<S: AnnotationStore>(store: &S, path: &Path) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    let written = export_originals(store, &mut writer)?;
    writer.flush()?;
    info!("exported {} original clippings to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::import_clippings_text;
    use crate::storage::sqlite::SqliteStorage;
    use crate::storage::sqlite::tests::{clipping, lookup, test_storage, vocab};
    use rusqlite::Connection;
    use tempfile::TempDir;

    const BLOCKS: &str = "Dune (Frank Herbert)
- Your Highlight on page 12 | Location 180-181 | Added on Tuesday, July 4, 2023 10:30:15 AM

Fear is the mind-killer.
==========
三体 (刘慈欣)
- 您在位置 #1024 的笔记 | 添加于 2023年7月4日星期二 下午3:05:09

这是一条笔记
第二行
==========
";

    #[test]
    fn test_trim_leading_noise() {
        assert_eq!(trim_leading_noise(". and so it began"), "and so it began");
        assert_eq!(trim_leading_noise("。，继续"), "继续");
        assert_eq!(trim_leading_noise(" ..  "), "");
        assert_eq!(trim_leading_noise("untouched."), "untouched.");
    }

    #[test]
    fn test_clean_database() {
        let storage = test_storage();
        storage.insert_clipping(&clipping("a", ". trimmed", "B")).unwrap();
        storage.insert_clipping(&clipping("b", "。", "B")).unwrap();
        storage.insert_clipping(&clipping("c", "fine", "B")).unwrap();

        let report = clean_database(&storage, None).unwrap();
        assert_eq!(report.emptied, 1);
        assert_eq!(report.trimmed, 1);
        assert_eq!(report.bytes_reclaimed, 0);
        assert_eq!(storage.get_clipping("a").unwrap().content, "trimmed");
        assert!(!storage.clipping_exists("b").unwrap());
        // The content index follows the edit.
        assert!(storage.clipping_content_exists("trimmed").unwrap());
    }

    #[test]
    fn test_clean_file_backed_store_reports_reclaimed_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("KM2.dat");
        let storage = SqliteStorage::new(Connection::open(&path).unwrap()).unwrap();
        let filler = "x".repeat(4096);
        for i in 0..50 {
            storage
                .insert_clipping(&clipping(&format!("k{}", i), &format!(". {}{}", i, filler), "B"))
                .unwrap();
        }
        storage.insert_clipping(&clipping("empty", " . ", "B")).unwrap();
        for i in 0..50 {
            storage.delete_clipping(&format!("k{}", i)).unwrap();
        }

        let report = clean_database(&storage, storage.path().map(Path::new)).unwrap();
        assert_eq!(report.emptied, 1);
        assert!(report.bytes_reclaimed > 0);
    }

    #[test]
    fn test_rename_book_updates_clippings_and_lookups() {
        let storage = test_storage();
        storage.insert_clipping(&clipping("a", "one", "Dune")).unwrap();
        storage.insert_clipping(&clipping("b", "two", "Dune")).unwrap();
        storage.insert_lookup(&lookup("en:spice", "2023-01-01 00:00:01")).unwrap();

        let report = rename_book(&storage, "Dune", "Dune (Deluxe)", "").unwrap();
        assert_eq!(report, RenameReport { clippings: 2, lookups: 1 });
        let renamed = storage.get_clipping("a").unwrap();
        assert_eq!(renamed.book_name, "Dune (Deluxe)");
        assert_eq!(renamed.new_book_name, "Dune (Deluxe)");
        assert_eq!(renamed.author_name, "Anon");
        assert_eq!(storage.lookups().unwrap()[0].title, "Dune (Deluxe)");
    }

    #[test]
    fn test_rename_book_author_only() {
        let storage = test_storage();
        storage.insert_clipping(&clipping("a", "one", "Dune")).unwrap();
        rename_book(&storage, "Dune", "Dune", "Frank Herbert").unwrap();
        assert_eq!(storage.get_clipping("a").unwrap().author_name, "Frank Herbert");
    }

    #[test]
    fn test_rename_book_rejects() {
        let storage = test_storage();
        storage.insert_clipping(&clipping("a", "one", "Dune")).unwrap();
        assert!(matches!(
            rename_book(&storage, "Dune", "  ", "x"),
            Err(KmError::InvalidInput(_))
        ));
        assert!(matches!(
            rename_book(&storage, "Dune", "Dune", ""),
            Err(KmError::InvalidInput(_))
        ));
        assert!(matches!(
            rename_book(&storage, "Emma", "Persuasion", ""),
            Err(KmError::NotFound(_))
        ));
    }

    #[test]
    fn test_edit_content() {
        let storage = test_storage();
        storage.insert_clipping(&clipping("a", "one", "Dune")).unwrap();
        edit_content(&storage, "a", "uno").unwrap();
        assert_eq!(storage.get_clipping("a").unwrap().content, "uno");
        assert!(matches!(edit_content(&storage, "a", " "), Err(KmError::InvalidInput(_))));
        assert!(matches!(edit_content(&storage, "zz", "x"), Err(KmError::NotFound(_))));
    }

    #[test]
    fn test_delete_clipping_and_book() {
        let storage = test_storage();
        storage.insert_clipping(&clipping("a", "one", "Dune")).unwrap();
        storage.insert_clipping(&clipping("b", "two", "Dune")).unwrap();
        storage.insert_clipping(&clipping("c", "three", "Emma")).unwrap();

        delete_clipping(&storage, "c").unwrap();
        assert!(matches!(delete_clipping(&storage, "c"), Err(KmError::NotFound(_))));
        assert_eq!(delete_book(&storage, "Dune").unwrap(), 2);
        assert!(matches!(delete_book(&storage, "Dune"), Err(KmError::NotFound(_))));
    }

    #[test]
    fn test_delete_lookup_recounts() {
        let storage = test_storage();
        storage.insert_vocab(&vocab("spice1", "en:spice", "spice")).unwrap();
        storage.insert_lookup(&lookup("en:spice", "2023-01-01 00:00:01")).unwrap();
        storage.insert_lookup(&lookup("en:spice", "2023-01-01 00:00:02")).unwrap();
        frequency::recalculate(&storage).unwrap();

        delete_lookup(&storage, "2023-01-01 00:00:02").unwrap();
        assert_eq!(storage.vocab_entries().unwrap()[0].frequency, 1);
        assert!(matches!(
            delete_lookup(&storage, "2023-01-01 00:00:02"),
            Err(KmError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_word_cascades_to_lookups() {
        let storage = test_storage();
        storage.insert_vocab(&vocab("spice1", "en:spice", "spice")).unwrap();
        storage.insert_vocab(&vocab("sietch1", "en:sietch", "sietch")).unwrap();
        storage.insert_lookup(&lookup("en:spice", "2023-01-01 00:00:01")).unwrap();
        storage.insert_lookup(&lookup("en:sietch", "2023-01-01 00:00:02")).unwrap();

        let deletion = delete_word(&storage, "spice").unwrap();
        assert_eq!(deletion, WordDeletion { vocabs: 1, lookups: 1 });
        let remaining = storage.vocab_entries().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].frequency, 1);
        assert!(matches!(delete_word(&storage, "spice"), Err(KmError::NotFound(_))));
    }

    #[test]
    fn test_export_round_trips_through_parser() {
        let storage = test_storage();
        import_clippings_text(&storage, BLOCKS);

        let mut out = Vec::new();
        assert_eq!(export_originals(&storage, &mut out).unwrap(), 2);
        let exported = String::from_utf8(out).unwrap();

        let fresh = test_storage();
        let summary = import_clippings_text(&fresh, &exported);
        assert_eq!(summary.inserted.clippings, 2);

        let strip = |s: &SqliteStorage| {
            s.clippings()
                .unwrap()
                .into_iter()
                .map(|c| (c.key, c.content, c.book_name, c.author_name, c.kind, c.page_number))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&storage), strip(&fresh));
        assert_eq!(storage.original_clippings().unwrap(), fresh.original_clippings().unwrap());
    }

    #[test]
    fn test_export_to_path() {
        let storage = test_storage();
        import_clippings_text(&storage, BLOCKS);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("My Clippings.txt");
        assert_eq!(export_originals_to_path(&storage, &path).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("==========").count(), 2);
    }

    #[test]
    fn test_clear_all() {
        let storage = test_storage();
        import_clippings_text(&storage, BLOCKS);
        clear_all(&storage).unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.clippings + stats.originals, 0);
    }
}
