pub mod models;
pub mod schema;
pub mod sqlite;

use tracing::warn;

use crate::errors::Result;
use models::{
    BookSummary, Clipping, ClippingFilter, LookupEntry, OriginalClipping, StoreStats, VocabEntry,
};

/// The canonical store every import merges into.
///
/// Existence checks, inserts and deletes are per entity; nothing here
/// enforces the clipping/original or vocab/lookup relationships, callers do.
pub trait AnnotationStore {
    fn clipping_exists(&self, key: &str) -> Result<bool>;
    fn clipping_content_exists(&self, content: &str) -> Result<bool>;
    fn insert_clipping(&self, clipping: &Clipping) -> Result<usize>;
    fn get_clipping(&self, key: &str) -> Result<Clipping>;
    fn clippings(&self) -> Result<Vec<Clipping>>;
    fn list_clippings(&self, filter: &ClippingFilter) -> Result<Vec<Clipping>>;
    fn update_clipping_content(&self, key: &str, content: &str) -> Result<bool>;
    fn rename_book(&self, book_name: &str, new_title: &str, new_author: &str) -> Result<usize>;
    fn delete_clipping(&self, key: &str) -> Result<bool>;
    fn delete_clippings_by_book(&self, book_name: &str) -> Result<usize>;
    fn books(&self) -> Result<Vec<BookSummary>>;

    fn original_exists(&self, key: &str) -> Result<bool>;
    fn insert_original(&self, original: &OriginalClipping) -> Result<usize>;
    fn original_clippings(&self) -> Result<Vec<OriginalClipping>>;

    fn vocab_exists(&self, id: &str) -> Result<bool>;
    fn insert_vocab(&self, entry: &VocabEntry) -> Result<usize>;
    fn vocab_entries(&self) -> Result<Vec<VocabEntry>>;
    fn set_vocab_frequency(&self, id: &str, frequency: i64) -> Result<()>;
    fn delete_vocab_by_word(&self, word: &str) -> Result<usize>;

    fn lookup_exists(&self, timestamp: &str) -> Result<bool>;
    fn insert_lookup(&self, lookup: &LookupEntry) -> Result<usize>;
    fn lookups(&self) -> Result<Vec<LookupEntry>>;
    fn rename_lookup_book(&self, title: &str, new_title: &str, new_authors: &str) -> Result<usize>;
    fn delete_lookup(&self, timestamp: &str) -> Result<bool>;
    fn delete_lookups_by_word_key(&self, word_key: &str) -> Result<usize>;

    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;

    /// Reclaims free pages after deletes.
    fn vacuum(&self) -> Result<()>;
    fn clear_all(&self) -> Result<()>;
    fn stats(&self) -> Result<StoreStats>;

    /// Runs `f` inside one transaction: commit on `Ok`, roll back on `Err`.
    fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T>,
    {
        self.begin()?;
        let outcome = f(self).and_then(|value| self.commit().map(|()| value));
        if outcome.is_err()
            && let Err(e) = self.rollback()
        {
            warn!("rollback failed: {}", e);
        }
        outcome
    }
}
