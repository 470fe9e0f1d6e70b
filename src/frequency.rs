use std::collections::HashMap;

use tracing::debug;

use crate::errors::Result;
use crate::storage::AnnotationStore;

/// Recomputes every word's frequency as the number of lookups pointing at
/// its `word_key`. A full pass in one transaction; on failure the previous
/// frequencies stay in place.
///
/// Returns the number of vocab rows updated.
pub fn recalculate<S: AnnotationStore>(store: &S) -> Result<usize> {
    store.in_transaction(|store| {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for lookup in store.lookups()? {
            *counts.entry(lookup.word_key.trim().to_string()).or_default() += 1;
        }

        let entries = store.vocab_entries()?;
        for entry in &entries {
            let frequency = counts.get(entry.word_key.as_str()).copied().unwrap_or(0);
            store.set_vocab_frequency(&entry.id, frequency)?;
        }
        debug!("recounted {} words from {} lookup keys", entries.len(), counts.len());
        Ok(entries.len())
    })
}
