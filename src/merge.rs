//! Transactional dedup-and-insert of parsed batches into the store.
//!
//! Every merge is one transaction. A failure part way rolls the whole batch
//! back and is reported through the summary rather than as an error, so a
//! caller importing several sources in sequence keeps going.

use tracing::{debug, warn};

use crate::errors::Result;
use crate::ingest::clippings::ClippingsBatch;
use crate::ingest::peer::PeerSnapshot;
use crate::ingest::vocab::VocabBatch;
use crate::ingest::{EntityCounts, ImportSummary, SourceKind};
use crate::keys;
use crate::storage::AnnotationStore;
use crate::storage::models::{Clipping, LookupEntry, VocabEntry};

#[derive(Debug, Default)]
struct Tally {
    inserted: EntityCounts,
    skipped: usize,
}

fn finish<S: AnnotationStore>(
    store: &S,
    source: SourceKind,
    parsed: EntityCounts,
    merge: impl FnOnce(&S) -> Result<Tally>,
) -> ImportSummary {
    match store.in_transaction(merge) {
        Ok(tally) => ImportSummary {
            source,
            parsed,
            inserted: tally.inserted,
            skipped: tally.skipped,
            committed: true,
        },
        Err(e) => {
            warn!("{:?} import rolled back: {}", source, e);
            ImportSummary::rolled_back(source, parsed)
        }
    }
}

/// A clipping is new when its key is unseen, its body is not blank and no
/// stored clipping has byte-equal content.
fn clipping_is_new<S: AnnotationStore>(store: &S, clipping: &Clipping) -> Result<bool> {
    if clipping.content.trim().is_empty() {
        return Ok(false);
    }
    Ok(!store.clipping_exists(&clipping.key)? && !store.clipping_content_exists(&clipping.content)?)
}

fn merge_lookup<S: AnnotationStore>(store: &S, lookup: &LookupEntry, tally: &mut Tally) -> Result<()> {
    if store.lookup_exists(keys::lookup_key(&lookup.timestamp))? {
        tally.skipped += 1;
    } else {
        tally.inserted.lookups += store.insert_lookup(lookup)?;
    }
    Ok(())
}

fn merge_vocab<S: AnnotationStore>(store: &S, entry: &VocabEntry, tally: &mut Tally) -> Result<()> {
    if store.vocab_exists(&entry.id)? {
        tally.skipped += 1;
    } else {
        tally.inserted.vocabs += store.insert_vocab(entry)?;
    }
    Ok(())
}

pub fn merge_clippings<S: AnnotationStore>(store: &S, batch: &ClippingsBatch) -> ImportSummary {
    let parsed = EntityCounts {
        clippings: batch.delimiters,
        originals: batch.blocks.len(),
        ..Default::default()
    };
    finish(store, SourceKind::Clippings, parsed, |store| {
        let mut tally = Tally::default();
        for block in &batch.blocks {
            let key = &block.original.key;
            if store.original_exists(key)? || block.clipping.content.trim().is_empty() {
                debug!("skipping clipping block {}", key);
                tally.skipped += 1;
                continue;
            }
            tally.inserted.originals += store.insert_original(&block.original)?;
            // The original is kept even when the clipping itself is a duplicate.
            if clipping_is_new(store, &block.clipping)? {
                tally.inserted.clippings += store.insert_clipping(&block.clipping)?;
            } else {
                tally.skipped += 1;
            }
        }
        Ok(tally)
    })
}

/// Words first, then lookups.
pub fn merge_vocabulary<S: AnnotationStore>(store: &S, batch: &VocabBatch) -> ImportSummary {
    let parsed = EntityCounts {
        lookups: batch.lookups.len(),
        vocabs: batch.words.len(),
        ..Default::default()
    };
    finish(store, SourceKind::Vocabulary, parsed, |store| {
        let mut tally = Tally::default();
        for entry in &batch.words {
            merge_vocab(store, entry, &mut tally)?;
        }
        for lookup in &batch.lookups {
            merge_lookup(store, lookup, &mut tally)?;
        }
        Ok(tally)
    })
}

pub fn merge_peer<S: AnnotationStore>(store: &S, snapshot: &PeerSnapshot) -> ImportSummary {
    let parsed = EntityCounts {
        clippings: snapshot.clippings.len(),
        originals: snapshot.originals.len(),
        lookups: snapshot.lookups.len(),
        vocabs: snapshot.vocabs.len(),
    };
    finish(store, SourceKind::Peer, parsed, |store| {
        let mut tally = Tally::default();
        for clipping in &snapshot.clippings {
            if clipping_is_new(store, clipping)? {
                tally.inserted.clippings += store.insert_clipping(clipping)?;
            } else {
                tally.skipped += 1;
            }
        }
        for original in &snapshot.originals {
            if original.line4.trim().is_empty() || store.original_exists(&original.key)? {
                tally.skipped += 1;
            } else {
                tally.inserted.originals += store.insert_original(original)?;
            }
        }
        for lookup in &snapshot.lookups {
            merge_lookup(store, lookup, &mut tally)?;
        }
        for entry in &snapshot.vocabs {
            merge_vocab(store, entry, &mut tally)?;
        }
        Ok(tally)
    })
}
