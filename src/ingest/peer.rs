//! Reader for another installation's store file (`KM2.dat`).
//!
//! Rows are taken verbatim. Columns are read leniently since snapshots come
//! from older releases with looser typing.

use std::path::Path;

use rusqlite::types::Value;

use super::{int_of, open_source, read_rows, require_tables, text_of};
use crate::errors::Result;
use crate::storage::models::{Clipping, ClippingKind, LookupEntry, OriginalClipping, VocabEntry};
use crate::storage::schema::PEER_TABLES;

#[derive(Debug, Default)]
pub struct PeerSnapshot {
    pub clippings: Vec<Clipping>,
    pub originals: Vec<OriginalClipping>,
    pub lookups: Vec<LookupEntry>,
    pub vocabs: Vec<VocabEntry>,
}

fn clipping(v: &[Value]) -> Clipping {
    Clipping {
        key: text_of(&v[0]),
        content: text_of(&v[1]),
        book_name: text_of(&v[2]),
        author_name: text_of(&v[3]),
        kind: ClippingKind::from_i64(int_of(&v[4])),
        location: text_of(&v[5]),
        date: text_of(&v[6]),
        read: int_of(&v[7]),
        import_date: text_of(&v[8]),
        tag: text_of(&v[9]),
        sync: int_of(&v[10]),
        new_book_name: text_of(&v[11]),
        color_rgb: int_of(&v[12]),
        page_number: int_of(&v[13]),
    }
}

fn original(v: &[Value]) -> OriginalClipping {
    OriginalClipping {
        key: text_of(&v[0]),
        line1: text_of(&v[1]),
        line2: text_of(&v[2]),
        line3: text_of(&v[3]),
        line4: text_of(&v[4]),
        line5: text_of(&v[5]),
    }
}

fn lookup(v: &[Value]) -> LookupEntry {
    LookupEntry {
        word_key: text_of(&v[0]),
        usage: text_of(&v[1]),
        title: text_of(&v[2]),
        authors: text_of(&v[3]),
        timestamp: text_of(&v[4]),
    }
}

fn vocab(v: &[Value]) -> VocabEntry {
    VocabEntry {
        id: text_of(&v[0]),
        word_key: text_of(&v[1]),
        word: text_of(&v[2]),
        stem: text_of(&v[3]),
        category: int_of(&v[4]),
        timestamp: text_of(&v[5]),
        frequency: int_of(&v[6]),
    }
}

pub fn read_snapshot(path: &Path) -> Result<PeerSnapshot> {
    let conn = open_source(path)?;
    require_tables(&conn, &PEER_TABLES)?;

    let clippings = read_rows(
        &conn,
        "SELECT key, content, bookname, authorname, brieftype, clippingtypelocation,
                clippingdate, read, clipping_importdate, tag, sync, newbookname,
                colorRGB, pagenumber
         FROM clippings",
    )?;
    let originals = read_rows(
        &conn,
        "SELECT key, line1, line2, line3, line4, line5 FROM original_clipping_lines",
    )?;
    let lookups = read_rows(
        &conn,
        "SELECT word_key, usage, title, authors, timestamp FROM lookups",
    )?;
    let vocabs = read_rows(
        &conn,
        "SELECT id, word_key, word, stem, category, timestamp, frequency FROM vocab",
    )?;

    Ok(PeerSnapshot {
        clippings: clippings.iter().map(|r| clipping(r)).collect(),
        originals: originals.iter().map(|r| original(r)).collect(),
        lookups: lookups.iter().map(|r| lookup(r)).collect(),
        vocabs: vocabs.iter().map(|r| vocab(r)).collect(),
    })
}
