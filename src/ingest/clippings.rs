//! Parser for the device's plain-text `My Clippings.txt` export.
//!
//! The format has no grammar: blocks are separated by a line of ten `=`,
//! the first line carries `Title (Author)`, the second a pipe-delimited
//! kind/location/date line whose layout depends on firmware language, and
//! everything after the blank third line is the body.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{dates, pages};
use crate::keys;
use crate::storage::models::{Clipping, ClippingKind, OriginalClipping};

pub const DELIMITER: &str = "==========";

const NOTE_MARKERS: [&str; 2] = ["笔记", "Note"];

static AUTHOR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]+)\)[^(]*$").expect("valid author regex"));

/// One delimiter-terminated block, parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    pub original: OriginalClipping,
    pub clipping: Clipping,
}

#[derive(Debug, Default)]
pub struct ClippingsBatch {
    pub blocks: Vec<ParsedBlock>,
    /// Number of delimiter lines seen, malformed blocks included.
    pub delimiters: usize,
    pub malformed: usize,
}

/// Splits `Title (Author)` into its parts. Without a trailing parenthesis
/// the whole header is the title.
pub fn split_title_author(header: &str) -> (String, String) {
    match AUTHOR_SUFFIX.captures(header) {
        Some(caps) => {
            let author = caps[1].trim().to_string();
            let whole = caps[0].trim();
            let title = header.replace(whole, "").trim().to_string();
            (title, author)
        }
        None => (header.to_string(), String::new()),
    }
}

pub fn classify(metadata: &str) -> ClippingKind {
    if NOTE_MARKERS.iter().any(|marker| metadata.contains(marker)) {
        ClippingKind::Note
    } else {
        ClippingKind::Highlight
    }
}

/// Text of the first segment after its first `-`.
pub fn location_of(first_segment: &str) -> String {
    match first_segment.find('-') {
        Some(idx) if idx + 1 < first_segment.len() => first_segment[idx + 1..].trim().to_string(),
        _ => String::new(),
    }
}

/// Parses one block. `lines` excludes the delimiter.
fn parse_block(lines: &[&str], import_date: &str) -> Option<ParsedBlock> {
    if lines.len() < 2 {
        return None;
    }
    let header = lines[0].trim();
    let metadata = lines[1].trim();
    let spacer = lines.get(2).map(|l| l.trim()).unwrap_or_default();
    let body = lines.get(3..).map(|rest| rest.join("\n")).unwrap_or_default();

    let segments: Vec<&str> = metadata.split('|').collect();
    let location = location_of(segments[0]);
    let page_number = pages::page_number(&location);
    let time = dates::extract_timestamp(&segments);
    let key = keys::clipping_key(&time, &location);
    let (book_name, author_name) = split_title_author(header);

    Some(ParsedBlock {
        original: OriginalClipping {
            key: key.clone(),
            line1: header.to_string(),
            line2: metadata.to_string(),
            line3: spacer.to_string(),
            line4: body.clone(),
            line5: DELIMITER.to_string(),
        },
        clipping: Clipping {
            key,
            content: body,
            book_name,
            author_name,
            kind: classify(metadata),
            location,
            date: time,
            read: 0,
            import_date: import_date.to_string(),
            tag: String::new(),
            sync: 0,
            new_book_name: String::new(),
            color_rgb: 0,
            page_number,
        },
    })
}

/// Segments and interprets a whole export. Does not touch any store.
pub fn parse_clippings(text: &str, import_date: &str) -> ClippingsBatch {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text.lines().collect();

    let mut batch = ClippingsBatch::default();
    let mut start = 0;
    for (idx, line) in lines.iter().enumerate() {
        if line.trim() != DELIMITER {
            continue;
        }
        batch.delimiters += 1;
        match parse_block(&lines[start..idx], import_date) {
            Some(block) => batch.blocks.push(block),
            None => {
                batch.malformed += 1;
                debug!("skipping malformed clipping block at line {}", start + 1);
            }
        }
        start = idx + 1;
    }
    batch
}
