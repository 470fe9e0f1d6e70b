use serde::Serialize;

/// `brieftype` column: what kind of annotation a clipping is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClippingKind {
    Highlight,
    Note,
    /// A code this program does not write, carried through unchanged.
    Other(i64),
}

impl ClippingKind {
    pub fn as_i64(self) -> i64 {
        match self {
            ClippingKind::Highlight => 0,
            ClippingKind::Note => 1,
            ClippingKind::Other(code) => code,
        }
    }

    pub fn from_i64(value: i64) -> ClippingKind {
        match value {
            0 => ClippingKind::Highlight,
            1 => ClippingKind::Note,
            code => ClippingKind::Other(code),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClippingKind::Highlight => "highlight",
            ClippingKind::Note => "note",
            ClippingKind::Other(_) => "other",
        }
    }

    pub fn parse(s: &str) -> Option<ClippingKind> {
        match s {
            "highlight" => Some(ClippingKind::Highlight),
            "note" => Some(ClippingKind::Note),
            _ => None,
        }
    }
}

/// The verbatim block a clipping was parsed from. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginalClipping {
    pub key: String,
    pub line1: String,
    pub line2: String,
    pub line3: String,
    pub line4: String,
    pub line5: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clipping {
    pub key: String,
    pub content: String,
    pub book_name: String,
    pub author_name: String,
    pub kind: ClippingKind,
    pub location: String,
    pub date: String,
    pub read: i64,
    pub import_date: String,
    pub tag: String,
    pub sync: i64,
    pub new_book_name: String,
    pub color_rgb: i64,
    pub page_number: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabEntry {
    /// Dedup key.
    pub id: String,
    /// Device word identifier that lookups point at.
    pub word_key: String,
    pub word: String,
    pub stem: String,
    pub category: i64,
    pub timestamp: String,
    pub frequency: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupEntry {
    pub word_key: String,
    pub usage: String,
    pub title: String,
    pub authors: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSummary {
    pub book_name: String,
    pub author_name: String,
    pub clippings: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct StoreStats {
    pub clippings: i64,
    pub books: i64,
    pub originals: i64,
    pub vocabs: i64,
    pub lookups: i64,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}

#[derive(Debug, Default)]
pub struct ClippingFilter {
    pub book_name: Option<String>,
    pub kind: Option<ClippingKind>,
    pub limit: i64,
    pub offset: i64,
}

impl ClippingFilter {
    pub fn effective_limit(&self) -> i64 {
        if self.limit <= 0 { 50 } else { self.limit }
    }
}
