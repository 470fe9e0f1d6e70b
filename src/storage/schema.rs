pub const CREATE_CLIPPINGS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS clippings (
        key TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        bookname TEXT NOT NULL DEFAULT '',
        authorname TEXT NOT NULL DEFAULT '',
        brieftype INTEGER NOT NULL DEFAULT 0,
        clippingtypelocation TEXT NOT NULL DEFAULT '',
        clippingdate TEXT NOT NULL DEFAULT '',
        read INTEGER NOT NULL DEFAULT 0,
        clipping_importdate TEXT NOT NULL DEFAULT '',
        tag TEXT NOT NULL DEFAULT '',
        sync INTEGER NOT NULL DEFAULT 0,
        newbookname TEXT NOT NULL DEFAULT '',
        colorRGB INTEGER NOT NULL DEFAULT 0,
        pagenumber INTEGER NOT NULL DEFAULT 0,
        content_hash TEXT NOT NULL
    )
";

pub const CREATE_ORIGINAL_LINES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS original_clipping_lines (
        key TEXT PRIMARY KEY,
        line1 TEXT NOT NULL DEFAULT '',
        line2 TEXT NOT NULL DEFAULT '',
        line3 TEXT NOT NULL DEFAULT '',
        line4 TEXT NOT NULL DEFAULT '',
        line5 TEXT NOT NULL DEFAULT ''
    )
";

pub const CREATE_LOOKUPS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS lookups (
        word_key TEXT NOT NULL DEFAULT '',
        usage TEXT NOT NULL DEFAULT '',
        title TEXT NOT NULL DEFAULT '',
        authors TEXT NOT NULL DEFAULT '',
        timestamp TEXT NOT NULL DEFAULT ''
    )
";

pub const CREATE_VOCAB_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS vocab (
        id TEXT PRIMARY KEY,
        word_key TEXT NOT NULL DEFAULT '',
        word TEXT NOT NULL DEFAULT '',
        stem TEXT NOT NULL DEFAULT '',
        category INTEGER NOT NULL DEFAULT 0,
        timestamp TEXT NOT NULL DEFAULT '',
        frequency INTEGER NOT NULL DEFAULT 0
    )
";

pub const CREATE_INDEX_CONTENT_HASH: &str =
    "CREATE INDEX IF NOT EXISTS idx_clippings_content_hash ON clippings(content_hash)";

pub const CREATE_INDEX_BOOKNAME: &str =
    "CREATE INDEX IF NOT EXISTS idx_clippings_bookname ON clippings(bookname)";

pub const CREATE_INDEX_LOOKUP_TIMESTAMP: &str =
    "CREATE INDEX IF NOT EXISTS idx_lookups_timestamp ON lookups(timestamp)";

pub const CREATE_INDEX_LOOKUP_WORD_KEY: &str =
    "CREATE INDEX IF NOT EXISTS idx_lookups_word_key ON lookups(word_key)";

pub const CREATE_INDEX_VOCAB_WORD: &str =
    "CREATE INDEX IF NOT EXISTS idx_vocab_word ON vocab(word)";

/// Tables of a peer snapshot, in merge order.
pub const PEER_TABLES: [&str; 4] = ["clippings", "original_clipping_lines", "lookups", "vocab"];

/// Tables of the device vocabulary file.
pub const DEVICE_VOCAB_TABLES: [&str; 3] = ["BOOK_INFO", "LOOKUPS", "WORDS"];
