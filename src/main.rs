use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use km::config::{AppPaths, Config};
use km::errors::{KmError, Result};
use km::ingest::{self, ImportSummary};
use km::storage::AnnotationStore;
use km::storage::models::{Clipping, ClippingFilter, ClippingKind};
use km::storage::sqlite::SqliteStorage;
use km::{frequency, maintenance};

#[derive(Parser)]
#[command(name = "km", version, about = "Collects Kindle highlights, notes and vocabulary into one store")]
struct Cli {
    /// Output results as JSON
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import annotations from a file or a mounted device
    Import {
        #[command(subcommand)]
        source: ImportSource,
    },

    /// List clippings, newest first
    List {
        /// Only clippings from this book
        #[arg(short, long)]
        book: Option<String>,

        /// Filter by kind: highlight, note
        #[arg(short = 't', long)]
        kind: Option<String>,

        /// Maximum number of clippings to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Offset for pagination
        #[arg(short, long, default_value = "0")]
        offset: i64,
    },

    /// Show one clipping by key
    Show {
        /// Clipping key (`time|location`)
        key: String,
    },

    /// List books with their clipping counts
    Books,

    /// List vocabulary words with lookup counts
    Words {
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Replace the text of a clipping
    Edit {
        key: String,
        content: String,
    },

    /// Rename a book across clippings and lookups
    Rename {
        /// Current title
        book: String,

        /// New title
        new_title: String,

        /// New author; keeps the current one when omitted
        #[arg(short, long, default_value = "")]
        author: String,
    },

    /// Delete stored records
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },

    /// Recount word frequencies from lookups
    Recount,

    /// Trim stray leading punctuation, drop empty clippings, compact the store
    Clean,

    /// Write the original clipping blocks back out as a clippings file
    ExportOriginals {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show store statistics
    Stats,

    /// Delete everything in the store
    Clear {
        /// Confirm
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ImportSource {
    /// A `My Clippings.txt` export
    Clippings { file: PathBuf },
    /// A device `vocab.db`
    Vocab { file: PathBuf },
    /// Another installation's `KM2.dat`
    Peer { file: PathBuf },
    /// Both sources from a mounted device
    Device {
        /// Mount point; falls back to `device.root` in config.toml
        root: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DeleteTarget {
    /// One clipping by key
    Clipping { key: String },
    /// Every clipping of a book
    Book { book: String },
    /// A vocabulary word and all its lookups
    Word { word: String },
    /// One lookup by timestamp
    Lookup { timestamp: String },
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    removed: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        if json {
            eprintln!("{}", serde_json::json!({"error": e.to_string()}));
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "km=debug" } else { "km=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::resolve()?;
    let json = cli.json;

    match cli.command {
        None => cmd_list(&paths, ClippingFilter::default(), json),
        Some(Commands::Import { source }) => cmd_import(&paths, source, json),
        Some(Commands::List {
            book,
            kind,
            limit,
            offset,
        }) => {
            let kind = match kind.as_deref() {
                Some(k) => Some(
                    ClippingKind::parse(k)
                        .ok_or_else(|| KmError::InvalidInput(format!("unknown kind {}", k)))?,
                ),
                None => None,
            };
            cmd_list(
                &paths,
                ClippingFilter {
                    book_name: book,
                    kind,
                    limit,
                    offset,
                },
                json,
            )
        }
        Some(Commands::Show { key }) => cmd_show(&paths, &key, json),
        Some(Commands::Books) => cmd_books(&paths, json),
        Some(Commands::Words { limit }) => cmd_words(&paths, limit, json),
        Some(Commands::Edit { key, content }) => {
            let storage = open_storage(&paths)?;
            maintenance::edit_content(&storage, &key, &content)?;
            respond(json, true, format!("Updated clipping {}.", key), None)
        }
        Some(Commands::Rename {
            book,
            new_title,
            author,
        }) => {
            let storage = open_storage(&paths)?;
            let report = maintenance::rename_book(&storage, &book, &new_title, &author)?;
            respond(
                json,
                true,
                format!(
                    "Renamed \"{}\" to \"{}\" ({} clippings, {} lookups).",
                    book, new_title.trim(), report.clippings, report.lookups
                ),
                None,
            )
        }
        Some(Commands::Delete { target }) => cmd_delete(&paths, target, json),
        Some(Commands::Recount) => {
            let storage = open_storage(&paths)?;
            let updated = frequency::recalculate(&storage)?;
            respond(json, true, format!("Recounted {} word(s).", updated), None)
        }
        Some(Commands::Clean) => cmd_clean(&paths, json),
        Some(Commands::ExportOriginals { out }) => cmd_export(&paths, out.as_deref(), json),
        Some(Commands::Stats) => cmd_stats(&paths, json),
        Some(Commands::Clear { yes }) => cmd_clear(&paths, yes, json),
    }
}

fn open_storage(paths: &AppPaths) -> Result<SqliteStorage> {
    std::fs::create_dir_all(&paths.base_dir)?;
    let conn = Connection::open(&paths.db_path)?;
    SqliteStorage::new(conn)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("{}", serde_json::json!({"error": e.to_string()})),
    }
}

fn respond(json: bool, success: bool, message: String, removed: Option<usize>) -> Result<()> {
    if json {
        print_json(&StatusResponse {
            success,
            message,
            removed,
        });
    } else {
        println!("{}", message);
    }
    Ok(())
}

fn report_import(summary: &ImportSummary, json: bool) {
    if json {
        print_json(summary);
    } else {
        println!("{}", summary);
    }
}

fn cmd_import(paths: &AppPaths, source: ImportSource, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    match source {
        ImportSource::Clippings { file } => {
            report_import(&ingest::import_clippings_file(&storage, &file)?, json)
        }
        ImportSource::Vocab { file } => report_import(&ingest::import_vocab_file(&storage, &file)?, json),
        ImportSource::Peer { file } => report_import(&ingest::import_peer_file(&storage, &file)?, json),
        ImportSource::Device { root } => {
            let config = Config::load(&paths.config_path)?;
            let root = root.or_else(|| config.device.root.clone()).ok_or_else(|| {
                KmError::Config("no device root given and device.root is not set".into())
            })?;
            let report = ingest::import_device(&storage, &root, &config);
            if json {
                let part = |r: &Result<ImportSummary>| match r {
                    Ok(summary) => serde_json::to_value(summary)
                        .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()})),
                    Err(e) => serde_json::json!({"error": e.to_string()}),
                };
                print_json(&serde_json::json!({
                    "clippings": part(&report.clippings),
                    "vocabulary": part(&report.vocabulary),
                }));
            } else {
                for part in [&report.clippings, &report.vocabulary] {
                    match part {
                        Ok(summary) => println!("{}", summary),
                        Err(e) => println!("skipped: {}", e),
                    }
                }
            }
        }
    }
    Ok(())
}

fn cmd_list(paths: &AppPaths, filter: ClippingFilter, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    let clippings = storage.list_clippings(&filter)?;

    if json {
        print_json(&clippings);
        return Ok(());
    }

    if clippings.is_empty() {
        println!("No clippings found.");
        return Ok(());
    }

    for clipping in &clippings {
        print_clipping_row(clipping);
    }
    Ok(())
}

fn cmd_show(paths: &AppPaths, key: &str, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    let clipping = storage.get_clipping(key)?;

    if json {
        print_json(&clipping);
        return Ok(());
    }

    print_clipping_detail(&clipping);
    Ok(())
}

fn cmd_books(paths: &AppPaths, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    let books = storage.books()?;

    if json {
        print_json(&books);
        return Ok(());
    }

    if books.is_empty() {
        println!("No books found.");
        return Ok(());
    }

    for book in &books {
        println!("{:>5}  {} ({})", book.clippings, book.book_name, book.author_name);
    }
    Ok(())
}

fn cmd_words(paths: &AppPaths, limit: usize, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    let words: Vec<_> = storage.vocab_entries()?.into_iter().take(limit).collect();

    if json {
        print_json(&words);
        return Ok(());
    }

    if words.is_empty() {
        println!("No words found.");
        return Ok(());
    }

    for word in &words {
        println!("{:>4}  {:<24} {}", word.frequency, word.word, word.timestamp);
    }
    Ok(())
}

fn cmd_delete(paths: &AppPaths, target: DeleteTarget, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    match target {
        DeleteTarget::Clipping { key } => {
            maintenance::delete_clipping(&storage, &key)?;
            respond(json, true, format!("Deleted clipping {}.", key), Some(1))
        }
        DeleteTarget::Book { book } => {
            let removed = maintenance::delete_book(&storage, &book)?;
            respond(
                json,
                true,
                format!("Deleted {} clipping(s) of \"{}\".", removed, book),
                Some(removed),
            )
        }
        DeleteTarget::Word { word } => {
            let deletion = maintenance::delete_word(&storage, &word)?;
            respond(
                json,
                true,
                format!(
                    "Deleted \"{}\" ({} word row(s), {} lookup(s)).",
                    word, deletion.vocabs, deletion.lookups
                ),
                Some(deletion.vocabs + deletion.lookups),
            )
        }
        DeleteTarget::Lookup { timestamp } => {
            maintenance::delete_lookup(&storage, &timestamp)?;
            respond(json, true, format!("Deleted lookup at {}.", timestamp), Some(1))
        }
    }
}

fn cmd_clean(paths: &AppPaths, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    let report = maintenance::clean_database(&storage, storage.path().map(Path::new))?;

    if json {
        print_json(&report);
    } else {
        println!(
            "Removed {} empty clipping(s), trimmed {}, reclaimed {}.",
            report.emptied,
            report.trimmed,
            format_bytes(report.bytes_reclaimed)
        );
    }
    Ok(())
}

fn cmd_export(paths: &AppPaths, out: Option<&Path>, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    match out {
        Some(path) => {
            let written = maintenance::export_originals_to_path(&storage, path)?;
            respond(
                json,
                true,
                format!("Wrote {} clipping(s) to {}.", written, path.display()),
                None,
            )
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            maintenance::export_originals(&storage, &mut lock)?;
            Ok(())
        }
    }
}

fn cmd_stats(paths: &AppPaths, json: bool) -> Result<()> {
    let storage = open_storage(paths)?;
    let stats = storage.stats()?;

    if json {
        print_json(&stats);
        return Ok(());
    }

    println!("Store Statistics");
    println!("────────────────");
    println!("Clippings:  {}", stats.clippings);
    println!("Books:      {}", stats.books);
    println!("Originals:  {}", stats.originals);
    println!("Words:      {}", stats.vocabs);
    println!("Lookups:    {}", stats.lookups);
    if let Some(oldest) = stats.oldest {
        println!("Oldest:     {}", oldest);
    }
    if let Some(newest) = stats.newest {
        println!("Newest:     {}", newest);
    }
    if let Ok(meta) = std::fs::metadata(&paths.db_path) {
        println!("File size:  {}", format_bytes(meta.len()));
    }
    Ok(())
}

fn cmd_clear(paths: &AppPaths, yes: bool, json: bool) -> Result<()> {
    if !yes {
        return Err(KmError::InvalidInput(
            "refusing to clear the store without --yes".into(),
        ));
    }
    let storage = open_storage(paths)?;
    maintenance::clear_all(&storage)?;
    respond(json, true, "Cleared the store.".to_string(), None)
}

fn print_clipping_row(clipping: &Clipping) {
    let kind = match clipping.kind {
        ClippingKind::Highlight => "H",
        ClippingKind::Note => "N",
        ClippingKind::Other(_) => "?",
    };

    let oneline = clipping.content.replace('\n', "\\n");
    let preview = if oneline.chars().count() > 60 {
        format!("{}...", oneline.chars().take(57).collect::<String>())
    } else {
        oneline
    };

    println!(
        "{} {:>19}  {}  [{}]",
        kind, clipping.date, preview, clipping.book_name
    );
}

fn print_clipping_detail(clipping: &Clipping) {
    println!("Key:      {}", clipping.key);
    println!("Kind:     {}", clipping.kind.as_str());
    println!("Book:     {}", clipping.book_name);
    println!("Author:   {}", clipping.author_name);
    println!("Location: {}", clipping.location);
    println!("Page:     {}", clipping.page_number);
    println!("Added:    {}", clipping.date);
    println!("Imported: {}", clipping.import_date);
    if !clipping.tag.is_empty() {
        println!("Tag:      {}", clipping.tag);
    }
    println!("─────────────────────────");
    println!("{}", clipping.content);
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
