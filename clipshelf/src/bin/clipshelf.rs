//! Command-line access to a ClipShelf data directory.
//!
//! Usage:
//!     clipshelf-cli --data-dir ~/.clipshelf list
//!     clipshelf-cli add "some text"
//!     clipshelf-cli pin 0
//!     RUST_LOG=debug clipshelf-cli limits 12 50

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clipshelf::interface::{ClipboardSink, Content, ContentFilter, Item};
use clipshelf::settings::Settings;
use clipshelf::HistoryStore;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clipshelf-cli", about = "Inspect and edit clipboard history")]
struct Cli {
    /// Directory holding pinned.json and history.json
    #[arg(long, default_value = ".clipshelf")]
    data_dir: PathBuf,

    /// Settings file (defaults to <data-dir>/settings.json)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print pinned and ephemeral items, most recent first
    List {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
    },
    /// Capture text as if it had just been copied
    Add { text: String },
    /// Capture the bytes of an image file
    AddImage { path: PathBuf },
    /// Pin the ephemeral item at INDEX
    Pin { index: usize },
    /// Unpin the pinned item at INDEX
    Unpin { index: usize },
    /// Delete an item
    Delete {
        index: usize,
        #[arg(long)]
        pinned: bool,
    },
    /// Write an item's content to stdout and move it to the front
    Restore {
        index: usize,
        #[arg(long)]
        pinned: bool,
    },
    /// Move a pinned item
    Reorder { from: u32, to: u32 },
    /// Clear ephemeral history
    Clear,
    /// Change capacities and save them to the settings file
    Limits { max_pinned: u32, max_ephemeral: u32 },
    /// Run the quit hook (clears history when clearOnQuit is set)
    Quit,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FilterArg {
    All,
    Text,
    Images,
}

impl From<FilterArg> for ContentFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => ContentFilter::All,
            FilterArg::Text => ContentFilter::Text,
            FilterArg::Images => ContentFilter::Images,
        }
    }
}

/// Restored text goes to stdout; images are reported by size
struct StdoutSink;

impl ClipboardSink for StdoutSink {
    fn write_content(&self, content: Content) {
        let mut stdout = std::io::stdout().lock();
        let _ = match &content {
            Content::Text { value } => writeln!(stdout, "{}", value),
            Content::Image { data } => writeln!(stdout, "<image: {} bytes>", data.len()),
        };
    }
}

const PREVIEW_CHARS: usize = 60;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("settings.json"));
    let settings = Settings::load(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;

    let store = HistoryStore::new(
        cli.data_dir.to_string_lossy().into_owned(),
        settings.clone(),
        Arc::new(StdoutSink),
    );

    match cli.command {
        Command::List { query, filter } => {
            let view = store.filtered(query, filter.into());
            print_section("Pinned", &view.pinned);
            print_section("History", &view.ephemeral);
        }
        Command::Add { text } => {
            store.insert_captured(Content::text(text));
        }
        Command::AddImage { path } => {
            let data = std::fs::read(&path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            store.insert_captured(Content::image(data));
        }
        Command::Pin { index } => {
            let item = nth(&store.ephemeral(), index)?;
            let before = store.pinned().len();
            if store.pin(item).pinned.len() == before {
                eprintln!("Not pinned: pinned list is full or already holds this content");
            }
        }
        Command::Unpin { index } => {
            store.unpin(nth(&store.pinned(), index)?);
        }
        Command::Delete { index, pinned } => {
            if pinned {
                store.delete_pinned(nth(&store.pinned(), index)?);
            } else {
                store.delete_ephemeral(nth(&store.ephemeral(), index)?);
            }
        }
        Command::Restore { index, pinned } => {
            let items = if pinned { store.pinned() } else { store.ephemeral() };
            store.restore_to_buffer(nth(&items, index)?);
        }
        Command::Reorder { from, to } => {
            store.reorder_pinned(from, to);
        }
        Command::Clear => {
            store.clear_ephemeral();
        }
        Command::Limits {
            max_pinned,
            max_ephemeral,
        } => {
            store.set_limits(max_pinned, max_ephemeral);
            let updated = Settings {
                max_pinned_count: max_pinned,
                max_ephemeral_count: max_ephemeral,
                ..settings
            };
            updated
                .save(&config_path)
                .with_context(|| format!("Failed to save settings to {}", config_path.display()))?;
        }
        Command::Quit => store.on_quit(),
    }
    Ok(())
}

fn nth(items: &[Item], index: usize) -> Result<Item> {
    match items.get(index) {
        Some(item) => Ok(item.clone()),
        None => bail!("No item at index {} ({} items)", index, items.len()),
    }
}

fn print_section(title: &str, items: &[Item]) {
    println!("{} ({})", title, items.len());
    for (index, item) in items.iter().enumerate() {
        let captured = chrono::DateTime::from_timestamp(item.timestamp_unix, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("  [{:>2}] {}  {}", index, captured, item.display_text(PREVIEW_CHARS));
    }
}
