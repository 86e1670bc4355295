use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "laterly", version, about = "Laterly recommendation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current usage context
    Context {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what has been learned from the behavior log
    Patterns {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Detect the current moment
    Moment {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recommend items for right now
    Recommend {
        /// JSON file holding an array of items
        #[arg(long)]
        items: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record an action taken on an item
    Track {
        /// Action tag (read, complete, dismiss, skip, archive, ...)
        action: String,
        /// Item id
        item_id: String,
        /// JSON file holding an array of items
        #[arg(long)]
        items: PathBuf,
        /// Bundle section the item was suggested in, if any
        #[arg(long)]
        suggestion: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LATERLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Context { json } => commands::context::run(json),
        Commands::Patterns { json } => commands::patterns::run(json),
        Commands::Moment { json } => commands::moment::run(json),
        Commands::Recommend { items, json } => commands::recommend::run(&items, json),
        Commands::Track {
            action,
            item_id,
            items,
            suggestion,
        } => commands::track::run(&action, &item_id, &items, suggestion.as_deref()),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
