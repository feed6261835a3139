use clap::{Parser, Subcommand};

/// Top-level CLI parser for the `vesblog` binary.
#[derive(Debug, Parser)]
#[command(name = "vesblog", version, about = "Vesblog content store probe")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (overrides VESBLOG_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check core linkage.
    Ping,
    /// Print the core version.
    Version,
    /// Author commands.
    #[command(subcommand)]
    Author(EntityCommands),
    /// Category commands.
    #[command(subcommand)]
    Category(EntityCommands),
    /// Post commands.
    #[command(subcommand)]
    Post(EntityCommands),
}

/// Read commands shared by every entity kind.
#[derive(Clone, Debug, Subcommand)]
pub enum EntityCommands {
    /// Load an entity with its related records.
    Get { id: i64 },
    /// Load a publicly visible entity.
    View {
        id: i64,
        /// Store to check visibility against (categories and posts)
        #[arg(long)]
        store: Option<i64>,
    },
    /// List entities.
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// List publicly visible entities.
    PublishList {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
}
