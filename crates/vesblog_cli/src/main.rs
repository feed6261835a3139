//! CLI probe for the blog core.
//!
//! # Responsibility
//! - Verify `vesblog_core` linkage and schema bootstrap from a shell.
//! - Run read operations against a configured database and print JSON.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, EntityCommands};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use vesblog_core::{open_db, BlogConfig, BlogServices, SearchCriteria, StaticStoreManager};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Page size used when `--page` is given without `--limit`.
const DEFAULT_PAGE_SIZE: u32 = 20;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Ping => {
            println!("vesblog_core ping={}", vesblog_core::ping());
            return Ok(());
        }
        Commands::Version => {
            println!("vesblog_core version={}", vesblog_core::core_version());
            return Ok(());
        }
        _ => {}
    }

    let mut config = BlogConfig::from_env()?;
    if let Some(db) = &cli.db {
        config.db_path = PathBuf::from(db);
    }
    if let Some(log_dir) = &config.log_dir {
        vesblog_core::init_logging(config.log_level, log_dir)?;
    }

    let conn = open_db(&config.db_path)?;
    let services = BlogServices::try_new(&conn, config.store_manager())?;
    let store_id = config.store_id;

    match cli.command {
        Commands::Author(command) => run_author(&services, command, cli.pretty),
        Commands::Category(command) => run_category(&services, command, store_id, cli.pretty),
        Commands::Post(command) => run_post(&services, command, store_id, cli.pretty),
        Commands::Ping | Commands::Version => Ok(()),
    }
}

fn run_author(
    services: &BlogServices<'_, StaticStoreManager>,
    command: EntityCommands,
    pretty: bool,
) -> CliResult<()> {
    let authors = services.authors();
    match command {
        EntityCommands::Get { id } => print_json(&authors.get(id)?, pretty),
        EntityCommands::View { id, .. } => print_json(&authors.view(id)?, pretty),
        EntityCommands::List { page, limit } => {
            print_json(&authors.get_list(&criteria(page, limit))?, pretty)
        }
        EntityCommands::PublishList { page, limit } => {
            print_json(&authors.get_publish_list(&criteria(page, limit))?, pretty)
        }
    }
}

fn run_category(
    services: &BlogServices<'_, StaticStoreManager>,
    command: EntityCommands,
    default_store: i64,
    pretty: bool,
) -> CliResult<()> {
    let categories = services.categories();
    match command {
        EntityCommands::Get { id } => print_json(&categories.get(id)?, pretty),
        EntityCommands::View { id, store } => print_json(
            &categories.view(id, Some(store.unwrap_or(default_store)))?,
            pretty,
        ),
        EntityCommands::List { page, limit } => {
            print_json(&categories.get_list(&criteria(page, limit))?, pretty)
        }
        EntityCommands::PublishList { page, limit } => {
            print_json(&categories.get_publish_list(&criteria(page, limit))?, pretty)
        }
    }
}

fn run_post(
    services: &BlogServices<'_, StaticStoreManager>,
    command: EntityCommands,
    default_store: i64,
    pretty: bool,
) -> CliResult<()> {
    let posts = services.posts();
    match command {
        EntityCommands::Get { id } => print_json(&posts.get(id)?, pretty),
        EntityCommands::View { id, store } => print_json(
            &posts.view(id, Some(store.unwrap_or(default_store)))?,
            pretty,
        ),
        EntityCommands::List { page, limit } => {
            print_json(&posts.get_list(&criteria(page, limit))?, pretty)
        }
        EntityCommands::PublishList { page, limit } => {
            print_json(&posts.get_publish_list(&criteria(page, limit))?, pretty)
        }
    }
}

fn criteria(page: Option<u32>, limit: Option<u32>) -> SearchCriteria {
    match (page, limit) {
        (None, None) => SearchCriteria::new(),
        (page, limit) => {
            SearchCriteria::new().paged(page.unwrap_or(1), limit.unwrap_or(DEFAULT_PAGE_SIZE))
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> CliResult<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
