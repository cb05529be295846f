//! `todosync` — task list synchronized with a remote REST collection.
//!
//! Every run loads the collection (falling back to the local snapshot when
//! it is unreachable), performs one command, prints the outcome and then
//! the current page. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/todosync/config.toml`).
//!
//! ```bash
//! # Start a collection server
//! cargo run --bin todosync-server
//!
//! # Use it
//! cargo run --bin todosync -- add --title "Buy milk"
//! cargo run --bin todosync -- list --filter pending --search milk
//! TODOSYNC_URL=http://127.0.0.1:9000/todos cargo run --bin todosync -- toggle 1
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use todosync::app::{App, format_age};
use todosync::cache::{FileStorage, KeyValueStore, NoStorage, SnapshotCache};
use todosync::config::{CliArgs, ClientConfig, Command};
use todosync::remote::http::HttpCollectionClient;
use todosync::store::{TaskStore, now_secs};
use todosync::view::{Page, Stats, ViewState};
use todosync_proto::{Filter, TaskId, TaskPatch};

type CliApp = App<HttpCollectionClient, Box<dyn KeyValueStore>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file; stdout carries command output.
    let _log_guard = init_logging(&config.log_level, config.log_file.as_deref());

    tracing::info!(url = %config.collection_url, "todosync starting");

    let remote = match HttpCollectionClient::new(&config.collection_url, config.request_timeout) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let cache = SnapshotCache::with_key(open_storage(&config), config.cache_key.clone());
    let store = TaskStore::new(remote, cache);
    let mut app = App::new(
        store,
        ViewState::with_page_size(config.page_size),
        config.default_owner.clone(),
    );

    app.load().await;
    let command = cli.command.unwrap_or(Command::List {
        filter: None,
        search: None,
        page: None,
        page_size: None,
    });
    let ok = run_command(&mut app, command).await;

    let failed = !ok;
    for note in app.take_notifications() {
        if note.is_error() {
            eprintln!("{note}");
        } else {
            println!("{note}");
        }
    }

    print_page(&app.page(), app.store().filter(), now_secs());
    print_stats(app.stats());

    tracing::info!(failed, "todosync exiting");
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Choose the snapshot backend from configuration.
fn open_storage(config: &ClientConfig) -> Box<dyn KeyValueStore> {
    if !config.cache_enabled {
        tracing::info!("local snapshot disabled");
        return Box::new(NoStorage);
    }
    let storage = config
        .cache_dir
        .clone()
        .map(FileStorage::new)
        .or_else(FileStorage::default_location);
    match storage {
        Some(storage) => {
            tracing::debug!(dir = %storage.dir().display(), "using file snapshot");
            Box::new(storage)
        }
        None => {
            tracing::warn!("no data directory available, local snapshot disabled");
            Box::new(NoStorage)
        }
    }
}

/// Run one command. Returns `false` if the requested mutation failed.
async fn run_command(app: &mut CliApp, command: Command) -> bool {
    match command {
        Command::List {
            filter,
            search,
            page,
            page_size,
        } => {
            if let Some(filter) = filter {
                app.set_filter(filter);
            }
            if let Some(search) = search {
                app.set_search(search);
            }
            if let Some(page_size) = page_size {
                app.set_page_size(page_size);
            }
            if let Some(page) = page {
                app.set_page_index(page);
            }
            true
        }
        Command::Add {
            title,
            owner,
            completed,
        } => {
            let draft = app.draft(title, owner, completed);
            app.add(draft).await.is_ok()
        }
        Command::Edit {
            id,
            title,
            owner,
            completed,
        } => {
            let patch = TaskPatch {
                user_id: owner,
                title,
                completed,
                create_date: None,
            };
            app.edit(&TaskId::new(id), patch).await.is_ok()
        }
        Command::Toggle { id } => app.toggle(&TaskId::new(id)).await.is_ok(),
        Command::Delete { id } => app.delete(&TaskId::new(id)).await.is_ok(),
        Command::Refresh => !app.refresh().await.is_recovered(),
        Command::Stats => true,
    }
}

fn print_page(page: &Page, filter: Filter, now: i64) {
    if page.total == 0 {
        println!("No tasks ({filter}).");
        return;
    }
    println!(
        "Page {}/{} ({} {filter} tasks)",
        page.page_index,
        page.page_count(),
        page.total
    );
    for task in &page.items {
        let mark = if task.completed { 'x' } else { ' ' };
        let id = task.id.as_ref().map_or("-", TaskId::as_str);
        let age = task
            .create_date
            .map_or_else(|| "-".to_string(), |ts| format_age(ts, now));
        println!("  [{mark}] {id:>4}  {}  ({}, {age})", task.title, task.user_id);
    }
}

fn print_stats(stats: Stats) {
    println!(
        "Total: {}  Completed: {}  Pending: {}",
        stats.total, stats.completed, stats.pending
    );
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, which carries command output).
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("todosync.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
