use std::{io, path::PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use homedir::my_home;
use inquire::error::InquireResult;
use tracing_subscriber::EnvFilter;

mod app;
mod bookmarks;
mod cli;
mod config;
mod keywords;
mod lock;
mod scrape;
mod search;
mod storage;
mod suggest;
mod sync;
#[cfg(test)]
mod tests;
mod tree;
mod web;

use app::App;
use config::Config;
use lock::FileLock;

fn base_path() -> anyhow::Result<String> {
    if let Ok(base_path) = std::env::var("BMX_BASE_PATH") {
        return Ok(base_path);
    }

    let home = my_home()?.context("could not determine home directory")?;
    Ok(format!("{}/.local/share/bmx", home.to_string_lossy()))
}

/// Explicit path, then `bookmarks_file` from config, then the browser profile.
fn load_live_bookmarks(
    config: &Config,
    path: Option<String>,
) -> anyhow::Result<Vec<tree::LiveBookmark>> {
    let path = match path.or_else(|| config.bookmarks_file.clone()) {
        Some(path) => PathBuf::from(path),
        None => match tree::default_tree_path() {
            Some(path) => path,
            None => bail!("no bookmarks file found, pass one with --bookmarks"),
        },
    };

    log::info!("reading bookmarks from {}", path.display());
    let nodes = tree::load_tree(&path)?;
    Ok(tree::flatten(&nodes))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = cli::Args::parse();

    let base_path = base_path()?;
    let config = Config::load_with(&base_path)?;
    let lock_path = PathBuf::from(&base_path);

    match args.command {
        cli::Command::Daemon {} => {
            let _lock = FileLock::try_acquire(&lock_path)?;
            let app = App::open(config)?;
            if !app.is_initialized() {
                log::info!("bookmark events are ignored until the first full sync");
            }
            web::start_daemon(app)
        }

        cli::Command::Sync { bookmarks } => {
            let live = load_live_bookmarks(&config, bookmarks)?;
            let _lock = FileLock::try_acquire(&lock_path)?;
            let app = App::open(config)?;

            let pb = indicatif::ProgressBar::new(app.pending_fetches(&live) as u64);
            let report = app.full_sync(live, &|url| {
                pb.set_message(url.to_string());
                pb.inc(1);
            })?;
            pb.finish_and_clear();

            print_json(&report)
        }

        cli::Command::Import { bookmarks } => {
            let live = load_live_bookmarks(&config, bookmarks)?;
            let _lock = FileLock::try_acquire(&lock_path)?;
            let app = App::open(config)?;

            let count = app.import(live)?;
            println!("{count} bookmarks imported");
            Ok(())
        }

        cli::Command::Index { urls } => {
            let _lock = FileLock::try_acquire(&lock_path)?;
            let app = App::open(config)?;

            let report = app.index_bookmarks(&urls)?;
            print_json(&report)
        }

        cli::Command::Delete { urls, yes } => {
            let _lock = FileLock::try_acquire(&lock_path)?;
            let app = App::open(config)?;

            if !yes {
                match inquire::prompt_confirmation(format!(
                    "Are you sure you want to delete {} bookmarks?",
                    urls.len()
                )) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            let count = app.delete_bookmarks(&urls)?;
            println!("{count} items removed");
            Ok(())
        }

        cli::Command::Keywords { url, keywords } => {
            let _lock = FileLock::try_acquire(&lock_path)?;
            let app = App::open(config)?;

            app.update_keywords(&url, cli::parse_keywords(&keywords))?;
            print_json(&app.records().get(&url))
        }

        cli::Command::Search {
            query,
            limit,
            count,
        } => {
            let app = App::open(config)?;
            let limit = if count { Some(usize::MAX) } else { limit };
            let found = app.search(&query, limit);

            if count {
                println!("{} bookmarks found", found.len());
                return Ok(());
            }

            print_json(&found)
        }

        cli::Command::Suggest { text } => {
            let app = App::open(config)?;
            print_json(&app.suggest(&text))
        }

        cli::Command::List {} => {
            let app = App::open(config)?;
            for record in app.records().values() {
                println!("{}\t{}\t{}", record.status_text(), record.url, record.title);
            }
            Ok(())
        }

        cli::Command::Extract { url } => {
            let app = App::open(config)?;
            let extraction = app.extract(&url)?;
            if let keywords::Extraction::Failed(ref message) = extraction {
                log::warn!("{url}: {message}");
            }
            print_json(&extraction.keywords())
        }

        cli::Command::Export { output } => {
            let app = App::open(config)?;
            let path = output.unwrap_or_else(|| {
                format!(
                    "bookmark_data_{}.json",
                    chrono::Local::now().format("%Y-%m-%dT%H-%M-%S")
                )
            });

            std::fs::write(&path, serde_json::to_string_pretty(&app.records())?)
                .with_context(|| format!("failed to write {path}"))?;
            println!("exported to {path}");
            Ok(())
        }
    }
}
