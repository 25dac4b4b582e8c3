//! modwatch CLI
//!
//! Watches Steam Workshop items and posts to a webhook when one updates.

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone, Utc};
use clap::{Parser, Subcommand};
use modwatch::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, Monitor},
    services::{FetchStrategy, Notifier, WatchList, WorkshopSource},
    storage::{LocalStorage, ObservationStore},
    utils::{extract_item_id, format_time_since, http},
};

/// modwatch - Steam Workshop update monitor
#[derive(Parser, Debug)]
#[command(name = "modwatch", version, about = "Steam Workshop update monitor")]
struct Cli {
    /// Path to the configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Directory holding mod_data.json and webhook_data.json
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check now, then keep checking on the configured interval (default)
    Run,

    /// Run a single check cycle and exit
    Check,

    /// Show tracked mods and their last known update
    List,

    /// Track a workshop URL under a category
    Add { category: String, url: String },

    /// Stop tracking a workshop URL and forget its state
    Remove { category: String, url: String },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load the config, writing a default one and returning `None` when absent.
fn load_config(path: &Path) -> Result<Option<Config>> {
    match Config::load_validated(path) {
        Ok(config) => Ok(Some(config)),
        Err(e) if e.is_not_found() => {
            log::info!("Config file not found, creating default {}", path.display());
            Config::write_default(path)?;
            log::info!(
                "Please edit {} with your webhook URL and Workshop URLs, then restart",
                path.display()
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn build_monitor(config: &Config, storage: LocalStorage) -> Result<Monitor> {
    let client = http::create_client(&config.http)?;
    let watchlist = WatchList::from_config(&config.mod_categories);
    let store = storage.load_observations().await?;
    let source = WorkshopSource::new(client.clone(), config);
    log::info!("Fetch strategy: {}", describe(source.strategy()));
    let notifier = Notifier::http(client, &config.webhook_url);

    Ok(Monitor::new(
        watchlist,
        store,
        Box::new(source),
        notifier,
        storage,
    ))
}

/// Log-safe description of the strategy (never prints the key).
fn describe(strategy: &FetchStrategy) -> &'static str {
    match strategy {
        FetchStrategy::ApiBacked(_) => "Web API with scrape fallback",
        FetchStrategy::ScrapeOnly => "scrape only",
    }
}

/// Write the watch-list back into the config, warning about every URL that
/// does not survive apart from the item being removed.
fn replace_categories(config: &mut Config, watchlist: &WatchList, removed: Option<(&str, &str)>) {
    let removed = removed.map(|(category, url)| (category, extract_item_id(url)));
    for (category, url) in config.replace_categories(watchlist.to_config()) {
        if removed == Some((category.as_str(), extract_item_id(&url))) {
            continue;
        }
        log::warn!("Dropping unparseable or duplicate URL from {category}: {url}");
    }
}

fn print_listing(watchlist: &WatchList, store: &ObservationStore) {
    let now = Utc::now().timestamp();
    println!("=== Currently Monitored Mods ===");
    for (category, items) in watchlist.list(store) {
        println!();
        println!("{category}:");
        for listed in items {
            match &listed.observation {
                Some(obs) => {
                    let when = Local
                        .timestamp_opt(obs.last_update, 0)
                        .single()
                        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| obs.last_update.to_string());
                    println!(
                        "  - {} ({}) - Last updated: {} ({})",
                        obs.title,
                        listed.item.id,
                        when,
                        format_time_since(obs.last_update, now)
                    );
                }
                None => println!("  - {} - Never checked", listed.item.id),
            }
        }
    }
    println!("================================");
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(mut config) = load_config(&cli.config)? else {
        return Ok(());
    };
    log::info!("Loaded configuration from {}", cli.config.display());

    let storage = LocalStorage::new(&cli.data_dir);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let interval = config.check_interval()?;
            let shutdown = pipeline::shutdown_signal();
            let mut monitor = build_monitor(&config, storage).await?;
            pipeline::ensure_connectivity_test(
                monitor.storage(),
                monitor.notifier(),
                &config.webhook_url,
                &monitor.watchlist,
                config.check_interval_minutes,
            )
            .await;

            log::info!(
                "Workshop mod monitor started: {} mods in {} categories, every {} minutes",
                monitor.watchlist.item_count(),
                monitor.watchlist.category_count(),
                config.check_interval_minutes
            );
            pipeline::run_monitor(&mut monitor, interval, shutdown).await;
        }

        Command::Check => {
            let mut monitor = build_monitor(&config, storage).await?;
            monitor.run_cycle().await;
        }

        Command::List => {
            let watchlist = WatchList::from_config(&config.mod_categories);
            let store = storage.load_observations().await?;
            print_listing(&watchlist, &store);
        }

        Command::Add { category, url } => {
            let mut watchlist = WatchList::from_config(&config.mod_categories);
            if !watchlist.add_item(&category, &url) {
                return Err(AppError::validation(format!(
                    "Could not add {url} to {category}"
                )));
            }
            replace_categories(&mut config, &watchlist, None);
            config.save(&cli.config)?;
        }

        Command::Remove { category, url } => {
            let mut watchlist = WatchList::from_config(&config.mod_categories);
            let mut store = storage.load_observations().await?;
            if !watchlist.remove_item(&category, &url, &mut store) {
                return Err(AppError::validation(format!(
                    "{url} is not tracked in {category}"
                )));
            }
            replace_categories(&mut config, &watchlist, Some((&category, &url)));
            config.save(&cli.config)?;
            storage.save_observations(&store).await?;
        }

        Command::Validate => {
            log::info!(
                "✓ Config OK ({} categories, interval {} minutes)",
                config.mod_categories.len(),
                config.check_interval_minutes
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
