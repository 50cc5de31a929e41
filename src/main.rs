//! quicksearch - workspace fuzzy search
//!
//! Command-line front end over a local workspace.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use quicksearch::config::{ConfigWatcher, RELOAD_QUIET_PERIOD};
use quicksearch::model::{uri_to_path, ItemKind};
use quicksearch::search::ProviderStats;
use quicksearch::telemetry::{init_metrics, init_tracing, render_metrics};
use quicksearch::watcher::{ExclusionFilter, FileWatcher, WatcherConfig};
use quicksearch::{
    Config, Host, ItemAction, ItemType, LocalHost, RankedItem, SearchService, WorkspaceEvent,
};

/// quicksearch - fuzzy search over files, symbols, commands and text
#[derive(Parser, Debug)]
#[command(name = "quicksearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace roots to index
    #[arg(
        short,
        long,
        env = "QUICKSEARCH_WORKSPACE",
        value_delimiter = ',',
        default_value = "."
    )]
    workspace: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, env = "QUICKSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "QUICKSEARCH_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "QUICKSEARCH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one query and print the ranked results
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Perform the action of the top result
        #[arg(long)]
        accept: bool,
    },

    /// Read queries from stdin while following file changes
    Interactive,

    /// Re-index every provider and report progress
    Rebuild {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print index statistics and metrics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = cli.config.as_deref().map(Config::load).unwrap_or_default();
    if let Command::Search {
        limit: Some(limit), ..
    } = &cli.command
    {
        config.max_results = *limit;
    }

    let level = if config.debug { "debug" } else { cli.log_level.as_str() };
    init_tracing(level, cli.log_json);
    init_metrics();

    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "Configuration out of range, using defaults for bad values");
    }
    tracing::debug!(?config, "Configuration loaded");

    let roots = canonical_roots(cli.workspace.iter())?;

    let host = Arc::new(LocalHost::new(roots.clone()).with_builtin_commands());
    host.set_exclusions(&config.exclude);
    let service = SearchService::new(Arc::clone(&host) as Arc<dyn Host>, config.clone());

    match cli.command {
        Command::Search {
            query,
            json,
            accept,
            ..
        } => {
            let results = service.search(&query).await;
            if json {
                let rows: Vec<_> = results.iter().map(result_json).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_results(&results, config.preview);
            }
            if accept {
                let top = results.first().context("no results to accept")?;
                service.accept(top).await?;
                report_action(&host);
            }
        }
        Command::Interactive => {
            interactive(&service, &host, &roots, &config, cli.config.as_deref()).await?;
        }
        Command::Rebuild { json } => {
            let stats = service.rebuild_index(print_progress).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "Indexed {} items ({} duplicates) in {}ms",
                    stats.total,
                    stats.duplicates,
                    stats.elapsed.as_millis()
                );
            }
        }
        Command::Stats => {
            service.refresh(false).await;
            println!("{}", serde_json::to_string_pretty(&service.stats())?);
            print!("{}", render_metrics());
        }
    }

    service.shutdown();
    Ok(())
}

async fn interactive(
    service: &Arc<SearchService>,
    host: &LocalHost,
    roots: &[PathBuf],
    config: &Config,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    service.refresh(false).await;
    let known_paths = service
        .aggregate()
        .iter()
        .filter(|item| item.item_type() == ItemType::File)
        .filter_map(|item| item.uri().and_then(uri_to_path))
        .collect();

    let watcher_config = WatcherConfig {
        roots: roots.to_vec(),
        known_paths,
        ..WatcherConfig::default()
    };
    let mut watcher = FileWatcher::new(&watcher_config, ExclusionFilter::new(&config.exclude))?;
    let mut watching = true;
    let mut settings = config_path.and_then(|path| {
        ConfigWatcher::new(path, RELOAD_QUIET_PERIOD)
            .map_err(|e| tracing::warn!(error = %e, "Configuration will not be reloaded"))
            .ok()
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last: Vec<RankedItem> = Vec::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    eprintln!("Type a query, or ':open N', ':roots DIR[,DIR]', ':rebuild', ':stats', ':quit'.");
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            batch = watcher.recv(), if watching => {
                let Some(batch) = batch else {
                    watching = false;
                    continue;
                };
                host.invalidate_symbols();
                for event in batch.into_events() {
                    service.handle_event(&event).await;
                }
            }
            reloaded = next_config(&mut settings) => {
                let Some(config) = reloaded else {
                    settings = None;
                    continue;
                };
                if let Err(e) = config.validate() {
                    tracing::warn!(error = %e, "Reloaded configuration out of range");
                }
                host.set_exclusions(&config.exclude);
                service
                    .handle_event(&WorkspaceEvent::ConfigurationChanged(Box::new(config)))
                    .await;
                eprintln!("Configuration reloaded");
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                match line.split_once(' ').unwrap_or((line, "")) {
                    (":quit" | ":q", _) => break,
                    (":open", index) => open_result(service, host, &last, index).await,
                    (":roots", dirs) => match canonical_roots(dirs.split(',').map(str::trim).filter(|d| !d.is_empty())) {
                        Ok(roots) if !roots.is_empty() => {
                            host.set_workspace_roots(roots.clone());
                            if let Err(e) = watcher.set_roots(&roots) {
                                eprintln!("Watching failed: {e}");
                            }
                            service
                                .handle_event(&WorkspaceEvent::WorkspaceFoldersChanged(roots))
                                .await;
                        }
                        Ok(_) => eprintln!("Usage: :roots DIR[,DIR]"),
                        Err(e) => eprintln!("{e:#}"),
                    },
                    (":rebuild", _) => match service.rebuild_index(print_progress).await {
                        Ok(stats) => eprintln!("Indexed {} items", stats.total),
                        Err(e) => eprintln!("Rebuild failed: {e}"),
                    },
                    (":stats", _) => println!("{}", serde_json::to_string_pretty(&service.stats())?),
                    _ => {
                        last = service.search(line).await;
                        print_results(&last, service.config().preview);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Next reloaded configuration; never resolves without a settings watcher.
async fn next_config(settings: &mut Option<ConfigWatcher>) -> Option<Config> {
    match settings {
        Some(watcher) => watcher.recv().await,
        None => std::future::pending().await,
    }
}

fn canonical_roots<P: AsRef<Path>>(dirs: impl Iterator<Item = P>) -> anyhow::Result<Vec<PathBuf>> {
    dirs.map(|dir| {
        let dir = dir.as_ref();
        dir.canonicalize()
            .with_context(|| format!("workspace root {}", dir.display()))
    })
    .collect()
}

async fn open_result(service: &Arc<SearchService>, host: &LocalHost, last: &[RankedItem], index: &str) {
    let Some(result) = index
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| last.get(i))
    else {
        eprintln!("No result '{}'", index.trim());
        return;
    };

    match service.accept(result).await {
        Ok(()) => {
            report_action(host);
            if let Some(uri) = result.item.uri() {
                service
                    .handle_event(&WorkspaceEvent::ActiveEditorChanged(uri.to_string()))
                    .await;
            }
        }
        Err(e) => eprintln!("{e}"),
    }
}

fn print_results(results: &[RankedItem], preview: bool) {
    if results.is_empty() {
        println!("No results");
        return;
    }
    for (i, result) in results.iter().enumerate() {
        let item = &result.item;
        let score = result.score.map_or_else(String::new, |s| format!("{s:.3}"));
        println!(
            "{:>3}. {:<7} {:<40} {:<40} {score}",
            i + 1,
            item.item_type().as_str(),
            item.label,
            item.description
        );
        if preview {
            if let ItemKind::TextMatch { matched, .. } = &item.kind {
                println!("       match: {matched}");
            } else if let Some(detail) = &item.detail {
                println!("       {detail}");
            }
        }
    }
}

fn result_json(result: &RankedItem) -> serde_json::Value {
    let item = &result.item;
    serde_json::json!({
        "id": item.id,
        "type": item.item_type(),
        "label": item.label,
        "description": item.description,
        "detail": item.detail,
        "priority": item.priority,
        "score": result.score,
        "action": item.action,
    })
}

fn print_progress(stats: &ProviderStats) {
    match &stats.error {
        Some(error) => eprintln!("  {:<18} failed: {error}", stats.provider),
        None => eprintln!("  {:<18} {} items", stats.provider, stats.items),
    }
}

/// Print where the last open or reveal action landed.
fn report_action(host: &LocalHost) {
    let Some(action) = host.performed_actions().pop() else {
        return;
    };
    match action {
        ItemAction::OpenFile { uri } => println!("{}", display_uri(&uri)),
        ItemAction::RevealRange { uri, range } => println!(
            "{}:{}:{}",
            display_uri(&uri),
            range.start.line + 1,
            range.start.column + 1
        ),
        ItemAction::ExecuteCommand { .. } => {}
    }
}

fn display_uri(uri: &str) -> String {
    uri_to_path(uri).map_or_else(|| uri.to_string(), |path| path.display().to_string())
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
