//! watch-on-lbry - find YouTube videos and channels on LBRY
//!
//! Resolves YouTube pages to their Odysee/LBRY counterparts, follows a page
//! the way the browser extension does, and edits the shared settings.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use watch_on_lbry::core::descriptor::ResolverRegistry;
use watch_on_lbry::core::messaging::{Background, LocalPort, request_resolve_by_id};
use watch_on_lbry::core::page::PageEnvironment;
use watch_on_lbry::core::reconcile::{Reconciler, targets_by_sources};
use watch_on_lbry::core::resolver::UrlResolver;
use watch_on_lbry::core::sampler::sample;
use watch_on_lbry::core::scrape::find_target_from_source_page;
use watch_on_lbry::core::transport::HttpTransport;
use watch_on_lbry::core::url_cache::ResolutionCache;
use watch_on_lbry::storage::{cache, config};
use watch_on_lbry::types::{ResolveRequest, Source};
use watch_on_lbry::ui::headless::{HeadlessPage, TerminalTabs};
use watch_on_lbry::ui::popup;
use watch_on_lbry::utils::paths::ensure_app_dirs;

const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_START_PAGE: &str = "https://www.youtube.com/";

/// Watch YouTube videos and channels on LBRY instead.
#[derive(Parser, Debug)]
#[command(name = "watch-on-lbry")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the LBRY URL for YouTube video or channel URLs
    Resolve {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print the raw resolver answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Follow a page, navigated by URLs read from stdin
    Watch {
        /// Page to start on
        start: Option<String>,

        /// Delay between reconciliation cycles
        #[arg(long, default_value = "500")]
        interval_ms: u64,
    },

    /// Edit settings interactively
    Settings,

    /// Clear the resolver cache
    ClearCache,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// In-process background reachable through a message port
fn local_port(settings: &config::SettingsStore, resolver_cache: &ResolutionCache) -> anyhow::Result<LocalPort> {
    let resolver = UrlResolver::new(
        ResolverRegistry::builtin()?,
        resolver_cache.clone(),
        Arc::new(HttpTransport::new()),
    );
    let background = Background::new(resolver, settings.clone(), Arc::new(TerminalTabs));
    Ok(LocalPort::new(Arc::new(background)))
}

async fn save_cache(resolver_cache: &ResolutionCache) {
    if let Err(e) = cache::save(resolver_cache).await {
        warn!(error = %e, "Could not save resolver cache");
    }
}

async fn resolve_urls(
    urls: &[String],
    json: bool,
    settings: &config::SettingsStore,
    resolver_cache: &ResolutionCache,
) -> anyhow::Result<()> {
    let port = local_port(settings, resolver_cache)?;

    let mut pages: Vec<(Source, HeadlessPage)> = Vec::new();
    for raw in urls {
        let url = Url::parse(raw).with_context(|| format!("Invalid URL: {}", raw))?;
        let page = HeadlessPage::new(url.clone());
        match sample(&url, &page).await? {
            Some(source) => pages.push((source, page)),
            None => eprintln!("{} {}", "Not a video or channel page:".yellow(), raw),
        }
    }
    if pages.is_empty() {
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message("Resolving...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let sources: Vec<Source> = pages.iter().map(|(source, _)| source.clone()).collect();
    if json {
        let requests: Vec<ResolveRequest> = sources
            .iter()
            .map(|s| ResolveRequest {
                id: s.id.clone(),
                kind: s.kind,
            })
            .collect();
        let results = request_resolve_by_id(&port, &requests).await;
        spinner.finish_and_clear();
        println!("{}", serde_json::to_string_pretty(&results?)?);
        save_cache(resolver_cache).await;
        return Ok(());
    }

    let platform = settings.snapshot().target_platform;
    let targets = targets_by_sources(&port, platform, &sources).await;
    spinner.finish_and_clear();
    let mut targets = targets?;

    for (source, page) in &pages {
        let target = match targets.remove(&source.id).flatten() {
            Some(target) => Some(target),
            None => {
                page.reload().await;
                find_target_from_source_page(page, source, platform)
            }
        };
        match target {
            Some(target) => println!("{} {} {}", source.url, "→".dimmed(), target.url().green()),
            None => println!("{} {}", source.url, "not found on LBRY".yellow()),
        }
    }

    save_cache(resolver_cache).await;
    Ok(())
}

async fn watch(
    start: Option<String>,
    interval: Duration,
    settings: &config::SettingsStore,
    resolver_cache: &ResolutionCache,
) -> anyhow::Result<()> {
    let start = start.as_deref().unwrap_or(DEFAULT_START_PAGE);
    let start = Url::parse(start).with_context(|| format!("Invalid URL: {}", start))?;

    let page = Arc::new(HeadlessPage::new(start));
    page.reload().await;
    let port = Arc::new(local_port(settings, resolver_cache)?);

    let reconciler = Reconciler::new(page.clone(), port, settings.clone()).with_interval(interval);
    let engine = tokio::spawn(reconciler.run());
    let follower = tokio::spawn(config::follow_settings_file(settings.clone(), SETTINGS_POLL_INTERVAL));
    let announcer = tokio::spawn({
        let mut rx = settings.subscribe();
        async move {
            while rx.changed().await.is_ok() {
                let current = rx.borrow_and_update().clone();
                info!(
                    target_platform = ?current.target_platform,
                    redirects = current.redirects(),
                    "Settings updated"
                );
            }
        }
    });

    println!("{}", "Enter URLs to navigate, Ctrl-D to stop.".dimmed());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match Url::parse(line) {
                    Ok(url) => page.navigate(url).await,
                    Err(e) => eprintln!("{} {}", "Invalid URL:".red(), e),
                }
            }
            _ = page.closed() => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    engine.abort();
    follower.abort();
    announcer.abort();
    info!(url = %page.location(), "Stopped");
    save_cache(resolver_cache).await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    // Ensure app directories exist
    ensure_app_dirs().await?;

    let settings = match config::load_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Unreadable settings, using defaults");
            Default::default()
        }
    };
    let settings = config::SettingsStore::new(settings);

    let resolver_cache = ResolutionCache::new();
    if let Err(e) = cache::load_into(&resolver_cache).await {
        warn!(error = %e, "Could not load resolver cache");
    }

    match cli.command {
        Command::Resolve { urls, json } => {
            resolve_urls(&urls, json, &settings, &resolver_cache).await?;
        }
        Command::Watch { start, interval_ms } => {
            watch(start, Duration::from_millis(interval_ms), &settings, &resolver_cache).await?;
        }
        Command::Settings => {
            let updated = popup::run(settings.snapshot(), &resolver_cache).await?;
            println!(
                "{} {}",
                "Opening on".dimmed(),
                updated.target_platform.settings().display_name
            );
        }
        Command::ClearCache => {
            cache::clear_all(&resolver_cache)
                .await
                .context("Failed to clear the resolver cache")?;
            println!("{}", "Cleared Cache!".green());
        }
    }

    Ok(())
}
