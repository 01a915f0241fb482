//! TheQ crawler main entry point
//!
//! This is the command-line interface for the question harvester.

use clap::Parser;
use std::path::{Path, PathBuf};
use theq_crawler::config::{load_config_with_hash, load_proxy_list, validate, Config};
use theq_crawler::crawler::{crawl, GapScanner};
use theq_crawler::output::print_crawl_report;
use theq_crawler::storage::{SqliteStorage, Storage};
use theq_crawler::ProxyDescriptor;
use tracing_subscriber::EnvFilter;

/// TheQ crawler: a proxy-rotating question harvester
///
/// Fetches every question ID missing from the local database, up to a ceiling,
/// through a rotating set of proxies, and stores the question and its answers.
/// Interrupted or partially failed runs are completed by running again.
#[derive(Parser, Debug)]
#[command(name = "theq-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A proxy-rotating question harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and proxies and show what would be fetched without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Override the highest question ID to fetch
    #[arg(long, value_name = "N")]
    max_id: Option<u64>,

    /// Override the number of concurrent workers
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Override the proxy list file (one proxy URL per line, blank line = direct)
    #[arg(long, value_name = "PATH")]
    proxy_list: Option<PathBuf>,

    /// Override the SQLite database path
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    apply_overrides(&mut config, &cli);
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid command-line override: {}", e);
        return Err(e.into());
    }

    // Handle different modes
    if cli.stats {
        handle_stats(&config)?;
        return Ok(());
    }

    let proxy_path = config.proxies.list_path.as_deref().map(Path::new);
    let proxies = match load_proxy_list(proxy_path) {
        Ok(proxies) => proxies,
        Err(e) => {
            tracing::error!("Failed to load proxy list: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &proxies)?;
    } else {
        handle_crawl(config, proxies, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("theq_crawler=info,warn"),
            1 => EnvFilter::new("theq_crawler=debug,info"),
            2 => EnvFilter::new("theq_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max_id) = cli.max_id {
        config.crawler.max_id = max_id;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(path) = &cli.proxy_list {
        config.proxies.list_path = Some(path.to_string_lossy().into_owned());
    }
    if let Some(path) = &cli.database {
        config.output.database_path = path.to_string_lossy().into_owned();
    }
}

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(
    config: &Config,
    proxies: &[ProxyDescriptor],
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== TheQ Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Max question ID: {}", config.crawler.max_id);
    println!("  Workers: {}", config.crawler.workers);
    println!("  User agent: {}", config.crawler.user_agent);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.crawler.request_timeout, config.crawler.connect_timeout
    );

    println!("\nClassifier:");
    println!(
        "  Rate-limit markers: {:?}",
        config.classifier.rate_limit_markers
    );
    println!(
        "  Not-found markers: {:?}",
        config.classifier.not_found_markers
    );

    println!("\nProxies ({}):", proxies.len());
    for proxy in proxies {
        println!("  - {}", proxy);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    // A missing database means nothing is stored yet; do not create one here
    let database_path = Path::new(&config.output.database_path);
    let known_ids = if database_path.exists() {
        SqliteStorage::new(database_path)?.fetch_known_ids()?
    } else {
        Vec::new()
    };
    let stored = known_ids.len();
    let pending = GapScanner::new(known_ids, config.crawler.max_id).count();

    println!("\n✓ Configuration is valid");
    println!("✓ {} questions already stored", stored);
    println!("✓ Would enqueue {} question IDs", pending);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use theq_crawler::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    // Load statistics
    let stats = load_statistics(&storage)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    proxies: Vec<ProxyDescriptor>,
    config_hash: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let direct = proxies.iter().filter(|p| p.is_direct()).count();
    tracing::info!(
        "Proxies: {} ({} direct), workers: {}",
        proxies.len(),
        direct,
        config.crawler.workers
    );

    // Run the crawler
    match crawl(config, proxies, config_hash).await {
        Ok(report) => {
            tracing::info!("Crawl completed successfully");
            print_crawl_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
