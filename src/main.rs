use anyhow::Result;
use clap::{Parser, Subcommand};
use pubmed_herald::config::{find_config_file, load_config, Config};
use pubmed_herald::coordinator::PublishCoordinator;
use pubmed_herald::fetch::PubMedFetcher;
use pubmed_herald::migrate::backfill_identifiers;
use pubmed_herald::models::{ArticleRecord, RawArticle};
use pubmed_herald::notify::TelegramNotifier;
use pubmed_herald::post::HttpPoster;
use pubmed_herald::store::{JsonFileStore, Store};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// PubMed Herald - Watch a PubMed search and announce new articles
#[derive(Parser, Debug)]
#[command(name = "pubmed-herald")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Watch a PubMed search and announce new articles", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the watcher loop until interrupted (default)
    Run,

    /// Run exactly one poll + publish cycle and exit
    Once,

    /// Key legacy published entries by PMID derived from their link
    Backfill,

    /// Print the composed post for an article without publishing
    #[command(alias = "c")]
    Compose {
        /// Article PMID
        #[arg(long)]
        pmid: String,

        /// Article title
        #[arg(long)]
        title: String,

        /// Raw author string as PubMed renders it
        #[arg(long)]
        authors: String,

        /// Hashtag to prefix (default: from config)
        #[arg(long)]
        hashtag: Option<String>,

        /// Post length limit (default: from config)
        #[arg(long)]
        max_length: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pubmed_herald={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from file if specified or found in default locations
    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        Config::default()
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_loop(&config).await,
        Commands::Once => run_once(&config).await,
        Commands::Backfill => run_backfill(&config).await,
        Commands::Compose {
            pmid,
            title,
            authors,
            hashtag,
            max_length,
        } => {
            let raw = RawArticle {
                pmid,
                title,
                authors,
                journal: None,
            };
            let record = ArticleRecord::try_from(raw)?;
            let text = pubmed_herald::compose::compose(
                hashtag.as_deref().unwrap_or(&config.hashtag),
                record.title(),
                &record.surnames(),
                &record.link(),
                max_length.unwrap_or(config.publish.max_post_length),
            );
            println!("{}", text);
            println!("({} chars)", text.chars().count());
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> Result<Arc<JsonFileStore>> {
    let path = config
        .store
        .path
        .clone()
        .unwrap_or_else(JsonFileStore::default_path);
    tracing::debug!("state file: {}", path.display());
    Ok(Arc::new(JsonFileStore::open(path)?))
}

fn build_coordinator(
    config: &Config,
    store: Arc<dyn Store>,
    paused: Arc<AtomicBool>,
    shutdown: CancellationToken,
) -> Result<PublishCoordinator> {
    if config.search_url.is_empty() {
        anyhow::bail!("no search_url configured");
    }
    let token = config
        .poster
        .token
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("no poster token configured (set POSTER_TOKEN)"))?;

    let telegram = &config.telegram;
    let uses_telegram = telegram.channel.is_some()
        || !telegram.recipients.is_empty()
        || !telegram.admins.is_empty();
    let bot_token = match (&telegram.bot_token, uses_telegram) {
        (Some(token), _) => token.clone(),
        (None, false) => String::new(),
        (None, true) => {
            anyhow::bail!("Telegram recipients configured but no bot token (set TELEGRAM_BOT_TOKEN)")
        }
    };

    let fetcher = Arc::new(PubMedFetcher::new()?);
    let poster = Arc::new(HttpPoster::new(&config.poster.endpoint, token)?);
    let notifier = Arc::new(TelegramNotifier::new(bot_token)?);

    Ok(PublishCoordinator::new(
        fetcher,
        poster,
        notifier,
        store,
        config.coordinator_settings(),
        paused,
        shutdown,
    ))
}

async fn run_loop(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let paused = Arc::new(AtomicBool::new(false));
    let shutdown = CancellationToken::new();

    // A `paused` file next to the state file suspends publishing; remove it
    // to resume.
    let pause_file = config
        .store
        .path
        .clone()
        .unwrap_or_else(JsonFileStore::default_path)
        .with_file_name("paused");
    let pause_poll = std::time::Duration::from_secs(config.schedule.pause_poll_secs);
    {
        let paused = Arc::clone(&paused);
        let token = shutdown.clone();
        tokio::spawn(async move {
            while !token.is_cancelled() {
                paused.store(pause_file.exists(), Ordering::Relaxed);
                pubmed_herald::schedule::sleep_cancellable(&token, pause_poll).await;
            }
        });
    }

    let coordinator = build_coordinator(config, store, paused, shutdown.clone())?;

    let ctrl_c = {
        let token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                token.cancel();
            }
        })
    };

    coordinator.run().await;
    ctrl_c.abort();
    Ok(())
}

async fn run_once(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let paused = Arc::new(AtomicBool::new(false));
    let coordinator = build_coordinator(config, store, paused, CancellationToken::new())?;

    let outcome = coordinator.run_cycle().await?;
    println!(
        "fetched {}, new {}, published {}, abandoned {}",
        outcome.fetched, outcome.surviving, outcome.published, outcome.abandoned
    );
    Ok(())
}

async fn run_backfill(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let report = backfill_identifiers(store.as_ref()).await?;
    println!(
        "backfill: {} updated, {} skipped, {} already keyed",
        report.updated, report.skipped, report.already_keyed
    );
    Ok(())
}
