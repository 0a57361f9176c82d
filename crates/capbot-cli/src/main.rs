//! capbot CLI entry point.
//!
//! `run` answers mentions (continuously, or one batch with `--once`);
//! `archive` captions a user's recent posts or favourites without replying.
//! Start-up problems (unreadable credentials, invalid output directory,
//! missing fallback image) abort before any loop starts.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use capbot_core::app::BotBuilder;
use capbot_core::config::{BotConfig, Credentials, IngestMode};
use capbot_core::impls::{CommandCaptioner, HttpTransport, JsonFeedClient};
use capbot_core::ports::PostFeed;

/// Timeout for a single media download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "capbot")]
#[command(about = "Reply to mentions with captioned images of the post they reply to")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll mentions and reply to them.
    Run(RunArgs),

    /// Caption a user's recent posts or favourites into the output directory.
    Archive(ArchiveArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Credentials file (JSON).
    #[arg(short, long, default_value = "creds.json", env = "CAPBOT_CREDS")]
    creds: PathBuf,

    /// Output directory; overrides `output_dir` from the config file.
    #[arg(short, long, env = "CAPBOT_OUT")]
    out: Option<PathBuf>,

    /// Log file name, created inside the output directory.
    #[arg(short, long, default_value = "bot.log")]
    log: String,

    /// Bot configuration file (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON feed the local social client reads mentions and posts from.
    /// Defaults to `feed.json` in the output directory.
    #[arg(long)]
    feed: Option<PathBuf>,

    /// JSON-lines file published replies are appended to.
    /// Defaults to `outbox.jsonl` in the output directory.
    #[arg(long)]
    outbox: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Ingest one batch, answer it, then exit.
    #[arg(long)]
    once: bool,

    /// Number of concurrent workers.
    #[arg(short, long)]
    workers: Option<usize>,
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Screen name of the user whose posts are captioned.
    #[arg(short, long)]
    screen_name: String,

    /// Which posts to caption.
    #[arg(short = 't', long = "type", value_enum, default_value = "tweet")]
    feed: FeedArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FeedArg {
    Tweet,
    #[value(alias = "fav")]
    Favorite,
}

impl From<FeedArg> for PostFeed {
    fn from(arg: FeedArg) -> Self {
        match arg {
            FeedArg::Tweet => PostFeed::Timeline,
            FeedArg::Favorite => PostFeed::Favorites,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args, &cli.log_level).await,
        Commands::Archive(args) => archive(args, &cli.log_level).await,
    }
}

/// Config file (or defaults) with CLI overrides applied.
fn load_config(common: &CommonArgs) -> anyhow::Result<BotConfig> {
    let mut config = match &common.config {
        Some(path) => BotConfig::load(path)?,
        None => BotConfig::default(),
    };
    if let Some(out) = &common.out {
        config.output_dir = out.clone();
    }
    if !config.output_dir.is_dir() {
        anyhow::bail!(
            "given output directory {} is not valid",
            config.output_dir.display()
        );
    }
    Ok(config)
}

/// Log to stderr and to `<output_dir>/<log>`.
/// Priority: RUST_LOG env var > --log-level CLI arg.
fn init_logging(output_dir: &Path, log_name: &str, log_level: &str) -> anyhow::Result<()> {
    let log_path = output_dir.join(log_name);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("log file {} couldn't be created", log_path.display()))?;

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();
    Ok(())
}

fn builder(config: BotConfig, common: &CommonArgs) -> anyhow::Result<BotBuilder> {
    let creds = Credentials::load(&common.creds)?;
    tracing::info!(
        bot = %creds.identity.screen_name,
        keys = creds.keys.len(),
        "credentials loaded"
    );

    let feed = common
        .feed
        .clone()
        .unwrap_or_else(|| config.output_dir.join("feed.json"));
    let outbox = common
        .outbox
        .clone()
        .unwrap_or_else(|| config.output_dir.join("outbox.jsonl"));
    let social = Arc::new(JsonFeedClient::new(creds.identity, feed, outbox));
    let transport = Arc::new(HttpTransport::new(DOWNLOAD_TIMEOUT)?);
    let captioner = Arc::new(CommandCaptioner::new(config.captioner.clone()));

    Ok(BotBuilder::new(config)
        .social(social)
        .transport(transport)
        .captioner(captioner))
}

async fn run(args: RunArgs, log_level: &str) -> anyhow::Result<()> {
    let mut config = load_config(&args.common)?;
    if args.once {
        config.ingest_mode = IngestMode::Batch;
    }
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    init_logging(&config.output_dir, &args.common.log, log_level)?;

    let bot = builder(config, &args.common)?.build()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested; waiting for in-flight replies");
                let _ = shutdown_tx.send(true);
            }
            // dropping the sender also stops the bot
            Err(err) => tracing::error!(error = %err, "failed to listen for ctrl-c"),
        }
    });

    if let Some(report) = bot.run(shutdown_rx).await.context("bot run failed")? {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

async fn archive(args: ArchiveArgs, log_level: &str) -> anyhow::Result<()> {
    let config = load_config(&args.common)?;
    init_logging(&config.output_dir, &args.common.log, log_level)?;

    let output_dir = config.output_dir.clone();
    let archiver = builder(config, &args.common)?.build_archiver()?;
    let report = archiver
        .archive(&args.screen_name, args.feed.into(), &output_dir)
        .await?;

    tracing::info!(
        captioned = report.captioned.len(),
        failed = report.failures.len(),
        dir = %report.caption_dir.display(),
        "archive finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
