use anyhow::{ensure, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};

use content_sync::config::{self, SyncSettings};
use content_sync::error::SyncError;
use content_sync::kind::find_kind;
use content_sync::publish::PublishClient;
use content_sync::shutdown::Shutdown;
use content_sync::source::ContentfulClient;
use content_sync::sync::{RunOptions, SyncOrchestrator};

const DEFAULT_CONFIG: &str = "content-sync.yaml";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Push published content entries to the render-and-submit server"
)]
struct Args {
    /// Path to YAML config file (defaults to content-sync.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Entry kind to sync: article, recipe, category, faq or a configured kind
    #[arg(long, default_value = "article")]
    kind: String,

    /// Show what would be submitted without posting anything
    #[arg(long)]
    dry_run: bool,

    /// Submit every non-archived entry, ignoring renderPage
    #[arg(long)]
    ignore_render_page: bool,

    /// Maximum number of entries to fetch
    #[arg(long)]
    max_entries: Option<usize>,

    /// Seconds between submissions; batches wait twice as long
    #[arg(long)]
    delay: Option<f64>,

    /// Entries per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Stop after the first batch
    #[arg(long)]
    first_batch_only: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List known entry kinds and exit
    #[arg(long)]
    list_kinds: bool,

    /// Print an example config file and exit
    #[arg(long)]
    print_example_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.print_example_config {
        print!("{}", config::example());
        return Ok(());
    }

    let config_path = args.config.clone().or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG);
        default.exists().then_some(default)
    });
    let mut cfg = config::read(config_path.as_deref())
        .with_context(|| format!("reading config {:?}", config_path))?;

    if args.list_kinds {
        for kind in cfg.all_kinds() {
            println!(
                "{:<12} content_type={:<16} path={}",
                kind.name,
                kind.content_type,
                kind.structured_path.as_deref().unwrap_or(&kind.legacy_path)
            );
        }
        return Ok(());
    }

    apply_overrides(&mut cfg.sync, &args)?;
    config::validate(&cfg).context("invalid configuration")?;

    let kinds = cfg.all_kinds();
    let kind = find_kind(&kinds, &args.kind).ok_or_else(|| SyncError::UnknownKind(args.kind.clone()))?;

    let source = ContentfulClient::from_config(&cfg.source, cfg.sync.fetch_timeout())
        .context("building content source client")?;
    let publisher = PublishClient::new(&cfg.target.base_url).context("building publish client")?;

    let confirmed = args.yes
        || args.dry_run
        || confirm(&format!(
            "Sync '{}' entries to {} with {:?} between requests? (y/N): ",
            kind.name,
            publisher.base_url(),
            cfg.sync.item_delay()
        ))?;

    let options = RunOptions {
        dry_run: args.dry_run,
        ignore_render_flag: args.ignore_render_page,
        max_entries: args.max_entries,
        confirmed,
        first_batch_only: args.first_batch_only,
    };

    let shutdown = Shutdown::new();
    shutdown.install_ctrl_c_handler();

    info!(kind = %kind.name, target = %publisher.base_url(), "starting content sync");
    let report = SyncOrchestrator::new(&source, &publisher, kind, cfg.sync.clone())
        .interruptible(shutdown)
        .run(&options)
        .await
        .map_err(|err| {
            error!(error = %err, "sync aborted");
            err
        })?;

    print!("{report}");
    let code = report.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn apply_overrides(sync: &mut SyncSettings, args: &Args) -> Result<()> {
    if let Some(delay) = args.delay {
        ensure!(delay.is_finite() && delay >= 0.0, "--delay must be a non-negative number");
        sync.item_delay_ms = (delay * 1000.0).round() as u64;
        sync.batch_delay_ms = None;
    }
    if let Some(batch_size) = args.batch_size {
        sync.batch_size = batch_size;
    }
    Ok(())
}

/// Ask on stdin; only an explicit "y" confirms.
fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
