use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use slipscan::config::load_engine_config;
use slipscan::fetch::{FilePageFetcher, HttpPageFetcher, PageFetcher};
use slipscan::harness::{HarnessOptions, run_harness};
use slipscan::model::{Platform, ScrapeInput};
use slipscan::pipeline::{extract_slip, scrape_slip};
use slipscan::store::{JsonTeamStore, NoopTeamLookup, TeamLookup};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "slipscan", about = "Booking-code bet slip extractor")]
struct Cli {
    #[arg(long, default_value = "configs/engine.toml")]
    config: PathBuf,

    #[arg(long)]
    team_store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract a slip from a saved page.
    Extract {
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        code: String,
        #[arg(long)]
        document: PathBuf,
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Fetch the booking page and extract it.
    Scrape {
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        code: String,
        #[arg(long)]
        fixtures_dir: Option<PathBuf>,
    },
    Validate,
    Harness {
        #[arg(long, default_value = "tests/fixtures/pages")]
        fixtures_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let config = load_engine_config(Some(&cli.config))?;
    let lookup: Box<dyn TeamLookup> = match &cli.team_store {
        Some(path) => Box::new(JsonTeamStore::open(path)?),
        None => Box::new(NoopTeamLookup),
    };

    match cli.command {
        Commands::Extract {
            platform,
            code,
            document,
            now,
        } => {
            let body = std::fs::read_to_string(&document)
                .with_context(|| format!("failed to read document {}", document.display()))?;
            let record = extract_slip(
                &ScrapeInput {
                    platform,
                    booking_code: code,
                    document: body,
                },
                &config,
                lookup.as_ref(),
                now.unwrap_or_else(Utc::now),
            );
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Scrape {
            platform,
            code,
            fixtures_dir,
        } => {
            let fetcher: Box<dyn PageFetcher> = match fixtures_dir {
                Some(dir) => Box::new(FilePageFetcher::new(dir)),
                None => Box::new(HttpPageFetcher::new(&config.fetch)?),
            };
            match scrape_slip(fetcher.as_ref(), platform, &code, &config, lookup.as_ref()) {
                Ok(record) => {
                    if record.is_empty() {
                        info!(%platform, %code, "no matches found; check the code and retry");
                    }
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                Err(err) => bail!("{err} [{}]", err.kind()),
            }
        }
        Commands::Validate => {
            config.validate()?;
            println!("OK: {}", cli.config.display());
            for (name, platform) in &config.fetch.platforms {
                println!(
                    "OK: {name} ({}s, rendered={})",
                    platform.timeout_secs, platform.rendered
                );
            }
        }
        Commands::Harness { fixtures_dir } => {
            let report = run_harness(
                &HarnessOptions {
                    fixtures_dir,
                    now: Utc::now(),
                },
                &config,
            )?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
