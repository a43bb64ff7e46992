use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apifootball_sync::pipeline::{Converger, RefreshSummary, SyncSummary};
use apifootball_sync::transport::HttpTransport;
use apifootball_sync::{Pipeline, Settings};

#[derive(Parser)]
#[command(name = "apifootball-sync")]
#[command(about = "Download football data into raw captures and rebuild the newest datasets")]
struct Cli {
    /// Project root holding raw_data/ and newest_data/ (overrides FOOTBALL_PROJECT_DIR)
    #[arg(short, long, value_name = "DIR", global = true)]
    project_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(short = 'v', long, default_value = "info", global = true)]
    log_level: String,

    /// Keep requesting even when the remaining daily quota is at or under the floor
    #[arg(long, global = true)]
    bypass_quota_floor: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the remaining daily request budget
    Quota,
    /// Download leagues and countries
    Leagues,
    /// Download current season fixtures for every active league
    Fixtures,
    /// Download squads for the given teams
    Squads {
        #[arg(long = "team", required = true, num_args = 1..)]
        teams: Vec<u32>,
    },
    /// Download events for the given fixtures
    Events {
        #[arg(long = "fixture", required = true, num_args = 1..)]
        fixtures: Vec<u64>,
    },
    /// Rebuild every dataset from the newest captures on disk
    Refresh,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("apifootball_sync={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.project_dir {
        settings.project_dir = dir;
    }
    if cli.bypass_quota_floor {
        settings.bypass_quota_floor = true;
    }

    match cli.command {
        Command::Refresh => {
            // Refresh never touches the network, so it does not need a key.
            let summary = Converger::from_settings(&settings)
                .refresh_from_latest()
                .context("refresh from latest captures failed")?;
            print_refresh(&summary);
        }
        Command::Quota => {
            let quota = online(settings)?
                .check_quota()
                .context("quota check failed")?;
            println!("Daily limit: {}", quota.daily_limit);
            println!("Used: {}", quota.used);
            println!("Remaining: {}", quota.remaining);
        }
        Command::Leagues => {
            let summary = online(settings)?
                .sync_leagues()
                .context("leagues sync failed")?;
            print_sync("Leagues", &summary);
        }
        Command::Fixtures => {
            let summary = online(settings)?
                .sync_season_matches()
                .context("season fixtures sync failed")?;
            print_sync("Fixtures", &summary);
        }
        Command::Squads { teams } => {
            let summary = online(settings)?
                .sync_squads(&teams)
                .context("squads sync failed")?;
            print_sync("Squads", &summary);
        }
        Command::Events { fixtures } => {
            let summary = online(settings)?
                .sync_events(&fixtures)
                .context("events sync failed")?;
            print_sync("Events", &summary);
        }
    }
    Ok(())
}

fn online(settings: Settings) -> Result<Pipeline<HttpTransport>> {
    Pipeline::from_settings(settings).context("unable to build pipeline")
}

fn print_sync(label: &str, summary: &SyncSummary) {
    println!("{label} sync complete");
    println!("Captures written: {}", summary.captures.len());
    for dataset in &summary.datasets {
        println!(
            " - {}: {} records -> {}",
            dataset.name.as_str(),
            dataset.records,
            dataset.path.display()
        );
    }
}

fn print_refresh(summary: &RefreshSummary) {
    println!("Refresh complete");
    println!("Captures used: {}", summary.captures_used);
    for dataset in &summary.datasets {
        println!(
            " - {}: {} records -> {}",
            dataset.name.as_str(),
            dataset.records,
            dataset.path.display()
        );
    }
    if !summary.skipped.is_empty() {
        println!("Skipped (no captures): {}", summary.skipped.join(", "));
    }
}
