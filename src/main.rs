use anyhow::{Context, Result};
use clap::Parser;
use solarlog::logging::{get_logger, init_logging};
use solarlog::portal::SolarWebClient;
use solarlog::scheduler::{Scheduler, SchedulerOptions};
use solarlog::shutdown;
use solarlog::store::Store;
use solarlog::{Config, SolarlogError};
use std::path::PathBuf;
use std::process::ExitCode;

/// Log Fronius Solar.web telemetry into SQLite
#[derive(Debug, Parser)]
#[command(name = "solarlog", version = env!("APP_VERSION"), about)]
struct Cli {
    /// Fetch every day since `install_date`, then exit
    #[arg(long)]
    backfill: bool,

    /// Keep polling after the backfill sweep
    #[arg(long, requires = "backfill")]
    then_poll: bool,

    /// Force DEBUG logging
    #[arg(short, long)]
    verbose: bool,

    /// Database file (overrides the config file)
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Clear the five-minute and hourly rollups, then exit
    #[arg(long)]
    delete_small_aggregates: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("solarlog: {:#}", e);
            let code = e
                .downcast_ref::<SolarlogError>()
                .map_or(1, SolarlogError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging, cli.verbose).context("Failed to initialize logging")?;
    let logger = get_logger("main");
    logger.info(&format!("solarlog {} starting", env!("APP_VERSION")));

    let db_path = config.database_path(cli.database.as_deref())?;
    let mut store = Store::open(&db_path)?;

    if cli.delete_small_aggregates {
        let removed = store.delete_small_aggregates()?;
        logger.info(&format!("Deleted {} small aggregate rows", removed));
        return Ok(());
    }

    config.validate()?;
    let stop = shutdown::listen_for_ctrl_c();

    let client = SolarWebClient::from_config(&config);
    let mut scheduler = Scheduler::new(
        client,
        config.credentials.clone(),
        store,
        SchedulerOptions::from(&config),
    );

    if cli.backfill {
        let install_date = config.install_date.ok_or_else(|| {
            SolarlogError::config("--backfill needs install_date in the configuration")
        })?;
        let today = scheduler.today_at(chrono::Utc::now());
        let report = tokio::select! {
            report = scheduler.backfill(install_date, today) => report?,
            () = shutdown::requested(stop.clone()) => {
                logger.info("Interrupted during backfill");
                return Ok(());
            }
        };
        logger.info(&format!(
            "Backfill stored {} of {} days",
            report.stored.len(),
            report.attempted()
        ));
        if !cli.then_poll {
            return Ok(());
        }
    }

    scheduler.run(shutdown::requested(stop)).await?;

    logger.info("solarlog stopped");
    Ok(())
}
