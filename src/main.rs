use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skyquery_core::Config;
use skyquery_weather::{
    translate_condition_code, Payload, QueryService, Scope, Units, WeatherError,
};

#[derive(Parser, Debug)]
#[command(name = "skyquery")]
#[command(about = "Query a YQL weather endpoint with a local response cache")]
#[command(version)]
struct Args {
    /// Path to config file (default: $XDG_CONFIG_HOME/skyquery/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full forecast record
    Data(LocationArgs),
    Wind(LocationArgs),
    Atmosphere(LocationArgs),
    Astronomy(LocationArgs),
    Forecast(LocationArgs),
    Conditions(LocationArgs),
    /// Find WOEIDs matching a place name
    Search { text: String },
    /// Translate a condition code to text
    Condition { code: String },
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Args, Debug)]
struct LocationArgs {
    /// Location WOEID
    woeid: u64,

    /// Units: "c" (metric) or "f" (imperial); defaults to the configured units
    #[arg(short, long)]
    units: Option<Units>,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Remove expired entries
    Prune,
    /// Remove all entries
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = skyquery_core::init() {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            match e.downcast_ref::<WeatherError>() {
                Some(err) => eprintln!("{} ({})", err.user_message(), err),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let (config, _) = Config::load_validated(args.config.as_deref())?;

    match args.command {
        Command::Condition { code } => match translate_condition_code(&code) {
            Some(text) => println!("{}", text),
            None => anyhow::bail!("Unknown condition code: {}", code),
        },
        Command::Search { text } => {
            let service = open_service(&config)?;
            print_json(&service.search_locations(&text).await?)?;
        }
        Command::Cache { action } => {
            let service = open_service(&config)?;
            let removed = match action {
                CacheAction::Prune => service.cache().purge_expired(),
                CacheAction::Clear => service.cache().clear(),
            }
            .map_err(WeatherError::from)?;
            println!("Removed {} cache entries", removed);
        }
        Command::Data(l) => run_scoped(&config, Scope::All, l).await?,
        Command::Wind(l) => run_scoped(&config, Scope::Wind, l).await?,
        Command::Atmosphere(l) => run_scoped(&config, Scope::Atmosphere, l).await?,
        Command::Astronomy(l) => run_scoped(&config, Scope::Astronomy, l).await?,
        Command::Forecast(l) => run_scoped(&config, Scope::Forecast, l).await?,
        Command::Conditions(l) => run_scoped(&config, Scope::Conditions, l).await?,
    }
    Ok(())
}

/// Build the query service, creating the configured cache directory first.
fn open_service(config: &Config) -> Result<QueryService> {
    std::fs::create_dir_all(&config.cache.dir).with_context(|| {
        format!(
            "Failed to create cache directory {}",
            config.cache.dir.display()
        )
    })?;
    Ok(QueryService::from_config(config)?)
}

async fn run_scoped(config: &Config, scope: Scope, location: LocationArgs) -> Result<()> {
    let units = match location.units {
        Some(units) => units,
        None => config
            .units
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?,
    };
    tracing::debug!(%scope, woeid = location.woeid, %units, "Running query");

    let service = open_service(config)?;
    print_json(&service.scoped(scope, location.woeid, units).await?)
}

fn print_json(payload: &Payload) -> Result<()> {
    let text = serde_json::to_string_pretty(payload).context("Failed to format result")?;
    println!("{}", text);
    Ok(())
}
