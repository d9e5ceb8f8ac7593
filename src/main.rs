//! Command line entry point for the zone and facility assignment run.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zone_assigner::config::Config;
use zone_assigner::error::Result;
use zone_assigner::pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "zone-assigner")]
#[command(about = "Assigns activity chains to destination zones and facilities")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full assignment and write outputs
    Run {
        /// TOML run configuration
        #[arg(long, short)]
        config: PathBuf,

        /// Override the random seed from the config
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the config id and the output directory it maps to
    ConfigId {
        #[arg(long, short)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Run { config, seed } => {
            let mut config = Config::load(&config)?;
            if let Some(seed) = seed {
                config.parameters.seed = seed;
            }
            let output_dir = config.output_dir()?;
            info!(id = %config.id()?, output = %output_dir.display(), "starting run");

            let pipeline = Pipeline::from_config(config)?;
            let output = pipeline.run()?;
            pipeline.write(&output, &output_dir)?;
        }
        Command::ConfigId { config } => {
            let config = Config::load(&config)?;
            println!("{}", config.id()?);
            println!("{}", config.output_dir()?.display());
        }
    }
    Ok(())
}
