mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::pull::PullArgs;

#[derive(Parser)]
#[command(name = "modelfetch")]
#[command(author, version, about = "Mirror a model repository from the Hugging Face hub", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Download options used when no subcommand is given
    #[command(flatten)]
    pull: PullArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the configured repository (default)
    Pull(PullArgs),

    /// Show disk usage and files of a download directory
    #[command(alias = "ls")]
    List {
        /// Directory to inspect (defaults to the configured download directory)
        dir: Option<PathBuf>,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let status = match cli.command {
        Some(Commands::Pull(args)) => commands::pull::execute(&args).await?,
        Some(Commands::List { dir, config }) => {
            commands::list::execute(dir, config.as_deref())?;
            return Ok(ExitCode::SUCCESS);
        }
        None => commands::pull::execute(&cli.pull).await?,
    };

    Ok(status.into())
}
