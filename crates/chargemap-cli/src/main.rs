mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chargemap-cli")]
#[command(about = "EV charging map command line interface")]
struct Cli {
    /// Treat the device as offline: no network, cached data only.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the filtered locations with their map positions.
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Write the filtered map as an SVG file.
    Render {
        /// Output file.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Manage the offline cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Debug, Default, Args)]
struct FilterArgs {
    /// Case-insensitive substring of name, street, city or zip.
    #[arg(long)]
    search: Option<String>,
    /// Status to show; repeatable or comma-separated. Omit for all.
    #[arg(long = "status")]
    statuses: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum CacheCommands {
    /// Register the offline worker: pre-cache seeds and evict old versions.
    Install,
    /// List cache bucket names.
    Buckets,
    /// Delete every cache bucket.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = chargemap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    config.start_offline |= cli.offline;

    match cli.command {
        Some(Commands::List { filters }) => commands::run_list(&config, &filters).await?,
        Some(Commands::Render { out, filters }) => {
            commands::run_render(&config, &filters, &out).await?;
        }
        Some(Commands::Cache { command }) => match command {
            CacheCommands::Install => commands::run_cache_install(&config).await?,
            CacheCommands::Buckets => commands::run_cache_buckets(&config).await?,
            CacheCommands::Clear => commands::run_cache_clear(&config).await?,
        },
        None => println!("chargemap-cli ready; run with --help for commands"),
    }

    Ok(())
}
