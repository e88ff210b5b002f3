pub mod cache;
pub mod color;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod format;
pub mod map;
pub mod render;
pub mod server;
pub mod shell;
pub mod types;

use anyhow::Context;
use clap::{Parser, Subcommand};
use diagnostics::Verbosity;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive map with its budget control
    Serve {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Override the diagnostics verbosity from the config file
        #[arg(long, value_enum)]
        verbosity: Option<Verbosity>,
    },
    /// Write the map for one budget to a standalone HTML file
    Render {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[arg(short, long)]
        budget: Option<u64>,
        #[arg(short, long, value_name = "FILE", default_value = "map.html")]
        output: PathBuf,
        #[arg(long, value_enum)]
        verbosity: Option<Verbosity>,
    },
}

fn load_config(path: Option<&PathBuf>, verbosity: Option<Verbosity>) -> anyhow::Result<config::AppConfig> {
    let mut app_config = config::AppConfig::load_or_default(path.map(|p| p.as_path()))?;
    if let Some(v) = verbosity {
        app_config.diagnostics.verbosity = v;
    }
    Ok(app_config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config, verbosity } => {
            let app_config = load_config(config.as_ref(), *verbosity)?;
            tracing::info!(
                "Serving map of {:?} and {:?}",
                app_config.input.zones_csv,
                app_config.input.houses_csv
            );
            server::start_server(app_config).await?;
        }
        Commands::Render {
            config,
            budget,
            output,
            verbosity,
        } => {
            let app_config = load_config(config.as_ref(), *verbosity)?;
            let mut shell = shell::Shell::new(app_config);
            let frame = match budget {
                Some(b) => shell.set_budget(*b),
                None => shell.render_current(),
            };
            if frame.map.is_none() {
                tracing::warn!("zones could not be loaded, the page has no map");
            }

            let page = render::render_page(shell.config(), &frame, render::PageMode::Static)?;
            fs::write(output, page).with_context(|| format!("Failed to write {:?}", output))?;
            println!("Map written to {:?}", output);
        }
    }

    Ok(())
}
