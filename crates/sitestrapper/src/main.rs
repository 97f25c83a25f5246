//! Sitestrapper CLI - generates a static site from content, templates and a manifest.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "sitestrapper")]
#[command(about = "Generate a static site from content, templates and a manifest")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sitestrapper.toml config file
    #[arg(short, long, default_value = "sitestrapper.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the site
    Build {
        /// Input directory
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Serve the output on this port after building
        #[arg(long)]
        port: Option<u16>,
    },

    /// Preview a generated site
    Serve {
        /// Port to listen on (defaults to config or 4000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve (defaults to the configured output)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Open the site in a browser
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let file_config = config::load_config(&cli.config)?;

    // Execute command
    match cli.command {
        Commands::Build {
            input,
            output,
            port,
        } => {
            commands::build::run(&file_config, input, output, port).await?;
        }
        Commands::Serve { port, dir, open } => {
            commands::serve::run(&file_config, port, dir, open).await?;
        }
    }

    Ok(())
}
