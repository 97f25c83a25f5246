//! Site build command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sitestrapper_static::{BuildConfig, SiteBuilder};

use crate::config::ConfigFile;

/// Merge command-line directories over the config file.
///
/// Both directories are required.
fn build_config(
    file_config: &ConfigFile,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<BuildConfig> {
    let input_dir = input
        .or_else(|| file_config.site.input.clone())
        .context("Input directory required")?;
    let output_dir = output
        .or_else(|| file_config.site.output.clone())
        .context("Output directory required")?;

    Ok(BuildConfig {
        input_dir,
        output_dir,
    })
}

/// Run the build command.
pub async fn run(
    file_config: &ConfigFile,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    port: Option<u16>,
) -> Result<()> {
    let config = build_config(file_config, input, output)?;

    tracing::info!(
        "Generating site from {} to {}...",
        config.input_dir.display(),
        config.output_dir.display()
    );

    let result = SiteBuilder::new(config).build()?;

    tracing::info!(
        "Built {} pages and copied {} media files in {}ms",
        result.pages,
        result.media,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    if let Some(port) = port {
        super::serve::serve(port, result.output_dir, false).await?;
    }

    Ok(())
}
