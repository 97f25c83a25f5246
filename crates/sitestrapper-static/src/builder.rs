//! Static site builder.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use sitestrapper_manifest::{resolve, ManifestError};

use crate::media::{copy_media, MediaError};
use crate::pages::{gather_page_info, PageError, PageRenderer};
use crate::templates::{TemplateError, TemplateRegistry};

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Content root holding `site/`, `templates/`, `media/` and `sitemap.yaml`
    pub input_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages generated
    pub pages: usize,

    /// Number of media files copied
    pub media: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Failed to create output directory {path}: {source}")]
    OutputError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build the site. The first error aborts the run.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let root = &self.config.input_dir;
        let output_dir = &self.config.output_dir;

        if !root.is_dir() {
            return Err(BuildError::InputNotFound(root.clone()));
        }

        fs::create_dir_all(output_dir).map_err(|source| BuildError::OutputError {
            path: output_dir.clone(),
            source,
        })?;

        let mut manifest = resolve(root)?;

        let registry = TemplateRegistry::load(root, &manifest.templates)?;

        // Every page needs its id before any page is rendered, so that
        // cross-page links resolve regardless of order.
        let base = manifest.base_page_path.clone();
        for page in &mut manifest.pages {
            gather_page_info(root, page, &base)?;
        }

        let mut seen = HashSet::new();
        for page in &manifest.pages {
            if !seen.insert(page.id.as_str()) {
                tracing::warn!(
                    "Duplicate page id {} in {}, links resolve to the first page",
                    page.id,
                    page.path
                );
            }
        }

        let templates = registry.bind(Arc::new(manifest));
        let manifest = templates.manifest();
        let renderer = PageRenderer::new(&templates, output_dir);

        for page in &manifest.pages {
            renderer.write(page)?;
        }

        for asset in &manifest.media {
            copy_media(root, output_dir, asset)?;
        }

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: manifest.pages.len(),
            media: manifest.media.len(),
            duration_ms: duration.as_millis() as u64,
            output_dir: output_dir.clone(),
        })
    }
}
