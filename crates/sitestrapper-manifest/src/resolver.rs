//! Manifest resolution.
//!
//! Resolution happens in two stages. The declared stage reads `sitemap.yaml`
//! from the content root when it exists. The inference stage then fills
//! every section the manifest left empty by scanning the conventional
//! subdirectories. A section is either fully declared or fully inferred,
//! entries are never merged.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::model::{
    MediaAsset, MediaType, SiteManifest, SitePage, TemplateDescriptor, DEFAULT_BASE_PAGE_PATH,
};

/// Manifest filename looked up in the content root.
pub const MANIFEST_FILE: &str = "sitemap.yaml";

/// Subdirectory media is discovered under.
pub const MEDIA_DIR: &str = "media";

/// Subdirectory pages are discovered under.
pub const PAGES_DIR: &str = "site";

/// Subdirectory templates are discovered under.
pub const TEMPLATES_DIR: &str = "templates";

/// Errors that can occur while resolving a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid manifest {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Failed to scan {path}: {source}")]
    WalkError {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Resolve the complete manifest for a content root.
pub fn resolve(root: &Path) -> Result<SiteManifest, ManifestError> {
    let mut manifest = load_declared(root)?;
    infer_missing(root, &mut manifest)?;

    tracing::info!(
        "Resolved manifest: {} pages, {} templates, {} media files",
        manifest.pages.len(),
        manifest.templates.len(),
        manifest.media.len()
    );

    Ok(manifest)
}

/// Read the declared manifest, or an empty one if the root has none.
pub fn load_declared(root: &Path) -> Result<SiteManifest, ManifestError> {
    let path = root.join(MANIFEST_FILE);

    if !path.exists() {
        tracing::debug!("No {} in {}, inferring site layout", MANIFEST_FILE, root.display());
        return Ok(SiteManifest::default());
    }

    let source = fs::read_to_string(&path).map_err(|source| ManifestError::ReadError {
        path: path.clone(),
        source,
    })?;

    if source.trim().is_empty() {
        return Ok(SiteManifest::default());
    }

    let mut manifest: SiteManifest =
        serde_yaml::from_str(&source).map_err(|e| ManifestError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;

    for asset in manifest.media.iter_mut().filter(|m| m.name.is_empty()) {
        asset.name = file_name(&asset.path).to_string();
    }

    tracing::info!("Loaded manifest from {}", path.display());

    Ok(manifest)
}

/// Fill every empty section of the manifest from the directory layout.
pub fn infer_missing(root: &Path, manifest: &mut SiteManifest) -> Result<(), ManifestError> {
    if manifest.media.is_empty() {
        manifest.media = infer_media(root)?;
    }

    if manifest.pages.is_empty() {
        manifest.pages = infer_pages(root)?;
        manifest.base_page_path = DEFAULT_BASE_PAGE_PATH.to_string();
    }

    if manifest.templates.is_empty() {
        manifest.templates = infer_templates(root)?;
    }

    Ok(())
}

/// Discover media files, skipping extensions that are not a known kind.
pub fn infer_media(root: &Path) -> Result<Vec<MediaAsset>, ManifestError> {
    let mut media = Vec::new();

    for path in walk_files(root, MEDIA_DIR)? {
        let ext = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let Some(media_type) = MediaType::from_extension(ext) else {
            tracing::debug!("Skipping unclassified media file {}", path);
            continue;
        };

        let name = file_name(&path).to_string();
        media.push(MediaAsset {
            media_type,
            path,
            name,
        });
    }

    Ok(media)
}

/// Discover page sources, skipping files that are already HTML.
pub fn infer_pages(root: &Path) -> Result<Vec<SitePage>, ManifestError> {
    Ok(walk_files(root, PAGES_DIR)?
        .into_iter()
        .filter(|path| !path.ends_with(".html"))
        .map(SitePage::stub)
        .collect())
}

/// Discover template files. Every file counts.
pub fn infer_templates(root: &Path) -> Result<Vec<TemplateDescriptor>, ManifestError> {
    Ok(walk_files(root, TEMPLATES_DIR)?
        .into_iter()
        .map(|path| TemplateDescriptor { path })
        .collect())
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// List files under `root/dir` as `/`-separated paths relative to `root`.
///
/// A missing directory is a walk error like any other.
fn walk_files(root: &Path, dir: &str) -> Result<Vec<String>, ManifestError> {
    let base = root.join(dir);
    let mut files = Vec::new();

    for entry in WalkDir::new(&base).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| ManifestError::WalkError {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base.clone()),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        files.push(parts.join("/"));
    }

    Ok(files)
}
