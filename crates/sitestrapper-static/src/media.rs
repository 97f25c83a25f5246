//! Media copying.

use std::fs;
use std::path::{Path, PathBuf};

use sitestrapper_manifest::MediaAsset;

/// Output subdirectory media lands in.
pub const MEDIA_OUTPUT_DIR: &str = "media";

/// Errors that can occur while copying media.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Failed to read media file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write media file {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where an asset is copied to.
///
/// A leading `media/` in the declared path is dropped so that
/// `media/css/site.css` ends up at `<output>/media/css/site.css`.
pub fn output_path(output_dir: &Path, asset: &MediaAsset) -> PathBuf {
    let path = asset.path.trim_start_matches('/');
    let relative = path
        .strip_prefix(MEDIA_OUTPUT_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path);

    output_dir.join(MEDIA_OUTPUT_DIR).join(relative)
}

/// Copy one asset verbatim into the output tree.
pub fn copy_media(root: &Path, output_dir: &Path, asset: &MediaAsset) -> Result<PathBuf, MediaError> {
    let source = root.join(asset.path.trim_start_matches('/'));
    let target = output_path(output_dir, asset);

    let bytes = fs::read(&source).map_err(|e| MediaError::ReadError {
        path: source.clone(),
        source: e,
    })?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| MediaError::WriteError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&target, bytes).map_err(|e| MediaError::WriteError {
        path: target.clone(),
        source: e,
    })?;

    tracing::debug!("Copied {} -> {}", source.display(), target.display());

    Ok(target)
}
