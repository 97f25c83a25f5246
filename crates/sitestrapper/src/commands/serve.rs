//! Preview server command.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::ConfigFile;

/// Static file router over a generated site.
///
/// Directory requests are answered with the directory's `index.html`;
/// missing files get a 404.
pub fn router(dir: &Path) -> Router {
    Router::new().fallback_service(ServeDir::new(dir))
}

/// Run the serve command.
pub async fn run(
    file_config: &ConfigFile,
    port: Option<u16>,
    dir: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let dir = dir
        .or_else(|| file_config.site.output.clone())
        .context("Output directory required")?;
    let port = port.unwrap_or(file_config.serve.port);

    serve(port, dir, open).await
}

/// Serve a directory until the process is stopped.
pub async fn serve(port: u16, dir: PathBuf, open: bool) -> Result<()> {
    if !dir.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'sitestrapper build' first.",
            dir.display()
        );
    }

    let addr: SocketAddr = format!("127.0.0.1:{}", port)
        .parse()
        .context("Invalid address")?;

    tracing::info!("Serving {} at http://{}/", dir.display(), addr);

    let app = router(&dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    if open {
        let url = format!("http://{}/", addr);
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;

    Ok(())
}
