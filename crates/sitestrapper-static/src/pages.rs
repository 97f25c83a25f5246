//! Page header gathering and rendering.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use sitestrapper_manifest::{parse_document, HeaderError, SitePage};

use crate::content::ContentProcessor;
use crate::templates::{SiteTemplates, TemplateError};

/// Shell template used when a page header names none.
pub const DEFAULT_TEMPLATE: &str = "Main";

/// Header of a page file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageHeader {
    pub template: String,
    pub id: String,
    pub title: String,
    #[serde(rename = "linkTitle", alias = "linktitle")]
    pub link_title: String,
}

/// Errors that can occur while gathering or rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Failed to read page {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{source} in page {path}")]
    HeaderError { path: PathBuf, source: HeaderError },

    #[error("no such template {template} in page {path}")]
    NoSuchTemplate { template: String, path: String },

    #[error("Failed to render page {path}: {source}")]
    RenderError { path: String, source: TemplateError },

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read a page source and fill in its metadata and content.
pub fn gather_page_info(root: &Path, page: &mut SitePage, base: &str) -> Result<(), PageError> {
    let path = root.join(&page.path);
    let source = fs::read_to_string(&path).map_err(|source| PageError::ReadError {
        path: path.clone(),
        source,
    })?;

    let (header, body): (PageHeader, _) =
        parse_document(&source).map_err(|source| PageError::HeaderError {
            path: path.clone(),
            source,
        })?;

    apply_header(page, header, body, base);
    Ok(())
}

/// Populate page metadata.
///
/// Each field takes the header value, then the value declared in the
/// manifest, then its default. Empty strings count as absent.
pub fn apply_header(page: &mut SitePage, header: PageHeader, body: &str, base: &str) {
    let derived = page.derived_id(base);

    page.template = first_set([header.template, std::mem::take(&mut page.template)])
        .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());

    page.id = first_set([header.id, std::mem::take(&mut page.id)])
        .unwrap_or_else(|| derived.clone());

    page.title = first_set([header.title, std::mem::take(&mut page.title)])
        .unwrap_or_else(|| capitalize(derived.rsplit('/').next().unwrap_or(&derived)));

    page.link_title = first_set([header.link_title, std::mem::take(&mut page.link_title)])
        .unwrap_or_else(|| page.title.clone());

    page.content = body.to_string();
}

fn first_set<const N: usize>(candidates: [String; N]) -> Option<String> {
    candidates.into_iter().find(|value| !value.is_empty())
}

/// Capitalize first letter of a string.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Renders gathered pages into the output tree.
pub struct PageRenderer<'a> {
    templates: &'a SiteTemplates,
    content: ContentProcessor,
    output_dir: PathBuf,
}

impl<'a> PageRenderer<'a> {
    pub fn new(templates: &'a SiteTemplates, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates,
            content: ContentProcessor::new(),
            output_dir: output_dir.into(),
        }
    }

    /// Render a page to its final HTML.
    pub fn render(&self, page: &SitePage) -> Result<String, PageError> {
        let manifest = self.templates.manifest();

        if !self.templates.contains(&page.template) {
            return Err(PageError::NoSuchTemplate {
                template: page.template.clone(),
                path: page.path.clone(),
            });
        }

        let html = self.content.render(&page.content, manifest);

        // Page bodies may call template functions themselves.
        let body = self
            .templates
            .render_fragment(&page.id, &html)
            .map_err(|source| PageError::RenderError {
                path: page.path.clone(),
                source,
            })?;

        self.templates
            .render_shell(&page.template, &body, &page.title)
            .map_err(|source| PageError::RenderError {
                path: page.path.clone(),
                source,
            })
    }

    /// Output file a page is written to.
    pub fn output_path(&self, page: &SitePage) -> PathBuf {
        let public = self.templates.manifest().public_path(page);
        self.output_dir.join(public.trim_start_matches('/'))
    }

    /// Render a page and write it, replacing any existing file.
    pub fn write(&self, page: &SitePage) -> Result<PathBuf, PageError> {
        let html = self.render(page)?;
        let output_path = self.output_path(page);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|source| PageError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&output_path, html).map_err(|source| PageError::WriteError {
            path: output_path.clone(),
            source,
        })?;

        tracing::debug!("Wrote {} -> {}", page.path, output_path.display());

        Ok(output_path)
    }
}
