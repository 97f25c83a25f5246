//! Site manifest model and resolution.
//!
//! This crate describes a site's pages, media, templates and categories,
//! resolves them from an optional `sitemap.yaml` plus the content directory
//! layout, and provides the header/body split shared by page and template
//! files.

pub mod header;
pub mod model;
pub mod resolver;

pub use header::{parse_document, parse_header, split_document, HeaderError, SEPARATOR};
pub use model::{
    image_link, MediaAsset, MediaType, PageLink, SiteManifest, SitePage, TemplateDescriptor,
    DEFAULT_BASE_PAGE_PATH, IMAGE_ROOT,
};
pub use resolver::{resolve, ManifestError, MANIFEST_FILE};
