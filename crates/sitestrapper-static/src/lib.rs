//! Static site generator for sitestrapper.
//!
//! Compiles the site's templates, renders every page through the content
//! processor and its shell template, and copies media into the output tree.

pub mod builder;
pub mod content;
pub mod media;
pub mod pages;
pub mod templates;

pub use builder::{BuildConfig, BuildError, BuildResult, SiteBuilder};
pub use content::ContentProcessor;
pub use pages::{PageError, PageRenderer, DEFAULT_TEMPLATE};
pub use templates::{RenderContext, SiteTemplates, TemplateError, TemplateRegistry};
