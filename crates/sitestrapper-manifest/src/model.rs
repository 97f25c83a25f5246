//! Site manifest data model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Directory pages are discovered under when no manifest lists them.
pub const DEFAULT_BASE_PAGE_PATH: &str = "site/";

/// Public root images are linked from.
pub const IMAGE_ROOT: &str = "/media/images";

/// Kind of a media asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Stylesheet,
    Script,
    Image,
    /// Declared in a manifest with a type outside the known kinds
    #[serde(other)]
    Other,
}

impl MediaType {
    /// Classify a file by its extension, if it is a known kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "css" => Some(Self::Stylesheet),
            "js" => Some(Self::Script),
            "png" | "jpg" | "jpeg" | "gif" => Some(Self::Image),
            _ => None,
        }
    }

    /// Parse the name templates use to ask for media (`media('stylesheet')`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "stylesheet" => Some(Self::Stylesheet),
            "script" => Some(Self::Script),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// A media file copied into the output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    #[serde(rename = "type")]
    pub media_type: MediaType,

    /// Path relative to the content root
    pub path: String,

    /// Base filename, used as a lookup key
    #[serde(default)]
    pub name: String,
}

/// A template file declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    /// Path relative to the content root
    pub path: String,
}

/// A content page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SitePage {
    /// Path relative to the content root
    pub path: String,

    /// Nested pages, only present in manifest-declared trees
    pub subpages: Vec<SitePage>,

    /// Symbolic identifier used for cross-page links
    pub id: String,

    pub title: String,

    /// Display text when the page is referenced from listings
    #[serde(alias = "linktitle")]
    pub link_title: String,

    /// Logical name of the shell template
    pub template: String,

    /// Body text after header removal
    pub content: String,
}

impl SitePage {
    /// Create a page stub with only its path set.
    pub fn stub(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Path relative to the base page directory, with its extension removed.
    fn stem(&self, base: &str) -> &str {
        let relative = self.path.strip_prefix(base).unwrap_or(&self.path);
        let file_start = relative.rfind('/').map_or(0, |i| i + 1);

        match relative[file_start..].rfind('.') {
            Some(dot) if dot > 0 => &relative[..file_start + dot],
            _ => relative,
        }
    }

    /// Output-relative URL path of the generated page.
    ///
    /// `site/about/team.md` with base `site/` becomes `/about/team.html`.
    pub fn public_path(&self, base: &str) -> String {
        format!("/{}.html", self.stem(base))
    }

    /// Identifier used when the page header does not declare one.
    pub fn derived_id(&self, base: &str) -> String {
        self.stem(base).to_lowercase()
    }
}

/// A page reference as exposed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PageLink {
    /// Public path of the page
    pub link: String,
    /// Link title of the page
    pub title: String,
}

fn default_base_page_path() -> String {
    DEFAULT_BASE_PAGE_PATH.to_string()
}

/// Declarative description of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteManifest {
    pub title: String,

    pub media: Vec<MediaAsset>,

    /// Prefix stripped from page paths to form public paths
    #[serde(alias = "basepagepath")]
    pub base_page_path: String,

    pub pages: Vec<SitePage>,

    pub templates: Vec<TemplateDescriptor>,

    /// Named, ordered lists of page ids
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Default for SiteManifest {
    fn default() -> Self {
        Self {
            title: String::new(),
            media: Vec::new(),
            base_page_path: default_base_page_path(),
            pages: Vec::new(),
            templates: Vec::new(),
            categories: BTreeMap::new(),
        }
    }
}

impl SiteManifest {
    /// Find a page by symbolic id. The first declared match wins.
    pub fn page(&self, id: &str) -> Option<&SitePage> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Public path of a page.
    pub fn public_path(&self, page: &SitePage) -> String {
        page.public_path(&self.base_page_path)
    }

    /// Resolve a page id into its link/title pair.
    pub fn page_link(&self, id: &str) -> Option<PageLink> {
        self.page(id).map(|p| PageLink {
            link: self.public_path(p),
            title: p.link_title.clone(),
        })
    }

    /// Resolve a category into page links, dropping ids that do not resolve.
    ///
    /// Unknown categories yield an empty list.
    pub fn category_pages(&self, category: &str) -> Vec<PageLink> {
        self.categories
            .get(category)
            .map(|ids| ids.iter().filter_map(|id| self.page_link(id)).collect())
            .unwrap_or_default()
    }

    /// Media assets of one kind, in declaration order.
    pub fn media_of_type(&self, media_type: MediaType) -> impl Iterator<Item = &MediaAsset> {
        self.media.iter().filter(move |m| m.media_type == media_type)
    }
}

/// Public path of an image under the image media root.
pub fn image_link(name: &str) -> String {
    format!("{}/{}", IMAGE_ROOT, name.trim_start_matches('/'))
}
