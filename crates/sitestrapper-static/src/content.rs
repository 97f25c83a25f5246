//! Page content processing: symbolic link rewriting and markdown rendering.

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};

use sitestrapper_manifest::{image_link, SiteManifest};

/// Converts page bodies to HTML.
///
/// Links of the form `[text](id:page)` and `[text](image:file)` are
/// rewritten into plain markdown links before conversion. Raw HTML in the
/// body is passed through untouched.
pub struct ContentProcessor {
    link_pattern: Regex,
}

impl ContentProcessor {
    pub fn new() -> Self {
        Self {
            link_pattern: Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link pattern"),
        }
    }

    /// Rewrite symbolic links and render the result to HTML.
    pub fn render(&self, content: &str, manifest: &SiteManifest) -> String {
        let rewritten = self.rewrite_links(content, manifest);
        render_markdown(&rewritten)
    }

    /// Rewrite `id:` and `image:` link targets into public paths.
    ///
    /// Unresolved ids and unknown prefixes are left exactly as written.
    pub fn rewrite_links(&self, content: &str, manifest: &SiteManifest) -> String {
        self.link_pattern
            .replace_all(content, |caps: &Captures| {
                let original = &caps[0];
                let text = &caps[1];

                match resolve_target(&caps[2], manifest) {
                    Some(target) => format!("[{}]({})", text, target),
                    None => original.to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for ContentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_target(target: &str, manifest: &SiteManifest) -> Option<String> {
    let (prefix, value) = target.split_once(':')?;

    match prefix {
        "id" => match manifest.page(value) {
            Some(page) => Some(manifest.public_path(page)),
            None => {
                tracing::debug!("Unresolved page id in link: {}", value);
                None
            }
        },
        "image" => Some(image_link(value)),
        _ => None,
    }
}

/// Render markdown to HTML.
///
/// Inline links still targeting `id:` after rewriting point at unknown
/// pages. They are written back as their literal markdown so the broken
/// reference stays visible in the page.
fn render_markdown(content: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(content, options);

    // One entry per open link; `Some` holds the target of an unresolved one.
    let mut open_links: Vec<Option<CowStr>> = Vec::new();

    let events = parser.flat_map(|event| match event {
        Event::Start(Tag::Link {
            link_type: LinkType::Inline,
            dest_url,
            ..
        }) if dest_url.starts_with("id:") => {
            open_links.push(Some(dest_url));
            vec![Event::Text(CowStr::Borrowed("["))]
        }
        Event::Start(Tag::Link { .. }) => {
            open_links.push(None);
            vec![event]
        }
        Event::End(TagEnd::Link) => match open_links.pop() {
            Some(Some(dest_url)) => vec![Event::Text(format!("]({})", dest_url).into())],
            _ => vec![event],
        },
        _ => vec![event],
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, events);

    html_output
}
