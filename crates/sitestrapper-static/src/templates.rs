//! Template registry and the functions templates can call.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::syntax::SyntaxConfig;
use minijinja::value::{Rest, Value};
use minijinja::{context, escape_formatter, AutoEscape, Environment, ErrorKind, Output, State};
use serde::Deserialize;

use sitestrapper_manifest::{
    image_link, parse_document, HeaderError, MediaType, SiteManifest, TemplateDescriptor,
};

/// Deepest chain of nested `tmpl` calls that is still executed.
pub const MAX_TMPL_DEPTH: usize = 16;

const TMPL_DEPTH_VAR: &str = "__tmpl_depth";

/// Header of a template file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateHeader {
    /// Logical name pages refer to the template by
    #[serde(default)]
    pub name: String,
}

/// Errors that can occur while loading or rendering templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{source} in template {path}")]
    HeaderError { path: PathBuf, source: HeaderError },

    #[error("Template {path} does not declare a name")]
    Unnamed { path: PathBuf },

    #[error("Failed to compile template {path}: {source:#}")]
    CompileError {
        path: PathBuf,
        source: minijinja::Error,
    },

    #[error("Failed to render {name}: {source:#}")]
    RenderError {
        name: String,
        source: minijinja::Error,
    },
}

/// Compiled templates keyed by logical name.
///
/// Templates are compiled before the site functions are attached; call
/// [`TemplateRegistry::bind`] once the manifest is final to get a
/// [`SiteTemplates`] that pages can be rendered with.
pub struct TemplateRegistry {
    env: Environment<'static>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let mut env = Environment::new();

        configure_escaping(&mut env);
        env.add_function("tmpl", tmpl);

        Self { env }
    }

    /// Load and compile every declared template.
    pub fn load(root: &Path, templates: &[TemplateDescriptor]) -> Result<Self, TemplateError> {
        let mut registry = Self::new();

        for descriptor in templates {
            registry.load_file(&root.join(&descriptor.path))?;
        }

        Ok(registry)
    }

    /// Load and compile a single template file.
    pub fn load_file(&mut self, path: &Path) -> Result<String, TemplateError> {
        let source = fs::read_to_string(path).map_err(|source| TemplateError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let (header, body): (TemplateHeader, _) =
            parse_document(&source).map_err(|source| TemplateError::HeaderError {
                path: path.to_path_buf(),
                source,
            })?;

        if header.name.is_empty() {
            return Err(TemplateError::Unnamed {
                path: path.to_path_buf(),
            });
        }

        self.add_template(&header.name, body)
            .map_err(|source| TemplateError::CompileError {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Compiled template {} from {}", header.name, path.display());

        Ok(header.name)
    }

    /// Compile template source under a logical name.
    ///
    /// A later template with the same name replaces the earlier one.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), minijinja::Error> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())
    }

    /// Attach the site functions, closing over the finished manifest.
    ///
    /// Page bodies get an environment of their own in which only `{{ }}`
    /// is a directive; `tmpl` calls from there run against the registry.
    pub fn bind(mut self, manifest: Arc<SiteManifest>) -> SiteTemplates {
        let context = RenderContext::new(manifest);

        add_site_functions(&mut self.env, &context);
        let env = Arc::new(self.env);

        let mut fragments = Environment::new();
        fragments.set_syntax(fragment_syntax());
        configure_escaping(&mut fragments);
        add_site_functions(&mut fragments, &context);

        let registry = Arc::clone(&env);
        fragments.add_function(
            "tmpl",
            move |state: &State, name: String, params: Rest<Value>| {
                render_nested(&registry, state, &name, params)
            },
        );

        SiteTemplates {
            env,
            fragments,
            context,
        }
    }
}

/// Escape HTML in every template, leaving values marked safe untouched.
fn configure_escaping(env: &mut Environment<'static>) {
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_formatter(html_formatter);
}

/// Like the default formatter, but `/` is left alone so that links stay
/// readable.
fn html_formatter(out: &mut Output, state: &State, value: &Value) -> Result<(), minijinja::Error> {
    match value.as_str() {
        Some(text) if !value.is_safe() && state.auto_escape() == AutoEscape::Html => {
            out.write_str(&escape_html(text))?;
            Ok(())
        }
        _ => escape_formatter(out, state, value),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Syntax for page bodies. Block and comment tags use doubled markers so
/// that `{%` and `{#` in ordinary content are left as text.
fn fragment_syntax() -> SyntaxConfig {
    SyntaxConfig::builder()
        .block_delimiters("{%%", "%%}")
        .comment_delimiters("{##", "##}")
        .build()
        .expect("valid fragment syntax")
}

fn add_site_functions(env: &mut Environment<'static>, context: &RenderContext) {
    let ctx = context.clone();
    env.add_function("media", move |kind: String| ctx.media(&kind));

    let ctx = context.clone();
    env.add_function("page", move |id: String| {
        Value::from_serialize(ctx.manifest.page_link(&id).unwrap_or_default())
    });

    let ctx = context.clone();
    env.add_function("pageLink", move |id: String| ctx.page_link(&id));

    env.add_function("imageLink", |name: String| image_link(&name));

    let ctx = context.clone();
    env.add_function("pages", move |category: String| {
        Value::from_serialize(ctx.manifest.category_pages(&category))
    });
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Site data the template functions read from.
#[derive(Debug, Clone)]
pub struct RenderContext {
    manifest: Arc<SiteManifest>,
}

impl RenderContext {
    pub fn new(manifest: Arc<SiteManifest>) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &SiteManifest {
        &self.manifest
    }

    /// Markup including every stylesheet or script asset.
    ///
    /// Other kinds, and kinds without assets, produce nothing.
    pub fn media(&self, kind: &str) -> Value {
        let mut markup = String::new();

        match MediaType::from_name(kind) {
            Some(MediaType::Stylesheet) => {
                for asset in self.manifest.media_of_type(MediaType::Stylesheet) {
                    markup.push_str(&format!(
                        r#"<link rel="stylesheet" href="/{}" />"#,
                        asset.path
                    ));
                }
            }
            Some(MediaType::Script) => {
                for asset in self.manifest.media_of_type(MediaType::Script) {
                    markup.push_str(&format!(r#"<script src="/{}"></script>"#, asset.path));
                }
            }
            _ => {}
        }

        Value::from_safe_string(markup)
    }

    /// Public path of a page, or the id itself when no page has it.
    pub fn page_link(&self, id: &str) -> String {
        match self.manifest.page(id) {
            Some(page) => self.manifest.public_path(page),
            None => {
                tracing::debug!("pageLink: no page with id {}", id);
                id.to_string()
            }
        }
    }
}

/// Execute another template with positional parameters bound to
/// `Param1..ParamN`.
fn tmpl(state: &State, name: String, params: Rest<Value>) -> Value {
    render_nested(state.env(), state, &name, params)
}

fn render_nested(env: &Environment<'_>, state: &State, name: &str, params: Rest<Value>) -> Value {
    let depth = state
        .lookup(TMPL_DEPTH_VAR)
        .and_then(|v| v.as_usize())
        .unwrap_or(0);
    if depth >= MAX_TMPL_DEPTH {
        tracing::warn!("cannot execute template {} (nested too deeply)", name);
        return Value::from_safe_string(String::new());
    }

    let template = match env.get_template(name) {
        Ok(template) => template,
        Err(e) if e.kind() == ErrorKind::TemplateNotFound => {
            return Value::from_safe_string(format!("<!-- could not find template {} -->", name));
        }
        Err(e) => {
            tracing::warn!("cannot load template {} ({:#})", name, e);
            return Value::from_safe_string(String::new());
        }
    };

    let mut data: BTreeMap<String, Value> = params
        .iter()
        .enumerate()
        .map(|(i, param)| (format!("Param{}", i + 1), param.clone()))
        .collect();
    data.insert(TMPL_DEPTH_VAR.to_string(), Value::from(depth + 1));

    match template.render(&data) {
        Ok(out) => Value::from_safe_string(out),
        Err(e) => {
            tracing::warn!("cannot execute template {} ({:#})", name, e);
            Value::from_safe_string(String::new())
        }
    }
}

/// Templates bound to a site, ready to render pages.
pub struct SiteTemplates {
    env: Arc<Environment<'static>>,
    fragments: Environment<'static>,
    context: RenderContext,
}

impl SiteTemplates {
    pub fn manifest(&self) -> &SiteManifest {
        self.context.manifest()
    }

    /// Check whether a template is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Compile and execute one-off source with no external data.
    ///
    /// Only `{{ }}` directives are recognized in the source.
    pub fn render_fragment(&self, name: &str, source: &str) -> Result<String, TemplateError> {
        self.fragments
            .render_named_str(name, source, context! {})
            .map_err(|source| TemplateError::RenderError {
                name: name.to_string(),
                source,
            })
    }

    /// Execute a shell template around rendered page content.
    ///
    /// `content` is trusted HTML and is inserted without escaping. Titles
    /// are escaped.
    pub fn render_shell(
        &self,
        template: &str,
        content: &str,
        title: &str,
    ) -> Result<String, TemplateError> {
        let render = || -> Result<String, minijinja::Error> {
            self.env.get_template(template)?.render(context! {
                content => Value::from_safe_string(content.to_string()),
                title => title,
                site_title => &self.manifest().title,
            })
        };

        render().map_err(|source| TemplateError::RenderError {
            name: template.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sitestrapper_manifest::{MediaAsset, SitePage};
    use tempfile::tempdir;

    fn manifest() -> SiteManifest {
        let mut manifest = SiteManifest {
            title: "Example".to_string(),
            media: vec![
                MediaAsset {
                    media_type: MediaType::Stylesheet,
                    path: "media/style.css".to_string(),
                    name: "style.css".to_string(),
                },
                MediaAsset {
                    media_type: MediaType::Script,
                    path: "media/app.js".to_string(),
                    name: "app.js".to_string(),
                },
                MediaAsset {
                    media_type: MediaType::Image,
                    path: "media/images/logo.png".to_string(),
                    name: "logo.png".to_string(),
                },
            ],
            pages: vec![
                SitePage {
                    path: "site/index.md".to_string(),
                    id: "home".to_string(),
                    title: "Home".to_string(),
                    link_title: "Start".to_string(),
                    ..Default::default()
                },
                SitePage {
                    path: "site/about/team.md".to_string(),
                    id: "about/team".to_string(),
                    title: "Team".to_string(),
                    link_title: "Our team".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        manifest.categories.insert(
            "nav".to_string(),
            vec!["home".to_string(), "gone".to_string(), "about/team".to_string()],
        );
        manifest
    }

    fn bound(templates: &[(&str, &str)]) -> SiteTemplates {
        let mut registry = TemplateRegistry::new();
        for (name, source) in templates {
            registry.add_template(name, source).unwrap();
        }
        registry.bind(Arc::new(manifest()))
    }

    #[test]
    fn loads_template_files_by_header_name() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("templates/main.html");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "name: Main\n====\n\n<main>{{ content }}</main>\n").unwrap();

        let registry = TemplateRegistry::load(
            temp.path(),
            &[TemplateDescriptor {
                path: "templates/main.html".to_string(),
            }],
        )
        .unwrap();
        let templates = registry.bind(Arc::new(SiteManifest::default()));

        assert!(templates.contains("Main"));
        assert!(!templates.contains("templates/main.html"));
    }

    #[test]
    fn template_without_separator_reports_its_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.html");
        fs::write(&path, "name: Broken\n<main></main>").unwrap();

        let err = TemplateRegistry::new().load_file(&path).unwrap_err();

        assert!(matches!(
            err,
            TemplateError::HeaderError {
                source: HeaderError::Missing,
                ..
            }
        ));
        let message = err.to_string();
        assert!(message.contains("header missing"));
        assert!(message.contains("broken.html"));
    }

    #[test]
    fn template_without_name_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("anon.html");
        fs::write(&path, "====\n<main></main>").unwrap();

        let err = TemplateRegistry::new().load_file(&path).unwrap_err();

        assert!(matches!(err, TemplateError::Unnamed { .. }));
    }

    #[test]
    fn media_emits_tags_per_kind() {
        let templates = bound(&[]);

        let css = templates
            .render_fragment("t", "{{ media('stylesheet') }}")
            .unwrap();
        let js = templates.render_fragment("t", "{{ media('script') }}").unwrap();
        let images = templates.render_fragment("t", "{{ media('image') }}").unwrap();
        let unknown = templates.render_fragment("t", "{{ media('font') }}").unwrap();

        assert_eq!(css, r#"<link rel="stylesheet" href="/media/style.css" />"#);
        assert_eq!(js, r#"<script src="/media/app.js"></script>"#);
        assert_eq!(images, "");
        assert_eq!(unknown, "");
    }

    #[test]
    fn tmpl_binds_positional_params() {
        let templates = bound(&[("Card", "<b>{{ Param1 }}</b><i>{{ Param2 }}</i>")]);

        let out = templates
            .render_fragment("t", "{{ tmpl('Card', 'one', 'two') }}")
            .unwrap();

        assert_eq!(out, "<b>one</b><i>two</i>");
    }

    #[test]
    fn tmpl_resolves_forward_references() {
        // Outer is compiled before Inner exists.
        let templates = bound(&[
            ("Outer", "[{{ tmpl('Inner', Param1) }}]"),
            ("Inner", "{{ Param1 }}!"),
        ]);

        let out = templates
            .render_fragment("t", "{{ tmpl('Outer', 'hi') }}")
            .unwrap();

        assert_eq!(out, "[hi!]");
    }

    #[test]
    fn tmpl_escapes_params() {
        let templates = bound(&[("Card", "<b>{{ Param1 }}</b>")]);

        let out = templates
            .render_fragment("t", "{{ tmpl('Card', '<i>&') }}")
            .unwrap();

        assert_eq!(out, "<b>&lt;i&gt;&amp;</b>");
    }

    #[test]
    fn tmpl_self_reference_stops_at_depth_limit() {
        let templates = bound(&[("Loop", "x{{ tmpl('Loop') }}")]);

        let out = templates.render_fragment("t", "{{ tmpl('Loop') }}").unwrap();

        assert_eq!(out, "x".repeat(MAX_TMPL_DEPTH));
    }

    #[test]
    fn tmpl_unknown_name_yields_comment() {
        let templates = bound(&[]);

        let out = templates.render_fragment("t", "{{ tmpl('Nope') }}").unwrap();

        assert_eq!(out, "<!-- could not find template Nope -->");
    }

    #[test]
    fn tmpl_execution_failure_yields_nothing() {
        let templates = bound(&[("Bad", "{{ Param1.missing.deeper }}")]);

        let out = templates
            .render_fragment("t", "a{{ tmpl('Bad') }}b")
            .unwrap();

        assert_eq!(out, "ab");
    }

    #[test]
    fn page_functions_resolve_ids() {
        let templates = bound(&[]);

        let link = templates
            .render_fragment("t", "{{ pageLink('about/team') }}|{{ pageLink('nowhere') }}")
            .unwrap();
        let page = templates
            .render_fragment("t", "{{ page('home').link }}={{ page('home').title }}")
            .unwrap();
        let missing = templates
            .render_fragment("t", "[{{ page('nowhere').link }}]")
            .unwrap();

        assert_eq!(link, "/about/team.html|nowhere");
        assert_eq!(page, "/index.html=Start");
        assert_eq!(missing, "[]");
    }

    #[test]
    fn pages_lists_resolvable_category_entries() {
        let templates = bound(&[(
            "Nav",
            r#"{% for p in pages('nav') %}<a href="{{ p.link }}">{{ p.title }}</a>{% endfor %}"#,
        )]);

        let nav = templates.render_shell("Nav", "", "").unwrap();
        let none = templates
            .render_fragment("t", "{{ pages('footer') | length }}")
            .unwrap();

        assert_eq!(
            nav,
            r#"<a href="/index.html">Start</a><a href="/about/team.html">Our team</a>"#
        );
        assert_eq!(none, "0");
    }

    #[test]
    fn fragment_leaves_block_and_comment_markers_alone() {
        let templates = bound(&[]);

        let out = templates
            .render_fragment(
                "t",
                "<p>Use <code>{#anchor}</code> or {% raw %} near {{ pageLink('home') }}</p>",
            )
            .unwrap();

        assert_eq!(
            out,
            "<p>Use <code>{#anchor}</code> or {% raw %} near /index.html</p>"
        );
    }

    #[test]
    fn image_link_builds_media_path() {
        let templates = bound(&[]);

        let out = templates
            .render_fragment("t", "{{ imageLink('logo.png') }}")
            .unwrap();

        assert_eq!(out, "/media/images/logo.png");
    }

    #[test]
    fn shell_receives_trusted_content_and_titles() {
        let templates = bound(&[(
            "Main",
            "<title>{{ title }} - {{ site_title }}</title><main>{{ content }}</main>",
        )]);

        let html = templates
            .render_shell("Main", "<p>Hi & bye</p>", "Tom & Jerry")
            .unwrap();

        assert_eq!(
            html,
            "<title>Tom &amp; Jerry - Example</title><main><p>Hi & bye</p></main>"
        );
    }

    #[test]
    fn shell_escapes_page_and_site_titles() {
        let mut registry = TemplateRegistry::new();
        registry
            .add_template("Main", "<title>{{ title }} | {{ site_title }}</title>")
            .unwrap();
        let templates = registry.bind(Arc::new(SiteManifest {
            title: "A <b>&</b> B".to_string(),
            ..Default::default()
        }));

        let html = templates
            .render_shell("Main", "", "Fish & <Chips>")
            .unwrap();

        assert_eq!(
            html,
            "<title>Fish &amp; &lt;Chips&gt; | A &lt;b&gt;&amp;&lt;/b&gt; B</title>"
        );
    }

    #[test]
    fn shell_render_fails_for_unknown_template() {
        let templates = bound(&[]);

        let err = templates.render_shell("Missing", "", "").unwrap_err();

        assert!(matches!(err, TemplateError::RenderError { .. }));
        assert!(!templates.contains("Missing"));
    }
}
