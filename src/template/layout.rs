//! Layout inheritance.
//!
//! A template naming `layout: <ref>` in its metadata is poured into that
//! layout: its `@styles` region becomes `customStyles`, its `@content` region
//! (or, lacking markers, its whole remaining body) becomes `content`, and the
//! layout is run through the substitution stage with both fragments plus the
//! template's metadata in scope.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;

use super::context::{RenderContext, CONTENT_KEY, STYLES_KEY};
use super::front_matter::FrontMatter;
use super::pipeline::Substitution;

/// Directory, next to the template, searched for bare layout names
pub const LAYOUTS_DIR: &str = "layouts";

static STYLES_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--\s*@styles\s*-->([\s\S]*?)<!--\s*@endstyles\s*-->")
        .expect("styles region pattern")
});

static CONTENT_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--\s*@content\s*-->([\s\S]*?)<!--\s*@endcontent\s*-->")
        .expect("content region pattern")
});

/// How a layout reference is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutRef {
    /// Contains a separator or starts with `.`; relative to the template dir
    Relative(String),
    /// Bare file name, looked up in `layouts/` next to the template
    Named(String),
}

impl LayoutRef {
    pub fn parse(reference: &str) -> Self {
        if reference.contains('/') || reference.contains('\\') || reference.starts_with('.') {
            LayoutRef::Relative(reference.to_string())
        } else {
            LayoutRef::Named(reference.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LayoutRef::Relative(r) | LayoutRef::Named(r) => r,
        }
    }

    /// Path the reference points at, given the template's directory
    pub fn resolve(&self, template_dir: &Path) -> PathBuf {
        match self {
            LayoutRef::Relative(r) => template_dir.join(r),
            LayoutRef::Named(name) => template_dir.join(LAYOUTS_DIR).join(name),
        }
    }

    /// Paths reported when the layout cannot be read
    pub fn search_paths(&self, template_dir: &Path) -> Vec<PathBuf> {
        let mut paths = vec![
            template_dir.join(self.name()),
            template_dir.join(LAYOUTS_DIR).join(self.name()),
        ];
        let resolved = self.resolve(template_dir);
        if !paths.contains(&resolved) {
            paths.push(resolved);
        }
        paths
    }
}

/// Outcome of reading a layout document
#[derive(Debug)]
pub enum LayoutLookup {
    Found { path: PathBuf, document: String },
    NotFound { searched: Vec<PathBuf>, error: io::Error },
}

impl LayoutLookup {
    pub fn load(reference: &LayoutRef, template_dir: &Path) -> Self {
        let path = reference.resolve(template_dir);
        match fs::read_to_string(&path) {
            Ok(document) => LayoutLookup::Found { path, document },
            Err(error) => LayoutLookup::NotFound {
                searched: reference.search_paths(template_dir),
                error,
            },
        }
    }
}

/// Fragments pulled out of a child template's body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragments {
    pub content: String,
    pub styles: String,
}

/// Extract the `@styles` region, then the `@content` region from what is
/// left. Without content markers the whole trimmed remainder is the content.
pub fn extract_fragments(body: &str) -> Fragments {
    let mut styles = String::new();
    let mut remaining = body.to_string();

    if let Some(caps) = STYLES_REGION.captures(body) {
        styles = caps[1].trim().to_string();
        if let Some(whole) = caps.get(0) {
            remaining.replace_range(whole.range(), "");
        }
    }

    let content = match CONTENT_REGION.captures(&remaining) {
        Some(caps) => caps[1].trim().to_string(),
        None => remaining.trim().to_string(),
    };

    Fragments { content, styles }
}

/// Minimal document used when a layout cannot be read
pub fn minimal_shell(content: &str) -> String {
    format!("<mjml><mj-body>{}</mj-body></mjml>", content)
}

/// Composes child templates into their layouts
pub struct LayoutComposer<'a> {
    substitution: &'a Substitution,
}

impl<'a> LayoutComposer<'a> {
    /// Only the substitution stage is accepted; markup expansion happens once,
    /// after composition.
    pub fn new(substitution: &'a Substitution) -> Self {
        Self { substitution }
    }

    /// Produce the document the top-level pipeline should render.
    ///
    /// * no `layout` key: `body` unchanged
    /// * layout unreadable: [`minimal_shell`] around the content, logged
    /// * otherwise: the layout after substitution with `base` ∪ front matter ∪
    ///   `{content, customStyles}`
    pub fn compose(
        &self,
        body: &str,
        front_matter: &FrontMatter,
        template_path: &Path,
        base: &RenderContext,
    ) -> Result<String> {
        let Some(reference) = front_matter.layout() else {
            return Ok(body.to_string());
        };

        let reference = LayoutRef::parse(reference);
        let template_dir = template_path.parent().unwrap_or_else(|| Path::new("."));
        let fragments = extract_fragments(body);

        let document = match LayoutLookup::load(&reference, template_dir) {
            LayoutLookup::Found { path, document } => {
                tracing::debug!(
                    layout = %path.display(),
                    template = %template_path.display(),
                    "Applying layout"
                );
                document
            }
            LayoutLookup::NotFound { searched, error } => {
                let searched: Vec<String> =
                    searched.iter().map(|p| p.display().to_string()).collect();
                tracing::warn!(
                    layout = reference.name(),
                    template = %template_path.display(),
                    searched = ?searched,
                    error = %error,
                    "Layout not found, using minimal document"
                );
                return Ok(minimal_shell(&fragments.content));
            }
        };

        let context = base
            .clone()
            .with_front_matter(front_matter)
            .with(CONTENT_KEY, fragments.content)
            .with(STYLES_KEY, fragments.styles);

        self.substitution.render(&document, &context)
    }
}
