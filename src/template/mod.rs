//! Email template system.
//!
//! This module provides:
//! - Locale discovery and fallback over `<root>/<locale>/<template>.mjml`
//! - A `<!-- @meta ... -->` block parser for per-template metadata
//! - Layout inheritance with `@styles` / `@content` regions
//! - A substitution + MJML expansion pipeline
//! - HTML to plain text conversion
//!
//! # Example
//!
//! ```ignore
//! let engine = TemplateEngine::new(EngineConfig {
//!     template_root: "./templates".into(),
//!     default_locale: "en".into(),
//!     ..Default::default()
//! })?;
//!
//! let compiled = engine.compile("invite", &json!({ "name": "John" }), "de")?;
//! let text = engine.compile_plain_body(&compiled.html);
//! let subject = compiled.meta.subject();
//! ```

mod context;
mod engine;
mod front_matter;
mod layout;
mod locale;
mod pipeline;
mod plain;

pub use context::{RenderContext, ASSETS_URL_KEY, CONTENT_KEY, STYLES_KEY};
pub use engine::{CompiledEmail, EngineConfig, TemplateEngine};
pub use front_matter::{parse_block, parse_document, FrontMatter, MetaLine, ParsedDocument};
pub use layout::{extract_fragments, minimal_shell, Fragments, LayoutComposer, LayoutLookup, LayoutRef};
pub use locale::{
    is_valid_template_name, resolve_locale, scan_locales, template_path, LocaleSet,
    TEMPLATE_EXTENSION,
};
pub use pipeline::{MarkupExpansion, Pipeline, Stage, Substitution};
pub use plain::{compile_plain_body, compile_plain_body_with, PlainTextOptions};
