//! Template engine: locale resolution, layout composition and rendering

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::MailerConfig;
use crate::error::{MailerError, Result};

use super::context::{RenderContext, ASSETS_URL_KEY};
use super::front_matter::{parse_document, FrontMatter};
use super::layout::LayoutComposer;
use super::locale::{is_valid_template_name, resolve_locale, scan_locales, template_path, LocaleSet};
use super::pipeline::{Pipeline, Substitution};
use super::plain::{compile_plain_body_with, PlainTextOptions};

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub template_root: PathBuf,
    /// Locale directory used when the requested one is unknown; may be empty
    pub default_locale: String,
    /// Exposed to templates as `postalAssetsUrl`
    pub assets_url: String,
    pub plain_text: PlainTextOptions,
}

impl From<&MailerConfig> for EngineConfig {
    fn from(config: &MailerConfig) -> Self {
        Self {
            template_root: config.templates.clone(),
            default_locale: config.default_locale.clone(),
            assets_url: config.assets_url.clone(),
            plain_text: PlainTextOptions::default(),
        }
    }
}

/// Rendered HTML together with the template's metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledEmail {
    pub html: String,
    pub meta: FrontMatter,
}

/// Renders `<root>/<locale>/<template>.mjml` documents to HTML.
///
/// The locale set is discovered once in [`TemplateEngine::new`]; documents
/// are read from disk on every call. The engine holds no mutable state and
/// can be shared across tasks.
pub struct TemplateEngine {
    config: EngineConfig,
    locales: LocaleSet,
    /// Runs the layout pass on its own
    substitution: Substitution,
    pipeline: Pipeline,
}

impl TemplateEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let locales = scan_locales(&config.template_root)?;
        Ok(Self::with_locales(config, locales))
    }

    /// Build an engine around an already discovered locale set
    pub fn with_locales(config: EngineConfig, locales: LocaleSet) -> Self {
        tracing::info!(
            root = %config.template_root.display(),
            locales = ?locales.iter().collect::<Vec<_>>(),
            default_locale = %config.default_locale,
            "Template engine ready"
        );
        Self {
            config,
            locales,
            substitution: Substitution::new(),
            pipeline: Pipeline::standard(),
        }
    }

    pub fn locales(&self) -> &LocaleSet {
        &self.locales
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stages applied to every composed document
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Path the template resolves to for `locale`, after fallback.
    pub fn resolve_template_path(&self, template: &str, locale: &str) -> PathBuf {
        let dir = resolve_locale(locale, &self.locales, &self.config.default_locale);
        template_path(&self.config.template_root, dir, template)
    }

    /// Read the template for `locale`.
    ///
    /// If the locale exists but lacks this template, the default locale's
    /// copy is used instead.
    fn read_template(&self, template: &str, locale: &str) -> Result<(PathBuf, String)> {
        if !is_valid_template_name(template) {
            return Err(MailerError::validation(format!(
                "invalid template name {:?}: expected a basename",
                template
            )));
        }

        let primary = self.resolve_template_path(template, locale);
        let mut searched = vec![primary.clone()];

        match fs::read_to_string(&primary) {
            Ok(raw) => return Ok((primary, raw)),
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            Err(_) => {}
        }

        let fallback = template_path(
            &self.config.template_root,
            &self.config.default_locale,
            template,
        );
        if fallback != primary {
            searched.push(fallback.clone());
            match fs::read_to_string(&fallback) {
                Ok(raw) => {
                    tracing::debug!(
                        template,
                        locale,
                        path = %fallback.display(),
                        "Template missing for locale, using default locale"
                    );
                    return Ok((fallback, raw));
                }
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                Err(_) => {}
            }
        }

        Err(MailerError::TemplateNotFound {
            template: template.to_string(),
            searched,
        })
    }

    /// Caller data plus configured values; never aliases `data`.
    fn base_context(&self, data: &serde_json::Value) -> Result<RenderContext> {
        Ok(RenderContext::from_data(data)?.with(ASSETS_URL_KEY, self.config.assets_url.clone()))
    }

    /// Render a template to HTML and return it with its metadata.
    #[tracing::instrument(name = "engine.compile", skip(self, data), fields(path))]
    pub fn compile(
        &self,
        template: &str,
        data: &serde_json::Value,
        locale: &str,
    ) -> Result<CompiledEmail> {
        let base = self.base_context(data)?;
        let (path, raw) = self.read_template(template, locale)?;
        tracing::Span::current().record("path", tracing::field::display(path.display()));

        let parsed = parse_document(&raw);
        let composed = LayoutComposer::new(&self.substitution).compose(
            parsed.body,
            &parsed.front_matter,
            &path,
            &base,
        )?;

        let context = base.with_front_matter_defaults(&parsed.front_matter);
        let html = self.pipeline.run(&composed, &context)?;

        Ok(CompiledEmail {
            html,
            meta: parsed.front_matter,
        })
    }

    /// Render a template to HTML.
    pub fn compile_html_body(
        &self,
        template: &str,
        data: &serde_json::Value,
        locale: &str,
    ) -> Result<String> {
        Ok(self.compile(template, data, locale)?.html)
    }

    /// Plain-text alternative of rendered HTML.
    pub fn compile_plain_body(&self, html: &str) -> String {
        compile_plain_body_with(html, &self.config.plain_text)
    }

    /// Substitute variables into a header value (no HTML escaping).
    pub fn render_header(&self, value: &str, data: &serde_json::Value) -> Result<String> {
        Substitution::plain().render(value, &self.base_context(data)?)
    }

    pub fn template_root(&self) -> &Path {
        &self.config.template_root
    }
}
