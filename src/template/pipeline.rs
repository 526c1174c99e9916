//! Two-stage render pipeline.
//!
//! 1. [`Substitution`]: Handlebars over the composed document.
//! 2. [`MarkupExpansion`]: MJML to email-safe HTML.
//!
//! Stages never interleave. Layout composition runs the substitution stage
//! alone, so the markup dialect is expanded exactly once at the top level.

use handlebars::Handlebars;
use mrml::prelude::render::RenderOptions;

use crate::error::{MailerError, Result};

use super::context::RenderContext;

/// A pure document transform
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, document: &str, context: &RenderContext) -> Result<String>;
}

/// Logic-enabled variable substitution (`{{var}}`, `{{{raw}}}`, `{{#if}}`,
/// `{{#unless}}`, ...)
pub struct Substitution {
    registry: Handlebars<'static>,
}

impl Default for Substitution {
    fn default() -> Self {
        Self::new()
    }
}

impl Substitution {
    /// HTML-escaping substitution for document bodies
    pub fn new() -> Self {
        Self {
            registry: Handlebars::new(),
        }
    }

    /// Substitution without HTML escaping, for header values like subjects
    pub fn plain() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    pub fn render(&self, document: &str, context: &RenderContext) -> Result<String> {
        Ok(self.registry.render_template(document, context)?)
    }
}

impl Stage for Substitution {
    fn name(&self) -> &'static str {
        "substitution"
    }

    fn apply(&self, document: &str, context: &RenderContext) -> Result<String> {
        self.render(document, context)
    }
}

/// MJML expansion into final HTML
#[derive(Debug, Clone, Default)]
pub struct MarkupExpansion {
    /// Drop HTML comments from the output
    pub disable_comments: bool,
}

impl MarkupExpansion {
    pub fn expand(&self, document: &str) -> Result<String> {
        let parsed = mrml::parse(document).map_err(|e| MailerError::Markup(e.to_string()))?;

        let options = RenderOptions {
            disable_comments: self.disable_comments,
            ..Default::default()
        };

        parsed
            .render(&options)
            .map_err(|e| MailerError::Markup(e.to_string()))
    }
}

impl Stage for MarkupExpansion {
    fn name(&self) -> &'static str {
        "markup_expansion"
    }

    fn apply(&self, document: &str, _context: &RenderContext) -> Result<String> {
        self.expand(document)
    }
}

/// Ordered list of stages applied to a composed document
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// Substitution followed by markup expansion
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(Substitution::new()),
                Box::new(MarkupExpansion::default()),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, document: &str, context: &RenderContext) -> Result<String> {
        let mut current = document.to_string();
        for stage in &self.stages {
            current = stage.apply(&current, context)?;
            tracing::trace!(stage = stage.name(), len = current.len(), "Stage applied");
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: serde_json::Value) -> RenderContext {
        RenderContext::from_data(&value).unwrap()
    }

    #[test]
    fn test_substitution_escapes_and_raw() {
        let sub = Substitution::new();
        let out = sub
            .render(
                "{{a}}|{{{a}}}",
                &ctx(json!({ "a": "<b>x</b>" })),
            )
            .unwrap();
        assert_eq!(out, "&lt;b&gt;x&lt;/b&gt;|<b>x</b>");
    }

    #[test]
    fn test_substitution_unless_block() {
        let sub = Substitution::new();
        let template = "A{{#unless hideFooter}}-footer{{/unless}}";

        assert_eq!(sub.render(template, &ctx(json!({}))).unwrap(), "A-footer");
        assert_eq!(
            sub.render(template, &ctx(json!({ "hideFooter": true }))).unwrap(),
            "A"
        );
    }

    #[test]
    fn test_plain_substitution_does_not_escape() {
        let sub = Substitution::plain();
        let out = sub
            .render("Tom & {{name}}", &ctx(json!({ "name": "Jerry & Co" })))
            .unwrap();
        assert_eq!(out, "Tom & Jerry & Co");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let sub = Substitution::new();
        assert_eq!(sub.render("[{{nope}}]", &ctx(json!({}))).unwrap(), "[]");
    }

    #[test]
    fn test_broken_substitution_syntax_is_error() {
        let sub = Substitution::new();
        let err = sub.render("{{#if a}}open", &ctx(json!({}))).unwrap_err();
        assert!(matches!(err, MailerError::Substitution(_)));
    }

    #[test]
    fn test_expand_mjml() {
        let html = MarkupExpansion::default()
            .expand("<mjml><mj-body><mj-section><mj-column><mj-text>Hi there</mj-text></mj-column></mj-section></mj-body></mjml>")
            .unwrap();
        assert!(html.contains("Hi there"));
        assert!(!html.contains("mj-text"));
    }

    #[test]
    fn test_expand_rejects_malformed_markup() {
        let err = MarkupExpansion::default()
            .expand("<mjml><mj-body><mj-section>")
            .unwrap_err();
        assert!(matches!(err, MailerError::Markup(_)));
    }

    #[test]
    fn test_pipeline_order() {
        let pipeline = Pipeline::standard();
        assert_eq!(pipeline.stage_names(), vec!["substitution", "markup_expansion"]);

        let html = pipeline
            .run(
                "<mjml><mj-body><mj-section><mj-column><mj-text>EN: {{foo}}</mj-text></mj-column></mj-section></mj-body></mjml>",
                &ctx(json!({ "foo": "bar" })),
            )
            .unwrap();
        assert!(html.contains("EN: bar"));
    }
}
