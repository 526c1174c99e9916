//! Render context construction

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{MailerError, Result};

use super::front_matter::FrontMatter;

/// Key under which the configured assets base URL is exposed to templates
pub const ASSETS_URL_KEY: &str = "postalAssetsUrl";
/// Key carrying the child template's content fragment into a layout
pub const CONTENT_KEY: &str = "content";
/// Key carrying the child template's extracted styles into a layout
pub const STYLES_KEY: &str = "customStyles";

/// Variables available to one substitution pass.
///
/// Always an owned copy: building or extending a context never touches the
/// caller's data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RenderContext {
    vars: Map<String, Value>,
}

impl RenderContext {
    /// Copy the caller's data, which must be a JSON object (or null).
    pub fn from_data(data: &Value) -> Result<Self> {
        match data {
            Value::Object(map) => Ok(Self { vars: map.clone() }),
            Value::Null => Ok(Self::default()),
            _ => Err(MailerError::validation("data should be an object")),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Overlay front-matter entries; `layout` is never exposed.
    pub fn with_front_matter(mut self, front_matter: &FrontMatter) -> Self {
        for (key, value) in front_matter.variables() {
            self.vars
                .insert(key.to_string(), Value::String(value.to_string()));
        }
        self
    }

    /// Like [`with_front_matter`](Self::with_front_matter) but existing keys win.
    pub fn with_front_matter_defaults(mut self, front_matter: &FrontMatter) -> Self {
        for (key, value) in front_matter.variables() {
            self.vars
                .entry(key.to_string())
                .or_insert_with(|| Value::String(value.to_string()));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::template::front_matter::parse_block;

    #[test]
    fn test_from_data_copies() {
        let data = json!({ "name": "John" });
        let ctx = RenderContext::from_data(&data)
            .unwrap()
            .with(ASSETS_URL_KEY, "https://cdn.example.com");

        assert_eq!(ctx.get("name"), Some(&json!("John")));
        assert_eq!(ctx.get(ASSETS_URL_KEY), Some(&json!("https://cdn.example.com")));
        // caller data untouched
        assert_eq!(data, json!({ "name": "John" }));
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(RenderContext::from_data(&json!([1, 2])).is_err());
        assert!(RenderContext::from_data(&json!("x")).is_err());
        assert!(RenderContext::from_data(&Value::Null).is_ok());
    }

    #[test]
    fn test_front_matter_overlay_skips_layout() {
        let fm = parse_block("layout: base.mjml\ntitle: From meta\nname: Meta");
        let ctx = RenderContext::from_data(&json!({ "name": "Data" }))
            .unwrap()
            .with_front_matter(&fm);

        assert!(!ctx.contains("layout"));
        assert_eq!(ctx.get("title"), Some(&json!("From meta")));
        assert_eq!(ctx.get("name"), Some(&json!("Meta")));
    }

    #[test]
    fn test_front_matter_defaults_keep_data() {
        let fm = parse_block("title: From meta\nname: Meta");
        let ctx = RenderContext::from_data(&json!({ "name": "Data" }))
            .unwrap()
            .with_front_matter_defaults(&fm);

        assert_eq!(ctx.get("title"), Some(&json!("From meta")));
        assert_eq!(ctx.get("name"), Some(&json!("Data")));
    }
}
