//! Locale directory discovery and template path resolution

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Extension every template and layout file carries
pub const TEMPLATE_EXTENSION: &str = "mjml";

/// Locale directories discovered under a template root.
///
/// Computed once when the engine is built and never refreshed; a new engine
/// is needed to see directories added later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleSet {
    locales: BTreeSet<String>,
}

impl LocaleSet {
    pub fn contains(&self, locale: &str) -> bool {
        self.locales.contains(locale)
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for LocaleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            locales: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// List the immediate subdirectories of `root`.
///
/// Loose template files at the top level are not locales. A missing root
/// yields an empty set.
pub fn scan_locales(root: &Path) -> Result<LocaleSet> {
    if !root.exists() {
        tracing::warn!(root = %root.display(), "Template root does not exist");
        return Ok(LocaleSet::default());
    }

    let mut locales = BTreeSet::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            locales.insert(name.to_string());
        }
    }

    tracing::debug!(root = %root.display(), count = locales.len(), "Scanned locales");
    Ok(LocaleSet { locales })
}

/// Pick the locale directory for a request: the requested locale when it was
/// discovered, otherwise the default (possibly empty).
pub fn resolve_locale<'a>(requested: &'a str, locales: &LocaleSet, default: &'a str) -> &'a str {
    if !requested.is_empty() && locales.contains(requested) {
        requested
    } else {
        if !requested.is_empty() {
            tracing::debug!(requested, fallback = default, "Unknown locale, falling back");
        }
        default
    }
}

/// Whether `name` is a bare template basename that stays inside its locale
/// directory: no path separators and no `..`.
pub fn is_valid_template_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        && !name.contains("..")
}

/// `<root>/<locale>/<template>.mjml`, skipping the locale segment when empty.
pub fn template_path(root: &Path, locale_dir: &str, template: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    if !locale_dir.is_empty() {
        path.push(locale_dir);
    }
    path.push(format!("{}.{}", template, TEMPLATE_EXTENSION));
    path
}
