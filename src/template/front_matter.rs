//! Metadata block parsing.
//!
//! A template may open with a comment-delimited block:
//!
//! ```text
//! <!-- @meta
//! layout: base.mjml
//! subject: 'Hello {{name}}'
//! -->
//! ```
//!
//! Every line of the block is classified as a [`MetaLine`] and folded into a
//! [`FrontMatter`]. Lines that fit no rule are dropped; parsing never fails.

use std::collections::BTreeMap;

use serde::Serialize;

/// Opening delimiter of the metadata block
pub const META_OPEN: &str = "<!-- @meta";
/// Closing delimiter of the metadata block
pub const META_CLOSE: &str = "-->";

const LAYOUT_KEY: &str = "layout";

/// Key/value pairs from a template's metadata block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrontMatter {
    entries: BTreeMap<String, String>,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The referenced layout, if any
    pub fn layout(&self) -> Option<&str> {
        self.get(LAYOUT_KEY).filter(|l| !l.is_empty())
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("subject")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All entries except `layout`, for merging into a render context
    pub fn variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != LAYOUT_KEY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

/// Classification of one metadata line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaLine<'a> {
    /// `layout: <reference>`; the reference may itself contain colons
    Layout(&'a str),
    /// `<word>: <value>`
    KeyValue(&'a str, &'a str),
    /// Anything else, including blank lines
    Unrecognized(&'a str),
}

impl<'a> MetaLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("layout:") {
            return MetaLine::Layout(rest.trim());
        }

        let Some((key, value)) = line.split_once(':') else {
            return MetaLine::Unrecognized(line);
        };

        let value = value.trim();
        if !is_word(key) || value.is_empty() {
            return MetaLine::Unrecognized(line);
        }

        MetaLine::KeyValue(key, value)
    }
}

/// `[A-Za-z0-9_]+`
fn is_word(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Strip one pair of matching surrounding quotes
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Fold the lines of a metadata block into a mapping
pub fn parse_block(block: &str) -> FrontMatter {
    let mut front_matter = FrontMatter::default();

    for line in block.trim().lines() {
        match MetaLine::classify(line) {
            MetaLine::Layout(reference) => front_matter.insert(LAYOUT_KEY, reference),
            MetaLine::KeyValue(key, value) => front_matter.insert(key, unquote(value)),
            MetaLine::Unrecognized(text) => {
                if !text.is_empty() {
                    tracing::trace!(line = text, "Skipping unrecognized metadata line");
                }
            }
        }
    }

    front_matter
}

/// A document split into its metadata and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument<'a> {
    pub front_matter: FrontMatter,
    pub body: &'a str,
    /// Whether a metadata block was present at all
    pub has_block: bool,
}

/// Split `raw` at the first metadata block.
///
/// Without an opening delimiter (or without a closing one after it) the whole
/// text is the body and the metadata is empty.
pub fn parse_document(raw: &str) -> ParsedDocument<'_> {
    let passthrough = ParsedDocument {
        front_matter: FrontMatter::default(),
        body: raw,
        has_block: false,
    };

    let Some(open) = raw.find(META_OPEN) else {
        return passthrough;
    };
    let block_start = open + META_OPEN.len();
    let Some(close) = raw[block_start..].find(META_CLOSE) else {
        return passthrough;
    };
    let block_end = block_start + close;
    let body = &raw[block_end + META_CLOSE.len()..];

    ParsedDocument {
        front_matter: parse_block(&raw[block_start..block_end]),
        body: body.trim_start_matches(['\r', '\n']),
        has_block: true,
    }
}
