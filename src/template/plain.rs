//! HTML to plain text for the text/plain alternative part.

use scraper::{ElementRef, Html, Node};

/// Conversion options
#[derive(Debug, Clone)]
pub struct PlainTextOptions {
    /// Omit `[alt]` placeholders for images
    pub ignore_images: bool,
    /// Append ` [href]` after link text when the target differs from it
    pub show_links: bool,
}

impl Default for PlainTextOptions {
    fn default() -> Self {
        Self {
            ignore_images: true,
            show_links: true,
        }
    }
}

/// Elements whose text never reaches the reader
const SKIPPED: &[&str] = &["head", "style", "script", "title", "template", "noscript"];

/// Elements that start and end on their own line
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "dt", "dd", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "thead",
    "tfoot", "tr", "ul",
];

/// Elements followed by a blank line
const PARAGRAPHS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "table", "ul", "ol"];

/// Convert rendered HTML into readable plain text.
///
/// Best effort: malformed markup is tolerated and the function never fails.
pub fn compile_plain_body(html: &str) -> String {
    compile_plain_body_with(html, &PlainTextOptions::default())
}

pub fn compile_plain_body_with(html: &str, options: &PlainTextOptions) -> String {
    let document = Html::parse_document(html);
    let mut writer = TextWriter::default();
    walk(document.root_element(), options, &mut writer);
    writer.finish()
}

fn walk(element: ElementRef<'_>, options: &PlainTextOptions, out: &mut TextWriter) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_text(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    visit_element(child, options, out);
                }
            }
            _ => {}
        }
    }
}

fn visit_element(element: ElementRef<'_>, options: &PlainTextOptions, out: &mut TextWriter) {
    let name = element.value().name();

    if SKIPPED.contains(&name) {
        return;
    }

    match name {
        "br" => {
            out.line_break();
            return;
        }
        "img" => {
            if !options.ignore_images {
                if let Some(alt) = element.value().attr("alt").filter(|a| !a.trim().is_empty()) {
                    out.push_text(&format!("[{}]", alt.trim()));
                }
            }
            return;
        }
        "td" | "th" => {
            out.push_text(" ");
            walk(element, options, out);
            out.push_text(" ");
            return;
        }
        "a" => {
            let start = out.text_len();
            walk(element, options, out);
            if options.show_links {
                if let Some(href) = element.value().attr("href") {
                    let label = out.text_since(start);
                    let href = href.trim();
                    let shown = href.strip_prefix("mailto:").unwrap_or(href);
                    if !href.is_empty() && !href.starts_with('#') && label.trim() != shown {
                        out.push_text(&format!(" [{}]", shown));
                    }
                }
            }
            return;
        }
        _ => {}
    }

    let block = BLOCKS.contains(&name);
    if block {
        out.line_break();
    }
    walk(element, options, out);
    if block {
        out.line_break();
        if PARAGRAPHS.contains(&name) {
            out.blank_line();
        }
    }
}

/// Accumulates text, collapsing whitespace inside lines and limiting blank
/// lines to one in a row.
#[derive(Default)]
struct TextWriter {
    out: String,
    pending_space: bool,
}

impl TextWriter {
    fn push_text(&mut self, text: &str) {
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        for (i, word) in text.split_whitespace().enumerate() {
            if (i > 0 || self.pending_space) && !self.at_line_start() {
                self.out.push(' ');
            }
            self.out.push_str(word);
            self.pending_space = false;
        }
        if text.ends_with(char::is_whitespace) {
            self.pending_space = true;
        }
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn line_break(&mut self) {
        self.pending_space = false;
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn blank_line(&mut self) {
        self.line_break();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn text_len(&self) -> usize {
        self.out.len()
    }

    fn text_since(&self, start: usize) -> &str {
        self.out.get(start..).unwrap_or_default()
    }

    fn finish(self) -> String {
        let lines: Vec<&str> = self.out.lines().map(str::trim_end).collect();
        let mut text = String::with_capacity(self.out.len());
        let mut blank_run = 0;
        for line in lines {
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            text.push_str(line);
            text.push('\n');
        }
        text.trim().to_string()
    }
}
