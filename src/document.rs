use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").expect("decimal regex must compile"));

static TEAM_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:\bvs\.?\s)|\bv\s+\p{Lu}|\s-\s+\p{Lu}|(?i:\bprematch\b)")
        .expect("team separator regex must compile")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex must compile"));

/// A fetched page parsed once and rendered to line-oriented text.
///
/// Every offset handed around the extraction modules is a byte offset into
/// `text`. Each non-empty line of each visible text node becomes one line.
pub struct SlipDocument {
    html: Html,
    text: String,
}

impl SlipDocument {
    pub fn parse(raw: &str) -> Self {
        let html = Html::parse_document(raw);
        let text = render_text(html.root_element());
        Self { html, text }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Renders a subtree exactly as the whole document is rendered, so a region's
/// text is a contiguous slice of [`SlipDocument::text`].
pub fn render_text(root: ElementRef<'_>) -> String {
    let mut lines = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript" | "template"));
        if hidden {
            continue;
        }
        for line in text.lines() {
            let line = collapse_whitespace(line);
            if !line.is_empty() {
                lines.push(line);
            }
        }
    }
    lines.join("\n")
}

pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").to_string()
}

/// Element text with whitespace collapsed, text nodes joined by spaces.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn floor_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

pub fn ceil_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Slice `[center - before, center + after)` clamped to the text, with the
/// absolute start offset of the slice.
pub fn window(text: &str, center: usize, before: usize, after: usize) -> (usize, &str) {
    let start = floor_boundary(text, center.saturating_sub(before));
    let end = ceil_boundary(text, center.saturating_add(after));
    let start = start.min(end);
    (start, &text[start..end])
}

/// Standalone decimals in `text` as `(offset, value)`.
///
/// Digits glued to a preceding `,`/`.`, followed by `%`, or followed by
/// `.` and another digit belong to amounts, dates or percentages and are
/// skipped. A sentence-ending `.` keeps the decimal.
pub fn decimals(text: &str) -> Vec<(usize, f64)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    for m in DECIMAL.find_iter(text) {
        if m.start() > 0 && matches!(bytes[m.start() - 1], b',' | b'.') {
            continue;
        }
        match bytes.get(m.end()) {
            Some(b'%') => continue,
            Some(b'.') if bytes.get(m.end() + 1).is_some_and(u8::is_ascii_digit) => continue,
            _ => {}
        }
        if let Ok(value) = m.as_str().parse::<f64>() {
            out.push((m.start(), value));
        }
    }
    out
}

pub fn decimals_in_range(text: &str, min: f64, max: f64) -> Vec<(usize, f64)> {
    decimals(text)
        .into_iter()
        .filter(|(_, v)| *v >= min && *v <= max)
        .collect()
}

/// Whether `text` contains something shaped like a team pairing
/// (`vs`, `v Capital`, `- Capital`, `prematch`).
pub fn has_team_separator(text: &str) -> bool {
    TEAM_SEPARATOR.is_match(text)
}

/// Team separator anywhere within `radius` bytes around `[start, end)`.
pub fn near_team_separator(text: &str, start: usize, end: usize, radius: usize) -> bool {
    let from = floor_boundary(text, start.saturating_sub(radius));
    let to = ceil_boundary(text, end.saturating_add(radius));
    has_team_separator(&text[from..to])
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Regex fragment for a literal team name, tolerant of whitespace runs.
pub fn team_pattern(name: &str) -> String {
    name.split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").trim().parse::<f64>().ok()
}
