//! Small text helpers shared by the documentation-driven metrics.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+(.+?)[ \t]*#*[ \t]*$").unwrap();
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```[^\n]*\n(.*?)```").unwrap();
}

pub fn has_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

pub fn count_hits(text: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| text.contains(*n)).count()
}

/// Share of `needles` found in `text`.
pub fn coverage(text: &str, needles: &[&str]) -> f64 {
    if needles.is_empty() {
        return 0.0;
    }
    count_hits(text, needles) as f64 / needles.len() as f64
}

/// Body of the first markdown section whose heading mentions any of `titles`.
/// Expects lowercased input.
pub fn section<'a>(doc: &'a str, titles: &[&str]) -> Option<&'a str> {
    let headings: Vec<_> = HEADING.captures_iter(doc).collect();
    for (i, cap) in headings.iter().enumerate() {
        let (Some(whole), Some(title)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if !has_any(title.as_str(), titles) {
            continue;
        }
        let end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(doc.len());
        return Some(&doc[whole.end()..end]);
    }
    None
}

pub fn has_heading(doc: &str, titles: &[&str]) -> bool {
    HEADING
        .captures_iter(doc)
        .filter_map(|c| c.get(1))
        .any(|t| has_any(t.as_str(), titles))
}

/// Contents of fenced code blocks.
pub fn code_blocks(doc: &str) -> impl Iterator<Item = &str> {
    CODE_FENCE
        .captures_iter(doc)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

/// `n / (n + half)`: 0 at zero, 0.5 at `half`, approaching 1.
pub fn saturate(n: f64, half: f64) -> f64 {
    if n <= 0.0 || half <= 0.0 {
        return 0.0;
    }
    n / (n + half)
}
