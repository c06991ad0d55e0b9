
use regex::Regex;
use std::sync::LazyLock;

// Compile regex once, reuse across calls. Lazy so the capture stops at the first "]]".
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[\[(.*?)\]\]").expect("reference pattern is valid")
});

/// Ordered reference texts found in a note's content, duplicates included.
///
/// Clone the iterator (or call [`extract_references`] again) to restart it.
#[derive(Clone, Debug)]
pub struct References<'a> {
    content: &'a str,
    pos: usize,
}

impl<'a> Iterator for References<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.pos > self.content.len() {
            return None;
        }
        let cap = REFERENCE_RE.captures_at(self.content, self.pos)?;
        // A match spans at least the four marker bytes, so this always advances
        self.pos = cap.get(0)?.end();
        Some(cap.get(1).map_or("", |m| m.as_str()))
    }
}

/// Extract reference texts from note content.
///
/// Every `[[...]]` substring is a reference; the text between the markers is
/// returned verbatim and unresolved. `[[]]` yields `""`, which no title matches.
pub fn extract_references(content: &str) -> References<'_> {
    References { content, pos: 0 }
}

/// A reference occurrence with the byte span of its text.
///
/// `start` is the byte offset right after `[[`; `len` is the byte length up to `]]`.
#[derive(Debug, PartialEq, Eq)]
pub struct ReferenceSpan<'a> {
    pub text: &'a str,
    pub start: usize,
    pub len: usize,
}

/// Like `extract_references()`, but keeps byte positions so callers can locate markers.
pub fn extract_reference_spans(content: &str) -> Vec<ReferenceSpan<'_>> {
    REFERENCE_RE
        .captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| ReferenceSpan {
            text: m.as_str(),
            start: m.start(),
            len: m.len(),
        })
        .collect()
}
