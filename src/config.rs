//! Nested configuration parser.
//!
//! Configuration text is a brace-delimited mini-language:
//!
//! ```text
//! common settings {imu: rate: 100} {gnss: mask: 10 {gps: ...} {glo: ...}}
//! ```
//!
//! Every scan here tracks brace depth, so a label or a closing brace only counts
//! when it sits at depth 0 relative to the text being scanned. Results are views
//! into the original buffer; nothing is copied.

use core::fmt;
use core::ops::Range;
use serde::{Serialize, Serializer};

pub const BLOCK_OPEN: u8 = b'{';
pub const BLOCK_CLOSE: u8 = b'}';
pub const LABEL_DELIMITER: char = ':';

/// A read-only view into the root configuration buffer.
///
/// `start` is an absolute offset into the root buffer, so spans sliced out of
/// other spans remain comparable with each other.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConfigSpan<'a> {
    root: &'a str,
    start: usize,
    len: usize,
}

impl<'a> ConfigSpan<'a> {
    /// Span covering the whole buffer.
    pub fn new(root: &'a str) -> Self {
        Self {
            root,
            start: 0,
            len: root.len(),
        }
    }

    pub fn as_str(&self) -> &'a str {
        &self.root[self.start..self.start + self.len]
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The buffer this span points into.
    pub fn root(&self) -> &'a str {
        self.root
    }

    fn narrow(&self, range: Range<usize>) -> Self {
        debug_assert!(
            range.end <= self.len,
            "Sub-span end {} exceeds span length {}",
            range.end,
            self.len
        );
        Self {
            root: self.root,
            start: self.start + range.start,
            len: range.end - range.start,
        }
    }
}

impl fmt::Debug for ConfigSpan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSpan")
            .field("start", &self.start)
            .field("len", &self.len)
            .field("text", &self.as_str())
            .finish()
    }
}

impl fmt::Display for ConfigSpan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConfigSpan<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn depth_step(depth: &mut i32, byte: u8) {
    match byte {
        BLOCK_OPEN => *depth += 1,
        BLOCK_CLOSE => *depth -= 1,
        _ => {}
    }
}

/// Every position where `label` starts at nesting depth 0, in order.
///
/// The match test happens before the byte under the cursor updates the depth,
/// so a label beginning with `{` still matches at the top level.
fn top_level_matches<'h>(haystack: &'h str, label: &'h str) -> impl Iterator<Item = usize> + 'h {
    let bytes = haystack.as_bytes();
    let pattern = label.as_bytes();
    let mut depth = 0i32;
    bytes.iter().enumerate().filter_map(move |(pos, &byte)| {
        let hit = depth == 0 && bytes[pos..].starts_with(pattern);
        depth_step(&mut depth, byte);
        hit.then_some(pos)
    })
}

/// Position of the first occurrence of `label` outside any nested block.
pub fn find_label(haystack: &str, label: &str) -> Option<usize> {
    if label.is_empty() {
        return Some(0);
    }
    top_level_matches(haystack, label).next()
}

/// Position immediately after the first top-level occurrence of `label`.
pub fn find_label_end(haystack: &str, label: &str) -> Option<usize> {
    find_label(haystack, label).map(|pos| pos + label.len())
}

/// Length of a block body that starts right after its label.
///
/// Scanning stops at the first `}` met at depth 0, so nested blocks inside the
/// body are skipped whole. An unterminated body runs to the end of the text.
pub fn block_length(after_label: &str) -> usize {
    find_label(after_label, "}").unwrap_or(after_label.len())
}

/// Trims leading whitespace and leading blocks, then trailing whitespace and
/// trailing blocks. Returns `None` when nothing is left, a trim runs off the
/// buffer with an open block, or the remaining text is itself unbalanced.
fn common_range(bytes: &[u8]) -> Option<Range<usize>> {
    let mut depth = 0i32;
    let mut start = 0;
    loop {
        let &byte = bytes.get(start)?;
        if depth == 0 && byte != BLOCK_OPEN && !byte.is_ascii_whitespace() {
            break;
        }
        depth_step(&mut depth, byte);
        start += 1;
    }

    depth = 0;
    let mut end = bytes.len();
    loop {
        if end <= start {
            return None;
        }
        let byte = bytes[end - 1];
        if depth == 0 && byte != BLOCK_CLOSE && !byte.is_ascii_whitespace() {
            break;
        }
        // Scanning backwards, so a closing brace opens a block.
        match byte {
            BLOCK_CLOSE => depth += 1,
            BLOCK_OPEN => depth -= 1,
            _ => {}
        }
        end -= 1;
    }

    let mut depth = 0i32;
    for &byte in &bytes[start..end] {
        depth_step(&mut depth, byte);
        if depth < 0 {
            return None;
        }
    }
    (depth == 0).then_some(start..end)
}

fn extract_range(filter: &str, buffer: &str) -> Option<Range<usize>> {
    if filter.is_empty() {
        return common_range(buffer.as_bytes());
    }
    let body = find_label_end(buffer, filter)?;
    Some(body..body + block_length(&buffer[body..]))
}

/// Extracts a block body or the common part of `buffer`.
///
/// With an empty `filter` the whole buffer is treated as one block and the
/// text outside leading/trailing sub-blocks is returned. Otherwise `filter` is
/// located at depth 0 and the text between it and its matching `}` is
/// returned. Spans on malformed input are best-effort.
pub fn extract<'a>(filter: &str, buffer: &'a str) -> Option<&'a str> {
    extract_range(filter, buffer).map(|range| &buffer[range])
}

/// [`extract`] over a span, yielding a span into the same root buffer.
pub fn extract_span<'a>(filter: &str, span: ConfigSpan<'a>) -> Option<ConfigSpan<'a>> {
    extract_range(filter, span.as_str()).map(|range| span.narrow(range))
}

/// Finds `token` at depth 0, optionally followed (after whitespace) by `delim`,
/// and returns the text right after it.
pub fn locate_token<'a>(token: &str, haystack: &'a str, delim: Option<char>) -> Option<&'a str> {
    if token.is_empty() {
        return None;
    }
    top_level_matches(haystack, token).find_map(move |pos| {
        let rest = &haystack[pos + token.len()..];
        match delim {
            None => Some(rest),
            Some(delim) => rest.trim_start().strip_prefix(delim),
        }
    })
}

/// The first word after `token:`, ending at whitespace or a brace.
pub fn token_value<'a>(token: &str, haystack: &'a str) -> Option<&'a str> {
    let rest = locate_token(token, haystack, Some(LABEL_DELIMITER))?.trim_start();
    let end = rest
        .find(|c: char| c.is_ascii_whitespace() || c == '{' || c == '}')
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}
