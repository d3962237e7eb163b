//! Locate the `endpoints: (builder) => ({ ... })` region of an API slice. The
//! arrow parameter may also be bare (`endpoints: builder => ({ ... })`).
//!
//! This is a best-effort scan, not a parser: one depth counter shared by braces
//! and parens, with naive string skipping. Braces inside template-literal
//! interpolations (`${...}`) are counted like code, so a region can come out
//! too short or too long. Callers always fall back to the whole document when
//! the narrowed region has no match.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"endpoints\s*:\s*(?:\([^()]*\)|[A-Za-z_$][\w$]*)\s*=>\s*\(").unwrap())
}

/// Byte range of the endpoints block, starting right after the marker's
/// opening paren. `None` when the document has no marker.
///
/// If the block never closes, the range runs to the end of the text.
pub fn locate_endpoints_block(text: &str) -> Option<Range<usize>> {
    let marker = marker_regex().find(text)?;
    let start = marker.end();
    let end = scan_block_end(text.as_bytes(), start).unwrap_or(text.len());
    Some(start..end)
}

/// Offset of the first byte where depth drops below zero.
///
/// Only ASCII bytes are inspected, so multi-byte UTF-8 sequences pass through.
fn scan_block_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut quote: Option<u8> = None;
    let mut prev: u8 = 0;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if matches!(b, b'"' | b'\'' | b'`') && prev != b'\\' {
            match quote {
                None => quote = Some(b),
                Some(q) if q == b => quote = None,
                Some(_) => {}
            }
        }

        if quote.is_none() {
            match b {
                b'{' | b'(' => depth += 1,
                b'}' | b')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }

        prev = b;
    }

    None
}
