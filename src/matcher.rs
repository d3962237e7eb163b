//! Textual endpoint-declaration matching.
//!
//! A declaration is `name: builder.query(...)` or `name: builder.mutation(...)`
//! (also with `build.` as the builder name) in one of three surface forms, tried
//! in a fixed order. The first pattern with a hit wins; within a pattern the
//! earliest hit wins.

use regex::Regex;
use std::ops::Range;

use crate::block::locate_endpoints_block;
use crate::document::{position_at, Position};

const BUILDER_CALL: &str = r"(?:builder|build)\.(?:query|mutation)\b";
const BUILDER_CALL_SPACED: &str = r"(?:builder|build)\s*\.\s*(?:query|mutation)\b";

/// The surface forms a declaration can take, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationForm {
    /// `getUser: builder.query`
    Unquoted,
    /// `"getUser": build.mutation` or `'getUser': ...`
    Quoted,
    /// `getUser :\n builder\n .query`, whitespace around the colon and the dot
    Spaced,
}

impl DeclarationForm {
    pub const ALL: [DeclarationForm; 3] = [Self::Unquoted, Self::Quoted, Self::Spaced];

    fn pattern(self, escaped: &str) -> String {
        match self {
            Self::Unquoted => format!(r"{escaped}\s*:\s*{BUILDER_CALL}"),
            Self::Quoted => format!(r#"["']{escaped}["']\s*:\s*{BUILDER_CALL}"#),
            Self::Spaced => format!(r"({escaped})\s*:\s*{BUILDER_CALL_SPACED}"),
        }
    }

    /// Every form requires `\s*:` right after the name, so only the left edge
    /// needs checking. `regex` has no look-behind, hence the manual check. The
    /// quoted form is bounded by its quote.
    fn needs_left_boundary(self) -> bool {
        matches!(self, Self::Unquoted | Self::Spaced)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// A matched declaration inside some text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionMatch {
    /// Byte offset of the start of the match in the full text.
    pub offset: usize,
    pub form: DeclarationForm,
}

/// Compiled patterns for one endpoint name. Build once per lookup and reuse
/// across every file of the workspace phase.
#[derive(Debug, Clone)]
pub struct DefinitionMatcher {
    endpoint: String,
    patterns: Vec<(DeclarationForm, Regex)>,
}

impl DefinitionMatcher {
    pub fn new(endpoint: &str) -> anyhow::Result<Self> {
        let escaped = regex::escape(endpoint);
        let patterns = DeclarationForm::ALL
            .into_iter()
            .map(|form| -> anyhow::Result<(DeclarationForm, Regex)> {
                Ok((form, Regex::new(&form.pattern(&escaped))?))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            patterns,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// First declaration inside `region` of `text`. The returned offset is
    /// relative to the whole of `text`.
    pub fn find_in(&self, text: &str, region: Range<usize>) -> Option<DefinitionMatch> {
        let slice = text.get(region.clone())?;
        let base = region.start;

        for (form, re) in &self.patterns {
            let hit = re.captures_iter(slice).find_map(|caps| {
                let m = caps.get(0)?;
                // Group 1, when present, is the name itself.
                let start = caps.get(1).map_or(m.start(), |g| g.start());
                let abs = base + start;
                if form.needs_left_boundary() && abs > 0 && is_ident_byte(text.as_bytes()[abs - 1]) {
                    return None;
                }
                Some(abs)
            });

            if let Some(offset) = hit {
                return Some(DefinitionMatch { offset, form: *form });
            }
        }

        None
    }

    /// Search the endpoints block first, then the whole document.
    pub fn find(&self, text: &str) -> Option<DefinitionMatch> {
        if let Some(block) = locate_endpoints_block(text) {
            if let Some(hit) = self.find_in(text, block) {
                return Some(hit);
            }
        }
        self.find_in(text, 0..text.len())
    }
}

/// Byte offset of the first declaration of `endpoint` in `text`.
pub fn find_definition_offset(text: &str, endpoint: &str) -> Option<usize> {
    DefinitionMatcher::new(endpoint).ok()?.find(text).map(|m| m.offset)
}

/// Position of the first declaration of `endpoint` in `text`.
pub fn find_definition(text: &str, endpoint: &str) -> Option<Position> {
    find_definition_offset(text, endpoint).map(|off| position_at(text, off))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoted_key_is_found_not_longer_identifier() {
        let text = "const myGetAlertActivityTrend: builder.query = 1;\n\
                    endpoints: (builder) => ({\n  getAlertActivityTrend: builder.query<X, void>({\n  }),\n})";
        let off = find_definition_offset(text, "getAlertActivityTrend").unwrap();
        assert!(text[off..].starts_with("getAlertActivityTrend: builder.query<X, void>"));
    }

    #[test]
    fn longer_identifier_alone_is_not_a_match() {
        let text = "my_getAlertActivityTrend: builder.query(),\n$getAlertActivityTrend: builder.query(),\ngetAlertActivityTrendV2: builder.query()";
        assert_eq!(find_definition_offset(text, "getAlertActivityTrend"), None);
    }

    #[test]
    fn quoted_key_matches_when_unquoted_does_not() {
        let text = r#"endpoints: (build) => ({ "getAlertActivityTrend": build.mutation({}) })"#;
        let m = DefinitionMatcher::new("getAlertActivityTrend").unwrap().find(text).unwrap();
        assert_eq!(m.form, DeclarationForm::Quoted);
        assert!(text[m.offset..].starts_with("\"getAlertActivityTrend\""));

        let single = "'getUser': builder.query()";
        assert_eq!(find_definition_offset(single, "getUser"), Some(0));
    }

    #[test]
    fn whitespace_tolerant_form() {
        let text = "endpoints: (builder) => ({\n    getUser :\n      builder\n        .query({})\n})";
        let m = DefinitionMatcher::new("getUser").unwrap().find(text).unwrap();
        assert_eq!(m.form, DeclarationForm::Spaced);
        assert!(text[m.offset..].starts_with("getUser :"));
    }

    #[test]
    fn whitespace_tolerant_form_mid_line() {
        let text = "endpoints: (builder) => ({ getUser: builder\n  .query({}),\n})";
        let m = DefinitionMatcher::new("getUser").unwrap().find(text).unwrap();
        assert_eq!(m.form, DeclarationForm::Spaced);
        assert_eq!(m.offset, text.find("getUser").unwrap());

        let text = "x = { getUser :\n builder\n .query() }";
        assert_eq!(find_definition_offset(text, "getUser"), text.find("getUser"));
    }

    #[test]
    fn whitespace_tolerant_form_respects_word_boundary() {
        let text = "x = { my_getUser :\n builder\n .query(), $getUser: build .mutation() }";
        assert_eq!(find_definition_offset(text, "getUser"), None);
    }

    #[test]
    fn earliest_hit_of_first_pattern_wins() {
        let text = "a: 1,\ngetUser: build.query(),\n\"getUser\": build.query(),\ngetUser: builder.mutation()";
        let m = DefinitionMatcher::new("getUser").unwrap().find(text).unwrap();
        assert_eq!(m.form, DeclarationForm::Unquoted);
        assert_eq!(m.offset, text.find("getUser").unwrap());
    }

    #[test]
    fn other_builder_calls_are_ignored() {
        let text = "getUser: builder.queryFn(), getUser: builder.infiniteQuery()";
        assert_eq!(find_definition_offset(text, "getUser"), None);
    }

    #[test]
    fn falls_back_to_whole_document_outside_block() {
        let text = "endpoints: (builder) => ({ other: builder.query() }),\nconst extra = { getUser: builder.query() };";
        let pos = find_definition(text, "getUser").unwrap();
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, "const extra = { ".len());
    }

    #[test]
    fn regex_metacharacters_in_name_are_literal() {
        assert_eq!(find_definition_offset("a.b: builder.query()", "a.b"), Some(0));
        assert_eq!(find_definition_offset("axb: builder.query()", "a.b"), None);
    }
}
