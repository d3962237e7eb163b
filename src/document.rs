use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Zero-based line and column (column counted in chars), plus the byte offset
/// the pair was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column, offset: 0 }
    }
}

/// Where a lookup landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: PathBuf,
    pub position: Position,
}

impl std::fmt::Display for Location {
    /// `path:line:column`, one-based like compiler diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.path.display(),
            self.position.line + 1,
            self.position.column + 1
        )
    }
}

/// An open document: its identity plus the text the user is looking at, which
/// may differ from what is on disk.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn open(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(path, text))
    }

    pub fn location_at(&self, offset: usize) -> Location {
        Location {
            path: self.path.clone(),
            position: position_at(&self.text, offset),
        }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Byte offset of a (line, column) pair. Columns past the end of the line clamp
/// to the line end; lines past the end of the text yield `None`.
pub fn offset_at(text: &str, pos: Position) -> Option<usize> {
    let mut line_start = 0usize;
    for _ in 0..pos.line {
        let nl = text[line_start..].find('\n')?;
        line_start += nl + 1;
    }
    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |n| line_start + n);
    let line = &text[line_start..line_end];
    let col_bytes = line
        .char_indices()
        .nth(pos.column)
        .map_or(line.len(), |(i, _)| i);
    Some(line_start + col_bytes)
}

/// Translate a byte offset into a position. Offsets past the end clamp to the end.
pub fn position_at(text: &str, offset: usize) -> Position {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = text[line_start..offset].chars().count();
    Position { line, column, offset }
}

/// The identifier under (or immediately left of) `pos`, with its byte range.
pub fn word_at(text: &str, pos: Position) -> Option<(String, Range<usize>)> {
    let offset = offset_at(text, pos)?;
    let bytes = text.as_bytes();

    let touches_word = (offset < bytes.len() && is_word_byte(bytes[offset]))
        || (offset > 0 && is_word_byte(bytes[offset - 1]));
    if !touches_word {
        return None;
    }

    let mut start = offset;
    while start > 0 && is_word_byte(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }

    Some((text[start..end].to_string(), start..end))
}
