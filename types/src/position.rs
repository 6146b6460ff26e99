//! Line/column to byte-offset resolution.
//!
//! Analyzers report 1-based `row:col` pairs; the host wants byte offsets
//! into the exact text that was checked. [`LineIndex`] records where each
//! line starts (recognising `\n`, `\r\n` and lone `\r`) so that lookups are
//! a slice and a short character walk.

use std::ops::Range;

use serde::Deserialize;
use unicode_segmentation::UnicodeSegmentation;

/// Unit in which an analyzer counts columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnUnit {
    /// Unicode scalar values.
    #[default]
    Char,
    /// UTF-16 code units, as JavaScript string indices count.
    Utf16,
}

impl ColumnUnit {
    fn width(self, ch: char) -> usize {
        match self {
            Self::Char => 1,
            Self::Utf16 => ch.len_utf16(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::Utf16 => "utf16",
        }
    }
}

/// Byte offsets of line starts within a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => line_starts.push(i + 1),
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    line_starts.push(i + 1);
                }
                _ => {}
            }
            i += 1;
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Number of lines. A trailing terminator opens a final empty line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Length in bytes of the indexed text.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte range of a 0-based line's content, terminator excluded.
    ///
    /// `text` must be the text this index was built from.
    #[must_use]
    pub fn line_content(&self, text: &str, line: usize) -> Range<usize> {
        let line = line.min(self.line_count() - 1);
        let start = self.line_starts[line];
        let Some(&next) = self.line_starts.get(line + 1) else {
            return start..self.len;
        };
        let head = &text.as_bytes()[..next];
        let end = match head {
            [.., b'\r', b'\n'] => next - 2,
            [.., b'\n' | b'\r'] => next - 1,
            _ => next,
        };
        start..end.max(start)
    }

    /// Resolve a 1-based `row`/`col` to a byte offset.
    ///
    /// Rows are clamped into the document. A column past the end of its line
    /// lands at the end of that line's content; a column inside a multi-unit
    /// character lands on the character's first byte. Column 0 addresses the
    /// first non-blank character of the line.
    #[must_use]
    pub fn offset_at(&self, text: &str, row: usize, col: usize, unit: ColumnUnit) -> usize {
        let content = self.line_content(text, row.max(1) - 1);
        if col == 0 {
            return trimmed(text, content).start;
        }
        content.start + advance(&text[content.clone()], col - 1, unit)
    }

    /// Region covered by the token at `row`/`col`.
    ///
    /// Starts at [`offset_at`](Self::offset_at). Extends across the run of
    /// identifier characters beginning there; otherwise covers one grapheme
    /// cluster; at a line end the region is empty. Column 0 covers the
    /// line's non-blank span.
    #[must_use]
    pub fn token_region(
        &self,
        text: &str,
        row: usize,
        col: usize,
        unit: ColumnUnit,
    ) -> Range<usize> {
        let content = self.line_content(text, row.max(1) - 1);
        if col == 0 {
            return trimmed(text, content);
        }
        let start = content.start + advance(&text[content.clone()], col - 1, unit);
        let rest = &text[start..content.end];

        let ident_len: usize = rest
            .chars()
            .take_while(|&ch| is_identifier_char(ch))
            .map(char::len_utf8)
            .sum();
        let width = if ident_len > 0 {
            ident_len
        } else {
            rest.graphemes(true).next().map_or(0, str::len)
        };
        start..(start + width).min(self.len)
    }

    /// Inverse of [`offset_at`](Self::offset_at): 1-based line and column.
    #[must_use]
    pub fn line_col(&self, text: &str, offset: usize, unit: ColumnUnit) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let start = self.line_starts[line];
        let col = text
            .get(start..offset)
            .map_or(0, |prefix| prefix.chars().map(|ch| unit.width(ch)).sum());
        (line + 1, col + 1)
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Byte length of the prefix of `line` spanning `units` columns.
fn advance(line: &str, units: usize, unit: ColumnUnit) -> usize {
    let mut consumed = 0;
    for (idx, ch) in line.char_indices() {
        let width = unit.width(ch);
        if consumed + width > units {
            return idx;
        }
        consumed += width;
    }
    line.len()
}

fn trimmed(text: &str, content: Range<usize>) -> Range<usize> {
    let line = &text[content.clone()];
    let lead = line.len() - line.trim_start().len();
    let trail = line.len() - line.trim_end().len();
    if lead == line.len() {
        return content.start..content.start;
    }
    content.start + lead..content.end - trail
}
