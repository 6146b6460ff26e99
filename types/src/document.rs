use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::ids::DocumentId;
use crate::position::{ColumnUnit, LineIndex};

/// Immutable snapshot of a text buffer.
///
/// Taken when a check starts; edits made to the live buffer afterwards do
/// not reach an analyzer that is already reading this snapshot.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    path: PathBuf,
    text: String,
    index: LineIndex,
    column_unit: ColumnUnit,
}

impl Document {
    #[must_use]
    pub fn new(id: DocumentId, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LineIndex::new(&text);
        Self {
            id,
            path: path.into(),
            text,
            index,
            column_unit: ColumnUnit::default(),
        }
    }

    /// Interpret reported columns in `unit`.
    #[must_use]
    pub fn with_column_unit(mut self, unit: ColumnUnit) -> Self {
        self.column_unit = unit;
        self
    }

    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// On-disk path the analyzer should treat the text as coming from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn column_unit(&self) -> ColumnUnit {
        self.column_unit
    }

    /// Directory containing the document, if the path has one.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }

    /// Byte offset of 1-based `row`/`col`.
    #[must_use]
    pub fn offset_at(&self, row: usize, col: usize) -> usize {
        self.index.offset_at(&self.text, row, col, self.column_unit)
    }

    /// Byte range of the token at 1-based `row`/`col`.
    #[must_use]
    pub fn token_region(&self, row: usize, col: usize) -> Range<usize> {
        self.index.token_region(&self.text, row, col, self.column_unit)
    }

    /// 1-based line and column of a byte offset.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        self.index.line_col(&self.text, offset, self.column_unit)
    }
}
