//! Source map for managing multiple source files.

use std::sync::Arc;

use super::{FileId, Span};
use crate::error::{SourceMapError, SourceMapResult};

/// A source file with its content and line index
#[derive(Clone)]
pub struct SourceFile {
    id: FileId,
    name: String,
    content: Arc<str>,
    /// Byte offset of the start of each line
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(id: usize, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            id: FileId(id),
            name: name.into(),
            content,
            line_starts,
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of a 1-based line, without its newline
    pub fn line_at(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.content.len());
        self.content.get(start..end)
    }

    /// 1-based (line, column) of a byte offset
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("lines", &self.line_count())
            .finish()
    }
}

/// A source map managing multiple source files
///
/// # Examples
///
/// ```
/// use vapc_util::span::{SourceMap, Span};
///
/// let mut map = SourceMap::new();
/// let file_id = map.add_file("main.vapor", "let x = 1;\nlet y = x;");
/// let span = Span::with_file(19, 20, file_id, 2, 9);
/// assert_eq!(map.location(span), "main.vapor:2:9");
/// ```
#[derive(Default)]
pub struct SourceMap {
    files: Vec<Arc<SourceFile>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Add a new source file, returning its [`FileId`]
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let file = SourceFile::new(self.files.len(), name, content);
        let id = file.id();
        self.files.push(Arc::new(file));
        id
    }

    pub fn get(&self, id: FileId) -> Option<Arc<SourceFile>> {
        self.files.get(id.0).cloned()
    }

    pub fn get_file(&self, id: FileId) -> SourceMapResult<Arc<SourceFile>> {
        self.get(id)
            .ok_or_else(|| SourceMapError::FileNotFound(format!("FileId({})", id.0)))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// `file:line:column` for a span, falling back to `<unknown>` for spans
    /// whose file is not registered
    pub fn location(&self, span: Span) -> String {
        match self.get(span.file_id) {
            Some(file) => format!("{}:{}:{}", file.name(), span.line, span.column),
            None => format!("<unknown>:{}:{}", span.line, span.column),
        }
    }

    /// Source line of a span with a caret under its start column
    pub fn snippet(&self, span: Span) -> Option<String> {
        let file = self.get(span.file_id)?;
        let line = file.line_at(span.line as usize)?;
        let width = span.len().max(1);
        Some(format!(
            "{:>4} | {}\n     | {}{}",
            span.line,
            line,
            " ".repeat(span.column.saturating_sub(1) as usize),
            "^".repeat(width)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let file = SourceFile::new(0, "a", "first\nsecond\nthird");
        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line_at(2), Some("second"));
        assert_eq!(file.line_at(3), Some("third"));
        assert_eq!(file.line_at(0), None);
        assert_eq!(file.offset_to_line_col(7), (2, 2));
    }

    #[test]
    fn test_unknown_file_location() {
        let map = SourceMap::new();
        assert_eq!(map.location(Span::point(3, 4)), "<unknown>:3:4");
        assert!(map.get_file(FileId(2)).is_err());
    }

    #[test]
    fn test_snippet_points_at_column() {
        let mut map = SourceMap::new();
        let id = map.add_file("m", "let x = y;");
        let snippet = map.snippet(Span::with_file(8, 9, id, 1, 9)).unwrap();
        assert_eq!(snippet, "   1 | let x = y;\n     |         ^");
    }
}
