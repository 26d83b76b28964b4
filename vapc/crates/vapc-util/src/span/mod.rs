//! Span module - Source location tracking.
//!
//! Every AST node handed over by the parser carries a [`Span`]; the semantic
//! core copies it onto the expression or statement built from that node so
//! that fatal errors can name the offending file, line and column.
//!
//! # Examples
//!
//! ```
//! use vapc_util::span::{FileId, Span};
//!
//! let span = Span::with_file(10, 20, FileId(0), 1, 5);
//! assert_eq!(span.len(), 10);
//! ```

mod source_map;

pub use source_map::{SourceFile, SourceMap};

/// A unique identifier for a source file
///
/// FileIds are assigned sequentially as files are added to the [`SourceMap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

impl FileId {
    /// A dummy FileId for testing
    pub const DUMMY: FileId = FileId(0);

    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Source location span
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start byte offset in source
    pub start: usize,
    /// End byte offset in source
    pub end: usize,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
    /// File identifier
    pub file_id: FileId,
}

impl Span {
    /// Span for nodes synthesized by the compiler itself
    pub const DUMMY: Span = Span {
        start: 0,
        end: 0,
        line: 0,
        column: 0,
        file_id: FileId::DUMMY,
    };

    /// Create a new span in the default file
    #[inline]
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self::with_file(start, end, FileId::DUMMY, line, column)
    }

    #[inline]
    pub fn with_file(start: usize, end: usize, file_id: FileId, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
            file_id,
        }
    }

    /// Zero-length span at a line/column position
    #[inline]
    pub fn point(line: u32, column: u32) -> Self {
        Self::new(0, 0, line, column)
    }

    #[inline]
    pub fn is_dummy(&self) -> bool {
        *self == Self::DUMMY
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`
    ///
    /// The line/column of the result is that of the earlier span. Dummy spans
    /// are absorbed.
    ///
    /// ```
    /// use vapc_util::span::Span;
    ///
    /// let a = Span::new(4, 8, 1, 5);
    /// let b = Span::new(10, 12, 1, 11);
    /// assert_eq!(a.merge(b), Span::new(4, 12, 1, 5));
    /// assert_eq!(Span::DUMMY.merge(b), b);
    /// ```
    pub fn merge(self, other: Span) -> Span {
        if self.is_dummy() {
            return other;
        }
        if other.is_dummy() {
            return self;
        }
        let (first, _) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: first.line,
            column: first.column,
            file_id: self.file_id,
        }
    }
}
