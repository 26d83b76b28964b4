//! Error types for the vapc-util crate.

use thiserror::Error;

/// Errors from [`SourceMap`](crate::span::SourceMap) lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceMapError {
    #[error("source file not found: {0}")]
    FileNotFound(String),
}

pub type SourceMapResult<T> = Result<T, SourceMapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_map_error_display() {
        assert_eq!(
            SourceMapError::FileNotFound("FileId(3)".into()).to_string(),
            "source file not found: FileId(3)"
        );
    }
}
