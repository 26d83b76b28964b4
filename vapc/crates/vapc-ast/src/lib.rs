//! vapc-ast - Parser boundary of the vapc compiler.
//!
//! The parser produces an immutable, already-validated tree of the types in
//! [`ast`]; the semantic core consumes it through its preanalysis entry
//! points. [`build`] offers terse constructors for synthesizing trees
//! without going through source text.

pub mod ast;
pub mod build;

pub use ast::*;
