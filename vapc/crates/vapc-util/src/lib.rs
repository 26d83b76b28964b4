//! vapc-util - Foundation types shared by every phase of the vapc compiler.
//!
//! This crate holds the small, dependency-light building blocks that the
//! parser boundary (`vapc-ast`) and the semantic core (`vapc-sem`) agree on:
//!
//! - [`Symbol`]: an interned identifier. Comparing two symbols is an integer
//!   comparison; the text lives in a process-wide table.
//! - [`IndexVec`] and the [`Idx`] trait: vectors addressed by typed indices.
//!   The semantic core stores its whole object graph in such vectors, so a
//!   "pointer" between nodes is a `u32` newtype created with [`define_idx!`].
//! - [`Span`], [`FileId`] and [`SourceMap`]: source locations threaded from the
//!   parser into every diagnostic.
//! - [`Diagnostic`] and [`DiagnosticCode`]: user-visible error
//!   reporting.
//!
//! # Typed indices
//!
//! ```
//! use vapc_util::{define_idx, Idx, IndexVec};
//!
//! define_idx!(NodeId);
//!
//! let mut nodes: IndexVec<NodeId, &str> = IndexVec::new();
//! let root = nodes.push("root");
//! assert_eq!(nodes[root], "root");
//! assert_eq!(root.index(), 0);
//! ```

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticCode, Level};
pub use error::{SourceMapError, SourceMapResult};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::{sym, Symbol};

// Re-export commonly used collections
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;

/// Insertion-ordered map with the fast Fx hasher.
///
/// Scopes keep their bindings in declaration order, which keeps printing and
/// interface generation deterministic.
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, rustc_hash::FxBuildHasher>;

/// Macro to define index types easily
///
/// The generated type is a `u32` newtype implementing [`Idx`] and the usual
/// value traits, suitable as a key in hash maps.
#[macro_export]
macro_rules! define_idx {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize);
                $name(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}
