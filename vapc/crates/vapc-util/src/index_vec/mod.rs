//! IndexVec - A vector indexed by a specific type.
//!
//! This module provides [`IndexVec`], a typed vector that uses a custom index type
//! instead of `usize`. The semantic core keeps every expression, statement,
//! type and scope in one of these, so mixing up an expression id with a
//! statement id is a compile error.
//!
//! # Example
//!
//! ```
//! use vapc_util::index_vec::{IndexVec, Idx};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq)]
//! struct ExprId(u32);
//!
//! impl Idx for ExprId {
//!     fn from_usize(idx: usize) -> Self { ExprId(idx as u32) }
//!     fn index(self) -> usize { self.0 as usize }
//! }
//!
//! let mut exprs: IndexVec<ExprId, i32> = IndexVec::new();
//! let id = exprs.push(42);
//! assert_eq!(exprs[id], 42);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

#[cfg(test)]
mod tests;

/// Trait for types that can be used as indices
///
/// Use [`define_idx!`](crate::define_idx) to generate implementations.
pub trait Idx: Copy + Eq + PartialEq {
    /// Convert from usize to index type
    ///
    /// # Panics
    ///
    /// Implementations may panic if the usize value is too large to fit
    /// in the index type.
    fn from_usize(idx: usize) -> Self;

    /// Convert index to usize for array indexing
    fn index(self) -> usize;
}

impl Idx for usize {
    #[inline]
    fn from_usize(idx: usize) -> Self {
        idx
    }

    #[inline]
    fn index(self) -> usize {
        self
    }
}

/// A vector indexed by a specific type
///
/// Elements are never removed individually, so an index handed out by
/// [`IndexVec::push`] stays valid for the lifetime of the vector. That is the
/// property the semantic arena relies on: replacing a child node means
/// pointing a slot at a different index, never moving nodes.
#[derive(Clone, PartialEq, Eq)]
pub struct IndexVec<I, T> {
    raw: Vec<T>,
    _marker: PhantomData<fn(&I)>,
}

impl<I: Idx, T> IndexVec<I, T> {
    /// Create an empty IndexVec
    #[inline]
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Create an IndexVec with the specified capacity
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: Vec::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Append an element and return its index
    ///
    /// # Examples
    ///
    /// ```
    /// use vapc_util::index_vec::IndexVec;
    ///
    /// let mut vec: IndexVec<usize, &str> = IndexVec::new();
    /// let first = vec.push("a");
    /// let second = vec.push("b");
    /// assert_eq!((first, second), (0, 1));
    /// ```
    #[inline]
    pub fn push(&mut self, value: T) -> I {
        let idx = I::from_usize(self.raw.len());
        self.raw.push(value);
        idx
    }

    /// The index the next [`push`](Self::push) will return
    #[inline]
    pub fn next_index(&self) -> I {
        I::from_usize(self.raw.len())
    }

    #[inline]
    pub fn get(&self, idx: I) -> Option<&T> {
        self.raw.get(idx.index())
    }

    #[inline]
    pub fn get_mut(&mut self, idx: I) -> Option<&mut T> {
        self.raw.get_mut(idx.index())
    }

    /// Whether `idx` addresses an element of this vector
    #[inline]
    pub fn contains(&self, idx: I) -> bool {
        idx.index() < self.raw.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.raw.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.raw.iter_mut()
    }

    /// Iterate over `(index, &element)` pairs
    ///
    /// # Examples
    ///
    /// ```
    /// use vapc_util::index_vec::IndexVec;
    ///
    /// let mut vec: IndexVec<usize, char> = IndexVec::new();
    /// vec.push('x');
    /// vec.push('y');
    /// let pairs: Vec<_> = vec.iter_enumerated().collect();
    /// assert_eq!(pairs, vec![(0, &'x'), (1, &'y')]);
    /// ```
    pub fn iter_enumerated(&self) -> impl DoubleEndedIterator<Item = (I, &T)> + '_ {
        self.raw
            .iter()
            .enumerate()
            .map(|(i, value)| (I::from_usize(i), value))
    }

    /// Iterate over all valid indices
    pub fn indices(&self) -> impl DoubleEndedIterator<Item = I> + 'static
    where
        I: 'static,
    {
        (0..self.raw.len()).map(I::from_usize)
    }

    /// Mutable access to two distinct elements at once
    ///
    /// # Panics
    ///
    /// Panics if `a == b` or either index is out of bounds.
    pub fn pick2_mut(&mut self, a: I, b: I) -> (&mut T, &mut T) {
        let (ai, bi) = (a.index(), b.index());
        assert_ne!(ai, bi, "pick2_mut called with identical indices");
        if ai < bi {
            let (left, right) = self.raw.split_at_mut(bi);
            (&mut left[ai], &mut right[0])
        } else {
            let (left, right) = self.raw.split_at_mut(ai);
            (&mut right[0], &mut left[bi])
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.raw
    }
}

impl<I: Idx, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: I) -> &T {
        &self.raw[idx.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IndexVec<I, T> {
    #[inline]
    fn index_mut(&mut self, idx: I) -> &mut T {
        &mut self.raw[idx.index()]
    }
}

impl<I: Idx, T> FromIterator<T> for IndexVec<I, T> {
    fn from_iter<It: IntoIterator<Item = T>>(iter: It) -> Self {
        Self {
            raw: iter.into_iter().collect(),
            _marker: PhantomData,
        }
    }
}

impl<'a, I: Idx, T> IntoIterator for &'a IndexVec<I, T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.raw.iter()
    }
}

impl<I, T: fmt::Debug> fmt::Debug for IndexVec<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.raw, f)
    }
}
