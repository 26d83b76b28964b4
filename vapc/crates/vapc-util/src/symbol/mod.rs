//! Interned identifiers.
//!
//! A [`Symbol`] is a 4-byte handle into a process-wide string table. Interning
//! the same text twice yields the same symbol, so name comparison during scope
//! resolution is an integer comparison.
//!
//! Names the compiler itself needs to look up (builtin types, the entry point,
//! synthesized member names) are pre-interned with fixed indices and exposed
//! as constants in [`sym`].
//!
//! # Examples
//!
//! ```
//! use vapc_util::symbol::{sym, Symbol};
//!
//! let a = Symbol::intern("counter");
//! let b = Symbol::intern("counter");
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "counter");
//!
//! assert_eq!(Symbol::intern("int"), sym::INT);
//! ```

mod interner;

pub use interner::{InternerStats, StringTable, STRING_TABLE};

use std::fmt;

static_assertions::assert_eq_size!(Symbol, u32);

/// An interned string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    index: u32,
}

impl Symbol {
    const fn known(index: u32) -> Self {
        Self { index }
    }

    /// Intern `string`, returning the existing symbol when already present.
    pub fn intern(string: &str) -> Self {
        STRING_TABLE.intern(string)
    }

    /// Text of this symbol.
    pub fn as_str(&self) -> &'static str {
        STRING_TABLE.resolve(*self)
    }

    /// Whether this symbol is one of the pre-interned [`sym`] constants.
    pub fn is_known(&self) -> bool {
        (self.index as usize) < KNOWN_SYMBOLS.len()
    }

    /// Raw table index.
    pub fn as_u32(&self) -> u32 {
        self.index
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::intern(s)
    }
}

/// Pre-interned text, in index order. Must match the constants in [`sym`].
pub(crate) const KNOWN_SYMBOLS: &[&str] = &[
    "int", "bool", "type", "sint", "uint", "main", "entry", "self", "constructor",
    "operator+", "operator-", "operator*", "operator/", "operator%", "operator==",
    "operator!=", "operator<", "operator<=", "operator>", "operator>=", "operator&&",
    "operator||", "operator!", "",
];

/// Symbols with fixed indices.
pub mod sym {
    use super::Symbol;

    pub const INT: Symbol = Symbol::known(0);
    pub const BOOL: Symbol = Symbol::known(1);
    pub const TYPE: Symbol = Symbol::known(2);
    pub const SINT: Symbol = Symbol::known(3);
    pub const UINT: Symbol = Symbol::known(4);
    /// Name of the module holding the program entry point.
    pub const MAIN: Symbol = Symbol::known(5);
    /// Name of the program entry point.
    pub const ENTRY: Symbol = Symbol::known(6);
    pub const SELF: Symbol = Symbol::known(7);
    pub const CONSTRUCTOR: Symbol = Symbol::known(8);
    pub const OP_ADD: Symbol = Symbol::known(9);
    pub const OP_SUB: Symbol = Symbol::known(10);
    pub const OP_MUL: Symbol = Symbol::known(11);
    pub const OP_DIV: Symbol = Symbol::known(12);
    pub const OP_REM: Symbol = Symbol::known(13);
    pub const OP_EQ: Symbol = Symbol::known(14);
    pub const OP_NE: Symbol = Symbol::known(15);
    pub const OP_LT: Symbol = Symbol::known(16);
    pub const OP_LE: Symbol = Symbol::known(17);
    pub const OP_GT: Symbol = Symbol::known(18);
    pub const OP_GE: Symbol = Symbol::known(19);
    pub const OP_AND: Symbol = Symbol::known(20);
    pub const OP_OR: Symbol = Symbol::known(21);
    pub const OP_NOT: Symbol = Symbol::known(22);
    pub const EMPTY: Symbol = Symbol::known(23);
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_known_symbols_match_table() {
        for (idx, text) in KNOWN_SYMBOLS.iter().enumerate() {
            let symbol = Symbol::intern(text);
            assert_eq!(symbol.as_u32() as usize, idx, "{text:?} interned at wrong index");
            assert!(symbol.is_known());
        }
        assert_eq!(sym::ENTRY.as_str(), "entry");
        assert_eq!(sym::OP_NOT.as_str(), "operator!");
    }

    #[test]
    fn test_fresh_symbol_is_not_known() {
        let symbol = Symbol::intern("definitely_not_a_keyword_4711");
        assert!(!symbol.is_known());
        assert_eq!(format!("{symbol}"), "definitely_not_a_keyword_4711");
        assert_eq!(format!("{symbol:?}"), "Symbol(\"definitely_not_a_keyword_4711\")");
    }

    #[test]
    fn test_interning_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| Symbol::intern("shared_across_threads")))
            .collect();
        let symbols: Vec<Symbol> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(symbols.windows(2).all(|w| w[0] == w[1]));
    }

    #[quickcheck]
    fn prop_intern_roundtrip(text: String) -> bool {
        Symbol::intern(&text).as_str() == text
    }

    #[quickcheck]
    fn prop_intern_is_injective(a: String, b: String) -> bool {
        (Symbol::intern(&a) == Symbol::intern(&b)) == (a == b)
    }
}
