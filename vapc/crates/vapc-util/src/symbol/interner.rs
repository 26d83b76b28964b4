//! String interner backing [`Symbol`].
//!
//! Lookups by text go through a `DashMap` keyed with the aHash hasher, so
//! several compilation units running on different threads can intern without
//! contending on one lock. Reverse lookups (symbol to text) read a
//! `parking_lot::RwLock`-guarded vector indexed by the symbol.

use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use super::{Symbol, KNOWN_SYMBOLS};

/// Global string table, initialized on first use with the known symbols.
pub static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// Thread-safe string table.
///
/// Interned strings are leaked to obtain `'static` references; the table lives
/// for the whole process and never removes entries.
pub struct StringTable {
    map: DashMap<&'static str, u32, RandomState>,
    strings: RwLock<Vec<&'static str>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Interner hit/miss counters, useful when profiling large modules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InternerStats {
    pub symbols: usize,
    pub hits: usize,
    pub misses: usize,
}

impl StringTable {
    fn new() -> Self {
        let table = Self {
            map: DashMap::with_capacity_and_hasher(256, RandomState::new()),
            strings: RwLock::new(Vec::with_capacity(256)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        };
        {
            let mut strings = table.strings.write();
            for (idx, text) in KNOWN_SYMBOLS.iter().enumerate() {
                table.map.insert(*text, idx as u32);
                strings.push(*text);
            }
        }
        table
    }

    /// Intern a string, returning its symbol.
    pub fn intern(&self, string: &str) -> Symbol {
        if let Some(index) = self.map.get(string) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Symbol::known(*index);
        }

        match self.map.entry(Box::leak(string.to_owned().into_boxed_str())) {
            // Another thread won the race between the lookup and the insert.
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Symbol::known(*entry.get())
            }
            Entry::Vacant(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let mut strings = self.strings.write();
                let index = strings.len() as u32;
                strings.push(*entry.key());
                entry.insert(index);
                Symbol::known(index)
            }
        }
    }

    /// Text of `symbol`.
    ///
    /// Symbols can only be obtained from this table, so the index is always
    /// in range.
    pub fn resolve(&self, symbol: Symbol) -> &'static str {
        self.strings.read()[symbol.as_u32() as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> InternerStats {
        InternerStats {
            symbols: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_count_hits() {
        let before = STRING_TABLE.stats();
        Symbol::intern("stats_probe_symbol");
        Symbol::intern("stats_probe_symbol");
        let after = STRING_TABLE.stats();
        assert!(after.hits > before.hits);
        assert!(after.symbols >= before.symbols);
        assert!(!STRING_TABLE.is_empty());
    }
}
