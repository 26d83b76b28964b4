//! Diagnostic codes for categorizing compiler errors.
//!
//! Semantic analysis owns the `E3xxx` range.
//!
//! ```
//! use vapc_util::diagnostic::DiagnosticCode;
//!
//! assert_eq!(DiagnosticCode::E3001.as_str(), "E3001");
//! ```

use std::fmt;

/// A unique code identifying a diagnostic message
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    /// The prefix (e.g., "E" for error, "W" for warning)
    pub prefix: &'static str,
    /// The numeric identifier
    pub number: u32,
}

impl DiagnosticCode {
    #[inline]
    pub const fn new(prefix: &'static str, number: u32) -> Self {
        Self { prefix, number }
    }

    /// Full code string, e.g. `E3001`
    pub fn as_str(&self) -> String {
        format!("{}{:04}", self.prefix, self.number)
    }

    // =========================================================================
    // SEMANTIC ANALYSIS (E3001-E3099)
    // =========================================================================

    /// E3001: Name not found in any enclosing scope
    pub const E3001: Self = Self::new("E", 3001);
    /// E3002: Declared type disagrees with the inferred type
    pub const E3002: Self = Self::new("E", 3002);
    /// E3003: No overload matches the call
    pub const E3003: Self = Self::new("E", 3003);
    /// E3004: More than one overload matches the call
    pub const E3004: Self = Self::new("E", 3004);
    /// E3005: Expression used as a type is not a type
    pub const E3005: Self = Self::new("E", 3005);
    /// E3006: Name redeclared where shadowing is not allowed
    pub const E3006: Self = Self::new("E", 3006);
    /// E3007: Two overloads with identical parameter types
    pub const E3007: Self = Self::new("E", 3007);
    /// E3008: Constructor of a non-exported type called from another module
    pub const E3008: Self = Self::new("E", 3008);
    /// E3009: Entry point has the wrong signature
    pub const E3009: Self = Self::new("E", 3009);
    /// E3010: Typeclass instance does not match the typeclass
    pub const E3010: Self = Self::new("E", 3010);
    /// E3011: Compile-time evaluation failed (overflow, division by zero)
    pub const E3011: Self = Self::new("E", 3011);
    /// E3012: Feature not implemented
    pub const E3012: Self = Self::new("E", 3012);
    /// E3013: Analysis cannot make progress (cyclic dependency)
    pub const E3013: Self = Self::new("E", 3013);
    /// E3014: Simplification did not reach a fixpoint
    pub const E3014: Self = Self::new("E", 3014);
    /// E3099: Internal compiler error
    pub const E3099: Self = Self::new("E", 3099);
}

impl fmt::Debug for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DiagnosticCode({})", self.as_str())
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}
