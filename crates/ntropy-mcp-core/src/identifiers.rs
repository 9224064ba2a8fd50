// crates/ntropy-mcp-core/src/identifiers.rs
// ============================================================================
// Module: Identifiers
// Description: Canonical caller-supplied identifiers.
// Purpose: Normalize string-or-integer identifiers into one representation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Callers serialize identifiers inconsistently: the same account holder may
//! arrive as `"42"` or `42`. [`Identifier`] is the single canonical form used
//! past the validation boundary. Identifiers are opaque and compared by
//! equality only; they are never interpreted numerically once coerced.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Maximum accepted identifier length in bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 512;

/// Canonical identifier for account holders and transactions.
///
/// # Invariants
/// - Never empty or whitespace-only.
/// - At most [`MAX_IDENTIFIER_LENGTH`] bytes.
/// - Integer inputs are rendered in base-10 without sign padding or exponent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier from an already-canonical string.
    ///
    /// Returns `None` when the value is blank or exceeds the length limit.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() || value.len() > MAX_IDENTIFIER_LENGTH {
            return None;
        }
        Some(Self(value))
    }

    /// Coerces a loosely-typed JSON identifier.
    ///
    /// Strings are kept verbatim; integers (signed or unsigned) are rendered
    /// as decimal strings. Floats, booleans, arrays, objects, and null are
    /// rejected.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Self::new(text.as_str()),
            Value::Number(number) => {
                if let Some(unsigned) = number.as_u64() {
                    Self::new(unsigned.to_string())
                } else {
                    number.as_i64().and_then(|signed| Self::new(signed.to_string()))
                }
            }
            _ => None,
        }
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
