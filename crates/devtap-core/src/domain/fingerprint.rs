//! Deterministic query fingerprints.
//!
//! Every [`Operation`](crate::Operation) carries a stable key derived from its
//! query text.  The inspector uses the key to correlate a replayed request with
//! the results that later flow back through the tap.
//!
//! The hash is the classic DJB2 "times 33" hash computed over the UTF-16 code
//! units of the text with 32-bit wrapping arithmetic.  UTF-16 is used so that
//! the same text hashes to the same key in a JavaScript inspector.  It is not
//! collision resistant and must never be used for anything security related.

use std::fmt;

use serde::{Deserialize, Serialize};

/// DJB2 starting value.
const SEED: u32 = 5381;

/// A 32-bit operation fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKey(pub u32);

impl OperationKey {
    /// Returns the raw key value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for OperationKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Continues a DJB2 hash from `seed` over `text`.
///
/// Exposed so callers can fold extra material (for example serialized
/// variables) into an existing key.
pub fn hash_with_seed(text: &str, seed: u32) -> u32 {
    text.encode_utf16().fold(seed, |h, unit| {
        h.wrapping_shl(5).wrapping_add(h).wrapping_add(u32::from(unit))
    })
}

/// Computes the fingerprint of a query's exact text.
///
/// Pure: identical text always yields the identical key, regardless of call
/// order or time.  Whitespace is significant.
///
/// # Examples
///
/// ```rust
/// use devtap_core::fingerprint;
///
/// let a = fingerprint("query { todos { id } }");
/// let b = fingerprint("query { todos { id } }");
/// assert_eq!(a, b);
/// assert_ne!(a, fingerprint("query { todos { title } }"));
/// ```
pub fn fingerprint(text: &str) -> OperationKey {
    OperationKey(hash_with_seed(text, SEED))
}
