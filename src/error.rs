//! Error types for purgekit.
//!
//! ## Key Components
//!
//! - [`ClockSkewError`]: returned by [`PurgeSet`](crate::purge_set::PurgeSet)
//!   operations when a timestamp lies further in the past than the clock skew
//!   allowance permits. The purge set is left unchanged.
//! - [`ConfigError`]: returned by builder `try_build()` methods when a
//!   configuration parameter is invalid.
//! - [`InvariantError`]: returned by `check_invariants` when the substrate's
//!   recency list, key index and byte accounting disagree.
//!
//! Admission refusal and key absence are deliberately *not* errors; see
//! [`PutOutcome`](crate::lru_base::PutOutcome).
//!
//! ## Example Usage
//!
//! ```
//! use purgekit::purge_set::PurgeSet;
//!
//! let mut purges = PurgeSet::new(1024);
//! purges.put("http://example.com/a", 2_000_000).unwrap();
//!
//! // More than ten minutes behind the newest timestamp seen so far.
//! let err = purges.put("http://example.com/b", 1_000_000).unwrap_err();
//! assert_eq!(err.last_seen_ms, 2_000_000);
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// ClockSkewError
// ---------------------------------------------------------------------------

/// A timestamp moved backwards by more than the permitted skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "timestamp {timestamp_ms}ms is more than {allowance_ms}ms behind last seen timestamp {last_seen_ms}ms"
)]
pub struct ClockSkewError {
    /// The rejected timestamp.
    pub timestamp_ms: i64,
    /// Newest timestamp the purge set had observed at the time.
    pub last_seen_ms: i64,
    /// Skew allowance in effect.
    pub allowance_ms: i64,
}

impl ClockSkewError {
    /// How far behind `last_seen_ms` the rejected timestamp was.
    pub fn skew_ms(&self) -> i64 {
        self.last_seen_ms.saturating_sub(self.timestamp_ms)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when configuration parameters are invalid.
///
/// # Example
///
/// ```
/// use purgekit::builder::PurgeSetBuilder;
///
/// let err = PurgeSetBuilder::new(0).try_build().unwrap_err();
/// assert!(err.to_string().contains("max_bytes"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
