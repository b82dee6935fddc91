//! Builders for the substrate and the purge set.
//!
//! Both constructors are infallible on their own; the builders add
//! validated configuration for values that usually come from an operator
//! (byte budgets, skew allowance).
//!
//! ## Example
//!
//! ```rust
//! use purgekit::builder::{LruBaseBuilder, PurgeSetBuilder};
//! use purgekit::helper::ByteLenHelper;
//!
//! let mut lru = LruBaseBuilder::new(1024)
//!     .capacity_hint(64)
//!     .build::<Vec<u8>, _>(ByteLenHelper::new());
//! lru.put("greeting", b"hello".to_vec());
//! assert!(lru.contains("greeting"));
//!
//! let purges = PurgeSetBuilder::new(4096)
//!     .clock_skew_allowance_ms(30_000)
//!     .try_build()
//!     .unwrap();
//! assert_eq!(purges.clock_skew_allowance_ms(), 30_000);
//! ```

use crate::error::ConfigError;
use crate::helper::ValueHelper;
use crate::lru_base::LruBase;
use crate::purge_set::PurgeSet;

/// Configures an [`LruBase`].
#[derive(Debug, Clone)]
pub struct LruBaseBuilder {
    max_bytes: usize,
    capacity_hint: usize,
}

impl LruBaseBuilder {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            capacity_hint: 0,
        }
    }

    /// Expected number of entries; pre-sizes the index and recency list.
    pub fn capacity_hint(mut self, entries: usize) -> Self {
        self.capacity_hint = entries;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::new("max_bytes must be > 0"));
        }
        Ok(())
    }

    /// Builds without validation; a zero budget admits only empty entries.
    pub fn build<V, H: ValueHelper<V>>(self, helper: H) -> LruBase<V, H> {
        LruBase::with_capacity(self.max_bytes, helper, self.capacity_hint)
    }

    pub fn try_build<V, H: ValueHelper<V>>(self, helper: H) -> Result<LruBase<V, H>, ConfigError> {
        self.validate()?;
        Ok(self.build(helper))
    }
}

/// Configures a [`PurgeSet`].
#[derive(Debug, Clone)]
pub struct PurgeSetBuilder {
    max_bytes: usize,
    clock_skew_allowance_ms: i64,
}

impl PurgeSetBuilder {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            clock_skew_allowance_ms: PurgeSet::CLOCK_SKEW_ALLOWANCE_MS,
        }
    }

    /// How far behind the newest timestamp a timestamp may be and still be
    /// pinned forward instead of rejected.
    pub fn clock_skew_allowance_ms(mut self, allowance_ms: i64) -> Self {
        self.clock_skew_allowance_ms = allowance_ms;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::new("max_bytes must be > 0"));
        }
        if self.clock_skew_allowance_ms < 0 {
            return Err(ConfigError::new(format!(
                "clock_skew_allowance_ms must be >= 0, got {}",
                self.clock_skew_allowance_ms
            )));
        }
        Ok(())
    }

    pub fn try_build(self) -> Result<PurgeSet, ConfigError> {
        self.validate()?;
        Ok(PurgeSet::with_clock_skew_allowance(
            self.max_bytes,
            self.clock_skew_allowance_ms,
        ))
    }
}

impl Default for PurgeSetBuilder {
    fn default() -> Self {
        Self::new(PurgeSet::DEFAULT_MAX_BYTES)
    }
}
