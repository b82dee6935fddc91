//! purgekit: a byte-bounded LRU cache substrate and a purge-set for tracking
//! cache invalidation directives.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod ds;
pub mod error;
pub mod helper;
pub mod lru_base;
pub mod prelude;
pub mod purge_set;
pub mod stats;

#[cfg(feature = "concurrency")]
pub mod concurrent;

#[cfg(feature = "metrics")]
pub mod exporter;
