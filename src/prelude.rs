pub use crate::builder::{LruBaseBuilder, PurgeSetBuilder};
pub use crate::error::{ClockSkewError, ConfigError, InvariantError};
pub use crate::helper::{ByteLenHelper, ValueHelper};
pub use crate::lru_base::{LruBase, PutOutcome};
pub use crate::purge_set::{PurgeHelper, PurgeSet, PurgeSetSnapshot};
pub use crate::stats::{LruStats, LruStatsSnapshot, StatsSink};

#[cfg(feature = "concurrency")]
pub use crate::concurrent::{ConcurrentLruBase, ConcurrentPurgeSet};
#[cfg(feature = "metrics")]
pub use crate::exporter::{MetricsExporter, PrometheusTextExporter};
