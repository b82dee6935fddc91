//! Example: a byte-budgeted LRU with a custom value helper.
//!
//! Run with: cargo run --example lru_base_basics

use purgekit::helper::ValueHelper;
use purgekit::lru_base::{LruBase, PutOutcome};

/// Versioned values: a re-put only wins if it carries a newer version.
#[derive(Debug, Clone, PartialEq)]
struct Versioned {
    version: u32,
    body: String,
}

#[derive(Default)]
struct VersionedHelper {
    evicted: Vec<String>,
}

impl ValueHelper<Versioned> for VersionedHelper {
    fn size(&self, value: &Versioned) -> usize {
        4 + value.body.len()
    }

    fn equal(&self, a: &Versioned, b: &Versioned) -> bool {
        a == b
    }

    fn should_replace(&self, old: &Versioned, new: &Versioned) -> bool {
        new.version >= old.version
    }

    fn evict_notify(&mut self, value: &Versioned) {
        self.evicted.push(value.body.clone());
    }
}

fn v(version: u32, body: &str) -> Versioned {
    Versioned {
        version,
        body: body.to_string(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== LruBase Example ===\n");

    // each entry below costs 1 (key) + 4 (version) + 5 (body) = 10 bytes
    let mut lru = LruBase::new(30, VersionedHelper::default());
    lru.put("a", v(1, "alpha"));
    lru.put("b", v(1, "bravo"));
    lru.put("c", v(1, "charl"));
    println!("1. Filled to {} / {} bytes", lru.size_bytes(), lru.max_bytes());

    lru.get_and_freshen("a");
    lru.put("d", v(1, "delta"));
    println!("2. After touching 'a' and inserting 'd':");
    println!("   contains a? {} (recently used)", lru.contains("a"));
    println!("   contains b? {} (evicted as LRU)", lru.contains("b"));
    println!("   evicted so far: {:?}", lru.helper().evicted);

    let outcome = lru.put("a", v(0, "stale"));
    assert_eq!(outcome, PutOutcome::Retained);
    println!("3. Older version of 'a' is {outcome:?}: {:?}", lru.peek("a"));

    let outcome = lru.put("a", v(2, "newer"));
    println!("4. Newer version of 'a' is {outcome:?}: {:?}", lru.peek("a"));

    let outcome = lru.put("huge", v(9, &"x".repeat(64)));
    println!("5. Oversized entry is {outcome:?}; size stays {}", lru.size_bytes());

    println!("\nOldest to newest:");
    for (key, value) in &lru {
        println!("   {} => {:?}", String::from_utf8_lossy(key), value);
    }
    println!("\n{:?}", lru.stats());
}
