//! Example: tracking purges and validating cached objects against them.
//!
//! Run with: cargo run --example purge_set_basics

use purgekit::builder::PurgeSetBuilder;
use purgekit::purge_set::PurgeSet;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== PurgeSet Example ===\n");

    // room for two "/obN" records (4 + 8 bytes each)
    let mut purges = PurgeSetBuilder::new(24)
        .try_build()
        .expect("valid configuration");

    purges.put("/ob1", 1_000).expect("fresh timestamp");
    purges.put("/ob2", 2_000).expect("fresh timestamp");
    println!("1. Two purges recorded:\n{purges}");

    println!("   /ob1 cached at 900 valid?  {}", purges.is_valid("/ob1", 900));
    println!("   /ob1 cached at 1500 valid? {}", purges.is_valid("/ob1", 1_500));
    println!("   /ob9 cached at 10 valid?   {}", purges.is_valid("/ob9", 10));

    purges.put("/ob3", 3_000).expect("fresh timestamp");
    println!("\n2. A third purge evicts the oldest into the global cutoff:\n{purges}");
    println!("   /ob9 cached at 10 valid?   {}", purges.is_valid("/ob9", 10));

    // a step back inside the allowance is pinned forward
    purges.put("/ob4", 2_500).expect("within skew allowance");
    println!("3. /ob4 pinned to {:?}", purges.record("/ob4"));

    let far_past = 3_000 - PurgeSet::CLOCK_SKEW_ALLOWANCE_MS - 1;
    match purges.put("/ob5", far_past) {
        Ok(()) => println!("4. unexpectedly accepted"),
        Err(err) => println!("4. rejected: {err}"),
    }

    let mut peer = PurgeSet::new(1024);
    peer.put("/ob2", 4_000).expect("fresh timestamp");
    purges.merge(&peer);
    println!("\n5. After merging a peer's purges:\n{purges}");
    println!("{:?}", purges.snapshot());
}
