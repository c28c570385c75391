//! End-to-end clustering demo.
//!
//! This example shows how to:
//! - Configure a layout run
//! - Compute partition boundaries from a sampled input
//! - Assign records to partitions
//! - Print and save run metrics
//!
//! Run with: cargo run --example layout_demo --features metrics

use anyhow::Result;
use zcluster::{ExecMode, LayoutConfig, Value, ZOrderLayout};

fn main() -> Result<()> {
    println!("=== Z-Order Layout Example ===\n");

    // A 200 x 100 grid of 2-D points.
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for x in 0..200i64 {
        for y in 0..100i64 {
            rows.push(vec![Value::Int64(x << 32), Value::Int64(y << 32)]);
        }
    }

    let layout = ZOrderLayout {
        mode: ExecMode::Parallel {
            threads: None,
            workers: Some(4),
        },
        ..ZOrderLayout::new(LayoutConfig::new(8, 2))
    };

    println!("Partitioning {} records into 8 partitions...\n", rows.len());

    #[cfg(feature = "metrics")]
    {
        let (assignments, metrics) = layout.partition_rows_metered(&rows)?;
        println!("First ten assignments: {:?}\n", &assignments[..10]);

        metrics.print();
        metrics.save_to_file("layout_metrics.json")?;
        println!("\nMetrics saved to: layout_metrics.json");
    }

    #[cfg(not(feature = "metrics"))]
    {
        let boundaries = layout.compute_boundaries(&rows)?;
        let assignments = layout.partition_rows_with(&boundaries, &rows)?;
        println!("First ten assignments: {:?}", &assignments[..10]);
        println!("Rebuild with --features metrics for run statistics.");
    }

    Ok(())
}
