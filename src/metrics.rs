//! Run statistics for layout computations.
//!
//! Collected outside the hot assignment path: callers fill a
//! [`LayoutMetrics`] from a finished run and print it or save it as JSON.
//!
//! # Example
//!
//! ```no_run
//! use zcluster::metrics::LayoutMetrics;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut m = LayoutMetrics::new(4);
//! m.records_seen = 20_000;
//! m.sample_size = 480;
//! for p in [0, 1, 1, 3] {
//!     m.record_assignment(p);
//! }
//! m.print();
//! m.save_to_file("layout_metrics.json")?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Statistics from one clustering run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    /// Total input records streamed through the reservoirs.
    pub records_seen: u64,
    /// Workers that contributed partial reservoirs.
    pub workers: usize,
    /// Size of the merged sample the boundaries were cut from.
    pub sample_size: usize,
    /// Records assigned to each partition.
    pub partition_counts: Vec<u64>,
}

impl LayoutMetrics {
    #[must_use]
    pub fn new(partition_num: usize) -> Self {
        Self {
            partition_counts: vec![0; partition_num],
            ..Self::default()
        }
    }

    /// Count one record routed to `partition`.
    pub fn record_assignment(&mut self, partition: usize) {
        if partition < self.partition_counts.len() {
            self.partition_counts[partition] += 1;
        }
    }

    /// Largest partition count divided by the ideal per-partition share;
    /// 1.0 is perfectly balanced. Returns `None` before any assignment.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn skew(&self) -> Option<f64> {
        let total: u64 = self.partition_counts.iter().sum();
        let max = *self.partition_counts.iter().max()?;
        if total == 0 {
            return None;
        }
        let ideal = total as f64 / self.partition_counts.len() as f64;
        Some(max as f64 / ideal)
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "records_seen": self.records_seen,
            "workers": self.workers,
            "sample_size": self.sample_size,
            "partition_counts": self.partition_counts,
            "skew": self.skew(),
        })
    }

    /// Print a human-readable summary to stdout.
    pub fn print(&self) {
        println!("=== layout metrics ===");
        println!("records seen:  {}", self.records_seen);
        println!("workers:       {}", self.workers);
        println!("sample size:   {}", self.sample_size);
        for (i, count) in self.partition_counts.iter().enumerate() {
            println!("partition {i}:  {count}");
        }
        if let Some(skew) = self.skew() {
            println!("skew:          {skew:.3}");
        }
    }

    /// Save the metrics as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_json())
            .context("failed to serialize layout metrics")?;
        let mut file = File::create(path.as_ref()).context("failed to create metrics file")?;
        file.write_all(json.as_bytes())
            .context("failed to write metrics file")?;
        Ok(())
    }
}
