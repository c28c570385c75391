//! End-to-end layout pipeline: sample, merge, extract boundaries, assign.
//!
//! [`ZOrderLayout`] drives the full clustering flow for one table-write
//! epoch. The phases run strictly forward:
//!
//! 1. **collecting** — each worker streams its share of the input rows
//!    through its own [`Reservoir`] (single-writer, no locks),
//! 2. **merging** — every worker's reservoir is flattened and the immutable
//!    blocks are folded into one reservoir in the coordinating context,
//! 3. **boundary-ready** — the merged sample is interleaved, sorted, and
//!    cut into a [`BoundaryList`],
//! 4. **assigning** — stateless, parallel-safe reads map each record's key
//!    to a partition index.
//!
//! There is no way back from step 3 to step 1: `flatten` consumes the
//! reservoir and the boundary list is immutable. A new epoch starts from a
//! fresh layout run.

use crate::assign::BoundaryList;
use crate::interleave::Interleaver;
use crate::sampler::{FlattenedReservoir, Reservoir, SAMPLE_HINT};
use crate::value::{ElementType, Value};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters of one clustering run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Number of storage partitions to cut the key space into.
    pub partition_num: usize,
    /// Samples kept per eventual partition.
    pub sample_hint: usize,
    /// Coordinate dimensions per input row.
    pub dimensions: usize,
    /// Seed for all sampling decisions; runs with equal seeds and worker
    /// counts are reproducible.
    pub seed: u64,
}

impl LayoutConfig {
    #[must_use]
    pub const fn new(partition_num: usize, dimensions: usize) -> Self {
        Self {
            partition_num,
            sample_hint: SAMPLE_HINT,
            dimensions,
            seed: 0x5EED_0F_5A4D1E5,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ExecMode {
    Sequential,
    Parallel {
        threads: Option<usize>,
        workers: Option<usize>,
    },
}

/// Orchestrates sampling, merging, and assignment over in-memory rows.
pub struct ZOrderLayout {
    pub mode: ExecMode,
    pub config: LayoutConfig,
    pub default_workers: usize,
}

impl ZOrderLayout {
    /// Parallel layout with default thread pool and worker count.
    #[must_use]
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            mode: ExecMode::Parallel {
                threads: None,
                workers: None,
            },
            config,
            default_workers: 2 * num_cpus::get().max(2),
        }
    }

    #[must_use]
    pub fn sequential(config: LayoutConfig) -> Self {
        Self {
            mode: ExecMode::Sequential,
            ..Self::new(config)
        }
    }

    fn interleaver(&self) -> Result<Interleaver> {
        Interleaver::new(self.config.dimensions)
    }

    fn worker_reservoir(&self, worker: usize) -> Result<Reservoir> {
        let seed = self
            .config
            .seed
            .wrapping_add((worker as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Reservoir::new(
            ElementType::Record,
            self.config.sample_hint,
            self.config.partition_num,
            seed,
        )
    }

    /// Sample `rows` and derive the boundary list for this configuration.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, rows of the wrong dimension count,
    /// or an empty input with more than one partition.
    pub fn compute_boundaries(&self, rows: &[Vec<Value>]) -> Result<BoundaryList> {
        let interleaver = self.interleaver()?;
        let merged = self.sample_rows(rows)?;
        merged
            .extract_boundaries(&interleaver)
            .context("failed to extract partition boundaries from the merged sample")
    }

    /// Assign every row to its partition, deriving boundaries first.
    ///
    /// # Errors
    ///
    /// See [`compute_boundaries`](Self::compute_boundaries).
    pub fn partition_rows(&self, rows: &[Vec<Value>]) -> Result<Vec<usize>> {
        let boundaries = self.compute_boundaries(rows)?;
        self.partition_rows_with(&boundaries, rows)
    }

    /// Assign every row against an already-fixed boundary list.
    ///
    /// The boundary list is read-only here; this step is repeatable and
    /// safe to run concurrently against the same boundaries.
    ///
    /// # Errors
    ///
    /// Fails if a row cannot be interleaved.
    pub fn partition_rows_with(
        &self,
        boundaries: &BoundaryList,
        rows: &[Vec<Value>],
    ) -> Result<Vec<usize>> {
        let interleaver = self.interleaver()?;
        let assign_one =
            |row: &Vec<Value>| -> Result<usize> { Ok(boundaries.assign(interleaver.interleave(row)?)) };
        match self.mode {
            ExecMode::Sequential => rows.iter().map(assign_one).collect(),
            ExecMode::Parallel { .. } => rows.par_iter().map(assign_one).collect(),
        }
    }

    /// Like [`partition_rows`](Self::partition_rows), additionally
    /// returning run statistics.
    ///
    /// # Errors
    ///
    /// See [`compute_boundaries`](Self::compute_boundaries).
    #[cfg(feature = "metrics")]
    pub fn partition_rows_metered(
        &self,
        rows: &[Vec<Value>],
    ) -> Result<(Vec<usize>, crate::metrics::LayoutMetrics)> {
        let interleaver = self.interleaver()?;
        let merged = self.sample_rows(rows)?;
        let mut metrics = crate::metrics::LayoutMetrics::new(self.config.partition_num);
        metrics.records_seen = merged.count_seen();
        metrics.sample_size = merged.len();
        metrics.workers = match self.mode {
            ExecMode::Sequential => 1,
            ExecMode::Parallel { workers, .. } => workers.unwrap_or(self.default_workers).max(1),
        };
        let boundaries = merged
            .extract_boundaries(&interleaver)
            .context("failed to extract partition boundaries from the merged sample")?;
        let assignments = self.partition_rows_with(&boundaries, rows)?;
        for &p in &assignments {
            metrics.record_assignment(p);
        }
        Ok((assignments, metrics))
    }

    /// Run the collecting and merging phases, returning the merged sample.
    fn sample_rows(&self, rows: &[Vec<Value>]) -> Result<Reservoir> {
        match self.mode {
            ExecMode::Sequential => {
                let mut reservoir = self.worker_reservoir(0)?;
                for row in rows {
                    reservoir.insert(Value::Record(row.clone()))?;
                }
                Ok(reservoir)
            }
            ExecMode::Parallel { threads, workers } => {
                if let Some(t) = threads {
                    // ok() to ignore "already built" on repeated calls in tests
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(t)
                        .build_global()
                        .ok();
                }
                let workers = workers.unwrap_or(self.default_workers).max(1);
                let chunk_size = rows.len().div_ceil(workers).max(1);

                // Collecting: one single-writer reservoir per worker, then
                // flatten for transport out of the worker context.
                let flattened: Vec<FlattenedReservoir> = rows
                    .par_chunks(chunk_size)
                    .enumerate()
                    .map(|(w, chunk)| {
                        let mut reservoir = self.worker_reservoir(w)?;
                        for row in chunk {
                            reservoir.insert(Value::Record(row.clone()))?;
                        }
                        reservoir.flatten()
                    })
                    .collect::<Result<_>>()?;

                // Merging: fold the immutable blocks in one context.
                let mut merged: Option<Reservoir> = None;
                for block in &flattened {
                    let partial = block.unflatten()?;
                    match merged.as_mut() {
                        None => merged = Some(partial),
                        Some(acc) => acc.combine(partial)?,
                    }
                }
                match merged {
                    Some(r) => Ok(r),
                    None => self.worker_reservoir(0),
                }
            }
        }
    }
}
