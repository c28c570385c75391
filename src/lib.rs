//! # zcluster
//!
//! **Z-order clustering keys and partition assignment** for multi-dimensional
//! records, built on streaming reservoir sampling. zcluster computes a
//! single total-order key per record by bit-interleaving its coordinates
//! (the classic Morton/Z-order data-layout technique) and assigns records to
//! storage partitions using boundaries derived from a merged, uniform sample
//! of the data — so records near each other in *all* dimensions land in the
//! same or adjacent partitions, improving range-scan locality.
//!
//! ## Key Features
//!
//! - **Streaming reservoir sampling** - bounded, uniform samples from
//!   streams of unknown length (Vitter's Algorithm R), no second pass
//! - **Parallel merge** - per-worker partial samples combine into one sample
//!   with the same distributional guarantee, pairwise or as a tree
//! - **Relocatable sample transport** - reservoirs flatten into
//!   position-independent byte blocks that cross process boundaries as-is
//! - **Z-order keys** - per-type order-preserving mappings plus round-robin
//!   bit interleaving, pure and deterministic
//! - **Allocation-free assignment** - `O(log partition_num)` boundary search
//!   on the hot write path
//! - **Deterministic** - all randomness flows through a seeded `SplitMix64`
//!
//! ## Quick Start
//!
//! ```
//! use zcluster::{LayoutConfig, Value, ZOrderLayout};
//!
//! # fn main() -> anyhow::Result<()> {
//! // 2-D points, clustered into 4 partitions.
//! let rows: Vec<Vec<Value>> = (0..10_000)
//!     .map(|i| vec![Value::Int64(i % 997), Value::Int64((i * 31) % 983)])
//!     .collect();
//!
//! let layout = ZOrderLayout::sequential(LayoutConfig::new(4, 2));
//! let partitions = layout.partition_rows(&rows)?;
//! assert_eq!(partitions.len(), rows.len());
//! assert!(partitions.iter().all(|&p| p < 4));
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Reservoir
//!
//! A [`Reservoir`] holds a fixed-capacity uniform sample
//! (`sample_hint * partition_num` values) of everything a worker has seen.
//! `insert` is the transition step of the host aggregate protocol;
//! [`Reservoir::combine`] merges partial samples; `extract_boundaries`
//! finishes the aggregate into a [`BoundaryList`].
//!
//! ### Flattened transport
//!
//! Workers ship their samples as [`FlattenedReservoir`] blocks: one
//! contiguous byte buffer with a header, a slot array (inline values or
//! data-region offsets, never addresses), and a variable-width data region.
//! Blocks are immutable, relocatable, and validated defensively before any
//! offset is followed.
//!
//! ### Interleaving and assignment
//!
//! An [`Interleaver`] maps a coordinate tuple to an [`InterleavedKey`];
//! a [`BoundaryList`] maps keys to partition indices by binary search. Both
//! are pure and safe for any number of concurrent readers.
//!
//! ### Pipeline
//!
//! [`ZOrderLayout`] wires the phases together, sequentially or across rayon
//! workers: collect → flatten → merge → extract boundaries → assign. Once
//! boundaries are fixed for a write epoch there is no way back; a new epoch
//! starts a fresh run.
//!
//! ## Feature Flags
//!
//! - `metrics` *(default)* - run statistics with JSON export
//!
//! ## Module Overview
//!
//! - [`sampler`] - reservoir sampling, merge, and flattening
//! - [`interleave`] - Z-order key construction
//! - [`assign`] - boundary lists and partition assignment
//! - [`layout`] - end-to-end orchestration
//! - [`value`] - typed sample elements and key-domain mappings
//! - [`metrics`] - run statistics (feature-gated)

pub mod assign;
pub mod interleave;
pub mod layout;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod sampler;
pub mod utils;
pub mod value;

// General re-exports
pub use assign::BoundaryList;
pub use interleave::{InterleavedKey, Interleaver, MAX_DIMENSIONS};
pub use layout::{ExecMode, LayoutConfig, ZOrderLayout};
pub use sampler::{FlattenedReservoir, MAX_SAMPLE_SIZE, Reservoir, SAMPLE_HINT};
pub use value::{ElementType, Value};

// Gated re-exports
#[cfg(feature = "metrics")]
pub use metrics::LayoutMetrics;
