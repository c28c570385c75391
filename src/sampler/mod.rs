//! Streaming reservoir sampling with parallel merge and transport flattening.
//!
//! This module is the stateful half of the crate. A [`Reservoir`] is the
//! per-worker accumulator of the host's aggregate protocol:
//!
//! - `insert` is the transition step (one call per input record),
//! - `flatten` produces the position-independent block that crosses the
//!   worker/process boundary,
//! - `combine` merges partial reservoirs in the coordinating context,
//! - `extract_boundaries` is the final step, turning the merged sample into
//!   a sorted [`BoundaryList`](crate::BoundaryList).
//!
//! Reservoirs are strictly single-writer; only the immutable
//! [`FlattenedReservoir`] is ever shared across workers.

mod flatten;
mod reservoir;

pub use flatten::FlattenedReservoir;
pub use reservoir::{MAX_SAMPLE_SIZE, Reservoir, SAMPLE_HINT};
