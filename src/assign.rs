//! Quantile boundaries and partition assignment.

use crate::interleave::InterleavedKey;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Sorted quantile cut points mapping a key to a partition index.
///
/// A boundary list for `partition_num` partitions holds `partition_num - 1`
/// non-decreasing keys. Assignment picks the smallest index `i` with
/// `key <= boundaries[i]`, or the last partition when the key exceeds every
/// boundary, so ties on repeated boundary keys resolve to the first
/// matching partition and the order is total.
///
/// Immutable once built; safe to share across any number of concurrent
/// readers.
///
/// # Examples
///
/// ```
/// use zcluster::{BoundaryList, InterleavedKey};
///
/// # fn main() -> anyhow::Result<()> {
/// let k = InterleavedKey::from_raw;
/// let bounds = BoundaryList::from_boundaries(vec![k(10), k(20), k(30)])?;
/// assert_eq!(bounds.assign(k(5)), 0);
/// assert_eq!(bounds.assign(k(10)), 0);
/// assert_eq!(bounds.assign(k(15)), 1);
/// assert_eq!(bounds.assign(k(30)), 2);
/// assert_eq!(bounds.assign(k(99)), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryList {
    boundaries: Vec<InterleavedKey>,
}

impl BoundaryList {
    /// Derive equi-depth boundaries from a sample of keys.
    ///
    /// Sorts the keys and takes the `i * len / partition_num`-th key as the
    /// upper boundary of partition `i - 1`, for `i` in `1..partition_num`.
    ///
    /// # Errors
    ///
    /// Rejects a zero partition count, and an empty sample whenever more
    /// than one partition needs a cut point.
    pub fn from_keys(mut keys: Vec<InterleavedKey>, partition_num: usize) -> Result<Self> {
        ensure!(partition_num >= 1, "partition count must be at least 1");
        if partition_num == 1 {
            return Ok(Self {
                boundaries: Vec::new(),
            });
        }
        ensure!(
            !keys.is_empty(),
            "cannot derive {partition_num} partition boundaries from an empty sample"
        );
        keys.sort_unstable();
        let boundaries = (1..partition_num)
            .map(|i| keys[(i * keys.len() / partition_num).min(keys.len() - 1)])
            .collect();
        Ok(Self { boundaries })
    }

    /// Wrap an explicit, already-sorted boundary list.
    ///
    /// # Errors
    ///
    /// Fails if the keys are not non-decreasing.
    pub fn from_boundaries(boundaries: Vec<InterleavedKey>) -> Result<Self> {
        ensure!(
            boundaries.windows(2).all(|w| w[0] <= w[1]),
            "boundary keys must be non-decreasing"
        );
        Ok(Self { boundaries })
    }

    /// Number of partitions this list assigns into.
    #[must_use]
    pub fn partition_num(&self) -> usize {
        self.boundaries.len() + 1
    }

    #[must_use]
    pub fn as_slice(&self) -> &[InterleavedKey] {
        &self.boundaries
    }

    /// Map a key to its partition index in `[0, partition_num - 1]`.
    ///
    /// Binary search, `O(log partition_num)`, allocation-free: this is the
    /// hot path, called once per record at write time.
    #[inline]
    #[must_use]
    pub fn assign(&self, key: InterleavedKey) -> usize {
        self.boundaries.partition_point(|b| *b < key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(raw: u64) -> InterleavedKey {
        InterleavedKey::from_raw(raw)
    }

    #[test]
    fn equi_depth_cuts_from_sample() -> Result<()> {
        let keys: Vec<_> = (0..100).map(k).collect();
        let bounds = BoundaryList::from_keys(keys, 4)?;
        assert_eq!(bounds.as_slice(), &[k(25), k(50), k(75)]);
        assert_eq!(bounds.partition_num(), 4);
        Ok(())
    }

    #[test]
    fn repeated_boundaries_still_assign_totally() -> Result<()> {
        let bounds = BoundaryList::from_boundaries(vec![k(10), k(10), k(20)])?;
        assert_eq!(bounds.assign(k(10)), 0);
        assert_eq!(bounds.assign(k(11)), 2);
        assert_eq!(bounds.assign(k(21)), 3);
        Ok(())
    }

    #[test]
    fn single_partition_needs_no_sample() -> Result<()> {
        let bounds = BoundaryList::from_keys(Vec::new(), 1)?;
        assert_eq!(bounds.partition_num(), 1);
        assert_eq!(bounds.assign(k(u64::MAX)), 0);
        Ok(())
    }

    #[test]
    fn empty_sample_with_partitions_is_an_error() {
        assert!(BoundaryList::from_keys(Vec::new(), 2).is_err());
        assert!(BoundaryList::from_keys(vec![k(1)], 0).is_err());
        assert!(BoundaryList::from_boundaries(vec![k(2), k(1)]).is_err());
    }
}
