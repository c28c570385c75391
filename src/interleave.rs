//! Z-order (Morton) bit interleaving.
//!
//! An [`Interleaver`] turns an N-dimensional coordinate tuple into a single
//! [`InterleavedKey`] whose total order preserves multi-dimensional
//! locality: for each bit position from the most significant downward, one
//! bit is taken from every dimension in a fixed round-robin order. Records
//! that are near each other in all dimensions simultaneously end up with
//! nearby keys.
//!
//! Coordinates are first mapped into the unsigned 64-bit key domain by
//! [`Value::ordered_bits`]; only the top `64 / dims` bits of each mapped
//! coordinate contribute to the key. That truncation is the deliberate
//! lossy-bucketing policy: equal keys mean equal leading-bit buckets, not
//! necessarily equal raw coordinates.

use crate::value::Value;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Most dimensions an interleaver supports; at 8 dimensions each one still
/// gets an 8-bit budget inside the 64-bit key.
pub const MAX_DIMENSIONS: usize = 8;

/// A fixed-width Z-order sort key.
///
/// Keys compare as plain unsigned integers; the interleaved bit pattern is
/// what gives that order its locality-preserving property.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InterleavedKey(u64);

impl InterleavedKey {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InterleavedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Pure, deterministic Z-order key builder for a fixed dimension count.
///
/// # Examples
///
/// ```
/// use zcluster::{Interleaver, Value};
///
/// # fn main() -> anyhow::Result<()> {
/// let z = Interleaver::new(2)?;
/// let near = z.interleave(&[Value::UInt64(10), Value::UInt64(10)])?;
/// let far = z.interleave(&[Value::UInt64(u64::MAX), Value::UInt64(u64::MAX)])?;
/// assert!(near < far);
/// // Identical input, identical key.
/// assert_eq!(near, z.interleave(&[Value::UInt64(10), Value::UInt64(10)])?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interleaver {
    dims: usize,
    per_dim_bits: u32,
}

impl Interleaver {
    /// Create an interleaver for `dims` dimensions. The per-dimension bit
    /// budget is `64 / dims`.
    ///
    /// # Errors
    ///
    /// Rejects zero dimensions and more than [`MAX_DIMENSIONS`].
    pub fn new(dims: usize) -> Result<Self> {
        ensure!(
            (1..=MAX_DIMENSIONS).contains(&dims),
            "dimension count {dims} outside supported range 1..={MAX_DIMENSIONS}"
        );
        Ok(Self {
            dims,
            per_dim_bits: (64 / dims) as u32,
        })
    }

    #[must_use]
    pub const fn dims(&self) -> usize {
        self.dims
    }

    /// Bits of each mapped coordinate that contribute to the key.
    #[must_use]
    pub const fn per_dim_bits(&self) -> u32 {
        self.per_dim_bits
    }

    /// Build the Z-order key for one coordinate tuple.
    ///
    /// For bit `b` from the most significant downward, emits bit `b` of
    /// every dimension's mapped value in dimension order. The key occupies
    /// the low `dims * per_dim_bits` bits of the result.
    ///
    /// # Errors
    ///
    /// Fails if the tuple length does not match the dimension count or a
    /// coordinate cannot be mapped (non-finite float, nested record).
    pub fn interleave(&self, coords: &[Value]) -> Result<InterleavedKey> {
        ensure!(
            coords.len() == self.dims,
            "expected {} coordinates, got {}",
            self.dims,
            coords.len()
        );
        let mut mapped = [0u64; MAX_DIMENSIONS];
        for (d, coord) in coords.iter().enumerate() {
            mapped[d] = coord.ordered_bits()?;
        }

        let mut key = 0u64;
        for bit in 0..self.per_dim_bits {
            for m in &mapped[..self.dims] {
                key = (key << 1) | ((m >> (63 - bit)) & 1);
            }
        }
        Ok(InterleavedKey(key))
    }
}
