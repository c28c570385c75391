//! Typed sample elements.
//!
//! A [`Reservoir`](crate::Reservoir) samples values of one declared
//! [`ElementType`]. The type carries the metadata the flattened wire form
//! needs (fixed vs. variable width, pass-by-value vs. pass-by-reference) and
//! each [`Value`] knows its monotonic mapping into the unsigned key domain
//! used by the bit interleaver.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Logical type of a sampled column.
///
/// Fixed-width types (`Int32`, `Int64`, `UInt64`, `Float64`) are passed by
/// value and stored inline in a flattened slot. Variable-width types
/// (`Bytes`, `Text`, `Record`) are passed by reference and serialized into
/// the flattened data region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Int32,
    Int64,
    UInt64,
    Float64,
    Bytes,
    Text,
    /// A coordinate tuple of scalar values; what the end-to-end layout
    /// samples so interleaving can happen after the merge step.
    Record,
}

impl ElementType {
    /// Byte width of the type, or `-1` for variable-width types.
    #[must_use]
    pub const fn width(self) -> i16 {
        match self {
            Self::Int32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
            Self::Bytes | Self::Text | Self::Record => -1,
        }
    }

    /// Whether values of this type fit inline in a flattened slot.
    #[must_use]
    pub const fn is_by_value(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::UInt64 | Self::Float64)
    }

    /// Stable wire tag for the flattened header.
    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Int32 => 0,
            Self::Int64 => 1,
            Self::UInt64 => 2,
            Self::Float64 => 3,
            Self::Bytes => 4,
            Self::Text => 5,
            Self::Record => 6,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => Self::Int32,
            1 => Self::Int64,
            2 => Self::UInt64,
            3 => Self::Float64,
            4 => Self::Bytes,
            5 => Self::Text,
            6 => Self::Record,
            other => bail!("unknown element type tag {other}"),
        })
    }
}

/// A single sampled value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Bytes(Vec<u8>),
    Text(String),
    Record(Vec<Value>),
}

impl Value {
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Int32(_) => ElementType::Int32,
            Self::Int64(_) => ElementType::Int64,
            Self::UInt64(_) => ElementType::UInt64,
            Self::Float64(_) => ElementType::Float64,
            Self::Bytes(_) => ElementType::Bytes,
            Self::Text(_) => ElementType::Text,
            Self::Record(_) => ElementType::Record,
        }
    }

    /// Canonical 64-bit slot pattern for pass-by-value types.
    pub(crate) fn slot_bits(&self) -> Result<u64> {
        Ok(match self {
            Self::Int32(v) => u64::from(*v as u32),
            Self::Int64(v) => *v as u64,
            Self::UInt64(v) => *v,
            Self::Float64(v) => v.to_bits(),
            other => bail!(
                "{:?} is pass-by-reference and has no inline slot form",
                other.element_type()
            ),
        })
    }

    /// Inverse of [`slot_bits`](Self::slot_bits).
    pub(crate) fn from_slot_bits(element_type: ElementType, bits: u64) -> Result<Self> {
        Ok(match element_type {
            ElementType::Int32 => Self::Int32(bits as u32 as i32),
            ElementType::Int64 => Self::Int64(bits as i64),
            ElementType::UInt64 => Self::UInt64(bits),
            ElementType::Float64 => Self::Float64(f64::from_bits(bits)),
            other => bail!("{other:?} is pass-by-reference and has no inline slot form"),
        })
    }

    /// Order-preserving mapping into the unsigned 64-bit key domain.
    ///
    /// The interleaver consumes the *top* bits of the mapped value, so every
    /// mapping normalizes its input to the full `u64` range:
    ///
    /// - `Int32`: sign bit flipped, shifted into the top 32 bits.
    /// - `Int64`: sign bit flipped.
    /// - `UInt64`: identity.
    /// - `Float64`: IEEE-754 total-order repack (negative values are fully
    ///   inverted, positives get the sign bit set). Non-finite values are a
    ///   configuration error.
    /// - `Bytes` / `Text`: leading 8 bytes, big-endian, zero-padded.
    ///
    /// `Record` values carry multiple coordinates and cannot be mapped as a
    /// single dimension.
    ///
    /// # Errors
    ///
    /// Returns an error for non-finite floats and for `Record` values.
    pub fn ordered_bits(&self) -> Result<u64> {
        Ok(match self {
            Self::Int32(v) => u64::from((*v as u32) ^ (1 << 31)) << 32,
            Self::Int64(v) => (*v as u64) ^ (1 << 63),
            Self::UInt64(v) => *v,
            Self::Float64(v) => {
                if !v.is_finite() {
                    bail!("non-finite coordinate {v} cannot be interleaved");
                }
                let bits = v.to_bits();
                if bits >> 63 == 1 { !bits } else { bits | (1 << 63) }
            }
            Self::Bytes(b) => leading_be_bits(b),
            Self::Text(s) => leading_be_bits(s.as_bytes()),
            Self::Record(_) => {
                bail!("record values carry multiple coordinates; interleave their fields")
            }
        })
    }
}

fn leading_be_bits(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_be_bytes(buf)
}
