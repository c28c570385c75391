//! Position-independent encoding of a reservoir for transport.
//!
//! A [`FlattenedReservoir`] is one contiguous, relocatable byte block:
//! copying it to any address (or across a process boundary) and re-reading
//! the header reproduces the exact logical reservoir. The layout is
//! little-endian throughout:
//!
//! ```text
//! offset  field          type
//! 0       total_len      u32   total block size in bytes
//! 4       data_len       u32   number of element slots
//! 8       sample_size    u32   reservoir capacity
//! 12      partition_num  u32
//! 16      input_size     u64   count_seen progress counter
//! 24      element_type   u8
//! 25      elem_width     i16   fixed byte width, -1 for variable
//! 27      by_value       u8
//! 28      flattened      u8    tag bit, always 1
//! 29..32  padding
//! 32      slots          u64 * data_len
//! ...     data region    postcard-encoded variable-width values
//! ```
//!
//! Pass-by-value slots hold the value's canonical 64-bit pattern inline;
//! pass-by-reference slots hold a byte offset from the start of the data
//! region — never an address, which is what makes the block safe to
//! relocate. Slot interpretation is made explicit through [`Slot`] instead
//! of reinterpreting raw integers.

use crate::sampler::reservoir::{MAX_SAMPLE_SIZE, Reservoir};
use crate::value::{ElementType, Value};
use anyhow::{Context, Result, bail, ensure};

const HEADER_LEN: usize = 32;
const SLOT_LEN: usize = 8;

const OFF_TOTAL_LEN: usize = 0;
const OFF_DATA_LEN: usize = 4;
const OFF_SAMPLE_SIZE: usize = 8;
const OFF_PARTITION_NUM: usize = 12;
const OFF_INPUT_SIZE: usize = 16;
const OFF_ELEMENT_TYPE: usize = 24;
const OFF_ELEM_WIDTH: usize = 25;
const OFF_BY_VALUE: usize = 27;
const OFF_FLATTENED: usize = 28;

/// A decoded element slot: either the value bits inline (pass-by-value
/// types) or a byte offset into the trailing data region (pass-by-reference
/// types).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Inline(u64),
    Offset(u64),
}

/// An immutable, relocatable byte encoding of a [`Reservoir`].
///
/// Produced once per worker by [`Reservoir::flatten`]; read-only
/// thereafter. Consumers resolve elements through [`element`]
/// (flattened, offset form) or unflatten back to the in-memory form with
/// [`unflatten`].
///
/// [`element`]: FlattenedReservoir::element
/// [`unflatten`]: FlattenedReservoir::unflatten
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlattenedReservoir {
    bytes: Vec<u8>,
}

impl Reservoir {
    /// Flatten this reservoir into a relocatable byte block.
    ///
    /// Fixed-width values are copied inline into their slot; variable-width
    /// values are serialized into the trailing data region with the slot
    /// holding the offset of their encoding. Append-only construction; the
    /// result is never mutated.
    ///
    /// # Errors
    ///
    /// Fails if the block would exceed the addressable `u32` size field or
    /// if a variable-width value cannot be serialized.
    pub fn flatten(self) -> Result<FlattenedReservoir> {
        let element_type = self.element_type();
        let by_value = element_type.is_by_value();
        let slot_count = self.elements.len();

        let mut slots: Vec<u64> = Vec::with_capacity(slot_count);
        let mut region: Vec<u8> = Vec::new();
        for v in &self.elements {
            if by_value {
                slots.push(v.slot_bits()?);
            } else {
                let offset = region.len() as u64;
                let encoded = postcard::to_allocvec(v)
                    .context("failed to serialize variable-width sample value")?;
                region.extend_from_slice(&encoded);
                slots.push(offset);
            }
        }

        let total = HEADER_LEN + slot_count * SLOT_LEN + region.len();
        ensure!(
            u32::try_from(total).is_ok(),
            "flattened reservoir of {total} bytes exceeds the addressable size"
        );

        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(&(total as u32).to_le_bytes());
        bytes.extend_from_slice(&(slot_count as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.capacity as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.partition_num as u32).to_le_bytes());
        bytes.extend_from_slice(&self.count_seen.to_le_bytes());
        bytes.push(element_type.tag());
        bytes.extend_from_slice(&element_type.width().to_le_bytes());
        bytes.push(u8::from(by_value));
        bytes.push(1); // flattened tag
        bytes.extend_from_slice(&[0u8; 3]);
        for slot in slots {
            bytes.extend_from_slice(&slot.to_le_bytes());
        }
        bytes.extend_from_slice(&region);

        Ok(FlattenedReservoir { bytes })
    }
}

impl FlattenedReservoir {
    /// Ingest a block received from another worker or process.
    ///
    /// All header fields, the flattened tag, the declared vs. actual length,
    /// and every slot offset are validated *before* any offset is followed;
    /// a corrupt block is rejected outright, never truncated or wrapped.
    ///
    /// # Errors
    ///
    /// Fails on any header/length/offset inconsistency.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        validate(&bytes)?;
        Ok(Self { bytes })
    }

    /// The raw block, suitable for transport as-is.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of element slots.
    #[must_use]
    pub fn element_count(&self) -> usize {
        read_u32(&self.bytes, OFF_DATA_LEN) as usize
    }

    /// Target sample size (the reservoir's capacity).
    #[must_use]
    pub fn sample_size(&self) -> usize {
        read_u32(&self.bytes, OFF_SAMPLE_SIZE) as usize
    }

    #[must_use]
    pub fn partition_num(&self) -> usize {
        read_u32(&self.bytes, OFF_PARTITION_NUM) as usize
    }

    /// Progress counter: total input values the reservoir had observed.
    #[must_use]
    pub fn input_size(&self) -> u64 {
        read_u64(&self.bytes, OFF_INPUT_SIZE)
    }

    /// # Errors
    ///
    /// Fails if the header carries an unknown element type tag.
    pub fn element_type(&self) -> Result<ElementType> {
        ElementType::from_tag(self.bytes[OFF_ELEMENT_TYPE])
    }

    /// Resolve element `i`, decoding an inline slot or following its data
    /// region offset as dictated by the header's pass-by-value flag.
    ///
    /// # Errors
    ///
    /// Fails on an out-of-range index or an undecodable data region entry.
    pub fn element(&self, i: usize) -> Result<Value> {
        let element_type = self.element_type()?;
        match self.slot(i)? {
            Slot::Inline(bits) => Value::from_slot_bits(element_type, bits),
            Slot::Offset(offset) => {
                let region = self.data_region();
                // validate() checked every offset, but resolve defensively.
                ensure!(
                    (offset as usize) < region.len(),
                    "slot {i} offset {offset} points outside the data region"
                );
                let (value, _rest) = postcard::take_from_bytes::<Value>(&region[offset as usize..])
                    .with_context(|| format!("failed to decode sample value at slot {i}"))?;
                ensure!(
                    value.element_type() == element_type,
                    "slot {i} decoded as {:?}, header declares {element_type:?}",
                    value.element_type()
                );
                Ok(value)
            }
        }
    }

    /// Rebuild the in-memory reservoir. Lossless on logical content: same
    /// progress counter, capacity, partition count, and element multiset.
    ///
    /// # Errors
    ///
    /// Fails if any element cannot be resolved.
    pub fn unflatten(&self) -> Result<Reservoir> {
        let element_type = self.element_type()?;
        let count = self.element_count();
        let mut elements = Vec::with_capacity(count);
        for i in 0..count {
            elements.push(self.element(i)?);
        }
        Ok(Reservoir::from_parts(
            element_type,
            self.sample_size(),
            self.partition_num(),
            self.input_size(),
            elements,
        ))
    }

    fn slot(&self, i: usize) -> Result<Slot> {
        let count = self.element_count();
        ensure!(i < count, "slot index {i} out of range ({count} elements)");
        let raw = read_u64(&self.bytes, HEADER_LEN + i * SLOT_LEN);
        Ok(if self.bytes[OFF_BY_VALUE] == 1 {
            Slot::Inline(raw)
        } else {
            Slot::Offset(raw)
        })
    }

    fn data_region(&self) -> &[u8] {
        &self.bytes[HEADER_LEN + self.element_count() * SLOT_LEN..]
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

fn read_i16(bytes: &[u8], offset: usize) -> i16 {
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[offset..offset + 2]);
    i16::from_le_bytes(buf)
}

fn validate(bytes: &[u8]) -> Result<()> {
    ensure!(
        bytes.len() >= HEADER_LEN,
        "flattened reservoir of {} bytes is shorter than the {HEADER_LEN}-byte header",
        bytes.len()
    );

    let total_len = read_u32(bytes, OFF_TOTAL_LEN) as usize;
    ensure!(
        total_len == bytes.len(),
        "flattened reservoir declares {total_len} bytes but holds {}",
        bytes.len()
    );

    ensure!(
        bytes[OFF_FLATTENED] == 1,
        "block is not marked as flattened (tag byte {})",
        bytes[OFF_FLATTENED]
    );

    let element_type = ElementType::from_tag(bytes[OFF_ELEMENT_TYPE])
        .context("flattened reservoir header is corrupt")?;
    let elem_width = read_i16(bytes, OFF_ELEM_WIDTH);
    ensure!(
        elem_width == element_type.width(),
        "header width {elem_width} does not match {element_type:?} (expected {})",
        element_type.width()
    );
    let by_value = bytes[OFF_BY_VALUE];
    ensure!(by_value <= 1, "by-value flag has non-boolean value {by_value}");
    ensure!(
        (by_value == 1) == element_type.is_by_value(),
        "by-value flag disagrees with element type {element_type:?}"
    );

    let data_len = read_u32(bytes, OFF_DATA_LEN) as usize;
    let sample_size = read_u32(bytes, OFF_SAMPLE_SIZE) as usize;
    let partition_num = read_u32(bytes, OFF_PARTITION_NUM) as usize;
    let input_size = read_u64(bytes, OFF_INPUT_SIZE);
    ensure!(partition_num >= 1, "header declares zero partitions");
    ensure!(
        sample_size <= MAX_SAMPLE_SIZE,
        "header sample size {sample_size} exceeds the maximum of {MAX_SAMPLE_SIZE}"
    );
    ensure!(
        data_len <= sample_size && data_len as u64 <= input_size,
        "header holds {data_len} elements, inconsistent with {input_size} seen at capacity {sample_size}"
    );

    let slots_end = HEADER_LEN
        .checked_add(data_len.checked_mul(SLOT_LEN).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);
    ensure!(
        slots_end <= total_len,
        "slot array for {data_len} elements does not fit in {total_len} bytes"
    );

    if !element_type.is_by_value() {
        let region_len = (total_len - slots_end) as u64;
        for i in 0..data_len {
            let offset = read_u64(bytes, HEADER_LEN + i * SLOT_LEN);
            ensure!(
                offset < region_len,
                "slot {i} offset {offset} points outside the {region_len}-byte data region"
            );
        }
    }

    Ok(())
}
