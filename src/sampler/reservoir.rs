//! Fixed-capacity uniform sampling (Vitter's Algorithm R) and sample merging.

use crate::assign::BoundaryList;
use crate::interleave::{InterleavedKey, Interleaver};
use crate::utils::SplitMix64;
use crate::value::{ElementType, Value};
use anyhow::{Result, bail, ensure};

/// Per-partition sample multiplier: a reservoir keeps `SAMPLE_HINT` samples
/// per eventual partition so the derived boundaries are stable.
pub const SAMPLE_HINT: usize = 60;

/// Hard cap on reservoir capacity; larger requests are rejected at
/// construction rather than partially built.
pub const MAX_SAMPLE_SIZE: usize = 1_000_000;

/// A fixed-capacity uniform random sample of a value stream.
///
/// Capacity is `sample_hint * partition_num`, fixed at construction. While
/// fewer than `capacity` values have been seen, every value is kept; after
/// that, each new value replaces a uniformly chosen slot with probability
/// `capacity / count_seen`, so at any point every value seen so far is in
/// the sample with equal probability. The total stream length never needs
/// to be known ahead of time and no second pass is taken.
///
/// # Examples
///
/// ```
/// use zcluster::{ElementType, Reservoir, Value};
///
/// # fn main() -> anyhow::Result<()> {
/// let mut r = Reservoir::new(ElementType::Int64, 10, 2, 42)?;
/// for i in 0..1000 {
///     r.insert(Value::Int64(i))?;
/// }
/// assert_eq!(r.len(), 20); // capacity = 10 * 2
/// assert_eq!(r.count_seen(), 1000);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Reservoir {
    pub(crate) element_type: ElementType,
    pub(crate) capacity: usize,
    pub(crate) partition_num: usize,
    pub(crate) count_seen: u64,
    pub(crate) elements: Vec<Value>,
    rng: SplitMix64,
}

impl Reservoir {
    /// Create an empty reservoir sampling values of `element_type`.
    ///
    /// # Errors
    ///
    /// Rejects a zero `sample_hint` or `partition_num`, and any capacity
    /// exceeding [`MAX_SAMPLE_SIZE`].
    pub fn new(
        element_type: ElementType,
        sample_hint: usize,
        partition_num: usize,
        seed: u64,
    ) -> Result<Self> {
        ensure!(partition_num >= 1, "partition count must be at least 1");
        ensure!(sample_hint >= 1, "sample hint must be at least 1");
        let capacity = sample_hint
            .checked_mul(partition_num)
            .filter(|c| *c <= MAX_SAMPLE_SIZE)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "requested sample size {sample_hint} * {partition_num} exceeds the maximum of {MAX_SAMPLE_SIZE}"
                )
            })?;
        Ok(Self {
            element_type,
            capacity,
            partition_num,
            count_seen: 0,
            elements: Vec::new(),
            rng: SplitMix64::new(seed),
        })
    }

    pub(crate) fn from_parts(
        element_type: ElementType,
        capacity: usize,
        partition_num: usize,
        count_seen: u64,
        elements: Vec<Value>,
    ) -> Self {
        // Reseed deterministically; an unflattened reservoir only ever
        // participates in merges, never in further transition steps.
        let rng = SplitMix64::new(count_seen ^ (capacity as u64).rotate_left(32));
        Self {
            element_type,
            capacity,
            partition_num,
            count_seen,
            elements,
            rng,
        }
    }

    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn partition_num(&self) -> usize {
        self.partition_num
    }

    /// Total number of input values observed so far.
    #[must_use]
    pub const fn count_seen(&self) -> u64 {
        self.count_seen
    }

    /// Number of values currently held; `min(count_seen, capacity)` while
    /// streaming, possibly lower after a rate-matching merge.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The sampled values, in slot order (not insertion order once full).
    #[must_use]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    /// Transition step: observe one input value.
    ///
    /// # Errors
    ///
    /// A value of the wrong element type is a caller contract violation and
    /// fails immediately; the reservoir is left unchanged.
    pub fn insert(&mut self, value: Value) -> Result<()> {
        if value.element_type() != self.element_type {
            bail!(
                "reservoir samples {:?} values, got {:?}",
                self.element_type,
                value.element_type()
            );
        }
        self.count_seen += 1;
        if self.elements.len() < self.capacity {
            self.elements.push(value);
            return Ok(());
        }
        let j = self.rng.next_below(self.count_seen);
        if (j as usize) < self.capacity {
            self.elements[j as usize] = value;
        }
        Ok(())
    }

    /// Merge step: fold another reservoir's sample into this one.
    ///
    /// The result pools both samples: capacity becomes the sum of the two
    /// (clamped to [`MAX_SAMPLE_SIZE`]), `count_seen` the sum. When both
    /// inputs sampled their streams at the same inclusion rate — the normal
    /// case for equally-configured workers — the samples simply
    /// concatenate. When the rates differ, every element of the
    /// lower-rate (heavier-stream) sample is kept and each element of the
    /// higher-rate sample is admitted with probability `low_rate /
    /// high_rate`, thinning it to the same per-record inclusion
    /// probability; admissions past the clamped capacity displace a
    /// uniformly chosen slot, mirroring the online insertion rule at
    /// reservoir granularity. The result is therefore distributed like a
    /// single reservoir run over both input streams, and the operation is
    /// associative and commutative in distribution, so partial reservoirs
    /// may be folded pairwise or as a reduction tree.
    ///
    /// # Errors
    ///
    /// Element types and partition counts must match.
    pub fn combine(&mut self, other: Self) -> Result<()> {
        ensure!(
            self.element_type == other.element_type,
            "cannot combine reservoirs of {:?} and {:?} values",
            self.element_type,
            other.element_type
        );
        ensure!(
            self.partition_num == other.partition_num,
            "cannot combine reservoirs built for {} and {} partitions",
            self.partition_num,
            other.partition_num
        );

        let total = self.count_seen + other.count_seen;
        let capacity = (self.capacity + other.capacity).min(MAX_SAMPLE_SIZE);

        if other.elements.is_empty() {
            self.capacity = capacity;
            self.count_seen = total;
            return Ok(());
        }
        if self.elements.is_empty() {
            self.elements = other.elements;
            self.capacity = capacity;
            self.count_seen = total;
            return Ok(());
        }

        #[allow(clippy::cast_precision_loss)]
        let rate =
            |len: usize, seen: u64| -> f64 { len as f64 / seen as f64 };
        let self_rate = rate(self.elements.len(), self.count_seen);
        let other_rate = rate(other.elements.len(), other.count_seen);

        // Keep the lower-rate sample whole; thin the other down to it.
        let (mut base, donor, admit) = if self_rate <= other_rate {
            let base = std::mem::take(&mut self.elements);
            (base, other.elements, self_rate / other_rate)
        } else {
            (other.elements, std::mem::take(&mut self.elements), other_rate / self_rate)
        };

        let mut admitted = base.len() as u64;
        for v in donor {
            if self.rng.next_f64() < admit {
                admitted += 1;
                if base.len() < capacity {
                    base.push(v);
                } else {
                    let j = self.rng.next_below(admitted);
                    if (j as usize) < capacity {
                        base[j as usize] = v;
                    }
                }
            }
        }

        self.elements = base;
        self.capacity = capacity;
        self.count_seen = total;
        Ok(())
    }

    /// Final step: interleave every sampled element and extract the sorted
    /// equi-depth boundary keys for this reservoir's partition count.
    ///
    /// Elements of type [`ElementType::Record`] contribute their fields as
    /// coordinates; scalar elements are treated as one-dimensional.
    ///
    /// # Errors
    ///
    /// Fails on dimension mismatches, unsupported coordinate types, or an
    /// empty sample with more than one partition.
    pub fn extract_boundaries(&self, interleaver: &Interleaver) -> Result<BoundaryList> {
        let mut keys: Vec<InterleavedKey> = Vec::with_capacity(self.elements.len());
        for v in &self.elements {
            let key = match v {
                Value::Record(coords) => interleaver.interleave(coords)?,
                scalar => interleaver.interleave(std::slice::from_ref(scalar))?,
            };
            keys.push(key);
        }
        BoundaryList::from_keys(keys, self.partition_num)
    }
}
