//! HyperLogLog: cardinality estimation over packed registers
//!
//! HyperLogLog (Flajolet et al. 2007) estimates the number of distinct
//! elements in a stream with relative error ~1.04/sqrt(m) using m = 2^p
//! six-bit registers. This implementation uses the improved estimator of
//! Ertl (arXiv:1702.01284), which replaces the classical small- and
//! large-range corrections with the σ/τ series over a register-value
//! histogram that is maintained incrementally, so estimation never scans
//! the register array.
//!
//! # Algorithm Overview
//!
//! 1. Hash each input to a uniform 64-bit value
//! 2. Use the top p bits to select one of 2^p registers
//! 3. Count leading zeros of the remaining bits + 1, keep the max per register
//! 4. Estimate cardinality from the histogram of register values
//!
//! # Representations
//!
//! A sketch can start out sparse: non-zero registers live in a sorted list
//! with an insert buffer until the list crosses its size limit, at which
//! point the sketch promotes itself to the packed dense array. Promotion
//! happens at most once and never reverses. Dense and sparse sketches fed
//! the same inputs hold identical registers and produce identical
//! estimates.
//!
//! # Hashing
//!
//! The byte-oriented [`HyperLogLog::add`] path hashes with MurmurHash64A
//! and a per-sketch seed (default 314); serialized sketches built through
//! it are interoperable with other implementations of the same wire
//! format. The generic [`HyperLogLog::update`] convenience path hashes any
//! `Hash` item with XXHash64 instead.
//!
//! # Examples
//!
//! ```
//! use hll_oxide::cardinality::HyperLogLog;
//!
//! let mut hll = HyperLogLog::new(12).unwrap();
//! for i in 0u32..10_000 {
//!     hll.add(&i.to_le_bytes());
//! }
//! let estimate = hll.cardinality();
//! assert!((estimate - 10_000.0).abs() / 10_000.0 < 0.05);
//! ```

use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use super::dense::DenseRegisters;
use super::estimator;
use super::histogram::{RegisterHistogram, HISTOGRAM_BINS};
use super::sparse::SparseRegisters;
use crate::common::hash::murmur2_hash64;
use crate::common::{validation, Mergeable, Result, Sketch, SketchError};

/// Default MurmurHash64A seed, shared by every implementation of the wire
/// format
pub const DEFAULT_SEED: u64 = 314;

/// Snapshot format version; bump on any change to the layout or the wire
/// hash
const SNAPSHOT_VERSION: u64 = 2;

/// Header words: flags, added, list size, cache flag, cache value, node
/// cache index, seed, then the 65 histogram bins
const SNAPSHOT_HEADER_WORDS: usize = 7 + HISTOGRAM_BINS;

/// Node-cache slot value meaning "no cached node"
const NODE_CACHE_NONE: u64 = u64::MAX;

/// Active register storage; transitions sparse → dense at most once
#[derive(Clone, Debug)]
enum Representation {
    Sparse(SparseRegisters),
    Dense(DenseRegisters),
}

/// HyperLogLog sketch for cardinality estimation
///
/// Uses 2^p six-bit registers to estimate the number of unique items.
/// Higher precision means more accuracy but more memory.
///
/// # Examples
///
/// ```
/// use hll_oxide::cardinality::HyperLogLog;
///
/// let mut hll = HyperLogLog::new(14).unwrap();
/// hll.add(b"user_123");
/// hll.add(b"user_456");
/// hll.add(b"user_123"); // Duplicate
///
/// assert_eq!(hll.count(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct HyperLogLog {
    /// Precision parameter; m = 2^p registers
    precision: u8,
    /// MurmurHash64A seed for the byte-oriented add path
    seed: u64,
    registers: Representation,
    histogram: RegisterHistogram,
    /// Cached estimate, cleared by any register change
    cache: Option<f64>,
    /// Total add calls, informational
    added: u64,
}

impl HyperLogLog {
    /// Minimum precision value
    pub const MIN_PRECISION: u8 = validation::MIN_PRECISION;

    /// Maximum precision value
    pub const MAX_PRECISION: u8 = validation::MAX_PRECISION;

    /// Creates a new dense HyperLogLog sketch with the default seed
    ///
    /// # Arguments
    ///
    /// * `precision` - Precision parameter (2-63), higher = more accurate
    ///   but more memory; 4-18 is the practical range
    ///   - precision 10: 1024 registers, ~0.8 KB, ~3.25% error
    ///   - precision 12: 4096 registers, ~3 KB, ~1.6% error (recommended)
    ///   - precision 14: 16384 registers, ~12 KB, ~0.8% error
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if precision is outside [2, 63], or
    /// `AllocationFailure` if the register array cannot be allocated
    ///
    /// # Examples
    ///
    /// ```
    /// use hll_oxide::cardinality::HyperLogLog;
    ///
    /// let hll = HyperLogLog::new(12).unwrap();
    /// assert!(hll.is_empty());
    /// ```
    pub fn new(precision: u8) -> Result<Self> {
        Self::with_seed(precision, DEFAULT_SEED)
    }

    /// Creates a new dense sketch with an explicit hash seed
    ///
    /// Sketches can only be meaningfully merged or compared when they share
    /// a seed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if precision is outside [2, 63], or
    /// `AllocationFailure` if the register array cannot be allocated
    pub fn with_seed(precision: u8, seed: u64) -> Result<Self> {
        validation::validate_precision(precision)?;
        let m = 1u64 << precision;
        Ok(HyperLogLog {
            precision,
            seed,
            registers: Representation::Dense(DenseRegisters::new(m)?),
            histogram: RegisterHistogram::new(m),
            cache: None,
            added: 0,
        })
    }

    /// Creates a sketch that starts in the sparse representation with
    /// automatic thresholds
    ///
    /// The sparse list promotes itself to the dense array once it holds
    /// about m/16 registers, near the point where list nodes outweigh the
    /// packed array.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if precision is outside [2, 63]
    pub fn new_sparse(precision: u8) -> Result<Self> {
        validation::validate_precision(precision)?;
        let m = 1u64 << precision;
        Self::sparse_with_limits(
            precision,
            DEFAULT_SEED,
            default_list_limit(m),
            default_buffer_limit(m),
        )
    }

    /// Creates a sparse sketch with explicit seed and thresholds
    ///
    /// `max_list_size` bounds the sorted list before promotion to dense;
    /// `max_buffer_size` bounds the insert buffer between flushes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if precision is outside [2, 63] or a
    /// threshold is zero
    pub fn sparse_with_limits(
        precision: u8,
        seed: u64,
        max_list_size: usize,
        max_buffer_size: usize,
    ) -> Result<Self> {
        validation::validate_precision(precision)?;
        if max_list_size == 0 {
            return Err(SketchError::InvalidParameter {
                param: "max_list_size".to_string(),
                value: max_list_size.to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }
        if max_buffer_size == 0 {
            return Err(SketchError::InvalidParameter {
                param: "max_buffer_size".to_string(),
                value: max_buffer_size.to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }
        let m = 1u64 << precision;
        Ok(HyperLogLog {
            precision,
            seed,
            registers: Representation::Sparse(SparseRegisters::new(
                m,
                max_list_size,
                max_buffer_size,
            )),
            histogram: RegisterHistogram::new(m),
            cache: None,
            added: 0,
        })
    }

    /// Returns the precision parameter
    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Returns the number of registers (m = 2^precision)
    #[inline]
    pub fn num_registers(&self) -> u64 {
        1u64 << self.precision
    }

    /// Returns the MurmurHash64A seed
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the total number of add calls so far
    #[inline]
    pub fn added(&self) -> u64 {
        self.added
    }

    /// Whether the sketch is still in the sparse representation
    #[inline]
    pub fn is_sparse(&self) -> bool {
        matches!(self.registers, Representation::Sparse(_))
    }

    /// Returns the standard error of the estimate
    ///
    /// Approximately 1.04 / sqrt(m) where m is the number of registers.
    ///
    /// # Examples
    ///
    /// ```
    /// use hll_oxide::cardinality::HyperLogLog;
    ///
    /// let hll = HyperLogLog::new(12).unwrap();
    /// assert!((hll.standard_error() - 0.0163).abs() < 0.001);
    /// ```
    pub fn standard_error(&self) -> f64 {
        1.04 / (self.num_registers() as f64).sqrt()
    }

    /// Check if no register has been touched yet
    pub fn is_empty(&self) -> bool {
        match &self.registers {
            Representation::Sparse(sparse) => sparse.list_len() == 0 && !sparse.has_pending(),
            Representation::Dense(_) => self.histogram.count(0) == self.num_registers(),
        }
    }

    /// Hash a byte sequence with MurmurHash64A and the sketch seed
    ///
    /// This is the exact value `add` routes through, exposed so callers
    /// can pre-hash or shard inputs themselves.
    pub fn hash(&self, data: &[u8]) -> u64 {
        murmur2_hash64(data, self.seed)
    }

    /// Adds a byte sequence to the sketch
    ///
    /// Returns `true` if the observation may have changed a register. A
    /// dense sketch answers exactly; a sparse sketch buffers the update
    /// and answers `true` because the outcome is only known at the next
    /// flush.
    ///
    /// # Examples
    ///
    /// ```
    /// use hll_oxide::cardinality::HyperLogLog;
    ///
    /// let mut hll = HyperLogLog::new(12).unwrap();
    /// assert!(hll.add(b"first"));
    /// hll.add(b"first");
    /// assert_eq!(hll.count(), 1);
    /// ```
    pub fn add(&mut self, data: &[u8]) -> bool {
        let hash = murmur2_hash64(data, self.seed);
        self.update_hash(hash)
    }

    /// Updates the sketch with any hashable item
    ///
    /// Convenience path for pure-Rust use; items are hashed with XXHash64
    /// seeded by the sketch seed. Sketches that must interoperate with
    /// other implementations through the wire format should use
    /// [`HyperLogLog::add`] instead.
    pub fn update<T: Hash>(&mut self, item: &T) -> bool {
        let mut hasher = XxHash64::with_seed(self.seed);
        item.hash(&mut hasher);
        self.update_hash(hasher.finish())
    }

    /// Updates the sketch with a pre-computed 64-bit hash value
    ///
    /// The top p bits select the register; the leading-zero count of the
    /// remaining bits (+1) is the candidate rank. An all-zero tail maps to
    /// the maximum rank 64 - p + 1.
    pub fn update_hash(&mut self, hash: u64) -> bool {
        self.added += 1;

        let index = hash >> (64 - self.precision);
        let tail = hash << self.precision;
        let rank = if tail == 0 {
            65 - self.precision
        } else {
            (tail.leading_zeros() + 1) as u8
        };

        let changed = match &mut self.registers {
            Representation::Sparse(sparse) => {
                sparse.add(index, rank, &mut self.histogram);
                true
            }
            Representation::Dense(dense) => {
                let slot = index as usize;
                let old = dense.get(slot);
                if rank > old {
                    dense.set(slot, rank);
                    self.histogram.transition(old, rank);
                    true
                } else {
                    false
                }
            }
        };

        if changed {
            self.cache = None;
        }
        self.promote_if_full();
        changed
    }

    /// Estimates the cardinality
    ///
    /// Evaluates the Ertl estimator over the register histogram, flushing
    /// the sparse buffer first if needed. The result is cached until the
    /// next register change, merge, or deserialization.
    ///
    /// # Examples
    ///
    /// ```
    /// use hll_oxide::cardinality::HyperLogLog;
    ///
    /// let mut hll = HyperLogLog::new(12).unwrap();
    /// for i in 0u32..1000 {
    ///     hll.add(&i.to_le_bytes());
    /// }
    /// let estimate = hll.cardinality();
    /// assert!((estimate - 1000.0).abs() < 50.0);
    /// ```
    pub fn cardinality(&mut self) -> f64 {
        if let Some(value) = self.cache {
            return value;
        }
        if let Representation::Sparse(sparse) = &mut self.registers {
            sparse.flush(&mut self.histogram);
        }
        let estimate = estimator::estimate(&self.histogram, self.precision);
        self.cache = Some(estimate);
        estimate
    }

    /// Estimated cardinality rounded to the nearest integer
    pub fn count(&mut self) -> u64 {
        self.cardinality().round() as u64
    }

    /// Current value of the register at `index`
    ///
    /// Takes `&mut self`: a sparse sketch flushes its insert buffer before
    /// the lookup and moves its node cache, which makes ascending scans
    /// over all registers cheap.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= num_registers()`
    pub fn register(&mut self, index: u64) -> Result<u8> {
        if index >= self.num_registers() {
            return Err(SketchError::IndexOutOfRange {
                index,
                size: self.num_registers(),
            });
        }
        match &mut self.registers {
            Representation::Sparse(sparse) => Ok(sparse.get(index, &mut self.histogram)),
            Representation::Dense(dense) => Ok(dense.get(index as usize)),
        }
    }

    /// The register-value histogram: entry v counts registers holding
    /// exactly v
    ///
    /// Exact at all times; buffered sparse updates are folded into the
    /// returned array without mutating the sketch.
    pub fn histogram(&self) -> [u64; HISTOGRAM_BINS] {
        match &self.registers {
            Representation::Sparse(sparse) if sparse.has_pending() => {
                let entries = sparse.entries();
                let mut counts = [0u64; HISTOGRAM_BINS];
                counts[0] = self.num_registers() - entries.len() as u64;
                for &(_, rank) in &entries {
                    counts[rank as usize] += 1;
                }
                counts
            }
            _ => *self.histogram.counts(),
        }
    }

    /// Merges another sketch into this one
    ///
    /// Takes the per-register maximum. Both sketches must have the same
    /// number of registers; they should also share a seed for the union to
    /// be meaningful. The other sketch is read through its own
    /// representation and is not modified, even when it has buffered
    /// sparse updates.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleSketches` if the precisions differ
    ///
    /// # Examples
    ///
    /// ```
    /// use hll_oxide::cardinality::HyperLogLog;
    ///
    /// let mut a = HyperLogLog::new(12).unwrap();
    /// let mut b = HyperLogLog::new(12).unwrap();
    /// a.add(b"x");
    /// b.add(b"y");
    /// a.merge(&b).unwrap();
    /// assert_eq!(a.count(), 2);
    /// ```
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.precision != other.precision {
            return Err(SketchError::IncompatibleSketches {
                reason: format!(
                    "register counts differ: {} vs {}",
                    self.num_registers(),
                    other.num_registers()
                ),
            });
        }

        match &other.registers {
            Representation::Dense(dense) => {
                for (slot, rank) in dense.iter().enumerate() {
                    if rank > 0 {
                        self.apply_max(slot as u64, rank);
                    }
                }
            }
            Representation::Sparse(sparse) => {
                for (index, rank) in sparse.entries() {
                    self.apply_max(index, rank);
                }
            }
        }

        self.cache = None;
        self.promote_if_full();
        Ok(())
    }

    /// Raise the register at `index` to at least `rank`
    fn apply_max(&mut self, index: u64, rank: u8) {
        match &mut self.registers {
            Representation::Sparse(sparse) => {
                // The buffered path already has max semantics
                sparse.add(index, rank, &mut self.histogram);
            }
            Representation::Dense(dense) => {
                let slot = index as usize;
                let old = dense.get(slot);
                if rank > old {
                    dense.set(slot, rank);
                    self.histogram.transition(old, rank);
                }
            }
        }
    }

    /// Promote a sparse sketch whose list crossed its size limit
    ///
    /// `add` never fails, so a failed dense allocation leaves the sketch
    /// sparse; the next register change retries.
    fn promote_if_full(&mut self) {
        let full = matches!(&self.registers, Representation::Sparse(s) if s.should_promote());
        if full {
            if let Representation::Sparse(sparse) = &mut self.registers {
                sparse.flush(&mut self.histogram);
                if let Ok(dense) = sparse.to_dense() {
                    self.registers = Representation::Dense(dense);
                }
            }
        }
    }

    /// Serializes the sketch to a version-tagged snapshot
    ///
    /// Little-endian u64 words: flags (version and representation), added
    /// counter, list size, cache flag and value, node-cache index, seed,
    /// the 65 histogram bins, then the registers (one word per register
    /// when dense, (index, rank) pairs when sparse). A sparse sketch with
    /// buffered updates serializes its folded state without being
    /// mutated.
    ///
    /// # Examples
    ///
    /// ```
    /// use hll_oxide::cardinality::HyperLogLog;
    ///
    /// let mut hll = HyperLogLog::new(10).unwrap();
    /// hll.add(b"payload");
    /// let restored = HyperLogLog::from_bytes(&hll.to_bytes()).unwrap();
    /// assert_eq!(restored.precision(), 10);
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let words = match &self.registers {
            Representation::Sparse(sparse) => {
                let entries = sparse.entries();
                let mut counts = [0u64; HISTOGRAM_BINS];
                counts[0] = self.num_registers() - entries.len() as u64;
                for &(_, rank) in &entries {
                    counts[rank as usize] += 1;
                }
                let mut words = self.snapshot_header(
                    true,
                    entries.len() as u64,
                    sparse.cached_index(),
                    &counts,
                    2 * entries.len(),
                );
                for &(index, rank) in &entries {
                    words.push(index);
                    words.push(u64::from(rank));
                }
                words
            }
            Representation::Dense(dense) => {
                let mut words = self.snapshot_header(
                    false,
                    0,
                    None,
                    self.histogram.counts(),
                    dense.registers(),
                );
                words.extend(dense.iter().map(u64::from));
                words
            }
        };

        let mut bytes = Vec::with_capacity(words.len() * 8);
        for word in words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    fn snapshot_header(
        &self,
        sparse: bool,
        list_size: u64,
        node_cache: Option<u64>,
        histogram: &[u64; HISTOGRAM_BINS],
        payload_words: usize,
    ) -> Vec<u64> {
        let mut words = Vec::with_capacity(SNAPSHOT_HEADER_WORDS + payload_words);
        words.push((SNAPSHOT_VERSION << 1) | u64::from(sparse));
        words.push(self.added);
        words.push(list_size);
        words.push(u64::from(self.cache.is_some()));
        words.push(self.cache.map_or(0, f64::to_bits));
        words.push(node_cache.unwrap_or(NODE_CACHE_NONE));
        words.push(self.seed);
        words.extend_from_slice(histogram);
        words
    }

    /// Restores a sketch from a snapshot produced by
    /// [`HyperLogLog::to_bytes`]
    ///
    /// # Errors
    ///
    /// Returns `DeserializationError` if the snapshot is truncated, has an
    /// unknown version, oversteps the size cap, or its histogram and
    /// registers disagree; `AllocationFailure` if the register array
    /// cannot be allocated
    ///
    /// # Validation
    ///
    /// - Byte length is a whole number of words and at least the header
    /// - Version tag matches
    /// - Histogram sums to a power of two (which recovers m and p)
    /// - Register values are within [0, 64 - p + 1]; sparse indexes are
    ///   strictly ascending and in range; the node-cache index, when set,
    ///   names a listed register
    /// - The histogram matches the registers bin for bin
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        validation::validate_byte_size(bytes.len())?;
        validation::validate_min_size(bytes.len(), SNAPSHOT_HEADER_WORDS * 8)?;
        if bytes.len() % 8 != 0 {
            return Err(SketchError::DeserializationError(format!(
                "snapshot length {} is not a whole number of 8-byte words",
                bytes.len()
            )));
        }

        let words: Vec<u64> = bytes
            .chunks_exact(8)
            .map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap()))
            .collect();

        let flags = words[0];
        if flags >> 1 != SNAPSHOT_VERSION {
            return Err(SketchError::DeserializationError(format!(
                "unsupported snapshot version {}",
                flags >> 1
            )));
        }
        let is_sparse = flags & 1 == 1;
        let added = words[1];
        let list_size = words[2];
        let cache = (words[3] != 0).then_some(f64::from_bits(words[4]));
        let node_cache = words[5];
        let seed = words[6];

        let mut histogram = [0u64; HISTOGRAM_BINS];
        histogram.copy_from_slice(&words[7..SNAPSHOT_HEADER_WORDS]);

        let mut m: u64 = 0;
        for &bin in &histogram {
            m = m.checked_add(bin).ok_or_else(|| {
                SketchError::DeserializationError("histogram counts overflow".to_string())
            })?;
        }
        if m == 0 || !m.is_power_of_two() {
            return Err(SketchError::DeserializationError(format!(
                "histogram sums to {}, not a power of two",
                m
            )));
        }
        let precision = m.trailing_zeros() as u8;
        validation::validate_precision(precision).map_err(|_| {
            SketchError::DeserializationError(format!(
                "histogram implies unsupported precision {}",
                precision
            ))
        })?;
        let max_rank = 65 - precision;

        let payload = &words[SNAPSHOT_HEADER_WORDS..];
        let mut rebuilt = RegisterHistogram::new(m);

        let registers = if is_sparse {
            if payload.len() as u64 != list_size.saturating_mul(2) {
                return Err(SketchError::DeserializationError(format!(
                    "expected {} register pair words, got {}",
                    list_size.saturating_mul(2),
                    payload.len()
                )));
            }
            let mut entries: Vec<(u64, u8)> = Vec::with_capacity(payload.len() / 2);
            for pair in payload.chunks_exact(2) {
                let (index, rank) = (pair[0], pair[1]);
                if index >= m {
                    return Err(SketchError::DeserializationError(format!(
                        "register index {} out of range for {} registers",
                        index, m
                    )));
                }
                if let Some(&(last_index, _)) = entries.last() {
                    if index <= last_index {
                        return Err(SketchError::DeserializationError(
                            "register indexes are not strictly ascending".to_string(),
                        ));
                    }
                }
                if rank == 0 || rank > u64::from(max_rank) {
                    return Err(SketchError::DeserializationError(format!(
                        "register rank {} outside [1, {}]",
                        rank, max_rank
                    )));
                }
                rebuilt.transition(0, rank as u8);
                entries.push((index, rank as u8));
            }
            let cursor = (node_cache != NODE_CACHE_NONE).then_some(node_cache);
            if let Some(target) = cursor {
                if !entries.iter().any(|&(index, _)| index == target) {
                    return Err(SketchError::DeserializationError(format!(
                        "node cache index {} is not in the register list",
                        target
                    )));
                }
            }
            Representation::Sparse(SparseRegisters::from_entries(
                m,
                &entries,
                cursor,
                default_list_limit(m),
                default_buffer_limit(m),
            ))
        } else {
            if payload.len() as u64 != m {
                return Err(SketchError::DeserializationError(format!(
                    "expected {} register words, got {}",
                    m,
                    payload.len()
                )));
            }
            let mut dense = DenseRegisters::new(m)?;
            for (slot, &word) in payload.iter().enumerate() {
                if word > u64::from(max_rank) {
                    return Err(SketchError::DeserializationError(format!(
                        "register rank {} outside [0, {}]",
                        word, max_rank
                    )));
                }
                if word > 0 {
                    dense.set(slot, word as u8);
                    rebuilt.transition(0, word as u8);
                }
            }
            Representation::Dense(dense)
        };

        if rebuilt.counts() != &histogram {
            return Err(SketchError::DeserializationError(
                "histogram does not match registers".to_string(),
            ));
        }

        Ok(HyperLogLog {
            precision,
            seed,
            registers,
            histogram: rebuilt,
            cache,
            added,
        })
    }
}

/// Auto promotion threshold: near the memory crossover between ~24-byte
/// list nodes and the 0.75-byte-per-register dense array
fn default_list_limit(m: u64) -> usize {
    (m / 16).max(16) as usize
}

/// Auto insert-buffer bound
fn default_buffer_limit(m: u64) -> usize {
    (m / 64).max(16) as usize
}

impl Sketch for HyperLogLog {
    type Item = [u8];

    fn update(&mut self, item: &[u8]) {
        self.add(item);
    }

    fn estimate(&mut self) -> f64 {
        self.cardinality()
    }

    fn is_empty(&self) -> bool {
        self.is_empty()
    }

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes()
    }

    fn deserialize(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

impl Mergeable for HyperLogLog {
    fn merge(&mut self, other: &Self) -> Result<()> {
        self.merge(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_hyperloglog() {
        let hll = HyperLogLog::new(12).unwrap();
        assert!(hll.is_empty());
        assert_eq!(hll.precision(), 12);
        assert_eq!(hll.num_registers(), 4096);
        assert_eq!(hll.seed(), DEFAULT_SEED);
        assert!(!hll.is_sparse());
    }

    #[test]
    fn test_invalid_precision() {
        assert!(HyperLogLog::new(1).is_err());
        assert!(HyperLogLog::new(64).is_err());
        assert!(HyperLogLog::new(2).is_ok());
        assert!(HyperLogLog::new(18).is_ok());
    }

    #[test]
    fn test_invalid_sparse_limits() {
        assert!(HyperLogLog::sparse_with_limits(10, DEFAULT_SEED, 0, 16).is_err());
        assert!(HyperLogLog::sparse_with_limits(10, DEFAULT_SEED, 16, 0).is_err());
        assert!(HyperLogLog::sparse_with_limits(10, DEFAULT_SEED, 16, 16).is_ok());
    }

    #[test]
    fn test_add_reports_changes() {
        let mut hll = HyperLogLog::new(12).unwrap();
        assert!(hll.add(b"hello"));
        // Same input cannot raise its register a second time
        assert!(!hll.add(b"hello"));
        assert_eq!(hll.added(), 2);
    }

    #[test]
    fn test_sparse_add_is_conservative() {
        let mut hll = HyperLogLog::new_sparse(12).unwrap();
        assert!(hll.add(b"hello"));
        assert!(hll.add(b"hello"));
        assert!(hll.is_sparse());
    }

    #[test]
    fn test_cache_is_reused_and_invalidated() {
        let mut hll = HyperLogLog::new(12).unwrap();
        hll.add(b"a");
        let first = hll.cardinality();
        assert_eq!(hll.cardinality(), first);
        hll.add(b"b");
        let second = hll.cardinality();
        assert!(second > first);
    }

    #[test]
    fn test_register_lookup() {
        let mut hll = HyperLogLog::new(10).unwrap();
        hll.add(b"item");
        let h = hll.hash(b"item");
        let index = h >> (64 - 10);
        let rank = hll.register(index).unwrap();
        assert!(rank >= 1);
        assert!(hll.register(1 << 10).is_err());
    }

    #[test]
    fn test_promotion_threshold() {
        let mut hll = HyperLogLog::sparse_with_limits(12, DEFAULT_SEED, 8, 4).unwrap();
        let mut n = 0u32;
        while hll.is_sparse() {
            hll.add(&n.to_le_bytes());
            n += 1;
            assert!(n < 4096, "sketch never promoted");
        }
        // Registers survive promotion
        let mut distinct = 0u64;
        for i in 0..hll.num_registers() {
            if hll.register(i).unwrap() > 0 {
                distinct += 1;
            }
        }
        assert!(distinct >= 8);
    }

    #[test]
    fn test_merge_precision_mismatch() {
        let mut a = HyperLogLog::new(10).unwrap();
        let b = HyperLogLog::new(12).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_histogram_matches_registers() {
        let mut hll = HyperLogLog::new(10).unwrap();
        for i in 0u32..200 {
            hll.add(&i.to_le_bytes());
        }
        let histogram = hll.histogram();
        let mut recount = [0u64; HISTOGRAM_BINS];
        for i in 0..hll.num_registers() {
            recount[hll.register(i).unwrap() as usize] += 1;
        }
        assert_eq!(histogram, recount);
        assert_eq!(histogram.iter().sum::<u64>(), hll.num_registers());
    }

    #[test]
    fn test_serialization_smoke() {
        let mut hll = HyperLogLog::new(8).unwrap();
        for i in 0u32..100 {
            hll.add(&i.to_le_bytes());
        }
        let restored = HyperLogLog::from_bytes(&hll.to_bytes()).unwrap();
        assert_eq!(restored.precision(), 8);
        assert_eq!(restored.seed(), DEFAULT_SEED);
        assert_eq!(restored.added(), hll.added());
        assert_eq!(restored.histogram(), hll.histogram());
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(HyperLogLog::from_bytes(&[]).is_err());
        assert!(HyperLogLog::from_bytes(&[0u8; 100]).is_err());
        // Valid snapshot, then flip a histogram word so it disagrees
        let mut hll = HyperLogLog::new(8).unwrap();
        hll.add(b"x");
        let mut bytes = hll.to_bytes();
        bytes[7 * 8] ^= 1;
        assert!(HyperLogLog::from_bytes(&bytes).is_err());
    }
}
