//! Sorted-list register storage for dilute sketches
//!
//! While only a few registers are non-zero, a sorted singly linked list of
//! (index, rank) pairs plus a small insert buffer is far cheaper than the
//! packed dense array. Inserts land in the buffer; a full buffer is sorted
//! and folded into the list in one forward merge pass. Once the list
//! crosses its size limit the store converts itself to dense storage.
//!
//! Nodes live in an arena and link through `u32` handles rather than
//! pointers, which keeps the structure safe, cheap to clone, and trivially
//! droppable. The node cache remembers the last node a lookup landed on so
//! ascending scans resume mid-list instead of from the head.

use super::dense::DenseRegisters;
use super::histogram::RegisterHistogram;
use crate::common::Result;

/// Null handle for the arena-backed list
const NIL: u32 = u32::MAX;

#[derive(Clone, Debug)]
struct Node {
    index: u64,
    rank: u8,
    next: u32,
}

/// Sparse register store: sorted list + pending insert buffer.
#[derive(Clone, Debug)]
pub(crate) struct SparseRegisters {
    nodes: Vec<Node>,
    head: u32,
    /// Live list length; grows only during flush
    len: usize,
    pending: Vec<(u64, u8)>,
    max_list_size: usize,
    max_buffer_size: usize,
    /// Node cache: last node a get landed on, NIL if none
    cursor: u32,
    registers: u64,
}

impl SparseRegisters {
    /// Empty store for a sketch with `registers` slots.
    pub fn new(registers: u64, max_list_size: usize, max_buffer_size: usize) -> Self {
        SparseRegisters {
            nodes: Vec::new(),
            head: NIL,
            len: 0,
            pending: Vec::with_capacity(max_buffer_size),
            max_list_size,
            max_buffer_size,
            cursor: NIL,
            registers,
        }
    }

    /// Rebuild a store from ascending (index, rank) pairs.
    ///
    /// Used by deserialization; the caller has already validated ordering
    /// and ranges. `cursor_index` restores the node cache by register
    /// index.
    pub fn from_entries(
        registers: u64,
        entries: &[(u64, u8)],
        cursor_index: Option<u64>,
        max_list_size: usize,
        max_buffer_size: usize,
    ) -> Self {
        let mut nodes = Vec::with_capacity(entries.len());
        let mut cursor = NIL;
        for (slot, &(index, rank)) in entries.iter().enumerate() {
            let next = if slot + 1 < entries.len() {
                (slot + 1) as u32
            } else {
                NIL
            };
            if cursor_index == Some(index) {
                cursor = slot as u32;
            }
            nodes.push(Node { index, rank, next });
        }
        SparseRegisters {
            head: if nodes.is_empty() { NIL } else { 0 },
            len: nodes.len(),
            nodes,
            pending: Vec::with_capacity(max_buffer_size),
            max_list_size,
            max_buffer_size,
            cursor,
            registers,
        }
    }

    /// Number of nodes in the sorted list
    pub fn list_len(&self) -> usize {
        self.len
    }

    /// Whether the insert buffer holds unflushed entries
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Whether the list has crossed its size limit and the store should
    /// convert to dense storage
    pub fn should_promote(&self) -> bool {
        self.len >= self.max_list_size
    }

    /// Register index of the cached node, if any
    pub fn cached_index(&self) -> Option<u64> {
        (self.cursor != NIL).then(|| self.nodes[self.cursor as usize].index)
    }

    /// Buffer an observation for the register at `index`.
    ///
    /// A full buffer is flushed first, so the entry always fits.
    pub fn add(&mut self, index: u64, rank: u8, histogram: &mut RegisterHistogram) {
        if self.pending.len() == self.max_buffer_size {
            self.flush(histogram);
        }
        self.pending.push((index, rank));
    }

    /// Fold the insert buffer into the sorted list.
    ///
    /// The buffer is sorted by (index ASC, rank ASC) and merged in one
    /// forward pass: `prev` trails the scan so each buffered entry resumes
    /// where the previous one stopped instead of from the head. On an
    /// index hit only a larger rank wins; every list change is mirrored
    /// into the histogram.
    pub fn flush(&mut self, histogram: &mut RegisterHistogram) {
        if self.pending.is_empty() {
            return;
        }
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_unstable();

        let mut prev = NIL;
        for &(index, rank) in &pending {
            let mut cur = if prev == NIL {
                self.head
            } else {
                self.nodes[prev as usize].next
            };
            while cur != NIL && self.nodes[cur as usize].index < index {
                prev = cur;
                cur = self.nodes[cur as usize].next;
            }

            if cur != NIL && self.nodes[cur as usize].index == index {
                let node = &mut self.nodes[cur as usize];
                if rank > node.rank {
                    histogram.transition(node.rank, rank);
                    node.rank = rank;
                }
                // prev stays behind the node so a duplicate index in the
                // buffer finds it again
            } else {
                let handle = self.nodes.len() as u32;
                self.nodes.push(Node {
                    index,
                    rank,
                    next: cur,
                });
                if prev == NIL {
                    self.head = handle;
                } else {
                    self.nodes[prev as usize].next = handle;
                }
                histogram.transition(0, rank);
                self.len += 1;
            }
        }
        pending.clear();
        self.pending = pending;
    }

    /// Current value of the register at `index`.
    ///
    /// Flushes the buffer first, then walks forward from the node cache
    /// when it is at or before the query, else from the head. The cache is
    /// left on the last node at or before the query, so ascending scans
    /// over all m slots cost O(m + L) in total.
    pub fn get(&mut self, index: u64, histogram: &mut RegisterHistogram) -> u8 {
        if !self.pending.is_empty() {
            self.flush(histogram);
        }

        let mut cur = if self.cursor != NIL && self.nodes[self.cursor as usize].index <= index {
            self.cursor
        } else {
            self.head
        };

        let mut last_at_or_before = NIL;
        while cur != NIL {
            let node = &self.nodes[cur as usize];
            if node.index > index {
                break;
            }
            last_at_or_before = cur;
            if node.index == index {
                self.cursor = cur;
                return node.rank;
            }
            cur = node.next;
        }

        if last_at_or_before != NIL {
            self.cursor = last_at_or_before;
        }
        0
    }

    /// All non-zero registers as ascending (index, rank) pairs.
    ///
    /// Read-only: buffered entries are folded into the result without
    /// flushing, so this is safe to call on a borrowed sketch (merge,
    /// serialization).
    pub fn entries(&self) -> Vec<(u64, u8)> {
        let mut listed = Vec::with_capacity(self.len);
        let mut cur = self.head;
        while cur != NIL {
            let node = &self.nodes[cur as usize];
            listed.push((node.index, node.rank));
            cur = node.next;
        }
        if self.pending.is_empty() {
            return listed;
        }

        // Collapse the buffer to one max-rank entry per index
        let mut buffered = self.pending.clone();
        buffered.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        buffered.dedup_by_key(|entry| entry.0);

        let mut merged = Vec::with_capacity(listed.len() + buffered.len());
        let (mut i, mut j) = (0, 0);
        while i < listed.len() && j < buffered.len() {
            match listed[i].0.cmp(&buffered[j].0) {
                std::cmp::Ordering::Less => {
                    merged.push(listed[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(buffered[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push((listed[i].0, listed[i].1.max(buffered[j].1)));
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&listed[i..]);
        merged.extend_from_slice(&buffered[j..]);
        merged
    }

    /// Copy every listed register into a freshly allocated dense store.
    ///
    /// The buffer must have been flushed; the histogram describes the same
    /// register values before and after, so it carries over untouched.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailure` when the dense buffer cannot be obtained.
    pub fn to_dense(&self) -> Result<DenseRegisters> {
        debug_assert!(self.pending.is_empty());
        let mut dense = DenseRegisters::new(self.registers)?;
        let mut cur = self.head;
        while cur != NIL {
            let node = &self.nodes[cur as usize];
            dense.set(node.index as usize, node.rank);
            cur = node.next;
        }
        Ok(dense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(m: u64, list: usize, buffer: usize) -> (SparseRegisters, RegisterHistogram) {
        (SparseRegisters::new(m, list, buffer), RegisterHistogram::new(m))
    }

    #[test]
    fn test_add_buffers_until_flush() {
        let (mut sparse, mut histogram) = store(1024, 64, 8);
        sparse.add(10, 3, &mut histogram);
        sparse.add(5, 2, &mut histogram);
        assert!(sparse.has_pending());
        assert_eq!(sparse.list_len(), 0);

        sparse.flush(&mut histogram);
        assert!(!sparse.has_pending());
        assert_eq!(sparse.list_len(), 2);
        assert_eq!(histogram.count(0), 1022);
        assert_eq!(histogram.count(2), 1);
        assert_eq!(histogram.count(3), 1);
    }

    #[test]
    fn test_full_buffer_flushes_on_add() {
        let (mut sparse, mut histogram) = store(1024, 64, 4);
        for i in 0..4 {
            sparse.add(i, 1, &mut histogram);
        }
        assert_eq!(sparse.list_len(), 0);
        sparse.add(4, 1, &mut histogram);
        // The four older entries were flushed; the fifth is buffered
        assert_eq!(sparse.list_len(), 4);
        assert!(sparse.has_pending());
    }

    #[test]
    fn test_get_flushes_and_reads() {
        let (mut sparse, mut histogram) = store(1024, 64, 8);
        sparse.add(100, 7, &mut histogram);
        assert_eq!(sparse.get(100, &mut histogram), 7);
        assert_eq!(sparse.get(99, &mut histogram), 0);
        assert_eq!(sparse.get(1023, &mut histogram), 0);
    }

    #[test]
    fn test_rank_is_monotone_max() {
        let (mut sparse, mut histogram) = store(1024, 64, 2);
        sparse.add(50, 9, &mut histogram);
        sparse.flush(&mut histogram);
        sparse.add(50, 4, &mut histogram);
        sparse.flush(&mut histogram);
        assert_eq!(sparse.get(50, &mut histogram), 9);
        sparse.add(50, 12, &mut histogram);
        sparse.flush(&mut histogram);
        assert_eq!(sparse.get(50, &mut histogram), 12);
        assert_eq!(histogram.count(12), 1);
        assert_eq!(histogram.count(9), 0);
        assert_eq!(sparse.list_len(), 1);
    }

    #[test]
    fn test_duplicate_indexes_in_one_buffer() {
        let (mut sparse, mut histogram) = store(1024, 64, 8);
        sparse.add(7, 2, &mut histogram);
        sparse.add(7, 5, &mut histogram);
        sparse.add(7, 3, &mut histogram);
        sparse.flush(&mut histogram);
        assert_eq!(sparse.list_len(), 1);
        assert_eq!(sparse.get(7, &mut histogram), 5);
        assert_eq!(histogram.count(5), 1);
        assert_eq!(histogram.count(0), 1023);
    }

    #[test]
    fn test_insert_positions() {
        let (mut sparse, mut histogram) = store(1024, 64, 8);
        sparse.add(500, 1, &mut histogram);
        sparse.flush(&mut histogram);
        // New head, middle, and tail
        sparse.add(10, 2, &mut histogram);
        sparse.add(600, 3, &mut histogram);
        sparse.add(550, 4, &mut histogram);
        sparse.flush(&mut histogram);
        let entries = sparse.entries();
        assert_eq!(entries, vec![(10, 2), (500, 1), (550, 4), (600, 3)]);
    }

    #[test]
    fn test_cursor_accelerated_ascending_scan() {
        let (mut sparse, mut histogram) = store(1 << 10, 512, 64);
        for i in (0..1024u64).step_by(17) {
            sparse.add(i, ((i % 50) + 1) as u8, &mut histogram);
        }
        sparse.flush(&mut histogram);
        // Ascending full scan, then an out-of-order backwards probe
        for i in 0..1024u64 {
            let expected = if i % 17 == 0 { ((i % 50) + 1) as u8 } else { 0 };
            assert_eq!(sparse.get(i, &mut histogram), expected, "slot {}", i);
        }
        assert_eq!(sparse.get(0, &mut histogram), 1);
        assert_eq!(sparse.get(17, &mut histogram), 18);
    }

    #[test]
    fn test_entries_folds_pending_without_flushing() {
        let (mut sparse, mut histogram) = store(1024, 64, 8);
        sparse.add(3, 2, &mut histogram);
        sparse.flush(&mut histogram);
        sparse.add(1, 6, &mut histogram);
        sparse.add(3, 9, &mut histogram);
        sparse.add(3, 4, &mut histogram);

        let entries = sparse.entries();
        assert_eq!(entries, vec![(1, 6), (3, 9)]);
        // The store itself is untouched
        assert!(sparse.has_pending());
        assert_eq!(sparse.list_len(), 1);
    }

    #[test]
    fn test_to_dense_copies_registers() {
        let (mut sparse, mut histogram) = store(256, 64, 8);
        for &(index, rank) in &[(0u64, 5u8), (17, 9), (42, 1), (255, 33)] {
            sparse.add(index, rank, &mut histogram);
        }
        sparse.flush(&mut histogram);
        let dense = sparse.to_dense().unwrap();
        for i in 0..256u64 {
            assert_eq!(dense.get(i as usize), sparse.get(i, &mut histogram));
        }
    }

    #[test]
    fn test_from_entries_rebuilds_list_and_cursor() {
        let entries = vec![(2u64, 3u8), (9, 1), (40, 12)];
        let (_, mut histogram) = store(64, 16, 4);
        for &(_, rank) in &entries {
            histogram.transition(0, rank);
        }
        let mut sparse = SparseRegisters::from_entries(64, &entries, Some(9), 16, 4);
        assert_eq!(sparse.list_len(), 3);
        assert_eq!(sparse.cached_index(), Some(9));
        assert_eq!(sparse.entries(), entries);
        assert_eq!(sparse.get(40, &mut histogram), 12);
    }

    #[test]
    fn test_should_promote() {
        let (mut sparse, mut histogram) = store(1024, 3, 8);
        sparse.add(1, 1, &mut histogram);
        sparse.add(2, 1, &mut histogram);
        sparse.flush(&mut histogram);
        assert!(!sparse.should_promote());
        sparse.add(3, 1, &mut histogram);
        sparse.flush(&mut histogram);
        assert!(sparse.should_promote());
    }

    #[test]
    fn test_histogram_sum_invariant_through_flushes() {
        let (mut sparse, mut histogram) = store(512, 256, 4);
        for i in 0..200u64 {
            sparse.add(i * 31 % 512, ((i % 40) + 1) as u8, &mut histogram);
        }
        sparse.flush(&mut histogram);
        assert_eq!(histogram.total(), 512);
        let nonzero: u64 = (1..=64u8).map(|v| histogram.count(v)).sum();
        assert_eq!(nonzero, sparse.list_len() as u64);
    }
}
