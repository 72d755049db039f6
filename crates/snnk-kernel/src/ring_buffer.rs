//! Ring buffers (spec.md §4.2)
//!
//! `RingBuffer` is the on-grid double accumulator: a plain circular array
//! addressed through the modulo table, read-and-zero on delivery.
//! `SliceRingBuffer` is its off-grid counterpart, a per-bin min-heap keyed
//! by `(step, offset)` for precise delivery and refractory-end markers.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// On-grid ring buffer: `L = min_delay + max_delay` double accumulators
/// addressed via [`crate::moduli::ModuloTable`].
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<f64>,
}

impl RingBuffer {
    /// Build a buffer of length `len = min_delay + max_delay`, all zeroed.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![0.0; len],
        }
    }

    /// Length of the underlying array.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if the buffer holds no slots (never valid in practice, since
    /// `min_delay >= 1`, but checked where length arithmetic could zero it).
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Accumulate `x` into the slot addressed by `offset` (already resolved
    /// through the modulo table by the caller as `moduli[lag + d - 1]`).
    pub fn add_value(&mut self, offset: usize, x: f64) {
        self.slots[offset] += x;
    }

    /// Read and zero the slot addressed by `offset`, making it reusable for
    /// the next rotation.
    pub fn get_value(&mut self, offset: usize) -> f64 {
        std::mem::replace(&mut self.slots[offset], 0.0)
    }

    /// Grow the buffer to `new_len`, preserving existing slot contents at
    /// their current indices and zero-filling the rest. A no-op if
    /// `new_len <= self.len()`.
    pub fn resize(&mut self, new_len: usize) {
        if new_len > self.slots.len() {
            self.slots.resize(new_len, 0.0);
        }
    }

    /// Zero every slot without changing length.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = 0.0);
    }
}

/// One pending off-grid event: a spike contribution or a refractory-end
/// marker, ordered by `(step, offset)` with refractory-end ties breaking
/// first (spec.md §4.2 "Ordering").
#[derive(Debug, Clone, Copy, PartialEq)]
struct SliceEntry {
    step: u64,
    offset: f64,
    weight: f64,
    is_refractory_end: bool,
}

impl Eq for SliceEntry {}

// `BinaryHeap` is a max-heap; we want the earliest `(step, offset)` first,
// with refractory-end markers served before spikes at an identical
// timestamp, so comparisons are reversed relative to natural order.
impl Ord for SliceEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .step
            .cmp(&self.step)
            .then_with(|| other.offset.partial_cmp(&self.offset).unwrap_or(Ordering::Equal))
            .then_with(|| self.is_refractory_end.cmp(&other.is_refractory_end))
    }
}

impl PartialOrd for SliceEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Off-grid ring buffer: `nbuff` bins, each a min-heap over pending events,
/// indexed by `slice_moduli` (spec.md §4.2/§4.3).
#[derive(Debug, Clone)]
pub struct SliceRingBuffer {
    bins: Vec<BinaryHeap<SliceEntry>>,
}

impl SliceRingBuffer {
    /// Build a buffer with `nbuff` empty bins.
    pub fn new(nbuff: usize) -> Self {
        Self {
            bins: (0..nbuff).map(|_| BinaryHeap::new()).collect(),
        }
    }

    /// Number of bins.
    pub fn nbuff(&self) -> usize {
        self.bins.len()
    }

    /// Queue a spike contribution for delivery at `stamp_steps` with a
    /// sub-step `offset`, into the bin selected by `rel_deliver_lag`.
    pub fn add_spike(&mut self, rel_deliver_lag: usize, stamp_steps: u64, offset: f64, weight: f64) {
        self.bins[rel_deliver_lag].push(SliceEntry {
            step: stamp_steps,
            offset,
            weight,
            is_refractory_end: false,
        });
    }

    /// Queue a refractory-end marker at `step`, into the bin selected by
    /// `rel_deliver_lag`.
    pub fn add_refractory(&mut self, rel_deliver_lag: usize, step: u64, offset: f64) {
        self.bins[rel_deliver_lag].push(SliceEntry {
            step,
            offset,
            weight: 0.0,
            is_refractory_end: true,
        });
    }

    /// Prepare bin `rel_deliver_lag` for ordered delivery. `BinaryHeap`
    /// already maintains heap order incrementally; this is a no-op kept to
    /// mirror the explicit sort step of the source design and to give
    /// future backends (e.g. a sorted `Vec`) a natural hook.
    pub fn prepare_delivery(&mut self, _rel_deliver_lag: usize) {}

    /// Pop the next event due no later than `t` (current step) from bin
    /// `rel_deliver_lag`. Returns `(offset, weight, is_refractory_end)` and
    /// `true`, or `false` if nothing in the bin is due yet.
    pub fn get_next_spike(
        &mut self,
        rel_deliver_lag: usize,
        t: u64,
    ) -> Option<(f64, f64, bool)> {
        let bin = &mut self.bins[rel_deliver_lag];
        match bin.peek() {
            Some(entry) if entry.step <= t => {
                let entry = bin.pop().expect("peek just confirmed an entry");
                Some((entry.offset, entry.weight, entry.is_refractory_end))
            }
            _ => None,
        }
    }

    /// Drop all pending events in every bin.
    pub fn clear(&mut self) {
        self.bins.iter_mut().for_each(BinaryHeap::clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get_value_zeros_slot() {
        let mut rb = RingBuffer::new(4);
        rb.add_value(1, 3.5);
        rb.add_value(1, 1.5);
        assert_eq!(rb.get_value(1), 5.0);
        assert_eq!(rb.get_value(1), 0.0, "read must zero the slot");
    }

    #[test]
    fn resize_preserves_existing_contents() {
        let mut rb = RingBuffer::new(2);
        rb.add_value(0, 9.0);
        rb.resize(5);
        assert_eq!(rb.len(), 5);
        assert_eq!(rb.get_value(0), 9.0);
        assert_eq!(rb.get_value(4), 0.0);
    }

    #[test]
    fn resize_shrinking_is_a_no_op() {
        let mut rb = RingBuffer::new(5);
        rb.resize(2);
        assert_eq!(rb.len(), 5);
    }

    #[test]
    fn clear_zeros_all_slots() {
        let mut rb = RingBuffer::new(3);
        rb.add_value(0, 1.0);
        rb.add_value(2, 2.0);
        rb.clear();
        assert_eq!(rb.get_value(0), 0.0);
        assert_eq!(rb.get_value(2), 0.0);
    }

    #[test]
    fn slice_ring_buffer_orders_by_step_then_offset() {
        let mut srb = SliceRingBuffer::new(1);
        srb.add_spike(0, 5, 0.8, 1.0);
        srb.add_spike(0, 5, 0.2, 2.0);
        srb.add_spike(0, 3, 0.9, 3.0);
        let (offset, weight, is_ref) = srb.get_next_spike(0, 10).unwrap();
        assert_eq!((offset, weight, is_ref), (0.9, 3.0, false));
        let (offset, ..) = srb.get_next_spike(0, 10).unwrap();
        assert_eq!(offset, 0.2);
        let (offset, ..) = srb.get_next_spike(0, 10).unwrap();
        assert_eq!(offset, 0.8);
    }

    #[test]
    fn refractory_end_breaks_ties_before_spike() {
        let mut srb = SliceRingBuffer::new(1);
        srb.add_spike(0, 4, 0.5, 1.0);
        srb.add_refractory(0, 4, 0.5);
        let (_, _, is_ref) = srb.get_next_spike(0, 10).unwrap();
        assert!(is_ref, "refractory-end marker must be served first on a tie");
    }

    #[test]
    fn get_next_spike_respects_horizon() {
        let mut srb = SliceRingBuffer::new(1);
        srb.add_spike(0, 10, 0.0, 1.0);
        assert!(srb.get_next_spike(0, 5).is_none());
        assert!(srb.get_next_spike(0, 10).is_some());
    }
}
