//! Send/receive buffers (spec.md §4.5)
//!
//! A flat `num_ranks * chunk_size` array, one chunk per remote rank. The
//! last slot of every chunk is reserved for a marker; [`ChunkRecord`]
//! abstracts over the wire types this applies to (`SpikeData`,
//! `OffGridSpikeData`, `TargetData`, `SecondaryEventData`) so the buffer and
//! its chunk-read protocol are written once.

use snnk_types::Marker;

/// A record that can carry a chunk-boundary [`Marker`], as required to live
/// in a [`SendBuffer`]/[`RecvBuffer`] chunk.
pub trait ChunkRecord: Copy + Default {
    /// Current marker on this record.
    fn marker(&self) -> Marker;
    /// Overwrite this record's marker, leaving its other fields untouched.
    fn set_marker(&mut self, marker: Marker);
}

impl ChunkRecord for snnk_types::SpikeData {
    fn marker(&self) -> Marker {
        self.marker
    }
    fn set_marker(&mut self, marker: Marker) {
        self.marker = marker;
    }
}

impl ChunkRecord for snnk_types::OffGridSpikeData {
    fn marker(&self) -> Marker {
        self.base.marker
    }
    fn set_marker(&mut self, marker: Marker) {
        self.base.marker = marker;
    }
}

impl ChunkRecord for snnk_types::TargetData {
    fn marker(&self) -> Marker {
        self.marker
    }
    fn set_marker(&mut self, marker: Marker) {
        self.marker = marker;
    }
}

impl ChunkRecord for snnk_types::SecondaryEventData {
    fn marker(&self) -> Marker {
        self.marker
    }
    fn set_marker(&mut self, marker: Marker) {
        self.marker = marker;
    }
}

/// The send side: per-rank chunks this process fills and hands to the
/// all-to-all transport.
#[derive(Debug, Clone)]
pub struct SendBuffer<T: ChunkRecord> {
    records: Vec<T>,
    chunk_size: usize,
    num_ranks: usize,
    cursors: Vec<usize>,
}

impl<T: ChunkRecord> SendBuffer<T> {
    /// Build a buffer with `num_ranks` chunks of `chunk_size` records each,
    /// all slots default-initialized.
    pub fn new(num_ranks: usize, chunk_size: usize) -> Self {
        assert!(chunk_size >= 1, "a chunk must hold at least its marker slot");
        Self {
            records: vec![T::default(); num_ranks * chunk_size],
            chunk_size,
            num_ranks,
            cursors: vec![0; num_ranks],
        }
    }

    /// Records per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks (ranks).
    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    /// First index of rank `r`'s chunk.
    pub fn begin(&self, r: usize) -> usize {
        r * self.chunk_size
    }

    /// One past the last index of rank `r`'s chunk.
    pub fn end(&self, r: usize) -> usize {
        (r + 1) * self.chunk_size
    }

    /// Current fill pointer for rank `r`'s chunk, relative to `begin(r)`.
    pub fn cursor(&self, r: usize) -> usize {
        self.cursors[r]
    }

    /// Reset every chunk's cursor and contents for a fresh round.
    pub fn reset(&mut self) {
        self.cursors.iter_mut().for_each(|c| *c = 0);
        self.records.iter_mut().for_each(|rec| *rec = T::default());
    }

    /// Grow to a new chunk size, preserving rank count; used by adaptive
    /// back-pressure (spec.md §4.6 "Back-pressure via buffer doubling").
    /// Always followed by a `reset`, so existing contents are discarded.
    pub fn resize_chunk(&mut self, new_chunk_size: usize) {
        self.chunk_size = new_chunk_size;
        self.records = vec![T::default(); self.num_ranks * new_chunk_size];
        self.cursors = vec![0; self.num_ranks];
    }

    /// Write `record` at `cursor(r)` and advance it. Fails (no-op, returns
    /// `false`) once only the reserved marker slot remains.
    pub fn place(&mut self, r: usize, record: T) -> bool {
        if self.cursors[r] + 1 >= self.chunk_size {
            return false;
        }
        let idx = self.begin(r) + self.cursors[r];
        self.records[idx] = record;
        self.cursors[r] += 1;
        true
    }

    /// Mark the last record written to rank `r`'s chunk as the chunk's end.
    /// No-op if nothing has been written (see [`SendBuffer::set_invalid_marker`]).
    pub fn set_end_marker(&mut self, r: usize) {
        if self.cursors[r] > 0 {
            let idx = self.begin(r) + self.cursors[r] - 1;
            self.records[idx].set_marker(Marker::End);
        }
    }

    /// Mark rank `r`'s chunk as carrying no data this round (written at
    /// slot 0, per spec.md §4.5's chunk read protocol).
    pub fn set_invalid_marker(&mut self, r: usize) {
        let idx = self.begin(r);
        self.records[idx].set_marker(Marker::Invalid);
    }

    /// Mark rank `r`'s chunk complete: this rank has delivered all its data
    /// for the slice. Written at the chunk's reserved last slot.
    pub fn set_complete_marker(&mut self, r: usize) {
        let idx = self.end(r) - 1;
        self.records[idx].set_marker(Marker::Complete);
    }

    /// Raw contiguous records, for handing to the transport.
    pub fn as_slice(&self) -> &[T] {
        &self.records
    }
}

/// The receive side: a flat buffer filled by the transport after the
/// all-to-all exchange, read one chunk per remote rank.
#[derive(Debug, Clone)]
pub struct RecvBuffer<T: ChunkRecord> {
    records: Vec<T>,
    chunk_size: usize,
    num_ranks: usize,
}

impl<T: ChunkRecord> RecvBuffer<T> {
    /// Build a buffer with `num_ranks` chunks of `chunk_size` records each.
    pub fn new(num_ranks: usize, chunk_size: usize) -> Self {
        Self {
            records: vec![T::default(); num_ranks * chunk_size],
            chunk_size,
            num_ranks,
        }
    }

    /// Records per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks (ranks).
    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    /// Mutable access to the raw contiguous records, for the transport to
    /// fill after the all-to-all exchange.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.records
    }

    /// Grow to a new chunk size, preserving rank count.
    pub fn resize_chunk(&mut self, new_chunk_size: usize) {
        self.chunk_size = new_chunk_size;
        self.records = vec![T::default(); self.num_ranks * new_chunk_size];
    }

    /// `true` if rank `r`'s chunk carries the "this rank has delivered all
    /// its data for the slice" marker in its reserved last slot.
    pub fn is_complete(&self, r: usize) -> bool {
        self.records[(r + 1) * self.chunk_size - 1].marker() == Marker::Complete
    }

    /// Read rank `r`'s chunk per spec.md §4.5's protocol: if slot 0 is
    /// `Invalid`, nothing was sent; otherwise yield records from slot 0
    /// until (and including) the first `End` or `Complete` marker.
    pub fn records(&self, r: usize) -> impl Iterator<Item = &T> {
        let begin = r * self.chunk_size;
        let end = begin + self.chunk_size;
        let invalid = self.records[begin].marker() == Marker::Invalid;
        self.records[begin..end]
            .iter()
            .take(if invalid { 0 } else { self.chunk_size })
            .scan(false, |stopped, rec| {
                if *stopped {
                    return None;
                }
                if rec.marker() == Marker::End || rec.marker() == Marker::Complete {
                    *stopped = true;
                }
                Some(rec)
            })
    }
}
