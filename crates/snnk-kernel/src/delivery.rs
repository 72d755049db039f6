//! Event Delivery Manager (spec.md §4.6)
//!
//! The protocol heart of the kernel: per slice, collocate each thread's
//! spike register into send-buffer chunks, exchange once via the all-to-all
//! [`Transport`](crate::transport::Transport), deliver incoming records into
//! the connection library, and repeat until every rank has reported
//! `complete`. [`gather_target_data`] runs the same round structure once at
//! connection-build time, carrying `TargetData` instead of spike records;
//! [`gather_secondary_events`] runs it per slice for non-spike,
//! continuous-valued events, gated off by default.
//!
//! The round loop below runs sequentially over owning threads rather than
//! on an OS thread pool: each thread's register slice is still written and
//! drained by exactly that thread's logic (spec.md §5 "shared resource
//! policy"), but nothing in the protocol's correctness depends on the
//! collocate/deliver steps actually running concurrently, so the simpler
//! sequential driver is used here and real fork-join parallelism is
//! reserved for the node-update phase in [`crate::simulation`].

use snnk_types::{LocalCid, NodeId, RankId, SecondaryEventData, SynId, Target, TargetData, ThreadId};

use crate::comm_buffer::{ChunkRecord, RecvBuffer, SendBuffer};
use crate::spike_register::SpikeRegister;
use crate::transport::Transport;

/// Round-robin partition of ranks across local threads (spec.md §4.6
/// "Round-robin rank assignment"). `ranks()` is the stride of global ranks
/// this thread owns; `lr_idx` maps a rank back to its position in that
/// stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignedRanks {
    tid: usize,
    num_threads: usize,
    num_ranks: usize,
}

impl AssignedRanks {
    /// Build the rank assignment for thread `tid` out of `num_threads`,
    /// against a cluster of `num_ranks` processes.
    pub fn new(tid: usize, num_threads: usize, num_ranks: usize) -> Self {
        Self {
            tid,
            num_threads,
            num_ranks,
        }
    }

    /// The global ranks owned by this thread, in ascending order.
    pub fn ranks(&self) -> impl Iterator<Item = usize> {
        (self.tid..self.num_ranks).step_by(self.num_threads.max(1))
    }

    /// Local index of `rank` within this thread's stride. Only valid for a
    /// rank actually owned by this thread (use [`AssignedRanks::owns`] to check).
    pub fn lr_idx(&self, rank: usize) -> usize {
        (rank - self.tid) / self.num_threads.max(1)
    }

    /// `true` if `rank` belongs to this thread's stride.
    pub fn owns(&self, rank: usize) -> bool {
        rank >= self.tid && (rank - self.tid) % self.num_threads.max(1) == 0
    }
}

/// A wire record that can be built from a routed [`Target`] and carries
/// enough of its own fields back out to dispatch delivery.
pub trait SpikeRecord: ChunkRecord {
    /// Build a plain data record from a routed target and its lag within
    /// the current slice.
    fn from_target(target: &Target, lag: u32) -> Self;
    /// Destination thread.
    fn tid(&self) -> ThreadId;
    /// Connection-model index.
    fn syn_id(&self) -> SynId;
    /// Local connection index.
    fn lcid(&self) -> LocalCid;
    /// Lag within the slice this record was emitted at.
    fn lag(&self) -> u32;
    /// Sub-step offset, for off-grid delivery.
    fn offset(&self) -> Option<f64>;
}

impl SpikeRecord for snnk_types::SpikeData {
    fn from_target(target: &Target, lag: u32) -> Self {
        snnk_types::SpikeData::from_target(target, lag)
    }
    fn tid(&self) -> ThreadId {
        self.tid
    }
    fn syn_id(&self) -> SynId {
        self.syn_id
    }
    fn lcid(&self) -> LocalCid {
        self.lcid
    }
    fn lag(&self) -> u32 {
        self.lag
    }
    fn offset(&self) -> Option<f64> {
        None
    }
}

impl SpikeRecord for snnk_types::OffGridSpikeData {
    fn from_target(target: &Target, lag: u32) -> Self {
        snnk_types::OffGridSpikeData::from_target(target, lag)
    }
    fn tid(&self) -> ThreadId {
        self.base.tid
    }
    fn syn_id(&self) -> SynId {
        self.base.syn_id
    }
    fn lcid(&self) -> LocalCid {
        self.base.lcid
    }
    fn lag(&self) -> u32 {
        self.base.lag
    }
    fn offset(&self) -> Option<f64> {
        Some(self.offset)
    }
}

/// Per-slice communication counters, exposed via `get_kernel_status`
/// (SPEC_FULL.md §4 supplemented features).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryStats {
    /// Number of collocate/exchange/deliver rounds the last gather needed.
    pub comm_rounds_spike_data: u64,
    /// Number of all-to-all exchanges actually issued (equal to
    /// `comm_rounds_spike_data` in this implementation, kept distinct
    /// because NEST's source tracks them as separate counters).
    pub comm_steps_spike_data: u64,
}

/// Drive collocate → markers → exchange → deliver rounds until `collocate`
/// reports everything drained and `deliver` reports every rank complete.
fn run_gather_rounds<T: ChunkRecord>(
    send: &mut SendBuffer<T>,
    recv: &mut RecvBuffer<T>,
    transport: &dyn Transport<T>,
    adaptive: bool,
    mut collocate: impl FnMut(&mut SendBuffer<T>) -> bool,
    mut deliver: impl FnMut(&RecvBuffer<T>) -> bool,
) -> DeliveryStats {
    let mut rounds = 0u64;
    loop {
        rounds += 1;
        send.reset();
        let all_drained = collocate(send);
        for r in 0..send.num_ranks() {
            if send.cursor(r) == 0 {
                send.set_invalid_marker(r);
            } else {
                send.set_end_marker(r);
            }
            if all_drained {
                send.set_complete_marker(r);
            }
        }
        transport.exchange(send.as_slice(), recv.as_mut_slice());
        let all_remote_complete = deliver(recv);
        if all_drained && all_remote_complete {
            return DeliveryStats {
                comm_rounds_spike_data: rounds,
                comm_steps_spike_data: rounds,
            };
        }
        if !all_drained && adaptive {
            let new_size = send.chunk_size() * 2;
            send.resize_chunk(new_size);
            recv.resize_chunk(new_size);
        }
    }
}

/// Drain `register` into `send`, exchange via `transport`, and invoke
/// `on_deliver(tid, syn_id, lcid, lag, offset)` for every incoming record
/// addressed to a thread this process owns (spec.md §4.6 "phase SPIKES").
pub fn gather_spike_data<T: SpikeRecord>(
    send: &mut SendBuffer<T>,
    recv: &mut RecvBuffer<T>,
    transport: &dyn Transport<T>,
    adaptive: bool,
    register: &mut SpikeRegister,
    mut on_deliver: impl FnMut(ThreadId, SynId, LocalCid, u32, Option<f64>),
) -> DeliveryStats {
    run_gather_rounds(
        send,
        recv,
        transport,
        adaptive,
        |send| {
            let mut all_drained = true;
            for t in 0..register.num_threads() {
                let treg = register.thread_mut(ThreadId::new(t as u32));
                let mut placed_all = true;
                treg.iterate(|lag, target| {
                    if target.processed {
                        return;
                    }
                    let rank = target.rank.raw() as usize;
                    let record = T::from_target(target, lag as u32);
                    if send.place(rank, record) {
                        target.processed = true;
                    } else {
                        placed_all = false;
                    }
                });
                treg.clean();
                if !placed_all {
                    all_drained = false;
                }
            }
            all_drained
        },
        |recv| {
            let mut all_complete = true;
            for r in 0..recv.num_ranks() {
                for rec in recv.records(r) {
                    on_deliver(rec.tid(), rec.syn_id(), rec.lcid(), rec.lag(), rec.offset());
                }
                if !recv.is_complete(r) {
                    all_complete = false;
                }
            }
            all_complete
        },
    )
}

/// Run the one-time target-table gather (spec.md §4.6 "Target-table
/// gather"): pull `(source, target)` pairs from `next_entry` until
/// exhausted, exchanging via `transport`, and invoke
/// `on_target(tid, rank, target_data)` for every incoming record.
pub fn gather_target_data(
    send: &mut SendBuffer<TargetData>,
    recv: &mut RecvBuffer<TargetData>,
    transport: &dyn Transport<TargetData>,
    adaptive: bool,
    mut next_entry: impl FnMut() -> Option<(NodeId, Target)>,
    mut on_target: impl FnMut(ThreadId, RankId, TargetData),
) -> DeliveryStats {
    let mut pending: Option<(NodeId, Target)> = None;
    run_gather_rounds(
        send,
        recv,
        transport,
        adaptive,
        |send| loop {
            let (source, target) = match pending.take().or_else(&mut next_entry) {
                Some(entry) => entry,
                None => return true,
            };
            let rank = target.rank.raw() as usize;
            let record = TargetData::new(source, target);
            if !send.place(rank, record) {
                pending = Some((source, target));
                return false;
            }
        },
        |recv| {
            let mut all_complete = true;
            for r in 0..recv.num_ranks() {
                for rec in recv.records(r) {
                    on_target(rec.target.tid, RankId::new(r as u32), *rec);
                }
                if !recv.is_complete(r) {
                    all_complete = false;
                }
            }
            all_complete
        },
    )
}

/// Run the dense secondary-event gather (SPEC_FULL.md §4 "Secondary-event
/// gather"), gated at the call site by `KernelStatus::secondary_events_enabled`
/// (default off, spec.md §9 open question on non-spike event kinds): pull
/// `(target, value)` pairs from `next_entry` until exhausted, exchange once
/// via `transport`, and invoke `on_receive(tid, syn_id, lcid, value)` for
/// every incoming record. No concrete secondary-event producer is in scope
/// here; this is the same round structure as [`gather_target_data`], over a
/// different wire record.
pub fn gather_secondary_events(
    send: &mut SendBuffer<SecondaryEventData>,
    recv: &mut RecvBuffer<SecondaryEventData>,
    transport: &dyn Transport<SecondaryEventData>,
    adaptive: bool,
    mut next_entry: impl FnMut() -> Option<(Target, f64)>,
    mut on_receive: impl FnMut(ThreadId, SynId, LocalCid, f64),
) -> DeliveryStats {
    let mut pending: Option<(Target, f64)> = None;
    run_gather_rounds(
        send,
        recv,
        transport,
        adaptive,
        |send| loop {
            let (target, value) = match pending.take().or_else(&mut next_entry) {
                Some(entry) => entry,
                None => return true,
            };
            let rank = target.rank.raw() as usize;
            let record = SecondaryEventData::new(&target, value);
            if !send.place(rank, record) {
                pending = Some((target, value));
                return false;
            }
        },
        |recv| {
            let mut all_complete = true;
            for r in 0..recv.num_ranks() {
                for rec in recv.records(r) {
                    on_receive(rec.tid, rec.syn_id, rec.lcid, rec.value);
                }
                if !recv.is_complete(r) {
                    all_complete = false;
                }
            }
            all_complete
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spike_register::SpikeRegister;
    use crate::transport::LoopbackTransport;
    use snnk_types::{LocalCid, SpikeData, SynId};

    #[test]
    fn assigned_ranks_partition_is_exhaustive_and_disjoint() {
        let num_threads = 3;
        let num_ranks = 10;
        let mut seen = vec![false; num_ranks];
        for t in 0..num_threads {
            let assigned = AssignedRanks::new(t, num_threads, num_ranks);
            for rank in assigned.ranks() {
                assert!(!seen[rank], "rank {rank} claimed by more than one thread");
                seen[rank] = true;
                assert!(assigned.owns(rank));
                assert_eq!(assigned.lr_idx(rank) * num_threads + t, rank);
            }
        }
        assert!(seen.iter().all(|&s| s), "every rank must be assigned");
    }

    #[test]
    fn single_rank_single_thread_gather_delivers_all_spikes() {
        let mut register = SpikeRegister::new(1, 2);
        let target = Target::new(RankId::new(0), ThreadId::new(0), SynId::new(1), LocalCid::new(7));
        register.thread_mut(ThreadId::new(0)).emit(0, target);
        register.thread_mut(ThreadId::new(0)).emit(1, target);

        let mut send = SendBuffer::<SpikeData>::new(1, 8);
        let mut recv = RecvBuffer::<SpikeData>::new(1, 8);
        let transport = LoopbackTransport;
        let mut delivered = Vec::new();
        let stats = gather_spike_data(&mut send, &mut recv, &transport, false, &mut register, |tid, syn, lcid, lag, offset| {
            delivered.push((tid, syn, lcid, lag, offset));
        });

        assert_eq!(stats.comm_rounds_spike_data, 1);
        assert_eq!(delivered.len(), 2);
        assert!(delivered.iter().all(|d| d.1 == SynId::new(1) && d.2 == LocalCid::new(7)));
        assert!(register.thread(ThreadId::new(0)).is_drained());
    }

    #[test]
    fn zero_spikes_round_produces_invalid_and_complete_markers() {
        let mut register = SpikeRegister::new(1, 1);
        let mut send = SendBuffer::<SpikeData>::new(1, 4);
        let mut recv = RecvBuffer::<SpikeData>::new(1, 4);
        let transport = LoopbackTransport;
        let stats = gather_spike_data(&mut send, &mut recv, &transport, false, &mut register, |_, _, _, _, _| {
            panic!("no spikes should be delivered");
        });
        assert_eq!(stats.comm_rounds_spike_data, 1);
        assert!(recv.is_complete(0));
        assert_eq!(recv.records(0).count(), 0);
    }

    #[test]
    fn undersized_buffer_needs_multiple_rounds_without_adaptive() {
        let mut register = SpikeRegister::new(1, 1);
        let target = Target::new(RankId::new(0), ThreadId::new(0), SynId::new(0), LocalCid::new(0));
        for _ in 0..5 {
            register.thread_mut(ThreadId::new(0)).emit(0, target);
        }
        // chunk_size 2: one data slot + marker slot, forcing 5 rounds.
        let mut send = SendBuffer::<SpikeData>::new(1, 2);
        let mut recv = RecvBuffer::<SpikeData>::new(1, 2);
        let transport = LoopbackTransport;
        let mut count = 0;
        let stats = gather_spike_data(&mut send, &mut recv, &transport, false, &mut register, |_, _, _, _, _| {
            count += 1;
        });
        assert_eq!(count, 5);
        assert_eq!(stats.comm_rounds_spike_data, 5);
    }

    #[test]
    fn adaptive_buffering_grows_chunk_and_completes_in_one_round_after_resize() {
        let mut register = SpikeRegister::new(1, 1);
        let target = Target::new(RankId::new(0), ThreadId::new(0), SynId::new(0), LocalCid::new(0));
        for _ in 0..5 {
            register.thread_mut(ThreadId::new(0)).emit(0, target);
        }
        let mut send = SendBuffer::<SpikeData>::new(1, 2);
        let mut recv = RecvBuffer::<SpikeData>::new(1, 2);
        let transport = LoopbackTransport;
        let mut count = 0;
        let stats = gather_spike_data(&mut send, &mut recv, &transport, true, &mut register, |_, _, _, _, _| {
            count += 1;
        });
        assert_eq!(count, 5, "adaptive buffering must not drop or duplicate spikes");
        assert!(stats.comm_rounds_spike_data >= 2, "growth happens after an undersized round");
    }

    #[test]
    fn gather_secondary_events_delivers_every_value_once() {
        let mut entries = vec![
            (Target::new(RankId::new(0), ThreadId::new(0), SynId::new(3), LocalCid::new(0)), 0.25),
            (Target::new(RankId::new(0), ThreadId::new(0), SynId::new(3), LocalCid::new(1)), -0.5),
        ]
        .into_iter();
        let mut send = SendBuffer::<SecondaryEventData>::new(1, 8);
        let mut recv = RecvBuffer::<SecondaryEventData>::new(1, 8);
        let transport = LoopbackTransport;
        let mut received = Vec::new();
        let stats = gather_secondary_events(&mut send, &mut recv, &transport, false, || entries.next(), |tid, syn_id, lcid, value| {
            received.push((tid, syn_id, lcid, value));
        });
        assert_eq!(stats.comm_rounds_spike_data, 1);
        assert_eq!(received.len(), 2);
        assert!(received.iter().any(|r| r.3 == 0.25));
        assert!(received.iter().any(|r| r.3 == -0.5));
    }

    #[test]
    fn gather_target_data_delivers_every_entry_once() {
        let mut entries = vec![
            (NodeId::new(1), Target::new(RankId::new(0), ThreadId::new(0), SynId::new(0), LocalCid::new(0))),
            (NodeId::new(2), Target::new(RankId::new(0), ThreadId::new(0), SynId::new(0), LocalCid::new(1))),
        ]
        .into_iter();
        let mut send = SendBuffer::<TargetData>::new(1, 8);
        let mut recv = RecvBuffer::<TargetData>::new(1, 8);
        let transport = LoopbackTransport;
        let mut received = Vec::new();
        gather_target_data(&mut send, &mut recv, &transport, false, || entries.next(), |tid, rank, td| {
            received.push((tid, rank, td.source));
        });
        assert_eq!(received.len(), 2);
    }
}
