//! Wire records: routing descriptors exchanged between ranks
//!
//! [`Target`] is the routing descriptor a spike register entry carries
//! in-process; [`SpikeData`]/[`OffGridSpikeData`] are the records that
//! actually cross the all-to-all exchange (they additionally carry `lag`
//! and a [`Marker`]); [`TargetData`] is the analogous record for the
//! one-time, connection-build-time target-table gather (spec.md §4.6).

use crate::ids::{LocalCid, NodeId, RankId, SynId, ThreadId};
use core::fmt;

/// Tag embedded in the last (or first) record of a send-buffer chunk to
/// signal chunk boundaries and rank completion (spec.md §4.5/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Marker {
    /// No special meaning; an ordinary data record.
    #[default]
    None,
    /// Last valid record in this chunk for this round.
    End,
    /// This rank has delivered all its data for this slice; written in the
    /// chunk's last slot.
    Complete,
    /// This rank sent nothing this round; written in the chunk's first
    /// slot.
    Invalid,
}

/// A routing descriptor for one outgoing connection, as accumulated in the
/// per-thread spike register (spec.md §3 "Target").
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Target {
    /// Destination process.
    pub rank: RankId,
    /// Destination thread on that process.
    pub tid: ThreadId,
    /// Connection-model index.
    pub syn_id: SynId,
    /// Local connection index within that model on that thread.
    pub lcid: LocalCid,
    /// Sub-step offset in `[0, h)`, for off-grid (precise) delivery.
    pub offset: Option<f64>,
    /// Set by the gather loop once this entry has been copied into a send
    /// buffer; used to drain the register without double-sending.
    pub processed: bool,
}

impl Target {
    /// Create a new, unprocessed on-grid target.
    pub fn new(rank: RankId, tid: ThreadId, syn_id: SynId, lcid: LocalCid) -> Self {
        Self {
            rank,
            tid,
            syn_id,
            lcid,
            offset: None,
            processed: false,
        }
    }

    /// Create a new, unprocessed off-grid target carrying a sub-step offset.
    pub fn with_offset(
        rank: RankId,
        tid: ThreadId,
        syn_id: SynId,
        lcid: LocalCid,
        offset: f64,
    ) -> Self {
        Self {
            rank,
            tid,
            syn_id,
            lcid,
            offset: Some(offset),
            processed: false,
        }
    }
}

/// On-grid spike record as carried over the wire (spec.md §3 "SpikeData").
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpikeData {
    /// Destination thread; used by the receiver to decide whether to act on
    /// this record.
    pub tid: ThreadId,
    /// Connection-model index.
    pub syn_id: SynId,
    /// Local connection index.
    pub lcid: LocalCid,
    /// Offset within the min-delay slice at which this spike was emitted,
    /// in `[0, min_delay)`.
    pub lag: u32,
    /// Chunk marker.
    pub marker: Marker,
}

impl SpikeData {
    /// Build a plain data record (marker `None`) from a routed target and
    /// its lag within the current slice.
    pub fn from_target(target: &Target, lag: u32) -> Self {
        Self {
            tid: target.tid,
            syn_id: target.syn_id,
            lcid: target.lcid,
            lag,
            marker: Marker::None,
        }
    }

    /// `true` if `marker` is `End` or `Complete` (both end a chunk scan).
    pub fn ends_chunk(&self) -> bool {
        matches!(self.marker, Marker::End | Marker::Complete)
    }
}

/// Off-grid ("precise") spike record: a [`SpikeData`] plus a sub-step
/// offset (spec.md §3 "OffGridSpikeData").
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OffGridSpikeData {
    /// The on-grid fields.
    pub base: SpikeData,
    /// Sub-step offset in `[0, h)`.
    pub offset: f64,
}

impl OffGridSpikeData {
    /// Build a precise record from a routed (off-grid) target and its lag.
    pub fn from_target(target: &Target, lag: u32) -> Self {
        Self {
            base: SpikeData::from_target(target, lag),
            offset: target.offset.unwrap_or(0.0),
        }
    }

    /// `true` if `marker` is `End` or `Complete`.
    pub fn ends_chunk(&self) -> bool {
        self.base.ends_chunk()
    }
}

/// Target-table record exchanged once at connection-build time, mapping a
/// source node to the routing descriptor a remote rank should hold for it
/// (spec.md §4.6 "Target-table gather").
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetData {
    /// The source node on the sending rank.
    pub source: NodeId,
    /// The routing descriptor the receiving rank should record.
    pub target: Target,
    /// Chunk marker.
    pub marker: Marker,
}

/// A continuous-valued event exchanged via the dense secondary-event gather
/// (SPEC_FULL.md §4 "Secondary-event gather"), e.g. a gap-junction or
/// rate-connection payload. The payload is an opaque `f64`; no concrete
/// secondary-event producer is in scope here (spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SecondaryEventData {
    /// Destination thread.
    pub tid: ThreadId,
    /// Connection-model index.
    pub syn_id: SynId,
    /// Local connection index.
    pub lcid: LocalCid,
    /// Opaque payload value.
    pub value: f64,
    /// Chunk marker.
    pub marker: Marker,
}

impl SecondaryEventData {
    /// Build a plain (unmarked) secondary-event record addressed to the
    /// connection a routed target describes.
    pub fn new(target: &Target, value: f64) -> Self {
        Self {
            tid: target.tid,
            syn_id: target.syn_id,
            lcid: target.lcid,
            value,
            marker: Marker::None,
        }
    }
}

impl TargetData {
    /// Build a plain (unmarked) target-table record.
    pub fn new(source: NodeId, target: Target) -> Self {
        Self {
            source,
            target,
            marker: Marker::None,
        }
    }

    /// `true` if `marker` is `End` or `Complete`.
    pub fn ends_chunk(&self) -> bool {
        matches!(self.marker, Marker::End | Marker::Complete)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Marker::None => "none",
            Marker::End => "end",
            Marker::Complete => "complete",
            Marker::Invalid => "invalid",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target::new(RankId::new(1), ThreadId::new(0), SynId::new(2), LocalCid::new(5))
    }

    #[test]
    fn spike_data_from_target_carries_routing_fields() {
        let t = target();
        let sd = SpikeData::from_target(&t, 3);
        assert_eq!(sd.tid, t.tid);
        assert_eq!(sd.syn_id, t.syn_id);
        assert_eq!(sd.lcid, t.lcid);
        assert_eq!(sd.lag, 3);
        assert!(!sd.ends_chunk());
    }

    #[test]
    fn end_and_complete_both_end_chunk_scan() {
        let mut sd = SpikeData::from_target(&target(), 0);
        sd.marker = Marker::End;
        assert!(sd.ends_chunk());
        sd.marker = Marker::Complete;
        assert!(sd.ends_chunk());
        sd.marker = Marker::Invalid;
        assert!(!sd.ends_chunk());
    }

    #[test]
    fn off_grid_spike_data_carries_offset() {
        let t = Target::with_offset(RankId::new(0), ThreadId::new(0), SynId::new(0), LocalCid::new(0), 0.037);
        let ogsd = OffGridSpikeData::from_target(&t, 1);
        assert_eq!(ogsd.offset, 0.037);
    }
}
