//! Identifier, time, and wire-record types shared by the snnk scheduling
//! kernel and its node/connection collaborators.
//!
//! This crate holds no scheduling logic of its own; it is the vocabulary
//! `snnk-kernel`'s clock, ring buffers and delivery manager are built on, in
//! the same role `shnn-storage` plays for `shnn-runtime` in the codebase
//! this workspace is modeled on.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod ids;
pub mod target;
pub mod time;

pub use ids::{LocalCid, NodeId, RankId, SynId, ThreadId};
pub use target::{Marker, OffGridSpikeData, SecondaryEventData, SpikeData, Target, TargetData};
pub use time::{Step, Tics, TimeConfig};

/// Crate version, for compatibility checks by dependents.
pub const TYPES_VERSION: u32 = 1;
