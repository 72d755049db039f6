//! Time-sliced event-delivery and scheduling engine for discrete-event
//! spiking network simulation.
//!
//! This crate is the simulation kernel only: the global clock and
//! min-delay/max-delay slicing, per-target ring buffers, the modulo table
//! that addresses them, per-thread spike registers, the send/recv buffers
//! and round-based gather protocol that move spikes between processes, and
//! the top-level [`simulation::SimulationManager`] driver. Neuron dynamics,
//! connection/weight storage, network construction, and the transport's
//! wire-level implementation are deliberately out of scope; the kernel
//! reaches them only through the [`node::Node`], [`connection::ConnectionManager`],
//! and [`transport::Transport`] traits.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod comm_buffer;
pub mod connection;
pub mod delivery;
pub mod error;
pub mod moduli;
pub mod node;
pub mod ring_buffer;
pub mod simulation;
pub mod spike_register;
pub mod transport;

pub use clock::Clock;
pub use comm_buffer::{ChunkRecord, RecvBuffer, SendBuffer};
pub use connection::ConnectionManager;
pub use delivery::{gather_secondary_events, gather_spike_data, gather_target_data, AssignedRanks, DeliveryStats, SpikeRecord};
pub use error::{KernelError, Result};
pub use moduli::ModuloTable;
pub use node::{CurrentEvent, DataLoggingRequest, Event, Node, SpikeEvent, SpikeSink};
pub use ring_buffer::{RingBuffer, SliceRingBuffer};
pub use simulation::{KernelStatus, SimulationManager};
pub use spike_register::{SpikeRegister, ThreadRegister};
pub use transport::{InProcessTransport, LoopbackTransport, Transport};

/// Crate version, reported by `snnk status` and for compatibility checks.
pub const KERNEL_VERSION: u32 = 1;
