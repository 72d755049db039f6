//! Simulation Manager (spec.md §4.7) and the Kernel API surface of spec.md §6
//!
//! Grounded on `shnn_runtime::simulation::SimulationEngine`'s builder/run
//! shape and `shnn_runtime::network::SNNNetwork`'s id-allocation style, but
//! replacing their direct neuron/synapse ownership with dispatch through
//! the opaque [`Node`]/[`ConnectionManager`] collaborators (spec.md §1).

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use snnk_types::{LocalCid, NodeId, RankId, SpikeData, SynId, Target, ThreadId, TimeConfig};

use crate::clock::Clock;
use crate::comm_buffer::{RecvBuffer, SendBuffer};
use crate::connection::ConnectionManager;
use crate::delivery::{self, DeliveryStats};
use crate::error::{KernelError, Result};
use crate::moduli::ModuloTable;
use crate::node::Node;
use crate::ring_buffer::RingBuffer;
use crate::spike_register::SpikeRegister;
use crate::transport::Transport;

/// The settable/readable options of `set_kernel_status`/`get_kernel_status`
/// (spec.md §6). `resolution` and `total_num_virtual_procs` may only change
/// while the network is empty; `tics_per_ms`/`tics_per_step` are read-only
/// after kernel construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelStatus {
    /// Simulation resolution `h`, in milliseconds.
    pub resolution: f64,
    /// Total number of virtual processes across the whole run.
    pub total_num_virtual_procs: usize,
    /// Whether off-grid (precise) spike delivery is enabled.
    pub off_grid_spiking: bool,
    /// Whether recording devices may overwrite existing output files.
    pub overwrite_files: bool,
    /// Whether the spike-data send/recv buffer grows on overflow.
    pub adaptive_spike_buffers: bool,
    /// Whether the target-data send/recv buffer grows on overflow.
    pub adaptive_target_buffers: bool,
    /// Records per rank chunk for the spike-data gather.
    pub buffer_size_spike_data: usize,
    /// Records per rank chunk for the target-data gather.
    pub buffer_size_target_data: usize,
    /// Whether the per-slice dense secondary-event gather runs at all
    /// (SPEC_FULL.md §4 "Secondary-event gather"). Off by default: no
    /// concrete secondary-event producer is in scope here, so there is
    /// nothing for it to carry until a node/connection library wires one up.
    pub secondary_events_enabled: bool,
    /// Tics per millisecond. Read-only after construction.
    pub tics_per_ms: f64,
    /// Tics per simulation step. Read-only after construction.
    pub tics_per_step: u64,
}

impl Default for KernelStatus {
    fn default() -> Self {
        let time_config = TimeConfig::default();
        Self {
            resolution: time_config.resolution_ms(),
            total_num_virtual_procs: 1,
            off_grid_spiking: false,
            overwrite_files: false,
            adaptive_spike_buffers: true,
            adaptive_target_buffers: true,
            buffer_size_spike_data: 256,
            buffer_size_target_data: 256,
            secondary_events_enabled: false,
            tics_per_ms: time_config.tics_per_ms,
            tics_per_step: time_config.tics_per_step,
        }
    }
}

type NodeFactory = Box<dyn Fn() -> Box<dyn Node>>;

struct PendingConnection {
    source: NodeId,
    target: NodeId,
    syn_id: SynId,
    delay_steps: u64,
    weight: f64,
}

/// Top-level driver (spec.md §4.7) and Kernel API surface (spec.md §6).
///
/// Generic over the on-grid spike record type (`SpikeData` by default) and
/// the all-to-all [`Transport`] it runs over, so the same driver code
/// serves single-process tests (`LoopbackTransport`) and the multi-rank
/// test double (`InProcessTransport`).
pub struct SimulationManager<Tr: Transport<SpikeData>> {
    status: KernelStatus,
    network_started: bool,
    node_models: HashMap<String, NodeFactory>,
    connection_models: HashMap<String, SynId>,
    nodes: Vec<Box<dyn Node>>,
    node_thread: Vec<ThreadId>,
    node_ring_buffers: Vec<RingBuffer>,
    outgoing: HashMap<NodeId, Vec<Target>>,
    pending_connections: Vec<PendingConnection>,
    min_delay: Option<u64>,
    max_delay: Option<u64>,
    num_threads: usize,
    num_ranks: usize,
    my_rank: RankId,
    transport: Tr,
    clock: Option<Clock>,
    moduli: Option<ModuloTable>,
    register: Option<SpikeRegister>,
    send: Option<SendBuffer<SpikeData>>,
    recv: Option<RecvBuffer<SpikeData>>,
    local_spike_counts: HashMap<NodeId, u64>,
    last_delivery_stats: DeliveryStats,
}

impl<Tr: Transport<SpikeData>> SimulationManager<Tr> {
    /// Build an empty kernel with `num_threads` local threads, participating
    /// as rank `my_rank` of `num_ranks`, over `transport`.
    pub fn new(num_threads: usize, num_ranks: usize, my_rank: RankId, transport: Tr) -> Result<Self> {
        if num_threads == 0 {
            return Err(KernelError::bad_property(
                "total_num_virtual_procs",
                "0",
                ">= 1",
            ));
        }
        let mut status = KernelStatus::default();
        status.total_num_virtual_procs = num_threads * num_ranks;
        Ok(Self {
            status,
            network_started: false,
            node_models: HashMap::new(),
            connection_models: HashMap::new(),
            nodes: Vec::new(),
            node_thread: Vec::new(),
            node_ring_buffers: Vec::new(),
            outgoing: HashMap::new(),
            pending_connections: Vec::new(),
            min_delay: None,
            max_delay: None,
            num_threads,
            num_ranks,
            my_rank,
            transport,
            clock: None,
            moduli: None,
            register: None,
            send: None,
            recv: None,
            local_spike_counts: HashMap::new(),
            last_delivery_stats: DeliveryStats::default(),
        })
    }

    /// Register a node-model factory under `name` (spec.md §6).
    pub fn register_node_model(&mut self, name: impl Into<String>, factory: impl Fn() -> Box<dyn Node> + 'static) {
        self.node_models.insert(name.into(), Box::new(factory));
    }

    /// Register a connection-model name (spec.md §6), assigning it the next
    /// `SynId`. The core only tracks the name for `UnknownSynapse`
    /// validation and routing; storage and dynamics belong to the
    /// connection library.
    pub fn register_connection_model(&mut self, name: impl Into<String>) {
        let syn_id = SynId::new(self.connection_models.len() as u16);
        self.connection_models.insert(name.into(), syn_id);
    }

    /// Create `n` nodes of `model`, assigning them round-robin across local
    /// threads, and return their allocated id range.
    ///
    /// # Errors
    /// [`KernelError::UnknownModel`] if `model` was never registered.
    pub fn create(&mut self, model: &str, n: u64) -> Result<Range<u64>> {
        let factory = self
            .node_models
            .get(model)
            .ok_or_else(|| KernelError::unknown_model(model))?;
        let start = self.nodes.len() as u64;
        for i in 0..n {
            self.nodes.push(factory());
            let tid = ThreadId::new(((start + i) % self.num_threads as u64) as u32);
            self.node_thread.push(tid);
            if let Some(moduli) = self.moduli.as_ref() {
                self.node_ring_buffers.push(RingBuffer::new(moduli.len()));
            }
        }
        self.network_started = true;
        Ok(start..start + n)
    }

    /// Queue a connection from every source to every target with the given
    /// connection model, delay, and weight. Actual registration with the
    /// connection library is deferred to [`SimulationManager::finalize_connections`]
    /// so `min_delay`/`max_delay` can be derived from the full connection
    /// set before any buffer is sized (spec.md §3 "min_delay and max_delay
    /// are global, constant for the duration of a run").
    ///
    /// # Errors
    /// [`KernelError::UnknownSynapse`] if `syn_model` was never registered,
    /// [`KernelError::BadProperty`] if `delay_steps == 0`.
    pub fn connect(&mut self, sources: &[NodeId], targets: &[NodeId], syn_model: &str, delay_steps: u64, weight: f64) -> Result<()> {
        let syn_id = *self
            .connection_models
            .get(syn_model)
            .ok_or_else(|| KernelError::unknown_synapse(syn_model))?;
        if delay_steps == 0 {
            return Err(KernelError::bad_property("delay_steps", "0", ">= 1 step"));
        }
        self.min_delay = Some(self.min_delay.map_or(delay_steps, |d| d.min(delay_steps)));
        self.max_delay = Some(self.max_delay.map_or(delay_steps, |d| d.max(delay_steps)));
        for &source in sources {
            for &target in targets {
                self.pending_connections.push(PendingConnection {
                    source,
                    target,
                    syn_id,
                    delay_steps,
                    weight,
                });
            }
        }
        Ok(())
    }

    /// Hand every queued connection to `connection_manager`, recording the
    /// resulting local connection id into this node's outgoing target list.
    /// Must run once before the first `simulate`.
    fn finalize_connections(&mut self, connection_manager: &mut dyn ConnectionManager) {
        for pending in self.pending_connections.drain(..) {
            let lcid = connection_manager.add_connection(
                pending.source,
                pending.target,
                pending.syn_id,
                pending.delay_steps,
                pending.weight,
            );
            let target_tid = self.node_thread[pending.target.raw() as usize];
            let target = Target::new(self.my_rank, target_tid, pending.syn_id, lcid);
            self.outgoing.entry(pending.source).or_default().push(target);
        }
    }

    /// Build the clock, modulo table, spike register, and gather buffers
    /// from the connection set's delay bounds. No-op if already built.
    fn ensure_scheduling_state(&mut self) -> Result<()> {
        if self.clock.is_some() {
            return Ok(());
        }
        let min_delay = self.min_delay.unwrap_or(1);
        let max_delay = self.max_delay.unwrap_or(min_delay);
        let time_config = TimeConfig {
            tics_per_ms: self.status.tics_per_ms,
            tics_per_step: self.status.tics_per_step,
        };
        let clock = Clock::new(min_delay, max_delay, time_config)?;
        let moduli = ModuloTable::new(clock.now_steps().raw(), min_delay, max_delay);
        if self.node_ring_buffers.is_empty() {
            self.node_ring_buffers = (0..self.nodes.len()).map(|_| RingBuffer::new(moduli.len())).collect();
        }
        self.moduli = Some(moduli);
        self.register = Some(SpikeRegister::new(self.num_threads, min_delay as usize));
        self.send = Some(SendBuffer::new(self.num_ranks, self.status.buffer_size_spike_data));
        self.recv = Some(RecvBuffer::new(self.num_ranks, self.status.buffer_size_spike_data));
        self.clock = Some(clock);
        Ok(())
    }

    /// Run the simulation for `duration_ms`, driving `connection_manager`
    /// for delivery and `finalize_connections` on first call (spec.md §4.7).
    ///
    /// # Errors
    /// [`KernelError::KernelException`] if the network is empty or the
    /// clock cannot be constructed from the connection set's delay bounds.
    pub fn simulate(&mut self, duration_ms: f64, connection_manager: &mut dyn ConnectionManager) -> Result<()> {
        if !self.pending_connections.is_empty() {
            self.finalize_connections(connection_manager);
        }
        self.ensure_scheduling_state()?;
        let min_delay = self.min_delay.ok_or_else(|| {
            KernelError::kernel_exception("simulate called on an empty network")
        })?;

        let clock = self.clock.as_ref().unwrap();
        let duration_steps = clock.time_config().ms_to_steps(duration_ms);
        let num_slices = clock.slices_for(duration_steps);

        for slice in 0..num_slices {
            self.run_slice(min_delay, connection_manager)?;
            log::debug!("completed slice {}/{}", slice + 1, num_slices);
        }
        Ok(())
    }

    fn run_slice(&mut self, min_delay: u64, connection_manager: &mut dyn ConnectionManager) -> Result<()> {
        let origin = self.clock.as_ref().unwrap().now_steps();
        let max_delay = self.max_delay.unwrap_or(min_delay);

        // Deliver everything due this slice before any node updates: a
        // contribution written during an earlier slice's gather (at
        // `moduli[lag + d - 1]`) becomes due at `moduli[max_delay + lag]` of
        // the slice it arrives in (spec.md §3/§8 "arrival step s + d").
        {
            let moduli = self.moduli.as_ref().unwrap();
            for lag in 0..min_delay {
                let slot = moduli.modulus(max_delay as usize + lag as usize);
                for (idx, node) in self.nodes.iter_mut().enumerate() {
                    let value = self.node_ring_buffers[idx].get_value(slot);
                    if value != 0.0 {
                        use crate::node::{Event, SpikeEvent};
                        node.handle(Event::Spike(SpikeEvent {
                            stamp: origin.advanced_by(lag + 1),
                            weight: value,
                            multiplicity: 1,
                            offset: None,
                        }));
                    }
                }
            }
        }

        let mut freshly_emitted: Vec<(NodeId, u32)> = Vec::new();
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            let node_id = NodeId::new(idx as u64);
            node.update(origin, 0, min_delay as u32, &mut |lag| {
                freshly_emitted.push((node_id, lag));
            });
        }
        for (node_id, lag) in freshly_emitted {
            *self.local_spike_counts.entry(node_id).or_insert(0) += 1;
            let tid = self.node_thread[node_id.raw() as usize];
            if let Some(targets) = self.outgoing.get(&node_id) {
                let register = self.register.as_mut().unwrap();
                for &target in targets {
                    register.thread_mut(tid).emit(lag as usize, target);
                }
            }
        }

        let register = self.register.as_mut().unwrap();
        let send = self.send.as_mut().unwrap();
        let recv = self.recv.as_mut().unwrap();
        let transport = &self.transport;
        let adaptive = self.status.adaptive_spike_buffers;
        let nodes = &mut self.nodes;
        let moduli = self.moduli.as_ref().unwrap();
        let ring_buffers = &mut self.node_ring_buffers;
        let stats = delivery::gather_spike_data(send, recv, transport, adaptive, register, |tid, syn_id, lcid, lag, offset| {
            use crate::node::{Event, SpikeEvent};
            let stamp = origin.advanced_by(lag as u64);
            let event = Event::Spike(SpikeEvent {
                stamp,
                weight: 1.0,
                multiplicity: 1,
                offset,
            });
            if let Some((target, scaled_event, delay_steps)) = connection_manager.send(tid, syn_id, lcid, event) {
                match scaled_event {
                    Event::Spike(spike) => {
                        let slot = moduli.modulus((lag as u64 + delay_steps).saturating_sub(1) as usize);
                        if let Some(rb) = ring_buffers.get_mut(target.raw() as usize) {
                            rb.add_value(slot, spike.weight);
                        }
                    }
                    other => {
                        if let Some(node) = nodes.get_mut(target.raw() as usize) {
                            node.handle(other);
                        }
                    }
                }
            }
        });
        self.last_delivery_stats = stats;

        self.clock.as_mut().unwrap().advance_slice();
        let new_now = self.clock.as_ref().unwrap().now_steps().raw();
        self.moduli.as_mut().unwrap().update_moduli(new_now);
        Ok(())
    }

    /// Reset the clock, moduli, registers, and buffers to their construction
    /// state, and every node's dynamic state to its initial values. Node and
    /// connection registrations and the network topology survive.
    pub fn reset_kernel(&mut self) {
        if let Some(clock) = self.clock.as_mut() {
            clock.reset();
        }
        if let Some(moduli) = self.moduli.as_mut() {
            moduli.recompute(0);
        }
        if let Some(register) = self.register.as_mut() {
            register.reset_all();
        }
        for rb in self.node_ring_buffers.iter_mut() {
            rb.clear();
        }
        self.local_spike_counts.clear();
        self.last_delivery_stats = DeliveryStats::default();
        for node in self.nodes.iter_mut() {
            node.init_state();
        }
    }

    /// Apply a new kernel status.
    ///
    /// # Errors
    /// [`KernelError::BadProperty`] if `resolution` or
    /// `total_num_virtual_procs` change while the network is non-empty, or
    /// if `tics_per_ms`/`tics_per_step` change at all after construction.
    pub fn set_kernel_status(&mut self, status: KernelStatus) -> Result<()> {
        if self.network_started && (status.resolution - self.status.resolution).abs() > f64::EPSILON {
            return Err(KernelError::bad_property(
                "resolution",
                status.resolution.to_string(),
                "network must be empty to change resolution",
            ));
        }
        if self.network_started && status.total_num_virtual_procs != self.status.total_num_virtual_procs {
            return Err(KernelError::bad_property(
                "total_num_virtual_procs",
                status.total_num_virtual_procs.to_string(),
                "network must be empty to change process count",
            ));
        }
        if status.tics_per_ms != self.status.tics_per_ms || status.tics_per_step != self.status.tics_per_step {
            return Err(KernelError::bad_property(
                "tics_per_ms/tics_per_step",
                "changed",
                "read-only after kernel construction",
            ));
        }
        self.status = status;
        Ok(())
    }

    /// The kernel's current status dictionary.
    pub fn get_kernel_status(&self) -> KernelStatus {
        self.status
    }

    /// Per-node local spike counts accumulated since the last `reset_kernel`
    /// (SPEC_FULL.md §4 supplemented feature, grounded on NEST's
    /// `local_spike_counter_`).
    pub fn spike_counts(&self) -> &HashMap<NodeId, u64> {
        &self.local_spike_counts
    }

    /// Gather-round statistics from the most recently completed slice.
    pub fn delivery_stats(&self) -> DeliveryStats {
        self.last_delivery_stats
    }

    /// Current simulated time, in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.clock.as_ref().map_or(0.0, Clock::now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionManager;
    use crate::node::{Event, SpikeSink};
    use crate::transport::LoopbackTransport;

    struct FireOnce {
        fired: bool,
    }

    impl Node for FireOnce {
        fn update(&mut self, _origin: snnk_types::Step, from: u32, to: u32, emit: &mut SpikeSink<'_>) {
            if !self.fired && to > from {
                emit(from);
                self.fired = true;
            }
        }
        fn handle(&mut self, _event: Event) {}
        fn calibrate(&mut self) {}
        fn init_state(&mut self) {
            self.fired = false;
        }
        fn init_buffers(&mut self) {}
    }

    #[derive(Default)]
    struct NoopConnectionManager {
        next_lcid: u32,
    }

    impl ConnectionManager for NoopConnectionManager {
        fn add_connection(&mut self, _s: NodeId, _t: NodeId, _syn: SynId, _d: u64, _w: f64) -> LocalCid {
            let lcid = LocalCid::new(self.next_lcid);
            self.next_lcid += 1;
            lcid
        }
        fn send(&mut self, _tid: ThreadId, _syn_id: SynId, _lcid: LocalCid, _event: Event) -> Option<(NodeId, Event, u64)> {
            None
        }
        fn add_target(&mut self, _tid: ThreadId, _rank: RankId, _source: NodeId, _target: Target) {}
        fn get_next_target_data(&mut self) -> Option<(NodeId, Target)> {
            None
        }
    }

    #[test]
    fn create_rejects_unknown_model() {
        let mut kernel = SimulationManager::new(1, 1, RankId::new(0), LoopbackTransport).unwrap();
        assert!(kernel.create("does_not_exist", 1).is_err());
    }

    #[test]
    fn connect_rejects_unknown_synapse() {
        let mut kernel = SimulationManager::new(1, 1, RankId::new(0), LoopbackTransport).unwrap();
        kernel.register_node_model("fire_once", || Box::new(FireOnce { fired: false }));
        let ids = kernel.create("fire_once", 2).unwrap();
        let nodes: Vec<NodeId> = ids.map(NodeId::new).collect();
        assert!(kernel.connect(&nodes[..1], &nodes[1..], "static_synapse", 1, 1.0).is_err());
    }

    #[test]
    fn simulate_runs_requested_duration_and_counts_spikes() {
        let mut kernel = SimulationManager::new(1, 1, RankId::new(0), LoopbackTransport).unwrap();
        kernel.register_node_model("fire_once", || Box::new(FireOnce { fired: false }));
        kernel.register_connection_model("static_synapse");
        let ids = kernel.create("fire_once", 2).unwrap();
        let nodes: Vec<NodeId> = ids.map(NodeId::new).collect();
        kernel.connect(&nodes[..1], &nodes[1..], "static_synapse", 1, 1.0).unwrap();

        let mut conn_mgr = NoopConnectionManager::default();
        kernel.simulate(1.0, &mut conn_mgr).unwrap();

        assert!(kernel.now_ms() > 0.0);
        assert_eq!(kernel.spike_counts().get(&nodes[0]), Some(&1));
    }

    #[test]
    fn reset_kernel_clears_spike_counts_and_clock() {
        let mut kernel = SimulationManager::new(1, 1, RankId::new(0), LoopbackTransport).unwrap();
        kernel.register_node_model("fire_once", || Box::new(FireOnce { fired: false }));
        kernel.register_connection_model("static_synapse");
        let ids = kernel.create("fire_once", 1).unwrap();
        let nodes: Vec<NodeId> = ids.map(NodeId::new).collect();
        kernel.connect(&nodes, &nodes, "static_synapse", 1, 1.0).unwrap();
        let mut conn_mgr = NoopConnectionManager::default();
        kernel.simulate(1.0, &mut conn_mgr).unwrap();
        kernel.reset_kernel();
        assert_eq!(kernel.now_ms(), 0.0);
        assert!(kernel.spike_counts().is_empty());
    }

    #[test]
    fn set_kernel_status_rejects_resolution_change_on_nonempty_network() {
        let mut kernel = SimulationManager::new(1, 1, RankId::new(0), LoopbackTransport).unwrap();
        kernel.register_node_model("fire_once", || Box::new(FireOnce { fired: false }));
        kernel.create("fire_once", 1).unwrap();
        let mut status = kernel.get_kernel_status();
        status.resolution *= 2.0;
        assert!(kernel.set_kernel_status(status).is_err());
    }
}
