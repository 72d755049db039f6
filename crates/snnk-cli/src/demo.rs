//! A minimal leaky integrate-and-fire node and an in-memory connection
//! table, used by the `simulate` subcommand to exercise the kernel
//! end-to-end. Neuron dynamics are out of scope for the kernel itself
//! (spec.md §1); this is demo/CLI glue, not a core module, adapted in
//! shape from `shnn_runtime::neuron::LIFNeuron`.

use std::collections::HashMap;

use snnk_kernel::node::{Event, SpikeSink};
use snnk_kernel::{ConnectionManager, Node};
use snnk_types::{LocalCid, NodeId, RankId, SynId, Target, ThreadId};

/// Leaky integrate-and-fire parameters, in the same units NEST-style
/// neuron models use: `tau_m`/`t_ref` in ms, `v_*` in mV, `c_m` in pF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifParams {
    /// Membrane time constant.
    pub tau_m: f64,
    /// Resting potential.
    pub v_rest: f64,
    /// Reset potential applied after a spike.
    pub v_reset: f64,
    /// Firing threshold.
    pub v_thresh: f64,
    /// Refractory period.
    pub t_ref: f64,
    /// Membrane capacitance.
    pub c_m: f64,
    /// Simulation resolution, ms per step.
    pub resolution_ms: f64,
    /// Constant background current driving the neuron, in pA.
    pub bias_current: f64,
}

impl Default for LifParams {
    fn default() -> Self {
        Self {
            tau_m: 10.0,
            v_rest: 0.0,
            v_reset: 0.0,
            v_thresh: 20.0,
            t_ref: 2.0,
            c_m: 250.0,
            resolution_ms: 0.1,
            bias_current: 0.0,
        }
    }
}

/// A single LIF neuron, integrated with forward Euler at the kernel's
/// resolution, one step per lag.
pub struct LifNode {
    params: LifParams,
    v_m: f64,
    refractory_steps_left: u32,
}

impl LifNode {
    /// Build a neuron at rest.
    pub fn new(params: LifParams) -> Self {
        Self {
            v_m: params.v_rest,
            refractory_steps_left: 0,
            params,
        }
    }
}

impl Node for LifNode {
    fn update(&mut self, _origin: snnk_types::Step, from: u32, to: u32, emit: &mut SpikeSink<'_>) {
        let dt = self.params.resolution_ms;
        for lag in from..to {
            if self.refractory_steps_left > 0 {
                self.refractory_steps_left -= 1;
                self.v_m = self.params.v_reset;
                continue;
            }
            let leak = -(self.v_m - self.params.v_rest) / self.params.tau_m;
            let drive = self.params.bias_current / self.params.c_m;
            self.v_m += dt * (leak + drive);
            if self.v_m >= self.params.v_thresh {
                self.v_m = self.params.v_reset;
                self.refractory_steps_left = (self.params.t_ref / dt).round() as u32;
                emit(lag);
            }
        }
    }

    fn handle(&mut self, event: Event) {
        if let Event::Spike(spike) = event {
            if self.refractory_steps_left == 0 {
                self.v_m += spike.weight;
            }
        }
    }

    fn calibrate(&mut self) {}

    fn init_state(&mut self) {
        self.v_m = self.params.v_rest;
        self.refractory_steps_left = 0;
    }

    fn init_buffers(&mut self) {}
}

/// A flat in-memory connection table: `(tid, syn_id, lcid) -> (target node,
/// weight)`. Stands in for the out-of-scope connection/synapse model
/// library, including its job of scaling each event by the connection's
/// own weight before handing it to the kernel for dispatch.
#[derive(Default)]
pub struct TableConnectionManager {
    connections: HashMap<(ThreadId, SynId, LocalCid), (NodeId, f64, u64)>,
    next_lcid: HashMap<SynId, u32>,
    deliveries: Vec<(NodeId, Event)>,
}

impl TableConnectionManager {
    /// Build an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop every event delivered since the last call, paired with its
    /// target node id, for the CLI to report.
    pub fn drain_deliveries(&mut self) -> Vec<(NodeId, Event)> {
        std::mem::take(&mut self.deliveries)
    }
}

impl ConnectionManager for TableConnectionManager {
    fn add_connection(
        &mut self,
        _source: NodeId,
        target: NodeId,
        syn_id: SynId,
        delay_steps: u64,
        weight: f64,
    ) -> LocalCid {
        let counter = self.next_lcid.entry(syn_id).or_insert(0);
        let lcid = LocalCid::new(*counter);
        *counter += 1;
        self.connections.insert((ThreadId::new(0), syn_id, lcid), (target, weight, delay_steps));
        lcid
    }

    fn send(&mut self, tid: ThreadId, syn_id: SynId, lcid: LocalCid, event: Event) -> Option<(NodeId, Event, u64)> {
        let (target, weight, delay_steps) = *self.connections.get(&(tid, syn_id, lcid))?;
        let scaled = event.scale_weight(weight);
        self.deliveries.push((target, scaled));
        Some((target, scaled, delay_steps))
    }

    fn add_target(&mut self, _tid: ThreadId, _rank: RankId, _source: NodeId, _target: Target) {}

    fn get_next_target_data(&mut self) -> Option<(NodeId, Target)> {
        None
    }
}
