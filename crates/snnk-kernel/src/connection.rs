//! Connection-model callbacks (spec.md §6 "Callbacks required from the
//! connection library")
//!
//! The kernel resolves `(tid, syn_id, lcid)` to a concrete connection only
//! through this trait; the connection/synapse model library (out of scope,
//! spec.md §1) owns the actual weight/delay storage, scales the event by
//! its own weight, and tells the kernel which node the resolved connection
//! targets, so the kernel (the only party holding the node arena) can
//! dispatch the scaled event into that node's `handle`.

use snnk_types::{LocalCid, NodeId, RankId, SynId, Target, ThreadId};

use crate::node::Event;

/// Callbacks the kernel requires from the connection table.
pub trait ConnectionManager {
    /// Register a new connection from `source` to `target` under
    /// connection model `syn_id`, with the given delay and weight, and
    /// return the local connection id the kernel should route through.
    /// Invoked once per edge during `SimulationManager::connect`.
    fn add_connection(
        &mut self,
        source: NodeId,
        target: NodeId,
        syn_id: SynId,
        delay_steps: u64,
        weight: f64,
    ) -> LocalCid;

    /// Resolve connection `(tid, syn_id, lcid)`, scale/record `event`
    /// against the connection's own weight, and return the node, the
    /// (already-scaled) event, and the connection's own delay in steps, so
    /// the kernel can buffer the contribution for delivery at the correct
    /// future slice (spec.md §3/§8 "every spike is delivered at arrival step
    /// `s + d`"). `None` if the connection is not known locally.
    fn send(&mut self, tid: ThreadId, syn_id: SynId, lcid: LocalCid, event: Event) -> Option<(NodeId, Event, u64)>;

    /// Record that node `source` on `rank`/`tid` has a connection described
    /// by `target`. Called once per entry during the target-table gather.
    fn add_target(&mut self, tid: ThreadId, rank: RankId, source: NodeId, target: Target);

    /// Pull the next `(source, target)` entry to collocate into the
    /// target-table gather's send buffer, or `None` once every local
    /// connection has been enumerated.
    fn get_next_target_data(&mut self) -> Option<(NodeId, Target)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SpikeEvent;
    use snnk_types::Step;

    #[derive(Default)]
    struct RecordingConnectionManager {
        sent: Vec<(ThreadId, SynId, LocalCid)>,
        resolved: std::collections::HashMap<(ThreadId, SynId, LocalCid), (NodeId, f64, u64)>,
        targets: Vec<(NodeId, Target)>,
        cursor: usize,
        next_lcid: u32,
    }

    impl ConnectionManager for RecordingConnectionManager {
        fn add_connection(
            &mut self,
            _source: NodeId,
            target: NodeId,
            syn_id: SynId,
            delay_steps: u64,
            weight: f64,
        ) -> LocalCid {
            let lcid = LocalCid::new(self.next_lcid);
            self.next_lcid += 1;
            self.resolved.insert((ThreadId::new(0), syn_id, lcid), (target, weight, delay_steps));
            lcid
        }

        fn send(&mut self, tid: ThreadId, syn_id: SynId, lcid: LocalCid, event: Event) -> Option<(NodeId, Event, u64)> {
            self.sent.push((tid, syn_id, lcid));
            let (target, weight, delay_steps) = *self.resolved.get(&(tid, syn_id, lcid))?;
            Some((target, event.scale_weight(weight), delay_steps))
        }
        fn add_target(&mut self, _tid: ThreadId, _rank: RankId, source: NodeId, target: Target) {
            self.targets.push((source, target));
        }
        fn get_next_target_data(&mut self) -> Option<(NodeId, Target)> {
            let entry = self.targets.get(self.cursor).copied();
            if entry.is_some() {
                self.cursor += 1;
            }
            entry
        }
    }

    #[test]
    fn send_resolves_the_target_and_scales_the_event_by_connection_weight() {
        let mut mgr = RecordingConnectionManager::default();
        let lcid = mgr.add_connection(NodeId::new(0), NodeId::new(9), SynId::new(1), 1, 2.5);
        let resolved = mgr.send(
            ThreadId::new(0),
            SynId::new(1),
            lcid,
            Event::Spike(SpikeEvent {
                stamp: Step::new(5),
                weight: 1.0,
                multiplicity: 1,
                offset: None,
            }),
        );
        assert_eq!(mgr.sent, vec![(ThreadId::new(0), SynId::new(1), lcid)]);
        match resolved {
            Some((node, Event::Spike(spike), delay_steps)) => {
                assert_eq!(node, NodeId::new(9));
                assert_eq!(spike.weight, 2.5);
                assert_eq!(delay_steps, 1);
            }
            other => panic!("expected a resolved spike, got {other:?}"),
        }
    }

    #[test]
    fn get_next_target_data_enumerates_added_targets_once() {
        let mut mgr = RecordingConnectionManager::default();
        let target = Target::new(RankId::new(0), ThreadId::new(0), SynId::new(0), LocalCid::new(0));
        mgr.add_target(ThreadId::new(0), RankId::new(0), NodeId::new(9), target);
        assert_eq!(mgr.get_next_target_data(), Some((NodeId::new(9), target)));
        assert_eq!(mgr.get_next_target_data(), None);
    }
}
