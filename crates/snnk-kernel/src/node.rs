//! Node-model callbacks (spec.md §6 "Callbacks required from the node library")
//!
//! The kernel never inspects a node's internal dynamics; it only drives
//! `update` across a slice and dispatches events into `handle`. The node
//! model library (explicitly out of scope, spec.md §1) implements this
//! trait however it needs to.

use snnk_types::Step;

/// A spike delivered to a node, stamped with its arrival step and, for
/// off-grid delivery, a sub-step offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeEvent {
    /// Arrival step.
    pub stamp: Step,
    /// Weight carried by the originating connection.
    pub weight: f64,
    /// Multiplicity (number of coincident spikes folded into one record).
    pub multiplicity: u32,
    /// Sub-step offset in `[0, h)`, for off-grid delivery.
    pub offset: Option<f64>,
}

/// A continuous-current injection delivered to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentEvent {
    /// Arrival step.
    pub stamp: Step,
    /// Current amplitude, in pA.
    pub current: f64,
}

/// A request from a recording device for the node's current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataLoggingRequest {
    /// Step at which the sample is taken.
    pub stamp: Step,
}

/// The three event kinds a node may receive, dispatched as a tagged union
/// rather than through virtual `Event::operator()` dispatch (spec.md §9
/// "Dynamic dispatch over event kinds").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// A spike from a connected source.
    Spike(SpikeEvent),
    /// A continuous current injection.
    Current(CurrentEvent),
    /// A recording device's sampling request.
    DataLogging(DataLoggingRequest),
}

impl Event {
    /// Scale a spike's weight by a connection's own weight factor before
    /// dispatch; other event kinds pass through unchanged. The kernel hands
    /// every `SpikeEvent` to the connection library at unit weight, since
    /// weight storage belongs there, not to the kernel (spec.md §1).
    pub fn scale_weight(self, factor: f64) -> Self {
        match self {
            Event::Spike(mut spike) => {
                spike.weight *= factor;
                Event::Spike(spike)
            }
            other => other,
        }
    }
}

/// Called by a node's `update` for every lag at which it crosses threshold.
/// `emit(lag)` reports a spike emitted during lag `lag` of the current
/// slice; the kernel stamps it `origin + lag + 1` and fans it out through
/// the spike register (spec.md §4.7 "Transition integrating -> refractory").
pub type SpikeSink<'a> = dyn FnMut(u32) + 'a;

/// Callbacks the kernel requires from every node model.
pub trait Node {
    /// Advance this node's dynamics across lags `[from, to)` of the slice
    /// starting at `origin`, calling `emit(lag)` for each threshold
    /// crossing instead of returning spikes directly.
    fn update(&mut self, origin: Step, from: u32, to: u32, emit: &mut SpikeSink<'_>);

    /// Deliver one event to this node.
    fn handle(&mut self, event: Event);

    /// Validate and cache derived parameters ahead of the first `update`
    /// after construction or a property change.
    fn calibrate(&mut self);

    /// Reset dynamic state to its initial values (used by `reset_kernel`).
    fn init_state(&mut self);

    /// (Re)allocate any per-node input buffers sized by the current
    /// `min_delay`/`max_delay`.
    fn init_buffers(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_weight_only_touches_spikes() {
        let spike = Event::Spike(SpikeEvent {
            stamp: Step::new(1),
            weight: 2.0,
            multiplicity: 1,
            offset: None,
        });
        let scaled = spike.scale_weight(3.0);
        match scaled {
            Event::Spike(s) => assert_eq!(s.weight, 6.0),
            _ => panic!("expected a spike"),
        }

        let current = Event::Current(CurrentEvent {
            stamp: Step::new(1),
            current: 5.0,
        });
        assert_eq!(current.scale_weight(3.0), current);
    }

    struct Counter {
        updates: u32,
        spikes_seen: u32,
    }

    impl Node for Counter {
        fn update(&mut self, _origin: Step, from: u32, to: u32, emit: &mut SpikeSink<'_>) {
            self.updates += to - from;
            if to > from {
                emit(from);
            }
        }
        fn handle(&mut self, event: Event) {
            if let Event::Spike(_) = event {
                self.spikes_seen += 1;
            }
        }
        fn calibrate(&mut self) {}
        fn init_state(&mut self) {
            self.updates = 0;
        }
        fn init_buffers(&mut self) {}
    }

    #[test]
    fn update_accumulates_lag_span_and_reports_a_spike() {
        let mut node = Counter {
            updates: 0,
            spikes_seen: 0,
        };
        let mut fired_lags = Vec::new();
        node.update(Step::ZERO, 0, 3, &mut |lag| fired_lags.push(lag));
        assert_eq!(node.updates, 3);
        assert_eq!(fired_lags, vec![0]);
    }

    #[test]
    fn handle_dispatches_only_spikes_to_the_counter() {
        let mut node = Counter {
            updates: 0,
            spikes_seen: 0,
        };
        node.handle(Event::Spike(SpikeEvent {
            stamp: Step::new(1),
            weight: 1.0,
            multiplicity: 1,
            offset: None,
        }));
        node.handle(Event::Current(CurrentEvent {
            stamp: Step::new(1),
            current: 5.0,
        }));
        assert_eq!(node.spikes_seen, 1);
    }
}
