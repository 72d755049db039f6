//! Clock & slicing (spec.md §4.1)
//!
//! The kernel advances in fixed-size *slices* of `min_delay` steps. Within a
//! slice every node is free to process spikes in any order because no
//! connection has a delay shorter than `min_delay`; delivery only has to be
//! correct at slice boundaries. The clock never holds a floating-point
//! value — `TimeConfig` is consulted only to translate to/from milliseconds
//! at the API boundary, mirroring how `shnn_runtime::simulation` keeps its
//! step loop in integer step counts and only expands to `f64` for
//! `dt_ms()`/`duration_ms()`.

use snnk_types::{Step, TimeConfig};

use crate::error::{KernelError, Result};

/// The kernel's notion of wall time: an integer step counter plus the
/// min/max delay bounds that determine how far a slice reaches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    now: Step,
    min_delay: u64,
    max_delay: u64,
    time_config: TimeConfig,
}

impl Clock {
    /// Build a clock starting at step zero.
    ///
    /// # Errors
    /// Returns [`KernelError::BadProperty`] if `min_delay` is zero or
    /// `max_delay < min_delay` (spec.md §4.1 invariants).
    pub fn new(min_delay: u64, max_delay: u64, time_config: TimeConfig) -> Result<Self> {
        if min_delay == 0 {
            return Err(KernelError::bad_property(
                "min_delay",
                "0",
                "min_delay >= 1 step",
            ));
        }
        if max_delay < min_delay {
            return Err(KernelError::bad_property(
                "max_delay",
                max_delay.to_string(),
                format!("max_delay >= min_delay ({min_delay})"),
            ));
        }
        Ok(Self {
            now: Step::ZERO,
            min_delay,
            max_delay,
            time_config,
        })
    }

    /// Current simulated time, in steps.
    pub fn now_steps(&self) -> Step {
        self.now
    }

    /// Current simulated time, in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.time_config.steps_to_ms(self.now)
    }

    /// `min_delay`, in steps: the slice length.
    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    /// `max_delay`, in steps: the longest connection delay the ring buffers
    /// must accommodate.
    pub fn max_delay(&self) -> u64 {
        self.max_delay
    }

    /// The kernel's tic/step/ms scale.
    pub fn time_config(&self) -> TimeConfig {
        self.time_config
    }

    /// `(from, to)` step bounds of the slice about to run: `[from, to)`,
    /// `to - from == min_delay`.
    pub fn slice_bounds(&self) -> (Step, Step) {
        (self.now, self.now.advanced_by(self.min_delay))
    }

    /// Advance the clock by exactly one slice (`min_delay` steps).
    pub fn advance_slice(&mut self) {
        self.now += self.min_delay;
    }

    /// Advance the clock by an arbitrary number of steps, used only for
    /// tests and for seeking to a checkpoint; normal operation always calls
    /// [`Clock::advance_slice`].
    pub fn advance(&mut self, steps: u64) {
        self.now += steps;
    }

    /// Reset the clock to step zero without touching `min_delay`/`max_delay`.
    pub fn reset(&mut self) {
        self.now = Step::ZERO;
    }

    /// Number of whole slices needed to cover `duration_steps`, rounding up.
    pub fn slices_for(&self, duration_steps: u64) -> u64 {
        duration_steps.div_ceil(self.min_delay)
    }
}
