//! Integer time representation
//!
//! Simulated time is counted in integer *tics*; one *step* is
//! `tics_per_step` tics, and `h = tics_per_step / tics_per_ms` milliseconds.
//! All scheduling arithmetic in the kernel stays in steps so it never
//! accumulates floating-point drift; [`TimeConfig`] is the only place
//! milliseconds and tics enter the picture.

use core::fmt;
use core::ops::{Add, AddAssign, Sub};

/// A count of simulation steps. `Step(0)` is the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Step(pub u64);

impl Step {
    /// The zero step.
    pub const ZERO: Self = Self(0);

    /// Create a new step count.
    pub const fn new(steps: u64) -> Self {
        Self(steps)
    }

    /// Raw step count.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// `self + delta`, saturating rather than wrapping (steps never go
    /// negative in this kernel).
    pub const fn advanced_by(self, delta: u64) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}step", self.0)
    }
}

impl Add<u64> for Step {
    type Output = Step;
    fn add(self, rhs: u64) -> Step {
        Step(self.0 + rhs)
    }
}

impl AddAssign<u64> for Step {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl Sub for Step {
    type Output = i64;
    fn sub(self, rhs: Step) -> i64 {
        self.0 as i64 - rhs.0 as i64
    }
}

/// A count of integer tics, the finest-grained time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tics(pub u64);

impl Tics {
    /// Create a new tic count.
    pub const fn new(tics: u64) -> Self {
        Self(tics)
    }

    /// Raw tic count.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// The tic/step/millisecond scale for one kernel instance.
///
/// `resolution_ms = tics_per_step / tics_per_ms`. Both fields are fixed at
/// kernel construction (or by `set_kernel_status("resolution", ...)` before
/// any node exists) and read-only afterwards, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeConfig {
    /// Tics per millisecond.
    pub tics_per_ms: f64,
    /// Tics per simulation step (the resolution, expressed in tics).
    pub tics_per_step: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        // 0.1 ms resolution at the conventional NEST tic scale.
        Self {
            tics_per_ms: 1000.0,
            tics_per_step: 100,
        }
    }
}

impl TimeConfig {
    /// Resolution `h`, in milliseconds, implied by this tic scale.
    pub fn resolution_ms(&self) -> f64 {
        self.tics_per_step as f64 / self.tics_per_ms
    }

    /// Convert a duration in milliseconds to a step count, rounding to
    /// nearest with ties to even (banker's rounding), matching spec.md §4.1.
    pub fn ms_to_steps(&self, ms: f64) -> u64 {
        let exact_steps = ms * self.tics_per_ms / self.tics_per_step as f64;
        round_half_to_even(exact_steps) as u64
    }

    /// Convert a step count to milliseconds.
    pub fn steps_to_ms(&self, steps: Step) -> f64 {
        steps.raw() as f64 * self.resolution_ms()
    }

    /// Convert a tic count to a step count, rounding to nearest with ties
    /// to even.
    pub fn tics_to_steps(&self, tics: Tics) -> u64 {
        round_half_to_even(tics.raw() as f64 / self.tics_per_step as f64) as u64
    }
}

fn round_half_to_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_arithmetic() {
        let s = Step::new(5);
        assert_eq!(s.advanced_by(3), Step::new(8));
        assert_eq!(Step::new(10) - Step::new(4), 6);
    }

    #[test]
    fn default_resolution_is_point_one_ms() {
        let cfg = TimeConfig::default();
        assert!((cfg.resolution_ms() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn ms_to_steps_round_trip() {
        let cfg = TimeConfig::default();
        assert_eq!(cfg.ms_to_steps(1.0), 10);
        assert_eq!(cfg.ms_to_steps(0.0), 0);
        assert_eq!(cfg.steps_to_ms(Step::new(10)), 1.0);
    }

    #[test]
    fn round_half_to_even_ties() {
        assert_eq!(round_half_to_even(0.5), 0.0);
        assert_eq!(round_half_to_even(1.5), 2.0);
        assert_eq!(round_half_to_even(2.5), 2.0);
    }
}
