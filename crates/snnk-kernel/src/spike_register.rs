//! Spike register (spec.md §4.4)
//!
//! A thread-local `[source_thread][lag] -> Vec<Target>` table. Because a
//! node only ever appends to `register[t_own][t_src_of_n][l]` where
//! `t_src_of_n == t_own` (spec.md §3 "Spike Register"), each owning
//! thread's slice of the register is written exclusively by that thread —
//! no cross-thread synchronization is needed on `emit`.

use snnk_types::{Target, ThreadId};

/// One thread's view of the spike register: a `[lag]` list of `Target`
/// emitted during the current slice.
#[derive(Debug, Clone, Default)]
pub struct ThreadRegister {
    by_lag: Vec<Vec<Target>>,
}

impl ThreadRegister {
    /// Build an empty register with `min_delay` lag slots.
    pub fn new(min_delay: usize) -> Self {
        Self {
            by_lag: vec![Vec::new(); min_delay],
        }
    }

    /// Append a target for delivery at the given lag within the current
    /// slice. Never blocks; this thread is the sole writer of its register.
    pub fn emit(&mut self, lag: usize, target: Target) {
        self.by_lag[lag].push(target);
    }

    /// Visit every `(lag, &mut Target)` pair, in lag order. The visitor
    /// sets `target.processed = true` on entries it successfully
    /// collocated; unvisited or rejected entries keep `processed == false`
    /// and are retried on the next round.
    pub fn iterate(&mut self, mut visitor: impl FnMut(usize, &mut Target)) {
        for (lag, targets) in self.by_lag.iter_mut().enumerate() {
            for target in targets.iter_mut() {
                visitor(lag, target);
            }
        }
    }

    /// Remove every entry flagged `processed`.
    pub fn clean(&mut self) {
        for targets in self.by_lag.iter_mut() {
            targets.retain(|t| !t.processed);
        }
    }

    /// `true` once every entry across all lags has been cleaned (or none
    /// were ever emitted) — this thread has nothing left to collocate.
    pub fn is_drained(&self) -> bool {
        self.by_lag.iter().all(Vec::is_empty)
    }

    /// Clear every lag's list unconditionally, including unprocessed
    /// entries; used at slice end (spec.md §4.4 lifecycle).
    pub fn reset(&mut self) {
        for targets in self.by_lag.iter_mut() {
            targets.clear();
        }
    }
}

/// Per-process spike register: one [`ThreadRegister`] per owning thread.
#[derive(Debug, Clone, Default)]
pub struct SpikeRegister {
    threads: Vec<ThreadRegister>,
}

impl SpikeRegister {
    /// Build a register for `num_threads` threads, each with `min_delay`
    /// lag slots.
    pub fn new(num_threads: usize, min_delay: usize) -> Self {
        Self {
            threads: (0..num_threads).map(|_| ThreadRegister::new(min_delay)).collect(),
        }
    }

    /// Borrow the register owned by `t_own`.
    pub fn thread(&self, t_own: ThreadId) -> &ThreadRegister {
        &self.threads[t_own.raw() as usize]
    }

    /// Mutably borrow the register owned by `t_own`.
    pub fn thread_mut(&mut self, t_own: ThreadId) -> &mut ThreadRegister {
        &mut self.threads[t_own.raw() as usize]
    }

    /// Number of threads this register serves.
    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    /// Reset every thread's register; called at slice end and on
    /// `reset_kernel`.
    pub fn reset_all(&mut self) {
        self.threads.iter_mut().for_each(ThreadRegister::reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snnk_types::{LocalCid, RankId, SynId};

    fn target() -> Target {
        Target::new(RankId::new(2), ThreadId::new(0), SynId::new(1), LocalCid::new(0))
    }

    #[test]
    fn emit_then_iterate_sees_the_entry() {
        let mut reg = ThreadRegister::new(4);
        reg.emit(1, target());
        let mut seen = 0;
        reg.iterate(|lag, t| {
            assert_eq!(lag, 1);
            assert_eq!(t.rank, RankId::new(2));
            seen += 1;
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn clean_removes_only_processed_entries() {
        let mut reg = ThreadRegister::new(2);
        reg.emit(0, target());
        reg.emit(0, target());
        let mut first = true;
        reg.iterate(|_, t| {
            if first {
                t.processed = true;
                first = false;
            }
        });
        reg.clean();
        assert!(!reg.is_drained());
        let mut remaining = 0;
        reg.iterate(|_, _| remaining += 1);
        assert_eq!(remaining, 1);
    }

    #[test]
    fn reset_clears_unprocessed_entries_too() {
        let mut reg = ThreadRegister::new(2);
        reg.emit(0, target());
        reg.reset();
        assert!(reg.is_drained());
    }

    #[test]
    fn per_thread_isolation_via_thread_mut() {
        let mut register = SpikeRegister::new(2, 3);
        register.thread_mut(ThreadId::new(0)).emit(0, target());
        assert!(!register.thread(ThreadId::new(0)).is_drained());
        assert!(register.thread(ThreadId::new(1)).is_drained());
    }
}
