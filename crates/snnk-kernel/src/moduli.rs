//! Modulo table (spec.md §4.3)
//!
//! `moduli[d]` maps a delay offset `d` to the ring-buffer slot that will
//! hold arrival step `clock + d`; `slice_moduli[d]` does the same for the
//! coarser `SliceRingBuffer` bins. Both are recomputed at construction and
//! after every slice; `update_moduli` uses the left-rotation equivalence
//! noted in spec.md §4.3 instead of recomputing `moduli` from scratch.

/// The two lookup tables the ring buffers are addressed through.
#[derive(Debug, Clone)]
pub struct ModuloTable {
    moduli: Vec<usize>,
    slice_moduli: Vec<usize>,
    min_delay: u64,
    len: usize,
    nbuff: usize,
}

impl ModuloTable {
    /// Build a table for the given slicing parameters, as of `clock_steps`.
    pub fn new(clock_steps: u64, min_delay: u64, max_delay: u64) -> Self {
        let len = (min_delay + max_delay) as usize;
        let nbuff = (min_delay + max_delay).div_ceil(min_delay) as usize;
        let mut table = Self {
            moduli: vec![0; len],
            slice_moduli: vec![0; len],
            min_delay,
            len,
            nbuff,
        };
        table.recompute(clock_steps);
        table
    }

    /// Ring-buffer length `L = min_delay + max_delay`.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the table holds no entries (never the case in practice).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of `SliceRingBuffer` bins, `⌈L / min_delay⌉`.
    pub fn nbuff(&self) -> usize {
        self.nbuff
    }

    /// `moduli[d]`, the ring-buffer slot for delay offset `d`.
    pub fn modulus(&self, d: usize) -> usize {
        self.moduli[d]
    }

    /// `slice_moduli[d]`, the `SliceRingBuffer` bin for delay offset `d`.
    pub fn slice_modulus(&self, d: usize) -> usize {
        self.slice_moduli[d]
    }

    /// Full recompute from scratch: `moduli[d] = (clock + d) mod L`,
    /// `slice_moduli[d] = ((clock + d) / min_delay) mod nbuff`.
    pub fn recompute(&mut self, clock_steps: u64) {
        for d in 0..self.len {
            self.moduli[d] = ((clock_steps + d as u64) % self.len as u64) as usize;
            self.slice_moduli[d] =
                (((clock_steps + d as u64) / self.min_delay) % self.nbuff as u64) as usize;
        }
    }

    /// Advance by one slice (`min_delay` steps). `moduli` is rotated left by
    /// `min_delay`, equivalent to but cheaper than recomputing from the new
    /// clock value; `slice_moduli` is always recomputed in full since
    /// `max_delay` need not be a multiple of `min_delay`.
    pub fn update_moduli(&mut self, new_clock_steps: u64) {
        let shift = (self.min_delay as usize).min(self.len);
        self.moduli.rotate_left(shift);
        for d in 0..self.len {
            self.slice_moduli[d] =
                (((new_clock_steps + d as u64) / self.min_delay) % self.nbuff as u64) as usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moduli_match_direct_formula_at_construction() {
        let table = ModuloTable::new(7, 3, 5);
        let l = 8u64;
        for d in 0..table.len() {
            assert_eq!(table.modulus(d), ((7 + d as u64) % l) as usize);
        }
    }

    #[test]
    fn update_moduli_matches_recompute_from_scratch() {
        let min_delay = 3u64;
        let max_delay = 7u64;
        let mut rotated = ModuloTable::new(0, min_delay, max_delay);
        rotated.update_moduli(min_delay);

        let direct = ModuloTable::new(min_delay, min_delay, max_delay);
        assert_eq!(rotated.moduli, direct.moduli);
        assert_eq!(rotated.slice_moduli, direct.slice_moduli);
    }

    #[test]
    fn repeated_updates_stay_consistent_with_direct_recompute() {
        let min_delay = 4u64;
        let max_delay = 10u64;
        let mut rolling = ModuloTable::new(0, min_delay, max_delay);
        let mut clock = 0u64;
        for _ in 0..5 {
            clock += min_delay;
            rolling.update_moduli(clock);
            let direct = ModuloTable::new(clock, min_delay, max_delay);
            assert_eq!(rolling.moduli, direct.moduli, "clock={clock}");
            assert_eq!(rolling.slice_moduli, direct.slice_moduli, "clock={clock}");
        }
    }

    #[test]
    fn min_delay_equals_max_delay_gives_length_two() {
        let table = ModuloTable::new(0, 1, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.nbuff(), 2);
    }
}
