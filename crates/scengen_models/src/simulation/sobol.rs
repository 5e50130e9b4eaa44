//! Scrambled Sobol-type low-discrepancy sequence.
//!
//! Dimension 0 uses the canonical van der Corput direction numbers;
//! higher dimensions use seeded, digit-scrambled direction numbers,
//! which keeps the generator compact while supporting the
//! `n_factors * n_steps` dimensionalities a path simulation needs.
//! The half-ulp offset keeps every coordinate strictly inside
//! `(0, 1)`, so the inverse normal CDF never sees 0 or 1.

/// Maximum supported dimensionality.
pub const MAX_DIMENSIONS: usize = 16_384;

const INV_U64: f64 = 1.0 / 18_446_744_073_709_551_616.0;
const HALF_INV_U64: f64 = 0.5 * INV_U64;

/// Low-discrepancy sequence generator.
///
/// Deterministic for a fixed `(dimension, seed)` pair; successive
/// calls to [`SobolSequence::next_into`] walk the sequence in Gray
/// code order.
#[derive(Debug, Clone)]
pub struct SobolSequence {
    dimension: usize,
    index: u64,
    state: Vec<u64>,
    directions: Vec<[u64; 64]>,
    scramble: Vec<u64>,
}

impl SobolSequence {
    /// Creates a generator for `dimension`-dimensional points.
    ///
    /// # Panics
    ///
    /// Panics if `dimension` is 0 or exceeds [`MAX_DIMENSIONS`];
    /// callers size the sequence from validated simulation inputs.
    pub fn new(dimension: usize, seed: u64) -> Self {
        assert!(
            (1..=MAX_DIMENSIONS).contains(&dimension),
            "Sobol dimension must be in [1, {MAX_DIMENSIONS}], got {dimension}"
        );
        let mut directions = Vec::with_capacity(dimension);
        let mut scramble = Vec::with_capacity(dimension);
        for dim in 0..dimension as u64 {
            directions.push(direction_numbers(dim, seed));
            scramble.push(splitmix64(seed ^ ((dim + 1) << 32)));
        }
        Self {
            dimension,
            index: 0,
            state: vec![0; dimension],
            directions,
            scramble,
        }
    }

    /// Dimensionality of each point.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Writes the next point into `out`; returns `false` once the
    /// sequence is exhausted (after `2^64 - 1` points).
    ///
    /// # Panics
    ///
    /// Panics if `out.len() < self.dimension()`.
    pub fn next_into(&mut self, out: &mut [f64]) -> bool {
        let next = self.index.wrapping_add(1);
        if next == 0 {
            return false;
        }
        let c = next.trailing_zeros() as usize;
        self.index = next;
        for (dim, slot) in out.iter_mut().enumerate().take(self.dimension) {
            self.state[dim] ^= self.directions[dim][c];
            let scrambled = self.state[dim] ^ self.scramble[dim];
            *slot = (scrambled as f64).mul_add(INV_U64, HALF_INV_U64);
        }
        true
    }
}

fn direction_numbers(dim: u64, seed: u64) -> [u64; 64] {
    let mut v = [0_u64; 64];
    if dim == 0 {
        for (j, item) in v.iter_mut().enumerate() {
            *item = 1_u64 << (63 - j);
        }
        return v;
    }
    for (j, item) in v.iter_mut().enumerate() {
        let hash = splitmix64(seed ^ ((dim + 1) << 40) ^ j as u64);
        let mask = if j == 63 {
            u64::MAX
        } else {
            (1_u64 << (j + 1)) - 1
        };
        // Odd leading digit keeps the direction numbers admissible.
        let m = (hash | 1) & mask;
        *item = m << (63 - j);
    }
    v
}

pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_stay_in_open_unit_interval() {
        let mut seq = SobolSequence::new(6, 42);
        let mut point = vec![0.0; 6];
        for _ in 0..2_000 {
            assert!(seq.next_into(&mut point));
            for &u in &point {
                assert!(u > 0.0 && u < 1.0, "u = {u}");
            }
        }
    }

    #[test]
    fn same_seed_reproduces() {
        let mut a = SobolSequence::new(4, 7);
        let mut b = SobolSequence::new(4, 7);
        let mut pa = vec![0.0; 4];
        let mut pb = vec![0.0; 4];
        for _ in 0..256 {
            a.next_into(&mut pa);
            b.next_into(&mut pb);
            assert_eq!(pa, pb);
        }
    }

    #[test]
    fn different_seeds_differ_in_scrambled_dimensions() {
        let mut a = SobolSequence::new(2, 1);
        let mut b = SobolSequence::new(2, 2);
        let mut pa = vec![0.0; 2];
        let mut pb = vec![0.0; 2];
        a.next_into(&mut pa);
        b.next_into(&mut pb);
        assert_ne!(pa[1], pb[1]);
    }

    #[test]
    fn first_dimension_is_balanced() {
        let n = 1_024;
        let mut seq = SobolSequence::new(1, 11);
        let mut point = [0.0];
        let mut sum = 0.0;
        for _ in 0..n {
            seq.next_into(&mut point);
            sum += point[0];
        }
        let mean = sum / n as f64;
        assert!((mean - 0.5).abs() < 1e-3, "mean = {mean}");
    }

    #[test]
    #[should_panic(expected = "Sobol dimension")]
    fn zero_dimension_panics() {
        let _ = SobolSequence::new(0, 1);
    }
}
