//! Seeded random draws shared by every search.
//!
//! A [`Sampler`] is created per run from the solver seed, so two runs with the same
//! seed see the same stream of numbers and independent solvers never share state.

use rand::Rng;
use rand::SeedableRng;
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256Plus;

/// Uniform and Gaussian draws from one deterministic stream.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: Xoshiro256Plus,
}

impl Sampler {
    pub fn seeded(seed: u64) -> Self {
        Sampler {
            rng: Xoshiro256Plus::seed_from_u64(seed),
        }
    }

    /// A draw from `U(0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// A draw from `U(lo, hi)`. Returns `lo` for an empty interval.
    #[inline]
    pub fn uniform_in(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.uniform()
    }

    /// A draw from `N(mean, sd²)`.
    #[inline]
    pub fn gauss(&mut self, mean: f64, sd: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        mean + sd * z
    }

    /// A uniform index in `0..n`. `n` must be positive.
    #[inline]
    pub fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// `true` with probability `p`.
    #[inline]
    pub fn coin(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    /// Roulette-wheel pick: index `i` is drawn with probability `weights[i] / sum(weights)`.
    /// Zero weights are never picked unless all weights are zero, in which case the pick
    /// is uniform.
    pub fn roulette(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return self.below(weights.len());
        }
        let mut target = self.uniform() * total;
        for (i, w) in weights.iter().enumerate() {
            if *w > 0.0 && target < *w {
                return i;
            }
            target -= w;
        }
        // rounding left us past the end; the last positive weight wins
        weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
    }
}
