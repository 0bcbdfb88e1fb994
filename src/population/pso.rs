//! Particle swarm optimization with two velocity rules.
//!
//! * Fully informed (Mendes, Kennedy and Neves, 2004): every particle is pulled towards
//!   the personal bests of its informants, the four neighbours on a wrap-around von
//!   Neumann lattice built once for the swarm.
//! * Classic constriction (Clerc and Kennedy, 2002): every particle is pulled towards its
//!   own personal best and the best personal best of the swarm.
//!
//! Velocity components that have died out are replaced by Gaussian noise so the swarm
//! keeps sampling, and integer variables are rounded and occasionally resampled around
//! their rounded value to escape integer plateaus.

use log::debug;
use ndarray::prelude::*;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::minimizer::{Context, Halt, Minimizer, Termination};
use crate::problem::Problem;
use crate::sampling::Sampler;

/// Velocity components smaller than this fraction of the range are considered dead.
const STALL: f64 = 1e-12;
/// Spread of the noise replacing a dead component, as a fraction of the range.
const STALL_NOISE: f64 = 0.01;

/// The velocity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum PsoMode {
    /// Attraction towards every informant on the von Neumann lattice.
    #[default]
    FullyInformed,
    /// Attraction towards the personal best and the swarm best.
    Classic,
}

/// When particles see each other's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum UpdateMode {
    /// The whole swarm moves on last iteration's personal bests, then is evaluated.
    #[default]
    Synchronous,
    /// Each particle moves, is evaluated and updates its personal best before the next one.
    Asynchronous,
}

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(default))]
/// Particle swarm settings.
pub struct ParticleSwarm {
    /// Number of particles.
    #[builder(default = "24")]
    pub popsize: usize,

    /// Constriction coefficient applied to every velocity update.
    #[builder(default = "0.1")]
    pub chi: f64,

    /// Total acceleration coefficient, split between the attractors.
    #[builder(default = "4.0")]
    pub phi: f64,

    #[builder(default)]
    pub psomode: PsoMode,

    #[builder(default)]
    pub pxupdatemode: UpdateMode,

    /// Probability that a rounded integer component is resampled around its value.
    #[builder(default = "0.1")]
    pub pint: f64,
}

impl Default for ParticleSwarm {
    fn default() -> Self {
        // every field has a builder default, so this cannot fail
        ParticleSwarmBuilder::default().build().unwrap()
    }
}

/// Informants of every particle on a `rows x cols` torus holding `popsize` particles,
/// `rows` being the largest divisor of `popsize` not above its square root. Self and
/// duplicate neighbours are dropped.
pub fn von_neumann(popsize: usize) -> Vec<Vec<usize>> {
    let rows = (1..=popsize)
        .take_while(|r| r * r <= popsize)
        .filter(|r| popsize % r == 0)
        .last()
        .unwrap_or(1);
    let cols = popsize / rows;
    (0..popsize)
        .map(|p| {
            let (r, c) = (p / cols, p % cols);
            let around = [
                ((r + rows - 1) % rows) * cols + c,
                ((r + 1) % rows) * cols + c,
                r * cols + (c + cols - 1) % cols,
                r * cols + (c + 1) % cols,
            ];
            let mut informants: Vec<usize> = Vec::with_capacity(4);
            for q in around.iter() {
                if *q != p && !informants.contains(q) {
                    informants.push(*q);
                }
            }
            informants
        })
        .collect()
}

struct Swarm {
    x: Array2<f64>,
    v: Array2<f64>,
    best: Array2<f64>,
    fbest: Vec<f64>,
}

impl Swarm {
    fn leader(&self) -> usize {
        let mut g = 0;
        for (p, f) in self.fbest.iter().enumerate() {
            if *f < self.fbest[g] {
                g = p;
            }
        }
        g
    }

    fn remember(&mut self, p: usize, f: f64) {
        if f < self.fbest[p] {
            self.fbest[p] = f;
            let xp = self.x.row(p).to_owned();
            self.best.row_mut(p).assign(&xp);
        }
    }
}

impl ParticleSwarm {
    /// Starting velocities, uniform on `chi * width * [-1, 1)` per component.
    fn initial_velocity(&self, pop: usize, problem: &Problem, sampler: &mut Sampler) -> Array2<f64> {
        Array2::from_shape_fn((pop, problem.dim()), |(_, i)| {
            self.chi * problem.width(i) * sampler.uniform_in(-1.0, 1.0)
        })
    }

    /// New velocity and position of particle `p`.
    fn fly(&self, p: usize, swarm: &mut Swarm, informants: &[Vec<usize>], problem: &Problem, sampler: &mut Sampler) {
        let n = problem.dim();
        let x = swarm.x.row(p).to_owned();
        let mut pull = Array1::<f64>::zeros(n);
        match self.psomode {
            PsoMode::FullyInformed => {
                let k = informants[p].len().max(1) as f64;
                for &q in informants[p].iter() {
                    for i in 0..n {
                        pull[i] += sampler.uniform_in(0.0, self.phi / k) * (swarm.best[[q, i]] - x[i]);
                    }
                }
            }
            PsoMode::Classic => {
                let g = swarm.leader();
                for i in 0..n {
                    pull[i] += sampler.uniform_in(0.0, self.phi / 2.0) * (swarm.best[[p, i]] - x[i]);
                    pull[i] += sampler.uniform_in(0.0, self.phi / 2.0) * (swarm.best[[g, i]] - x[i]);
                }
            }
        }

        let mut moved = x;
        for i in 0..n {
            let width = problem.width(i);
            let v = revive(self.chi * (swarm.v[[p, i]] + pull[i]), width, sampler);
            swarm.v[[p, i]] = v;
            moved[i] += v;
        }
        problem.check_bounds(&mut moved);
        for i in 0..n {
            if problem.is_integer(i) {
                moved[i] = moved[i].round();
                if sampler.coin(self.pint) {
                    moved[i] = sampler.gauss(moved[i], 1.0).round();
                }
            }
        }
        problem.repair(&mut moved);
        swarm.x.row_mut(p).assign(&moved);
    }
}

/// `v`, or fresh noise when `v` has died out on a variable of range `width`.
fn revive(v: f64, width: f64, sampler: &mut Sampler) -> f64 {
    if width > 0.0 && v.abs() < STALL * width {
        sampler.gauss(0.0, STALL_NOISE * width)
    } else {
        v
    }
}

impl Minimizer for ParticleSwarm {
    fn name(&self) -> &'static str {
        "particle-swarm"
    }

    fn validate(&self, _problem: &Problem) -> Result<()> {
        if self.popsize < 2 {
            return Err(Error::setting("popsize", "a swarm needs at least 2 particles"));
        }
        if !(self.chi > 0.0 && self.chi.is_finite()) {
            return Err(Error::setting("chi", "must be positive and finite"));
        }
        if !(self.phi > 0.0 && self.phi.is_finite()) {
            return Err(Error::setting("phi", "must be positive and finite"));
        }
        if !(0.0..=1.0).contains(&self.pint) {
            return Err(Error::setting("pint", "must be a probability"));
        }
        Ok(())
    }

    fn minimize<F>(&self, ctx: &mut Context<F>) -> std::result::Result<Termination, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        let problem = ctx.problem();
        let (pop, n) = (self.popsize, problem.dim());

        let mut x = Array2::<f64>::zeros((pop, n));
        for p in 0..pop {
            let xp = ctx.initial_or_sample(p);
            x.row_mut(p).assign(&xp);
        }
        let v = self.initial_velocity(pop, problem, ctx.sampler);
        let informants = von_neumann(pop);
        let mut swarm = Swarm {
            best: x.clone(),
            x,
            v,
            fbest: vec![f64::INFINITY; pop],
        };

        for p in 0..pop {
            if ctx.eval.exhausted() {
                return Ok(Termination::BudgetExhausted);
            }
            swarm.fbest[p] = ctx.eval.call(swarm.x.row(p))?;
        }

        while !ctx.eval.exhausted() {
            ctx.iterations += 1;
            match self.pxupdatemode {
                UpdateMode::Synchronous => {
                    for p in 0..pop {
                        self.fly(p, &mut swarm, &informants, problem, ctx.sampler);
                    }
                    for p in 0..pop {
                        if ctx.eval.exhausted() {
                            return Ok(Termination::BudgetExhausted);
                        }
                        let f = ctx.eval.call(swarm.x.row(p))?;
                        swarm.remember(p, f);
                    }
                }
                UpdateMode::Asynchronous => {
                    for p in 0..pop {
                        if ctx.eval.exhausted() {
                            return Ok(Termination::BudgetExhausted);
                        }
                        self.fly(p, &mut swarm, &informants, problem, ctx.sampler);
                        let f = ctx.eval.call(swarm.x.row(p))?;
                        swarm.remember(p, f);
                    }
                }
            }
            debug!(
                "particle-swarm: iteration {}, swarm best {}",
                ctx.iterations,
                swarm.fbest[swarm.leader()]
            );
        }
        Ok(Termination::BudgetExhausted)
    }
}
