//! The public entry point: a problem, one of the seven algorithms, an objective and a seed.
//!
//! # Examples
//!
//! ```
//! # extern crate boxopt;
//! # extern crate ndarray;
//! use boxopt::{local::HillClimberBuilder, Problem, Solver, Termination};
//! use ndarray::ArrayView1;
//!
//! let problem = Problem::continuous(vec![-5.0, -5.0], vec![5.0, 5.0], 500).unwrap();
//! let climber = HillClimberBuilder::default().stepsize(0.1).build().unwrap();
//! let sphere = |x: ArrayView1<f64>| x.dot(&x);
//! let mut solver = Solver::new(problem, climber, sphere, 1).unwrap();
//! let res = solver.solve();
//! assert_eq!(res.termination, Termination::BudgetExhausted);
//! assert_eq!(res.f_evals, 500);
//! assert!(solver.best_cost() < 0.1);
//! ```

use log::{info, warn};
use ndarray::prelude::*;
use std::time::Instant;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::direct::Direct;
use crate::errors::{Error, Result};
use crate::local::{HillClimber, NelderMead, Rosenbrock};
use crate::minimizer::{Context, Halt, Minimizer, OptimResult, Termination};
use crate::population::{EvolutionStrategy, Genetic, ParticleSwarm};
use crate::problem::Problem;
use crate::sampling::Sampler;
use crate::utils::Evaluator;

/// The algorithm a [`Solver`] runs, with its settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(tag = "algorithm", rename_all = "snake_case"))]
pub enum Algorithm {
    HillClimber(HillClimber),
    ParticleSwarm(ParticleSwarm),
    Genetic(Genetic),
    EvolutionStrategy(EvolutionStrategy),
    NelderMead(NelderMead),
    Rosenbrock(Rosenbrock),
    Direct(Direct),
}

macro_rules! impl_from_config {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Algorithm {
                fn from(config: $variant) -> Self {
                    Algorithm::$variant(config)
                }
            }
        )*
    };
}

impl_from_config!(
    HillClimber,
    ParticleSwarm,
    Genetic,
    EvolutionStrategy,
    NelderMead,
    Rosenbrock,
    Direct
);

impl Minimizer for Algorithm {
    fn name(&self) -> &'static str {
        match self {
            Algorithm::HillClimber(a) => a.name(),
            Algorithm::ParticleSwarm(a) => a.name(),
            Algorithm::Genetic(a) => a.name(),
            Algorithm::EvolutionStrategy(a) => a.name(),
            Algorithm::NelderMead(a) => a.name(),
            Algorithm::Rosenbrock(a) => a.name(),
            Algorithm::Direct(a) => a.name(),
        }
    }

    fn validate(&self, problem: &Problem) -> Result<()> {
        match self {
            Algorithm::HillClimber(a) => a.validate(problem),
            Algorithm::ParticleSwarm(a) => a.validate(problem),
            Algorithm::Genetic(a) => a.validate(problem),
            Algorithm::EvolutionStrategy(a) => a.validate(problem),
            Algorithm::NelderMead(a) => a.validate(problem),
            Algorithm::Rosenbrock(a) => a.validate(problem),
            Algorithm::Direct(a) => a.validate(problem),
        }
    }

    fn minimize<F>(&self, ctx: &mut Context<F>) -> std::result::Result<Termination, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        match self {
            Algorithm::HillClimber(a) => a.minimize(ctx),
            Algorithm::ParticleSwarm(a) => a.minimize(ctx),
            Algorithm::Genetic(a) => a.minimize(ctx),
            Algorithm::EvolutionStrategy(a) => a.minimize(ctx),
            Algorithm::NelderMead(a) => a.minimize(ctx),
            Algorithm::Rosenbrock(a) => a.minimize(ctx),
            Algorithm::Direct(a) => a.minimize(ctx),
        }
    }
}

/// Minimizes `objective` over `problem` with one algorithm and a fixed seed.
///
/// The objective receives points inside the box, with integer variables holding
/// integral values, and may return NaN to flag an invalid point: the run then stops
/// and keeps the best point found before it.
pub struct Solver<F> {
    problem: Problem,
    algorithm: Algorithm,
    objective: F,
    seed: u64,
    x0: Option<Array2<f64>>,
    result: Option<OptimResult>,
}

impl<F> Solver<F>
where
    F: FnMut(ArrayView1<f64>) -> f64,
{
    /// Fails if the algorithm settings do not fit the problem.
    pub fn new(problem: Problem, algorithm: impl Into<Algorithm>, objective: F, seed: u64) -> Result<Self> {
        let algorithm = algorithm.into();
        algorithm.validate(&problem)?;
        Ok(Solver {
            problem,
            algorithm,
            objective,
            seed,
            x0: None,
            result: None,
        })
    }

    /// Starting points, one per row. They are clamped into the box and integer
    /// components are rounded. Population methods use as many rows as they have slots;
    /// single-point methods use the first row.
    pub fn with_initial_points(mut self, mut x0: Array2<f64>) -> Result<Self> {
        if x0.ncols() != self.problem.dim() {
            return Err(Error::InitialPointDimension {
                expected: self.problem.dim(),
                found: x0.ncols(),
            });
        }
        for mut row in x0.outer_iter_mut() {
            let mut x = row.to_owned();
            self.problem.repair(&mut x);
            row.assign(&x);
        }
        self.x0 = Some(x0);
        Ok(self)
    }

    /// A single starting point.
    pub fn with_initial_point(self, x0: Array1<f64>) -> Result<Self> {
        self.with_initial_points(x0.insert_axis(Axis(0)))
    }

    /// Runs the search from scratch. Running twice gives the same result.
    pub fn solve(&mut self) -> &OptimResult {
        let start = Instant::now();
        let name = self.algorithm.name();
        info!(
            "{}: n={}, budget={}, seed={}",
            name,
            self.problem.dim(),
            self.problem.budget(),
            self.seed
        );

        let mut sampler = Sampler::seeded(self.seed);
        let mut eval = Evaluator::new(&self.problem, &mut self.objective);
        let mut ctx = Context {
            eval: &mut eval,
            sampler: &mut sampler,
            x0: self.x0.as_ref().map(|x0| x0.view()),
            iterations: 0,
        };
        let termination = match self.algorithm.minimize(&mut ctx) {
            Ok(t) => t,
            Err(halt) => halt.into(),
        };
        let iterations = ctx.iterations;
        let f_evals = eval.num;
        let (minimum, minimum_value) = eval.into_best();

        match termination {
            Termination::NonFiniteCost => warn!("{}: objective returned a non-finite value, stopping", name),
            Termination::Degenerate => warn!("{}: search collapsed, stopping", name),
            _ => (),
        }
        info!(
            "{}: {:?} after {} evaluations, {} iterations, best {}",
            name, termination, f_evals, iterations, minimum_value
        );

        self.result.insert(OptimResult {
            runtime: start.elapsed(),
            f_evals,
            iterations,
            minimum,
            minimum_value,
            termination,
        })
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// The result of the last [`solve`](Solver::solve), if any.
    pub fn result(&self) -> Option<&OptimResult> {
        self.result.as_ref()
    }

    /// The best point of the last run. `None` before `solve` or when no evaluation
    /// returned a finite cost.
    pub fn best_x(&self) -> Option<ArrayView1<f64>> {
        self.result.as_ref().and_then(|r| r.minimum.as_ref().map(|x| x.view()))
    }

    /// The best cost of the last run, `+inf` when there is none.
    pub fn best_cost(&self) -> f64 {
        self.result.as_ref().map_or(f64::INFINITY, |r| r.minimum_value)
    }

    pub fn eval_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.f_evals)
    }

    pub fn termination(&self) -> Option<Termination> {
        self.result.as_ref().map(|r| r.termination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{HillClimberBuilder, NelderMeadBuilder};

    fn sphere(x: ArrayView1<f64>) -> f64 {
        x.dot(&x)
    }

    #[test]
    fn accessors_before_solve() {
        let problem = Problem::continuous(vec![-1.0], vec![1.0], 10).unwrap();
        let solver = Solver::new(problem, HillClimber::default(), sphere, 0).unwrap();
        assert!(solver.best_x().is_none());
        assert_eq!(solver.best_cost(), f64::INFINITY);
        assert_eq!(solver.eval_count(), 0);
        assert!(solver.termination().is_none());
    }

    #[test]
    fn rejects_bad_settings() {
        let problem = Problem::continuous(vec![-1.0], vec![1.0], 10).unwrap();
        let climber = HillClimberBuilder::default().stepsize(-1.0).build().unwrap();
        assert!(matches!(
            Solver::new(problem, climber, sphere, 0),
            Err(Error::InvalidSetting { name: "stepsize", .. })
        ));
    }

    #[test]
    fn rejects_initial_points_of_wrong_width() {
        let problem = Problem::continuous(vec![-1.0, -1.0], vec![1.0, 1.0], 10).unwrap();
        let solver = Solver::new(problem, HillClimber::default(), sphere, 0).unwrap();
        let err = solver.with_initial_points(Array2::zeros((2, 3))).err();
        assert_eq!(err, Some(Error::InitialPointDimension { expected: 2, found: 3 }));
    }

    #[test]
    fn initial_points_are_repaired() {
        let problem = Problem::new(vec![-1.0, 0.0], vec![1.0, 5.0], vec![false, true], 1).unwrap();
        let mut seen = Vec::new();
        let objective = |x: ArrayView1<f64>| {
            seen.push(x.to_owned());
            0.0
        };
        let mut solver = Solver::new(problem, HillClimber::default(), objective, 0)
            .unwrap()
            .with_initial_point(array![3.0, 2.6])
            .unwrap();
        solver.solve();
        drop(solver);
        assert_eq!(seen, vec![array![1.0, 3.0]]);
    }

    #[test]
    fn zero_budget_leaves_best_unset() {
        let problem = Problem::continuous(vec![-1.0], vec![1.0], 0).unwrap();
        let mut solver = Solver::new(problem, NelderMead::default(), sphere, 0).unwrap();
        let res = solver.solve();
        assert_eq!(res.f_evals, 0);
        assert_eq!(res.termination, Termination::BudgetExhausted);
        assert!(solver.best_x().is_none());
        assert_eq!(solver.best_cost(), f64::INFINITY);
    }

    #[test]
    fn solving_twice_is_reproducible() {
        let problem = Problem::continuous(vec![-3.0; 3], vec![3.0; 3], 200).unwrap();
        let nm = NelderMeadBuilder::default().step0(0.1).build().unwrap();
        let mut solver = Solver::new(problem, nm, sphere, 42).unwrap();
        let first = solver.solve().clone();
        let second = solver.solve().clone();
        assert_eq!(first.minimum, second.minimum);
        assert_eq!(first.minimum_value.to_bits(), second.minimum_value.to_bits());
        assert_eq!(first.f_evals, second.f_evals);
    }

    #[test]
    fn algorithm_from_config() {
        let a: Algorithm = HillClimber::default().into();
        assert_eq!(a.name(), "hill-climber");
    }
}
