//! Derivative-free minimizers for box-constrained, possibly mixed integer, problems.
//!
//! A [`Problem`] holds the bounds, the integrality mask and the evaluation budget. A
//! [`Solver`] runs one of seven algorithms on it with a seeded random stream, so the
//! same arguments always give the same trajectory:
//!
//! * [`local::HillClimber`]: Gaussian steps from the best point.
//! * [`population::ParticleSwarm`]: fully informed or classic particle swarm.
//! * [`population::Genetic`]: genetic algorithm with bit-string integers.
//! * [`population::EvolutionStrategy`]: self-adaptive (μ+λ) evolution strategy.
//! * [`local::NelderMead`]: downhill simplex.
//! * [`local::Rosenbrock`]: rotating coordinate search.
//! * [`direct::Direct`]: DIRECT space partitioning.
//!
//! Every point handed to the objective lies inside the box with integer variables
//! holding integral values. The objective may return NaN for points it cannot
//! evaluate: the run stops there and keeps the best point found so far.
//!
//! ```
//! # extern crate boxopt;
//! # extern crate ndarray;
//! use boxopt::{direct::Direct, Problem, Solver};
//! use ndarray::ArrayView1;
//!
//! let problem = Problem::new(vec![-4.0, 0.0], vec![4.0, 9.0], vec![false, true], 300).unwrap();
//! let f = |x: ArrayView1<f64>| (x[0] - 1.0).powi(2) + (x[1] - 6.0).powi(2);
//! let mut solver = Solver::new(problem, Direct::default(), f, 0).unwrap();
//! solver.solve();
//! assert_eq!(solver.best_x().unwrap()[1], 6.0);
//! ```

#[macro_use]
extern crate derive_builder;

extern crate float_cmp;
extern crate log;
extern crate ndarray;
extern crate num_traits;
extern crate rand;
extern crate rand_distr;
extern crate rand_xoshiro;
#[cfg(feature = "serializable")]
extern crate serde;
extern crate thiserror;

pub mod direct;
pub mod errors;
pub mod local;
pub mod minimizer;
pub mod population;
pub mod problem;
pub mod sampling;
pub mod solver;
pub mod utils;

pub use crate::errors::{Error, Result};
pub use crate::minimizer::{Context, Halt, Minimizer, OptimResult, Termination};
pub use crate::problem::Problem;
pub use crate::sampling::Sampler;
pub use crate::solver::{Algorithm, Solver};
pub use crate::utils::Evaluator;
