//! This module provides the base framework for all minimizers present in this crate, such as the
//! shared search trait, the termination reasons and the result record.
use ndarray::prelude::*;
use std::time::Duration;

use crate::errors::Result;
use crate::problem::Problem;
use crate::sampling::Sampler;
use crate::utils::Evaluator;

/// Why a run stopped. Every variant is a normal end state; the best point found up to
/// that moment is always kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The evaluation budget is used up.
    BudgetExhausted,
    /// A configured generation or iteration cap was reached first.
    IterationLimit,
    /// The objective returned NaN or an infinity.
    NonFiniteCost,
    /// The search shape collapsed and cannot make progress (Nelder-Mead only).
    Degenerate,
}

/// An abrupt stop raised from inside a search loop and propagated with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    NonFinite,
    Degenerate,
}

impl From<Halt> for Termination {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::NonFinite => Termination::NonFiniteCost,
            Halt::Degenerate => Termination::Degenerate,
        }
    }
}

/// A minimization result, storing various details of the run and the final results.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimResult {
    /// The runtime of the minimization according to the system clock.
    pub runtime: Duration,
    /// The number of objective evaluations performed.
    pub f_evals: usize,
    /// The number of iterations (generations, simplex steps, direction trials or
    /// DIRECT sweeps) run.
    pub iterations: usize,
    /// The best parameters found, `None` if no evaluation returned a finite cost.
    pub minimum: Option<Array1<f64>>,
    /// The objective value at `minimum`, `+inf` if there is none.
    pub minimum_value: f64,
    /// How the run ended.
    pub termination: Termination,
}

/// Mutable state handed to a search for one run.
pub struct Context<'a, 'f, F: FnMut(ArrayView1<f64>) -> f64> {
    pub eval: &'a mut Evaluator<'f, F>,
    pub sampler: &'a mut Sampler,
    /// Initial points, one per row, already repaired into the box.
    pub x0: Option<ArrayView2<'a, f64>>,
    /// Incremented by the search once per iteration.
    pub iterations: usize,
}

impl<'a, 'f, F: FnMut(ArrayView1<f64>) -> f64> Context<'a, 'f, F> {
    #[inline]
    pub fn problem(&self) -> &'f Problem {
        self.eval.problem()
    }

    /// Row `i` of the initial points, if given.
    pub fn initial(&self, i: usize) -> Option<Array1<f64>> {
        self.x0
            .and_then(|x0| if i < x0.nrows() { Some(x0.row(i).to_owned()) } else { None })
    }

    /// Row `i` of the initial points, or a uniform sample of the box.
    pub fn initial_or_sample(&mut self, i: usize) -> Array1<f64> {
        match self.initial(i) {
            Some(x) => x,
            None => self.problem().sample(self.sampler),
        }
    }
}

/// A general minimizer trait, implemented by the configuration record of each algorithm.
pub trait Minimizer {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Checks the settings against the problem before any evaluation.
    fn validate(&self, problem: &Problem) -> Result<()>;

    /// Runs the search until the budget is spent or the algorithm stops by itself.
    /// Returns the normal termination reason, or a [`Halt`] raised by the evaluator or the
    /// algorithm.
    fn minimize<F>(&self, ctx: &mut Context<F>) -> std::result::Result<Termination, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64;
}
