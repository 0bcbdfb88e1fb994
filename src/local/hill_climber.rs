//! Stochastic hill climbing, the reference method the other searches are measured against.
//!
//! A single point is perturbed by Gaussian noise whose spread is a fixed fraction of each
//! variable's range, and the move is kept only when it strictly improves the cost.

use ndarray::prelude::*;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::minimizer::{Context, Halt, Minimizer, Termination};
use crate::problem::Problem;

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(default))]
/// A single-point random local search.
pub struct HillClimber {
    /// Standard deviation of a step, as a fraction of the variable's range.
    #[builder(default = "0.1")]
    pub stepsize: f64,
}

impl Default for HillClimber {
    fn default() -> Self {
        // every field has a builder default, so this cannot fail
        HillClimberBuilder::default().build().unwrap()
    }
}

impl Minimizer for HillClimber {
    fn name(&self) -> &'static str {
        "hill-climber"
    }

    fn validate(&self, _problem: &Problem) -> Result<()> {
        if !(self.stepsize.is_finite() && self.stepsize > 0.0) {
            return Err(Error::setting("stepsize", "must be positive and finite"));
        }
        Ok(())
    }

    fn minimize<F>(&self, ctx: &mut Context<F>) -> std::result::Result<Termination, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        if ctx.eval.exhausted() {
            return Ok(Termination::BudgetExhausted);
        }
        let problem = ctx.problem();
        let sd = problem.widths() * self.stepsize;

        let mut x = ctx.initial_or_sample(0);
        let mut fx = ctx.eval.call(x.view())?;

        while !ctx.eval.exhausted() {
            ctx.iterations += 1;
            let sampler = &mut *ctx.sampler;
            let mut trial = Array1::from_shape_fn(x.len(), |i| sampler.gauss(x[i], sd[i]));
            problem.repair(&mut trial);
            let f_trial = ctx.eval.call(trial.view())?;
            if f_trial < fx {
                x = trial;
                fx = f_trial;
            }
        }
        Ok(Termination::BudgetExhausted)
    }
}
