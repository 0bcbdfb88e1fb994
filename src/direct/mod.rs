//! DIviding RECTangles: a deterministic global search that keeps splitting the boxes
//! that are most promising for some Lipschitz constant of the objective.
//!
//! The box is rescaled to the unit cube. Every sweep selects the potentially optimal
//! boxes of the current partition and trisects each of them along its longest sides.
//! Integer variables are rounded after mapping back, so neighbouring centres may hit the
//! same integer point.

mod partition;

pub use self::partition::Partition;
pub use self::partition::Rect;

use log::debug;
use ndarray::prelude::*;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::minimizer::{Context, Halt, Minimizer, Termination};
use crate::problem::Problem;
use crate::utils::Evaluator;

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(default))]
/// DIRECT settings.
pub struct Direct {
    /// Required relative improvement over the current minimum for a box to be selected.
    /// Larger values bias the search towards big unexplored boxes.
    #[builder(default = "1e-4")]
    pub ep: f64,

    /// Maximum number of sweeps.
    #[builder(default = "None")]
    #[builder(setter(into))]
    pub maxiter: Option<usize>,
}

impl Default for Direct {
    fn default() -> Self {
        // every field has a builder default, so this cannot fail
        DirectBuilder::default().build().unwrap()
    }
}

/// Evaluates a point of the unit cube.
fn evaluate_unit<F>(eval: &mut Evaluator<F>, problem: &Problem, u: ArrayView1<f64>) -> std::result::Result<f64, Halt>
where
    F: FnMut(ArrayView1<f64>) -> f64,
{
    let mut x = problem.from_unit(u);
    problem.repair(&mut x);
    eval.call(x.view())
}

impl Minimizer for Direct {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn validate(&self, _problem: &Problem) -> Result<()> {
        if !(self.ep >= 0.0 && self.ep.is_finite()) {
            return Err(Error::setting("ep", "must be non-negative and finite"));
        }
        Ok(())
    }

    fn minimize<F>(&self, ctx: &mut Context<F>) -> std::result::Result<Termination, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        let problem = ctx.problem();
        if ctx.eval.exhausted() {
            return Ok(Termination::BudgetExhausted);
        }
        let center = Array1::from_elem(problem.dim(), 0.5);
        let fc = evaluate_unit(ctx.eval, problem, center.view())?;
        let mut partition = Partition::new(problem.dim(), fc);

        loop {
            if ctx.eval.exhausted() {
                return Ok(Termination::BudgetExhausted);
            }
            if self.maxiter.map_or(false, |m| ctx.iterations >= m) {
                return Ok(Termination::IterationLimit);
            }
            ctx.iterations += 1;

            let chosen = partition.potentially_optimal(self.ep);
            debug!(
                "direct: sweep {}, {} boxes, {} potentially optimal, best {}",
                ctx.iterations,
                partition.len(),
                chosen.len(),
                partition.rects()[partition.best()].fc()
            );
            for j in chosen {
                if ctx.eval.exhausted() {
                    return Ok(Termination::BudgetExhausted);
                }
                partition.divide(j, |u| evaluate_unit(ctx.eval, problem, u))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    #[test]
    fn shifted_sphere() {
        let problem = Problem::continuous(vec![-2.0, -2.0], vec![2.0, 2.0], 600).unwrap();
        let f = |x: ArrayView1<f64>| (x[0] - 0.3).powi(2) + (x[1] + 0.7).powi(2);
        let mut solver = Solver::new(problem, Direct::default(), f, 0).unwrap();
        let res = solver.solve();
        println!("res: {:?}", res);
        assert_eq!(res.termination, Termination::BudgetExhausted);
        assert!(res.minimum_value < 1e-2);
    }

    #[test]
    fn overshoot_is_bounded() {
        let n = 3;
        for budget in 1..40 {
            let problem = Problem::continuous(vec![0.0; n], vec![1.0; n], budget).unwrap();
            let f = |x: ArrayView1<f64>| x.iter().map(|v| (v - 0.1).abs()).sum::<f64>();
            let mut solver = Solver::new(problem, Direct::default(), f, 0).unwrap();
            let res = solver.solve();
            assert!(res.f_evals >= budget);
            assert!(res.f_evals <= budget + 2 * n - 1);
        }
    }

    #[test]
    fn sweeps_are_capped() {
        let problem = Problem::continuous(vec![0.0], vec![1.0], 1000).unwrap();
        let direct = DirectBuilder::default().maxiter(1).build().unwrap();
        let mut solver = Solver::new(problem, direct, |x: ArrayView1<f64>| x[0], 0).unwrap();
        let res = solver.solve();
        assert_eq!(res.termination, Termination::IterationLimit);
        assert_eq!(res.iterations, 1);
        assert_eq!(res.f_evals, 3);
    }

    #[test]
    fn deterministic_across_seeds() {
        let f = |x: ArrayView1<f64>| (x[0] * 3.0).sin() + x[1] * x[1];
        let run = |seed| {
            let problem = Problem::continuous(vec![-1.0; 2], vec![1.0; 2], 200).unwrap();
            Solver::new(problem, Direct::default(), f, seed).unwrap().solve().clone()
        };
        let (a, b) = (run(1), run(2));
        assert_eq!(a.minimum, b.minimum);
        assert_eq!(a.minimum_value, b.minimum_value);
    }

    #[test]
    fn rejects_negative_ep() {
        let problem = Problem::continuous(vec![0.0], vec![1.0], 10).unwrap();
        let direct = DirectBuilder::default().ep(-1.0).build().unwrap();
        assert!(direct.validate(&problem).is_err());
    }
}
