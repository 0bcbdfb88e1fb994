//! Nelder-Mead simplex search inside a box.
//!
//! The simplex of `n + 1` vertices starts as a Gaussian cloud around a centre point and
//! is kept sorted by cost, vertex 0 being the best. Every trial point is clamped into the
//! box and has its integer components rounded before it is evaluated.
//!
//! # Use case
//!
//! The Nelder-Mead algorithm does not require a gradient or a hessian.
//! As a tradeoff it typically requires a lot of function evaluations to
//! find a minimum. Further, there are few theoretical results on the
//! convergence of Nelder-Mead iterations.
//!
//! # Budget
//!
//! Reflection, expansion and contraction are only evaluated while budget remains. A
//! shrink is only started while budget remains but always re-evaluates all `n` non-best
//! vertices, so a run makes at most `budget + n - 1` objective calls.
//!
//! # Examples
//!
//! ```
//! # extern crate ndarray;
//! # extern crate boxopt;
//! # use ndarray::prelude::*;
//! # use boxopt::{local::NelderMeadBuilder, Problem, Solver};
//!
//! let function =
//!     |x: ArrayView1<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
//! let minimizer = NelderMeadBuilder::default()
//!     .step0(0.05)
//!     .build()
//!     .unwrap();
//! let problem = Problem::continuous(vec![-5.0, -5.0], vec![5.0, 5.0], 2000).unwrap();
//! let mut solver = Solver::new(problem, minimizer, function, 7)
//!     .unwrap()
//!     .with_initial_point(array![3.0, -4.0])
//!     .unwrap();
//! let res = solver.solve();
//! println!("res: {:?}", res);
//! ```

use float_cmp::ApproxEqUlps;
use log::debug;
use ndarray::prelude::*;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::minimizer::{Context, Halt, Minimizer, Termination};
use crate::problem::Problem;
use crate::utils::Evaluator;

type Simplex = Vec<(f64, Array1<f64>)>;

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(default))]
/// A minimizer for a function of one or more variables using the Nelder-Mead algorithm.
pub struct NelderMead {
    /// Reflection coefficient.
    #[builder(default = "1.0")]
    pub alpha: f64,

    /// Expansion coefficient, larger than 1.
    #[builder(default = "1.5")]
    pub gamma: f64,

    /// Contraction coefficient, in `(0, 1)`.
    #[builder(default = "0.25")]
    pub rho: f64,

    /// Shrink coefficient, in `(0, 1)`.
    #[builder(default = "0.2")]
    pub sigma: f64,

    /// Spread of the initial simplex around its centre, as a fraction of each variable's range.
    #[builder(default = "0.02")]
    pub step0: f64,

    /// The required number of floating point representations that separate two numbers to consider them
    /// equal when deciding whether the simplex has collapsed. See crate float_cmp for more information.
    #[builder(default = "1")]
    pub ulps: i64,

    /// The maximum number of iterations. Unlimited by default, the budget ends the run.
    #[builder(default = "None")]
    #[builder(setter(into))]
    pub maxiter: Option<usize>,
}

impl Default for NelderMead {
    fn default() -> Self {
        // every field has a builder default, so this cannot fail
        NelderMeadBuilder::default().build().unwrap()
    }
}

impl Minimizer for NelderMead {
    fn name(&self) -> &'static str {
        "nelder-mead"
    }

    fn validate(&self, _problem: &Problem) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(Error::setting("alpha", "must be positive and finite"));
        }
        if !(self.gamma > 1.0 && self.gamma.is_finite()) {
            return Err(Error::setting("gamma", "must be larger than 1"));
        }
        if !(self.rho > 0.0 && self.rho < 1.0) {
            return Err(Error::setting("rho", "must lie in (0, 1)"));
        }
        if !(self.sigma > 0.0 && self.sigma < 1.0) {
            return Err(Error::setting("sigma", "must lie in (0, 1)"));
        }
        if !(self.step0 > 0.0 && self.step0.is_finite()) {
            return Err(Error::setting("step0", "must be positive and finite"));
        }
        if self.ulps < 0 {
            return Err(Error::setting("ulps", "must not be negative"));
        }
        Ok(())
    }

    fn minimize<F>(&self, ctx: &mut Context<F>) -> std::result::Result<Termination, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        let problem = ctx.problem();
        let n = problem.dim();
        let spread = problem.widths() * self.step0;

        let center = ctx.initial_or_sample(0);
        let mut simplex = Simplex::with_capacity(n + 1);
        for k in 0..n + 1 {
            if ctx.eval.exhausted() {
                return Ok(Termination::BudgetExhausted);
            }
            let x = if k == 0 {
                center.clone()
            } else {
                let sampler = &mut *ctx.sampler;
                let mut y = Array1::from_shape_fn(n, |i| sampler.gauss(center[i], spread[i]));
                problem.repair(&mut y);
                y
            };
            simplex.push((ctx.eval.call(x.view())?, x));
        }
        self.order_simplex(&mut simplex);
        let mut centroid = self.centroid(&simplex);

        while !ctx.eval.exhausted() {
            if self.maxiter.map_or(false, |m| ctx.iterations >= m) {
                return Ok(Termination::IterationLimit);
            }
            ctx.iterations += 1;
            match self.step(&mut simplex, &mut centroid, ctx.eval)? {
                Some(moved) => debug!("nelder-mead: {:?}, best {}", moved, simplex[0].0),
                None => break,
            }
        }
        Ok(Termination::BudgetExhausted)
    }
}

/// What an iteration did to the simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Reflect,
    Expand,
    ContractOutside,
    ContractInside,
    Shrink,
}

impl NelderMead {
    /// One iteration on an ordered simplex. `None` when the budget ran out halfway; an
    /// outside contraction cut short still keeps its reflected point.
    fn step<F>(
        &self,
        simplex: &mut Simplex,
        centroid: &mut Array1<f64>,
        eval: &mut Evaluator<F>,
    ) -> std::result::Result<Option<Move>, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        let problem = eval.problem();
        let n = simplex.len() - 1;
        let f_worst = simplex[n].0;
        let f_second = simplex[n - 1].0;
        let f_best = simplex[0].0;

        let reflected = self.towards(problem, centroid, &simplex[n].1, -self.alpha);
        if self.collapsed(&reflected, &simplex[n].1) {
            debug!(
                "nelder-mead: reflection of the worst vertex is the vertex itself (f={})",
                f_worst
            );
            return Err(Halt::Degenerate);
        }
        let f_reflected = eval.call(reflected.view())?;

        if f_reflected < f_best {
            // try expanding beyond the reflection
            if eval.exhausted() {
                self.lean_update(simplex, centroid, reflected, f_reflected);
                return Ok(None);
            }
            let expanded = self.towards(problem, centroid, &reflected, self.gamma);
            let f_expanded = eval.call(expanded.view())?;
            if f_expanded < f_reflected {
                self.lean_update(simplex, centroid, expanded, f_expanded);
                return Ok(Some(Move::Expand));
            }
            self.lean_update(simplex, centroid, reflected, f_reflected);
            return Ok(Some(Move::Reflect));
        }
        if f_reflected < f_second {
            self.lean_update(simplex, centroid, reflected, f_reflected);
            return Ok(Some(Move::Reflect));
        }

        // contract outside when the reflection beats the worst vertex, inside otherwise
        let outside = f_reflected < f_worst;
        if eval.exhausted() {
            if outside {
                self.lean_update(simplex, centroid, reflected, f_reflected);
            }
            return Ok(None);
        }
        let contracted = if outside {
            self.towards(problem, centroid, &reflected, self.rho)
        } else {
            self.towards(problem, centroid, &simplex[n].1, self.rho)
        };
        let f_contracted = eval.call(contracted.view())?;
        if outside && f_contracted <= f_reflected {
            self.lean_update(simplex, centroid, contracted, f_contracted);
            return Ok(Some(Move::ContractOutside));
        }
        if !outside && f_contracted < f_worst {
            self.lean_update(simplex, centroid, contracted, f_contracted);
            return Ok(Some(Move::ContractInside));
        }
        if eval.exhausted() {
            if outside {
                self.lean_update(simplex, centroid, reflected, f_reflected);
            }
            return Ok(None);
        }
        self.shrink(simplex, eval, centroid)?;
        Ok(Some(Move::Shrink))
    }

    /// `centroid + coef * (x - centroid)`, repaired into the box.
    #[inline]
    fn towards(&self, problem: &Problem, centroid: &Array1<f64>, x: &Array1<f64>, coef: f64) -> Array1<f64> {
        let mut y = centroid + &(coef * &(x - centroid));
        problem.repair(&mut y);
        y
    }

    /// Whether the reflected point landed back on the worst vertex.
    #[inline]
    fn collapsed(&self, reflected: &Array1<f64>, worst: &Array1<f64>) -> bool {
        reflected
            .iter()
            .zip(worst.iter())
            .all(|(r, w)| r.approx_eq_ulps(w, self.ulps))
    }

    /// Replace the worst vertex and update the centroid in O(n), knowing only one vertex
    /// changed. The stable sort keeps a tied newcomer behind the older vertices.
    #[inline]
    fn lean_update(&self, simplex: &mut Simplex, centroid: &mut Array1<f64>, xnew: Array1<f64>, fnew: f64) {
        let n = simplex.len();
        *centroid += &(&xnew / (n - 1) as f64);
        simplex[n - 1] = (fnew, xnew);
        self.order_simplex(simplex);
        *centroid -= &(&simplex[n - 1].1 / (n - 1) as f64);
    }

    /// Shrink all points towards the best point and re-evaluate them.
    /// Assumes the simplex is ordered. Shrinkage requires n function evaluations.
    fn shrink<F>(
        &self,
        simplex: &mut Simplex,
        f: &mut Evaluator<F>,
        centroid: &mut Array1<f64>,
    ) -> std::result::Result<(), Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        let problem = f.problem();
        {
            let mut iter = simplex.iter_mut();
            if let Some((_, x0)) = iter.next() {
                for (fi, xi) in iter {
                    *xi *= self.sigma;
                    *xi += &((1.0 - self.sigma) * &x0.view());
                    problem.repair(xi);
                    *fi = f.call(xi.view())?;
                }
            }
        }
        self.order_simplex(simplex);
        *centroid = self.centroid(simplex);
        Ok(())
    }

    /// calculate the centroid of all points but the worst one.
    /// Assumes that the simplex is ordered. This calculation is O(n^2).
    #[inline]
    fn centroid(&self, simplex: &Simplex) -> Array1<f64> {
        let n = simplex.len();
        let mut centroid = Array1::zeros(simplex[0].1.len());
        for (_, xi) in simplex.iter().take(n - 1) {
            centroid += xi;
        }
        centroid / (n - 1) as f64
    }

    #[inline]
    fn order_simplex(&self, simplex: &mut Simplex) {
        simplex.sort_by(|(fa, _), (fb, _)| fa.total_cmp(fb));
    }
}
