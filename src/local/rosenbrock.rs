//! Rosenbrock's rotating coordinate search.
//!
//! H. H. Rosenbrock. An automatic method for finding the greatest or least value of a
//! function. The Computer Journal, 3(3), 1960, pp 175--184.
//!
//! The search moves one direction at a time from the current best point, stretching a
//! direction's step after a success and reversing and shortening it after a failure.
//! Once every direction has seen both a success and a failure, the displacement since the
//! start of the cycle is used to build a new orthonormal basis whose first direction points
//! along it, which lets the method follow curved valleys. The search runs in the unit cube
//! so that all variables are on the same scale.

use log::debug;
use ndarray::prelude::*;
use num_traits::clamp;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::minimizer::{Context, Halt, Minimizer, Termination};
use crate::problem::Problem;

/// Residual norm under which a Gram-Schmidt candidate counts as linearly dependent.
const DEPENDENT: f64 = 1e-10;

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(default))]
/// Rotating coordinate search.
pub struct Rosenbrock {
    /// Step expansion factor after a success.
    #[builder(default = "2.0")]
    pub alpha: f64,

    /// Step contraction factor after a failure, in `(0, 1)`.
    #[builder(default = "0.5")]
    pub beta: f64,

    /// Initial step along every direction, in the unit cube.
    #[builder(default = "0.125")]
    pub stepsize: f64,
}

impl Default for Rosenbrock {
    fn default() -> Self {
        // every field has a builder default, so this cannot fail
        RosenbrockBuilder::default().build().unwrap()
    }
}

/// The direction set of a Rosenbrock search and its bookkeeping for one rotation cycle.
#[derive(Debug, Clone)]
pub struct RotatingBasis {
    /// Unit directions, one per row.
    directions: Array2<f64>,
    /// Signed step length along each direction.
    steps: Array1<f64>,
    success: Vec<bool>,
    fail: Vec<bool>,
    /// Point at the start of the current cycle.
    origin: Array1<f64>,
    alpha: f64,
    beta: f64,
}

impl RotatingBasis {
    /// The coordinate axes with a step of `stepsize` each, starting a cycle at `origin`.
    pub fn new(origin: Array1<f64>, stepsize: f64, alpha: f64, beta: f64) -> Self {
        let n = origin.len();
        RotatingBasis {
            directions: Array2::eye(n),
            steps: Array1::from_elem(n, stepsize),
            success: vec![false; n],
            fail: vec![false; n],
            origin,
            alpha,
            beta,
        }
    }

    pub fn dim(&self) -> usize {
        self.steps.len()
    }

    pub fn directions(&self) -> ArrayView2<f64> {
        self.directions.view()
    }

    pub fn steps(&self) -> ArrayView1<f64> {
        self.steps.view()
    }

    /// Step length times direction `i`.
    pub fn move_vector(&self, i: usize) -> Array1<f64> {
        &self.directions.row(i) * self.steps[i]
    }

    /// Number of success and fail flags raised in this cycle, at most `2n`.
    pub fn flags_sum(&self) -> usize {
        self.success.iter().chain(&self.fail).filter(|&&f| f).count()
    }

    /// Records the outcome of a trial along direction `i`. `point` is the current best
    /// point after the trial. Rotates the basis and starts a new cycle at `point` once every
    /// direction has both succeeded and failed; returns whether that happened.
    pub fn register(&mut self, i: usize, improved: bool, point: ArrayView1<f64>) -> bool {
        if improved {
            self.steps[i] *= self.alpha;
            self.success[i] = true;
        } else {
            self.steps[i] *= -self.beta;
            self.fail[i] = true;
        }
        if self.flags_sum() < 2 * self.dim() {
            return false;
        }
        let displacement = &point - &self.origin;
        self.rotate(displacement.view());
        self.origin.assign(&point);
        for f in self.success.iter_mut().chain(self.fail.iter_mut()) {
            *f = false;
        }
        true
    }

    /// Gram-Schmidt on `A_i = sum_{j >= i} p_j d_j`, where `p_j` is the displacement's
    /// component along `d_j`. Dependent candidates fall back to the old direction, then to
    /// the coordinate axes. Step lengths keep their magnitude and turn positive.
    fn rotate(&mut self, displacement: ArrayView1<f64>) {
        let n = self.dim();
        let progress = self.directions.dot(&displacement);

        // suffix sums of p_j d_j
        let mut accumulated = Array2::<f64>::zeros((n, n));
        let mut tail = Array1::<f64>::zeros(n);
        for j in (0..n).rev() {
            tail.scaled_add(progress[j], &self.directions.row(j));
            accumulated.row_mut(j).assign(&tail);
        }

        let mut basis = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            let mut candidates = std::iter::once(accumulated.row(i).to_owned())
                .chain(std::iter::once(self.directions.row(i).to_owned()))
                .chain((0..n).map(|k| {
                    let mut e = Array1::zeros(n);
                    e[k] = 1.0;
                    e
                }));
            // the axes span the space, so some candidate always survives
            let unit = {
                let done = basis.slice(s![..i, ..]);
                candidates.find_map(|a| orthonormalize(a, done))
            };
            if let Some(unit) = unit {
                basis.row_mut(i).assign(&unit);
            }
        }
        self.directions = basis;
        self.steps.mapv_inplace(f64::abs);
    }
}

/// `a` minus its projections on the rows of `done`, normalized; `None` if nothing is left.
fn orthonormalize(mut a: Array1<f64>, done: ArrayView2<f64>) -> Option<Array1<f64>> {
    let scale = a.dot(&a).sqrt();
    if scale < DEPENDENT {
        return None;
    }
    a /= scale;
    for b in done.outer_iter() {
        let proj = a.dot(&b);
        a.scaled_add(-proj, &b);
    }
    let norm = a.dot(&a).sqrt();
    if norm < DEPENDENT {
        None
    } else {
        Some(a / norm)
    }
}

impl Minimizer for Rosenbrock {
    fn name(&self) -> &'static str {
        "rosenbrock"
    }

    fn validate(&self, _problem: &Problem) -> Result<()> {
        if !(self.alpha > 1.0 && self.alpha.is_finite()) {
            return Err(Error::setting("alpha", "must be larger than 1"));
        }
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(Error::setting("beta", "must lie in (0, 1)"));
        }
        if !(self.stepsize > 0.0 && self.stepsize <= 1.0) {
            return Err(Error::setting("stepsize", "must lie in (0, 1]"));
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
        // fixed variables cannot move, so the basis only spans the others
        let free: Vec<usize> = (0..problem.dim()).filter(|&d| problem.width(d) > 0.0).collect();

        let mut x = ctx.initial_or_sample(0);
        let mut fx = ctx.eval.call(x.view())?;
        let mut u = problem.to_unit(x.view());
        let mut basis = RotatingBasis::new(u.select(Axis(0), &free), self.stepsize, self.alpha, self.beta);

        let mut i = 0;
        while !ctx.eval.exhausted() {
            ctx.iterations += 1;
            if free.is_empty() {
                ctx.eval.call(x.view())?;
                continue;
            }
            let mut trial_u = u.clone();
            for (k, step) in basis.move_vector(i).iter().enumerate() {
                trial_u[free[k]] = clamp(trial_u[free[k]] + step, 0.0, 1.0);
            }
            let mut trial = problem.from_unit(trial_u.view());
            problem.repair(&mut trial);

            let f_trial = ctx.eval.call(trial.view())?;
            let improved = f_trial < fx;
            if improved {
                x = trial;
                fx = f_trial;
                u = problem.to_unit(x.view());
            }
            if basis.register(i, improved, u.select(Axis(0), &free).view()) {
                debug!("rosenbrock: rotated basis at f={}, steps {}", fx, basis.steps());
                i = 0;
            } else {
                i = (i + 1) % free.len();
            }
        }
        Ok(Termination::BudgetExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;
    use float_cmp::approx_eq;

    fn assert_orthonormal(basis: ArrayView2<f64>) {
        let gram = basis.dot(&basis.t());
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    approx_eq!(f64, gram[[i, j]], expected, epsilon = 1e-12),
                    "gram[{}, {}] = {}",
                    i,
                    j,
                    gram[[i, j]]
                );
            }
        }
    }

    #[test]
    fn rotates_after_every_direction_succeeds_and_fails() {
        let mut basis = RotatingBasis::new(array![0.5, 0.5], 0.125, 2.0, 0.5);
        let before = basis.directions().to_owned();

        assert!(!basis.register(0, true, array![0.625, 0.5].view()));
        assert!(!basis.register(1, true, array![0.625, 0.625].view()));
        assert!(!basis.register(0, false, array![0.625, 0.625].view()));
        assert_eq!(basis.flags_sum(), 3);
        assert!(basis.register(1, false, array![0.625, 0.625].view()));
        assert_eq!(basis.flags_sum(), 0);

        assert_ne!(basis.directions(), before.view());
        assert_orthonormal(basis.directions());
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let d = basis.directions();
        assert!(approx_eq!(f64, d[[0, 0]], h, epsilon = 1e-12));
        assert!(approx_eq!(f64, d[[0, 1]], h, epsilon = 1e-12));
        assert!(approx_eq!(f64, d[[1, 0]], -h, epsilon = 1e-12));
        assert!(approx_eq!(f64, d[[1, 1]], h, epsilon = 1e-12));
        // 0.125 * 2 * 0.5 on both directions
        assert_eq!(basis.steps(), array![0.125, 0.125].view());
    }

    #[test]
    fn repeated_flags_do_not_count_twice() {
        let mut basis = RotatingBasis::new(array![0.5, 0.5, 0.5], 0.1, 2.0, 0.5);
        for _ in 0..10 {
            assert!(!basis.register(0, true, array![0.5, 0.5, 0.5].view()));
        }
        assert_eq!(basis.flags_sum(), 1);
    }

    #[test]
    fn dependent_progress_keeps_an_orthonormal_basis() {
        // only the first direction moved, so A_1 and A_2 vanish
        let mut basis = RotatingBasis::new(array![0.2, 0.2, 0.2], 0.1, 2.0, 0.5);
        let point = array![0.3, 0.2, 0.2];
        basis.register(0, true, point.view());
        for i in 1..3 {
            basis.register(i, false, point.view());
        }
        basis.register(0, false, point.view());
        for i in 1..3 {
            basis.register(i, true, point.view());
        }
        assert_eq!(basis.flags_sum(), 0);
        assert_orthonormal(basis.directions());
    }

    #[test]
    fn follows_a_curved_valley() {
        let function =
            |x: ArrayView1<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
        let problem = Problem::continuous(vec![-2.0, -2.0], vec![2.0, 2.0], 3000).unwrap();
        let mut solver = Solver::new(problem, Rosenbrock::default(), function, 4)
            .unwrap()
            .with_initial_point(array![-1.2, 1.0])
            .unwrap();
        let res = solver.solve();
        println!("res: {:?}", res);
        assert_eq!(res.f_evals, 3000);
        assert!(res.minimum_value < 5e-2);
    }

    #[test]
    fn fixed_variables_do_not_stall_the_rotation() {
        // a third variable fixed at 1 leaves the valley unchanged
        let function = |x: ArrayView1<f64>| {
            let banana = (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
            x.iter().skip(2).fold(banana, |f, v| f * v)
        };
        let run = |lb: Vec<f64>, ub: Vec<f64>, x0: Array1<f64>| {
            let problem = Problem::continuous(lb, ub, 3000).unwrap();
            Solver::new(problem, Rosenbrock::default(), function, 4)
                .unwrap()
                .with_initial_point(x0)
                .unwrap()
                .solve()
                .clone()
        };
        let plain = run(vec![-2.0, -2.0], vec![2.0, 2.0], array![-1.2, 1.0]);
        let fixed = run(vec![-2.0, -2.0, 1.0], vec![2.0, 2.0, 1.0], array![-1.2, 1.0, 1.0]);
        println!("plain: {:?}, fixed: {:?}", plain, fixed);
        assert!(plain.minimum_value < 1e-4);
        assert_eq!(fixed.minimum_value, plain.minimum_value);
        assert_eq!(fixed.iterations, plain.iterations);
        let (a, b) = (plain.minimum.unwrap(), fixed.minimum.unwrap());
        assert_eq!(a, b.slice(s![..2]));
        assert_eq!(b[2], 1.0);
    }

    #[test]
    fn all_variables_fixed() {
        let problem = Problem::continuous(vec![2.0, -1.0], vec![2.0, -1.0], 20).unwrap();
        let mut solver = Solver::new(problem, Rosenbrock::default(), |x: ArrayView1<f64>| x.sum(), 0).unwrap();
        let res = solver.solve();
        assert_eq!(res.f_evals, 20);
        assert_eq!(res.minimum_value, 1.0);
    }

    #[test]
    fn integer_points_stay_integral() {
        let problem = Problem::new(vec![-10.0, -1.0], vec![10.0, 1.0], vec![true, false], 400).unwrap();
        let mut seen = Vec::new();
        let function = |x: ArrayView1<f64>| {
            seen.push(x[0]);
            (x[0] - 4.0).powi(2) + x[1].powi(2)
        };
        let mut solver = Solver::new(problem, Rosenbrock::default(), function, 8).unwrap();
        let res = solver.solve().clone();
        drop(solver);
        assert_eq!(seen.len(), 400);
        assert!(seen.iter().all(|v| v.fract() == 0.0));
        assert_eq!(res.minimum.unwrap()[0].fract(), 0.0);
    }
}
