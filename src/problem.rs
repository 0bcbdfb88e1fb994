//! The box, the integrality mask and the evaluation budget of a minimization.

use ndarray::prelude::*;
use num_traits::clamp;

use crate::errors::{Error, Result};
use crate::sampling::Sampler;

/// A box-constrained problem over `n` mixed continuous/integer variables.
///
/// ```
/// # extern crate boxopt;
/// use boxopt::Problem;
///
/// let problem = Problem::new(vec![-5.0, 0.0], vec![5.0, 10.0], vec![false, true], 500).unwrap();
/// assert_eq!(problem.dim(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    lb: Array1<f64>,
    ub: Array1<f64>,
    integer: Vec<bool>,
    budget: usize,
}

impl Problem {
    /// Validates and builds a problem. Fails on mismatched lengths, an empty problem,
    /// non-finite or inverted bounds, and integer variables whose range holds no integer.
    pub fn new(lb: Vec<f64>, ub: Vec<f64>, integer: Vec<bool>, budget: usize) -> Result<Self> {
        if lb.len() != ub.len() || lb.len() != integer.len() {
            return Err(Error::DimensionMismatch {
                lower: lb.len(),
                upper: ub.len(),
                integer: integer.len(),
            });
        }
        if lb.is_empty() {
            return Err(Error::EmptyProblem);
        }
        for (index, ((&lower, &upper), &int)) in lb.iter().zip(&ub).zip(&integer).enumerate() {
            if !lower.is_finite() || !upper.is_finite() {
                return Err(Error::NonFiniteBound { index });
            }
            if lower > upper {
                return Err(Error::InvertedBounds {
                    index,
                    lower,
                    upper,
                });
            }
            if int && lower.ceil() > upper.floor() {
                return Err(Error::EmptyIntegerRange {
                    index,
                    lower,
                    upper,
                });
            }
        }
        Ok(Problem {
            lb: Array1::from(lb),
            ub: Array1::from(ub),
            integer,
            budget,
        })
    }

    /// A problem without integer variables.
    pub fn continuous(lb: Vec<f64>, ub: Vec<f64>, budget: usize) -> Result<Self> {
        let n = lb.len();
        Problem::new(lb, ub, vec![false; n], budget)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.lb.len()
    }

    /// The maximum number of objective calls.
    #[inline]
    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn lower(&self) -> ArrayView1<f64> {
        self.lb.view()
    }

    pub fn upper(&self) -> ArrayView1<f64> {
        self.ub.view()
    }

    #[inline]
    pub fn is_integer(&self, i: usize) -> bool {
        self.integer[i]
    }

    /// `ub[i] - lb[i]`.
    #[inline]
    pub fn width(&self, i: usize) -> f64 {
        self.ub[i] - self.lb[i]
    }

    pub fn widths(&self) -> Array1<f64> {
        &self.ub - &self.lb
    }

    /// Clamps `x` into `[lb, ub]` componentwise.
    pub fn check_bounds(&self, x: &mut Array1<f64>) {
        for ((xi, &lo), &hi) in x.iter_mut().zip(&self.lb).zip(&self.ub) {
            *xi = clamp(*xi, lo, hi);
        }
    }

    /// Rounds the integer components of `x` to the nearest integer inside their bounds.
    pub fn round_integers(&self, x: &mut Array1<f64>) {
        for i in 0..x.len() {
            if self.integer[i] {
                x[i] = clamp(x[i].round(), self.lb[i].ceil(), self.ub[i].floor());
            }
        }
    }

    /// Makes `x` evaluable: clamped into the box with integer components rounded.
    pub fn repair(&self, x: &mut Array1<f64>) {
        self.check_bounds(x);
        self.round_integers(x);
    }

    /// Whether `x` lies in the box and every integer component is integral.
    pub fn contains(&self, x: ArrayView1<f64>) -> bool {
        x.len() == self.dim()
            && x.iter().enumerate().all(|(i, &xi)| {
                xi >= self.lb[i] && xi <= self.ub[i] && (!self.integer[i] || xi.fract() == 0.0)
            })
    }

    /// A uniform draw from the box, repaired.
    pub fn sample(&self, sampler: &mut Sampler) -> Array1<f64> {
        let mut x = Array1::from_shape_fn(self.dim(), |i| sampler.uniform_in(self.lb[i], self.ub[i]));
        self.repair(&mut x);
        x
    }

    /// Maps a point of the unit cube onto the box. Not repaired.
    pub fn from_unit(&self, u: ArrayView1<f64>) -> Array1<f64> {
        &self.lb + &(&u * &self.widths())
    }

    /// Maps a point of the box into the unit cube. Zero-width variables map to 0.
    pub fn to_unit(&self, x: ArrayView1<f64>) -> Array1<f64> {
        Array1::from_shape_fn(self.dim(), |i| {
            let w = self.width(i);
            if w > 0.0 {
                (x[i] - self.lb[i]) / w
            } else {
                0.0
            }
        })
    }
}
