use ndarray::prelude::*;

use crate::minimizer::Halt;
use crate::problem::Problem;

/// Wraps the objective: counts calls against the budget and remembers the best point.
///
/// The best only changes on a finite cost that is strictly smaller than the current
/// one, so it never increases and never holds a NaN. A non-finite cost ends the run.
pub struct Evaluator<'a, F: FnMut(ArrayView1<f64>) -> f64> {
    pub num: usize,
    func: &'a mut F,
    problem: &'a Problem,
    best_x: Option<Array1<f64>>,
    best_fx: f64,
}

impl<'a, F: FnMut(ArrayView1<f64>) -> f64> Evaluator<'a, F> {
    pub fn new(problem: &'a Problem, func: &'a mut F) -> Self {
        Evaluator {
            num: 0,
            func,
            problem,
            best_x: None,
            best_fx: f64::INFINITY,
        }
    }

    /// Evaluates `arg`, which must already be repaired into the box.
    pub fn call(&mut self, arg: ArrayView1<f64>) -> Result<f64, Halt> {
        debug_assert!(self.problem.contains(arg), "evaluating a point outside the box");
        self.num += 1;
        let fx = (self.func)(arg);
        if !fx.is_finite() {
            return Err(Halt::NonFinite);
        }
        if fx < self.best_fx {
            self.best_fx = fx;
            self.best_x = Some(arg.to_owned());
        }
        Ok(fx)
    }

    #[inline]
    pub fn problem(&self) -> &'a Problem {
        self.problem
    }

    #[inline]
    pub fn exhausted(&self) -> bool {
        self.num >= self.problem.budget()
    }

    #[inline]
    pub fn best_fx(&self) -> f64 {
        self.best_fx
    }

    pub fn best_x(&self) -> Option<&Array1<f64>> {
        self.best_x.as_ref()
    }

    pub fn into_best(self) -> (Option<Array1<f64>>, f64) {
        (self.best_x, self.best_fx)
    }
}

/// Indices that sort `costs` ascending. Ties keep their original order.
pub fn argsort(costs: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..costs.len()).collect();
    order.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
    order
}

/// Roulette weights for a population ordered by `order`: the best gets `len`, the worst 1.
pub fn rank_weights(order: &[usize]) -> Vec<f64> {
    let len = order.len();
    let mut weights = vec![0.0; len];
    for (rank, &i) in order.iter().enumerate() {
        weights[i] = (len - rank) as f64;
    }
    weights
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn counts_calls_and_tracks_best() {
        let problem = Problem::continuous(vec![-1.0], vec![1.0], 3).unwrap();
        let mut f = |x: ArrayView1<f64>| x[0] * x[0];
        let mut eval = Evaluator::new(&problem, &mut f);
        assert_eq!(eval.call(array![0.5].view()), Ok(0.25));
        assert_eq!(eval.call(array![0.9].view()), Ok(0.81));
        assert_eq!(eval.best_fx(), 0.25);
        assert!(!eval.exhausted());
        eval.call(array![-0.1].view()).unwrap();
        assert!(eval.exhausted());
        assert_eq!(eval.num, 3);
        let (x, fx) = eval.into_best();
        assert_eq!(x, Some(array![-0.1]));
        assert!((fx - 0.01).abs() < 1e-15);
    }

    #[test]
    fn non_finite_halts_without_touching_best() {
        let problem = Problem::continuous(vec![-1.0], vec![1.0], 10).unwrap();
        let mut f = |x: ArrayView1<f64>| if x[0] > 0.0 { f64::NAN } else { 1.0 };
        let mut eval = Evaluator::new(&problem, &mut f);
        eval.call(array![-0.5].view()).unwrap();
        assert_eq!(eval.call(array![0.5].view()), Err(Halt::NonFinite));
        assert_eq!(eval.num, 2);
        assert_eq!(eval.best_fx(), 1.0);
        assert_eq!(eval.best_x(), Some(&array![-0.5]));
    }

    #[test]
    fn equal_cost_does_not_replace_best() {
        let problem = Problem::continuous(vec![-1.0], vec![1.0], 10).unwrap();
        let mut f = |_: ArrayView1<f64>| 2.0;
        let mut eval = Evaluator::new(&problem, &mut f);
        eval.call(array![0.1].view()).unwrap();
        eval.call(array![0.2].view()).unwrap();
        assert_eq!(eval.best_x(), Some(&array![0.1]));
    }

    #[test]
    fn ranks() {
        let costs = [3.0, 1.0, 2.0, 1.0];
        let order = argsort(&costs);
        assert_eq!(order, vec![1, 3, 2, 0]);
        assert_eq!(rank_weights(&order), vec![1.0, 4.0, 2.0, 3.0]);
    }
}
