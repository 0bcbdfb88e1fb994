//! A self-adaptive (μ+λ) evolution strategy.
//!
//! Every individual carries its own step size per variable. Children inherit the mean of
//! their parents' step sizes and mutate them log-normally before using them, so step
//! sizes that produce good children survive selection together with the children
//! (Schwefel's self-adaptation):
//!
//! Beyer, H-G and Schwefel, H-P. Evolution strategies - A comprehensive introduction.
//! 2002. Natural Computing. 1, pp 3--52

use log::debug;
use ndarray::prelude::*;
use num_traits::ToPrimitive;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::minimizer::{Context, Halt, Minimizer, Termination};
use crate::problem::Problem;
use crate::sampling::Sampler;
use crate::utils::{argsort, rank_weights};

/// Lower limit of a step size, as a fraction of the variable's range.
const MIN_STEP: f64 = 1e-12;

/// How the parents of a child are picked from the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Marriage {
    #[default]
    Uniform,
    /// Rank-weighted roulette wheel, the best individual weighing `popsize`.
    Roulette,
}

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(default))]
/// Evolution strategy settings.
pub struct EvolutionStrategy {
    /// Number of parents μ kept after selection.
    #[builder(default = "20")]
    pub popsize: usize,

    /// Number of children λ per generation, `popsize` when unset.
    #[builder(default = "None")]
    #[builder(setter(into))]
    pub lambda: Option<usize>,

    /// Number of distinct parents recombined into each child.
    #[builder(default = "2")]
    pub roh: usize,

    /// Scale of both step size learning rates.
    #[builder(default = "1.0")]
    pub tauc: f64,

    #[builder(default)]
    pub selmode: Marriage,

    /// Initial step size as a fraction of each variable's range.
    #[builder(default = "0.1")]
    pub step0: f64,
}

impl Default for EvolutionStrategy {
    fn default() -> Self {
        // every field has a builder default, so this cannot fail
        EvolutionStrategyBuilder::default().build().unwrap()
    }
}

#[derive(Debug, Clone)]
struct Member {
    x: Array1<f64>,
    s: Array1<f64>,
    cost: f64,
}

impl EvolutionStrategy {
    fn offspring(&self) -> usize {
        self.lambda.unwrap_or(self.popsize)
    }

    /// Indices of `roh` distinct parents.
    fn marry(&self, weights: &[f64], sampler: &mut Sampler) -> Vec<usize> {
        match self.selmode {
            Marriage::Uniform => {
                let mut pool: Vec<usize> = (0..weights.len()).collect();
                for k in 0..self.roh {
                    let j = k + sampler.below(pool.len() - k);
                    pool.swap(k, j);
                }
                pool.truncate(self.roh);
                pool
            }
            Marriage::Roulette => {
                let mut weights = weights.to_vec();
                (0..self.roh)
                    .map(|_| {
                        let i = sampler.roulette(&weights);
                        weights[i] = 0.0;
                        i
                    })
                    .collect()
            }
        }
    }

    /// A child of `parents`: intermediate recombination of the reals and the step sizes,
    /// discrete recombination of the integers.
    fn recombine(&self, pop: &[Member], parents: &[usize], problem: &Problem, sampler: &mut Sampler) -> Member {
        let share = 1.0 / parents.len() as f64;
        let mut x = Array1::<f64>::zeros(problem.dim());
        let mut s = Array1::<f64>::zeros(problem.dim());
        for &p in parents {
            x.scaled_add(share, &pop[p].x);
            s.scaled_add(share, &pop[p].s);
        }
        for i in (0..problem.dim()).filter(|&i| problem.is_integer(i)) {
            x[i] = pop[parents[sampler.below(parents.len())]].x[i];
        }
        Member {
            x,
            s,
            cost: f64::INFINITY,
        }
    }

    /// Log-normal step size update followed by the move itself.
    fn mutate(&self, child: &mut Member, problem: &Problem, sampler: &mut Sampler) {
        let n = problem.dim() as f64;
        let tau_global = self.tauc / (2.0 * n).sqrt();
        let tau_local = self.tauc / (2.0 * n.sqrt()).sqrt();
        let z = sampler.gauss(0.0, 1.0);

        for i in 0..problem.dim() {
            let width = problem.width(i);
            let s = child.s[i] * (tau_global * z + tau_local * sampler.gauss(0.0, 1.0)).exp();
            child.s[i] = s.max(MIN_STEP * width);
            if !problem.is_integer(i) {
                child.x[i] += sampler.gauss(0.0, child.s[i]);
            } else if width > 0.0 && sampler.coin((child.s[i] / width).min(1.0)) {
                let lo = problem.lower()[i].ceil();
                let count = (problem.upper()[i].floor() - lo).to_usize().unwrap_or(0) + 1;
                child.x[i] = lo + sampler.below(count) as f64;
            }
        }
        problem.repair(&mut child.x);
    }
}

impl Minimizer for EvolutionStrategy {
    fn name(&self) -> &'static str {
        "evolution-strategy"
    }

    fn validate(&self, _problem: &Problem) -> Result<()> {
        if self.popsize == 0 {
            return Err(Error::setting("popsize", "must be positive"));
        }
        if self.offspring() == 0 {
            return Err(Error::setting("lambda", "must be positive"));
        }
        if self.roh == 0 || self.roh > self.popsize {
            return Err(Error::setting("roh", format!("must lie in 1..={}", self.popsize)));
        }
        if !(self.tauc > 0.0 && self.tauc.is_finite()) {
            return Err(Error::setting("tauc", "must be positive and finite"));
        }
        if !(self.step0 > 0.0 && self.step0.is_finite()) {
            return Err(Error::setting("step0", "must be positive and finite"));
        }
        Ok(())
    }

    fn minimize<F>(&self, ctx: &mut Context<F>) -> std::result::Result<Termination, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        let problem = ctx.problem();
        let step0 = problem.widths() * self.step0;

        let mut pop = Vec::with_capacity(self.popsize + self.offspring());
        for p in 0..self.popsize {
            if ctx.eval.exhausted() {
                return Ok(Termination::BudgetExhausted);
            }
            let x = ctx.initial_or_sample(p);
            let cost = ctx.eval.call(x.view())?;
            pop.push(Member {
                x,
                s: step0.clone(),
                cost,
            });
        }

        while !ctx.eval.exhausted() {
            ctx.iterations += 1;
            let costs: Vec<f64> = pop.iter().map(|m| m.cost).collect();
            let weights = rank_weights(&argsort(&costs));

            let mut children = Vec::with_capacity(self.offspring());
            for _ in 0..self.offspring() {
                if ctx.eval.exhausted() {
                    break;
                }
                let parents = self.marry(&weights, ctx.sampler);
                let mut child = self.recombine(&pop, &parents, problem, ctx.sampler);
                self.mutate(&mut child, problem, ctx.sampler);
                child.cost = ctx.eval.call(child.x.view())?;
                children.push(child);
            }

            pop.extend(children);
            pop.sort_by(|a, b| a.cost.total_cmp(&b.cost));
            pop.truncate(self.popsize);
            debug!(
                "evolution-strategy: generation {}, best {}, mean step {}",
                ctx.iterations,
                pop[0].cost,
                pop[0].s.mean().unwrap_or(0.0)
            );
        }
        Ok(Termination::BudgetExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    fn sphere(x: ArrayView1<f64>) -> f64 {
        x.dot(&x)
    }

    #[test]
    fn converges_on_the_sphere() {
        let problem = Problem::continuous(vec![-5.0; 3], vec![5.0; 3], 4000).unwrap();
        let mut solver = Solver::new(problem, EvolutionStrategy::default(), sphere, 2).unwrap();
        let res = solver.solve();
        println!("res: {:?}", res);
        assert_eq!(res.f_evals, 4000);
        assert!(res.minimum_value < 1e-2);
    }

    #[test]
    fn roulette_marriage() {
        let problem = Problem::continuous(vec![-5.0; 2], vec![5.0; 2], 3000).unwrap();
        let es = EvolutionStrategyBuilder::default()
            .selmode(Marriage::Roulette)
            .roh(3)
            .build()
            .unwrap();
        let mut solver = Solver::new(problem, es, sphere, 9).unwrap();
        assert!(solver.solve().minimum_value < 0.1);
    }

    #[test]
    fn last_generation_is_cut_by_the_budget() {
        let problem = Problem::continuous(vec![-1.0; 2], vec![1.0; 2], 50).unwrap();
        let es = EvolutionStrategyBuilder::default().lambda(7).build().unwrap();
        let mut solver = Solver::new(problem, es, sphere, 0).unwrap();
        let res = solver.solve();
        assert_eq!(res.f_evals, 50);
        assert_eq!(res.iterations, 5);
        assert_eq!(res.termination, Termination::BudgetExhausted);
    }

    #[test]
    fn parents_are_distinct() {
        let mut sampler = Sampler::seeded(4);
        let weights = rank_weights(&[0, 1, 2, 3, 4]);
        for selmode in [Marriage::Uniform, Marriage::Roulette].iter() {
            let es = EvolutionStrategyBuilder::default()
                .popsize(5)
                .roh(5)
                .selmode(*selmode)
                .build()
                .unwrap();
            for _ in 0..50 {
                let mut parents = es.marry(&weights, &mut sampler);
                parents.sort_unstable();
                assert_eq!(parents, vec![0, 1, 2, 3, 4]);
            }
        }
    }

    #[test]
    fn integer_variables_are_redrawn_on_their_grid() {
        let problem = Problem::new(vec![-3.0, 0.5], vec![3.0, 6.5], vec![false, true], 1500).unwrap();
        let mut seen = Vec::new();
        let objective = |x: ArrayView1<f64>| {
            seen.push(x[1]);
            x[0].powi(2) + (x[1] - 4.0).powi(2)
        };
        let mut solver = Solver::new(problem, EvolutionStrategy::default(), objective, 3).unwrap();
        let res = solver.solve().clone();
        drop(solver);
        assert!(res.minimum_value < 0.1);
        for v in seen {
            assert_eq!(v.fract(), 0.0);
            assert!(v >= 1.0 && v <= 6.0);
        }
    }

    #[test]
    fn rejects_too_many_parents() {
        let problem = Problem::continuous(vec![-1.0], vec![1.0], 10).unwrap();
        let es = EvolutionStrategyBuilder::default().popsize(3).roh(4).build().unwrap();
        assert!(es.validate(&problem).is_err());
        let es = EvolutionStrategyBuilder::default().lambda(0).build().unwrap();
        assert!(es.validate(&problem).is_err());
    }
}
