//! A generational genetic algorithm on a hybrid binary/real encoding.
//!
//! Integer variables are recombined as bit strings (one-point crossover, bit flips),
//! real variables with the extended intermediate recombination and the mutation operator
//! of the Breeder Genetic Algorithm:
//!
//! Mühlenbein, H and Schlierkamp-Voosen, D. Predictive models for the Breeder Genetic
//! Algorithm. 1993. Evolutionary Computation. 1:1, pp 25--49
//!
//! Parents are drawn by roulette wheel on rank weights, so the scale of the cost does not
//! matter, and the best `elite` individuals survive unchanged.

use log::debug;
use ndarray::prelude::*;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use super::encoding::BitGene;
use crate::errors::{Error, Result};
use crate::minimizer::{Context, Halt, Minimizer, Termination};
use crate::problem::Problem;
use crate::sampling::Sampler;
use crate::utils::{argsort, rank_weights};

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(default))]
/// Genetic algorithm settings.
pub struct Genetic {
    /// Number of individuals per generation.
    #[builder(default = "20")]
    pub popsize: usize,

    /// Probability that a pair of parents is recombined rather than copied.
    #[builder(default = "0.7")]
    pub pcross: f64,

    /// Mutation probability of a gene. Integer genes spread it over their bits.
    #[builder(default = "0.3")]
    pub pmut: f64,

    /// Number of best individuals copied unchanged into the next generation.
    #[builder(default = "1")]
    pub elite: usize,

    /// Extension of the intermediate recombination interval beyond the parents.
    #[builder(default = "0.1")]
    pub d: f64,

    /// Largest real mutation step, as a fraction of the variable's range.
    #[builder(default = "0.1")]
    pub r: f64,

    /// Decay exponent of the real mutation step: steps range from `r` down to `r * 2^-k`.
    #[builder(default = "16.0")]
    pub k: f64,

    /// Maximum number of generations. Unlimited by default, the budget ends the run.
    #[builder(default = "None")]
    #[builder(setter(into))]
    pub maxgen: Option<usize>,
}

impl Default for Genetic {
    fn default() -> Self {
        // every field has a builder default, so this cannot fail
        GeneticBuilder::default().build().unwrap()
    }
}

impl Genetic {
    /// Two children of `a` and `b`, repaired into the box.
    fn breed(
        &self,
        a: ArrayView1<f64>,
        b: ArrayView1<f64>,
        genes: &[Option<BitGene>],
        problem: &Problem,
        sampler: &mut Sampler,
    ) -> (Array1<f64>, Array1<f64>) {
        let mut c1 = a.to_owned();
        let mut c2 = b.to_owned();
        let cross = sampler.coin(self.pcross);

        for (i, gene) in genes.iter().enumerate() {
            match gene {
                Some(gene) => {
                    let (mut g1, mut g2) = (gene.encode(a[i]), gene.encode(b[i]));
                    if cross && gene.bits() > 1 {
                        let cut = 1 + sampler.below(gene.bits() as usize - 1) as u32;
                        let (x1, x2) = gene.crossover(g1, g2, cut);
                        g1 = x1;
                        g2 = x2;
                    }
                    let p_bit = self.pmut / gene.bits() as f64;
                    c1[i] = gene.decode(gene.mutate(g1, p_bit, sampler));
                    c2[i] = gene.decode(gene.mutate(g2, p_bit, sampler));
                }
                None => {
                    if cross {
                        let t1 = sampler.uniform_in(-self.d, 1.0 + self.d);
                        let t2 = sampler.uniform_in(-self.d, 1.0 + self.d);
                        c1[i] = a[i] + t1 * (b[i] - a[i]);
                        c2[i] = a[i] + t2 * (b[i] - a[i]);
                    }
                    let width = problem.width(i);
                    c1[i] += self.real_mutation(width, sampler);
                    c2[i] += self.real_mutation(width, sampler);
                }
            }
        }
        problem.repair(&mut c1);
        problem.repair(&mut c2);
        (c1, c2)
    }

    /// `±r·width·2^(-k·u)` with probability `pmut`, 0 otherwise.
    #[inline]
    fn real_mutation(&self, width: f64, sampler: &mut Sampler) -> f64 {
        if !sampler.coin(self.pmut) {
            return 0.0;
        }
        let sign = if sampler.coin(0.5) { 1.0 } else { -1.0 };
        sign * self.r * width * 2f64.powf(-self.k * sampler.uniform())
    }
}

impl Minimizer for Genetic {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn validate(&self, problem: &Problem) -> Result<()> {
        for i in (0..problem.dim()).filter(|&i| problem.is_integer(i)) {
            if BitGene::new(problem.lower()[i], problem.upper()[i]).is_none() {
                return Err(Error::setting(
                    "bounds",
                    format!("integer variable {} has too many values for a 64 bit gene", i),
                ));
            }
        }
        if self.popsize < 2 {
            return Err(Error::setting("popsize", "a population needs at least 2 individuals"));
        }
        if self.elite >= self.popsize {
            return Err(Error::setting("elite", "must be smaller than popsize"));
        }
        if !(0.0..=1.0).contains(&self.pcross) {
            return Err(Error::setting("pcross", "must be a probability"));
        }
        if !(0.0..=1.0).contains(&self.pmut) {
            return Err(Error::setting("pmut", "must be a probability"));
        }
        if !(self.d >= 0.0 && self.d.is_finite()) {
            return Err(Error::setting("d", "must be non-negative and finite"));
        }
        if !(self.r > 0.0 && self.r.is_finite()) {
            return Err(Error::setting("r", "must be positive and finite"));
        }
        if !(self.k > 0.0 && self.k.is_finite()) {
            return Err(Error::setting("k", "must be positive and finite"));
        }
        Ok(())
    }

    fn minimize<F>(&self, ctx: &mut Context<F>) -> std::result::Result<Termination, Halt>
    where
        F: FnMut(ArrayView1<f64>) -> f64,
    {
        let problem = ctx.problem();
        let (pop, n) = (self.popsize, problem.dim());
        let genes: Vec<Option<BitGene>> = (0..n)
            .map(|i| {
                if problem.is_integer(i) {
                    BitGene::new(problem.lower()[i], problem.upper()[i])
                } else {
                    None
                }
            })
            .collect();

        let mut x = Array2::<f64>::zeros((pop, n));
        let mut cost = vec![f64::INFINITY; pop];
        for p in 0..pop {
            if ctx.eval.exhausted() {
                return Ok(Termination::BudgetExhausted);
            }
            let xp = ctx.initial_or_sample(p);
            cost[p] = ctx.eval.call(xp.view())?;
            x.row_mut(p).assign(&xp);
        }

        while !ctx.eval.exhausted() {
            if self.maxgen.map_or(false, |m| ctx.iterations >= m) {
                return Ok(Termination::IterationLimit);
            }
            ctx.iterations += 1;

            let order = argsort(&cost);
            let weights = rank_weights(&order);
            let mut next = Array2::<f64>::zeros((pop, n));
            let mut next_cost = vec![f64::INFINITY; pop];
            for (slot, &p) in order.iter().take(self.elite).enumerate() {
                next.row_mut(slot).assign(&x.row(p));
                next_cost[slot] = cost[p];
            }

            let mut slot = self.elite;
            while slot < pop {
                let a = ctx.sampler.roulette(&weights);
                let b = ctx.sampler.roulette(&weights);
                let (c1, c2) = self.breed(x.row(a), x.row(b), &genes, problem, ctx.sampler);
                // with one slot left the second child is dropped
                let room = (pop - slot).min(2);
                for child in [c1, c2].iter().take(room) {
                    if ctx.eval.exhausted() {
                        return Ok(Termination::BudgetExhausted);
                    }
                    next_cost[slot] = ctx.eval.call(child.view())?;
                    next.row_mut(slot).assign(child);
                    slot += 1;
                }
            }
            x = next;
            cost = next_cost;
            debug!(
                "genetic: generation {}, best {}",
                ctx.iterations,
                cost.iter().cloned().fold(f64::INFINITY, f64::min)
            );
        }
        Ok(Termination::BudgetExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    #[test]
    fn generation_accounting() {
        // 20 initial + 19 offspring per generation (one elite), odd count included
        let problem = Problem::continuous(vec![-1.0; 2], vec![1.0; 2], 10_000).unwrap();
        let ga = GeneticBuilder::default().maxgen(3).build().unwrap();
        let mut solver = Solver::new(problem, ga, |x: ArrayView1<f64>| x.sum().abs(), 1).unwrap();
        let res = solver.solve();
        assert_eq!(res.termination, Termination::IterationLimit);
        assert_eq!(res.iterations, 3);
        assert_eq!(res.f_evals, 20 + 3 * 19);
    }

    #[test]
    fn elites_are_not_re_evaluated() {
        let problem = Problem::continuous(vec![-1.0; 2], vec![1.0; 2], 10_000).unwrap();
        let ga = GeneticBuilder::default().popsize(10).elite(4).maxgen(2).build().unwrap();
        let mut solver = Solver::new(problem, ga, |x: ArrayView1<f64>| x[0], 1).unwrap();
        assert_eq!(solver.solve().f_evals, 10 + 2 * 6);
    }

    #[test]
    fn mixed_integer_sphere() {
        let problem = Problem::new(
            vec![-10.0, -10.0, 0.0],
            vec![10.0, 10.0, 15.0],
            vec![false, true, true],
            4000,
        )
        .unwrap();
        let mut seen = Vec::new();
        let objective = |x: ArrayView1<f64>| {
            seen.push(x.to_owned());
            x[0].powi(2) + (x[1] - 3.0).powi(2) + (x[2] - 11.0).powi(2)
        };
        let mut solver = Solver::new(problem, Genetic::default(), objective, 5).unwrap();
        let res = solver.solve().clone();
        drop(solver);
        println!("res: {:?}", res);
        assert_eq!(res.f_evals, 4000);
        assert!(res.minimum_value < 2.0);
        for x in seen {
            assert_eq!(x[1].fract(), 0.0);
            assert_eq!(x[2].fract(), 0.0);
            assert!(x[2] >= 0.0 && x[2] <= 15.0);
        }
    }

    #[test]
    fn initial_points_fill_their_slots() {
        let problem = Problem::continuous(vec![-1.0; 2], vec![1.0; 2], 3).unwrap();
        let mut seen = Vec::new();
        let objective = |x: ArrayView1<f64>| {
            seen.push(x.to_owned());
            0.0
        };
        let x0 = array![[0.1, 0.2], [0.3, 0.4]];
        Solver::new(problem, Genetic::default(), objective, 0)
            .unwrap()
            .with_initial_points(x0)
            .unwrap()
            .solve();
        assert_eq!(seen[0], array![0.1, 0.2]);
        assert_eq!(seen[1], array![0.3, 0.4]);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn rejects_elite_filling_the_population() {
        let problem = Problem::continuous(vec![-1.0], vec![1.0], 10).unwrap();
        let ga = GeneticBuilder::default().popsize(4).elite(4).build().unwrap();
        assert!(ga.validate(&problem).is_err());
    }

    #[test]
    fn rejects_integer_ranges_wider_than_a_gene() {
        let problem = Problem::new(vec![0.0, -1e19], vec![1.0, 1e19], vec![false, true], 10).unwrap();
        match Genetic::default().validate(&problem) {
            Err(Error::InvalidSetting { name, .. }) => assert_eq!(name, "bounds"),
            other => panic!("validated {:?}", other),
        }
        assert!(Solver::new(problem, Genetic::default(), |x: ArrayView1<f64>| x[0], 0).is_err());

        let problem = Problem::new(vec![0.0, 0.0], vec![1.0, 1e19], vec![false, true], 10).unwrap();
        assert!(Genetic::default().validate(&problem).is_ok());
    }
}
