//! Runs every algorithm on a shifted sphere and prints what it found.

extern crate boxopt;
extern crate env_logger;
extern crate ndarray;

use boxopt::direct::Direct;
use boxopt::local::{HillClimber, NelderMead, Rosenbrock};
use boxopt::population::{EvolutionStrategy, Genetic, ParticleSwarm, ParticleSwarmBuilder, PsoMode};
use boxopt::{Algorithm, Problem, Solver};
use ndarray::ArrayView1;

fn main() {
    env_logger::init();

    let n = 5;
    let sphere = |x: ArrayView1<f64>| x.iter().map(|v| (v - 1.0).powi(2)).sum::<f64>();
    let algorithms: Vec<Algorithm> = vec![
        HillClimber::default().into(),
        ParticleSwarm::default().into(),
        ParticleSwarmBuilder::default()
            .psomode(PsoMode::Classic)
            .build()
            .unwrap()
            .into(),
        Genetic::default().into(),
        EvolutionStrategy::default().into(),
        NelderMead::default().into(),
        Rosenbrock::default().into(),
        Direct::default().into(),
    ];

    for algorithm in algorithms {
        let problem = Problem::continuous(vec![-5.0; n], vec![5.0; n], 5000).unwrap();
        let name = format!("{:?}", algorithm);
        let mut solver = Solver::new(problem, algorithm, sphere, 42).unwrap();
        let res = solver.solve();
        println!(
            "{:<12} {:>10.3e} after {} evaluations ({:?}, {:?})",
            name.split('(').next().unwrap_or(""),
            res.minimum_value,
            res.f_evals,
            res.termination,
            res.runtime
        );
    }
}
