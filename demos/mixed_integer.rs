//! A small design problem with two integer variables: a beam with `k` stiffeners and
//! `m` bolts, plus a continuous thickness.

extern crate boxopt;
extern crate env_logger;
extern crate ndarray;

use boxopt::population::GeneticBuilder;
use boxopt::{Problem, Solver};
use ndarray::{array, ArrayView1};

fn cost(x: ArrayView1<f64>) -> f64 {
    let (thickness, stiffeners, bolts) = (x[0], x[1], x[2]);
    let deflection = 40.0 / (thickness * (1.0 + stiffeners)).powi(2);
    let weight = 2.0 * thickness + 0.4 * stiffeners + 0.05 * bolts;
    let slip = (12.0 - bolts).max(0.0).powi(2);
    weight + deflection + slip
}

fn main() {
    env_logger::init();

    let problem = Problem::new(
        vec![0.5, 0.0, 4.0],
        vec![6.0, 8.0, 24.0],
        vec![false, true, true],
        3000,
    )
    .unwrap();
    let ga = GeneticBuilder::default().popsize(30).elite(2).build().unwrap();

    let mut solver = Solver::new(problem, ga, cost, 7)
        .unwrap()
        .with_initial_point(array![3.0, 2.0, 10.0])
        .unwrap();
    let res = solver.solve();
    println!("{:#?}", res);
    if let Some(x) = solver.best_x() {
        println!(
            "thickness {:.3}, {} stiffeners, {} bolts: cost {:.4}",
            x[0],
            x[1],
            x[2],
            solver.best_cost()
        );
    }
}
