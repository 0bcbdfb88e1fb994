//! The box arena of DIRECT.
//!
//! Boxes live in the unit cube and are never removed: dividing a box shrinks it in place
//! and appends its children, so an index into the arena stays valid for the whole run.
//! A side of a box that has been trisected `s` times has length `3^-s`.

use ndarray::prelude::*;
use std::collections::BTreeMap;

use crate::minimizer::Halt;

/// Two values of the same size class closer than this are ties.
const TIE: f64 = 1e-13;

/// A hyper-rectangle of the unit cube, sampled at its centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    center: Array1<f64>,
    slices: Vec<u32>,
    size: f64,
    fc: f64,
}

impl Rect {
    pub fn new(center: Array1<f64>, slices: Vec<u32>, fc: f64) -> Self {
        let size = half_diagonal(&slices);
        Rect {
            center,
            slices,
            size,
            fc,
        }
    }

    pub fn center(&self) -> ArrayView1<f64> {
        self.center.view()
    }

    /// Number of trisections along each side.
    pub fn slices(&self) -> &[u32] {
        &self.slices
    }

    /// Distance from the centre to a vertex.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Objective value at the centre.
    pub fn fc(&self) -> f64 {
        self.fc
    }

    fn total_slices(&self) -> u32 {
        self.slices.iter().sum()
    }
}

fn half_diagonal(slices: &[u32]) -> f64 {
    slices
        .iter()
        .map(|&s| (0.5 * 3f64.powi(-(s as i32))).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Every box created so far. The first one is the whole cube.
#[derive(Debug, Clone)]
pub struct Partition {
    rects: Vec<Rect>,
}

impl Partition {
    /// The partition holding the whole unit cube, with value `fc` at its centre.
    pub fn new(dim: usize, fc: f64) -> Self {
        Partition {
            rects: vec![Rect::new(Array1::from_elem(dim, 0.5), vec![0; dim], fc)],
        }
    }

    /// A partition made of arbitrary boxes.
    pub fn from_rects(rects: Vec<Rect>) -> Self {
        Partition { rects }
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Index of the box with the lowest centre value.
    pub fn best(&self) -> usize {
        (0..self.rects.len())
            .min_by(|&a, &b| self.rects[a].fc.total_cmp(&self.rects[b].fc))
            .unwrap_or(0)
    }

    /// Indices of the potentially optimal boxes: those on the lower right convex hull of
    /// the (size, value) cloud that could still improve on the current minimum by at
    /// least `ep·|fmin|` for some Lipschitz constant.
    ///
    /// Jones, D R, Perttunen, C D and Stuckman, B E. Lipschitzian optimization without the
    /// Lipschitz constant. 1993. Journal of Optimization Theory and Applications. 79:1,
    /// pp 157--181
    pub fn potentially_optimal(&self, ep: f64) -> Vec<usize> {
        let fmin = self.rects[self.best()].fc;

        // boxes with the same number of trisections have the same size
        let mut classes: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (j, rect) in self.rects.iter().enumerate() {
            classes.entry(rect.total_slices()).or_default().push(j);
        }
        let mut candidates: Vec<usize> = Vec::new();
        for members in classes.values() {
            let low = members
                .iter()
                .map(|&j| self.rects[j].fc)
                .fold(f64::INFINITY, f64::min);
            candidates.extend(members.iter().filter(|&&j| self.rects[j].fc <= low + TIE));
        }

        candidates
            .iter()
            .copied()
            .filter(|&j| {
                let (dj, fj) = (self.rects[j].size, self.rects[j].fc);
                let mut k_low = 0.0f64;
                let mut k_up = f64::INFINITY;
                for &i in candidates.iter() {
                    let (di, fi) = (self.rects[i].size, self.rects[i].fc);
                    if di < dj {
                        k_low = k_low.max((fj - fi) / (dj - di));
                    } else if di > dj {
                        k_up = k_up.min((fi - fj) / (di - dj));
                    }
                }
                k_low <= k_up && (k_up.is_infinite() || fmin - fj + k_up * dj >= ep * fmin.abs())
            })
            .collect()
    }

    /// Trisects box `j` along each of its longest sides.
    ///
    /// Both points at a third of a side from the centre are evaluated for every longest
    /// side. Sides are then cut in order of the best value found along them, so the
    /// most promising direction ends up in the largest children. Returns the number of
    /// evaluations made.
    pub fn divide<E>(&mut self, j: usize, mut evaluate: E) -> Result<usize, Halt>
    where
        E: FnMut(ArrayView1<f64>) -> Result<f64, Halt>,
    {
        let parent = &self.rects[j];
        let longest = parent.slices.iter().copied().min().unwrap_or(0);
        let delta = 3f64.powi(-(longest as i32 + 1));

        let mut samples = Vec::new();
        for d in (0..parent.slices.len()).filter(|&d| parent.slices[d] == longest) {
            let mut lower = parent.center.clone();
            lower[d] -= delta;
            let mut upper = parent.center.clone();
            upper[d] += delta;
            let f_lower = evaluate(lower.view())?;
            let f_upper = evaluate(upper.view())?;
            samples.push((d, lower, f_lower, upper, f_upper));
        }
        let evaluations = 2 * samples.len();

        samples.sort_by(|a, b| a.2.min(a.4).total_cmp(&b.2.min(b.4)).then(a.0.cmp(&b.0)));
        for (d, lower, f_lower, upper, f_upper) in samples {
            self.rects[j].slices[d] += 1;
            let slices = self.rects[j].slices.clone();
            self.rects.push(Rect::new(lower, slices.clone(), f_lower));
            self.rects.push(Rect::new(upper, slices, f_upper));
        }
        self.rects[j].size = half_diagonal(&self.rects[j].slices);
        Ok(evaluations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn first_division_in_one_dimension() {
        let f = |u: ArrayView1<f64>| Ok((u[0] - 0.5).powi(2));
        let mut partition = Partition::new(1, 0.0);
        assert_eq!(partition.potentially_optimal(1e-4), vec![0]);

        assert_eq!(partition.divide(0, f), Ok(2));
        assert_eq!(partition.len(), 3);
        let centers: Vec<f64> = partition.rects().iter().map(|r| r.center()[0]).collect();
        assert!(approx_eq!(f64, centers[1], 1.0 / 6.0, epsilon = 1e-15));
        assert!(approx_eq!(f64, centers[2], 5.0 / 6.0, epsilon = 1e-15));
        for rect in partition.rects() {
            assert_eq!(rect.slices(), &[1]);
        }
        // the centre box is the sole potentially optimal one
        assert_eq!(partition.potentially_optimal(1e-4), vec![0]);
    }

    #[test]
    fn best_dimension_gets_the_largest_children() {
        // the objective only cares about the second coordinate
        let f = |u: ArrayView1<f64>| Ok((u[1] - 0.2).powi(2));
        let mut partition = Partition::new(2, 0.09);
        assert_eq!(partition.divide(0, f), Ok(4));

        let rects = partition.rects();
        assert_eq!(rects.len(), 5);
        // cut first along dimension 1, so its children carry one slice only
        assert_eq!(rects[1].slices(), &[0, 1]);
        assert_eq!(rects[2].slices(), &[0, 1]);
        assert_eq!(rects[3].slices(), &[1, 1]);
        assert_eq!(rects[4].slices(), &[1, 1]);
        assert_eq!(rects[0].slices(), &[1, 1]);
        assert!(rects[1].size() > rects[3].size());
        assert!(approx_eq!(f64, rects[0].size(), rects[3].size(), ulps = 2));
    }

    #[test]
    fn largest_box_is_always_potentially_optimal() {
        let rects = vec![
            Rect::new(array![0.5], vec![2], -1.0),
            Rect::new(array![0.1], vec![0], 10.0),
            Rect::new(array![0.9], vec![1], 5.0),
        ];
        let chosen = Partition::from_rects(rects).potentially_optimal(1e-4);
        assert!(chosen.contains(&1));
        assert!(chosen.contains(&0));
    }

    #[test]
    fn dominated_box_is_skipped() {
        // a bigger box with a lower value hides the smaller one
        let rects = vec![
            Rect::new(array![0.5], vec![0], 0.0),
            Rect::new(array![0.1], vec![1], 3.0),
        ];
        assert_eq!(Partition::from_rects(rects).potentially_optimal(1e-4), vec![0]);
    }

    #[test]
    fn ties_in_a_class_are_all_chosen() {
        let rects = vec![
            Rect::new(array![0.2], vec![1], 1.0),
            Rect::new(array![0.8], vec![1], 1.0),
            Rect::new(array![0.5], vec![1], 2.0),
        ];
        assert_eq!(Partition::from_rects(rects).potentially_optimal(1e-4), vec![0, 1]);
    }

    #[test]
    fn halt_stops_a_division() {
        let mut partition = Partition::new(2, 1.0);
        let res = partition.divide(0, |_| Err(Halt::NonFinite));
        assert_eq!(res, Err(Halt::NonFinite));
    }
}
