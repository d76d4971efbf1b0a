//! From per-type local assignments back to one global matching.
//!
//! Each pair type is solved in its own index space, possibly transposed, and
//! the whole computation may itself run with the diagrams swapped. This module
//! undoes both transposes, remaps local indices through the partition maps, and
//! folds the per-type costs into the final distance.

use crate::assignment::{Assignment, Matching, Side};
use crate::cost::{CostModel, TypeLayout};
use crate::diagram::{PairType, PersistencePair};
use num_traits::Float;

/// Which input diagram a feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Which {
    First,
    Second,
}

impl Which {
    pub fn other(self) -> Self {
        match self {
            Which::First => Which::Second,
            Which::Second => Which::First,
        }
    }
}

/// A matched pair in global indices: `first` indexes the first diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalMatching<T> {
    pub first: usize,
    pub second: usize,
    pub cost: T,
}

/// A feature killed onto the diagonal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagonalMatch<T> {
    pub diagram: Which,
    pub index: usize,
    pub cost: T,
}

/// Cost of killed features, per pair type.
///
/// Summed for Wasserstein orders, maximised for the bottleneck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddedPersistence<T> {
    pub minima: T,
    pub maxima: T,
    pub saddles: T,
}

impl<T: Float> AddedPersistence<T> {
    pub fn zero() -> Self {
        Self {
            minima: T::zero(),
            maxima: T::zero(),
            saddles: T::zero(),
        }
    }

    pub fn get(&self, pair_type: PairType) -> T {
        match pair_type {
            PairType::Minimum => self.minima,
            PairType::Maximum => self.maxima,
            PairType::Saddle => self.saddles,
        }
    }

    fn slot(&mut self, pair_type: PairType) -> &mut T {
        match pair_type {
            PairType::Minimum => &mut self.minima,
            PairType::Maximum => &mut self.maxima,
            PairType::Saddle => &mut self.saddles,
        }
    }

    pub fn sum(&self) -> T {
        self.minima + self.maxima + self.saddles
    }

    pub fn max(&self) -> T {
        self.minima.max(self.maxima).max(self.saddles)
    }
}

/// Everything recovered from the per-type solves.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction<T> {
    /// Real matches, sorted by first-diagram index.
    pub matchings: Vec<GlobalMatching<T>>,
    /// Killed features, sorted by diagram then index.
    pub killed: Vec<DiagonalMatch<T>>,
    pub added: AddedPersistence<T>,
    /// Sum (Wasserstein) or maximum (bottleneck) of the real match costs.
    pub matched_cost: T,
    /// Real matches whose reported cost disagrees with a fresh evaluation.
    pub mismatches: usize,
    /// Every solve ran to completion.
    pub converged: bool,
    pub distance: T,
}

/// Accumulates per-type assignments.
///
/// `d1` and `d2` are the diagrams in solve order; `swapped` says they were
/// exchanged relative to the caller's order.
pub struct Reconstructor<'a, T> {
    model: &'a CostModel<T>,
    d1: &'a [PersistencePair<T>],
    d2: &'a [PersistencePair<T>],
    bottleneck: bool,
    swapped: bool,
    matchings: Vec<GlobalMatching<T>>,
    killed: Vec<DiagonalMatch<T>>,
    added: AddedPersistence<T>,
    matched_cost: T,
    mismatches: usize,
    converged: bool,
}

impl<'a, T: Float> Reconstructor<'a, T> {
    pub fn new(
        model: &'a CostModel<T>,
        d1: &'a [PersistencePair<T>],
        d2: &'a [PersistencePair<T>],
        bottleneck: bool,
        swapped: bool,
    ) -> Self {
        Self {
            model,
            d1,
            d2,
            bottleneck,
            swapped,
            matchings: Vec::new(),
            killed: Vec::new(),
            added: AddedPersistence::zero(),
            matched_cost: T::zero(),
            mismatches: 0,
            converged: true,
        }
    }

    fn accumulate(&self, acc: T, v: T) -> T {
        if self.bottleneck {
            acc.max(v)
        } else {
            acc + v
        }
    }

    /// Fold one pair type's assignment in.
    pub fn absorb(&mut self, layout: &TypeLayout, assignment: &Assignment<T>) {
        self.converged &= assignment.converged;

        for &m in &assignment.matchings {
            let m = if layout.transposed { m.transposed() } else { m };
            match m {
                Matching::Real { row, col, cost } => {
                    let (i, j) = (layout.first[row], layout.second[col]);
                    self.check_cost(i, j, cost);
                    self.matched_cost = self.accumulate(self.matched_cost, cost);
                    let (first, second) = if self.swapped { (j, i) } else { (i, j) };
                    self.matchings.push(GlobalMatching { first, second, cost });
                }
                Matching::Diagonal { side, index, cost } => {
                    let (diagram, index) = match side {
                        Side::Row => (Which::First, layout.first[index]),
                        Side::Column => (Which::Second, layout.second[index]),
                    };
                    let diagram = if self.swapped { diagram.other() } else { diagram };
                    let slot = self.accumulate(self.added.get(layout.pair_type), cost);
                    *self.added.slot(layout.pair_type) = slot;
                    self.killed.push(DiagonalMatch {
                        diagram,
                        index,
                        cost,
                    });
                }
            }
        }
    }

    fn check_cost(&mut self, i: usize, j: usize, reported: T) {
        let expected = self.model.pair_cost(&self.d1[i], &self.d2[j]);
        let tolerance = T::from(1e-6).unwrap_or_else(T::epsilon) * (T::one() + reported.abs());
        if (expected - reported).abs() > tolerance {
            self.mismatches += 1;
        }
    }

    pub fn finish(mut self) -> Reconstruction<T> {
        if self.mismatches > 0 {
            log::warn!(
                "{} matched pair(s) disagree with their recomputed cost",
                self.mismatches
            );
        }

        let distance = if self.bottleneck {
            self.matched_cost.max(self.added.max())
        } else {
            self.model.root(self.matched_cost + self.added.sum())
        };

        self.matchings.sort_by_key(|m| (m.first, m.second));
        self.killed.sort_by_key(|k| (k.diagram, k.index));

        Reconstruction {
            matchings: self.matchings,
            killed: self.killed,
            added: self.added,
            matched_cost: self.matched_cost,
            mismatches: self.mismatches,
            converged: self.converged,
            distance,
        }
    }
}
