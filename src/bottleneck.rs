//! Bottleneck assignment: minimise the largest matched cost.
//!
//! ## The Problem
//!
//! Given the same diagonal-augmented [`CostMatrix`] the Munkres solver sees,
//! find an assignment whose most expensive entry is as cheap as possible.
//!
//! ## Approach
//!
//! The matrix is expanded into a square bipartite graph with `n1 + n2` nodes
//! per side:
//!
//! ```text
//!   left:  real rows 0..n1   | one diagonal copy per real column
//!   right: real cols 0..n2   | one diagonal copy per real row
//! ```
//!
//! Row `i` may take column `j` or its own diagonal copy; the diagonal copy of
//! column `j` may take column `j`. Diagonal copies pair with each other for
//! free. A perfect matching in this graph is exactly an assignment of the
//! matrix, so binary-searching the sorted distinct costs for the smallest
//! threshold that admits a perfect matching gives the bottleneck value.
//!
//! ## What Can Go Wrong
//!
//! The optimal matching is rarely unique: only its largest cost is. Which of
//! the equally good matchings comes back depends on traversal order.

use crate::assignment::{Assignment, AssignmentSolver, Matching, Side, SolverObserver};
use crate::cost::CostMatrix;
use num_traits::Float;
use std::cmp::Ordering;
use std::collections::VecDeque;

const FREE: usize = usize::MAX;

/// Exact min-max assignment solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct BottleneckSolver;

impl<T: Float> AssignmentSolver<T> for BottleneckSolver {
    fn solve(
        &mut self,
        matrix: CostMatrix<T>,
        observer: &mut dyn SolverObserver,
    ) -> Assignment<T> {
        let graph = Graph::new(&matrix);

        let mut thresholds: Vec<T> = matrix
            .cells()
            .iter()
            .copied()
            .filter(|&v| !CostMatrix::is_sentinel(v))
            .collect();
        thresholds.push(T::zero());
        thresholds.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        thresholds.dedup();

        let mut buffers = Buffers::new(graph.size());
        let mut checks = 0usize;
        let mut check = |threshold: T, buffers: &mut Buffers| {
            checks += 1;
            let feasible = graph.has_perfect_matching(threshold, buffers);
            observer.threshold_checked(
                checks,
                threshold.to_f64().unwrap_or(f64::NAN),
                feasible,
            );
            feasible
        };

        // The largest threshold admits every edge, so it always succeeds.
        let mut lo = 0usize;
        let mut hi = thresholds.len() - 1;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if check(thresholds[mid], &mut buffers) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        let threshold = thresholds[lo];
        let converged = check(threshold, &mut buffers);
        if !converged {
            log::warn!("bottleneck search ended on an infeasible threshold");
        }

        let assignment = graph.extract(&buffers.match_left, checks, converged);
        log::debug!(
            "bottleneck: {} checks over {} thresholds, value {}",
            checks,
            thresholds.len(),
            assignment.objective.to_f64().unwrap_or(f64::NAN)
        );
        assignment
    }
}

struct Buffers {
    match_left: Vec<usize>,
    match_right: Vec<usize>,
    parent: Vec<usize>,
    queue: VecDeque<usize>,
    neighbours: Vec<usize>,
}

impl Buffers {
    fn new(size: usize) -> Self {
        Self {
            match_left: vec![FREE; size],
            match_right: vec![FREE; size],
            parent: vec![FREE; size],
            queue: VecDeque::with_capacity(size),
            neighbours: Vec::with_capacity(size),
        }
    }
}

struct Graph<'a, T> {
    matrix: &'a CostMatrix<T>,
    n1: usize,
    n2: usize,
}

impl<'a, T: Float> Graph<'a, T> {
    fn new(matrix: &'a CostMatrix<T>) -> Self {
        Self {
            matrix,
            n1: matrix.real_rows(),
            n2: matrix.real_cols(),
        }
    }

    fn size(&self) -> usize {
        self.n1 + self.n2
    }

    fn admits(&self, row: usize, col: usize, threshold: T) -> bool {
        let v = self.matrix.get(row, col);
        !CostMatrix::is_sentinel(v) && v <= threshold
    }

    /// Right nodes reachable from left node `u` under `threshold`.
    fn neighbours(&self, u: usize, threshold: T, out: &mut Vec<usize>) {
        out.clear();
        let (n1, n2) = (self.n1, self.n2);
        if u < n1 {
            out.extend((0..n2).filter(|&j| self.admits(u, j, threshold)));
            if self.admits(u, self.matrix.diagonal_col(), threshold) {
                out.push(n2 + u);
            }
        } else {
            let j = u - n1;
            if self.admits(self.matrix.diagonal_row(), j, threshold) {
                out.push(j);
            }
            out.extend(n2..n2 + n1);
        }
    }

    fn has_perfect_matching(&self, threshold: T, b: &mut Buffers) -> bool {
        b.match_left.iter_mut().for_each(|m| *m = FREE);
        b.match_right.iter_mut().for_each(|m| *m = FREE);
        (0..self.size()).all(|u| self.augment(u, threshold, b))
    }

    /// Breadth-first search for an augmenting path from free left node `root`.
    fn augment(&self, root: usize, threshold: T, b: &mut Buffers) -> bool {
        b.parent.iter_mut().for_each(|p| *p = FREE);
        b.queue.clear();
        b.queue.push_back(root);

        while let Some(u) = b.queue.pop_front() {
            let mut neighbours = std::mem::take(&mut b.neighbours);
            self.neighbours(u, threshold, &mut neighbours);
            for &v in &neighbours {
                if b.parent[v] != FREE {
                    continue;
                }
                b.parent[v] = u;
                if b.match_right[v] == FREE {
                    // Flip the path back to the root.
                    let mut v = v;
                    loop {
                        let u = b.parent[v];
                        let next = b.match_left[u];
                        b.match_left[u] = v;
                        b.match_right[v] = u;
                        if u == root {
                            break;
                        }
                        v = next;
                    }
                    b.neighbours = neighbours;
                    return true;
                }
                b.queue.push_back(b.match_right[v]);
            }
            b.neighbours = neighbours;
        }
        false
    }

    fn extract(&self, match_left: &[usize], steps: usize, converged: bool) -> Assignment<T> {
        let (n1, n2) = (self.n1, self.n2);
        let diag_row = self.matrix.diagonal_row();
        let diag_col = self.matrix.diagonal_col();
        let mut matchings = Vec::with_capacity(n1 + n2);
        let mut objective = T::zero();

        for (u, &v) in match_left.iter().enumerate() {
            let m = match (u < n1, v < n2) {
                _ if v == FREE => continue,
                (true, true) => Matching::Real {
                    row: u,
                    col: v,
                    cost: self.matrix.get(u, v),
                },
                (true, false) => Matching::Diagonal {
                    side: Side::Row,
                    index: u,
                    cost: self.matrix.get(u, diag_col),
                },
                (false, true) => Matching::Diagonal {
                    side: Side::Column,
                    index: v,
                    cost: self.matrix.get(diag_row, v),
                },
                (false, false) => continue,
            };
            objective = objective.max(m.cost());
            matchings.push(m);
        }

        Assignment {
            matchings,
            objective,
            converged,
            steps,
        }
    }
}
