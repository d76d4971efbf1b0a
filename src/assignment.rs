//! Assignment results and the solver contract.

use crate::cost::CostMatrix;
use crate::munkres::Step;
use num_traits::Float;

/// Side of a cost matrix a diagonal match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Row,
    Column,
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Side::Row => Side::Column,
            Side::Column => Side::Row,
        }
    }
}

/// One entry of a solved assignment, in matrix-local indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Matching<T> {
    /// Row feature `row` matched with column feature `col`.
    Real { row: usize, col: usize, cost: T },
    /// Feature `index` on `side` killed onto the diagonal.
    Diagonal { side: Side, index: usize, cost: T },
}

impl<T: Copy> Matching<T> {
    pub fn cost(&self) -> T {
        match *self {
            Matching::Real { cost, .. } | Matching::Diagonal { cost, .. } => cost,
        }
    }

    /// Swap the roles of rows and columns.
    pub fn transposed(self) -> Self {
        match self {
            Matching::Real { row, col, cost } => Matching::Real {
                row: col,
                col: row,
                cost,
            },
            Matching::Diagonal { side, index, cost } => Matching::Diagonal {
                side: side.flip(),
                index,
                cost,
            },
        }
    }
}

/// Output of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<T> {
    /// Every real row and every real column appears exactly once.
    pub matchings: Vec<Matching<T>>,
    /// Sum of matched costs (Munkres) or their maximum (bottleneck).
    pub objective: T,
    /// `false` when the solve was cut short and the result may be suboptimal.
    pub converged: bool,
    /// Step executions (Munkres) or feasibility checks (bottleneck).
    pub steps: usize,
}

impl<T: Float> Assignment<T> {
    /// Assign every row and column of `matrix` to the diagonal.
    ///
    /// Used when one side of a pair type is empty and there is nothing to solve.
    pub fn all_diagonal(matrix: &CostMatrix<T>) -> Self {
        let mut matchings = Vec::with_capacity(matrix.real_rows() + matrix.real_cols());
        let mut objective = T::zero();
        for r in 0..matrix.real_rows() {
            let cost = matrix.get(r, matrix.diagonal_col());
            objective = objective + cost;
            matchings.push(Matching::Diagonal {
                side: Side::Row,
                index: r,
                cost,
            });
        }
        for c in 0..matrix.real_cols() {
            let cost = matrix.get(matrix.diagonal_row(), c);
            objective = objective + cost;
            matchings.push(Matching::Diagonal {
                side: Side::Column,
                index: c,
                cost,
            });
        }
        Self {
            matchings,
            objective,
            converged: true,
            steps: 0,
        }
    }

    /// Number of row/column pairs matched to each other.
    pub fn real_count(&self) -> usize {
        self.matchings
            .iter()
            .filter(|m| matches!(m, Matching::Real { .. }))
            .count()
    }
}

/// Receives step and progress notifications from a running solver.
///
/// All methods default to no-ops.
pub trait SolverObserver {
    /// About to execute `step`; `iteration` counts from 1.
    fn step(&mut self, _step: Step, _iteration: usize) {}

    /// Fraction of the step budget consumed so far.
    fn progress(&mut self, _fraction: f64) {}

    /// The step budget ran out.
    fn aborted(&mut self, _max_steps: usize) {}

    /// A min-max solver tested whether every feature can be assigned using
    /// only cells costing at most `threshold`.
    fn threshold_checked(&mut self, _iteration: usize, _threshold: f64, _feasible: bool) {}
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SolverObserver for NullObserver {}

/// Forwards notifications to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SolverObserver for LogObserver {
    fn step(&mut self, step: Step, iteration: usize) {
        log::trace!("step {:?}, iteration {}", step, iteration);
    }

    fn progress(&mut self, fraction: f64) {
        log::debug!("solver progress {:.0}%", fraction * 100.0);
    }

    fn aborted(&mut self, max_steps: usize) {
        log::debug!("solver aborted after {} steps", max_steps);
    }

    fn threshold_checked(&mut self, iteration: usize, threshold: f64, feasible: bool) {
        log::trace!("check {}: threshold {} feasible {}", iteration, threshold, feasible);
    }
}

/// Solves one [`CostMatrix`] whose last row and column are the diagonal.
pub trait AssignmentSolver<T: Float> {
    /// Consume `matrix` and return an assignment covering every real row and column.
    fn solve(
        &mut self,
        matrix: CostMatrix<T>,
        observer: &mut dyn SolverObserver,
    ) -> Assignment<T>;
}
