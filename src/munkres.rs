//! Hungarian (Munkres) assignment with an unlimited-capacity diagonal.
//!
//! The solver works on a [`CostMatrix`] whose last row and last column stand for
//! the diagonal. Any number of real rows may end up on the diagonal column and
//! any number of real columns on the diagonal row; every other row and column
//! carries at most one star.
//!
//! # Steps
//!
//! 1. **Preprocess**: record, per line, the range of assignable cells; fold the
//!    diagonal column into the real cells and reduce every real column.
//! 2. **Star zeros**: star a maximal set of independent zeros.
//! 3. **Cover columns**: cover starred columns; done once every real column is.
//! 4. **Prime zeros**: prime uncovered zeros until one starts an augmenting path.
//! 5. **Augment path**: flip stars and primes along the alternating path.
//! 6. **Adjust matrix**: shift the smallest uncovered value to create new zeros.
//! 7. **Done**.
//!
//! Steps loop 3 → 4 → (5 → 3 | 6 → 4) until step 7. The number of step
//! executions is capped; hitting the cap stops the solve with whatever
//! assignment the current stars describe.
//!
//! # References
//!
//! - Munkres (1957). "Algorithms for the Assignment and Transportation Problems"
//! - Bourgeois & Lassalle (1971). "An extension of the Munkres algorithm for the
//!   assignment problem to rectangular matrices"

use crate::assignment::{Assignment, AssignmentSolver, Matching, Side, SolverObserver};
use crate::config::DEFAULT_MAX_SOLVER_STEPS;
use crate::cost::CostMatrix;
use ndarray::Array2;
use num_traits::Float;

/// State of the Munkres state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Preprocess,
    StarZeros,
    CoverColumns,
    PrimeZeros,
    AugmentPath,
    AdjustMatrix,
    Done,
}

impl Step {
    /// Classic 1-based step number.
    pub fn number(self) -> u8 {
        match self {
            Step::Preprocess => 1,
            Step::StarZeros => 2,
            Step::CoverColumns => 3,
            Step::PrimeZeros => 4,
            Step::AugmentPath => 5,
            Step::AdjustMatrix => 6,
            Step::Done => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    None,
    Star,
    Prime,
}

#[inline]
fn is_zero<T: Float>(v: T) -> bool {
    v.abs() < T::epsilon()
}

/// Exact minimum-sum assignment solver.
#[derive(Debug, Clone)]
pub struct Munkres {
    max_steps: usize,
}

impl Default for Munkres {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SOLVER_STEPS)
    }
}

impl Munkres {
    /// Solver that gives up after `max_steps` step executions.
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }
}

impl<T: Float> AssignmentSolver<T> for Munkres {
    fn solve(
        &mut self,
        matrix: CostMatrix<T>,
        observer: &mut dyn SolverObserver,
    ) -> Assignment<T> {
        State::new(matrix).run(self.max_steps, observer)
    }
}

struct State<T> {
    /// Untouched input, for reporting costs.
    original: CostMatrix<T>,
    /// Working copy, reduced in place.
    cost: Array2<T>,
    rows: usize,
    cols: usize,
    marks: Array2<Mark>,
    row_cover: Vec<bool>,
    col_cover: Vec<bool>,
    // Assignable cells of row r lie in row_lo[r]..row_hi[r]; same for columns.
    row_lo: Vec<usize>,
    row_hi: Vec<usize>,
    col_lo: Vec<usize>,
    col_hi: Vec<usize>,
    /// Zeros produced by the last matrix adjustment.
    created_zeros: Vec<(usize, usize)>,
    path: Vec<(usize, usize)>,
    origin: (usize, usize),
    aborted: bool,
}

impl<T: Float> State<T> {
    fn new(matrix: CostMatrix<T>) -> Self {
        let rows = matrix.nrows();
        let cols = matrix.ncols();
        let cost = matrix.cells().clone();
        Self {
            original: matrix,
            cost,
            rows,
            cols,
            marks: Array2::from_elem((rows, cols), Mark::None),
            row_cover: vec![false; rows],
            col_cover: vec![false; cols],
            row_lo: vec![0; rows],
            row_hi: vec![cols - 1; rows],
            col_lo: vec![0; cols],
            col_hi: vec![rows; cols],
            created_zeros: Vec::new(),
            path: Vec::with_capacity(2 * rows + 1),
            origin: (0, 0),
            aborted: false,
        }
    }

    #[inline]
    fn last_row(&self) -> usize {
        self.rows - 1
    }

    #[inline]
    fn last_col(&self) -> usize {
        self.cols - 1
    }

    fn run(mut self, max_steps: usize, observer: &mut dyn SolverObserver) -> Assignment<T> {
        let mut step = Step::Preprocess;
        let mut iteration = 0usize;
        let mut capped = false;
        let report_every = (max_steps / 5).max(1);

        loop {
            iteration += 1;
            if iteration > max_steps && step != Step::Done {
                log::warn!(
                    "Munkres did not converge in {} steps, keeping the current assignment",
                    max_steps
                );
                observer.aborted(max_steps);
                capped = true;
                step = Step::Done;
            }
            observer.step(step, iteration);
            if iteration > 20 && iteration % report_every == 0 {
                observer.progress(iteration as f64 / max_steps as f64);
            }

            step = match step {
                Step::Preprocess => self.preprocess(),
                Step::StarZeros => self.star_zeros(),
                Step::CoverColumns => self.cover_columns(),
                Step::PrimeZeros => self.prime_zeros(),
                Step::AugmentPath => self.augment_path(),
                Step::AdjustMatrix => self.adjust_matrix(),
                Step::Done => break,
            };
        }

        let converged = !capped && !self.aborted;
        self.extract(converged, iteration)
    }

    // Step 1.
    fn preprocess(&mut self) -> Step {
        let last_row = self.last_row();
        let last_col = self.last_col();
        let assignable = |v: T| !CostMatrix::is_sentinel(v);

        let mut dropped = 0usize;
        for r in 0..last_row {
            let row = self.cost.row(r);
            let lo = (0..last_col).find(|&c| assignable(row[c]));
            let hi = (0..last_col).rev().find(|&c| assignable(row[c]));
            match (lo, hi) {
                (Some(lo), Some(hi)) => {
                    self.row_lo[r] = lo;
                    self.row_hi[r] = hi + 1;
                }
                _ => {
                    dropped += 1;
                    self.row_lo[r] = 0;
                    self.row_hi[r] = last_col;
                }
            }
        }
        if dropped > 0 {
            log::debug!("{} row(s) without assignable cell, scanning them fully", dropped);
        }
        self.row_lo[last_row] = 0;
        self.row_hi[last_row] = last_col;

        for c in 0..last_col {
            let col = self.cost.column(c);
            let lo = (0..self.rows).find(|&r| assignable(col[r]));
            let hi = (0..self.rows).rev().find(|&r| assignable(col[r]));
            match (lo, hi) {
                (Some(lo), Some(hi)) => {
                    self.col_lo[c] = lo;
                    self.col_hi[c] = hi + 1;
                }
                _ => {
                    self.col_lo[c] = 0;
                    self.col_hi[c] = self.rows;
                }
            }
        }

        // Fold the diagonal column into every real row; it is ignored afterwards.
        for r in 0..last_row {
            let killed = self.cost[[r, last_col]];
            for c in 0..last_col {
                let v = self.cost[[r, c]];
                if assignable(v) {
                    self.cost[[r, c]] = v - killed;
                }
            }
        }

        for c in 0..last_col {
            let min = (0..self.rows)
                .map(|r| self.cost[[r, c]])
                .fold(T::infinity(), T::min);
            for r in 0..self.rows {
                let v = self.cost[[r, c]];
                if assignable(v) {
                    self.cost[[r, c]] = v - min;
                }
            }
        }

        Step::StarZeros
    }

    // Step 2.
    fn star_zeros(&mut self) -> Step {
        let last_row = self.last_row();
        let last_col = self.last_col();

        for r in 0..last_row {
            for c in self.row_lo[r]..self.row_hi[r] {
                if !self.col_cover[c] && is_zero(self.cost[[r, c]]) {
                    self.marks[[r, c]] = Mark::Star;
                    self.row_cover[r] = true;
                    self.col_cover[c] = true;
                    break;
                }
            }
        }

        // The diagonal row takes any number of stars.
        for c in 0..last_col {
            if !self.col_cover[c] && is_zero(self.cost[[last_row, c]]) {
                self.marks[[last_row, c]] = Mark::Star;
                self.col_cover[c] = true;
            }
        }

        self.clear_covers();
        Step::CoverColumns
    }

    // Step 3.
    fn cover_columns(&mut self) -> Step {
        for r in 0..self.rows {
            for c in self.row_lo[r]..self.row_hi[r] {
                if self.marks[[r, c]] == Mark::Star {
                    self.col_cover[c] = true;
                }
            }
        }

        let last_col = self.last_col();
        let covered = self.col_cover[..last_col].iter().filter(|&&b| b).count();
        if covered >= last_col {
            Step::Done
        } else {
            Step::PrimeZeros
        }
    }

    // Step 4.
    fn prime_zeros(&mut self) -> Step {
        let last_row = self.last_row();
        loop {
            let Some((r, c)) = self.find_zero() else {
                return Step::AdjustMatrix;
            };
            self.marks[[r, c]] = Mark::Prime;
            match self.star_in_row(r) {
                Some(star_col) if r < last_row => {
                    self.row_cover[r] = true;
                    self.col_cover[star_col] = false;
                }
                _ => {
                    self.origin = (r, c);
                    return Step::AugmentPath;
                }
            }
        }
    }

    fn find_zero(&mut self) -> Option<(usize, usize)> {
        while let Some((r, c)) = self.created_zeros.pop() {
            if !self.row_cover[r] && !self.col_cover[c] && is_zero(self.cost[[r, c]]) {
                return Some((r, c));
            }
        }

        for r in 0..self.rows {
            if self.row_cover[r] {
                continue;
            }
            for c in self.row_lo[r]..self.row_hi[r] {
                if !self.col_cover[c] && is_zero(self.cost[[r, c]]) {
                    return Some((r, c));
                }
            }
        }
        None
    }

    fn star_in_row(&self, r: usize) -> Option<usize> {
        (self.row_lo[r]..self.row_hi[r]).find(|&c| self.marks[[r, c]] == Mark::Star)
    }

    fn prime_in_row(&self, r: usize) -> Option<usize> {
        (self.row_lo[r]..self.row_hi[r]).find(|&c| self.marks[[r, c]] == Mark::Prime)
    }

    fn star_in_col(&self, c: usize) -> Option<usize> {
        let last_row = self.last_row();
        (self.col_lo[c]..self.col_hi[c])
            .find(|&r| self.marks[[r, c]] == Mark::Star)
            .or_else(|| (self.marks[[last_row, c]] == Mark::Star).then_some(last_row))
    }

    // Step 5.
    fn augment_path(&mut self) -> Step {
        let max_len = 2 * self.rows + 1;
        self.path.clear();
        self.path.push(self.origin);

        loop {
            let (_, col) = self.path[self.path.len() - 1];
            let Some(r) = self.star_in_col(col) else {
                break;
            };
            self.path.push((r, col));
            match self.prime_in_row(r) {
                Some(c) => self.path.push((r, c)),
                None => {
                    log::warn!("augmenting path: no prime in row {}", r);
                    break;
                }
            }
            if self.path.len() > max_len {
                log::warn!("augmenting path longer than {} cells, cutting it", max_len);
                break;
            }
        }

        for &(r, c) in &self.path {
            self.marks[[r, c]] = if self.marks[[r, c]] == Mark::Star {
                Mark::None
            } else {
                Mark::Star
            };
        }

        self.clear_covers();
        for r in 0..self.rows {
            for c in self.row_lo[r]..self.row_hi[r] {
                if self.marks[[r, c]] == Mark::Prime {
                    self.marks[[r, c]] = Mark::None;
                }
            }
        }

        Step::CoverColumns
    }

    // Step 6.
    fn adjust_matrix(&mut self) -> Step {
        let mut min = T::infinity();
        for r in 0..self.rows {
            if self.row_cover[r] {
                continue;
            }
            for c in self.row_lo[r]..self.row_hi[r] {
                let v = self.cost[[r, c]];
                if !self.col_cover[c] && !CostMatrix::is_sentinel(v) && v < min {
                    min = v;
                }
            }
        }

        if !min.is_finite() {
            log::warn!("no assignable uncovered cell left, stopping early");
            self.aborted = true;
            return Step::Done;
        }

        self.created_zeros.clear();
        for r in 0..self.rows {
            for c in self.row_lo[r]..self.row_hi[r] {
                let mut v = self.cost[[r, c]];
                if CostMatrix::is_sentinel(v) {
                    continue;
                }
                if self.row_cover[r] {
                    v = v + min;
                }
                if !self.col_cover[c] {
                    v = v - min;
                    if is_zero(v) {
                        self.created_zeros.push((r, c));
                    }
                }
                self.cost[[r, c]] = v;
            }
        }

        Step::PrimeZeros
    }

    fn clear_covers(&mut self) {
        self.row_cover.iter_mut().for_each(|b| *b = false);
        self.col_cover.iter_mut().for_each(|b| *b = false);
    }

    fn extract(self, converged: bool, steps: usize) -> Assignment<T> {
        let last_row = self.last_row();
        let last_col = self.last_col();
        let mut matchings = Vec::with_capacity(last_row + last_col);
        let mut row_done = vec![false; last_row];
        let mut col_done = vec![false; last_col];
        let mut objective = T::zero();

        for r in 0..self.rows {
            for c in self.row_lo[r]..self.row_hi[r] {
                if self.marks[[r, c]] != Mark::Star {
                    continue;
                }
                let cost = self.original.get(r, c);
                objective = objective + cost;
                col_done[c] = true;
                if r < last_row {
                    row_done[r] = true;
                    matchings.push(Matching::Real { row: r, col: c, cost });
                } else {
                    matchings.push(Matching::Diagonal {
                        side: Side::Column,
                        index: c,
                        cost,
                    });
                }
            }
        }

        for r in (0..last_row).filter(|&r| !row_done[r]) {
            let cost = self.original.get(r, last_col);
            objective = objective + cost;
            matchings.push(Matching::Diagonal {
                side: Side::Row,
                index: r,
                cost,
            });
        }
        // Only reachable when the solve was cut short.
        for c in (0..last_col).filter(|&c| !col_done[c]) {
            let cost = self.original.get(last_row, c);
            objective = objective + cost;
            matchings.push(Matching::Diagonal {
                side: Side::Column,
                index: c,
                cost,
            });
        }

        log::debug!(
            "Munkres: {} steps, total cost {}",
            steps,
            objective.to_f64().unwrap_or(f64::NAN)
        );

        Assignment {
            matchings,
            objective,
            converged,
            steps,
        }
    }
}
