//! Cost matrices with a diagonal row and column.
//!
//! For one pair type with `n1` features on one side and `n2` on the other, the
//! matrix has `min(n1, n2) + 1` rows and `max(n1, n2) + 1` columns. The last
//! row and the last column stand for the diagonal: a feature assigned there is
//! killed instead of matched.
//!
//! ```text
//!              col 0 .. col n-1 | diag
//!   row 0    [ pair_cost(i, j)  | diagonal_cost(row i) ]
//!   ...
//!   row m-1
//!   ---------------------------------------------------
//!   diag     [ diagonal_cost(col j) | 0 ]
//! ```

use crate::config::DistanceConfig;
use crate::diagram::{CriticalPoint, PairType, PersistencePair};
use crate::{Error, Result};
use ndarray::Array2;
use num_traits::Float;

/// Dense assignment cost matrix, owned by whichever solver consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix<T> {
    cells: Array2<T>,
}

impl<T: Float> CostMatrix<T> {
    /// Zero matrix for `real_rows × real_cols` features plus the diagonal.
    pub fn new(real_rows: usize, real_cols: usize) -> Result<Self> {
        if real_rows > real_cols {
            return Err(Error::CostShape(real_rows + 1, real_cols + 1));
        }
        Ok(Self {
            cells: Array2::zeros((real_rows + 1, real_cols + 1)),
        })
    }

    /// Wrap an existing array whose last row and column are the diagonal.
    pub fn from_cells(cells: Array2<T>) -> Result<Self> {
        let (r, c) = cells.dim();
        if r == 0 || r > c {
            return Err(Error::CostShape(r, c));
        }
        Ok(Self { cells })
    }

    /// Marker for cells that must never be assigned.
    ///
    /// The largest finite value rather than infinity, so it still compares
    /// and subtracts.
    #[inline]
    pub fn sentinel() -> T {
        T::max_value()
    }

    #[inline]
    pub fn is_sentinel(value: T) -> bool {
        value == T::max_value()
    }

    pub fn nrows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.cells.ncols()
    }

    /// Rows holding real features.
    pub fn real_rows(&self) -> usize {
        self.nrows() - 1
    }

    /// Columns holding real features.
    pub fn real_cols(&self) -> usize {
        self.ncols() - 1
    }

    pub fn diagonal_row(&self) -> usize {
        self.nrows() - 1
    }

    pub fn diagonal_col(&self) -> usize {
        self.ncols() - 1
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.cells[[row, col]]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.cells[[row, col]] = value;
    }

    pub fn cells(&self) -> &Array2<T> {
        &self.cells
    }
}

/// Weighted geometry + persistence ground cost between pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel<T> {
    px: T,
    py: T,
    pz: T,
    pe: T,
    ps: T,
    exponent: i32,
}

fn cast<T: Float>(v: f64) -> Result<T> {
    match T::from(v) {
        Some(t) if t.is_finite() => Ok(t),
        _ => Err(Error::Unrepresentable(v)),
    }
}

impl<T: Float> CostModel<T> {
    pub fn from_config(config: &DistanceConfig) -> Result<Self> {
        let g = &config.geometric_weights;
        let p = &config.persistence_weights;
        let exponent = i32::try_from(config.order.exponent()).map_err(|_| {
            Error::InvalidConfiguration(format!("order {} is too large", config.order))
        })?;
        Ok(Self {
            px: cast(g.px)?,
            py: cast(g.py)?,
            pz: cast(g.pz)?,
            pe: cast(p.extremum)?,
            ps: cast(p.saddle)?,
            exponent,
        })
    }

    /// Exponent `w` applied to every difference.
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// `v^(1/w)`.
    pub fn root(&self, v: T) -> T {
        if self.exponent == 1 {
            v
        } else {
            let w = T::from(self.exponent).unwrap_or_else(T::one);
            v.powf(w.recip())
        }
    }

    fn geometric(&self, a: &CriticalPoint<T>, b: &CriticalPoint<T>) -> T {
        let w = self.exponent;
        self.px * (a.x - b.x).abs().powi(w)
            + self.py * (a.y - b.y).abs().powi(w)
            + self.pz * (a.z - b.z).abs().powi(w)
    }

    /// Cost of matching `a` with `b`.
    ///
    /// Both pairs must be compatible; the weights are taken from `a`. A pair
    /// running from a minimum to a maximum weighs its birth with `ps`.
    pub fn pair_cost(&self, a: &PersistencePair<T>, b: &PersistencePair<T>) -> T {
        let w = self.exponent;
        let birth_weight = if a.is_min() && !a.is_max() {
            self.pe
        } else {
            self.ps
        };
        let death_weight = if a.is_max() { self.pe } else { self.ps };
        let persistence = birth_weight * (a.birth.value - b.birth.value).abs().powi(w)
            + death_weight * (a.death.value - b.death.value).abs().powi(w);

        let geometry = if a.is_max() {
            self.geometric(&a.death, &b.death)
        } else if a.is_min() {
            self.geometric(&a.birth, &b.birth)
        } else {
            self.geometric(&a.birth.midpoint(&a.death), &b.birth.midpoint(&b.death))
        };

        self.root(persistence + geometry)
    }

    /// Cost of killing `a`, i.e. projecting it onto the diagonal.
    pub fn diagonal_cost(&self, a: &PersistencePair<T>) -> T {
        let w = self.exponent;
        let weight = if a.is_min() || a.is_max() { self.pe } else { self.ps };
        let persistence = weight * (a.birth.value - a.death.value).abs().powi(w);
        self.root(persistence + self.geometric(&a.birth, &a.death))
    }
}

/// How one pair type's matrix relates to the diagrams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLayout {
    pub pair_type: PairType,
    /// Rows hold the second diagram's features.
    pub transposed: bool,
    /// Local → global indices into the first diagram.
    pub first: Vec<usize>,
    /// Local → global indices into the second diagram.
    pub second: Vec<usize>,
}

impl TypeLayout {
    /// One side has no feature to assign to the other.
    pub fn is_degenerate(&self) -> bool {
        self.first.is_empty() || self.second.is_empty()
    }
}

/// The assignment problem for one pair type.
#[derive(Debug, Clone)]
pub struct TypeProblem<T> {
    pub layout: TypeLayout,
    pub matrix: CostMatrix<T>,
}

/// Build the cost matrix for one pair type.
///
/// `first` and `second` select the features of `d1` and `d2` that belong to
/// `pair_type`. The smaller side becomes the rows. Fails with
/// [`Error::Domain`] when a cost overflows the float range.
pub fn build_cost_matrix<T: Float>(
    model: &CostModel<T>,
    pair_type: PairType,
    d1: &[PersistencePair<T>],
    d2: &[PersistencePair<T>],
    first: &[usize],
    second: &[usize],
) -> Result<TypeProblem<T>> {
    let transposed = first.len() > second.len();
    let (rows, row_diagram, cols, col_diagram) = if transposed {
        (second, d2, first, d1)
    } else {
        (first, d1, second, d2)
    };

    let mut matrix = CostMatrix::new(rows.len(), cols.len())?;
    let diag_row = matrix.diagonal_row();
    let diag_col = matrix.diagonal_col();

    for (i, &gi) in rows.iter().enumerate() {
        let a = &row_diagram[gi];
        for (j, &gj) in cols.iter().enumerate() {
            let b = &col_diagram[gj];
            let cost = if a.is_compatible(b) {
                model.pair_cost(a, b)
            } else {
                CostMatrix::sentinel()
            };
            matrix.set(i, j, cost);
        }
        matrix.set(i, diag_col, model.diagonal_cost(a));
    }
    for (j, &gj) in cols.iter().enumerate() {
        matrix.set(diag_row, j, model.diagonal_cost(&col_diagram[gj]));
    }
    matrix.set(diag_row, diag_col, T::zero());

    if matrix.cells().iter().any(|v| !v.is_finite()) {
        return Err(Error::Domain(
            "cost overflows the float range; rescale the diagrams or lower the order",
        ));
    }

    Ok(TypeProblem {
        layout: TypeLayout {
            pair_type,
            transposed,
            first: first.to_vec(),
            second: second.to_vec(),
        },
        matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeometricWeights, Order, PersistenceWeights};
    use crate::diagram::{CriticalType, PairType};

    fn model(order: Order) -> CostModel<f64> {
        CostModel::from_config(&DistanceConfig::with_order(order)).unwrap()
    }

    fn max(b: f64, d: f64) -> PersistencePair {
        PersistencePair::maximum(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }

    #[test]
    fn pair_cost_is_weighted_l1_for_order_one() {
        let m = model(Order::Wasserstein(1));
        let c = m.pair_cost(&max(0.0, 1.0), &max(0.5, 1.25));
        assert!((c - 0.75).abs() < 1e-12);
    }

    #[test]
    fn pair_cost_takes_root_for_order_two() {
        let m = model(Order::Wasserstein(2));
        let c = m.pair_cost(&max(0.0, 0.0), &max(3.0, 4.0));
        assert!((c - 5.0).abs() < 1e-12);
    }

    #[test]
    fn diagonal_cost_is_persistence_without_geometry() {
        let m = model(Order::Wasserstein(1));
        assert!((m.diagonal_cost(&max(1.0, 3.5)) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn geometry_uses_death_point_for_maxima() {
        let cfg = DistanceConfig {
            geometric_weights: GeometricWeights {
                px: 1.0,
                py: 0.0,
                pz: 0.0,
            },
            ..DistanceConfig::with_order(Order::Wasserstein(1))
        };
        let m = CostModel::<f64>::from_config(&cfg).unwrap();
        let a = PersistencePair::maximum(
            CriticalPoint::new(0.0, 100.0, 0.0, 0.0),
            CriticalPoint::new(1.0, 2.0, 0.0, 0.0),
        );
        let b = PersistencePair::maximum(
            CriticalPoint::new(0.0, -50.0, 0.0, 0.0),
            CriticalPoint::new(1.0, 5.0, 0.0, 0.0),
        );
        assert!((m.pair_cost(&a, &b) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn builds_transposed_matrix_with_diagonal() {
        let m = model(Order::Wasserstein(1));
        let d1 = [max(0.0, 1.0), max(0.0, 2.0), max(0.0, 4.0)];
        let d2 = [max(0.0, 1.5)];
        let p = build_cost_matrix(&m, PairType::Maximum, &d1, &d2, &[0, 1, 2], &[0]).unwrap();
        assert!(p.layout.transposed);
        assert_eq!(p.matrix.nrows(), 2);
        assert_eq!(p.matrix.ncols(), 4);
        // Row 0 is d2[0]; columns are d1.
        assert!((p.matrix.get(0, 0) - 0.5).abs() < 1e-12);
        assert!((p.matrix.get(0, 2) - 2.5).abs() < 1e-12);
        assert!((p.matrix.get(0, 3) - 1.5).abs() < 1e-12);
        assert!((p.matrix.get(1, 2) - 4.0).abs() < 1e-12);
        assert_eq!(p.matrix.get(1, 3), 0.0);
    }

    #[test]
    fn incompatible_cells_hold_sentinel() {
        let m = model(Order::Wasserstein(1));
        let a = max(0.0, 1.0);
        let mut b = max(0.0, 1.0);
        b.birth_type = CriticalType::Saddle1;
        let p = build_cost_matrix(&m, PairType::Maximum, &[a], &[b], &[0], &[0]).unwrap();
        assert!(CostMatrix::is_sentinel(p.matrix.get(0, 0)));
        assert!(!CostMatrix::is_sentinel(p.matrix.get(0, 1)));
    }

    fn weighted(pe: f64, ps: f64, px: f64, py: f64, pz: f64) -> CostModel<f64> {
        let cfg = DistanceConfig {
            geometric_weights: GeometricWeights { px, py, pz },
            persistence_weights: PersistenceWeights {
                extremum: pe,
                saddle: ps,
            },
            ..DistanceConfig::with_order(Order::Wasserstein(1))
        };
        CostModel::from_config(&cfg).unwrap()
    }

    fn min(b: f64, d: f64) -> PersistencePair {
        PersistencePair::minimum(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }

    fn sad(b: f64, d: f64) -> PersistencePair {
        PersistencePair::saddle(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }

    fn global(b: f64, d: f64) -> PersistencePair {
        PersistencePair::new(
            PairType::Maximum,
            CriticalType::LocalMinimum,
            CriticalType::LocalMaximum,
            CriticalPoint::scalar(b),
            CriticalPoint::scalar(d),
        )
    }

    #[test]
    fn minimum_weighs_birth_with_extremum_weight() {
        // Birth moves by 1, death by 2.
        let m = weighted(3.0, 0.5, 0.0, 0.0, 0.0);
        let c = m.pair_cost(&min(0.0, 1.0), &min(1.0, 3.0));
        assert!((c - (3.0 * 1.0 + 0.5 * 2.0)).abs() < 1e-12, "c={}", c);
        assert!((m.diagonal_cost(&min(0.0, 2.0)) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn maximum_weighs_death_with_extremum_weight() {
        let m = weighted(3.0, 0.5, 0.0, 0.0, 0.0);
        let c = m.pair_cost(&max(0.0, 1.0), &max(1.0, 3.0));
        assert!((c - (0.5 * 1.0 + 3.0 * 2.0)).abs() < 1e-12, "c={}", c);
        assert!((m.diagonal_cost(&max(0.0, 2.0)) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn saddle_uses_saddle_weight_everywhere() {
        let m = weighted(3.0, 0.5, 0.0, 0.0, 0.0);
        let c = m.pair_cost(&sad(0.0, 1.0), &sad(1.0, 3.0));
        assert!((c - 0.5 * 3.0).abs() < 1e-12, "c={}", c);
        assert!((m.diagonal_cost(&sad(0.0, 2.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn global_pair_weighs_birth_with_saddle_weight() {
        let m = weighted(1.0, 0.0, 0.0, 0.0, 0.0);
        // Only the birth differs, and births of min-to-max pairs use ps = 0.
        assert_eq!(m.pair_cost(&global(0.0, 10.0), &global(1.0, 10.0)), 0.0);
        // The death term still uses pe.
        assert!((m.pair_cost(&global(0.0, 10.0), &global(0.0, 12.0)) - 2.0).abs() < 1e-12);
        // Killing it uses pe.
        assert!((m.diagonal_cost(&global(0.0, 10.0)) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn geometry_uses_birth_point_for_minima() {
        let m = weighted(0.0, 0.0, 1.0, 2.0, 3.0);
        let a = PersistencePair::minimum(
            CriticalPoint::new(0.0, 1.0, 1.0, 1.0),
            CriticalPoint::new(1.0, 50.0, 50.0, 50.0),
        );
        let b = PersistencePair::minimum(
            CriticalPoint::new(0.0, 2.0, 0.0, 1.5),
            CriticalPoint::new(1.0, -50.0, 0.0, 0.0),
        );
        // 1·1 + 2·1 + 3·0.5
        assert!((m.pair_cost(&a, &b) - 4.5).abs() < 1e-12);
    }

    #[test]
    fn geometry_uses_midpoint_for_saddles() {
        let m = weighted(0.0, 0.0, 1.0, 1.0, 1.0);
        let a = PersistencePair::saddle(
            CriticalPoint::new(0.0, 0.0, 0.0, 0.0),
            CriticalPoint::new(1.0, 2.0, 4.0, 0.0),
        );
        let b = PersistencePair::saddle(
            CriticalPoint::new(0.0, 2.0, 0.0, 0.0),
            CriticalPoint::new(1.0, 2.0, 0.0, 6.0),
        );
        // Midpoints (1, 2, 0) and (2, 0, 3).
        assert!((m.pair_cost(&a, &b) - 6.0).abs() < 1e-12);
        // Killing measures the distance between birth and death.
        assert!((m.diagonal_cost(&a) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn overflowing_costs_are_rejected() {
        let m = model(Order::Wasserstein(2));
        let d1 = [max(0.0, 1e200)];
        let d2 = [max(0.0, 1.0000001e200)];
        let p = build_cost_matrix(&m, PairType::Maximum, &d1, &d2, &[0], &[0]);
        assert!(matches!(p, Err(Error::Domain(_))));
    }

    #[test]
    fn new_rejects_more_rows_than_columns() {
        assert!(matches!(CostMatrix::<f64>::new(3, 2), Err(Error::CostShape(4, 3))));
        assert!(CostMatrix::<f64>::new(2, 2).is_ok());
    }

    #[test]
    fn from_cells_rejects_tall_matrices() {
        let tall = Array2::<f64>::zeros((3, 2));
        assert!(matches!(CostMatrix::from_cells(tall), Err(Error::CostShape(3, 2))));
    }
}
