//! Distance between two persistence diagrams.
//!
//! The diagrams are split by pair type, each type is solved as its own
//! assignment problem, and the three results are folded into one distance.
//!
//! ```rust
//! use pdwass::{CriticalPoint, DiagramDistance, DistanceConfig, Order, PersistencePair};
//!
//! let a = [PersistencePair::maximum(CriticalPoint::scalar(0.0_f64), CriticalPoint::scalar(1.0))];
//! let b = [PersistencePair::maximum(CriticalPoint::scalar(0.0), CriticalPoint::scalar(1.1))];
//!
//! let dd = DiagramDistance::new(DistanceConfig::with_order(Order::Wasserstein(1))).unwrap();
//! let report = dd.compute(&a, &b).unwrap();
//! assert!((report.distance - 0.1).abs() < 1e-9);
//! assert_eq!(report.matchings.len(), 1);
//! ```

use crate::assignment::{Assignment, AssignmentSolver, LogObserver, SolverObserver};
use crate::bottleneck::BottleneckSolver;
use crate::config::DistanceConfig;
use crate::cost::{build_cost_matrix, CostModel};
use crate::diagram::{validate_diagram, PairType, PersistencePair};
use crate::munkres::Munkres;
use crate::partition::{minimum_relevant_persistence, partition};
use crate::reconstruct::{AddedPersistence, DiagonalMatch, GlobalMatching, Reconstructor};
use crate::Result;
use num_traits::Float;

/// Result of one distance computation.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceReport<T> {
    pub distance: T,
    /// Real matches in the caller's index order, sorted by `first`.
    pub matchings: Vec<GlobalMatching<T>>,
    /// Features of either diagram assigned to the diagonal.
    pub killed: Vec<DiagonalMatch<T>>,
    pub added_persistence: AddedPersistence<T>,
    pub matched_cost: T,
    /// Matches whose solver cost disagreed with a recomputation.
    pub mismatches: usize,
    /// `false` if any solve hit the step cap.
    pub converged: bool,
    /// The diagrams were swapped internally because the first was larger.
    pub transposed: bool,
    /// Persistence below which pairs were pruned.
    pub threshold: T,
    pub len_first: usize,
    pub len_second: usize,
}

impl<T> DistanceReport<T> {
    /// Partner of every feature in the other diagram.
    ///
    /// `None` marks features that were killed or pruned.
    pub fn matching_ids(&self) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
        let mut first = vec![None; self.len_first];
        let mut second = vec![None; self.len_second];
        for m in &self.matchings {
            first[m.first] = Some(m.second);
            second[m.second] = Some(m.first);
        }
        (first, second)
    }
}

/// Configured distance between persistence diagrams.
#[derive(Debug, Clone)]
pub struct DiagramDistance<T> {
    config: DistanceConfig,
    model: CostModel<T>,
}

impl<T: Float> DiagramDistance<T> {
    /// Validate `config` and prepare the cost model.
    pub fn new(config: DistanceConfig) -> Result<Self> {
        config.validate()?;
        let model = CostModel::from_config(&config)?;
        Ok(Self { config, model })
    }

    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    /// Distance between `d1` and `d2`, reporting solver progress through `log`.
    pub fn compute(
        &self,
        d1: &[PersistencePair<T>],
        d2: &[PersistencePair<T>],
    ) -> Result<DistanceReport<T>> {
        self.compute_with(d1, d2, &mut LogObserver)
    }

    /// Like [`compute`](Self::compute), with a caller-supplied observer.
    pub fn compute_with(
        &self,
        d1: &[PersistencePair<T>],
        d2: &[PersistencePair<T>],
        observer: &mut dyn SolverObserver,
    ) -> Result<DistanceReport<T>> {
        validate_diagram(d1)?;
        validate_diagram(d2)?;

        let transposed = d1.len() > d2.len();
        let (a, b) = if transposed { (d2, d1) } else { (d1, d2) };

        let threshold =
            minimum_relevant_persistence(a, b, self.config.relevance_percent_threshold);
        let pa = partition(a, threshold);
        let pb = partition(b, threshold);
        log::debug!(
            "diagram sizes {} / {}, kept (min, max, saddle) {:?} / {:?}",
            a.len(),
            b.len(),
            pa.counts(),
            pb.counts()
        );

        let bottleneck = self.config.order.is_bottleneck();
        let mut reconstructor = Reconstructor::new(&self.model, a, b, bottleneck, transposed);

        for pair_type in PairType::ALL {
            let (first, second) = (pa.class(pair_type), pb.class(pair_type));
            if first.is_empty() && second.is_empty() {
                continue;
            }
            let problem = build_cost_matrix(&self.model, pair_type, a, b, first, second)?;
            let assignment = if problem.layout.is_degenerate() {
                log::debug!(
                    "{:?}: one side empty, killing {} feature(s)",
                    pair_type,
                    first.len() + second.len()
                );
                Assignment::all_diagonal(&problem.matrix)
            } else {
                log::debug!(
                    "{:?}: solving {}x{}",
                    pair_type,
                    problem.matrix.nrows(),
                    problem.matrix.ncols()
                );
                if bottleneck {
                    BottleneckSolver.solve(problem.matrix, observer)
                } else {
                    Munkres::new(self.config.max_solver_steps).solve(problem.matrix, observer)
                }
            };
            reconstructor.absorb(&problem.layout, &assignment);
        }

        let r = reconstructor.finish();
        if !r.converged {
            log::warn!("distance computed from a capped solve, result may not be optimal");
        }

        Ok(DistanceReport {
            distance: r.distance,
            matchings: r.matchings,
            killed: r.killed,
            added_persistence: r.added,
            matched_cost: r.matched_cost,
            mismatches: r.mismatches,
            converged: r.converged,
            transposed,
            threshold,
            len_first: d1.len(),
            len_second: d2.len(),
        })
    }
}

/// Distance between `d1` and `d2` under `config`.
pub fn distance<T: Float>(
    d1: &[PersistencePair<T>],
    d2: &[PersistencePair<T>],
    config: &DistanceConfig,
) -> Result<T> {
    Ok(DiagramDistance::new(config.clone())?.compute(d1, d2)?.distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Order;
    use crate::diagram::CriticalPoint;
    use crate::reconstruct::Which;
    use crate::Error;

    fn min(b: f64, d: f64) -> PersistencePair {
        PersistencePair::minimum(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }
    fn max(b: f64, d: f64) -> PersistencePair {
        PersistencePair::maximum(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }
    fn sad(b: f64, d: f64) -> PersistencePair {
        PersistencePair::saddle(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }

    fn w1() -> DiagramDistance<f64> {
        DiagramDistance::new(DistanceConfig::with_order(Order::Wasserstein(1))).unwrap()
    }

    #[test]
    fn empty_diagrams_are_at_distance_zero() {
        let r = w1().compute(&[], &[]).unwrap();
        assert_eq!(r.distance, 0.0);
        assert!(r.matchings.is_empty());
        assert!(r.killed.is_empty());
    }

    #[test]
    fn one_sided_type_is_killed() {
        let r = w1().compute(&[max(1.0, 3.0)], &[]).unwrap();
        assert!((r.distance - 2.0).abs() < 1e-12);
        assert_eq!(r.killed.len(), 1);
        assert_eq!(r.killed[0].diagram, Which::First);
        assert!((r.added_persistence.maxima - 2.0).abs() < 1e-12);
    }

    #[test]
    fn types_are_solved_independently() {
        // A close maximum must not be matched with a minimum.
        let d1 = [min(0.0, 1.0), max(5.0, 6.0)];
        let d2 = [max(0.0, 1.0), min(5.0, 6.0)];
        let r = w1().compute(&d1, &d2).unwrap();
        for m in &r.matchings {
            assert_eq!(d1[m.first].pair_type, d2[m.second].pair_type);
        }
    }

    #[test]
    fn swapped_run_reports_caller_indices() {
        let d1 = [max(0.0, 1.0), max(0.0, 4.0), sad(0.2, 0.3)];
        let d2 = [max(0.0, 4.1)];
        let r = w1().compute(&d1, &d2).unwrap();
        assert!(r.transposed);
        assert_eq!(r.matchings.len(), 1);
        assert_eq!((r.matchings[0].first, r.matchings[0].second), (1, 0));
        let (ids1, ids2) = r.matching_ids();
        assert_eq!(ids1, vec![None, Some(0), None]);
        assert_eq!(ids2, vec![Some(1)]);
    }

    #[test]
    fn invalid_configuration_is_rejected_up_front() {
        let cfg = DistanceConfig::with_order(Order::Wasserstein(0));
        assert!(matches!(
            DiagramDistance::<f64>::new(cfg),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let bad = [max(0.0, f64::INFINITY)];
        assert!(matches!(w1().compute(&bad, &[]), Err(Error::Domain(_))));
    }

    #[test]
    fn overflowing_costs_are_an_error() {
        let cfg = DistanceConfig::with_order(Order::Wasserstein(2));
        let dd = DiagramDistance::<f64>::new(cfg).unwrap();
        let r = dd.compute(&[max(0.0, 1e200)], &[max(0.0, 1.0000001e200)]);
        assert!(matches!(r, Err(Error::Domain(_))));
        // The same diagrams are fine in order 1.
        let d = w1().compute(&[max(0.0, 1e200)], &[max(0.0, 1.0000001e200)]);
        assert!(d.unwrap().distance.is_finite());
    }

    #[test]
    fn works_in_single_precision() {
        let a = [PersistencePair::<f32>::maximum(
            CriticalPoint::scalar(0.0),
            CriticalPoint::scalar(1.0),
        )];
        let b = [PersistencePair::<f32>::maximum(
            CriticalPoint::scalar(0.0),
            CriticalPoint::scalar(1.5),
        )];
        let cfg = DistanceConfig::with_order(Order::Wasserstein(1));
        let d = distance(&a, &b, &cfg).unwrap();
        assert!((d - 0.5).abs() < 1e-6);
    }
}
