//! # pdwass
//!
//! Exact Wasserstein and bottleneck distances between persistence diagrams.
//!
//! ## The Problem
//!
//! A persistence diagram summarises the topology of a scalar field as a set of
//! (birth, death) pairs. Two diagrams are compared by matching their pairs:
//! each pair is either matched to a pair of the same kind in the other diagram
//! or "killed" by projecting it onto the diagonal birth = death. The distance
//! is the cost of the cheapest such matching.
//!
//! Pairs are matched only within their family (minima, saddles, maxima), so
//! the problem splits into three independent assignment problems. Each one is
//! a dense cost matrix with an extra diagonal row and column, solved exactly.
//!
//! ## Key Functions
//!
//! | Function | Use Case | Complexity |
//! |----------|----------|------------|
//! | [`distance`] | One-shot scalar distance | O(n³) |
//! | [`DiagramDistance::compute`] | Distance + matching + diagnostics | O(n³) |
//! | [`munkres::Munkres`] | Min-sum assignment with a diagonal | O(n³) |
//! | [`bottleneck::BottleneckSolver`] | Min-max assignment with a diagonal | O(n³ log n) |
//!
//! ## Quick Start
//!
//! ```rust
//! use pdwass::{distance, CriticalPoint, DistanceConfig, Order, PersistencePair};
//!
//! let p = |b: f64, d: f64| {
//!     PersistencePair::maximum(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
//! };
//! let d1 = [p(0.0, 1.0), p(0.2, 3.0)];
//! let d2 = [p(0.0, 1.1), p(0.1, 3.0), p(0.5, 0.55)];
//!
//! let w2 = distance(&d1, &d2, &DistanceConfig::default()).unwrap();
//! let linf = distance(&d1, &d2, &DistanceConfig::with_order(Order::Bottleneck)).unwrap();
//! assert!(w2 > 0.0 && linf > 0.0);
//! ```
//!
//! ## Cost
//!
//! With exponent `w` (the Wasserstein order, or 1 for the bottleneck):
//!
//! ```text
//! pair_cost(a, b) = ( pb·|Δbirth|^w + pd·|Δdeath|^w + px|Δx|^w + py|Δy|^w + pz|Δz|^w )^(1/w)
//! ```
//!
//! where `pb`/`pd` are the extremum weight `pe` for minima births and maxima
//! deaths, and the saddle weight `ps` otherwise. The global pair, born at a
//! minimum and dying at a maximum, weighs its birth with `ps`. Killing a pair costs the same
//! expression evaluated between its own birth and death.
//!
//! ## What Can Go Wrong
//!
//! 1. **Step cap reached**: the Munkres solver stops after
//!    `max_solver_steps` steps and returns its current, possibly suboptimal,
//!    assignment. [`DistanceReport::converged`] is then `false`.
//! 2. **Pruning**: a nonzero `relevance_percent_threshold` discards low
//!    persistence pairs before matching; they appear neither in
//!    `matchings` nor in `killed`.
//! 3. **Mixed types**: pairs whose critical types differ are never matched,
//!    even within one family.
//! 4. **Float range**: every `|Δ|^w` term must stay finite. Very large
//!    coordinates or a high order overflow, and the computation fails with
//!    [`Error::Domain`] instead of returning an infinite distance.
//!
//! ## References
//!
//! - Munkres (1957). "Algorithms for the Assignment and Transportation Problems"
//! - Cohen-Steiner, Edelsbrunner & Harer (2007). "Stability of Persistence Diagrams"
//! - Soler, Plainchault, Conche & Tierny (2018). "Lifted Wasserstein Matcher for
//!   Fast and Robust Topology Tracking"

use thiserror::Error;

pub mod assignment;
pub mod bottleneck;
pub mod config;
pub mod cost;
pub mod diagram;
pub mod distance;
pub mod munkres;
pub mod partition;
pub mod reconstruct;

pub use config::{DistanceConfig, GeometricWeights, Order, PersistenceWeights};
pub use diagram::{CriticalPoint, CriticalType, PairType, PersistencePair};
pub use distance::{distance, DiagramDistance, DistanceReport};
pub use reconstruct::{DiagonalMatch, GlobalMatching, Which};

/// Diagram distance error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Unusable configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A configuration value has no finite representation in the float type.
    #[error("value {0} is not representable in the target float type")]
    Unrepresentable(f64),

    /// Cost matrix is empty or has more rows than columns.
    #[error("cost matrix must have 1 <= rows <= columns, got ({0}, {1})")]
    CostShape(usize, usize),

    /// Domain error (invalid inputs for the mathematical definition).
    #[error("{0}")]
    Domain(&'static str),
}

/// Result type for diagram distance operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pair_strategy() -> impl Strategy<Value = PersistencePair> {
        (0u8..3, 0.0f64..10.0, 0.0f64..5.0).prop_map(|(kind, birth, len)| {
            let b = CriticalPoint::scalar(birth);
            let d = CriticalPoint::scalar(birth + len);
            match kind {
                0 => PersistencePair::minimum(b, d),
                1 => PersistencePair::saddle(b, d),
                _ => PersistencePair::maximum(b, d),
            }
        })
    }

    fn diagram_strategy() -> impl Strategy<Value = Vec<PersistencePair>> {
        prop::collection::vec(pair_strategy(), 0..8)
    }

    #[test]
    fn known_single_match() {
        let p = |d: f64| {
            PersistencePair::maximum(CriticalPoint::scalar(0.0), CriticalPoint::scalar(d))
        };
        let (a, b) = ([p(1.0)], [p(1.1)]);
        let d = distance(&a, &b, &DistanceConfig::with_order(Order::Wasserstein(1))).unwrap();
        assert!((d - 0.1).abs() < 1e-9, "d={}", d);
    }

    proptest! {
        #[test]
        fn identity_is_zero(d in diagram_strategy()) {
            for order in [Order::Wasserstein(1), Order::Wasserstein(2), Order::Bottleneck] {
                let v = distance(&d, &d, &DistanceConfig::with_order(order)).unwrap();
                prop_assert!(v.abs() < 1e-9, "order={} d={}", order, v);
            }
        }

        #[test]
        fn symmetric(a in diagram_strategy(), b in diagram_strategy()) {
            for order in [Order::Wasserstein(1), Order::Bottleneck] {
                let cfg = DistanceConfig::with_order(order);
                let ab = distance(&a, &b, &cfg).unwrap();
                let ba = distance(&b, &a, &cfg).unwrap();
                prop_assert!((ab - ba).abs() < 1e-9, "order={} ab={} ba={}", order, ab, ba);
            }
        }

        #[test]
        fn nonnegative(a in diagram_strategy(), b in diagram_strategy()) {
            let v = distance(&a, &b, &DistanceConfig::default()).unwrap();
            prop_assert!(v >= 0.0);
        }
    }
}
