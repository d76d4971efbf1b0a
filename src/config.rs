//! Distance configuration.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Default cap on Munkres step executions.
pub const DEFAULT_MAX_SOLVER_STEPS: usize = 100_000;

/// Which distance to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Order-p Wasserstein distance, `p >= 1`.
    Wasserstein(u32),
    /// Bottleneck (L∞) distance.
    Bottleneck,
}

impl Order {
    /// Exponent applied per cost cell.
    ///
    /// The bottleneck order builds its matrices with exponent 1 and leaves the
    /// min-max objective to the solver.
    pub fn exponent(&self) -> u32 {
        match *self {
            Order::Wasserstein(p) => p.max(1),
            Order::Bottleneck => 1,
        }
    }

    pub fn is_bottleneck(&self) -> bool {
        matches!(self, Order::Bottleneck)
    }
}

impl FromStr for Order {
    type Err = Error;

    /// Accepts `"inf"`, the bottleneck sentinel `"-1"`, or a positive integer.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("inf") {
            return Ok(Order::Bottleneck);
        }
        match s.parse::<i64>() {
            Ok(-1) => Ok(Order::Bottleneck),
            Ok(p) if p > 0 && p <= u32::MAX as i64 => Ok(Order::Wasserstein(p as u32)),
            _ => Err(Error::InvalidConfiguration(format!(
                "order must be \"inf\" or a positive integer, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Wasserstein(p) => write!(f, "{p}"),
            Order::Bottleneck => f.write_str("inf"),
        }
    }
}

/// Per-axis weights of the geometric cost term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricWeights {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
}

impl Default for GeometricWeights {
    fn default() -> Self {
        Self {
            px: 0.0,
            py: 0.0,
            pz: 0.0,
        }
    }
}

/// Weights of the persistence cost term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistenceWeights {
    /// `pe`: applied to extremum endpoints.
    pub extremum: f64,
    /// `ps`: applied to saddle endpoints.
    pub saddle: f64,
}

impl Default for PersistenceWeights {
    fn default() -> Self {
        Self {
            extremum: 1.0,
            saddle: 1.0,
        }
    }
}

/// Configuration of a diagram distance computation.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceConfig {
    pub geometric_weights: GeometricWeights,
    pub persistence_weights: PersistenceWeights,
    pub order: Order,
    /// Percentage (0–100) of the persistence range below which pairs are pruned.
    /// `0.0` only prunes zero-persistence pairs.
    pub relevance_percent_threshold: f64,
    /// Munkres step executions before the solve is aborted.
    pub max_solver_steps: usize,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            geometric_weights: GeometricWeights::default(),
            persistence_weights: PersistenceWeights::default(),
            order: Order::Wasserstein(2),
            relevance_percent_threshold: 0.0,
            max_solver_steps: DEFAULT_MAX_SOLVER_STEPS,
        }
    }
}

impl DistanceConfig {
    /// Default configuration for the given order.
    pub fn with_order(order: Order) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    /// Check every field; called before any matrix is built.
    pub fn validate(&self) -> Result<()> {
        let g = &self.geometric_weights;
        let p = &self.persistence_weights;
        for (name, w) in [
            ("px", g.px),
            ("py", g.py),
            ("pz", g.pz),
            ("pe", p.extremum),
            ("ps", p.saddle),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "weight {name} must be finite and nonnegative, got {w}"
                )));
            }
        }
        let t = self.relevance_percent_threshold;
        if !(0.0..=100.0).contains(&t) {
            return Err(Error::InvalidConfiguration(format!(
                "relevance percent threshold must lie in [0, 100], got {t}"
            )));
        }
        if let Order::Wasserstein(0) = self.order {
            return Err(Error::InvalidConfiguration("order must be positive".into()));
        }
        if self.max_solver_steps == 0 {
            return Err(Error::InvalidConfiguration(
                "max_solver_steps must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
