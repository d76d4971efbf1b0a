//! Persistence pairs and diagrams.
//!
//! A diagram is an ordered slice of [`PersistencePair`]s. The position of a pair
//! in the slice is its identity: matchings refer to pairs by index.

use crate::{Error, Result};
use num_traits::Float;

/// Classification of a critical point of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriticalType {
    LocalMinimum,
    Saddle1,
    Saddle2,
    LocalMaximum,
    Degenerate,
    Regular,
}

/// Which critical-point family a pair is matched within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairType {
    Minimum,
    Saddle,
    Maximum,
}

impl PairType {
    /// All pair types, in solve order.
    pub const ALL: [PairType; 3] = [PairType::Minimum, PairType::Maximum, PairType::Saddle];
}

/// A critical point: scalar value plus 3-D location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalPoint<T = f64> {
    pub value: T,
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T: Float> CriticalPoint<T> {
    pub fn new(value: T, x: T, y: T, z: T) -> Self {
        Self { value, x, y, z }
    }

    /// A point carrying only a scalar value, located at the origin.
    pub fn scalar(value: T) -> Self {
        Self::new(value, T::zero(), T::zero(), T::zero())
    }

    /// Midpoint of the segment to `other` (the scalar value is averaged too).
    pub fn midpoint(&self, other: &Self) -> Self {
        let two = T::one() + T::one();
        Self {
            value: (self.value + other.value) / two,
            x: (self.x + other.x) / two,
            y: (self.y + other.y) / two,
            z: (self.z + other.z) / two,
        }
    }

    fn is_finite(&self) -> bool {
        self.value.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One (birth, death) feature of a persistence diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistencePair<T = f64> {
    pub birth_type: CriticalType,
    pub death_type: CriticalType,
    pub pair_type: PairType,
    /// `death.value - birth.value`.
    pub persistence: T,
    pub birth: CriticalPoint<T>,
    pub death: CriticalPoint<T>,
}

impl<T: Float> PersistencePair<T> {
    pub fn new(
        pair_type: PairType,
        birth_type: CriticalType,
        death_type: CriticalType,
        birth: CriticalPoint<T>,
        death: CriticalPoint<T>,
    ) -> Self {
        Self {
            birth_type,
            death_type,
            pair_type,
            persistence: death.value - birth.value,
            birth,
            death,
        }
    }

    /// A minimum / 1-saddle pair.
    pub fn minimum(birth: CriticalPoint<T>, death: CriticalPoint<T>) -> Self {
        Self::new(
            PairType::Minimum,
            CriticalType::LocalMinimum,
            CriticalType::Saddle1,
            birth,
            death,
        )
    }

    /// A 1-saddle / 2-saddle pair.
    pub fn saddle(birth: CriticalPoint<T>, death: CriticalPoint<T>) -> Self {
        Self::new(
            PairType::Saddle,
            CriticalType::Saddle1,
            CriticalType::Saddle2,
            birth,
            death,
        )
    }

    /// A 2-saddle / maximum pair.
    pub fn maximum(birth: CriticalPoint<T>, death: CriticalPoint<T>) -> Self {
        Self::new(
            PairType::Maximum,
            CriticalType::Saddle2,
            CriticalType::LocalMaximum,
            birth,
            death,
        )
    }

    /// Born at a local minimum.
    pub fn is_min(&self) -> bool {
        self.birth_type == CriticalType::LocalMinimum
    }

    /// Dies at a local maximum.
    pub fn is_max(&self) -> bool {
        self.death_type == CriticalType::LocalMaximum
    }

    /// Whether two pairs may be matched with each other.
    ///
    /// Pairs are only comparable when both endpoints have the same critical index.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.birth_type == other.birth_type && self.death_type == other.death_type
    }
}

/// Reject diagrams carrying NaN or infinite values.
pub fn validate_diagram<T: Float>(diagram: &[PersistencePair<T>]) -> Result<()> {
    for pair in diagram {
        if !pair.birth.is_finite() || !pair.death.is_finite() || !pair.persistence.is_finite() {
            return Err(Error::Domain("persistence pair values must be finite"));
        }
    }
    Ok(())
}
