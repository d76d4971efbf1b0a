//! Per-type partitioning of diagrams and noise pruning.

use crate::diagram::{PairType, PersistencePair};
use num_traits::Float;

/// Pruning threshold for both diagrams.
///
/// With `percent` in `(0, 100)` the threshold sits that far between the
/// smallest positive and the largest persistence. Otherwise it is the smallest
/// positive persistence, which only discards zero-persistence pairs.
pub fn minimum_relevant_persistence<T: Float>(
    d1: &[PersistencePair<T>],
    d2: &[PersistencePair<T>],
    percent: f64,
) -> T {
    let mut lo = T::infinity();
    let mut hi = T::zero();
    for pair in d1.iter().chain(d2) {
        let p = pair.persistence.abs();
        if p > T::zero() {
            lo = lo.min(p);
            hi = hi.max(p);
        }
    }
    if !lo.is_finite() {
        return T::zero();
    }
    if percent > 0.0 && percent < 100.0 {
        let s = T::from(percent / 100.0).unwrap_or_else(T::zero);
        lo + s * (hi - lo)
    } else {
        lo
    }
}

/// Local → global index maps for one diagram, one per pair type.
///
/// Every map is strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub minima: Vec<usize>,
    pub maxima: Vec<usize>,
    pub saddles: Vec<usize>,
}

impl Partition {
    /// Remap for one pair type.
    pub fn class(&self, pair_type: PairType) -> &[usize] {
        match pair_type {
            PairType::Minimum => &self.minima,
            PairType::Maximum => &self.maxima,
            PairType::Saddle => &self.saddles,
        }
    }

    /// `(nb_min, nb_max, nb_saddle)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.minima.len(), self.maxima.len(), self.saddles.len())
    }

    /// Number of kept features.
    pub fn len(&self) -> usize {
        self.minima.len() + self.maxima.len() + self.saddles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `diagram` by pair type, dropping pairs below `threshold`.
///
/// The most persistent pair of the diagram is always kept.
pub fn partition<T: Float>(diagram: &[PersistencePair<T>], threshold: T) -> Partition {
    let mut keep_always = None;
    let mut best = T::neg_infinity();
    for (i, pair) in diagram.iter().enumerate() {
        let p = pair.persistence.abs();
        if p > best {
            best = p;
            keep_always = Some(i);
        }
    }

    let mut out = Partition::default();
    for (i, pair) in diagram.iter().enumerate() {
        if pair.persistence.abs() < threshold && keep_always != Some(i) {
            continue;
        }
        match pair.pair_type {
            PairType::Minimum => out.minima.push(i),
            PairType::Maximum => out.maxima.push(i),
            PairType::Saddle => out.saddles.push(i),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::CriticalPoint;

    fn min(b: f64, d: f64) -> PersistencePair {
        PersistencePair::minimum(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }
    fn max(b: f64, d: f64) -> PersistencePair {
        PersistencePair::maximum(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }
    fn sad(b: f64, d: f64) -> PersistencePair {
        PersistencePair::saddle(CriticalPoint::scalar(b), CriticalPoint::scalar(d))
    }

    #[test]
    fn threshold_defaults_to_smallest_positive() {
        let d1 = [min(0.0, 0.0), min(0.0, 0.5)];
        let d2 = [max(1.0, 3.0)];
        let t = minimum_relevant_persistence(&d1, &d2, 0.0);
        assert!((t - 0.5).abs() < 1e-12);
    }

    #[test]
    fn threshold_interpolates_percentage() {
        let d1 = [min(0.0, 1.0)];
        let d2 = [max(0.0, 11.0)];
        let t = minimum_relevant_persistence(&d1, &d2, 50.0);
        assert!((t - 6.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_of_empty_input_is_zero() {
        let t = minimum_relevant_persistence::<f64>(&[], &[], 20.0);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn partition_is_dense_and_increasing() {
        let d = [max(0.0, 1.0), min(0.0, 2.0), sad(0.5, 0.7), min(1.0, 1.5), max(2.0, 9.0)];
        let p = partition(&d, 0.0);
        assert_eq!(p.minima, vec![1, 3]);
        assert_eq!(p.maxima, vec![0, 4]);
        assert_eq!(p.saddles, vec![2]);
        assert_eq!(p.counts(), (2, 2, 1));
        assert_eq!(p.len(), d.len());
    }

    #[test]
    fn partition_prunes_but_keeps_most_persistent() {
        let d = [min(0.0, 0.1), max(0.0, 0.2), sad(0.0, 0.15)];
        let p = partition(&d, 10.0);
        assert!(p.minima.is_empty());
        assert!(p.saddles.is_empty());
        assert_eq!(p.maxima, vec![1]);
    }
}
