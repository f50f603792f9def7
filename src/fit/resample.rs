//! Bootstrap index generation.
//!
//! The whole `nboots × n` matrix is drawn up front from one seeded generator, so
//! which rows a trial sees never depends on how trials are scheduled.

use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use crate::domain::IndexMatrix;
use crate::error::OrthoError;

#[derive(Debug, Clone)]
pub struct Resampler {
    rng: StdRng,
}

impl Resampler {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw `nboots` rows of `n` indices uniformly from `0..n`, with replacement.
    pub fn draw(&mut self, n: usize, nboots: usize) -> Result<IndexMatrix, OrthoError> {
        if nboots == 0 {
            return IndexMatrix::from_rows(0, n, Vec::new());
        }
        if n == 0 {
            return Err(OrthoError::config("cannot resample an empty dataset"));
        }

        let dist = Uniform::new(0, n);
        let data: Vec<usize> = (0..nboots * n).map(|_| dist.sample(&mut self.rng)).collect();
        IndexMatrix::from_rows(nboots, n, data)
    }
}

/// Convenience wrapper: a fresh seeded resampler drawing one matrix.
pub fn resample_indices(n: usize, nboots: usize, seed: u64) -> Result<IndexMatrix, OrthoError> {
    Resampler::from_seed(seed).draw(n, nboots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_in_range_with_expected_shape() {
        let m = resample_indices(5, 100, 7).unwrap();
        assert_eq!(m.rows(), 100);
        assert_eq!(m.cols(), 5);
        assert_eq!(m.as_slice().len(), 500);
        assert!(m.as_slice().iter().all(|&i| i <= 4));
    }

    #[test]
    fn same_seed_reproduces_matrix() {
        let a = resample_indices(5, 100, 1234).unwrap();
        let b = resample_indices(5, 100, 1234).unwrap();
        let c = resample_indices(5, 100, 1235).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn every_index_eventually_drawn() {
        let m = resample_indices(5, 100, 99).unwrap();
        for i in 0..5 {
            assert!(m.as_slice().contains(&i), "index {i} never drawn");
        }
    }

    #[test]
    fn zero_boots_gives_empty_matrix() {
        let m = resample_indices(5, 0, 1).unwrap();
        assert_eq!(m.rows(), 0);
        assert!(resample_indices(0, 3, 1).is_err());
    }
}
