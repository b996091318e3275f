//! Temperature sampling over next-symbol distributions.
//!
//! Temperature reshapes a distribution before drawing from it:
//! `p_i' ∝ exp(ln p_i / T)`. `T = 1` keeps the model's distribution, small
//! `T` approaches argmax and large `T` approaches uniform.

use std::fmt::{Debug, Formatter};
use std::ops::Deref;

use ndarray::Array1;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

use crate::error::{MelodyError, Result};

/// Wrapper around a next-symbol probability vector.
pub struct Probabilities(Array1<f32>);

impl Deref for Probabilities {
    type Target = Array1<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Debug for Probabilities {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Probabilities({})", self.0.len())
    }
}

/// Checks that `temperature` is a finite positive number.
pub fn validate_temperature(temperature: f32) -> Result<()> {
    if temperature.is_finite() && temperature > 0.0 {
        Ok(())
    } else {
        Err(MelodyError::invalid_temperature(temperature))
    }
}

impl Probabilities {
    /// Wraps a model output. Entries must be finite and non-negative with a
    /// positive sum.
    pub fn new(probs: Array1<f32>) -> Result<Self> {
        if probs.is_empty() {
            return Err(MelodyError::invalid_artifact("model produced an empty distribution"));
        }
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) || probs.sum() <= 0.0 {
            return Err(MelodyError::invalid_artifact(
                "model produced an invalid probability distribution",
            ));
        }
        Ok(Self(probs))
    }

    /// Returns the reweighted distribution `softmax(ln p / T)`.
    ///
    /// Computed in `f64` log space with max subtraction; zero-probability
    /// entries stay at zero. When `T` is so small that the scaled values
    /// still leave the finite range, all mass goes to the argmax.
    pub fn with_temperature(&self, temperature: f32) -> Result<Self> {
        validate_temperature(temperature)?;
        let temperature = f64::from(temperature);

        let scaled = self.0.mapv(|p| {
            if p > 0.0 {
                f64::from(p).ln() / temperature
            } else {
                f64::NEG_INFINITY
            }
        });
        let max = scaled.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        if !max.is_finite() {
            return Ok(self.one_hot_argmax());
        }

        let weights = scaled.mapv(|x| (x - max).exp());
        let sum = weights.sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Ok(self.one_hot_argmax());
        }
        Ok(Self(weights.mapv(|w| (w / sum) as f32)))
    }

    fn one_hot_argmax(&self) -> Self {
        let mut probs = Array1::zeros(self.0.len());
        probs[self.argmax()] = 1.0;
        Self(probs)
    }

    /// Index of the most probable entry; ties resolve to the lowest index.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.0.iter().enumerate() {
            if p > self.0[best] {
                best = i;
            }
        }
        best
    }

    /// Draws an index with probability proportional to its weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize> {
        let distribution = WeightedIndex::new(self.0.iter().copied()).map_err(|e| {
            MelodyError::invalid_artifact(format!("cannot sample distribution: {}", e))
        })?;
        Ok(distribution.sample(rng))
    }

    /// Reweights by `temperature` and draws an index.
    pub fn sample_with_temperature<R: Rng + ?Sized>(
        &self,
        temperature: f32,
        rng: &mut R,
    ) -> Result<usize> {
        self.with_temperature(temperature)?.sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn unit_temperature_keeps_distribution() {
        let probs = Probabilities::new(array![0.1, 0.2, 0.7]).unwrap();
        let same = probs.with_temperature(1.0).unwrap();
        for (a, b) in probs.iter().zip(same.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn low_temperature_approaches_argmax() {
        let probs = Probabilities::new(array![0.3, 0.4, 0.3]).unwrap();
        let sharp = probs.with_temperature(0.01).unwrap();
        assert!(sharp[1] > 0.999);

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(probs.sample_with_temperature(0.01, &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn vanishing_temperature_picks_argmax() {
        let probs = Probabilities::new(array![0.3, 0.4, 0.3]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for temperature in [1e-38, 5e-39, 1e-40, f32::MIN_POSITIVE / 1e6] {
            let sharp = probs.with_temperature(temperature).unwrap();
            assert_eq!(sharp[1], 1.0, "T = {:e}", temperature);
            assert_eq!(probs.sample_with_temperature(temperature, &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn high_temperature_flattens() {
        let probs = Probabilities::new(array![0.05, 0.15, 0.8]).unwrap();
        let flat = probs.with_temperature(100.0).unwrap();
        for p in flat.iter() {
            assert!((p - 1.0 / 3.0).abs() < 0.02);
        }
    }

    #[test]
    fn zero_probability_is_never_sampled() {
        let probs = Probabilities::new(array![0.0, 0.5, 0.5]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for t in [0.5, 1.0, 3.0] {
            for _ in 0..100 {
                assert_ne!(probs.sample_with_temperature(t, &mut rng).unwrap(), 0);
            }
        }
    }

    #[test]
    fn invalid_temperatures_are_rejected() {
        let probs = Probabilities::new(array![0.5, 0.5]).unwrap();
        for t in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = probs.with_temperature(t).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidTemperature);
        }
    }

    #[test]
    fn invalid_distributions_are_rejected() {
        assert!(Probabilities::new(Array1::zeros(0)).is_err());
        assert!(Probabilities::new(array![0.0, 0.0]).is_err());
        assert!(Probabilities::new(array![0.5, f32::NAN]).is_err());
        assert!(Probabilities::new(array![1.5, -0.5]).is_err());
    }

    #[test]
    fn sampling_is_seed_deterministic() {
        let probs = Probabilities::new(array![0.25, 0.25, 0.25, 0.25]).unwrap();
        let draw = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| probs.sample(&mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(3), draw(3));
    }

    #[test]
    fn argmax_picks_lowest_on_ties() {
        let probs = Probabilities::new(array![0.4, 0.4, 0.2]).unwrap();
        assert_eq!(probs.argmax(), 0);
    }
}
