use crate::{Measurement, QuantumState, errors::StateError};
use rand::Rng;
use std::collections::HashMap;

/// Outcome histogram of a multi-shot sampling run.
#[derive(Debug, Clone, PartialEq)]
pub struct Counts {
    /// Number of hits per projector index
    pub counts: Vec<usize>,
    /// Outcome value associated with each index
    pub values: Vec<f64>,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Relative frequency of outcome `index`.
    pub fn frequency(&self, index: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.counts.get(index).copied().unwrap_or(0) as f64 / total as f64
    }

    /// Counts keyed by the printed outcome value, omitting outcomes never seen.
    pub fn by_value(&self) -> HashMap<String, usize> {
        self.counts
            .iter()
            .zip(&self.values)
            .filter(|&(&count, _)| count > 0)
            .map(|(&count, value)| (value.to_string(), count))
            .collect()
    }
}

/// Statistical characterization of a state without disturbing it.
///
/// Every shot is an independent copy of the state, so the state handed to
/// [`Sampler::run`] is never collapsed. Optional white noise can be mixed
/// into the copy before the Born probabilities are taken.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    /// Probability of replacing the copy by the maximally mixed state.
    pub depolarization: Option<f64>,
}

impl Sampler {
    /// Creates a new `Sampler` instance with no noise.
    pub fn new() -> Self {
        Self {
            depolarization: None,
        }
    }

    /// Sets the white-noise probability applied before sampling.
    pub fn with_depolarization(mut self, p: f64) -> Self {
        self.depolarization = Some(p);
        self
    }

    /// Samples `num_shots` outcomes of `measurement` over the whole state.
    pub fn run<R: Rng + ?Sized>(
        &self,
        state: &QuantumState,
        measurement: &Measurement,
        num_shots: usize,
        rng: &mut R,
    ) -> Result<Counts, StateError> {
        let probs = match self.depolarization {
            Some(p) => {
                let mut copy = state.clone();
                copy.mix_with_identity(p)?;
                copy.probabilities(measurement)?
            }
            None => state.probabilities(measurement)?,
        };

        Ok(Counts {
            counts: Self::sample_indices(&probs, num_shots, rng),
            values: measurement.values.clone(),
        })
    }

    /// Draws `num_shots` indices from a categorical distribution.
    pub fn sample_indices<R: Rng + ?Sized>(
        probs: &[f64],
        num_shots: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        // Cumulative distribution computed once
        let cdf: Vec<f64> = probs
            .iter()
            .scan(0.0, |acc, &p| {
                *acc += p;
                Some(*acc)
            })
            .collect();

        let mut raw_counts = vec![0usize; probs.len()];
        if raw_counts.is_empty() {
            return raw_counts;
        }
        let fallback = last_possible(probs);
        for _ in 0..num_shots {
            raw_counts[pick_from_cdf(&cdf, rng.random(), fallback)] += 1;
        }
        raw_counts
    }

    /// Single categorical draw.
    pub fn sample_index<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
        let roll: f64 = rng.random();
        let mut cumulative = 0.0;
        for (i, &p) in probs.iter().enumerate() {
            cumulative += p;
            if roll < cumulative {
                return i;
            }
        }
        last_possible(probs)
    }
}

/// Last outcome with nonzero probability.
fn last_possible(probs: &[f64]) -> usize {
    probs
        .iter()
        .rposition(|&p| p > 0.0)
        .unwrap_or(probs.len().saturating_sub(1))
}

fn pick_from_cdf(cdf: &[f64], roll: f64, fallback: usize) -> usize {
    // Rounding can leave the last entry a hair under 1.0
    cdf.iter().position(|&c| roll < c).unwrap_or(fallback)
}
