use serde::{Deserialize, Serialize};

use super::constants::{NUM_BASELINE_SAMPLES, Q_CRITICAL};
use super::math::{f_test_probability, mean_and_variance};
use super::raw_channel::RawChannel;

/// The estimated zero-signal level of a channel
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    /// Baseline ADC counts
    pub mean: f64,
    /// Spread of the baseline ADC counts
    pub sigma: f64,
    /// Minibuffers whose statistics entered the estimate
    pub accepted_minibuffers: Vec<usize>,
    /// True if no minibuffer passed the consistency test and the nearest miss was adopted
    pub fallback: bool,
}

/// Baseline estimator taken from the ZE3RA code (see section 2.2 of arXiv:1106.0808).
///
/// The mean and variance of the first `num_samples` samples of each minibuffer are
/// compared between neighbouring minibuffers with an F-test. A minibuffer whose early
/// samples are distorted by a real pulse has a variance inconsistent with its
/// neighbours and is left out of the average.
///
/// The estimator holds no state beyond its parameters and can be shared freely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Ze3raBaseline {
    pub num_samples: usize,
    pub q_critical: f64,
}

impl Default for Ze3raBaseline {
    fn default() -> Self {
        Self {
            num_samples: NUM_BASELINE_SAMPLES,
            q_critical: Q_CRITICAL,
        }
    }
}

impl Ze3raBaseline {
    /// Compute the baseline of a RawChannel
    pub fn estimate(&self, channel: &RawChannel) -> Baseline {
        let stats: Vec<(f64, f64)> = channel
            .minibuffers()
            .map(|mb| mean_and_variance(mb, self.num_samples))
            .collect();
        self.estimate_from_stats(&stats)
    }

    /// Compute a baseline from the per-minibuffer (mean, variance) pairs
    pub fn estimate_from_stats(&self, stats: &[(f64, f64)]) -> Baseline {
        match stats.len() {
            0 => {
                return Baseline {
                    mean: f64::NAN,
                    sigma: f64::NAN,
                    accepted_minibuffers: Vec::new(),
                    fallback: true,
                }
            }
            1 => {
                return Baseline {
                    mean: stats[0].0,
                    sigma: stats[0].1.sqrt(),
                    accepted_minibuffers: vec![0],
                    fallback: false,
                }
            }
            _ => (),
        }

        // F-test probability for each neighbouring pair (j, j + 1)
        let dof = self.num_samples.saturating_sub(1) as f64;
        let qs: Vec<f64> = stats
            .windows(2)
            .map(|pair| f_test_probability(pair[0].1, pair[1].1, dof))
            .collect();

        // A minibuffer is kept if it is consistent with at least one of its neighbours
        let passes = |q: f64| q >= self.q_critical; // false for NaN
        let accepted: Vec<usize> = (0..stats.len())
            .filter(|&mb| {
                (mb > 0 && passes(qs[mb - 1])) || (mb < qs.len() && passes(qs[mb]))
            })
            .collect();

        if !accepted.is_empty() {
            let n_accepted = accepted.len() as f64;
            let mean = accepted.iter().map(|&mb| stats[mb].0).sum::<f64>() / n_accepted;
            let sigma = accepted.iter().map(|&mb| stats[mb].1.sqrt()).sum::<f64>() / n_accepted;
            return Baseline {
                mean,
                sigma,
                accepted_minibuffers: accepted,
                fallback: false,
            };
        }

        // Nothing passed: take the pair closest to passing and adopt its quieter member
        let best_pair = qs
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.is_nan())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let chosen = if stats[best_pair + 1].1 < stats[best_pair].1 {
            best_pair + 1
        } else {
            best_pair
        };
        log::debug!(
            "No minibuffer passed the baseline consistency test; adopting minibuffer {chosen}"
        );
        Baseline {
            mean: stats[chosen].0,
            sigma: stats[chosen].1.sqrt(),
            accepted_minibuffers: vec![chosen],
            fallback: true,
        }
    }
}
