use serde::{Deserialize, Serialize};

use super::constants::{
    ADC_INPUT_IMPEDANCE, ADC_TO_VOLT, DEFAULT_MIN_PULSE_SEPARATION, DEFAULT_MIN_PULSE_WIDTH,
    DEFAULT_PULSE_THRESHOLD, NS_PER_SAMPLE,
};
use super::error::RawChannelError;
use super::raw_channel::RawChannel;
use super::reco_pulse::RecoPulse;

/// Strategy for turning the samples of a single minibuffer into reconstructed pulses.
///
/// Implementors only ever see one minibuffer at a time, so no pulse can span a
/// minibuffer boundary.
pub trait PulseFinder {
    fn find_pulses(&self, samples: &[i16], baseline: f64) -> Vec<RecoPulse>;

    /// Run the finder over every minibuffer of a channel, in order
    fn find_channel_pulses(
        &self,
        channel: &RawChannel,
        baseline: f64,
    ) -> Result<Vec<Vec<RecoPulse>>, RawChannelError> {
        let mut pulses = Vec::with_capacity(channel.num_minibuffers());
        for mb in 0..channel.num_minibuffers() {
            pulses.push(self.find_pulses(channel.minibuffer(mb)?, baseline));
        }
        Ok(pulses)
    }
}

/// Finds contiguous excursions above a fixed threshold.
///
/// A pulse starts at the first sample more than `threshold` ADC counts above the baseline
/// and ends at the first sample that falls back to or below it. Excursions narrower than
/// `min_width` samples are dropped. Two excursions separated by fewer than
/// `min_separation` samples are merged into one pulse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdPulseFinder {
    pub threshold: f64,
    pub min_width: usize,
    pub min_separation: usize,
}

impl Default for ThresholdPulseFinder {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_PULSE_THRESHOLD,
            min_width: DEFAULT_MIN_PULSE_WIDTH,
            min_separation: DEFAULT_MIN_PULSE_SEPARATION,
        }
    }
}

impl ThresholdPulseFinder {
    /// Sample index ranges `[start, end)` of the above-threshold excursions, after merging
    fn excursions(&self, samples: &[i16], baseline: f64) -> Vec<(usize, usize)> {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        let mut open: Option<usize> = None;

        let above = |s: i16| s as f64 - baseline > self.threshold;
        for (idx, sample) in samples.iter().enumerate() {
            match (open, above(*sample)) {
                (None, true) => open = Some(idx),
                (Some(start), false) => {
                    ranges.push((start, idx));
                    open = None;
                }
                _ => (),
            }
        }
        if let Some(start) = open {
            // Closed by the end of the minibuffer
            ranges.push((start, samples.len()));
        }

        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start - last.1 < self.min_separation => last.1 = end,
                _ => merged.push((start, end)),
            }
        }

        merged.retain(|(start, end)| end - start >= self.min_width);
        merged
    }
}

impl PulseFinder for ThresholdPulseFinder {
    fn find_pulses(&self, samples: &[i16], baseline: f64) -> Vec<RecoPulse> {
        self.excursions(samples, baseline)
            .into_iter()
            .map(|(start, end)| {
                let region = &samples[start..end];
                let peak = region.iter().copied().max().unwrap_or_default();
                let area: f64 = region.iter().map(|s| *s as f64 - baseline).sum();
                RecoPulse::new(
                    start as u64 * NS_PER_SAMPLE,
                    (peak as f64 - baseline) * ADC_TO_VOLT,
                    area * ADC_TO_VOLT * NS_PER_SAMPLE as f64 / ADC_INPUT_IMPEDANCE,
                    peak.max(0) as u16,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn finder(threshold: f64, min_width: usize, min_separation: usize) -> ThresholdPulseFinder {
        ThresholdPulseFinder {
            threshold,
            min_width,
            min_separation,
        }
    }

    #[test]
    fn test_zero_data() {
        assert!(ThresholdPulseFinder::default()
            .find_pulses(&[], 300.0)
            .is_empty());
    }

    #[test]
    fn test_single_pulse() {
        let samples = [300, 301, 299, 310, 340, 320, 305, 300, 301];
        let pulses = finder(7.0, 1, 0).find_pulses(&samples, 300.0);
        assert_eq!(pulses.len(), 1);
        let pulse = &pulses[0];
        assert_eq!(pulse.start_time(), 3 * NS_PER_SAMPLE);
        assert_eq!(pulse.raw_amplitude(), 340);
        assert_approx_eq!(pulse.amplitude(), 40.0 * ADC_TO_VOLT);
        // Samples 310, 340, 320 are above threshold
        let area = 10.0 + 40.0 + 20.0;
        assert_approx_eq!(
            pulse.charge(),
            area * ADC_TO_VOLT * NS_PER_SAMPLE as f64 / ADC_INPUT_IMPEDANCE
        );
    }

    #[test]
    fn test_multiple_pulses_in_order() {
        let samples = [300, 320, 300, 300, 330, 330, 300, 300, 300, 350];
        let pulses = finder(7.0, 1, 0).find_pulses(&samples, 300.0);
        let starts: Vec<u64> = pulses.iter().map(|p| p.start_time()).collect();
        assert_eq!(starts, vec![2, 8, 18]);
        // The last pulse is closed by the end of the minibuffer
        assert_eq!(pulses[2].raw_amplitude(), 350);
    }

    #[test]
    fn test_min_separation_merges() {
        let samples = [300, 320, 300, 330, 300, 300, 300, 340];
        let pulses = finder(7.0, 1, 2).find_pulses(&samples, 300.0);
        let starts: Vec<u64> = pulses.iter().map(|p| p.start_time()).collect();
        // Gap of one sample merges, gap of three does not
        assert_eq!(starts, vec![2, 14]);
        assert_eq!(pulses[0].raw_amplitude(), 330);
    }

    #[test]
    fn test_min_width_drops_spikes() {
        let samples = [300, 320, 300, 330, 335, 300];
        let pulses = finder(7.0, 2, 0).find_pulses(&samples, 300.0);
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].start_time(), 6);
    }

    #[test]
    fn test_no_merge_across_minibuffers() {
        // The excursion straddles the boundary between the two minibuffers
        let samples: Vec<u16> = vec![300, 300, 300, 350, 350, 300, 300, 300];
        let channel = match RawChannel::new(0, &samples, 0, 2) {
            Ok(c) => c,
            Err(_) => panic!(),
        };
        let pulses = match finder(7.0, 1, 10).find_channel_pulses(&channel, 300.0) {
            Ok(p) => p,
            Err(_) => panic!(),
        };
        assert_eq!(pulses.len(), 2);
        assert_eq!(pulses[0].len(), 1);
        assert_eq!(pulses[0][0].start_time(), 6);
        assert_eq!(pulses[1].len(), 1);
        assert_eq!(pulses[1][0].start_time(), 0);
    }
}
