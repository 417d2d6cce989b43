use fxhash::FxHashSet;
use std::collections::BTreeMap;

use super::baseline::Baseline;
use super::error::RecoReadoutError;
use super::reco_pulse::RecoPulse;
use super::topology::TankTopology;

/// Identifies the pulses found in one minibuffer of one channel.
///
/// Ordering is card, then channel, then minibuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PulseKey {
    pub card: u32,
    pub channel: u32,
    pub minibuffer: usize,
}

impl PulseKey {
    pub fn new(card: u32, channel: u32, minibuffer: usize) -> Self {
        Self {
            card,
            channel,
            minibuffer,
        }
    }
}

/// The reconstructed pulses of a single readout, along with the baseline of each channel.
///
/// Pulses for a key are kept in the order they were added. Asking for a key which was
/// never populated is an error rather than an empty list; reconstruction stores an entry
/// (possibly empty) for every minibuffer of every channel it processes.
#[derive(Debug, Clone, Default)]
pub struct RecoReadout {
    sequence_id: i32,
    pulses: BTreeMap<PulseKey, Vec<RecoPulse>>,
    baselines: BTreeMap<(u32, u32), Baseline>,
}

impl RecoReadout {
    pub fn new(sequence_id: i32) -> Self {
        Self {
            sequence_id,
            pulses: BTreeMap::new(),
            baselines: BTreeMap::new(),
        }
    }

    pub fn sequence_id(&self) -> i32 {
        self.sequence_id
    }

    /// Append a single pulse to a key, creating the key if needed
    pub fn add_pulse(&mut self, card: u32, channel: u32, minibuffer: usize, pulse: RecoPulse) {
        self.pulses
            .entry(PulseKey::new(card, channel, minibuffer))
            .or_default()
            .push(pulse);
    }

    /// Append a batch of pulses to a key, creating the key if needed
    pub fn add_pulses(
        &mut self,
        card: u32,
        channel: u32,
        minibuffer: usize,
        pulses: Vec<RecoPulse>,
    ) {
        self.pulses
            .entry(PulseKey::new(card, channel, minibuffer))
            .or_default()
            .extend(pulses);
    }

    pub fn get_pulses(
        &self,
        card: u32,
        channel: u32,
        minibuffer: usize,
    ) -> Result<&[RecoPulse], RecoReadoutError> {
        match self.pulses.get(&PulseKey::new(card, channel, minibuffer)) {
            Some(pulses) => Ok(pulses),
            None => Err(RecoReadoutError::MissingPulses(card, channel, minibuffer)),
        }
    }

    pub fn pulses(&self) -> &BTreeMap<PulseKey, Vec<RecoPulse>> {
        &self.pulses
    }

    /// Total number of pulses over all keys
    pub fn n_pulses(&self) -> usize {
        self.pulses.values().map(|p| p.len()).sum()
    }

    pub fn add_baseline(&mut self, card: u32, channel: u32, baseline: Baseline) {
        self.baselines.insert((card, channel), baseline);
    }

    pub fn baseline(&self, card: u32, channel: u32) -> Result<&Baseline, RecoReadoutError> {
        self.baselines
            .get(&(card, channel))
            .ok_or(RecoReadoutError::MissingBaseline(card, channel))
    }

    pub fn baselines(&self) -> &BTreeMap<(u32, u32), Baseline> {
        &self.baselines
    }

    /// Sum the charge (nC) of tank PMT pulses in a minibuffer starting within
    /// `[window_start, window_end)` ns.
    ///
    /// Also returns the number of distinct tank PMTs which contributed at least one pulse.
    pub fn tank_charge(
        &self,
        topology: &TankTopology,
        minibuffer: usize,
        window_start: u64,
        window_end: u64,
    ) -> (f64, usize) {
        let mut charge = 0.0;
        let mut unique_pmts = FxHashSet::default();
        for (key, pulses) in self.pulses.iter() {
            if key.minibuffer != minibuffer || !topology.is_tank_channel(key.card, key.channel) {
                continue;
            }
            for pulse in pulses
                .iter()
                .filter(|p| p.start_time() >= window_start && p.start_time() < window_end)
            {
                charge += pulse.charge();
                unique_pmts.insert((key.card, key.channel));
            }
        }
        (charge, unique_pmts.len())
    }

    /// Check if a channel has a pulse starting within `tolerance` ns of `time`
    pub fn has_coincidence(
        &self,
        card: u32,
        channel: u32,
        minibuffer: usize,
        time: u64,
        tolerance: u64,
    ) -> Result<bool, RecoReadoutError> {
        Ok(self
            .get_pulses(card, channel, minibuffer)?
            .iter()
            .any(|p| p.start_time().abs_diff(time) < tolerance))
    }
}
