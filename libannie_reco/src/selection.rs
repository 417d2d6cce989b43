use serde::{Deserialize, Serialize};

use super::constants::{
    COINCIDENCE_TOLERANCE, NCV_COINCIDENCE_PMT, NCV_TRIGGER_PMT, TANK_CHARGE_CUT,
    TANK_CHARGE_WINDOW_LENGTH, UNIQUE_WATER_PMT_CUT, VETO_TIME,
};
use super::error::RecoReadoutError;
use super::reco_pulse::RecoPulse;
use super::reco_readout::RecoReadout;
use super::topology::TankTopology;

/// Cuts used to pick neutron capture candidates out of a reconstructed readout.
///
/// Candidates are pulses on the trigger PMT. A candidate is kept when it is outside the
/// veto window of the previously kept candidate, the tank is quiet around it, and the
/// coincidence PMT fired at nearly the same time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventSelection {
    /// ns after a kept candidate during which new candidates are rejected
    pub veto_time: f64,
    /// ns after the candidate over which tank charge is summed
    pub tank_charge_window: u64,
    pub unique_pmt_cut: usize,
    /// nC
    pub tank_charge_cut: f64,
    /// ns
    pub coincidence_tolerance: u64,
    pub trigger_pmt: (u32, u32),
    pub coincidence_pmt: (u32, u32),
}

impl Default for EventSelection {
    fn default() -> Self {
        Self {
            veto_time: VETO_TIME,
            tank_charge_window: TANK_CHARGE_WINDOW_LENGTH,
            unique_pmt_cut: UNIQUE_WATER_PMT_CUT,
            tank_charge_cut: TANK_CHARGE_CUT,
            coincidence_tolerance: COINCIDENCE_TOLERANCE,
            trigger_pmt: NCV_TRIGGER_PMT,
            coincidence_pmt: NCV_COINCIDENCE_PMT,
        }
    }
}

impl EventSelection {
    /// Apply the cuts to a single trigger PMT pulse.
    ///
    /// `last_accepted` is the time of the previously kept candidate, or `f64::MIN` if
    /// there is none.
    pub fn approve_event(
        &self,
        pulse: &RecoPulse,
        last_accepted: f64,
        readout: &RecoReadout,
        topology: &TankTopology,
        minibuffer: usize,
    ) -> Result<bool, RecoReadoutError> {
        let event_time = pulse.start_time() as f64;
        if event_time <= last_accepted + self.veto_time {
            return Ok(false);
        }

        let window_start = pulse.start_time();
        let (tank_charge, n_pmts) = readout.tank_charge(
            topology,
            minibuffer,
            window_start,
            window_start + self.tank_charge_window,
        );
        if n_pmts >= self.unique_pmt_cut || tank_charge >= self.tank_charge_cut {
            return Ok(false);
        }

        let (card, channel) = self.coincidence_pmt;
        readout.has_coincidence(
            card,
            channel,
            minibuffer,
            pulse.start_time(),
            self.coincidence_tolerance,
        )
    }

    /// Walk the trigger PMT pulses of a minibuffer and return the ones passing the cuts
    pub fn select_events<'a>(
        &self,
        readout: &'a RecoReadout,
        topology: &TankTopology,
        minibuffer: usize,
    ) -> Result<Vec<&'a RecoPulse>, RecoReadoutError> {
        let (card, channel) = self.trigger_pmt;
        let mut last_accepted = f64::MIN;
        let mut accepted = Vec::new();
        for pulse in readout.get_pulses(card, channel, minibuffer)? {
            if self.approve_event(pulse, last_accepted, readout, topology, minibuffer)? {
                last_accepted = pulse.start_time() as f64;
                accepted.push(pulse);
            }
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(start_time: u64, charge: f64) -> RecoPulse {
        RecoPulse::new(start_time, 0.05, charge, 350)
    }

    fn make_readout() -> RecoReadout {
        let mut readout = RecoReadout::new(1);
        readout.add_pulses(
            4,
            1,
            0,
            vec![
                pulse(1000, 0.1),  // accepted
                pulse(1500, 0.1),  // vetoed by the first
                pulse(3000, 0.1),  // no coincidence
                pulse(5000, 0.1),  // too much tank charge
                pulse(7000, 0.1),  // too many tank PMTs
                pulse(9000, 0.1),  // accepted
                pulse(9900, 0.1),  // vetoed by the previous
            ],
        );
        readout.add_pulses(
            18,
            0,
            0,
            vec![
                pulse(1010, 0.1),
                pulse(1490, 0.1),
                pulse(3100, 0.1),
                pulse(4990, 0.1),
                pulse(7005, 0.1),
                pulse(8965, 0.1),
                pulse(9900, 0.1),
            ],
        );
        // A bright tank flash at 5000 ns
        readout.add_pulses(3, 0, 0, vec![pulse(5010, 4.0)]);
        // Many dim tank PMTs at 7000 ns; (8, 2) is not a tank PMT
        for card in [3, 5, 6, 8] {
            for channel in 1..4 {
                readout.add_pulses(card, channel, 0, vec![pulse(7020, 0.01)]);
            }
        }
        readout
    }

    #[test]
    fn test_select_events() {
        let readout = make_readout();
        let selection = EventSelection::default();
        let accepted = match selection.select_events(&readout, &TankTopology::default(), 0) {
            Ok(a) => a,
            Err(e) => panic!("{e}"),
        };
        let times: Vec<u64> = accepted.iter().map(|p| p.start_time()).collect();
        assert_eq!(times, vec![1000, 9000]);
    }

    #[test]
    fn test_approve_event_cuts() {
        let readout = make_readout();
        let selection = EventSelection::default();
        let topology = TankTopology::default();
        let approve = |t: u64, last: f64| {
            match selection.approve_event(&pulse(t, 0.1), last, &readout, &topology, 0) {
                Ok(b) => b,
                Err(_) => panic!(),
            }
        };
        assert!(approve(1000, f64::MIN));
        // Veto boundary is inclusive
        assert!(!approve(2000, 1000.0));
        assert!(!approve(5000, f64::MIN));
        assert!(!approve(7000, f64::MIN));
        assert!(!approve(3000, f64::MIN));
    }

    #[test]
    fn test_missing_trigger_pmt() {
        let readout = RecoReadout::new(0);
        let selection = EventSelection::default();
        assert_eq!(
            selection.select_events(&readout, &TankTopology::default(), 0),
            Err(RecoReadoutError::MissingPulses(4, 1, 0))
        );
    }
}
