use serde::{Deserialize, Serialize};

use super::constants::{NON_TANK_CHANNELS, TANK_CARDS};

/// Which VME channels read out PMTs in the water tank.
///
/// Every channel of a tank card counts, except for the listed (card, channel) pairs which
/// carry other instrumentation (neutron capture volume PMTs, trigger inputs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TankTopology {
    pub tank_cards: Vec<u32>,
    pub excluded_channels: Vec<(u32, u32)>,
}

impl Default for TankTopology {
    fn default() -> Self {
        Self {
            tank_cards: TANK_CARDS.to_vec(),
            excluded_channels: NON_TANK_CHANNELS.to_vec(),
        }
    }
}

impl TankTopology {
    pub fn is_tank_channel(&self, card: u32, channel: u32) -> bool {
        self.tank_cards.contains(&card) && !self.excluded_channels.contains(&(card, channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topology() {
        let topology = TankTopology::default();
        assert_eq!(topology.tank_cards.len(), 15);
        assert!(topology.is_tank_channel(3, 0));
        assert!(topology.is_tank_channel(4, 0));
        assert!(topology.is_tank_channel(20, 3));
        // Excluded instrumentation on tank cards
        assert!(!topology.is_tank_channel(4, 1));
        assert!(!topology.is_tank_channel(8, 2));
        assert!(!topology.is_tank_channel(14, 0));
        assert!(!topology.is_tank_channel(18, 0));
        // Cards outside the tank
        assert!(!topology.is_tank_channel(7, 0));
        assert!(!topology.is_tank_channel(21, 0));
    }
}
