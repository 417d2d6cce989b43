/// Contents of the TrigData table for a single SequenceID.
///
/// Recorded by the trigger card alongside the PMT data; each readout carries at most one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTrigData {
    pub sequence_id: i32,
    pub firmware_version: i32,
    pub fifo_overflow: bool,
    pub driver_overflow: bool,
    pub event_ids: Vec<u16>,
    pub event_times: Vec<u64>,
    pub trigger_masks: Vec<u32>,
    pub trigger_counters: Vec<u32>,
}

impl RawTrigData {
    pub fn event_size(&self) -> usize {
        self.event_ids.len()
    }

    pub fn trigger_size(&self) -> usize {
        self.trigger_masks.len()
    }

    /// True if either the FIFO or the driver reported an overflow for this readout
    pub fn overflowed(&self) -> bool {
        self.fifo_overflow || self.driver_overflow
    }
}
