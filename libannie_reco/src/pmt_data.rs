use super::constants::EVENT_SIZE_TO_MINIBUFFER_SIZE;
use super::error::RawReaderError;
use super::raw_trig_data::RawTrigData;

/// One row of the PMTData table: the full readout of a single VME card for a single
/// DAQ sequence.
///
/// Several rows share a SequenceID (one per card); the RawReader merges them into a
/// RawReadout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PmtDataEntry {
    pub sequence_id: i32,
    pub card_id: u32,
    pub last_sync: u64,
    pub start_time_sec: i32,
    pub start_time_nsec: i32,
    pub start_count: u64,
    pub channels: i32,
    pub buffer_size: i32,
    pub event_size: i32,
    pub data: Vec<u16>,
    pub trigger_counts: Vec<u64>,
    pub rates: Vec<u32>,
}

impl PmtDataEntry {
    /// Number of samples in a single minibuffer, derived from the Eventsize column.
    /// None if the Eventsize is too large to describe a minibuffer.
    pub fn minibuffer_size(&self) -> Option<i32> {
        self.event_size.checked_mul(EVENT_SIZE_TO_MINIBUFFER_SIZE)
    }
}

/// A table of PMTData rows which can be visited in any order.
///
/// Implemented by an in-memory list of entries and by the HDF5 [PmtDataFile](crate::hdf_reader::PmtDataFile).
pub trait PmtDataTable {
    /// Total number of rows in the table
    fn n_entries(&self) -> usize;

    /// SequenceID of a row without loading its variable length arrays
    fn sequence_id(&self, entry: usize) -> Result<i32, RawReaderError>;

    /// Load a full row
    fn read_entry(&self, entry: usize) -> Result<PmtDataEntry, RawReaderError>;

    /// Trigger record associated with a SequenceID, if the table carries one
    fn trig_data(&self, _sequence_id: i32) -> Result<Option<RawTrigData>, RawReaderError> {
        Ok(None)
    }
}

impl PmtDataTable for Vec<PmtDataEntry> {
    fn n_entries(&self) -> usize {
        self.len()
    }

    fn sequence_id(&self, entry: usize) -> Result<i32, RawReaderError> {
        self.get(entry)
            .map(|e| e.sequence_id)
            .ok_or(RawReaderError::BadEntry(entry, self.len()))
    }

    fn read_entry(&self, entry: usize) -> Result<PmtDataEntry, RawReaderError> {
        self.get(entry)
            .cloned()
            .ok_or(RawReaderError::BadEntry(entry, self.len()))
    }
}
