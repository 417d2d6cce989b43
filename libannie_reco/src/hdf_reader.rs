use fxhash::FxHashMap;
use hdf5::{Dataset, File, Group, H5Type};
use ndarray::s;
use std::path::{Path, PathBuf};

use super::error::RawReaderError;
use super::pmt_data::{PmtDataEntry, PmtDataTable};
use super::raw_trig_data::RawTrigData;

const PMT_DATA_NAME: &str = "PMTData";
const TRIG_DATA_NAME: &str = "TrigData";

// Structure
// PMTData
// |---- SequenceID, CardID, LastSync, StartTimeSec, StartTimeNSec, StartCount,
// |     Channels, BufferSize, Eventsize, TriggerNumber, FullBufferSize (one value per row)
// |---- Data (FullBufferSize values per row, flattened)
// |---- TriggerCounts (TriggerNumber values per row, flattened)
// |---- Rates (Channels values per row, flattened)
// TrigData (optional)
// |---- SequenceID, FirmwareVersion, EventSize, TriggerSize, FIFOOverflow,
// |     DriverOverflow (one value per row)
// |---- EventIDs, EventTimes (EventSize values per row, flattened)
// |---- TriggerMasks, TriggerCounters (TriggerSize values per row, flattened)

/// Read a per-row column, checking that it has the expected number of rows
fn read_column<T: H5Type>(
    group: &Group,
    name: &'static str,
    n_rows: usize,
) -> Result<Vec<T>, RawReaderError> {
    let column = group.dataset(name)?.read_raw::<T>()?;
    if column.len() != n_rows {
        return Err(RawReaderError::ColumnLengthMismatch(
            name,
            column.len(),
            n_rows,
        ));
    }
    Ok(column)
}

/// Turn per-row sizes into offsets into a flattened column.
///
/// The returned vector has one more element than `sizes`; the last is the total.
fn compute_offsets(sizes: &[i32], name: &'static str) -> Result<Vec<usize>, RawReaderError> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    let mut total: usize = 0;
    offsets.push(total);
    for (row, size) in sizes.iter().enumerate() {
        if *size < 0 {
            return Err(RawReaderError::NegativeSize(name, *size as i64, row));
        }
        total += *size as usize;
        offsets.push(total);
    }
    Ok(offsets)
}

/// Check that a flattened column holds everything the offsets point at
fn check_flat_column(
    dataset: &Dataset,
    name: &'static str,
    offsets: &[usize],
) -> Result<(), RawReaderError> {
    let total = offsets.last().copied().unwrap_or(0);
    if dataset.size() < total {
        // Find the first row which runs off the end
        let row = offsets
            .windows(2)
            .position(|w| w[1] > dataset.size())
            .unwrap_or(0);
        return Err(RawReaderError::TruncatedColumn(name, row));
    }
    Ok(())
}

/// Read the range `[start, stop)` of a flattened column
fn read_range<T: H5Type + Clone>(
    dataset: &Dataset,
    start: usize,
    stop: usize,
) -> Result<Vec<T>, RawReaderError> {
    if start == stop {
        return Ok(Vec::new());
    }
    Ok(dataset.read_slice_1d::<T, _>(s![start..stop])?.to_vec())
}

/// The TrigData group of a raw file, indexed by SequenceID
#[derive(Debug)]
struct TrigDataColumns {
    rows: FxHashMap<i32, usize>,
    firmware_versions: Vec<i32>,
    fifo_overflows: Vec<i32>,
    driver_overflows: Vec<i32>,
    event_offsets: Vec<usize>,
    trigger_offsets: Vec<usize>,
    event_ids: Dataset,
    event_times: Dataset,
    trigger_masks: Dataset,
    trigger_counters: Dataset,
}

impl TrigDataColumns {
    fn new(group: &Group) -> Result<Self, RawReaderError> {
        let sequence_ids = group.dataset("SequenceID")?.read_raw::<i32>()?;
        let n_rows = sequence_ids.len();
        let firmware_versions = read_column::<i32>(group, "FirmwareVersion", n_rows)?;
        let fifo_overflows = read_column::<i32>(group, "FIFOOverflow", n_rows)?;
        let driver_overflows = read_column::<i32>(group, "DriverOverflow", n_rows)?;
        let event_offsets =
            compute_offsets(&read_column::<i32>(group, "EventSize", n_rows)?, "EventSize")?;
        let trigger_offsets = compute_offsets(
            &read_column::<i32>(group, "TriggerSize", n_rows)?,
            "TriggerSize",
        )?;

        let event_ids = group.dataset("EventIDs")?;
        let event_times = group.dataset("EventTimes")?;
        let trigger_masks = group.dataset("TriggerMasks")?;
        let trigger_counters = group.dataset("TriggerCounters")?;
        check_flat_column(&event_ids, "EventIDs", &event_offsets)?;
        check_flat_column(&event_times, "EventTimes", &event_offsets)?;
        check_flat_column(&trigger_masks, "TriggerMasks", &trigger_offsets)?;
        check_flat_column(&trigger_counters, "TriggerCounters", &trigger_offsets)?;

        let mut rows = FxHashMap::default();
        for (row, sequence_id) in sequence_ids.iter().enumerate() {
            if rows.insert(*sequence_id, row).is_some() {
                log::warn!("TrigData has more than one row for SequenceID {sequence_id}; using the last one.");
            }
        }

        Ok(Self {
            rows,
            firmware_versions,
            fifo_overflows,
            driver_overflows,
            event_offsets,
            trigger_offsets,
            event_ids,
            event_times,
            trigger_masks,
            trigger_counters,
        })
    }

    fn read(&self, sequence_id: i32) -> Result<Option<RawTrigData>, RawReaderError> {
        let row = match self.rows.get(&sequence_id) {
            Some(row) => *row,
            None => return Ok(None),
        };
        let (ev_start, ev_stop) = (self.event_offsets[row], self.event_offsets[row + 1]);
        let (tr_start, tr_stop) = (self.trigger_offsets[row], self.trigger_offsets[row + 1]);
        Ok(Some(RawTrigData {
            sequence_id,
            firmware_version: self.firmware_versions[row],
            fifo_overflow: self.fifo_overflows[row] != 0,
            driver_overflow: self.driver_overflows[row] != 0,
            event_ids: read_range(&self.event_ids, ev_start, ev_stop)?,
            event_times: read_range(&self.event_times, ev_start, ev_stop)?,
            trigger_masks: read_range(&self.trigger_masks, tr_start, tr_stop)?,
            trigger_counters: read_range(&self.trigger_counters, tr_start, tr_stop)?,
        }))
    }
}

/// A raw ANNIE data file in HDF5 format.
///
/// The per-row scalar columns are loaded when the file is opened. The large flattened
/// columns (waveform data, trigger counts, rates) are read one row at a time.
#[derive(Debug)]
pub struct PmtDataFile {
    #[allow(dead_code)]
    file_handle: File,
    path: PathBuf,
    size_bytes: u64,
    sequence_ids: Vec<i32>,
    card_ids: Vec<i32>,
    last_syncs: Vec<u64>,
    start_time_secs: Vec<i32>,
    start_time_nsecs: Vec<i32>,
    start_counts: Vec<u64>,
    channels: Vec<i32>,
    buffer_sizes: Vec<i32>,
    event_sizes: Vec<i32>,
    data_offsets: Vec<usize>,
    trigger_offsets: Vec<usize>,
    rate_offsets: Vec<usize>,
    data: Dataset,
    trigger_counts: Dataset,
    rates: Dataset,
    trig_data: Option<TrigDataColumns>,
}

impl PmtDataFile {
    /// Open a raw file and load the row index
    pub fn open(path: &Path) -> Result<Self, RawReaderError> {
        if !path.exists() {
            return Err(RawReaderError::BadFilePath(path.to_path_buf()));
        }
        let size_bytes = path.metadata().map(|m| m.len()).unwrap_or(0);
        let file_handle = File::open(path)?;
        let group = file_handle.group(PMT_DATA_NAME)?;

        let sequence_ids = group.dataset("SequenceID")?.read_raw::<i32>()?;
        let n_rows = sequence_ids.len();
        let card_ids = read_column::<i32>(&group, "CardID", n_rows)?;
        if let Some(row) = card_ids.iter().position(|id| *id < 0) {
            return Err(RawReaderError::NegativeSize(
                "CardID",
                card_ids[row] as i64,
                row,
            ));
        }
        let last_syncs = read_column::<u64>(&group, "LastSync", n_rows)?;
        let start_time_secs = read_column::<i32>(&group, "StartTimeSec", n_rows)?;
        let start_time_nsecs = read_column::<i32>(&group, "StartTimeNSec", n_rows)?;
        let start_counts = read_column::<u64>(&group, "StartCount", n_rows)?;
        let channels = read_column::<i32>(&group, "Channels", n_rows)?;
        let buffer_sizes = read_column::<i32>(&group, "BufferSize", n_rows)?;
        let event_sizes = read_column::<i32>(&group, "Eventsize", n_rows)?;
        let trigger_numbers = read_column::<i32>(&group, "TriggerNumber", n_rows)?;
        let full_buffer_sizes = read_column::<i32>(&group, "FullBufferSize", n_rows)?;

        let data_offsets = compute_offsets(&full_buffer_sizes, "FullBufferSize")?;
        let trigger_offsets = compute_offsets(&trigger_numbers, "TriggerNumber")?;
        let rate_offsets = compute_offsets(&channels, "Channels")?;

        let data = group.dataset("Data")?;
        let trigger_counts = group.dataset("TriggerCounts")?;
        let rates = group.dataset("Rates")?;
        check_flat_column(&data, "Data", &data_offsets)?;
        check_flat_column(&trigger_counts, "TriggerCounts", &trigger_offsets)?;
        check_flat_column(&rates, "Rates", &rate_offsets)?;

        let trig_data = match file_handle.group(TRIG_DATA_NAME) {
            Ok(trig_group) => Some(TrigDataColumns::new(&trig_group)?),
            Err(_) => None,
        };

        log::info!(
            "Opened raw file {} with {} PMTData entries.",
            path.display(),
            n_rows
        );

        Ok(Self {
            file_handle,
            path: path.to_path_buf(),
            size_bytes,
            sequence_ids,
            card_ids,
            last_syncs,
            start_time_secs,
            start_time_nsecs,
            start_counts,
            channels,
            buffer_sizes,
            event_sizes,
            data_offsets,
            trigger_offsets,
            rate_offsets,
            data,
            trigger_counts,
            rates,
            trig_data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// SequenceID of every row, in file order
    pub fn sequence_ids(&self) -> &[i32] {
        &self.sequence_ids
    }

    pub fn has_trig_data(&self) -> bool {
        self.trig_data.is_some()
    }

    fn check_entry(&self, entry: usize) -> Result<(), RawReaderError> {
        if entry >= self.sequence_ids.len() {
            Err(RawReaderError::BadEntry(entry, self.sequence_ids.len()))
        } else {
            Ok(())
        }
    }
}

impl PmtDataTable for PmtDataFile {
    fn n_entries(&self) -> usize {
        self.sequence_ids.len()
    }

    fn sequence_id(&self, entry: usize) -> Result<i32, RawReaderError> {
        self.check_entry(entry)?;
        Ok(self.sequence_ids[entry])
    }

    fn read_entry(&self, entry: usize) -> Result<PmtDataEntry, RawReaderError> {
        self.check_entry(entry)?;
        Ok(PmtDataEntry {
            sequence_id: self.sequence_ids[entry],
            card_id: self.card_ids[entry] as u32,
            last_sync: self.last_syncs[entry],
            start_time_sec: self.start_time_secs[entry],
            start_time_nsec: self.start_time_nsecs[entry],
            start_count: self.start_counts[entry],
            channels: self.channels[entry],
            buffer_size: self.buffer_sizes[entry],
            event_size: self.event_sizes[entry],
            data: read_range(
                &self.data,
                self.data_offsets[entry],
                self.data_offsets[entry + 1],
            )?,
            trigger_counts: read_range(
                &self.trigger_counts,
                self.trigger_offsets[entry],
                self.trigger_offsets[entry + 1],
            )?,
            rates: read_range(
                &self.rates,
                self.rate_offsets[entry],
                self.rate_offsets[entry + 1],
            )?,
        })
    }

    fn trig_data(&self, sequence_id: i32) -> Result<Option<RawTrigData>, RawReaderError> {
        match &self.trig_data {
            Some(columns) => columns.read(sequence_id),
            None => Ok(None),
        }
    }
}
