use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RawChannelError {
    #[error("Minibuffer {0} requested from a RawChannel with only {1} minibuffers")]
    MinibufferOutOfRange(usize, usize),
    #[error("ADC sample {0} does not fit in a RawChannel")]
    SampleOutOfRange(u16),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RawCardError {
    #[error("Mismatch between number of channels ({channels}) and channel buffer size ({buffer_size}) for a card buffer of length {data_length}")]
    ChannelCountMismatch {
        channels: i32,
        buffer_size: i32,
        data_length: usize,
    },
    #[error("Mismatch between number of minibuffers ({0}) and the number of trigger counts ({1})")]
    MinibufferCountMismatch(usize, usize),
    #[error("Invalid channel buffer size {0} found in RawCard")]
    BadBufferSize(i32),
    #[error("Invalid minibuffer size {0} found in RawCard")]
    BadMinibufferSize(i32),
    #[error("Eventsize {0} is too large for a RawCard minibuffer")]
    BadEventSize(i32),
    #[error("Channel waveform of {0} samples cannot be split evenly into {1} minibuffers")]
    UnevenMinibuffers(usize, usize),
    #[error("Missing data for channel {0} in RawCard buffer")]
    MissingData(u32),
    #[error("Missing rate for channel {0} in RawCard")]
    MissingRate(u32),
    #[error("RawChannel overwrite attempted for channel {0}")]
    ChannelOverwrite(u32),
    #[error("RawCard has no channel {0}")]
    BadChannel(u32),
    #[error("RawCard has no minibuffer {0}")]
    BadMinibuffer(usize),
    #[error("RawCard failed due to RawChannel error: {0}")]
    ChannelError(#[from] RawChannelError),
    #[error("RawCard start time could not be converted to a date: {0}")]
    BadStartTime(#[from] time::error::ComponentRange),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RawReadoutError {
    #[error("RawCard overwrite attempted for card {0}")]
    CardOverwrite(u32),
    #[error("A RawReadout was given a card with a mismatched SequenceID -- Given: {0} Expected: {1}")]
    MismatchedSequenceID(i32, i32),
    #[error("RawReadout has no card {0}")]
    BadCard(u32),
    #[error("RawReadout failed due to RawCard error: {0}")]
    CardError(#[from] RawCardError),
}

#[derive(Debug, Error)]
pub enum RawReaderError {
    #[error("RawReader failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Could not open raw data file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Negative {0} value {1} encountered in PMTData entry {2}")]
    NegativeSize(&'static str, i64, usize),
    #[error("PMTData column {0} has {1} entries; expected {2}")]
    ColumnLengthMismatch(&'static str, usize, usize),
    #[error("PMTData column {0} is too short to hold the data of entry {1}")]
    TruncatedColumn(&'static str, usize),
    #[error("PMTData entry {0} requested from a table with {1} entries")]
    BadEntry(usize, usize),
    #[error("RawReader failed due to RawReadout error: {0}")]
    ReadoutError(#[from] RawReadoutError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecoReadoutError {
    #[error("No pulses stored for card {0}, channel {1}, minibuffer {2}")]
    MissingPulses(u32, u32, usize),
    #[error("No baseline stored for card {0}, channel {1}")]
    MissingBaseline(u32, u32),
}

#[derive(Debug, Error)]
pub enum HDF5WriterError {
    #[error("HDF5Writer failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("HDF5Writer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("HDF5Writer failed to write the file info YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("HDF5Writer failed to encode the format version: {0}")]
    StringError(#[from] hdf5::types::StringError),
    #[error("HDF5Writer could not determine the parent directory of {0:?}")]
    BadOutputPath(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to RawReader error: {0}")]
    ReaderError(#[from] RawReaderError),
    #[error("Processor failed due to RawChannel error: {0}")]
    ChannelError(#[from] RawChannelError),
    #[error("Processor failed due to RecoReadout error: {0}")]
    RecoError(#[from] RecoReadoutError),
    #[error("Processor failed due to HDF5Writer error: {0}")]
    HDFError(#[from] HDF5WriterError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
