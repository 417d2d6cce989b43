use hdf5::types::VarLenUnicode;
use hdf5::File;
use ndarray::Array2;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::HDF5WriterError;
use super::hdf_reader::PmtDataFile;
use super::reco_readout::RecoReadout;

const READOUTS_NAME: &str = "readouts";
const PULSES_NAME: &str = "pulses";
const BASELINES_NAME: &str = "baselines";

const PULSE_COLUMNS: usize = 7;
const BASELINE_COLUMNS: usize = 4;

// Readout counters start from 0
const START_READOUT_NUMBER: u64 = 0;
/// This is the version of the output format
const FORMAT_VERSION: &str = "1.0";

/// A simple struct which wraps around the hdf5-rust library.
///
/// Opens an HDF5 file for writing reconstructed readouts.
#[derive(Debug)]
pub struct HDFWriter {
    #[allow(dead_code)]
    file_handle: File,
    parent_file_path: PathBuf,
    readouts_group: hdf5::Group,
    last_readout: u64,
    n_readouts: u64,
    n_pulses: u64,
}
// Structure
// readouts - min_readout, max_readout, version
// |---- readout_#  - sequence_id
// |    |---- pulses(dset) - rows of card, channel, minibuffer, start_time, amplitude, charge, raw_amplitude
// |    |---- baselines(dset) - rows of card, channel, mean, sigma

impl HDFWriter {
    /// Create the writer, opening a file at path and creating the data groups
    pub fn new(path: &Path) -> Result<Self, HDF5WriterError> {
        let parent = path
            .parent()
            .ok_or_else(|| HDF5WriterError::BadOutputPath(path.to_path_buf()))?;
        let stem = path
            .file_stem()
            .ok_or_else(|| HDF5WriterError::BadOutputPath(path.to_path_buf()))?;
        let parent_file_path = parent.join(format!("{}.yml", stem.to_string_lossy()));

        let file_handle = File::create(path)?;
        let reco_version = format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION);

        let readouts_group = file_handle.create_group(READOUTS_NAME)?;
        readouts_group.new_attr::<u64>().create("min_readout")?;
        readouts_group.new_attr::<u64>().create("max_readout")?;
        readouts_group
            .new_attr::<VarLenUnicode>()
            .create("version")?
            .write_scalar(&VarLenUnicode::from_str(&reco_version)?)?;

        Ok(Self {
            file_handle,
            parent_file_path,
            readouts_group,
            last_readout: START_READOUT_NUMBER,
            n_readouts: 0,
            n_pulses: 0,
        })
    }

    /// Write a readout, where the pulses and baselines are converted into data matrices
    pub fn write_readout(
        &mut self,
        readout: &RecoReadout,
        readout_counter: &u64,
    ) -> Result<(), HDF5WriterError> {
        if *readout_counter > self.last_readout {
            self.last_readout = *readout_counter;
        }
        self.n_readouts += 1;

        let readout_group = self
            .readouts_group
            .create_group(&format!("readout_{}", readout_counter))?;
        readout_group
            .new_attr::<i32>()
            .create("sequence_id")?
            .write_scalar(&readout.sequence_id())?;

        let n_pulses = readout.n_pulses();
        self.n_pulses += n_pulses as u64;
        let mut pulse_matrix = Array2::<f64>::zeros([n_pulses, PULSE_COLUMNS]);
        let mut row = 0;
        for (key, pulses) in readout.pulses().iter() {
            for pulse in pulses.iter() {
                pulse_matrix[[row, 0]] = key.card as f64;
                pulse_matrix[[row, 1]] = key.channel as f64;
                pulse_matrix[[row, 2]] = key.minibuffer as f64;
                pulse_matrix[[row, 3]] = pulse.start_time() as f64;
                pulse_matrix[[row, 4]] = pulse.amplitude();
                pulse_matrix[[row, 5]] = pulse.charge();
                pulse_matrix[[row, 6]] = pulse.raw_amplitude() as f64;
                row += 1;
            }
        }
        readout_group
            .new_dataset_builder()
            .with_data(&pulse_matrix)
            .create(PULSES_NAME)?;

        let baselines = readout.baselines();
        let mut baseline_matrix = Array2::<f64>::zeros([baselines.len(), BASELINE_COLUMNS]);
        for (row, ((card, channel), baseline)) in baselines.iter().enumerate() {
            baseline_matrix[[row, 0]] = *card as f64;
            baseline_matrix[[row, 1]] = *channel as f64;
            baseline_matrix[[row, 2]] = baseline.mean;
            baseline_matrix[[row, 3]] = baseline.sigma;
        }
        readout_group
            .new_dataset_builder()
            .with_data(&baseline_matrix)
            .create(BASELINES_NAME)?;

        Ok(())
    }

    /// Write raw file information in a separate yaml file
    pub fn write_fileinfo(&self, source: &PmtDataFile) -> Result<(), HDF5WriterError> {
        let mut file_map = BTreeMap::<String, String>::new();
        file_map.insert(
            String::from("raw_file_name"),
            source.path().to_string_lossy().to_string(),
        );
        file_map.insert(
            String::from("raw_file_size"),
            human_bytes::human_bytes(source.size_bytes() as f64),
        );
        file_map.insert(
            String::from("raw_entries"),
            source.sequence_ids().len().to_string(),
        );
        file_map.insert(
            String::from("has_trig_data"),
            source.has_trig_data().to_string(),
        );

        let mut parent_file = std::fs::File::create(&self.parent_file_path)?;
        parent_file.write_all(serde_yaml::to_string(&file_map)?.as_bytes())?;

        Ok(())
    }

    /// Write meta information on first and last readouts, consume the writer
    pub fn close(self) -> Result<(), HDF5WriterError> {
        self.readouts_group
            .attr("min_readout")?
            .write_scalar(&START_READOUT_NUMBER)?;
        self.readouts_group
            .attr("max_readout")?
            .write_scalar(&self.last_readout)?;
        log::info!(
            "{} readouts written containing {} pulses.",
            self.n_readouts,
            self.n_pulses
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::Baseline;
    use crate::reco_pulse::RecoPulse;

    #[test]
    fn test_write_readouts() {
        let path = std::env::temp_dir().join("annie_reco_test_write_readouts.h5");
        let mut writer = match HDFWriter::new(&path) {
            Ok(w) => w,
            Err(e) => panic!("{e}"),
        };

        let mut readout = RecoReadout::new(42);
        readout.add_pulses(3, 1, 0, vec![RecoPulse::new(10, 0.5, 1.5, 320)]);
        readout.add_pulses(4, 0, 1, vec![RecoPulse::new(20, 0.25, 0.75, 310)]);
        readout.add_baseline(
            3,
            1,
            Baseline {
                mean: 300.0,
                sigma: 1.5,
                accepted_minibuffers: vec![0, 1],
                fallback: false,
            },
        );
        for counter in 0..2 {
            if let Err(e) = writer.write_readout(&readout, &counter) {
                panic!("{e}");
            }
        }
        if let Err(e) = writer.close() {
            panic!("{e}");
        }

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => panic!("{e}"),
        };
        let group = match file.group(READOUTS_NAME) {
            Ok(g) => g,
            Err(e) => panic!("{e}"),
        };
        match group.attr("max_readout").and_then(|a| a.read_scalar::<u64>()) {
            Ok(max) => assert_eq!(max, 1),
            Err(e) => panic!("{e}"),
        }
        match group
            .attr("version")
            .and_then(|a| a.read_scalar::<VarLenUnicode>())
        {
            Ok(version) => assert!(version.as_str().ends_with(FORMAT_VERSION)),
            Err(e) => panic!("{e}"),
        }

        let pulses = match group
            .dataset("readout_1/pulses")
            .and_then(|d| d.read_2d::<f64>())
        {
            Ok(p) => p,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(pulses.shape(), &[2, PULSE_COLUMNS]);
        assert_eq!(pulses[[0, 0]], 3.0);
        assert_eq!(pulses[[1, 2]], 1.0);
        assert_eq!(pulses[[1, 3]], 20.0);
        assert_eq!(pulses[[0, 6]], 320.0);

        let baselines = match group
            .dataset("readout_0/baselines")
            .and_then(|d| d.read_2d::<f64>())
        {
            Ok(b) => b,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(baselines.shape(), &[1, BASELINE_COLUMNS]);
        assert_eq!(baselines[[0, 2]], 300.0);

        let _ = std::fs::remove_file(path);
    }
}
