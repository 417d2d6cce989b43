use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::baseline::Ze3raBaseline;
use super::error::ConfigError;
use super::pulse_finder::ThresholdPulseFinder;
use super::selection::EventSelection;
use super::topology::TankTopology;

/// Structure representing the application configuration. Contains pathing, run information
/// and the parameters of the reconstruction.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub raw_path: PathBuf,
    pub reco_path: PathBuf,
    pub first_run_number: i32,
    pub last_run_number: i32,
    pub n_threads: i32,
    /// (card, channel) pairs to reconstruct. If None every channel is reconstructed
    #[serde(default)]
    pub channels: Option<Vec<(u32, u32)>>,
    #[serde(default)]
    pub baseline: Ze3raBaseline,
    #[serde(default)]
    pub pulse_finder: ThresholdPulseFinder,
    #[serde(default)]
    pub topology: TankTopology,
    #[serde(default)]
    pub selection: EventSelection,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("None"),
            reco_path: PathBuf::from("None"),
            first_run_number: 0,
            last_run_number: 0,
            n_threads: 1,
            channels: None,
            baseline: Ze3raBaseline::default(),
            pulse_finder: ThresholdPulseFinder::default(),
            topology: TankTopology::default(),
            selection: EventSelection::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check if a specific run exists by evaluating the existance of the raw data file
    pub fn does_run_exist(&self, run_number: i32) -> bool {
        self.get_raw_file_name(run_number).exists()
    }

    /// Get the path to the raw hdf5 file of a run
    pub fn get_raw_file_name(&self, run_number: i32) -> PathBuf {
        self.raw_path.join(format!("RAWDataR{run_number}.h5"))
    }

    /// Get the path to the output hdf5 file
    pub fn get_reco_file_name(&self, run_number: i32) -> Result<PathBuf, ConfigError> {
        let reco_file_path: PathBuf = self.reco_path.join(format!("recoR{run_number}.h5"));
        if self.reco_path.exists() {
            Ok(reco_file_path)
        } else {
            Err(ConfigError::BadFilePath(self.reco_path.clone()))
        }
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }

    /// Check if a channel should be reconstructed
    pub fn is_channel_selected(&self, card: u32, channel: u32) -> bool {
        match &self.channels {
            Some(list) => list.contains(&(card, channel)),
            None => true,
        }
    }
}
