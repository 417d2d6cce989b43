//! # annie_reco
//!
//! annie_reco is the ANNIE raw-waveform reconstruction, written in Rust. It takes the raw
//! data produced by the ANNIE water Cherenkov DAQ (one row of digitizer data per VME card
//! per readout) and turns it into reconstructed pulses, stored in the HDF5 format.
//!
//! ## Installation
//!
//! Currently the only method of install is from source.
//!
//! ### HDF5
//!
//! The hdf5 bindings are built with the `static` feature, which compiles and links a copy
//! of the HDF5 library. No system install of HDF5 is needed, but the first build takes
//! a while.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./annie_reco_cli` from the top
//! level annie_reco repository. To use the CLI see the `annie_reco_cli` README.
//!
//! ## Reconstruction
//!
//! Each readout goes through the following steps:
//!
//! - The rows of the PMTData table sharing a SequenceID are merged into a
//! [RawReadout](raw_readout::RawReadout) by the [RawReader](raw_reader::RawReader).
//! - Each card buffer is de-interleaved into [RawChannels](raw_channel::RawChannel), each
//! split into equal length minibuffers.
//! - The baseline of each channel is estimated with the ZE3RA method
//! ([Ze3raBaseline](baseline::Ze3raBaseline)), which drops minibuffers whose early samples
//! are inconsistent with their neighbours.
//! - Pulses are found in every minibuffer by a [PulseFinder](pulse_finder::PulseFinder) and
//! stored in a [RecoReadout](reco_readout::RecoReadout), which also computes the tank
//! charge and coincidence queries used by the [EventSelection](selection::EventSelection).
//!
//! ## Configuration
//!
//! The YAML format of a configuration file is as follows:
//!
//! ```yml
//! raw_path: /path/to/raw/
//! reco_path: /path/to/reco/
//! first_run_number: 0
//! last_run_number: 0
//! n_threads: 1
//! channels: null
//! baseline:
//!   num_samples: 25
//!   q_critical: 0.0001
//! pulse_finder:
//!   threshold: 7.0
//!   min_width: 1
//!   min_separation: 0
//! ```
//!
//! Raw files are expected at `raw_path/RAWDataR#.h5` and reconstructed files are written
//! to `reco_path/recoR#.h5`. If `channels` is null every channel is reconstructed,
//! otherwise it is a list of `[card, channel]` pairs. The `baseline`, `pulse_finder`,
//! `topology` and `selection` sections can be left out to use the defaults.
//!
//! ## Output
//!
//! ### HDF5 Data Format
//!
//! The data format used in the HDF5 data is as follows:
//!
//! ```text
//! recoR1.h5
//! readouts - min_readout, max_readout, version
//! |---- readout_#  - sequence_id
//! |    |---- pulses(dset)
//! |    |---- baselines(dset)
//! ```
//!
//! Each row of `pulses` is card, channel, minibuffer, start time (ns), amplitude (V),
//! charge (nC), raw amplitude (ADC). Each row of `baselines` is card, channel, mean, sigma.
//! A `recoR#.yml` file next to the data records which raw file it came from.
pub mod baseline;
pub mod config;
pub mod constants;
pub mod error;
pub mod hdf_reader;
pub mod hdf_writer;
pub mod math;
pub mod pmt_data;
pub mod process;
pub mod pulse_finder;
pub mod raw_card;
pub mod raw_channel;
pub mod raw_reader;
pub mod raw_readout;
pub mod raw_trig_data;
pub mod reco_pulse;
pub mod reco_readout;
pub mod selection;
pub mod topology;
pub mod worker_status;
