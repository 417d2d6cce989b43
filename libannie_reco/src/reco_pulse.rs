/// A pulse reconstructed from the raw waveform of one minibuffer
#[derive(Debug, Clone, PartialEq)]
pub struct RecoPulse {
    start_time: u64,
    amplitude: f64,
    charge: f64,
    raw_amplitude: u16,
}

impl RecoPulse {
    pub fn new(start_time: u64, amplitude: f64, charge: f64, raw_amplitude: u16) -> Self {
        Self {
            start_time,
            amplitude,
            charge,
            raw_amplitude,
        }
    }

    /// Start of the pulse in ns, relative to the start of its minibuffer
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Peak height above baseline in V
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Integrated charge in nC
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Peak ADC counts, baseline included
    pub fn raw_amplitude(&self) -> u16 {
        self.raw_amplitude
    }
}
