// Raw data layout
pub const EVENT_SIZE_TO_MINIBUFFER_SIZE: i32 = 4; // Eventsize branch -> samples per minibuffer
pub const CARD_CLOCK_PERIOD_NS: u64 = 8; // VME card clock is 125 MHz
pub const NS_PER_SECOND: i64 = 1_000_000_000;

// Digitizer calibration
pub const NS_PER_SAMPLE: u64 = 2; // 500 MHz sampling
pub const ADC_TO_VOLT: f64 = 2.415 / 4096.0; // 12-bit ADC over a 2.415 V range
pub const ADC_INPUT_IMPEDANCE: f64 = 50.0; // Ohm

// ZE3RA baseline
pub const NUM_BASELINE_SAMPLES: usize = 25; // samples taken from the front of each minibuffer
pub const Q_CRITICAL: f64 = 1e-4; // F-test probability separating consistent pairs

// Pulse finding
pub const DEFAULT_PULSE_THRESHOLD: f64 = 7.0; // ADC counts above baseline
pub const DEFAULT_MIN_PULSE_WIDTH: usize = 1; // samples
pub const DEFAULT_MIN_PULSE_SEPARATION: usize = 0; // samples

// Water tank topology
pub const TANK_CARDS: [u32; 15] = [3, 4, 5, 6, 8, 9, 10, 11, 13, 14, 15, 16, 18, 19, 20];
pub const NON_TANK_CHANNELS: [(u32, u32); 4] = [(4, 1), (8, 2), (14, 0), (18, 0)];

// Event selection
pub const VETO_TIME: f64 = 1e3; // ns
pub const TANK_CHARGE_WINDOW_LENGTH: u64 = 40; // ns
pub const UNIQUE_WATER_PMT_CUT: usize = 8; // PMTs
pub const TANK_CHARGE_CUT: f64 = 3.0; // nC
pub const COINCIDENCE_TOLERANCE: u64 = 40; // ns
pub const NCV_TRIGGER_PMT: (u32, u32) = (4, 1);
pub const NCV_COINCIDENCE_PMT: (u32, u32) = (18, 0);
