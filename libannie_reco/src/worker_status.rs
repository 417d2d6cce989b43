/// Progress bar color; cyan while a run is being reconstructed, green once it is done
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BarColor {
    #[default]
    CYAN,
    GREEN,
}

impl BarColor {
    /// Name of the color as understood by indicatif templates
    pub fn style_name(&self) -> &'static str {
        match self {
            Self::CYAN => "cyan",
            Self::GREEN => "green",
        }
    }
}

/// Progress message sent from a worker to whatever is displaying it
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub run_number: i32,
    pub worker_id: usize,
    pub color: BarColor,
}

impl WorkerStatus {
    pub fn new(progress: f32, run_number: i32, worker_id: usize, color: BarColor) -> Self {
        Self {
            progress,
            run_number,
            worker_id,
            color,
        }
    }
}
