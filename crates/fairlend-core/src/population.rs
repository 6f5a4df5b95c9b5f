use core::fmt;

use serde::{Deserialize, Serialize};

use crate::model::item::{Item, Label};

/// Integer score buckets emitted by the generator, 0..SCORE_BUCKETS.
pub const SCORE_BUCKETS: u32 = 100;

/// One Gaussian-shaped slice of a population: `count` items with the
/// given category and outcome, scores tracking a normal curve around
/// `mean`. A group is usually two specs concatenated: positives
/// around a high mean and negatives around a low one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationSpec {
    pub category: u8,
    pub outcome: Label,
    pub count: u32,
    pub mean: f64,
    pub std_dev: f64,
}

impl PopulationSpec {
    pub fn validate(&self) -> Result<(), PopulationError> {
        if self.count == 0 {
            return Err(PopulationError::EmptyCount);
        }
        if !self.mean.is_finite() {
            return Err(PopulationError::InvalidMean(self.mean));
        }
        if !self.std_dev.is_finite() || self.std_dev <= 0.0 {
            return Err(PopulationError::InvalidStdDev(self.std_dev));
        }
        Ok(())
    }
}

/// Generate items whose scores have a "deterministic normal"
/// distribution: each integer score bucket emits the expected Gaussian
/// mass rounded down, carrying the fractional remainder into the next
/// bucket so the full mass is preserved without any sampling.
pub fn normal_items(spec: &PopulationSpec) -> Result<Vec<Item>, PopulationError> {
    spec.validate()?;

    let n = f64::from(spec.count);
    let norm = spec.std_dev * (2.0 * std::f64::consts::PI).sqrt();

    let mut items = Vec::with_capacity(spec.count as usize);
    let mut error = 0.0f64;
    for score in 0..SCORE_BUCKETS {
        let x = f64::from(score);
        let delta = x - spec.mean;
        let density = (-delta * delta / (2.0 * spec.std_dev * spec.std_dev)).exp() / norm;
        let expected = error + n * density;
        let emit = expected.floor();
        error = expected - emit;

        for _ in 0..emit as u32 {
            items.push(Item::new(spec.category, spec.outcome, x));
        }
    }

    Ok(items)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PopulationError {
    EmptyCount,
    InvalidMean(f64),
    InvalidStdDev(f64),
}

impl fmt::Display for PopulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationError::EmptyCount => write!(f, "population count must be greater than zero"),
            PopulationError::InvalidMean(mean) => {
                write!(f, "population mean must be finite, got {mean}")
            }
            PopulationError::InvalidStdDev(std_dev) => write!(
                f,
                "population standard deviation must be finite and positive, got {std_dev}"
            ),
        }
    }
}

impl std::error::Error for PopulationError {}
