use std::ops::RangeInclusive;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::CLASS_COUNT;
use crate::config::FallbackConfig;
use crate::inference::model::Prediction;

/// Confidence band reported while no trained model is available.
pub const CONFIDENCE_RANGE: RangeInclusive<f32> = 0.60..=0.95;

/// Random predictions for dummy mode.
///
/// Unseeded generators draw from the thread-local RNG, so concurrent requests
/// share nothing. A seeded generator serializes draws through one `StdRng`
/// to make runs reproducible.
#[derive(Debug, Default)]
pub struct FallbackGenerator {
    seeded: Option<Mutex<StdRng>>,
}

impl FallbackGenerator {
    pub fn from_entropy() -> Self {
        Self { seeded: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn from_config(config: &FallbackConfig) -> Self {
        match config.seed {
            Some(seed) => {
                log::info!("Fallback generator seeded with {}", seed);
                Self::seeded(seed)
            }
            None => Self::from_entropy(),
        }
    }

    pub fn generate(&self) -> Prediction {
        match &self.seeded {
            Some(rng) => {
                // A poisoned lock only means another draw panicked; the RNG state is still usable.
                let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                draw(&mut *rng)
            }
            None => draw(&mut rand::rng()),
        }
    }
}

fn draw<R: Rng>(rng: &mut R) -> Prediction {
    Prediction {
        class_index: rng.random_range(0..CLASS_COUNT),
        confidence: rng.random_range(CONFIDENCE_RANGE),
    }
}
