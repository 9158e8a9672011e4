use shared::{Category, DISCLAIMER, PredictionResponse};
use uuid::Uuid;

use crate::catalog::{self, LabelError};
use crate::inference::fallback::FallbackGenerator;
use crate::inference::model::{InferenceError, ModelProvider};
use crate::inference::preprocess::{ImageNormalizer, NormalizeError};

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("no image provided")]
    MissingImage,
    #[error(transparent)]
    Decode(#[from] NormalizeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Label(#[from] LabelError),
}

impl PredictError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::MissingImage)
    }
}

/// Validates a request, runs it through the model (or the fallback generator
/// when none is loaded) and shapes the response.
pub struct PredictionService {
    provider: ModelProvider,
    fallback: FallbackGenerator,
    normalizer: ImageNormalizer,
}

impl PredictionService {
    pub fn new(
        provider: ModelProvider,
        fallback: FallbackGenerator,
        normalizer: ImageNormalizer,
    ) -> Self {
        Self {
            provider,
            fallback,
            normalizer,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.provider.is_loaded()
    }

    pub fn predict(
        &self,
        category: Option<&str>,
        image: &[u8],
    ) -> Result<PredictionResponse, PredictError> {
        if image.is_empty() {
            return Err(PredictError::MissingImage);
        }
        let category = Category::from_request_value(category);
        let request_id = Uuid::new_v4();

        let tensor = self.normalizer.normalize(image)?;
        let (prediction, mode) = match self.provider.handle() {
            Some(handle) => (handle.predict(&tensor)?, "model"),
            None => (self.fallback.generate(), "fallback"),
        };
        let condition = catalog::label_at(category, prediction.class_index)?;

        log::info!(
            "prediction {} category={} condition={:?} confidence={:.3} mode={}",
            request_id,
            category,
            condition,
            prediction.confidence,
            mode
        );

        Ok(PredictionResponse {
            condition: condition.to_string(),
            confidence: prediction.confidence,
            explanation: DISCLAIMER.to_string(),
        })
    }
}
