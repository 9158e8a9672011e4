use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::CLASS_COUNT;
use crate::config::ModelConfig;
use crate::inference::preprocess::ImageTensor;

/// Tolerance when deciding whether an output vector already sums to one.
const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no model artifact at {0}")]
    ArtifactMissing(PathBuf),
    #[error("binary was built without a model runtime (enable the `torch` feature)")]
    RuntimeUnavailable,
    #[error("failed to load model from {path}: {reason}")]
    #[cfg_attr(not(feature = "torch"), allow(dead_code))]
    Load { path: PathBuf, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model runtime error: {0}")]
    #[cfg_attr(not(feature = "torch"), allow(dead_code))]
    Backend(String),
    #[error("model produced {actual} outputs, expected {expected}")]
    ClassCount { expected: usize, actual: usize },
    #[error("model produced a non-finite output")]
    NonFinite,
}

/// Something that maps an image tensor to one score per class.
pub trait Classifier: Send + Sync {
    fn probabilities(&self, tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    pub confidence: f32,
}

/// Read-only handle to a loaded classifier. Cloning shares the same model.
#[derive(Clone)]
pub struct ModelHandle {
    classifier: Arc<dyn Classifier>,
    source: PathBuf,
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl ModelHandle {
    pub fn new(classifier: Arc<dyn Classifier>, source: impl Into<PathBuf>) -> Self {
        Self {
            classifier,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn predict(&self, tensor: &ImageTensor) -> Result<Prediction, InferenceError> {
        let scores = self.classifier.probabilities(tensor)?;
        prediction_from_scores(&scores)
    }
}

/// Arg-max over the class scores. Raw logits are passed through softmax first
/// so the reported confidence is always a probability.
pub fn prediction_from_scores(scores: &[f32]) -> Result<Prediction, InferenceError> {
    if scores.len() != CLASS_COUNT {
        return Err(InferenceError::ClassCount {
            expected: CLASS_COUNT,
            actual: scores.len(),
        });
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(InferenceError::NonFinite);
    }

    let probabilities = if is_probability_vector(scores) {
        scores.to_vec()
    } else {
        softmax(scores)
    };

    // First maximum wins on ties.
    let (class_index, confidence) = probabilities.iter().copied().enumerate().fold(
        (0, f32::NEG_INFINITY),
        |best, (i, p)| if p > best.1 { (i, p) } else { best },
    );
    Ok(Prediction {
        class_index,
        confidence: confidence.clamp(0.0, 1.0),
    })
}

fn is_probability_vector(scores: &[f32]) -> bool {
    scores.iter().all(|s| (0.0..=1.0).contains(s))
        && (scores.iter().sum::<f32>() - 1.0).abs() <= PROBABILITY_SUM_TOLERANCE
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Locates and loads the model artifact. Called once at start-up.
pub fn resolve(config: &ModelConfig) -> Result<ModelHandle, LoadError> {
    let path = &config.path;
    if !path.is_file() {
        return Err(LoadError::ArtifactMissing(path.clone()));
    }
    load_classifier(config).map(|classifier| ModelHandle::new(classifier, path.clone()))
}

#[cfg(feature = "torch")]
fn load_classifier(config: &ModelConfig) -> Result<Arc<dyn Classifier>, LoadError> {
    let classifier = super::torch::TorchClassifier::load(&config.path, config.device)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "torch"))]
fn load_classifier(_config: &ModelConfig) -> Result<Arc<dyn Classifier>, LoadError> {
    Err(LoadError::RuntimeUnavailable)
}

/// Owns the start-up resolution outcome for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct ModelProvider {
    handle: Option<ModelHandle>,
}

impl ModelProvider {
    /// Records the outcome of [`resolve`]. A failure puts the process in
    /// fallback mode permanently.
    pub fn from_resolution(resolution: Result<ModelHandle, LoadError>) -> Self {
        match resolution {
            Ok(handle) => {
                log::info!("Loaded model from {}", handle.source().display());
                Self::present(handle)
            }
            Err(e) => {
                log::warn!("{}; running in fallback mode with random predictions", e);
                Self::absent()
            }
        }
    }

    pub fn present(handle: ModelHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn absent() -> Self {
        Self { handle: None }
    }

    pub fn handle(&self) -> Option<&ModelHandle> {
        self.handle.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::Array4;

    /// Returns fixed scores regardless of input.
    pub(crate) struct FixedScores(pub Vec<f32>);

    impl Classifier for FixedScores {
        fn probabilities(&self, _tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    pub(crate) fn handle_with(scores: Vec<f32>) -> ModelHandle {
        ModelHandle::new(Arc::new(FixedScores(scores)), "models/stub.pt")
    }

    fn blank_tensor() -> ImageTensor {
        Array4::zeros((1, 224, 224, 3))
    }

    #[test]
    fn argmax_picks_highest_probability() {
        let prediction = handle_with(vec![0.1, 0.7, 0.2])
            .predict(&blank_tensor())
            .unwrap();
        assert_eq!(prediction.class_index, 1);
        assert!((prediction.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn ties_resolve_to_the_lowest_index() {
        let prediction = prediction_from_scores(&[0.4, 0.4, 0.2]).unwrap();
        assert_eq!(prediction.class_index, 0);
    }

    #[test]
    fn logits_are_softmaxed() {
        let prediction = prediction_from_scores(&[-1.0, 0.5, 3.0]).unwrap();
        assert_eq!(prediction.class_index, 2);
        assert!(prediction.confidence > 0.0 && prediction.confidence < 1.0);

        let expected = 3.0f32.exp() / ((-1.0f32).exp() + 0.5f32.exp() + 3.0f32.exp());
        assert!((prediction.confidence - expected).abs() < 1e-5);
    }

    #[test]
    fn wrong_class_count_is_rejected() {
        let err = handle_with(vec![0.5, 0.5])
            .predict(&blank_tensor())
            .unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ClassCount {
                expected: 3,
                actual: 2
            }
        ));

        let err = prediction_from_scores(&[0.25; 4]).unwrap_err();
        assert!(matches!(err, InferenceError::ClassCount { actual: 4, .. }));
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        assert!(matches!(
            prediction_from_scores(&[f32::NAN, 0.5, 0.5]),
            Err(InferenceError::NonFinite)
        ));
        assert!(matches!(
            prediction_from_scores(&[0.0, f32::INFINITY, 0.0]),
            Err(InferenceError::NonFinite)
        ));
    }

    #[test]
    fn missing_artifact_is_reported() {
        let config = ModelConfig {
            path: PathBuf::from("/nonexistent/model.pt"),
            ..ModelConfig::default()
        };
        assert!(matches!(resolve(&config), Err(LoadError::ArtifactMissing(_))));
    }

    #[cfg(not(feature = "torch"))]
    #[test]
    fn existing_artifact_without_runtime_is_unavailable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = ModelConfig {
            path: file.path().to_path_buf(),
            ..ModelConfig::default()
        };
        assert!(matches!(resolve(&config), Err(LoadError::RuntimeUnavailable)));
    }

    /// Fails the way a runtime error inside the model would.
    struct BrokenRuntime;

    impl Classifier for BrokenRuntime {
        fn probabilities(&self, _tensor: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError::Backend("shape mismatch in layer 3".into()))
        }
    }

    #[test]
    fn runtime_failures_carry_their_cause() {
        let err = ModelHandle::new(Arc::new(BrokenRuntime), "broken.pt")
            .predict(&blank_tensor())
            .unwrap_err();
        assert_eq!(err.to_string(), "model runtime error: shape mismatch in layer 3");

        let err = LoadError::Load {
            path: PathBuf::from("models/model.pt"),
            reason: "not a TorchScript archive".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to load model from models/model.pt: not a TorchScript archive"
        );
        assert!(!ModelProvider::from_resolution(Err(err)).is_loaded());
    }

    #[test]
    fn failed_resolution_leaves_provider_absent() {
        let provider =
            ModelProvider::from_resolution(Err(LoadError::ArtifactMissing("m.pt".into())));
        assert!(!provider.is_loaded());
        assert!(provider.handle().is_none());

        let provider = ModelProvider::from_resolution(Ok(handle_with(vec![1.0, 0.0, 0.0])));
        assert!(provider.is_loaded());
        assert_eq!(
            provider.handle().map(|h| h.source().to_path_buf()),
            Some(PathBuf::from("models/stub.pt"))
        );
    }
}
