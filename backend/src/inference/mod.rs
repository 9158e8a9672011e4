pub mod fallback;
pub mod model;
pub mod preprocess;
pub mod service;
#[cfg(feature = "torch")]
pub mod torch;

pub use fallback::FallbackGenerator;
pub use model::ModelProvider;
pub use preprocess::ImageNormalizer;
pub use service::PredictionService;
