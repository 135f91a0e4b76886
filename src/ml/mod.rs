pub mod preprocess;
pub mod inference;
pub mod worker;
#[cfg(feature = "ml")]
pub mod ml_model;

pub use preprocess::{ImagePreprocessor, ImageTensor, IMAGE_SIZE};
pub use inference::{ClassificationEngine, ClassificationResult, ScoreModel};
pub use worker::InferenceWorker;
#[cfg(feature = "ml")]
pub use ml_model::{
    open_score_model, BurnScoreModel, ModelConfig, ResinClassifier, MIN_INPUT_SIZE, NUM_CLASSES,
};
