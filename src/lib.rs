//! プラスチック樹脂の画像分類と、リサイクル実績のポイント・バッジ管理
//!
//! - `ml`: 画像の前処理、モデル推論、推論ワーカー
//! - `model`: モデルアーカイブ、推論設定、アプリケーション設定
//! - `scoring`: バッジ表、進捗レコードの遷移、保存層との境界
//! - `catalog`: カテゴリごとの表示用メタデータ

pub mod types;
pub mod error;
pub mod catalog;
pub mod ml;
pub mod model;
pub mod scoring;

pub use types::{Category, UserId};
pub use error::{
    BadgeTableError, ClassifyError, DecodeError, InferenceError, InvalidCategoryError,
    ModelLoadError, ProgressError, ScoringError, StoreError,
};
pub use catalog::{CategoryMetadata, LabelCatalog, Recyclable};
pub use ml::{ClassificationEngine, ClassificationResult, ImagePreprocessor, ImageTensor, InferenceWorker, ScoreModel};
pub use model::AppConfig;
pub use scoring::{BadgeTier, BadgeTierTable, ProgressReport, ScoringEngine, ScoringService, UserProgress};
