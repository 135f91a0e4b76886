//! モデルメタデータの定義
//!
//! tar.gz形式でモデルと関連するメタデータを保存・読み込みします。
//!
//! ## 出力の仕様
//! - 出力ベクトルの長さは5、スロット順は `labels` の順
//! - 学習時は各ラベル独立のシグモイド（マルチラベル）だが、推論では argmax で1つに絞る

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ml::preprocess::IMAGE_SIZE;
use crate::types::Category;

/// モデルメタデータ
///
/// tar.gz形式で保存される情報：
/// - metadata.json: このメタデータ（JSON形式）
/// - model.bin: モデルの重み（バイナリ）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// 出力スロット順のラベル
    /// 例: ["HDPE", "LDPE", "PET", "PP", "PS"]
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    /// モデル入力サイズ（正方形、通常224）
    #[serde(default = "default_input_size")]
    pub model_input_size: u32,

    /// 出力の活性化関数（"sigmoid"）
    #[serde(default = "default_activation")]
    pub activation: String,

    /// 説明
    #[serde(default)]
    pub description: String,

    /// モデルの書き出し時刻（ISO8601形式）
    pub trained_at: String,
}

fn default_labels() -> Vec<String> {
    Category::MODEL_ORDER
        .iter()
        .map(|c| c.as_str().to_string())
        .collect()
}

fn default_input_size() -> u32 {
    IMAGE_SIZE
}

fn default_activation() -> String {
    "sigmoid".to_string()
}

impl ModelMetadata {
    /// 新しいメタデータを作成
    pub fn new(labels: Vec<String>, model_input_size: u32, description: impl Into<String>) -> Self {
        let trained_at = chrono::Local::now().to_rfc3339();

        Self {
            labels,
            model_input_size,
            activation: default_activation(),
            description: description.into(),
            trained_at,
        }
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize metadata from JSON")
    }
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self::new(default_labels(), IMAGE_SIZE, "")
    }
}
