//! アプリケーション設定管理モジュール
//!
//! 計算デバイスやモデル、推論ワーカー、スコアリングの設定をJSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::BadgeTableError;
use crate::ml::preprocess::IMAGE_SIZE;
use crate::scoring::{BadgeTier, BadgeTierTable, ScoringEngine, POINTS_PER_ITEM};

/// 計算デバイスの種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DeviceType {
    /// WGPU (GPU) バックエンド
    Wgpu,
    /// NdArray (CPU) バックエンド
    #[default]
    Cpu,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
        }
    }
}

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// 使用するモデルファイル（tar.gz）のパス
    pub model_path: String,
    /// モデル入力サイズ（メタデータに記録が無い場合に使用）
    pub input_size: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: "models/eco_sort_model.tar.gz".to_string(),
            input_size: IMAGE_SIZE,
        }
    }
}

/// 推論ワーカー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceSettings {
    /// 1リクエストあたりのタイムアウト（ミリ秒）
    pub timeout_ms: u64,
    /// ワーカーの待ち行列の長さ
    pub queue_capacity: usize,
}

impl InferenceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            queue_capacity: 32,
        }
    }
}

/// スコアリング設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// 1件あたりのポイント
    pub points_per_item: u64,
    /// バッジ表（未指定なら既定の表）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_tiers: Option<Vec<BadgeTier>>,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            points_per_item: POINTS_PER_ITEM,
            badge_tiers: None,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// 計算デバイスの種類
    pub device_type: DeviceType,
    /// モデル設定
    pub model: ModelSettings,
    /// 推論ワーカー設定
    #[serde(default)]
    pub inference: InferenceSettings,
    /// スコアリング設定
    #[serde(default)]
    pub scoring: ScoringSettings,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 指定パスから設定を読み込む、存在しない・読めない場合はデフォルト設定を返す
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    info!("設定ファイルを読み込みました: {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "設定ファイルの読み込みに失敗しました ({}): {}。デフォルト設定を使用します",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            }
        } else {
            info!("設定ファイルが存在しません。デフォルト設定を使用します");
            Self::default()
        }
    }

    /// デフォルトパスから設定を読み込む
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(Self::default_path())
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// モデルパスを設定
    pub fn set_model_path(&mut self, path: String) {
        self.model.model_path = path;
    }

    /// 設定で唯一のバッジ表を作る
    pub fn badge_table(&self) -> Result<BadgeTierTable, BadgeTableError> {
        match &self.scoring.badge_tiers {
            Some(tiers) => BadgeTierTable::new(tiers.clone()),
            None => Ok(BadgeTierTable::default()),
        }
    }

    /// 設定からスコアリングエンジンを作る
    pub fn scoring_engine(&self) -> Result<ScoringEngine, BadgeTableError> {
        Ok(ScoringEngine::new(self.badge_table()?, self.scoring.points_per_item))
    }

    /// 設定情報を表示
    pub fn display(&self) {
        println!("=== アプリケーション設定 ===");
        println!("計算デバイス: {}", self.device_type);
        println!("モデルパス: {}", self.model.model_path);
        println!("入力サイズ: {}x{}", self.model.input_size, self.model.input_size);
        println!("推論タイムアウト: {}ms", self.inference.timeout_ms);
        println!("待ち行列: {}", self.inference.queue_capacity);
        println!("1件あたりのポイント: {}", self.scoring.points_per_item);
        println!(
            "バッジ表: {}",
            if self.scoring.badge_tiers.is_some() { "カスタム" } else { "既定" }
        );
        println!("========================\n");
    }
}
