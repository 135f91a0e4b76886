//! エラー型の定義
//!
//! 分類パイプラインとスコアリングで発生するエラーを種類ごとに分けて定義します。
//! いずれもリクエスト単位で終端し、部分的な結果は返しません。

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::UserId;

/// 画像のデコードエラー
#[derive(Error, Debug)]
pub enum DecodeError {
    /// 画像として読み取れないバイト列
    #[error("画像を読み取れませんでした: {0}")]
    Unreadable(#[from] image::ImageError),

    /// デコード結果が空のフレーム
    #[error("画像が空です: {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },
}

/// モデル読み込みエラー（自動リトライはしない）
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("モデルファイルが見つかりません: {0:?}")]
    NotFound(PathBuf),

    /// アーカイブの展開やメタデータの解析に失敗
    #[error("モデルアーカイブの読み込みエラー: {0}")]
    Artifact(String),

    /// ラベル構成や入力サイズがこのエンジンと互換性がない
    #[error("互換性のないモデルです: {0}")]
    Incompatible(String),

    /// 重みの復元に失敗
    #[error("モデル重みの読み込みエラー: {0}")]
    Weights(String),

    #[error("推論ワーカーの起動に失敗しました: {0}")]
    Worker(String),
}

/// 推論実行時のエラー
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("入力テンソルの形状が不正です: {actual:?} (期待: {expected:?})")]
    InputShape {
        expected: [usize; 4],
        actual: [usize; 4],
    },

    #[error("スコアベクトルの長さが不正です: {actual} (期待: {expected})")]
    OutputWidth { expected: usize, actual: usize },

    #[error("スコアに有限でない値が含まれています (index {index})")]
    NonFinite { index: usize },

    #[error("推論がタイムアウトしました ({0:?})")]
    Timeout(Duration),

    #[error("推論ワーカーが停止しています")]
    WorkerUnavailable,

    #[error("推論バックエンドのエラー: {0}")]
    Backend(String),
}

impl InferenceError {
    /// 一時的な失敗で、1回までのリトライが妥当かどうか
    pub fn is_retryable(&self) -> bool {
        matches!(self, InferenceError::Timeout(_) | InferenceError::WorkerUnavailable)
    }
}

/// 既知の5カテゴリ以外が指定された
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("不明なプラスチック種別です: {value:?} (PET, HDPE, LDPE, PP, PS のいずれか)")]
pub struct InvalidCategoryError {
    value: String,
}

impl InvalidCategoryError {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    /// 指定された元の値
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// 画像1枚の分類処理全体のエラー
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// 進捗レコードの保存層エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("ユーザーが見つかりません: {0}")]
    NotFound(UserId),

    #[error("ユーザーは既に存在します: {0}")]
    AlreadyExists(UserId),

    /// 読み込み後に他の更新が入った（新しい状態で再実行すればよい）
    #[error("進捗レコードの更新が競合しました: {user} (version {expected} -> {actual})")]
    Conflict {
        user: UserId,
        expected: u64,
        actual: u64,
    },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// 保存済みレコードの不整合
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("total_items_recycled ({total}) がカテゴリ別件数の合計 ({sum}) と一致しません")]
    CountMismatch { total: u64, sum: u64 },
    #[error("カテゴリ別件数の合計が上限を超えています")]
    CountOverflow,
}

/// バッジ表の構成エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BadgeTableError {
    #[error("バッジ表が空です")]
    Empty,

    #[error("しきい値が降順になっていません: {previous} の次に {next}")]
    NotDescending { previous: u64, next: u64 },

    #[error("しきい値0のティアがありません (最小: {0})")]
    MissingBaseTier(u64),
}

/// スコアリング境界のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error(transparent)]
    InvalidCategory(#[from] InvalidCategoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScoringError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScoringError::Store(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(InferenceError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!InferenceError::NonFinite { index: 0 }.is_retryable());

        let conflict = ScoringError::from(StoreError::Conflict {
            user: UserId::new("u1"),
            expected: 1,
            actual: 2,
        });
        assert!(conflict.is_retryable());

        let invalid = ScoringError::from(InvalidCategoryError::new("glass"));
        assert!(!invalid.is_retryable());
    }
}
