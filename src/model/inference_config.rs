//! モデルメタデータから推論に必要な情報を取り出す

use std::collections::HashSet;

use crate::error::ModelLoadError;
use crate::model::model_metadata::ModelMetadata;
use crate::types::Category;

/// 推論設定
///
/// メタデータの検証済みの形。ラベルは5カテゴリをちょうど1回ずつ含みます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    /// 出力スロット順のカテゴリ
    pub labels: Vec<Category>,

    /// モデル入力解像度
    pub model_input_size: u32,
}

impl InferenceConfig {
    /// メタデータからInferenceConfigを作成
    pub fn from_metadata(metadata: &ModelMetadata) -> Result<Self, ModelLoadError> {
        let labels = metadata
            .labels
            .iter()
            .map(|l| Category::canonicalize(l))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ModelLoadError::Incompatible(e.to_string()))?;

        let distinct: HashSet<_> = labels.iter().collect();
        if labels.len() != Category::ALL.len() || distinct.len() != labels.len() {
            return Err(ModelLoadError::Incompatible(format!(
                "ラベルは5カテゴリを1回ずつ含む必要があります: [{}]",
                metadata.labels.join(", ")
            )));
        }

        if metadata.model_input_size == 0 {
            return Err(ModelLoadError::Incompatible("入力サイズが0です".to_string()));
        }

        Ok(Self {
            labels,
            model_input_size: metadata.model_input_size,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    /// クラスインデックスからカテゴリを取得
    pub fn class_index_to_label(&self, index: usize) -> Option<Category> {
        self.labels.get(index).copied()
    }

    /// カテゴリからクラスインデックスを取得
    pub fn label_to_index(&self, category: Category) -> Option<usize> {
        self.labels.iter().position(|l| *l == category)
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            labels: Category::MODEL_ORDER.to_vec(),
            model_input_size: crate::ml::preprocess::IMAGE_SIZE,
        }
    }
}
