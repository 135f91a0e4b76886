//! モデル推論機能
//!
//! 前処理済みテンソルをモデルに通し、スコアベクトルの argmax を予測ラベルとします。
//! 信頼度はそのスロットの生スコアで、全ラベルで正規化された確率ではありません
//! （モデルはラベルごとのシグモイドで学習されている）。

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{CategoryMetadata, LabelCatalog};
use crate::error::{ClassifyError, InferenceError};
use crate::ml::preprocess::{ImagePreprocessor, ImageTensor};
use crate::model::InferenceConfig;
use crate::types::Category;

/// スコアベクトルを出すモデル
///
/// 実装は読み込み済みのモデルを保持し、`scores` を何度でも呼べる必要があります。
pub trait ScoreModel {
    /// `[1, size, size, 3]` の入力から、ラベルごとのスコアを返す
    fn scores(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

impl<M: ScoreModel + ?Sized> ScoreModel for Box<M> {
    fn scores(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        (**self).scores(input)
    }
}

/// 分類結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: Category,
    pub confidence: f32,
    #[serde(rename = "info")]
    pub metadata: CategoryMetadata,
}

/// 推論エンジン
pub struct ClassificationEngine<M> {
    model: M,
    config: InferenceConfig,
    preprocessor: ImagePreprocessor,
}

impl<M: ScoreModel> ClassificationEngine<M> {
    pub fn new(model: M, config: InferenceConfig) -> Self {
        let preprocessor = ImagePreprocessor::new(config.model_input_size);
        Self {
            model,
            config,
            preprocessor,
        }
    }

    /// テンソルを分類して (ラベル, 信頼度) を返す
    pub fn classify(&self, tensor: &ImageTensor) -> Result<(Category, f32), InferenceError> {
        let expected = self.preprocessor.expected_shape();
        if tensor.shape() != expected {
            return Err(InferenceError::InputShape {
                expected,
                actual: tensor.shape(),
            });
        }

        let scores = self.model.scores(tensor)?;
        if scores.len() != self.config.num_classes() {
            return Err(InferenceError::OutputWidth {
                expected: self.config.num_classes(),
                actual: scores.len(),
            });
        }

        let (index, confidence) = argmax(&scores)?;
        let label = self
            .config
            .class_index_to_label(index)
            .ok_or(InferenceError::OutputWidth {
                expected: self.config.num_classes(),
                actual: scores.len(),
            })?;

        debug!("スコア: {:?} -> {} ({:.4})", scores, label, confidence);
        Ok((label, confidence))
    }

    /// 画像バイト列を前処理から分類まで通す
    ///
    /// `filename` はログ出力にのみ使用します。
    pub fn classify_bytes(
        &self,
        raw_bytes: &[u8],
        filename: Option<&str>,
    ) -> Result<ClassificationResult, ClassifyError> {
        let tensor = self.preprocessor.preprocess(raw_bytes)?;
        let (label, confidence) = self.classify(&tensor)?;

        info!(
            "分類結果: {} ({:.4}) [{}]",
            label,
            confidence,
            filename.unwrap_or("-")
        );

        Ok(ClassificationResult {
            label,
            confidence,
            metadata: LabelCatalog::metadata(label),
        })
    }

    /// InferenceConfigへの参照を取得
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }
}

/// 最大スコアのインデックスと値（同値は先頭を優先）
fn argmax(scores: &[f32]) -> Result<(usize, f32), InferenceError> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(InferenceError::NonFinite { index });
        }
        match best {
            Some((_, value)) if value >= score => {}
            _ => best = Some((index, score)),
        }
    }
    best.ok_or(InferenceError::OutputWidth {
        expected: Category::ALL.len(),
        actual: 0,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::Recyclable;
    use crate::ml::preprocess::tests::png_bytes;
    use image::RgbImage;

    /// 固定スコアを返すモデル
    pub(crate) struct StubModel(pub Vec<f32>);

    impl ScoreModel for StubModel {
        fn scores(&self, _input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    fn engine(scores: Vec<f32>) -> ClassificationEngine<StubModel> {
        ClassificationEngine::new(StubModel(scores), InferenceConfig::default())
    }

    #[test]
    fn test_black_image_with_stub_scores() {
        let engine = engine(vec![0.1, 0.05, 0.6, 0.15, 0.1]);
        let black = png_bytes(RgbImage::new(224, 224));

        let result = engine.classify_bytes(&black, Some("black.png")).unwrap();
        assert_eq!(result.label, Category::Pet);
        assert!((result.confidence - 0.6).abs() < 1e-6);
        assert_eq!(result.metadata, LabelCatalog::metadata(Category::Pet));
        assert_eq!(result.metadata.recyclable, Some(Recyclable::Yes));
    }

    #[test]
    fn test_low_confidence_is_returned_as_is() {
        let engine = engine(vec![0.001, 0.002, 0.0005, 0.0001, 0.003]);
        let tensor = ImageTensor::new(vec![0.0; 224 * 224 * 3], [1, 224, 224, 3]).unwrap();
        let (label, confidence) = engine.classify(&tensor).unwrap();
        assert_eq!(label, Category::Ps);
        assert!((confidence - 0.003).abs() < 1e-9);
    }

    #[test]
    fn test_ties_pick_first_slot() {
        let engine = engine(vec![0.5, 0.5, 0.1, 0.1, 0.1]);
        let tensor = ImageTensor::new(vec![0.0; 224 * 224 * 3], [1, 224, 224, 3]).unwrap();
        assert_eq!(engine.classify(&tensor).unwrap().0, Category::Hdpe);
    }

    #[test]
    fn test_wrong_input_shape() {
        let engine = engine(vec![0.1; 5]);
        let tensor = ImageTensor::new(vec![0.0; 8 * 8 * 3], [1, 8, 8, 3]).unwrap();
        assert!(matches!(
            engine.classify(&tensor),
            Err(InferenceError::InputShape { .. })
        ));
    }

    #[test]
    fn test_wrong_output_width() {
        let engine = engine(vec![0.1, 0.9]);
        let tensor = ImageTensor::new(vec![0.0; 224 * 224 * 3], [1, 224, 224, 3]).unwrap();
        assert!(matches!(
            engine.classify(&tensor),
            Err(InferenceError::OutputWidth { expected: 5, actual: 2 })
        ));
    }

    #[test]
    fn test_nan_score_is_inference_error() {
        let engine = engine(vec![0.1, f32::NAN, 0.3, 0.1, 0.1]);
        let tensor = ImageTensor::new(vec![0.0; 224 * 224 * 3], [1, 224, 224, 3]).unwrap();
        assert!(matches!(
            engine.classify(&tensor),
            Err(InferenceError::NonFinite { index: 1 })
        ));
    }

    #[test]
    fn test_malformed_bytes_never_reach_model() {
        let engine = engine(vec![0.1; 5]);
        let result = engine.classify_bytes(b"\x89PNG\r\n\x1a\n", None);
        assert!(matches!(result, Err(ClassifyError::Decode(_))));
    }

    #[test]
    fn test_result_serialization() {
        let engine = engine(vec![0.0, 0.0, 0.0, 0.0, 0.9]);
        let result = engine
            .classify_bytes(&png_bytes(RgbImage::new(30, 30)), None)
            .unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["label"], "PS");
        assert_eq!(value["info"]["recyclable"], false);
        assert!(value["info"]["found_in"].as_str().unwrap().contains("Foam"));
    }
}
