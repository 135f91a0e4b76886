//! 機械学習モデルの定義
//!
//! プラスチック樹脂分類用のCNNモデルと、その読み込み処理を提供します。

use burn::{
    backend::{NdArray, Wgpu},
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};
use std::path::Path;
use tracing::info;

use crate::error::{InferenceError, ModelLoadError};
use crate::ml::inference::{ClassificationEngine, ScoreModel};
use crate::ml::preprocess::ImageTensor;
use crate::model::{load_model_with_metadata, AppConfig, DeviceType, InferenceConfig};

/// クラス数
pub const NUM_CLASSES: usize = 5;

/// 全結合層の次元
const HIDDEN_DIM: usize = 128;

/// 受け付ける最小の入力解像度
///
/// conv(3x3) -> pool(2x2) -> conv(3x3) -> pool(2x2) -> conv(3x3) を通して
/// 1x1 以上の特徴マップが残る大きさ。
pub const MIN_INPUT_SIZE: u32 = 18;

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 分類クラス数
    #[config(default = 5)]
    pub num_classes: usize,
    /// ドロップアウト率
    #[config(default = 0.3)]
    pub dropout: f64,
}

impl ModelConfig {
    /// モデルを初期化
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResinClassifier<B> {
        ResinClassifier {
            // Conv1: 3x3 (no padding, stride 1)
            conv1: Conv2dConfig::new([3, 32], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool1: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),

            conv2: Conv2dConfig::new([32, 64], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool2: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),

            conv3: Conv2dConfig::new([64, HIDDEN_DIM], [3, 3])
                .with_stride([1, 1])
                .init(device),

            // 入力サイズに依存しないよう全体平均プーリングで 128 次元にまとめる
            gap: AdaptiveAvgPool2dConfig::new([1, 1]).init(),

            fc1: LinearConfig::new(HIDDEN_DIM, HIDDEN_DIM).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc2: LinearConfig::new(HIDDEN_DIM, self.num_classes).init(device),

            activation: Relu::new(),
        }
    }
}

/// 樹脂分類用CNNモデル
///
/// # アーキテクチャ
/// - {Conv 3x3 + ReLU + MaxPool 2x2} x 2層
/// - Conv 3x3 + ReLU
/// - Global Average Pooling -> 128
/// - FC: 128 -> 128 + ReLU + Dropout
/// - FC: 128 -> num_classes
/// - Sigmoid（ラベルごとに独立したスコア）
#[derive(Module, Debug)]
pub struct ResinClassifier<B: Backend> {
    conv1: Conv2d<B>, // 3 -> 32
    pool1: MaxPool2d,
    conv2: Conv2d<B>, // 32 -> 64
    pool2: MaxPool2d,
    conv3: Conv2d<B>, // 64 -> 128
    gap: AdaptiveAvgPool2d,

    fc1: Linear<B>,
    dropout: Dropout,
    fc2: Linear<B>,

    activation: Relu,
}

impl<B: Backend> ResinClassifier<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, 3, size, size]
    ///
    /// # 戻り値
    /// - クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x);

        let x = self.conv3.forward(x);
        let x = self.activation.forward(x);

        // [batch, 128, 1, 1] -> [batch, 128]
        let x = self.gap.forward(x).reshape([batch_size, HIDDEN_DIM]);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        self.fc2.forward(x)
    }

    /// ラベルごとのスコア [batch_size, num_classes]（0〜1）
    pub fn scores(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        sigmoid(self.forward(images))
    }
}

/// Burnバックエンドで動くスコアモデル
pub struct BurnScoreModel<B: Backend> {
    model: ResinClassifier<B>,
    device: B::Device,
}

impl<B: Backend> BurnScoreModel<B> {
    pub fn new(model: ResinClassifier<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// モデルアーカイブから読み込む
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        device: B::Device,
    ) -> Result<(Self, InferenceConfig), ModelLoadError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(ModelLoadError::NotFound(model_path.to_path_buf()));
        }

        let (metadata, model_binary) = load_model_with_metadata(model_path)
            .map_err(|e| ModelLoadError::Artifact(format!("{:#}", e)))?;
        let config = InferenceConfig::from_metadata(&metadata)?;
        if config.model_input_size < MIN_INPUT_SIZE {
            return Err(ModelLoadError::Incompatible(format!(
                "入力サイズ {} はこのモデル構成には小さすぎます (最小 {})",
                config.model_input_size, MIN_INPUT_SIZE
            )));
        }

        // 推論時はドロップアウトなし
        let model = ModelConfig::new()
            .with_num_classes(config.num_classes())
            .with_dropout(0.0)
            .init::<B>(&device);

        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let record = recorder
            .load(model_binary, &device)
            .map_err(|e| ModelLoadError::Weights(format!("{:?}", e)))?;
        let model = model.load_record(record);

        info!(
            "モデルを読み込みました: {} (ラベル: {:?}, 入力: {}x{})",
            model_path.display(),
            config.labels,
            config.model_input_size,
            config.model_input_size
        );

        Ok((Self::new(model, device), config))
    }
}

impl<B: Backend> ScoreModel for BurnScoreModel<B> {
    fn scores(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let [n, h, w, c] = input.shape();

        // NHWC -> NCHW
        let tensor = Tensor::<B, 1>::from_floats(input.as_slice(), &self.device)
            .reshape([n, h, w, c])
            .permute([0, 3, 1, 2]);

        let output = self.model.scores(tensor);
        output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| InferenceError::Backend(format!("推論結果の取得エラー: {:?}", e)))
    }
}

/// モデルの重みをバイト列に書き出す（アーカイブ作成用）
pub fn model_to_bytes<B: Backend>(model: ResinClassifier<B>) -> Result<Vec<u8>, ModelLoadError> {
    BinBytesRecorder::<FullPrecisionSettings>::default()
        .record(model.into_record(), ())
        .map_err(|e| ModelLoadError::Weights(format!("{:?}", e)))
}

/// 設定に従ってバックエンドを選び、推論エンジンを作る
pub fn open_score_model(
    config: &AppConfig,
) -> Result<ClassificationEngine<Box<dyn ScoreModel>>, ModelLoadError> {
    let path = Path::new(&config.model.model_path);
    let (model, inference_config): (Box<dyn ScoreModel>, InferenceConfig) = match config.device_type {
        DeviceType::Cpu => {
            let (model, cfg) = BurnScoreModel::<NdArray>::load(path, Default::default())?;
            (Box::new(model) as Box<dyn ScoreModel>, cfg)
        }
        DeviceType::Wgpu => {
            let (model, cfg) = BurnScoreModel::<Wgpu>::load(path, Default::default())?;
            (Box::new(model) as Box<dyn ScoreModel>, cfg)
        }
    };

    if inference_config.model_input_size != config.model.input_size {
        return Err(ModelLoadError::Incompatible(format!(
            "入力サイズが設定と一致しません: モデル {} / 設定 {}",
            inference_config.model_input_size, config.model.input_size
        )));
    }

    info!("推論エンジンを初期化しました ({})", config.device_type);
    Ok(ClassificationEngine::new(model, inference_config))
}
