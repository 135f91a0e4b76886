//! eco_sort コマンドラインツール
//!
//! - `classify`: 画像を分類して結果をJSONで出力
//! - `score`: 進捗ファイルに1件分のリサイクルを記録
//! - `badges`: 使用中のバッジ表を表示
//! - `config`: 読み込んだ設定を表示

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use eco_sort_lib::model::AppConfig;
use eco_sort_lib::scoring::{ScoringEngine, UserProgress};

#[derive(Parser, Debug)]
#[command(name = "eco_sort", version, about = "Plastic resin classifier and recycling progress tool")]
struct Cli {
    /// 設定ファイル（JSON、省略時は ./config.json）
    #[arg(long, env = "ECO_SORT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 画像を分類する
    Classify {
        /// 画像ファイル
        image: PathBuf,
    },
    /// 進捗ファイルに1件分のリサイクルを記録する
    Score {
        /// 進捗レコード（JSON、無ければ新規作成）
        #[arg(long)]
        progress: PathBuf,
        /// プラスチック種別（PET, HDPE, LDPE, PP, PS）
        #[arg(long)]
        category: String,
    },
    /// バッジ表を表示する
    Badges,
    /// 読み込んだ設定を表示する
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_or_default_from(path),
        None => AppConfig::load_or_default(),
    };

    match cli.command {
        Command::Classify { image } => classify(&config, &image).await,
        Command::Score { progress, category } => {
            let engine = config.scoring_engine()?;
            score(&engine, &progress, &category)
        }
        Command::Badges => {
            let engine = config.scoring_engine()?;
            for tier in engine.table().tiers() {
                println!("{:>6}  {}  {}", tier.threshold, tier.color, tier.name);
            }
            Ok(())
        }
        Command::Config => {
            config.display();
            Ok(())
        }
    }
}

#[cfg(feature = "ml")]
async fn classify(config: &AppConfig, image: &Path) -> Result<()> {
    use eco_sort_lib::ml::{open_score_model, InferenceWorker};

    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("画像ファイルを読み込めません: {}", image.display()))?;

    // モデルの読み込みとワーカーの終了待ちはブロックするため専用スレッドで行う
    let engine_config = config.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let settings = engine_config.inference.clone();
        InferenceWorker::spawn(move || open_score_model(&engine_config), &settings)
    })
    .await??;

    let filename = image.file_name().map(|n| n.to_string_lossy().to_string());
    let result = worker.classify(bytes, filename).await;
    tokio::task::spawn_blocking(move || worker.shutdown()).await?;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

#[cfg(not(feature = "ml"))]
async fn classify(_config: &AppConfig, _image: &Path) -> Result<()> {
    anyhow::bail!("このビルドは `ml` フィーチャー無しでビルドされているため分類できません")
}

fn score(engine: &ScoringEngine, path: &Path, category: &str) -> Result<()> {
    let current = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("進捗ファイルを読み込めません: {}", path.display()))?;
        let progress: UserProgress = serde_json::from_str(&content)
            .with_context(|| format!("進捗ファイルの形式が不正です: {}", path.display()))?;
        engine.restore(progress)?
    } else {
        info!("進捗ファイルが無いため新規作成します: {}", path.display());
        engine.new_progress()
    };

    let next = engine.apply(&current, category)?;
    std::fs::write(path, serde_json::to_string_pretty(&next)?)
        .with_context(|| format!("進捗ファイルを書き込めません: {}", path.display()))?;

    println!("{}", serde_json::to_string_pretty(&next.report())?);
    Ok(())
}
