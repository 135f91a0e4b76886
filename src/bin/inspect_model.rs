//! モデルアーカイブの内容を確認するツール

use clap::Parser;
use std::path::PathBuf;

use eco_sort_lib::model::{load_metadata, print_metadata_info, InferenceConfig};

#[derive(Parser, Debug)]
#[command(name = "inspect_model", about = "Print metadata of a model archive")]
struct Args {
    /// モデルファイル（tar.gz）
    #[arg(default_value = "models/eco_sort_model.tar.gz")]
    model_path: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    println!("=== Model Inspector ===\n");

    match load_metadata(&args.model_path) {
        Ok(metadata) => {
            println!("✓ モデルメタデータ読み込み成功:");
            print_metadata_info(&metadata);

            match InferenceConfig::from_metadata(&metadata) {
                Ok(config) => {
                    let labels: Vec<_> = config.labels.iter().map(|c| c.as_str()).collect();
                    println!("✓ 推論可能なモデルです (出力順: {})", labels.join(", "));
                }
                Err(e) => eprintln!("✗ {}", e),
            }
        }
        Err(e) => {
            eprintln!("✗ エラー: {:#}", e);
            std::process::exit(1);
        }
    }
}
