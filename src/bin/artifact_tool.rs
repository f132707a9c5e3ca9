//! アーティファクトの確認・梱包・一括予測を行うコマンドラインツール
//!
//! 使い方:
//!   artifact_tool inspect <model_dir | bundle.tar.gz>
//!   artifact_tool pack <model_dir> <output.tar.gz>
//!   artifact_tool predict <model_dir | bundle.tar.gz> <readings.csv>

use anyhow::{bail, Context, Result};
use crop_predictor_lib::logging::init_logging;
use crop_predictor_lib::ml::InferencePipeline;
use crop_predictor_lib::model::{pack_bundle, ArtifactSet};
use crop_predictor_lib::presentation::result_callout;
use crop_predictor_lib::readings_loader::load_readings;
use std::path::PathBuf;

const USAGE: &str = "usage:
  artifact_tool inspect <model_dir | bundle.tar.gz>
  artifact_tool pack <model_dir> <output.tar.gz>
  artifact_tool predict <model_dir | bundle.tar.gz> <readings.csv>";

fn main() {
    if let Err(e) = init_logging("warn") {
        eprintln!("{}", e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("✗ エラー: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    match args {
        [cmd, source] if cmd == "inspect" => inspect(PathBuf::from(source)),
        [cmd, dir, output] if cmd == "pack" => pack(PathBuf::from(dir), PathBuf::from(output)),
        [cmd, source, csv] if cmd == "predict" => predict(PathBuf::from(source), PathBuf::from(csv)),
        _ => bail!("{}", USAGE),
    }
}

fn inspect(source: PathBuf) -> Result<()> {
    let artifacts = ArtifactSet::load(&source)
        .with_context(|| format!("Failed to load artifacts from {}", source.display()))?;
    println!("{}", artifacts.summary());
    println!(
        "ノード数: {} / 特徴量順序: {}",
        artifacts.classifier.total_nodes(),
        artifacts.metadata.feature_names.join(", ")
    );
    Ok(())
}

fn pack(dir: PathBuf, output: PathBuf) -> Result<()> {
    let bundle = pack_bundle(&dir, &output)
        .with_context(|| format!("Failed to pack {}", dir.display()))?;
    println!("✓ バンドルを作成しました: {}", bundle.display());
    Ok(())
}

fn predict(source: PathBuf, csv: PathBuf) -> Result<()> {
    let pipeline = InferencePipeline::load(&source)
        .with_context(|| format!("Failed to load artifacts from {}", source.display()))?;
    let rows = load_readings(&csv)?;
    println!("{}件のセンサー値を予測します", rows.len());

    let vectors: Vec<_> = rows.iter().map(|r| r.to_feature_vector()).collect();
    let mut failures = 0;
    for (i, outcome) in pipeline.predict_batch(&vectors).into_iter().enumerate() {
        match outcome {
            Ok(prediction) => println!("{:>4}: {}", i + 1, result_callout(&prediction.crop)),
            Err(e) => {
                failures += 1;
                println!("{:>4}: ✗ {}", i + 1, e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} rows failed", failures, rows.len());
    }
    Ok(())
}
