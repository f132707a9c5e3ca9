pub mod error;
pub mod form;
pub mod logging;
pub mod ml;
pub mod model;
pub mod presentation;
pub mod readings_loader;
pub mod session;
pub mod types;

#[cfg(feature = "gui")]
mod commands;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use error::ArtifactError;
use ml::InferencePipeline;
use model::{AppConfig, ArtifactSet, ArtifactSummary};
use session::PredictionSession;

/// アプリ全体で共有する状態
///
/// アーティファクトは起動時に一度だけ読み込み、以後は読み取り専用で共有します。
/// 変更されるのはフォームのセッションだけです。
pub struct AppContext {
    pub pipeline: Arc<InferencePipeline>,
    pub session: Arc<Mutex<PredictionSession>>,
    pub feedback_delay: Duration,
    pub artifact_summary: ArtifactSummary,
}

impl AppContext {
    /// 設定に従ってアーティファクトを読み込む
    pub fn initialize(config: &AppConfig) -> Result<Self, ArtifactError> {
        let source = config.resolve_artifact_path();
        tracing::info!("アーティファクトを読み込み中: {}", source.display());

        let artifacts = ArtifactSet::load(&source)?;
        let artifact_summary = artifacts.summary();
        tracing::info!(
            "読み込み完了: 木{}本, 作物ラベル{}種類",
            artifact_summary.n_trees,
            artifact_summary.labels.len()
        );
        if let Some(ref trained_at) = artifact_summary.trained_at {
            tracing::info!("学習日時: {}", trained_at);
        }

        Ok(Self {
            pipeline: Arc::new(InferencePipeline::from_artifacts(artifacts)),
            session: Arc::new(Mutex::new(PredictionSession::new())),
            feedback_delay: config.feedback_delay(),
            artifact_summary,
        })
    }
}

#[cfg(feature = "gui")]
pub use commands::run;
