//! アプリケーション設定管理モジュール
//!
//! アーティファクトの場所や予測時の待ち時間などをJSON形式で保存・読み込みします。

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// モデル設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// アーティファクトのディレクトリ、またはtar.gzバンドルのパス
    pub artifact_path: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            artifact_path: "model".to_string(),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// モデル設定
    pub model: ModelSettings,
    /// 予測ボタン押下後の待ち時間（ミリ秒）
    pub feedback_delay_ms: u64,
    /// ログレベル（trace/debug/info/warn/error）
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            feedback_delay_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// 設定を読み込む。失敗した場合はデフォルト設定と失敗理由を返す
    ///
    /// ログ出力の初期化前に呼べるよう、ここでは何も出力しません。
    /// 結果は `log_load_outcome` で後から記録します。
    pub fn load_with_fallback<P: AsRef<Path>>(path: P) -> (Self, Option<anyhow::Error>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// `load_with_fallback` の結果を記録する
    pub fn log_load_outcome(path: &Path, error: Option<&anyhow::Error>) {
        match error {
            None => tracing::info!("設定ファイルを読み込みました: {}", path.display()),
            Some(_) if !path.exists() => tracing::warn!(
                "設定ファイルが存在しません。デフォルト設定を使用します: {}",
                path.display()
            ),
            Some(e) => {
                tracing::warn!("設定ファイルの読み込みに失敗しました: {:#}", e);
                tracing::warn!("デフォルト設定を使用します");
            }
        }
    }

    /// 設定を読み込む。存在しない・読めない場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let (config, error) = Self::load_with_fallback(path.as_ref());
        Self::log_load_outcome(path.as_ref(), error.as_ref());
        config
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config: {}", path.as_ref().display()))?;
        Ok(())
    }

    /// 予測時の待ち時間
    pub fn feedback_delay(&self) -> Duration {
        Duration::from_millis(self.feedback_delay_ms)
    }

    /// アーティファクトパスを解決する
    ///
    /// 相対パスはカレントディレクトリ、実行ファイルのディレクトリの順に探します。
    /// どちらにも無ければカレントディレクトリ基準のパスを返します（読み込み時にエラーになる）。
    pub fn resolve_artifact_path(&self) -> PathBuf {
        let configured = PathBuf::from(&self.model.artifact_path);
        if configured.is_absolute() || configured.exists() {
            return configured;
        }

        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&configured)));
        match beside_exe {
            Some(candidate) if candidate.exists() => candidate,
            _ => configured,
        }
    }
}
