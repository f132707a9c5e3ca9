//! アーティファクトバンドルのメタデータ
//!
//! バンドル（tar.gz）には必ず、モデルディレクトリには任意で
//! metadata.json を置きます。
//!
//! ## 互換性の条件
//! - `format_version` はこのアプリが扱える版であること
//! - `feature_names` はスケーラーとモデルの学習時の特徴量順序と一致すること

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{FeatureName, FEATURE_ORDER};

/// 扱えるバンドル形式の版
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// バンドルのメタデータ（metadata.json）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// バンドル形式の版
    pub format_version: u32,

    /// 学習時の特徴量順序
    /// 例: ["temperature", "humidity", "rainfall", "ph", "nitrogen", "phosphorus", "potassium"]
    pub feature_names: Vec<String>,

    /// 学習時刻（ISO8601形式）
    #[serde(default)]
    pub trained_at: Option<String>,

    /// 任意の説明
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            feature_names: FEATURE_ORDER.iter().map(|f| f.as_str().to_string()).collect(),
            trained_at: None,
            description: None,
        }
    }
}

impl ModelMetadata {
    /// 現在時刻を記録した新しいメタデータを作成
    pub fn stamped_now(description: Option<String>) -> Self {
        Self {
            trained_at: Some(chrono::Local::now().to_rfc3339()),
            description,
            ..Self::default()
        }
    }

    /// 版と特徴量順序を検証
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            ));
        }
        if self.feature_names.len() != FEATURE_ORDER.len() {
            return Err(format!(
                "{} feature names listed, expected {}",
                self.feature_names.len(),
                FEATURE_ORDER.len()
            ));
        }
        for (i, (name, expected)) in self.feature_names.iter().zip(FEATURE_ORDER).enumerate() {
            if FeatureName::parse(name) != Some(expected) {
                return Err(format!(
                    "feature {} is '{}', expected '{}'",
                    i, name, expected
                ));
            }
        }
        Ok(())
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }
}

/// 読み込んだアーティファクトの概要（画面・ログ表示用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub source: String,
    pub format_version: u32,
    pub trained_at: Option<String>,
    pub description: Option<String>,
    pub scaler_kind: String,
    pub n_trees: usize,
    pub avg_tree_depth: f64,
    pub labels: Vec<String>,
}

impl std::fmt::Display for ArtifactSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== モデルメタデータ ===")?;
        writeln!(f, "読み込み元: {}", self.source)?;
        writeln!(f, "形式の版: {}", self.format_version)?;
        if let Some(ref trained_at) = self.trained_at {
            writeln!(f, "学習日時: {}", trained_at)?;
        }
        if let Some(ref description) = self.description {
            writeln!(f, "説明: {}", description)?;
        }
        writeln!(f, "スケーラー: {}", self.scaler_kind)?;
        writeln!(f, "木の本数: {} (平均深さ {:.2})", self.n_trees, self.avg_tree_depth)?;
        writeln!(f, "作物ラベル ({}): {}", self.labels.len(), self.labels.join(", "))?;
        write!(f, "========================")
    }
}
