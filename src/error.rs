//! エラー型の定義
//!
//! 起動時に致命的なアーティファクトエラーと、リクエスト単位で回復可能な
//! 推論・入力エラーを区別します。

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// アーティファクトの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// 特徴量スケーラー
    Scaler,
    /// ランダムフォレスト分類器
    Classifier,
    /// ラベルエンコーダー
    LabelEncoder,
    /// バンドルのマニフェスト
    Manifest,
}

impl ArtifactKind {
    /// ディレクトリおよびバンドル内でのファイル名
    pub const fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Scaler => "scaler.json",
            ArtifactKind::Classifier => "rf_model.json",
            ArtifactKind::LabelEncoder => "label_encoder.json",
            ArtifactKind::Manifest => "metadata.json",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Scaler => write!(f, "scaler"),
            ArtifactKind::Classifier => write!(f, "classifier"),
            ArtifactKind::LabelEncoder => write!(f, "label encoder"),
            ArtifactKind::Manifest => write!(f, "manifest"),
        }
    }
}

/// 起動時のアーティファクト読み込みエラー（致命的）
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found: {}", .path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error("failed to read {kind} artifact {}: {source}", .path.display())]
    Io {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {kind} artifact {}: {source}", .path.display())]
    Parse {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} artifact is incompatible: {reason}")]
    Incompatible { kind: ArtifactKind, reason: String },

    #[error("artifact bundle {}: {source}", .path.display())]
    Bundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub(crate) fn incompatible(kind: ArtifactKind, reason: impl Into<String>) -> Self {
        ArtifactError::Incompatible {
            kind,
            reason: reason.into(),
        }
    }

    /// エラーの原因となったアーティファクトの種類
    pub fn kind(&self) -> Option<ArtifactKind> {
        match self {
            ArtifactError::Missing { kind, .. }
            | ArtifactError::Io { kind, .. }
            | ArtifactError::Parse { kind, .. }
            | ArtifactError::Incompatible { kind, .. } => Some(*kind),
            ArtifactError::Bundle { .. } => None,
        }
    }
}

/// 推論時のエラー（回復可能）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("classifier predicted class index {index}, but the label encoder only knows {known} labels")]
    UnknownClass { index: usize, known: usize },

    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
}

/// 入力フォームの値のエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("unknown input field: {0}")]
    UnknownField(String),

    #[error("field {field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// 予測セッションの状態遷移エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a prediction is already in progress")]
    PredictionInProgress,
}
