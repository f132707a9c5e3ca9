//! 特徴量スケーラー
//!
//! 学習時に求めた統計量で入力を正規化します。標準化（平均・スケール）と
//! 最小最大スケーリングの2種類をJSONアーティファクトから復元できます。

use serde::{Deserialize, Serialize};

use crate::ml::stages::FeatureScaler;

/// スケールがほぼ0の列は1として扱う（学習ライブラリと同じ扱い）
const ZERO_SCALE_EPSILON: f64 = 10.0 * f64::EPSILON;

/// 標準化: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// 各特徴量の平均（中心化しない場合は None）
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    /// 各特徴量の標準偏差（スケーリングしない場合は None）
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            mean: Some(mean),
            scale: Some(scale),
        }
    }

    fn width(&self) -> Option<usize> {
        self.mean
            .as_ref()
            .or(self.scale.as_ref())
            .map(Vec::len)
    }
}

impl FeatureScaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.width().unwrap_or_default()
    }

    fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .enumerate()
            .map(|(j, &x)| {
                let mut val = x;
                if let Some(mean) = &self.mean {
                    val -= mean[j];
                }
                if let Some(scale) = &self.scale {
                    if scale[j].abs() > ZERO_SCALE_EPSILON {
                        val /= scale[j];
                    }
                }
                val
            })
            .collect()
    }
}

/// 最小最大スケーリング: `x * scale + min`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
    /// 変換後の値を feature_range に収めるか
    #[serde(default)]
    pub clip: bool,
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl MinMaxScaler {
    fn scale_and_min(&self, j: usize) -> (f64, f64) {
        let (lo, hi) = self.feature_range;
        let mut range = self.data_max[j] - self.data_min[j];
        if range.abs() < ZERO_SCALE_EPSILON {
            range = 1.0;
        }
        let scale = (hi - lo) / range;
        (scale, lo - self.data_min[j] * scale)
    }
}

impl FeatureScaler for MinMaxScaler {
    fn n_features(&self) -> usize {
        self.data_min.len()
    }

    fn transform(&self, features: &[f64]) -> Vec<f64> {
        let (lo, hi) = self.feature_range;
        features
            .iter()
            .enumerate()
            .map(|(j, &x)| {
                let (scale, min) = self.scale_and_min(j);
                let val = x * scale + min;
                if self.clip {
                    val.clamp(lo, hi)
                } else {
                    val
                }
            })
            .collect()
    }
}

/// scaler.json の内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl ScalerArtifact {
    /// 統計量の整合性を検証
    pub fn validate(&self, expected_features: usize) -> Result<(), String> {
        match self {
            ScalerArtifact::Standard(s) => {
                let width = s
                    .width()
                    .ok_or_else(|| "standard scaler has neither mean nor scale".to_string())?;
                if let (Some(mean), Some(scale)) = (&s.mean, &s.scale) {
                    if mean.len() != scale.len() {
                        return Err(format!(
                            "mean has {} entries but scale has {}",
                            mean.len(),
                            scale.len()
                        ));
                    }
                }
                check_width(width, expected_features)?;
                let all_finite = s.mean.iter().chain(s.scale.iter()).flatten().all(|v| v.is_finite());
                if !all_finite {
                    return Err("standard scaler statistics must be finite".into());
                }
            }
            ScalerArtifact::MinMax(s) => {
                if s.data_min.len() != s.data_max.len() {
                    return Err(format!(
                        "data_min has {} entries but data_max has {}",
                        s.data_min.len(),
                        s.data_max.len()
                    ));
                }
                check_width(s.data_min.len(), expected_features)?;
                if s.feature_range.0 >= s.feature_range.1 {
                    return Err(format!(
                        "feature_range ({}, {}) must be increasing",
                        s.feature_range.0, s.feature_range.1
                    ));
                }
            }
        }
        Ok(())
    }

    fn inner(&self) -> &dyn FeatureScaler {
        match self {
            ScalerArtifact::Standard(s) => s as &dyn FeatureScaler,
            ScalerArtifact::MinMax(s) => s as &dyn FeatureScaler,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ScalerArtifact::Standard(_) => "standard",
            ScalerArtifact::MinMax(_) => "min_max",
        }
    }
}

fn check_width(width: usize, expected: usize) -> Result<(), String> {
    if width != expected {
        return Err(format!("fitted on {} features, expected {}", width, expected));
    }
    Ok(())
}

impl FeatureScaler for ScalerArtifact {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn transform(&self, features: &[f64]) -> Vec<f64> {
        self.inner().transform(features)
    }
}
