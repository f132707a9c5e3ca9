//! 環境パラメーター入力フォーム
//!
//! 画面上は2列に並びますが、特徴量ベクトルは常に固定順序で作られます。

use serde::Serialize;

use crate::error::FormError;
use crate::types::{FeatureName, FeatureVector, SensorReadings};

/// 表示列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Left,
    Right,
}

/// 入力欄の定義
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub key: FeatureName,
    pub label: &'static str,
    pub step: f64,
    /// 表示桁数（整数欄は0）
    pub decimals: u32,
    pub integer: bool,
    pub column: Column,
}

const fn field(
    key: FeatureName,
    label: &'static str,
    step: f64,
    decimals: u32,
    integer: bool,
    column: Column,
) -> FieldSpec {
    FieldSpec {
        key,
        label,
        step,
        decimals,
        integer,
        column,
    }
}

/// 画面の並び順（左列 → 右列）
pub static FORM_FIELDS: [FieldSpec; 7] = [
    field(FeatureName::Temperature, "🌡️ Temperature (°C)", 1.0, 2, false, Column::Left),
    field(FeatureName::Rainfall, "🌧️ Rainfall (mm)", 0.1, 2, false, Column::Left),
    field(FeatureName::Ph, "🧪 Soil pH", 0.1, 2, false, Column::Left),
    field(FeatureName::Humidity, "💧 Humidity (kg/kg)", 0.0001, 4, false, Column::Right),
    field(FeatureName::Nitrogen, "🟢 Nitrogen (N)", 1.0, 0, true, Column::Right),
    field(FeatureName::Phosphorus, "🟣 Phosphorus (P)", 1.0, 0, true, Column::Right),
    field(FeatureName::Potassium, "🟠 Potassium (K)", 1.0, 0, true, Column::Right),
];

pub fn field_spec(name: FeatureName) -> &'static FieldSpec {
    // FORM_FIELDS は全項目を含む
    FORM_FIELDS
        .iter()
        .find(|spec| spec.key == name)
        .unwrap_or(&FORM_FIELDS[0])
}

/// フォームの現在値
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorForm {
    values: SensorReadings,
}

impl SensorForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 欄名を指定して値を設定し、実際に保存された値を返す
    pub fn set_field(&mut self, name: &str, value: f64) -> Result<f64, FormError> {
        let key = FeatureName::parse(name).ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        self.set(key, value)
    }

    pub fn set(&mut self, key: FeatureName, value: f64) -> Result<f64, FormError> {
        if !value.is_finite() {
            return Err(FormError::NonFinite {
                field: key.as_str(),
                value,
            });
        }
        let stored = if field_spec(key).integer {
            value.round()
        } else {
            value
        };
        self.values.set(key, stored);
        Ok(stored)
    }

    /// 全項目をまとめて設定（1つでも不正なら何も変更しない）
    pub fn set_all(&mut self, readings: &SensorReadings) -> Result<(), FormError> {
        let mut next = *self;
        for spec in &FORM_FIELDS {
            next.set(spec.key, readings.get(spec.key))?;
        }
        *self = next;
        Ok(())
    }

    pub fn values(&self) -> SensorReadings {
        self.values
    }

    pub fn to_feature_vector(&self) -> FeatureVector {
        self.values.to_feature_vector()
    }
}
