use serde::{Deserialize, Serialize};

/// 特徴量の数
pub const NUM_FEATURES: usize = 7;

// 環境センサーの各項目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureName {
    Temperature,
    Humidity,
    Rainfall,
    Ph,
    Nitrogen,
    Phosphorus,
    Potassium,
}

/// スケーラーとモデルの学習時の特徴量順序（この順序を変えると予測が壊れる）
pub const FEATURE_ORDER: [FeatureName; NUM_FEATURES] = [
    FeatureName::Temperature,
    FeatureName::Humidity,
    FeatureName::Rainfall,
    FeatureName::Ph,
    FeatureName::Nitrogen,
    FeatureName::Phosphorus,
    FeatureName::Potassium,
];

impl FeatureName {
    pub const fn as_str(self) -> &'static str {
        match self {
            FeatureName::Temperature => "temperature",
            FeatureName::Humidity => "humidity",
            FeatureName::Rainfall => "rainfall",
            FeatureName::Ph => "ph",
            FeatureName::Nitrogen => "nitrogen",
            FeatureName::Phosphorus => "phosphorus",
            FeatureName::Potassium => "potassium",
        }
    }

    /// 特徴量ベクトル内の位置
    pub fn index(self) -> usize {
        FEATURE_ORDER
            .iter()
            .position(|&name| name == self)
            .unwrap_or_default()
    }

    /// 名前から特徴量を解決（大文字小文字を無視、N/P/Kの略記も許可）
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "temperature" | "temp" => Some(FeatureName::Temperature),
            "humidity" | "hum" => Some(FeatureName::Humidity),
            "rainfall" | "rain" => Some(FeatureName::Rainfall),
            "ph" => Some(FeatureName::Ph),
            "nitrogen" | "n" => Some(FeatureName::Nitrogen),
            "phosphorus" | "p" => Some(FeatureName::Phosphorus),
            "potassium" | "k" => Some(FeatureName::Potassium),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeatureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 7項目の環境センサー値
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

impl SensorReadings {
    pub fn get(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::Temperature => self.temperature,
            FeatureName::Humidity => self.humidity,
            FeatureName::Rainfall => self.rainfall,
            FeatureName::Ph => self.ph,
            FeatureName::Nitrogen => self.nitrogen,
            FeatureName::Phosphorus => self.phosphorus,
            FeatureName::Potassium => self.potassium,
        }
    }

    pub fn set(&mut self, name: FeatureName, value: f64) {
        let slot = match name {
            FeatureName::Temperature => &mut self.temperature,
            FeatureName::Humidity => &mut self.humidity,
            FeatureName::Rainfall => &mut self.rainfall,
            FeatureName::Ph => &mut self.ph,
            FeatureName::Nitrogen => &mut self.nitrogen,
            FeatureName::Phosphorus => &mut self.phosphorus,
            FeatureName::Potassium => &mut self.potassium,
        };
        *slot = value;
    }

    pub fn to_feature_vector(&self) -> FeatureVector {
        FeatureVector::from_readings(self)
    }
}

/// 固定順序の特徴量ベクトル
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    pub const fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self(values)
    }

    pub fn from_readings(readings: &SensorReadings) -> Self {
        Self(FEATURE_ORDER.map(|name| readings.get(name)))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn values(&self) -> [f64; NUM_FEATURES] {
        self.0
    }
}

/// 1回の推論結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// 予測された作物名
    pub crop: String,
    /// デコード前のクラスインデックス
    pub class_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_follows_fixed_order() {
        let readings = SensorReadings {
            temperature: 25.0,
            humidity: 0.8,
            rainfall: 200.0,
            ph: 6.5,
            nitrogen: 40.0,
            phosphorus: 30.0,
            potassium: 20.0,
        };
        let vector = readings.to_feature_vector();
        assert_eq!(vector.values(), [25.0, 0.8, 200.0, 6.5, 40.0, 30.0, 20.0]);
    }

    #[test]
    fn test_feature_index_matches_order() {
        for (i, name) in FEATURE_ORDER.iter().enumerate() {
            assert_eq!(name.index(), i);
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(FeatureName::parse("N"), Some(FeatureName::Nitrogen));
        assert_eq!(FeatureName::parse(" Rainfall "), Some(FeatureName::Rainfall));
        assert_eq!(FeatureName::parse("pH"), Some(FeatureName::Ph));
        assert_eq!(FeatureName::parse("moisture"), None);
    }

    #[test]
    fn test_set_then_get() {
        let mut readings = SensorReadings::default();
        readings.set(FeatureName::Potassium, 12.0);
        assert_eq!(readings.get(FeatureName::Potassium), 12.0);
        assert_eq!(readings.to_feature_vector().values()[6], 12.0);
    }
}
