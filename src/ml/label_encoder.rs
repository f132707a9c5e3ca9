//! ラベルエンコーダー（クラスインデックス ⇔ 作物名）

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ml::stages::LabelDecoder;

/// label_encoder.json の内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// インデックス順の作物名
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        let encoder = Self { classes };
        encoder.validate()?;
        Ok(encoder)
    }

    /// 空でなく重複のないラベル集合であることを確認（全単射の前提）
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("label encoder has no classes".into());
        }
        let mut seen = HashSet::new();
        for label in &self.classes {
            if label.trim().is_empty() {
                return Err("label encoder contains an empty label".into());
            }
            if !seen.insert(label.as_str()) {
                return Err(format!("duplicate label: {}", label));
            }
        }
        Ok(())
    }

    /// 作物名からインデックスを取得
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.classes
    }
}

impl LabelDecoder for LabelEncoder {
    fn len(&self) -> usize {
        self.classes.len()
    }

    fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}
