//! 推論パイプライン
//!
//! 特徴量ベクトル → スケーラー → 分類器 → ラベルデコーダー の順に処理し、
//! 作物名を1つ返します。各段は読み取り専用で、複数スレッドから共有できます。

use std::path::Path;
use std::sync::Arc;

use crate::error::{ArtifactError, InferenceError};
use crate::ml::stages::{Classifier, FeatureScaler, LabelDecoder};
use crate::model::ArtifactSet;
use crate::types::{FeatureVector, Prediction, NUM_FEATURES};

/// 推論パイプライン
pub struct InferencePipeline {
    scaler: Box<dyn FeatureScaler>,
    classifier: Box<dyn Classifier>,
    decoder: Box<dyn LabelDecoder>,
}

impl InferencePipeline {
    /// 任意の実装からパイプラインを組み立てる
    pub fn new(
        scaler: Box<dyn FeatureScaler>,
        classifier: Box<dyn Classifier>,
        decoder: Box<dyn LabelDecoder>,
    ) -> Self {
        Self {
            scaler,
            classifier,
            decoder,
        }
    }

    /// 検証済みアーティファクトからパイプラインを作成
    pub fn from_artifacts(artifacts: ArtifactSet) -> Self {
        Self::new(
            Box::new(artifacts.scaler),
            Box::new(artifacts.classifier),
            Box::new(artifacts.encoder),
        )
    }

    /// アーティファクトを読み込んで共有ハンドルを作成
    pub fn load<P: AsRef<Path>>(source: P) -> Result<Arc<Self>, ArtifactError> {
        let artifacts = ArtifactSet::load(source.as_ref())?;
        Ok(Arc::new(Self::from_artifacts(artifacts)))
    }

    /// 1件の特徴量ベクトルから作物名を予測
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, InferenceError> {
        self.predict_raw(features.as_slice())
    }

    /// 固定順序の生スライスから予測（長さが違えばエラー）
    pub fn predict_raw(&self, features: &[f64]) -> Result<Prediction, InferenceError> {
        if features.len() != NUM_FEATURES || self.scaler.n_features() != NUM_FEATURES {
            return Err(InferenceError::FeatureCount {
                expected: self.scaler.n_features(),
                actual: features.len(),
            });
        }

        let scaled = self.scaler.transform(features);
        if scaled.len() != self.classifier.n_features() {
            return Err(InferenceError::FeatureCount {
                expected: self.classifier.n_features(),
                actual: scaled.len(),
            });
        }

        let class_index = self.classifier.predict(&scaled);
        let crop = self
            .decoder
            .decode(class_index)
            .ok_or(InferenceError::UnknownClass {
                index: class_index,
                known: self.decoder.len(),
            })?
            .to_string();

        Ok(Prediction { crop, class_index })
    }

    /// 複数件をまとめて予測
    pub fn predict_batch(&self, batch: &[FeatureVector]) -> Vec<Result<Prediction, InferenceError>> {
        batch.iter().map(|features| self.predict(features)).collect()
    }

    /// 予測しうるラベルの一覧
    pub fn labels(&self) -> Vec<String> {
        (0..self.decoder.len())
            .filter_map(|i| self.decoder.decode(i).map(str::to_string))
            .collect()
    }
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("n_features", &self.scaler.n_features())
            .field("n_labels", &self.decoder.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::label_encoder::LabelEncoder;
    use crate::ml::scaler::StandardScaler;

    /// 正規化後の先頭の値をそのままクラスとして返す分類器
    struct FirstFeatureClassifier;

    impl Classifier for FirstFeatureClassifier {
        fn n_features(&self) -> usize {
            NUM_FEATURES
        }

        fn predict(&self, features: &[f64]) -> usize {
            features[0].max(0.0) as usize
        }
    }

    fn pipeline() -> InferencePipeline {
        let scaler = StandardScaler::new(vec![10.0; NUM_FEATURES], vec![1.0; NUM_FEATURES]);
        let encoder =
            LabelEncoder::new(vec!["chickpea".into(), "maize".into(), "rice".into()]).unwrap();
        InferencePipeline::new(
            Box::new(scaler),
            Box::new(FirstFeatureClassifier),
            Box::new(encoder),
        )
    }

    #[test]
    fn test_stages_run_in_order() {
        // 12 - 10 = 2 → "rice"
        let features = FeatureVector::new([12.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let prediction = pipeline().predict(&features).unwrap();
        assert_eq!(prediction.crop, "rice");
        assert_eq!(prediction.class_index, 2);
    }

    #[test]
    fn test_unknown_class_is_reported() {
        let features = FeatureVector::new([15.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let err = pipeline().predict(&features).unwrap_err();
        assert_eq!(err, InferenceError::UnknownClass { index: 5, known: 3 });
    }

    #[test]
    fn test_pipeline_usable_after_failure() {
        let pipeline = pipeline();
        let bad = FeatureVector::new([99.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let good = FeatureVector::new([11.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(pipeline.predict(&bad).is_err());
        assert_eq!(pipeline.predict(&good).unwrap().crop, "maize");
    }

    #[test]
    fn test_raw_slice_length_checked() {
        let err = pipeline().predict_raw(&[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            InferenceError::FeatureCount {
                expected: NUM_FEATURES,
                actual: 2
            }
        );
    }

    #[test]
    fn test_batch_and_labels() {
        let pipeline = pipeline();
        let batch = [
            FeatureVector::new([10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            FeatureVector::new([11.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ];
        let crops: Vec<String> = pipeline
            .predict_batch(&batch)
            .into_iter()
            .map(|r| r.unwrap().crop)
            .collect();
        assert_eq!(crops, vec!["chickpea", "maize"]);
        assert_eq!(pipeline.labels(), vec!["chickpea", "maize", "rice"]);
    }
}
