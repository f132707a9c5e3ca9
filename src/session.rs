//! 予測セッション（入力待ち → 予測中 → 結果表示）
//!
//! フォームの値と表示状態を1つにまとめ、`Mutex` で保護して共有します。
//! 待ち時間の間はロックを保持しません。

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::error::{FormError, InferenceError, SessionError};
use crate::form::SensorForm;
use crate::ml::InferencePipeline;
use crate::presentation::result_callout;
use crate::types::{FeatureVector, Prediction, SensorReadings};

/// 画面の表示状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PredictionPhase {
    AwaitingInput,
    Predicting,
    ResultDisplayed { crop: String, callout: String },
    Failed { message: String },
}

impl PredictionPhase {
    fn displayed(prediction: &Prediction) -> Self {
        PredictionPhase::ResultDisplayed {
            crop: prediction.crop.clone(),
            callout: result_callout(&prediction.crop),
        }
    }

    pub fn is_predicting(&self) -> bool {
        matches!(self, PredictionPhase::Predicting)
    }
}

/// フォームと表示状態
#[derive(Debug, Clone)]
pub struct PredictionSession {
    form: SensorForm,
    phase: PredictionPhase,
}

impl Default for PredictionSession {
    fn default() -> Self {
        Self::new()
    }
}

/// ウェブビューへ渡すスナップショット
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub values: SensorReadings,
    pub phase: PredictionPhase,
}

impl PredictionSession {
    pub fn new() -> Self {
        Self {
            form: SensorForm::new(),
            phase: PredictionPhase::AwaitingInput,
        }
    }

    pub fn phase(&self) -> &PredictionPhase {
        &self.phase
    }

    pub fn form(&self) -> &SensorForm {
        &self.form
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            values: self.form.values(),
            phase: self.phase.clone(),
        }
    }

    /// 入力欄を編集する
    ///
    /// 結果表示中・失敗表示中なら入力待ちに戻ります。予測中は値だけ記録します。
    pub fn edit_field(&mut self, name: &str, value: f64) -> Result<f64, FormError> {
        let stored = self.form.set_field(name, value)?;
        if matches!(
            self.phase,
            PredictionPhase::ResultDisplayed { .. } | PredictionPhase::Failed { .. }
        ) {
            self.phase = PredictionPhase::AwaitingInput;
        }
        Ok(stored)
    }

    /// 予測を開始し、その時点の特徴量ベクトルを返す
    pub fn begin_prediction(&mut self) -> Result<FeatureVector, SessionError> {
        if self.phase.is_predicting() {
            return Err(SessionError::PredictionInProgress);
        }
        self.phase = PredictionPhase::Predicting;
        Ok(self.form.to_feature_vector())
    }

    /// 推論結果を反映する
    pub fn finish_prediction(
        &mut self,
        outcome: &Result<Prediction, InferenceError>,
    ) -> &PredictionPhase {
        self.phase = match outcome {
            Ok(prediction) => PredictionPhase::displayed(prediction),
            Err(e) => PredictionPhase::Failed {
                message: e.to_string(),
            },
        };
        &self.phase
    }
}

/// ロックを取得（パニックしたスレッドがあっても状態は使い続ける）
pub fn lock_session(session: &Mutex<PredictionSession>) -> MutexGuard<'_, PredictionSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 予測ボタン1回分の処理
///
/// 予測中へ遷移 → 待ち時間 → 推論 → 結果表示（または失敗）の順に進み、
/// 遷移のたびに `on_phase` を呼びます。
pub async fn run_prediction<F>(
    session: &Mutex<PredictionSession>,
    pipeline: &InferencePipeline,
    delay: Duration,
    mut on_phase: F,
) -> Result<PredictionPhase, SessionError>
where
    F: FnMut(&PredictionPhase),
{
    let features = {
        let mut guard = lock_session(session);
        let features = guard.begin_prediction()?;
        on_phase(guard.phase());
        features
    };
    tracing::debug!("予測開始: {:?}", features.values());

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let outcome = pipeline.predict(&features);
    match &outcome {
        Ok(prediction) => tracing::info!("予測結果: {}", prediction.crop),
        Err(e) => tracing::warn!("予測に失敗しました: {}", e),
    }

    let phase = {
        let mut guard = lock_session(session);
        let phase = guard.finish_prediction(&outcome).clone();
        on_phase(&phase);
        phase
    };
    tracing::debug!("表示状態: {:?}", phase);
    Ok(phase)
}
