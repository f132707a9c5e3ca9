//! Tauriコマンドとアプリの起動

use tauri::{AppHandle, Emitter, State};

use crate::form::{FieldSpec, FORM_FIELDS};
use crate::logging::init_logging;
use crate::model::{AppConfig, ArtifactSummary};
use crate::presentation::{PageContent, PAGE_CONTENT};
use crate::session::{lock_session, run_prediction, PredictionPhase, SessionSnapshot};
use crate::AppContext;

/// 表示状態の変化を通知するイベント名
pub const PHASE_EVENT: &str = "prediction-phase-changed";

fn emit_phase(app: &AppHandle, phase: &PredictionPhase) {
    if let Err(e) = app.emit(PHASE_EVENT, phase) {
        tracing::warn!("イベント送信に失敗しました: {}", e);
    }
}

#[tauri::command]
fn get_page_content() -> PageContent {
    PAGE_CONTENT
}

#[tauri::command]
fn get_form_schema() -> Vec<FieldSpec> {
    FORM_FIELDS.to_vec()
}

#[tauri::command]
fn get_form_state(state: State<AppContext>) -> SessionSnapshot {
    lock_session(&state.session).snapshot()
}

#[tauri::command]
fn update_field(
    app: AppHandle,
    field: String,
    value: f64,
    state: State<AppContext>,
) -> Result<SessionSnapshot, String> {
    let (before, snapshot) = {
        let mut session = lock_session(&state.session);
        let before = session.phase().clone();
        session.edit_field(&field, value).map_err(|e| e.to_string())?;
        (before, session.snapshot())
    };

    if before != snapshot.phase {
        tracing::debug!("表示状態: {:?} -> {:?}", before, snapshot.phase);
        emit_phase(&app, &snapshot.phase);
    }
    Ok(snapshot)
}

#[tauri::command]
async fn predict_crop(
    app: AppHandle,
    state: State<'_, AppContext>,
) -> Result<PredictionPhase, String> {
    run_prediction(&state.session, &state.pipeline, state.feedback_delay, |phase| {
        emit_phase(&app, phase)
    })
    .await
    .map_err(|e| e.to_string())
}

#[tauri::command]
fn get_artifact_info(state: State<AppContext>) -> ArtifactSummary {
    state.artifact_summary.clone()
}

pub fn run() {
    // ログレベルは設定ファイルから決まるため、読み込み結果は初期化後に記録する
    let config_path = AppConfig::default_path();
    let (config, load_error) = AppConfig::load_with_fallback(&config_path);
    if let Err(e) = init_logging(&config.log_level) {
        eprintln!("{}", e);
    }
    AppConfig::log_load_outcome(&config_path, load_error.as_ref());
    tracing::info!("設定: {:?}", config);

    // アーティファクトが揃わなければウィンドウを開かずに終了
    let context = match AppContext::initialize(&config) {
        Ok(context) => context,
        Err(e) => {
            tracing::error!("アーティファクトの読み込みに失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    let result = tauri::Builder::default()
        .manage(context)
        .invoke_handler(tauri::generate_handler![
            get_page_content,
            get_form_schema,
            get_form_state,
            update_field,
            predict_crop,
            get_artifact_info,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!("アプリケーションの実行中にエラーが発生しました: {}", e);
        std::process::exit(1);
    }
}
