//! ログ出力の初期化
//!
//! `tracing` のサブスクライバーを設定ファイルのレベルで登録します。

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// 文字列からログレベルへ変換（不明な値は INFO）
pub fn parse_level(s: &str) -> Level {
    match s.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// グローバルなサブスクライバーを登録
///
/// すでに登録済みの場合はエラーを返します（テストで複数回呼ばれるため）。
pub fn init_logging(level: &str) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARNING "), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_second_init_is_error() {
        let _ = init_logging("info");
        assert!(init_logging("info").is_err());
    }
}
