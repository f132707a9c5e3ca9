//! 画面に表示する固定テキスト

use serde::Serialize;

/// ページの固定テキスト
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageContent {
    pub page_title: &'static str,
    pub page_icon: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub info_banner: &'static str,
    pub section_heading: &'static str,
    pub predict_button: &'static str,
    pub spinner_caption: &'static str,
    pub footer_caption: &'static str,
    /// 結果表示の前置き（作物名は太字で続ける）
    pub result_prefix: &'static str,
}

/// 結果表示の前置き
pub const RESULT_PREFIX: &str = "🌱 Predicted Crop: ";

pub const PAGE_CONTENT: PageContent = PageContent {
    page_title: "Smart Greenhouse Crop Prediction",
    page_icon: "🌿",
    title: "Smart Greenhouse Crop Prediction",
    subtitle: "Simulation-Based IoT Data Analytics Demo",
    info_banner: "This demo simulates IoT sensor inputs to support predictive decision-making in greenhouse environments.",
    section_heading: "🌱 Enter Environmental Parameters",
    predict_button: "🌾 Predict Crop",
    spinner_caption: "🌿 Growing prediction...",
    footer_caption: "Simulation-based smart greenhouse prediction system for academic demonstration.",
    result_prefix: RESULT_PREFIX,
};

/// 予測結果の表示文
pub fn result_callout(crop: &str) -> String {
    format!("{}{}", RESULT_PREFIX, crop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_callout() {
        assert_eq!(result_callout("rice"), "🌱 Predicted Crop: rice");
        assert_eq!(
            format!("{}{}", PAGE_CONTENT.result_prefix, "rice"),
            result_callout("rice")
        );
    }

    #[test]
    fn test_page_serializes_for_web_view() {
        let json = serde_json::to_value(PAGE_CONTENT).unwrap();
        assert_eq!(json["subtitle"], "Simulation-Based IoT Data Analytics Demo");
        assert_eq!(json["predict_button"], "🌾 Predict Crop");
        assert_eq!(json["result_prefix"], "🌱 Predicted Crop: ");
    }
}
