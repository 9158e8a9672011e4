use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Disclaimer attached to every successful prediction.
pub const DISCLAIMER: &str = "This is a simple MVP result — not medical advice.";

/// Classification domain a photo belongs to. Each category has its own label set.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    #[default]
    Tongue,
    Nail,
    Ankle,
    Foot,
}

impl Category {
    /// Lenient parse used for the `category` form field: unknown or missing
    /// values fall back to [`Category::Tongue`].
    pub fn from_request_value(raw: Option<&str>) -> Self {
        raw.and_then(|value| Category::from_str(value).ok())
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResponse {
    pub condition: String,
    pub confidence: f32,
    pub explanation: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn no_image() -> Self {
        Self {
            error: "no image provided".into(),
            detail: None,
        }
    }

    pub fn prediction_failed(detail: impl Into<String>) -> Self {
        Self {
            error: "prediction failed".into(),
            detail: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn category_parsing_ignores_ascii_case() {
        assert_eq!(Category::from_request_value(Some("NAIL")), Category::Nail);
        assert_eq!(Category::from_request_value(Some("Ankle")), Category::Ankle);
        assert_eq!(Category::from_request_value(Some("foot")), Category::Foot);
    }

    #[test]
    fn unknown_or_missing_category_is_tongue() {
        assert_eq!(Category::from_request_value(None), Category::Tongue);
        assert_eq!(Category::from_request_value(Some("")), Category::Tongue);
        assert_eq!(Category::from_request_value(Some("elbow")), Category::Tongue);
        assert_eq!(Category::from_request_value(Some(" nail")), Category::Tongue);
    }

    #[test]
    fn category_display_round_trips_through_parse() {
        for category in Category::iter() {
            let name = category.to_string();
            assert_eq!(name, name.to_lowercase());
            assert_eq!(Category::from_request_value(Some(&name)), category);
        }
    }

    #[test]
    fn error_response_omits_missing_detail() {
        let body = serde_json::to_value(ErrorResponse::no_image()).unwrap();
        assert_eq!(body, serde_json::json!({"error": "no image provided"}));

        let body = serde_json::to_value(ErrorResponse::prediction_failed("boom")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"error": "prediction failed", "detail": "boom"})
        );
    }
}
