use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeRequest {
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveRequest {
    pub(crate) data: AnalysisResult,
    #[serde(default)]
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) database_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    pub(crate) q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DatabaseNameQuery {
    #[serde(default)]
    pub(crate) id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DatabaseNameResponse {
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SettingsInfo {
    pub(crate) target_language: String,
    pub(crate) ui_language: String,
    pub(crate) target_languages: Vec<&'static str>,
    pub(crate) databases: Vec<DatabaseSummary>,
}

/// Collection summary with credentials redacted.
#[derive(Debug, Serialize)]
pub(crate) struct DatabaseSummary {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) template: String,
    pub(crate) default: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
