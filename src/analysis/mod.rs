use serde::{Deserialize, Serialize};

use crate::error::Error;

mod prompt;

pub use prompt::{render_system_prompt, source_language_hint};

/// Target languages offered by the settings surface. The literal Chinese
/// entry doubles as the trigger for the Japanese-source heuristic.
pub const TARGET_LANGUAGES: &[&str] = &[
    "English",
    "中文",
    "日本語",
    "한국어",
    "Español",
    "Français",
    "Deutsch",
];

pub const TARGET_CHINESE: &str = "中文";

const WORD_MAX_TOKENS: usize = 3;
const WORD_MAX_CHARS: usize = 50;

/// Structured record produced by the model. `original_text` must be present;
/// every other attribute is optional and consumers handle its absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_vocabulary: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub japanese_meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Short selections analyze as a word/phrase, everything else as a
/// sentence/paragraph. One rule for both the prompt and the saved Type
/// label: at most three whitespace tokens and fewer than 50 characters.
pub fn is_word_or_phrase(text: &str) -> bool {
    text.split_whitespace().count() <= WORD_MAX_TOKENS && text.chars().count() < WORD_MAX_CHARS
}

pub fn entry_type(text: &str) -> &'static str {
    if is_word_or_phrase(text) {
        "Word"
    } else {
        "Sentence"
    }
}

/// Parses the model's raw text into an [`AnalysisResult`], tolerating an
/// optional markdown code fence around the JSON payload.
pub fn normalize_response(raw: &str) -> Result<AnalysisResult, Error> {
    let stripped = strip_code_fence(raw);
    serde_json::from_str(&stripped).map_err(|err| Error::ResponseMalformed(err.to_string()))
}

fn strip_code_fence(raw: &str) -> String {
    let text = raw.trim();
    if text.starts_with("```json") {
        text.replace("```json\n", "")
            .replace("```json", "")
            .replace("```\n", "")
            .replace("```", "")
            .trim()
            .to_string()
    } else if text.starts_with("```") {
        text.replace("```\n", "").replace("```", "").trim().to_string()
    } else {
        text.to_string()
    }
}
