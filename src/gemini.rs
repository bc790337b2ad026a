use serde::Deserialize;
use serde_json::json;

use crate::error::Error;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    /// Sends the instruction prompt plus the text to analyze and returns
    /// the model's raw generated text. A single attempt; failures are
    /// terminal for the action.
    pub async fn generate(&self, prompt: &str, text: &str) -> Result<String, Error> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            BASE_URL, self.model, self.key
        );
        let body = json!({
            "contents": [{
                "parts": [{
                    "text": format!("{}\n\nText to analyze: \"{}\"", prompt, text)
                }]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 2048
            }
        });

        let client = reqwest::Client::new();
        let response = client.post(&url).json(&body).send().await?;
        let status = response.status();
        let payload = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::UpstreamRequestFailed(format!(
                "Gemini API error ({}): {}",
                status,
                extract_gemini_error(&payload).unwrap_or(payload)
            )));
        }
        extract_generated_text(&payload)
    }
}

fn extract_generated_text(payload: &str) -> Result<String, Error> {
    let parsed: GeminiResponse = serde_json::from_str(payload).map_err(|err| {
        Error::UpstreamRequestFailed(format!("failed to parse Gemini response JSON: {}", err))
    })?;
    parsed
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .and_then(|part| part.text.clone())
        .ok_or_else(|| Error::UpstreamRequestFailed("no candidate returned from Gemini".to_string()))
}

fn extract_gemini_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<GeminiError>,
    }

    #[derive(Deserialize)]
    struct GeminiError {
        message: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error?
        .message
        .filter(|message| !message.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_candidate_text() {
        let payload = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "{\"original_text\":\"x\"}" }] }
            }]
        }"#;
        let text = extract_generated_text(payload).unwrap();
        assert_eq!(text, "{\"original_text\":\"x\"}");
    }

    #[test]
    fn missing_candidates_is_an_upstream_failure() {
        let err = extract_generated_text(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, Error::UpstreamRequestFailed(_)));
    }

    #[test]
    fn surfaces_embedded_error_message() {
        let body = r#"{"error": {"message": "API key not valid", "code": 400}}"#;
        assert_eq!(
            extract_gemini_error(body).as_deref(),
            Some("API key not valid")
        );
        assert_eq!(extract_gemini_error("not json"), None);
    }
}
