use serde_json::{Map, Value, json};

use super::richtext::{parse_markdown_bold, spans_to_rich_text};
use crate::analysis::{AnalysisResult, entry_type};

const TITLE_MAX_CHARS: usize = 100;
const TEXT_MAX_CHARS: usize = 2000;
const OPTION_MAX_CHARS: usize = 100;

pub const DEFAULT_TEMPLATE: &str = "default";

/// Rendering kind of one output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    LongText,
    SingleChoice,
    MultiChoice,
    Url,
}

/// One declared field: output property name, kind, and the analysis
/// attribute supplying its value.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub source: &'static str,
    pub default_choice: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldTemplate {
    pub name: &'static str,
    pub display_name: &'static str,
    pub fields: &'static [FieldSpec],
}

const fn field(name: &'static str, kind: FieldKind, source: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        source,
        default_choice: None,
    }
}

static DEFAULT_FIELDS: [FieldSpec; 7] = [
    field("Name", FieldKind::Title, "original_text"),
    field("Translation", FieldKind::LongText, "target_translation"),
    field("Type", FieldKind::SingleChoice, "type"),
    field("Analysis", FieldKind::LongText, "analysis"),
    field("Examples", FieldKind::LongText, "examples"),
    field("Tags", FieldKind::MultiChoice, "tags"),
    field("URL", FieldKind::Url, "url"),
];

static VOCABULARY_FIELDS: [FieldSpec; 5] = [
    field("単語", FieldKind::Title, "word"),
    field("読み方", FieldKind::LongText, "reading"),
    field("意味", FieldKind::LongText, "japanese_meaning"),
    FieldSpec {
        name: "ステータスウェア",
        kind: FieldKind::SingleChoice,
        source: "status",
        default_choice: Some("知らない単語・表現"),
    },
    field("例文", FieldKind::LongText, "example_sentence"),
];

static TEMPLATES: [FieldTemplate; 2] = [
    FieldTemplate {
        name: "default",
        display_name: "Default Template",
        fields: &DEFAULT_FIELDS,
    },
    FieldTemplate {
        name: "japanese-vocabulary",
        display_name: "Japanese Vocabulary",
        fields: &VOCABULARY_FIELDS,
    },
];

pub fn template_by_name(name: &str) -> Option<&'static FieldTemplate> {
    TEMPLATES.iter().find(|template| template.name == name)
}

pub fn template_names() -> Vec<&'static str> {
    TEMPLATES.iter().map(|template| template.name).collect()
}

enum SourceValue {
    Text(String),
    List(Vec<String>),
}

impl SourceValue {
    fn text(&self) -> Option<&str> {
        match self {
            SourceValue::Text(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn list(&self) -> Option<&[String]> {
        match self {
            SourceValue::List(values) if !values.is_empty() => Some(values),
            _ => None,
        }
    }
}

/// Maps an analysis result onto the template's declared fields, producing
/// the `properties` object of a Notion page-create request. Absent or empty
/// values omit their field; only the title has a fallback.
pub fn map_properties(
    result: &AnalysisResult,
    template: &FieldTemplate,
    url: &str,
) -> Map<String, Value> {
    let mut properties = Map::new();
    for field_spec in template.fields {
        let value = resolve_source(field_spec, result, url);
        match field_spec.kind {
            FieldKind::Title => {
                let text = value.as_ref().and_then(SourceValue::text).unwrap_or("Untitled");
                properties.insert(
                    field_spec.name.to_string(),
                    json!({
                        "title": [{ "text": { "content": truncate(text, TITLE_MAX_CHARS) } }]
                    }),
                );
            }
            FieldKind::LongText => {
                if let Some(text) = value.as_ref().and_then(SourceValue::text) {
                    let spans = parse_markdown_bold(&truncate(text, TEXT_MAX_CHARS));
                    properties.insert(
                        field_spec.name.to_string(),
                        json!({ "rich_text": spans_to_rich_text(&spans) }),
                    );
                }
            }
            FieldKind::SingleChoice => {
                let choice = value
                    .as_ref()
                    .and_then(SourceValue::text)
                    .or(field_spec.default_choice);
                if let Some(choice) = choice {
                    properties.insert(
                        field_spec.name.to_string(),
                        json!({ "select": { "name": choice } }),
                    );
                }
            }
            FieldKind::MultiChoice => {
                if let Some(items) = value.as_ref().and_then(SourceValue::list) {
                    let options = items
                        .iter()
                        .map(|item| {
                            let stripped = item.strip_prefix('#').unwrap_or(item);
                            json!({ "name": truncate(stripped, OPTION_MAX_CHARS) })
                        })
                        .collect::<Vec<_>>();
                    properties.insert(
                        field_spec.name.to_string(),
                        json!({ "multi_select": options }),
                    );
                }
            }
            FieldKind::Url => {
                if let Some(text) = value.as_ref().and_then(SourceValue::text) {
                    properties.insert(field_spec.name.to_string(), json!({ "url": text }));
                }
            }
        }
    }
    properties
}

// Flattened view over the analysis result plus request context, including
// the vocabulary fallback chain.
fn resolve_source(field_spec: &FieldSpec, result: &AnalysisResult, url: &str) -> Option<SourceValue> {
    let text = |value: &str| Some(SourceValue::Text(value.to_string()));
    match field_spec.source {
        "original_text" => text(&result.original_text),
        "target_translation" => result.target_translation.as_deref().and_then(text),
        "type" => text(entry_type(&result.original_text)),
        "analysis" => result.analysis.as_deref().and_then(text),
        "examples" => {
            if result.examples.is_empty() {
                None
            } else {
                text(&result.examples.join("\n"))
            }
        }
        "tags" => Some(SourceValue::List(result.tags.clone())),
        "related_vocabulary" => Some(SourceValue::List(result.related_vocabulary.clone())),
        "url" => text(url),
        "word" => result
            .word
            .as_deref()
            .and_then(text)
            .or_else(|| text(&result.original_text)),
        "reading" => result.reading.as_deref().and_then(text),
        "meaning" => result
            .meaning
            .as_deref()
            .and_then(text)
            .or_else(|| result.target_translation.as_deref().and_then(text)),
        "japanese_meaning" => result.japanese_meaning.as_deref().and_then(text),
        "example_sentence" => result
            .example_sentence
            .as_deref()
            .and_then(text)
            .or_else(|| result.examples.first().map(String::as_str).and_then(text)),
        "status" => result.status.as_deref().and_then(text),
        _ => None,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(original: &str) -> AnalysisResult {
        AnalysisResult {
            original_text: original.to_string(),
            target_translation: None,
            analysis: None,
            examples: Vec::new(),
            tags: Vec::new(),
            related_vocabulary: Vec::new(),
            word: None,
            reading: None,
            meaning: None,
            japanese_meaning: None,
            example_sentence: None,
            status: None,
        }
    }

    #[test]
    fn default_template_round_trip() {
        let mut data = result("hello world");
        data.target_translation = Some("t".to_string());
        data.tags = vec!["#a".to_string(), "#b".to_string()];
        let template = template_by_name("default").unwrap();

        let properties = map_properties(&data, template, "https://example.com");

        assert_eq!(
            properties["Name"]["title"][0]["text"]["content"],
            "hello world"
        );
        assert_eq!(properties["Type"]["select"]["name"], "Word");
        assert_eq!(properties["Tags"]["multi_select"][0]["name"], "a");
        assert_eq!(properties["Tags"]["multi_select"][1]["name"], "b");
        assert_eq!(properties["URL"]["url"], "https://example.com");
        // absent optionals are omitted, not written empty
        assert!(!properties.contains_key("Analysis"));
        assert!(!properties.contains_key("Examples"));
    }

    #[test]
    fn title_truncates_to_100_chars() {
        let data = result(&"x".repeat(150));
        let template = template_by_name("default").unwrap();
        let properties = map_properties(&data, template, "");
        let title = properties["Name"]["title"][0]["text"]["content"]
            .as_str()
            .unwrap();
        assert_eq!(title.chars().count(), 100);
    }

    #[test]
    fn missing_title_value_falls_back_to_untitled() {
        let data = result("");
        let template = template_by_name("default").unwrap();
        let properties = map_properties(&data, template, "");
        assert_eq!(properties["Name"]["title"][0]["text"]["content"], "Untitled");
    }

    #[test]
    fn long_sentence_classifies_as_sentence() {
        let data = result("this is a longer sentence to classify");
        let template = template_by_name("default").unwrap();
        let properties = map_properties(&data, template, "");
        assert_eq!(properties["Type"]["select"]["name"], "Sentence");
    }

    #[test]
    fn long_text_converts_bold_markers() {
        let mut data = result("食べる");
        data.analysis = Some("動詞。毎日**勉強して**います".to_string());
        let template = template_by_name("default").unwrap();
        let properties = map_properties(&data, template, "");
        let rich = &properties["Analysis"]["rich_text"];
        assert_eq!(rich[1]["text"]["content"], "勉強して");
        assert_eq!(rich[1]["annotations"]["bold"], true);
    }

    #[test]
    fn vocabulary_template_applies_fallback_chain() {
        let mut data = result("勉強");
        data.target_translation = Some("study".to_string());
        data.examples = vec!["毎日**勉強して**います".to_string()];
        let template = template_by_name("japanese-vocabulary").unwrap();

        let properties = map_properties(&data, template, "");

        // word falls back to original_text
        assert_eq!(properties["単語"]["title"][0]["text"]["content"], "勉強");
        // status falls back to the template default
        assert_eq!(
            properties["ステータスウェア"]["select"]["name"],
            "知らない単語・表現"
        );
        // example sentence falls back to the first example
        assert_eq!(
            properties["例文"]["rich_text"][1]["text"]["content"],
            "勉強して"
        );
        // reading has no fallback and is omitted
        assert!(!properties.contains_key("読み方"));
    }

    #[test]
    fn explicit_status_wins_over_default() {
        let mut data = result("勉強");
        data.status = Some("復習中".to_string());
        let template = template_by_name("japanese-vocabulary").unwrap();
        let properties = map_properties(&data, template, "");
        assert_eq!(properties["ステータスウェア"]["select"]["name"], "復習中");
    }

    #[test]
    fn unknown_template_name_is_none() {
        assert!(template_by_name("nope").is_none());
        assert_eq!(template_names(), vec!["default", "japanese-vocabulary"]);
    }
}
