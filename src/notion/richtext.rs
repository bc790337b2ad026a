use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern"));

/// A contiguous run of text, plain or bold, in Notion's rich-text model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichTextSpan {
    pub text: String,
    pub bold: bool,
}

/// Splits `**bold**` markers into ordered spans. All non-marker text is
/// preserved verbatim; a string without markers yields one plain span.
pub fn parse_markdown_bold(text: &str) -> Vec<RichTextSpan> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut last = 0;
    for caps in BOLD.captures_iter(text) {
        let whole = caps.get(0).expect("whole match");
        if whole.start() > last {
            spans.push(RichTextSpan {
                text: text[last..whole.start()].to_string(),
                bold: false,
            });
        }
        spans.push(RichTextSpan {
            text: caps[1].to_string(),
            bold: true,
        });
        last = whole.end();
    }
    if last < text.len() {
        spans.push(RichTextSpan {
            text: text[last..].to_string(),
            bold: false,
        });
    }

    if spans.is_empty() {
        spans.push(RichTextSpan {
            text: text.to_string(),
            bold: false,
        });
    }
    spans
}

pub fn spans_to_rich_text(spans: &[RichTextSpan]) -> Vec<Value> {
    spans
        .iter()
        .map(|span| {
            if span.bold {
                json!({
                    "text": { "content": span.text },
                    "annotations": { "bold": true }
                })
            } else {
                json!({ "text": { "content": span.text } })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, bold: bool) -> RichTextSpan {
        RichTextSpan {
            text: text.to_string(),
            bold,
        }
    }

    #[test]
    fn splits_bold_span_with_surrounding_text() {
        assert_eq!(
            parse_markdown_bold("a **b** c"),
            vec![span("a ", false), span("b", true), span(" c", false)]
        );
    }

    #[test]
    fn text_without_markers_is_one_plain_span() {
        assert_eq!(
            parse_markdown_bold("plain text"),
            vec![span("plain text", false)]
        );
    }

    #[test]
    fn handles_multiple_and_adjacent_bold_spans() {
        assert_eq!(
            parse_markdown_bold("**a****b**"),
            vec![span("a", true), span("b", true)]
        );
        assert_eq!(
            parse_markdown_bold("毎日**勉強して**います"),
            vec![span("毎日", false), span("勉強して", true), span("います", false)]
        );
    }

    #[test]
    fn unbalanced_markers_stay_plain() {
        assert_eq!(
            parse_markdown_bold("a **b c"),
            vec![span("a **b c", false)]
        );
    }

    #[test]
    fn empty_input_yields_no_spans() {
        assert!(parse_markdown_bold("").is_empty());
    }

    #[test]
    fn bold_spans_carry_annotations_in_json() {
        let values = spans_to_rich_text(&parse_markdown_bold("a **b**"));
        assert_eq!(values[0]["text"]["content"], "a ");
        assert!(values[0].get("annotations").is_none());
        assert_eq!(values[1]["annotations"]["bold"], true);
    }
}
