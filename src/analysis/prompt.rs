use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use tera::{Context as TeraContext, Tera};

use super::TARGET_CHINESE;

const HINT_JAPANESE: &str = "The source text is in Japanese. ";
const HINT_PREFER_JAPANESE: &str =
    "If the source language is ambiguous between Chinese and Japanese, treat it as Japanese. ";

// CJK unified ideographs plus whitespace and punctuation, no kana.
static KANJI_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\u{4E00}-\u{9FAF}\s\p{P}]+$").expect("kanji-only pattern"));

/// Disambiguation hint for Chinese targets. Kana anywhere marks the source
/// as Japanese outright; an all-ideograph text gets the weaker
/// prefer-Japanese hint. Lossy on purpose: pure-Kanji Chinese text lands in
/// the ambiguous bucket too.
pub fn source_language_hint(target_language: &str, text: &str) -> Option<&'static str> {
    if target_language != TARGET_CHINESE {
        return None;
    }
    let has_kana = text.chars().any(|ch| {
        let code = ch as u32;
        (0x3040..=0x309F).contains(&code) || (0x30A0..=0x30FF).contains(&code)
    });
    if has_kana {
        return Some(HINT_JAPANESE);
    }
    if KANJI_ONLY.is_match(text) {
        return Some(HINT_PREFER_JAPANESE);
    }
    None
}

/// Renders the instruction string sent ahead of the text to analyze.
/// Deterministic for identical inputs.
pub fn render_system_prompt(
    target_language: &str,
    is_word: bool,
    source_text: &str,
) -> Result<String> {
    let template = load_prompt_template("system_prompt.tera")?;
    let hint = source_language_hint(target_language, source_text).unwrap_or("");
    let mut context = TeraContext::new();
    context.insert("target_language", target_language);
    context.insert("source_hint", hint);
    context.insert("is_word", &is_word);
    Tera::one_off(&template, &context, false).with_context(|| "failed to render system prompt")
}

fn load_prompt_template(name: &str) -> Result<String> {
    let path = prompt_path(name);
    fs::read_to_string(&path).with_context(|| format!("failed to read prompt: {}", path.display()))
}

fn prompt_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("analysis")
        .join("prompts")
        .join(name)
}
