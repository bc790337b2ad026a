use anyhow::{Context, Result, anyhow};
use std::path::Path;
use time::{OffsetDateTime, format_description};

pub mod analysis;
pub mod error;
pub mod export;
pub mod gemini;
pub mod locales;
pub mod logging;
pub mod notion;
pub mod server;
pub mod settings;
pub mod store;
mod test_util;

pub use analysis::AnalysisResult;
pub use error::Error;

use locales::LocaleCatalog;
use settings::Settings;
use store::{HistoryEntry, StatAction, UsageStatistics};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub url: Option<String>,
    pub lang: Option<String>,
    pub ui_lang: Option<String>,
    pub key: Option<String>,
    pub database: Option<String>,
    pub save: bool,
    pub json: bool,
    pub show_history: bool,
    pub search: Option<String>,
    pub delete_history: Option<String>,
    pub clear_history: bool,
    pub save_history: Option<String>,
    pub show_statistics: bool,
    pub show_database_name: bool,
    pub show_target_languages: bool,
    pub export_path: Option<String>,
    pub import_path: Option<String>,
    pub settings_path: Option<String>,
    pub serve: Option<String>,
    pub verbose: bool,
}

pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    apply_overrides(&mut settings, &config);
    let catalog = LocaleCatalog::load()?;
    let locale = settings.ui_language.clone();

    if config.show_target_languages {
        return Ok(analysis::TARGET_LANGUAGES.join("\n"));
    }

    if let Some(addr) = config.serve.clone() {
        server::run_server(settings, catalog, addr).await?;
        return Ok(String::new());
    }

    if config.show_history || config.search.is_some() {
        let entries = match config.search.as_deref() {
            Some(query) => store::search_history(query)?,
            None => store::get_history()?,
        };
        return Ok(format_history(&entries, &catalog, &locale));
    }

    if let Some(id) = config.delete_history.as_deref() {
        if store::delete_history(id)? {
            return Ok(format!("deleted history entry {}", id));
        }
        return Err(anyhow!("history entry not found: {}", id));
    }

    if config.clear_history {
        store::clear_history()?;
        return Ok("history cleared".to_string());
    }

    if config.show_statistics {
        let stats = store::get_statistics()?;
        return Ok(format_statistics(&stats, &catalog, &locale));
    }

    if let Some(path) = config.export_path.as_deref() {
        let document = export::render_export(&settings)?;
        std::fs::write(path, document)
            .with_context(|| format!("failed to write export: {}", path))?;
        return Ok(catalog.message(&locale, "config_exported"));
    }

    if let Some(path) = config.import_path.as_deref() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read import: {}", path))?;
        export::apply_import(&content, &catalog, &locale)?;
        return Ok(catalog.message(&locale, "config_imported"));
    }

    if config.show_database_name {
        let database = settings
            .resolve_database(config.database.as_deref())
            .ok_or_else(|| {
                Error::ConfigurationMissing(catalog.message(&locale, "notion_configure"))
            })?;
        let name = notion::get_database_name(&database.token, &database.database_id).await?;
        return Ok(name);
    }

    if let Some(id) = config.save_history.as_deref() {
        let entry =
            store::find_history(id)?.ok_or_else(|| anyhow!("history entry not found: {}", id))?;
        save_analysis(
            &settings,
            &catalog,
            &entry.result,
            &entry.url,
            config.database.as_deref(),
        )
        .await?;
        return Ok(catalog.message(&locale, "saved_success"));
    }

    let input = input.unwrap_or_default();
    let text = input.trim();
    if text.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }
    let url = config.url.clone().unwrap_or_default();

    let result = analyze_text(&settings, text, &url).await?;
    let mut output = if config.json {
        serde_json::to_string_pretty(&result)?
    } else {
        format_analysis(&result, &catalog, &locale)
    };

    if config.save {
        save_analysis(&settings, &catalog, &result, &url, config.database.as_deref()).await?;
        output.push('\n');
        output.push_str(&catalog.message(&locale, "saved_success"));
    }
    Ok(output)
}

/// One analysis action: build the prompt, call the model, normalize the
/// response, then append history and bump the analyze counter best-effort.
pub async fn analyze_text(
    settings: &Settings,
    text: &str,
    url: &str,
) -> std::result::Result<AnalysisResult, Error> {
    let key = settings
        .gemini_api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            Error::ConfigurationMissing(
                "Please configure your Gemini API key in settings".to_string(),
            )
        })?;

    let is_word = analysis::is_word_or_phrase(text);
    let prompt = analysis::render_system_prompt(&settings.target_language, is_word, text)
        .map_err(|err| Error::ConfigurationMissing(format!("prompt template unavailable: {}", err)))?;

    let client = gemini::GeminiClient::new(key).with_model(&settings.gemini_model);
    let raw = client.generate(&prompt, text).await?;
    let result = analysis::normalize_response(&raw)?;

    // best-effort; a storage failure never fails the analysis
    if let Err(err) = store::append_history(HistoryEntry::new(text, url, result.clone())) {
        tracing::warn!("failed to persist history: {}", err);
    }
    if let Err(err) = store::record_action(StatAction::Analyze) {
        tracing::warn!("failed to update statistics: {}", err);
    }
    Ok(result)
}

/// Saves an analysis to Notion. The save counter only moves after the
/// remote write succeeded.
pub async fn save_analysis(
    settings: &Settings,
    catalog: &LocaleCatalog,
    result: &AnalysisResult,
    url: &str,
    database_id: Option<&str>,
) -> std::result::Result<(), Error> {
    notion::save_record(settings, catalog, result, url, database_id).await?;
    if let Err(err) = store::record_action(StatAction::Save) {
        tracing::warn!("failed to update statistics: {}", err);
    }
    Ok(())
}

fn apply_overrides(settings: &mut Settings, config: &Config) {
    if let Some(lang) = config.lang.as_deref()
        && !lang.trim().is_empty()
    {
        settings.target_language = lang.trim().to_string();
    }
    if let Some(ui_lang) = config.ui_lang.as_deref()
        && !ui_lang.trim().is_empty()
    {
        settings.ui_language = ui_lang.trim().to_lowercase();
    }
    if let Some(key) = config.key.as_deref()
        && !key.trim().is_empty()
    {
        settings.gemini_api_key = Some(key.trim().to_string());
    }
}

fn format_analysis(result: &AnalysisResult, catalog: &LocaleCatalog, locale: &str) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{}: {}",
        catalog.message(locale, "original_text"),
        result.original_text
    ));
    if let Some(translation) = result.target_translation.as_deref() {
        lines.push(format!(
            "{}: {}",
            catalog.message(locale, "translation"),
            translation
        ));
    }
    if let Some(analysis) = result.analysis.as_deref() {
        lines.push(format!("{}: {}", catalog.message(locale, "analysis"), analysis));
    }
    if !result.examples.is_empty() {
        lines.push(format!("{}:", catalog.message(locale, "examples")));
        for example in &result.examples {
            lines.push(format!("  - {}", example));
        }
    }
    if !result.tags.is_empty() {
        lines.push(format!(
            "{}: {}",
            catalog.message(locale, "tags"),
            result.tags.join(" ")
        ));
    }
    if !result.related_vocabulary.is_empty() {
        lines.push(format!(
            "{}: {}",
            catalog.message(locale, "related_vocabulary"),
            result.related_vocabulary.join(", ")
        ));
    }
    lines.join("\n")
}

fn format_history(entries: &[HistoryEntry], catalog: &LocaleCatalog, locale: &str) -> String {
    if entries.is_empty() {
        return catalog.message(locale, "no_history");
    }
    entries
        .iter()
        .map(|entry| {
            let translation = entry.result.target_translation.as_deref().unwrap_or("");
            format!(
                "{}\t{}\t{}\t{}",
                entry.id,
                format_history_datetime(entry.timestamp),
                entry.original_text,
                translation
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_statistics(
    stats: &UsageStatistics,
    catalog: &LocaleCatalog,
    locale: &str,
) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{}: {}",
        catalog.message(locale, "total_analyses"),
        stats.total_analyses
    ));
    lines.push(format!(
        "{}: {}",
        catalog.message(locale, "total_saves"),
        stats.total_saves
    ));

    let mut dates = stats
        .daily_analyses
        .keys()
        .chain(stats.daily_saves.keys())
        .cloned()
        .collect::<Vec<_>>();
    dates.sort();
    dates.dedup();
    for date in dates {
        let analyses = stats.daily_analyses.get(&date).copied().unwrap_or(0);
        let saves = stats.daily_saves.get(&date).copied().unwrap_or(0);
        lines.push(format!("{}\t{}\t{}", date, analyses, saves));
    }
    lines.join("\n")
}

fn format_history_datetime(timestamp_millis: u64) -> String {
    let Ok(datetime) = OffsetDateTime::from_unix_timestamp((timestamp_millis / 1000) as i64) else {
        return "unknown".to_string();
    };
    let format = format_description::parse("[year]-[month]-[day] [hour]:[minute]");
    if let Ok(format) = format
        && let Ok(rendered) = datetime.format(&format)
    {
        return rendered;
    }
    datetime.date().to_string()
}
