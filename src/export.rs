use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::Error;
use crate::locales::LocaleCatalog;
use crate::notion::template::DEFAULT_TEMPLATE;
use crate::settings::{self, NotionDatabaseConfig, Settings};
use crate::store::{self, HistoryEntry, UsageStatistics};

pub const FORMAT_VERSION: u32 = 1;

/// The single downloadable document: settings, history, and statistics
/// plus a format version and export timestamp.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    #[serde(default)]
    pub exported_at: String,
    pub settings: ExportedSettings,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub statistics: UsageStatistics,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_ui_language")]
    pub ui_language: String,
    #[serde(default)]
    pub notion_databases: Vec<ExportedDatabase>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedDatabase {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub token: String,
    pub database_id: String,
    #[serde(default = "default_template_name")]
    pub template: String,
    #[serde(default, rename = "isDefault")]
    pub is_default: bool,
}

fn default_target_language() -> String {
    settings::DEFAULT_TARGET_LANGUAGE.to_string()
}

fn default_ui_language() -> String {
    crate::locales::DEFAULT_LOCALE.to_string()
}

fn default_template_name() -> String {
    DEFAULT_TEMPLATE.to_string()
}

/// Serializes the full configuration to a JSON document.
pub fn render_export(settings: &Settings) -> Result<String> {
    let (history, statistics) = store::snapshot()?;
    let document = ExportDocument {
        version: FORMAT_VERSION,
        exported_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string()),
        settings: ExportedSettings {
            gemini_api_key: settings.gemini_api_key.clone(),
            target_language: settings.target_language.clone(),
            ui_language: settings.ui_language.clone(),
            notion_databases: settings
                .notion_databases
                .iter()
                .map(|db| ExportedDatabase {
                    id: db.id.clone(),
                    name: db.name.clone(),
                    token: db.token.clone(),
                    database_id: db.database_id.clone(),
                    template: db.template.clone(),
                    is_default: db.default,
                })
                .collect(),
        },
        history,
        statistics,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parses and applies an exported document. Validation happens before any
/// state is touched; a malformed document changes nothing.
pub fn apply_import(
    content: &str,
    catalog: &LocaleCatalog,
    locale: &str,
) -> Result<Settings> {
    let document = parse_document(content, catalog, locale)?;

    let imported = Settings {
        gemini_api_key: document.settings.gemini_api_key,
        gemini_model: crate::gemini::DEFAULT_MODEL.to_string(),
        target_language: document.settings.target_language,
        ui_language: document.settings.ui_language,
        notion_databases: document
            .settings
            .notion_databases
            .into_iter()
            .map(|db| NotionDatabaseConfig {
                id: db.id,
                name: db.name,
                token: db.token,
                database_id: db.database_id,
                template: db.template,
                default: db.is_default,
            })
            .collect(),
    };

    settings::save_settings(&imported).with_context(|| "failed to apply imported settings")?;
    store::replace_state(document.history, document.statistics)
        .with_context(|| "failed to apply imported state")?;
    Ok(imported)
}

fn parse_document(
    content: &str,
    catalog: &LocaleCatalog,
    locale: &str,
) -> Result<ExportDocument> {
    serde_json::from_str(content)
        .map_err(|_| Error::ConfigurationMissing(catalog.message(locale, "invalid_config")).into())
}
