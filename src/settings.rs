use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::gemini::DEFAULT_MODEL;
use crate::locales::DEFAULT_LOCALE;
use crate::notion::template::DEFAULT_TEMPLATE;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

pub const DEFAULT_TARGET_LANGUAGE: &str = "English";

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub target_language: String,
    pub ui_language: String,
    pub notion_databases: Vec<NotionDatabaseConfig>,
}

/// Credentials and identifier for one Notion database the user can save
/// into, plus the field template bound to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionDatabaseConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub token: String,
    pub database_id: String,
    #[serde(default = "default_template_name")]
    pub template: String,
    #[serde(default)]
    pub default: bool,
}

fn default_template_name() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            ui_language: DEFAULT_LOCALE.to_string(),
            notion_databases: Vec::new(),
        }
    }
}

impl Settings {
    /// Resolves the database a save should go to: explicit id first, then
    /// the one marked default, then the first configured.
    pub fn resolve_database(&self, id: Option<&str>) -> Option<&NotionDatabaseConfig> {
        id.and_then(|id| self.notion_databases.iter().find(|db| db.id == id))
            .or_else(|| self.notion_databases.iter().find(|db| db.default))
            .or_else(|| self.notion_databases.first())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    gemini: Option<GeminiSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<SystemSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notion: Option<NotionSettings>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_language: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SystemSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    ui_language: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NotionSettings {
    // legacy single-database shape
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    databases: Option<Vec<NotionDatabaseConfig>>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let mut legacy = LegacyNotion::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            merge(&mut settings, &mut legacy, parsed);
        }
    }

    upgrade_legacy(&mut settings, legacy);
    Ok(settings)
}

/// Persists the settings to the home settings file. Used by import.
pub fn save_settings(settings: &Settings) -> Result<()> {
    let home = home_dir().ok_or_else(|| anyhow!("HOME is not set"))?;
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let file = to_settings_file(settings);
    let content = toml::to_string_pretty(&file)?;
    let path = home.join("settings.toml");
    fs::write(&path, content)
        .with_context(|| format!("failed to write settings: {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Default)]
struct LegacyNotion {
    token: Option<String>,
    database_id: Option<String>,
}

fn merge(settings: &mut Settings, legacy: &mut LegacyNotion, incoming: SettingsFile) {
    if let Some(gemini) = incoming.gemini {
        if let Some(key) = gemini.api_key
            && !key.trim().is_empty()
        {
            settings.gemini_api_key = Some(key);
        }
        if let Some(model) = gemini.model
            && !model.trim().is_empty()
        {
            settings.gemini_model = model;
        }
        if let Some(language) = gemini.target_language
            && !language.trim().is_empty()
        {
            settings.target_language = language;
        }
    }
    if let Some(system) = incoming.system
        && let Some(language) = system.ui_language
        && !language.trim().is_empty()
    {
        settings.ui_language = language;
    }
    if let Some(notion) = incoming.notion {
        if let Some(token) = notion.token {
            legacy.token = Some(token);
        }
        if let Some(database_id) = notion.database_id {
            legacy.database_id = Some(database_id);
        }
        if let Some(databases) = notion.databases {
            settings.notion_databases = databases;
        }
    }
}

// One-time upgrade of the legacy single-database shape. The multi-database
// list is canonical: when both coexist, the legacy keys are ignored.
fn upgrade_legacy(settings: &mut Settings, legacy: LegacyNotion) {
    if !settings.notion_databases.is_empty() {
        return;
    }
    let (Some(token), Some(database_id)) = (legacy.token, legacy.database_id) else {
        return;
    };
    if token.trim().is_empty() || database_id.trim().is_empty() {
        return;
    }
    settings.notion_databases.push(NotionDatabaseConfig {
        id: "legacy".to_string(),
        name: "Notion Database".to_string(),
        token,
        database_id,
        template: DEFAULT_TEMPLATE.to_string(),
        default: true,
    });
}

fn to_settings_file(settings: &Settings) -> SettingsFile {
    SettingsFile {
        gemini: Some(GeminiSettings {
            api_key: settings.gemini_api_key.clone(),
            model: Some(settings.gemini_model.clone()),
            target_language: Some(settings.target_language.clone()),
        }),
        system: Some(SystemSettings {
            ui_language: Some(settings.ui_language.clone()),
        }),
        notion: Some(NotionSettings {
            token: None,
            database_id: None,
            databases: Some(settings.notion_databases.clone()),
        }),
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".selectwise"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn defaults_apply_without_any_settings_file() {
        with_temp_home(|_| {
            let settings = load_settings(None).unwrap();
            assert_eq!(settings.target_language, "English");
            assert_eq!(settings.ui_language, "en");
            assert!(settings.notion_databases.is_empty());
        });
    }

    #[test]
    fn home_settings_override_defaults() {
        with_temp_home(|_| {
            let home = home_dir().unwrap();
            fs::create_dir_all(&home).unwrap();
            fs::write(
                home.join("settings.toml"),
                "[gemini]\napi_key = \"k\"\ntarget_language = \"中文\"\n\n[system]\nui_language = \"ja\"\n",
            )
            .unwrap();
            let settings = load_settings(None).unwrap();
            assert_eq!(settings.gemini_api_key.as_deref(), Some("k"));
            assert_eq!(settings.target_language, "中文");
            assert_eq!(settings.ui_language, "ja");
        });
    }

    #[test]
    fn legacy_single_database_upgrades_to_default_collection() {
        with_temp_home(|_| {
            let home = home_dir().unwrap();
            fs::create_dir_all(&home).unwrap();
            fs::write(
                home.join("settings.toml"),
                "[notion]\ntoken = \"secret\"\ndatabase_id = \"abc123\"\n",
            )
            .unwrap();
            let settings = load_settings(None).unwrap();
            assert_eq!(settings.notion_databases.len(), 1);
            let db = &settings.notion_databases[0];
            assert_eq!(db.token, "secret");
            assert_eq!(db.template, "default");
            assert!(db.default);
        });
    }

    #[test]
    fn database_list_wins_over_legacy_keys() {
        with_temp_home(|_| {
            let home = home_dir().unwrap();
            fs::create_dir_all(&home).unwrap();
            fs::write(
                home.join("settings.toml"),
                concat!(
                    "[notion]\n",
                    "token = \"old\"\n",
                    "database_id = \"old-db\"\n\n",
                    "[[notion.databases]]\n",
                    "id = \"work\"\n",
                    "token = \"new\"\n",
                    "database_id = \"new-db\"\n",
                ),
            )
            .unwrap();
            let settings = load_settings(None).unwrap();
            assert_eq!(settings.notion_databases.len(), 1);
            assert_eq!(settings.notion_databases[0].token, "new");
            // missing template defaults to the generic one
            assert_eq!(settings.notion_databases[0].template, "default");
        });
    }

    #[test]
    fn resolve_database_prefers_id_then_default_then_first() {
        let db = |id: &str, default: bool| NotionDatabaseConfig {
            id: id.to_string(),
            name: String::new(),
            token: "t".to_string(),
            database_id: "d".to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            default,
        };
        let mut settings = Settings {
            notion_databases: vec![db("a", false), db("b", true), db("c", false)],
            ..Settings::default()
        };

        assert_eq!(settings.resolve_database(Some("c")).unwrap().id, "c");
        assert_eq!(settings.resolve_database(Some("missing")).unwrap().id, "b");
        assert_eq!(settings.resolve_database(None).unwrap().id, "b");

        settings.notion_databases[1].default = false;
        assert_eq!(settings.resolve_database(None).unwrap().id, "a");
    }
}
