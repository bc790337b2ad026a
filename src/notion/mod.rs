use serde::Deserialize;
use serde_json::json;

use crate::analysis::AnalysisResult;
use crate::error::Error;
use crate::locales::LocaleCatalog;
use crate::settings::Settings;

pub mod richtext;
pub mod template;

const BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Creates a page for the analysis in the resolved database. Failures are
/// classified: missing/unusable configuration versus a write the service
/// rejected, each with a localized message.
pub async fn save_record(
    settings: &Settings,
    catalog: &LocaleCatalog,
    result: &AnalysisResult,
    url: &str,
    database_id: Option<&str>,
) -> Result<(), Error> {
    let locale = settings.ui_language.as_str();
    if settings.notion_databases.is_empty() {
        return Err(Error::ConfigurationMissing(
            catalog.message(locale, "notion_configure"),
        ));
    }

    let database = settings
        .resolve_database(database_id)
        .filter(|db| !db.token.trim().is_empty() && !db.database_id.trim().is_empty())
        .ok_or_else(|| {
            Error::ConfigurationMissing(catalog.message(locale, "notion_configure"))
        })?;

    let template = template::template_by_name(&database.template).ok_or_else(|| {
        Error::ConfigurationMissing(format!("invalid database template: {}", database.template))
    })?;

    let properties = template::map_properties(result, template, url);
    let body = json!({
        "parent": { "database_id": database.database_id },
        "properties": properties
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/pages", BASE_URL))
        .bearer_auth(&database.token)
        .header("Notion-Version", NOTION_VERSION)
        .json(&body)
        .send()
        .await
        .map_err(|_| Error::SaveRejected(catalog.message(locale, "notion_save_failed")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        tracing::warn!("Notion save rejected ({}): {}", status, detail);
        return Err(Error::SaveRejected(
            catalog.message(locale, "notion_save_failed"),
        ));
    }
    Ok(())
}

/// Fetches a database's display title, joining the plain-text runs.
pub async fn get_database_name(token: &str, database_id: &str) -> Result<String, Error> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/databases/{}", BASE_URL, database_id))
        .bearer_auth(token)
        .header("Notion-Version", NOTION_VERSION)
        .send()
        .await?;

    let status = response.status();
    let payload = response.text().await.unwrap_or_default();
    if !status.is_success() {
        tracing::warn!("Notion metadata request failed ({}): {}", status, payload);
        return Err(Error::UpstreamRequestFailed(
            "failed to fetch database information".to_string(),
        ));
    }

    let parsed: DatabaseResponse = serde_json::from_str(&payload).map_err(|err| {
        Error::UpstreamRequestFailed(format!("failed to parse Notion response JSON: {}", err))
    })?;
    Ok(database_title(&parsed))
}

fn database_title(response: &DatabaseResponse) -> String {
    let joined = response
        .title
        .iter()
        .filter_map(|run| run.plain_text.as_deref())
        .collect::<String>();
    if joined.is_empty() {
        "Untitled Database".to_string()
    } else {
        joined
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseResponse {
    #[serde(default)]
    title: Vec<TitleRun>,
}

#[derive(Debug, Deserialize)]
struct TitleRun {
    plain_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_title_joins_plain_text_runs() {
        let parsed: DatabaseResponse = serde_json::from_str(
            r#"{"title": [{"plain_text": "Language "}, {"plain_text": "Notes"}]}"#,
        )
        .unwrap();
        assert_eq!(database_title(&parsed), "Language Notes");
    }

    #[test]
    fn empty_title_defaults() {
        let parsed: DatabaseResponse = serde_json::from_str(r#"{"title": []}"#).unwrap();
        assert_eq!(database_title(&parsed), "Untitled Database");
    }

    #[test]
    fn save_failure_checklist_carries_four_checks_in_every_locale() {
        let catalog = LocaleCatalog::load().unwrap();
        for locale in crate::locales::SUPPORTED_LOCALES {
            let message = catalog.message(locale, "notion_save_failed");
            assert_eq!(message.matches('✓').count(), 4, "locale {}", locale);
        }
    }
}
