use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use time::{Duration, OffsetDateTime, format_description};

use crate::analysis::AnalysisResult;
use crate::settings;

pub const HISTORY_LIMIT: usize = 100;
const STATS_RETENTION_DAYS: i64 = 90;

// Serializes the read-modify-write cycle on the state file so that
// append-and-cap and increment-and-prune are atomic.
static STATE_MUTEX: Mutex<()> = Mutex::new(());

/// One analysis kept in the rolling local log, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: u64,
    #[serde(rename = "originalText")]
    pub original_text: String,
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

impl HistoryEntry {
    pub fn new(original_text: &str, url: &str, result: AnalysisResult) -> Self {
        let now = now_unix_millis();
        Self {
            id: now.to_string(),
            timestamp: now,
            original_text: original_text.to_string(),
            url: url.to_string(),
            result,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatistics {
    #[serde(default)]
    pub total_analyses: u64,
    #[serde(default)]
    pub total_saves: u64,
    #[serde(default)]
    pub daily_analyses: BTreeMap<String, u64>,
    #[serde(default)]
    pub daily_saves: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy)]
pub enum StatAction {
    Analyze,
    Save,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    history: Vec<HistoryEntry>,
    #[serde(default)]
    statistics: UsageStatistics,
}

/// Prepends an entry and enforces the cap, dropping the oldest entries.
pub fn append_history(entry: HistoryEntry) -> Result<()> {
    let _guard = STATE_MUTEX.lock().expect("state lock");
    let mut state = read_state()?;
    state.history.insert(0, entry);
    state.history.truncate(HISTORY_LIMIT);
    write_state(&state)
}

pub fn get_history() -> Result<Vec<HistoryEntry>> {
    let state = read_state()?;
    Ok(state.history)
}

pub fn search_history(query: &str) -> Result<Vec<HistoryEntry>> {
    let needle = query.trim().to_lowercase();
    let history = get_history()?;
    if needle.is_empty() {
        return Ok(history);
    }
    Ok(history
        .into_iter()
        .filter(|entry| {
            entry.original_text.to_lowercase().contains(&needle)
                || entry
                    .result
                    .target_translation
                    .as_deref()
                    .is_some_and(|value| value.to_lowercase().contains(&needle))
                || entry
                    .result
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle))
        })
        .collect())
}

pub fn find_history(id: &str) -> Result<Option<HistoryEntry>> {
    let history = get_history()?;
    Ok(history.into_iter().find(|entry| entry.id == id))
}

/// Removes one entry by id; returns whether anything was deleted.
pub fn delete_history(id: &str) -> Result<bool> {
    let _guard = STATE_MUTEX.lock().expect("state lock");
    let mut state = read_state()?;
    let before = state.history.len();
    state.history.retain(|entry| entry.id != id);
    let deleted = state.history.len() != before;
    if deleted {
        write_state(&state)?;
    }
    Ok(deleted)
}

pub fn clear_history() -> Result<()> {
    let _guard = STATE_MUTEX.lock().expect("state lock");
    let mut state = read_state()?;
    state.history.clear();
    write_state(&state)
}

pub fn get_statistics() -> Result<UsageStatistics> {
    let state = read_state()?;
    Ok(state.statistics)
}

/// Bumps the counter for today's bucket and lazily prunes buckets older
/// than the retention window.
pub fn record_action(action: StatAction) -> Result<()> {
    record_action_at(action, OffsetDateTime::now_utc())
}

pub(crate) fn record_action_at(action: StatAction, now: OffsetDateTime) -> Result<()> {
    let _guard = STATE_MUTEX.lock().expect("state lock");
    let mut state = read_state()?;
    let today = iso_date(now);
    let stats = &mut state.statistics;

    match action {
        StatAction::Analyze => {
            stats.total_analyses += 1;
            *stats.daily_analyses.entry(today).or_insert(0) += 1;
        }
        StatAction::Save => {
            stats.total_saves += 1;
            *stats.daily_saves.entry(today).or_insert(0) += 1;
        }
    }

    let cutoff = iso_date(now - Duration::days(STATS_RETENTION_DAYS));
    stats.daily_analyses.retain(|date, _| date.as_str() >= cutoff.as_str());
    stats.daily_saves.retain(|date, _| date.as_str() >= cutoff.as_str());

    write_state(&state)
}

/// Full snapshot for export.
pub fn snapshot() -> Result<(Vec<HistoryEntry>, UsageStatistics)> {
    let state = read_state()?;
    Ok((state.history, state.statistics))
}

/// Replaces the whole local state, used by import. The history cap applies.
pub fn replace_state(history: Vec<HistoryEntry>, statistics: UsageStatistics) -> Result<()> {
    let _guard = STATE_MUTEX.lock().expect("state lock");
    let mut state = StateFile {
        history,
        statistics,
    };
    state.history.truncate(HISTORY_LIMIT);
    write_state(&state)
}

fn state_path() -> PathBuf {
    settings::home_dir()
        .unwrap_or_else(|| PathBuf::from(".selectwise"))
        .join(".cache")
        .join("state.json")
}

fn read_state() -> Result<StateFile> {
    let path = state_path();
    if !path.exists() {
        return Ok(StateFile::default());
    }
    let content = fs::read_to_string(&path).with_context(|| "failed to read local state")?;
    let state = serde_json::from_str(&content).with_context(|| "failed to parse local state")?;
    Ok(state)
}

fn write_state(state: &StateFile) -> Result<()> {
    let path = state_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| "failed to create state directory")?;
    }
    let content = serde_json::to_string_pretty(state)?;
    fs::write(&path, content).with_context(|| "failed to write local state")?;
    Ok(())
}

fn iso_date(datetime: OffsetDateTime) -> String {
    let format =
        format_description::parse("[year]-[month]-[day]").expect("date format description");
    datetime
        .format(&format)
        .unwrap_or_else(|_| datetime.date().to_string())
}

fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    fn entry(id: &str, text: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            timestamp: id.parse().unwrap_or(0),
            original_text: text.to_string(),
            url: String::new(),
            result: AnalysisResult {
                original_text: text.to_string(),
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
            },
        }
    }

    #[test]
    fn history_appends_newest_first_and_caps_at_limit() {
        with_temp_home(|_| {
            for index in 0..=HISTORY_LIMIT {
                append_history(entry(&index.to_string(), "text")).unwrap();
            }
            let history = get_history().unwrap();
            assert_eq!(history.len(), HISTORY_LIMIT);
            assert_eq!(history[0].id, HISTORY_LIMIT.to_string());
            // the oldest original entry was evicted
            assert!(!history.iter().any(|item| item.id == "0"));
        });
    }

    #[test]
    fn search_matches_text_translation_and_tags() {
        with_temp_home(|_| {
            let mut first = entry("1", "hello world");
            first.result.target_translation = Some("你好".to_string());
            let mut second = entry("2", "犬");
            second.result.tags = vec!["#animal".to_string()];
            append_history(first).unwrap();
            append_history(second).unwrap();

            assert_eq!(search_history("HELLO").unwrap().len(), 1);
            assert_eq!(search_history("你好").unwrap().len(), 1);
            assert_eq!(search_history("animal").unwrap().len(), 1);
            assert_eq!(search_history("").unwrap().len(), 2);
            assert!(search_history("missing").unwrap().is_empty());
        });
    }

    #[test]
    fn delete_and_clear_history() {
        with_temp_home(|_| {
            append_history(entry("1", "a")).unwrap();
            append_history(entry("2", "b")).unwrap();
            assert!(delete_history("1").unwrap());
            assert!(!delete_history("1").unwrap());
            assert_eq!(get_history().unwrap().len(), 1);
            clear_history().unwrap();
            assert!(get_history().unwrap().is_empty());
        });
    }

    #[test]
    fn statistics_count_and_prune_old_buckets() {
        with_temp_home(|_| {
            let old = OffsetDateTime::from_unix_timestamp(1_600_000_000).unwrap();
            record_action_at(StatAction::Analyze, old).unwrap();
            let now = old + Duration::days(STATS_RETENTION_DAYS + 1);
            record_action_at(StatAction::Analyze, now).unwrap();
            record_action_at(StatAction::Save, now).unwrap();

            let stats = get_statistics().unwrap();
            assert_eq!(stats.total_analyses, 2);
            assert_eq!(stats.total_saves, 1);
            // the bucket past the retention window is gone
            assert_eq!(stats.daily_analyses.len(), 1);
            assert_eq!(stats.daily_saves.len(), 1);
            assert_eq!(*stats.daily_analyses.values().next().unwrap(), 1);
        });
    }

    #[test]
    fn replace_state_applies_the_cap() {
        with_temp_home(|_| {
            let history = (0..150).map(|i| entry(&i.to_string(), "t")).collect();
            replace_state(history, UsageStatistics::default()).unwrap();
            assert_eq!(get_history().unwrap().len(), HISTORY_LIMIT);
        });
    }
}
