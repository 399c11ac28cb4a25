//! Read/write boundary for the persisted board.
//!
//! All board state lives in one JSON blob under a single key. This module
//! is the only place that blob is parsed or produced. It also upgrades the
//! older unversioned layout, where the progress cache could be either a
//! list of `{id, progress}` records or an `id -> progress` map, and where
//! creation times and the day marker sat in separate keys.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::ColumnsConfig;
use crate::error::Result;
use crate::model::{DeletedTask, PersistedState, TaskColumn, SCHEMA_VERSION};
use crate::storage::KeyValueStore;

/// Prefix of the per-task creation keys in the unversioned layout
pub const LEGACY_CREATED_AT_PREFIX: &str = "taskCreatedAt_";
/// Standalone progress cache key in the unversioned layout
pub const LEGACY_PROGRESS_KEY: &str = "tasksProgress";
/// Standalone day marker key in the unversioned layout
pub const LEGACY_LAST_CHECK_KEY: &str = "lastCheckDate";

/// How the state returned by [`load`] was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing stored yet; default board
    Fresh,
    Loaded,
    /// Unversioned data upgraded; `legacy_keys` can be removed once the
    /// upgraded blob is written
    Migrated { legacy_keys: Vec<String> },
    /// Stored data unusable; default board
    Fallback { reason: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyProgress {
    Records(Vec<LegacyProgressRecord>),
    Map(BTreeMap<String, f64>),
}

#[derive(Debug, Deserialize)]
struct LegacyProgressRecord {
    id: String,
    progress: f64,
}

impl LegacyProgress {
    fn into_map(self) -> BTreeMap<String, f64> {
        match self {
            LegacyProgress::Records(records) => records
                .into_iter()
                .map(|record| (record.id, record.progress))
                .collect(),
            LegacyProgress::Map(map) => map,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyState {
    #[serde(default)]
    columns: Vec<TaskColumn>,
    #[serde(default)]
    deleted_tasks: Vec<DeletedTask>,
    #[serde(default)]
    tasks_progress: Option<LegacyProgress>,
}

/// Load the board from `key`, never failing on bad data.
pub fn load(
    kv: &dyn KeyValueStore,
    key: &str,
    titles: &ColumnsConfig,
) -> (PersistedState, LoadOutcome) {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return (PersistedState::default_board(titles), LoadOutcome::Fresh),
        Err(err) => return fallback(titles, format!("storage read failed: {err}")),
    };

    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => return fallback(titles, format!("state is not valid JSON: {err}")),
    };

    match value.get("schemaVersion").and_then(|v| v.as_u64()) {
        Some(version) if version == u64::from(SCHEMA_VERSION) => {
            match serde_json::from_value::<PersistedState>(value) {
                Ok(state) if !state.columns.is_empty() => (state, LoadOutcome::Loaded),
                Ok(_) => fallback(titles, "state has no columns".to_string()),
                Err(err) => fallback(titles, format!("state does not match schema: {err}")),
            }
        }
        Some(version) => fallback(titles, format!("unsupported schema version {version}")),
        None => migrate_legacy(kv, value, titles),
    }
}

fn migrate_legacy(
    kv: &dyn KeyValueStore,
    value: serde_json::Value,
    titles: &ColumnsConfig,
) -> (PersistedState, LoadOutcome) {
    let legacy: LegacyState = match serde_json::from_value(value) {
        Ok(legacy) => legacy,
        Err(err) => return fallback(titles, format!("legacy state unreadable: {err}")),
    };
    if legacy.columns.is_empty() {
        return fallback(titles, "legacy state has no columns".to_string());
    }

    let mut state = PersistedState::with_columns(legacy.columns);
    state.deleted_tasks = legacy.deleted_tasks;
    if let Some(progress) = legacy.tasks_progress {
        state.tasks_progress = progress.into_map();
    }

    // The stray keys are best effort: a read failure just means less to fold.
    let keys = kv.keys().unwrap_or_default();
    let mut legacy_keys = Vec::new();

    for key in &keys {
        let Some(id) = key.strip_prefix(LEGACY_CREATED_AT_PREFIX) else {
            continue;
        };
        legacy_keys.push(key.clone());
        if let Some(at) = read_timestamp(kv, key) {
            state.created_at.insert(id.to_string(), at);
        }
    }

    if keys.iter().any(|k| k == LEGACY_PROGRESS_KEY) {
        legacy_keys.push(LEGACY_PROGRESS_KEY.to_string());
        let standalone = kv
            .get(LEGACY_PROGRESS_KEY)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str::<LegacyProgress>(&raw).ok());
        if let Some(progress) = standalone {
            state.tasks_progress.extend(progress.into_map());
        }
    }

    if keys.iter().any(|k| k == LEGACY_LAST_CHECK_KEY) {
        legacy_keys.push(LEGACY_LAST_CHECK_KEY.to_string());
        state.last_check_date = read_timestamp(kv, LEGACY_LAST_CHECK_KEY);
    }

    let live: std::collections::HashSet<String> =
        state.all_tasks().map(|(_, task)| task.id.clone()).collect();
    state.tasks_progress.retain(|id, _| live.contains(id));
    state.created_at.retain(|id, _| live.contains(id));

    tracing::info!(
        tasks = live.len(),
        legacy_keys = legacy_keys.len(),
        "migrated unversioned board state"
    );
    (state, LoadOutcome::Migrated { legacy_keys })
}

fn read_timestamp(kv: &dyn KeyValueStore, key: &str) -> Option<DateTime<Utc>> {
    let raw = kv.get(key).ok().flatten()?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

fn fallback(titles: &ColumnsConfig, reason: String) -> (PersistedState, LoadOutcome) {
    tracing::warn!(%reason, "falling back to the default board");
    (
        PersistedState::default_board(titles),
        LoadOutcome::Fallback { reason },
    )
}

/// Overwrite the whole blob under `key`.
pub fn save(kv: &dyn KeyValueStore, key: &str, state: &PersistedState) -> Result<()> {
    let json = serde_json::to_string(state)?;
    kv.set(key, &json)
}

/// Drop keys left over from the unversioned layout.
pub fn remove_legacy_keys(kv: &dyn KeyValueStore, keys: &[String]) -> Result<()> {
    for key in keys {
        kv.remove(key)?;
    }
    Ok(())
}
