//! Shared setup for board commands: locate the data directory, load
//! configuration, open the store.

use std::path::{Path, PathBuf};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::Result;
use crate::output::{Report, OutputOptions};
use crate::snapshot::LoadOutcome;
use crate::storage::Storage;
use crate::store::TaskStore;

/// Flags every subcommand accepts
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

pub(crate) struct BoardContext {
    pub storage: Storage,
    pub store: TaskStore,
}

impl BoardContext {
    /// Persist whatever the command (or the load-time day check) changed.
    pub fn finish(&mut self) -> Result<()> {
        self.store.flush()?;
        Ok(())
    }
}

pub(crate) fn open_board(globals: &GlobalOptions) -> Result<BoardContext> {
    let storage = Storage::resolve(globals.data_dir.as_deref())?;
    let config = load_config(&storage, globals.config.as_deref())?;
    let store = TaskStore::open(
        Box::new(storage.file_store()),
        Box::new(SystemClock),
        config,
    )?;
    tracing::debug!(data_dir = %storage.data_dir().display(), "board opened");
    Ok(BoardContext { storage, store })
}

/// An explicit config path must load; the default location falls back to
/// defaults.
pub(crate) fn load_config(storage: &Storage, explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => Ok(Config::load_from_dir(storage.data_dir())),
    }
}

/// Surface load-time events (fallback, migration, rollover) as warnings.
pub(crate) fn push_load_notes(human: &mut Report, store: &TaskStore) {
    match store.load_outcome() {
        LoadOutcome::Fallback { reason } => {
            human.warn(format!("stored board unusable ({reason}); started from defaults"));
        }
        LoadOutcome::Migrated { legacy_keys } => {
            human.warn(format!(
                "upgraded board from the old layout ({} stray keys removed)",
                legacy_keys.len()
            ));
        }
        LoadOutcome::Fresh | LoadOutcome::Loaded => {}
    }

    let rollover = store.last_rollover();
    if rollover.rolled_over && (!rollover.reset.is_empty() || !rollover.purged.is_empty()) {
        human.warn(format!(
            "new day: {} daily task(s) reset, {} finished task(s) cleared",
            rollover.reset.len(),
            rollover.purged.len()
        ));
    }
}

/// First eight characters of an id, for display
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        let bad = dir.path().join("custom.toml");
        std::fs::write(&bad, "[tasks]\nmin_text_len = 0\n").unwrap();

        assert!(load_config(&storage, Some(&bad)).is_err());
        std::fs::write(storage.config_file(), "[tasks]\nmin_text_len = 0\n").unwrap();
        let fallback = load_config(&storage, None).unwrap();
        assert_eq!(fallback.tasks.min_text_len, 5);
    }

    #[test]
    fn short_ids_never_panic() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789"), "01234567");
    }
}
