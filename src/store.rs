//! The board's single source of truth.
//!
//! `TaskStore` owns the columns, the archive, the progress cache, creation
//! times and the day marker. Every mutation goes through here, marks the
//! write debouncer, and leaves persistence to [`TaskStore::poll`] (live
//! board) or [`TaskStore::flush`] (one-shot commands and teardown).
//!
//! Operations that target a missing task or column are silent no-ops and
//! report that through their return value; only task creation can fail.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::clock::{end_of_day, start_of_day, Clock};
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::{Error, Result, ValidationError};
use crate::model::{ColumnType, DeletedTask, PersistedState, Task, TaskColumn, TaskStatus};
use crate::progress::{self, Urgency};
use crate::reconcile::{self, RolloverReport};
use crate::snapshot::{self, LoadOutcome};
use crate::stats::{self, BoardStats};
use crate::storage::KeyValueStore;
use crate::ticker::TickKind;

/// Read-only projection of a task for rendering and JSON output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub id: String,
    pub text: String,
    pub status: TaskStatus,
    pub column_id: String,
    pub column_type: ColumnType,
    pub deadline: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub time_left: String,
    pub progress: f64,
    pub urgency: Urgency,
    /// Bar is drawn only for unfinished tasks with time left
    pub show_progress: bool,
}

pub struct TaskStore {
    kv: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    config: Config,
    state: PersistedState,
    debouncer: Debouncer,
    load_outcome: LoadOutcome,
    last_rollover: RolloverReport,
}

impl TaskStore {
    /// Load the board, upgrade legacy data, and run the day check.
    pub fn open(
        kv: Box<dyn KeyValueStore>,
        clock: Box<dyn Clock>,
        config: Config,
    ) -> Result<Self> {
        let debouncer = Debouncer::from_millis(config.persistence.debounce_ms);
        let (state, load_outcome) =
            snapshot::load(kv.as_ref(), &config.persistence.storage_key, &config.columns);

        let mut store = Self {
            kv,
            clock,
            config,
            state,
            debouncer,
            load_outcome,
            last_rollover: RolloverReport::default(),
        };

        match store.load_outcome.clone() {
            LoadOutcome::Migrated { legacy_keys } => {
                store.save_now()?;
                snapshot::remove_legacy_keys(store.kv.as_ref(), &legacy_keys)?;
            }
            LoadOutcome::Fresh | LoadOutcome::Fallback { .. } => store.mark_dirty(),
            LoadOutcome::Loaded => {}
        }

        store.reconcile_now();
        store.refresh_progress();
        Ok(store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn columns(&self) -> &[TaskColumn] {
        &self.state.columns
    }

    pub fn deleted_tasks(&self) -> &[DeletedTask] {
        &self.state.deleted_tasks
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    /// Outcome of the most recent day check that rolled over
    pub fn last_rollover(&self) -> &RolloverReport {
        &self.last_rollover
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn offset(&self) -> FixedOffset {
        let now = self.clock.now();
        self.clock.offset_at(now)
    }

    pub fn progress_of(&self, task_id: &str) -> f64 {
        self.state
            .tasks_progress
            .get(task_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn created_at_of(&self, task_id: &str) -> Option<DateTime<Utc>> {
        self.state.created_at.get(task_id).copied()
    }

    pub fn find_task(&self, task_id: &str) -> Option<(&TaskColumn, &Task)> {
        self.state.all_tasks().find(|(_, task)| task.id == task_id)
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Validate and append a new idle task to the first column of `kind`.
    ///
    /// Daily tasks ignore `deadline` and run from local midnight to the end
    /// of today. Returns `Ok(None)` when the board has no column of `kind`.
    pub fn add_task(
        &mut self,
        text: &str,
        kind: ColumnType,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Option<Task>> {
        let now = self.clock.now();
        let offset = self.clock.offset_at(now);
        let text = text.trim();

        if text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let len = text.chars().count();
        let min = self.config.tasks.min_text_len;
        if len < min {
            return Err(ValidationError::TextTooShort { min, len }.into());
        }

        let (created_at, deadline) = if kind.is_daily() {
            (start_of_day(now, offset), end_of_day(now, offset))
        } else {
            let deadline =
                deadline.ok_or_else(|| ValidationError::DeadlineRequired(kind.to_string()))?;
            if deadline <= now {
                return Err(ValidationError::DeadlineInPast(deadline.to_rfc3339()).into());
            }
            (now, deadline)
        };

        let Some(column) = self.state.columns.iter_mut().find(|c| c.kind == kind) else {
            tracing::debug!(%kind, "no column for task type; nothing added");
            return Ok(None);
        };

        let task = Task {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            status: TaskStatus::Idle,
            deadline,
            kind: Some(kind),
        };
        column.tasks.push(task.clone());

        self.state.tasks_progress.insert(task.id.clone(), 0.0);
        self.state.created_at.insert(task.id.clone(), created_at);
        tracing::debug!(task_id = %task.id, %kind, "task added");
        self.mark_dirty();
        Ok(Some(task))
    }

    /// Remove a task from `column_id` and archive it.
    pub fn delete_task(&mut self, task_id: &str, column_id: &str) -> Option<DeletedTask> {
        let now = self.clock.now();
        let column = self.column_mut(column_id)?;
        let index = column.tasks.iter().position(|task| task.id == task_id)?;
        let task = column.tasks.remove(index);

        let archived = DeletedTask {
            id: task.id.clone(),
            text: task.text,
            column_type: column.kind,
            deleted_at: now,
            deadline: task.deadline,
        };
        self.state.deleted_tasks.push(archived.clone());
        self.forget_task(&task.id);
        tracing::debug!(task_id, column_id, "task archived");
        self.mark_dirty();
        Some(archived)
    }

    /// Set a task's status in place. No transition rules apply.
    pub fn change_status(&mut self, task_id: &str, status: TaskStatus, column_id: &str) -> bool {
        let Some(task) = self.task_mut(task_id, column_id) else {
            return false;
        };
        let previous = task.status;
        task.status = status;
        tracing::debug!(task_id, from = %previous, to = %status, "status changed");
        self.mark_dirty();
        true
    }

    /// One click: idle -> in_progress -> done, with done staying done.
    pub fn click(&mut self, task_id: &str, column_id: &str) -> Option<TaskStatus> {
        let next = self.task_mut(task_id, column_id)?.status.after_click();
        self.change_status(task_id, next, column_id);
        Some(next)
    }

    /// Move a task to the end of another column. The task stays where it
    /// is when either column is missing.
    pub fn move_task(&mut self, task_id: &str, from_column_id: &str, to_column_id: &str) -> bool {
        if self.state.column(to_column_id).is_none() {
            return false;
        }
        let Some(source) = self.column_mut(from_column_id) else {
            return false;
        };
        let Some(index) = source.tasks.iter().position(|task| task.id == task_id) else {
            return false;
        };
        let task = source.tasks.remove(index);
        if let Some(target) = self.column_mut(to_column_id) {
            target.tasks.push(task);
        }
        tracing::debug!(task_id, from_column_id, to_column_id, "task moved");
        self.mark_dirty();
        true
    }

    /// Bring an archived task back as idle into the first column of its
    /// original type, text and deadline unchanged. The entry stays archived
    /// when no such column exists.
    pub fn restore_task(&mut self, deleted_task_id: &str) -> Option<Task> {
        let now = self.clock.now();
        let offset = self.clock.offset_at(now);

        let index = self
            .state
            .deleted_tasks
            .iter()
            .position(|entry| entry.id == deleted_task_id)?;
        let kind = self.state.deleted_tasks[index].column_type;
        let column_index = self.state.columns.iter().position(|c| c.kind == kind)?;
        let entry = self.state.deleted_tasks.remove(index);

        let created_at = if kind.is_daily() {
            start_of_day(now, offset)
        } else {
            now
        };
        let task = Task {
            id: entry.id,
            text: entry.text,
            status: TaskStatus::Idle,
            deadline: entry.deadline,
            kind: Some(kind),
        };
        self.state.columns[column_index].tasks.push(task.clone());

        let (start, end) =
            progress::task_window(kind, Some(created_at), task.deadline, now, offset);
        let progress = progress::cached_progress(start, end, now);
        self.state.tasks_progress.insert(task.id.clone(), progress);
        self.state.created_at.insert(task.id.clone(), created_at);
        tracing::debug!(task_id = %task.id, %kind, "task restored");
        self.mark_dirty();
        Some(task)
    }

    /// Empty the archive, returning how many entries were dropped.
    pub fn clear_deleted_tasks(&mut self) -> usize {
        let cleared = self.state.deleted_tasks.len();
        self.state.deleted_tasks.clear();
        tracing::debug!(cleared, "archive cleared");
        self.mark_dirty();
        cleared
    }

    /// Default columns, nothing archived, no cached progress. The day marker
    /// survives so a reset does not trigger another rollover today.
    pub fn reset_to_default(&mut self) {
        let last_check = self.state.last_check_date;
        self.state = PersistedState::default_board(&self.config.columns);
        self.state.last_check_date = last_check;
        tracing::debug!("board reset to defaults");
        self.mark_dirty();
    }

    /// Clear every key in the backing store, then reset. Nothing is written
    /// until the next mutation.
    pub fn wipe(&mut self) -> Result<()> {
        self.kv.clear()?;
        self.state = PersistedState::default_board(&self.config.columns);
        self.debouncer.take();
        tracing::info!("storage wiped");
        Ok(())
    }

    /// Recompute the cached progress of every live task. Returns how many
    /// entries changed.
    pub fn refresh_progress(&mut self) -> usize {
        let now = self.clock.now();
        let offset = self.clock.offset_at(now);
        let mut updates = Vec::new();
        for (column, task) in self.state.all_tasks() {
            let created_at = self.state.created_at.get(&task.id).copied();
            let (start, end) =
                progress::task_window(column.kind, created_at, task.deadline, now, offset);
            let value = progress::cached_progress(start, end, now);
            if self.state.tasks_progress.get(&task.id) != Some(&value) {
                updates.push((task.id.clone(), value));
            }
        }

        let changed = updates.len();
        if changed > 0 {
            self.state.tasks_progress.extend(updates);
            self.mark_dirty();
        }
        changed
    }

    /// Run the day check now.
    pub fn reconcile_now(&mut self) -> RolloverReport {
        let now = self.clock.now();
        let offset = self.clock.offset_at(now);
        let report = reconcile::reconcile(&mut self.state, now, offset);
        if report.rolled_over {
            tracing::info!(
                reset = report.reset.len(),
                purged = report.purged.len(),
                "day rollover"
            );
            self.last_rollover = report.clone();
            self.mark_dirty();
            self.refresh_progress();
        }
        report
    }

    /// React to a tick from the board's driver. Returns whether the board
    /// needs a redraw.
    pub fn handle_tick(&mut self, kind: TickKind) -> bool {
        match kind {
            TickKind::TimeLeft => true,
            TickKind::Progress => self.refresh_progress() > 0,
            TickKind::DayCheck => self.reconcile_now().rolled_over,
        }
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Write if the quiet window since the last mutation has elapsed.
    pub fn poll(&mut self) -> Result<bool> {
        let now = self.clock.now();
        if self.debouncer.fire_if_due(now) {
            self.save_now()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Write immediately if anything is pending.
    pub fn flush(&mut self) -> Result<bool> {
        if self.debouncer.take() {
            self.save_now()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Re-read the board after another process changed storage. Skipped
    /// while a local write is pending so unsaved edits are not lost.
    pub fn reload(&mut self) -> bool {
        if self.debouncer.is_pending() {
            return false;
        }
        let (state, outcome) = snapshot::load(
            self.kv.as_ref(),
            &self.config.persistence.storage_key,
            &self.config.columns,
        );
        if matches!(outcome, LoadOutcome::Fallback { .. }) || state == self.state {
            return false;
        }
        self.state = state;
        self.load_outcome = outcome;
        tracing::debug!("board reloaded from storage");
        true
    }

    fn save_now(&self) -> Result<()> {
        snapshot::save(
            self.kv.as_ref(),
            &self.config.persistence.storage_key,
            &self.state,
        )?;
        tracing::debug!(tasks = self.state.task_count(), "board saved");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lookups and projections
    // ---------------------------------------------------------------------

    /// Resolve a full id or unique prefix of a live task.
    pub fn resolve_task_id(&self, input: &str) -> Result<String> {
        let ids = self.state.all_tasks().map(|(_, task)| task.id.as_str());
        resolve_prefix(input, ids)
    }

    /// Resolve a full id or unique prefix of an archived task.
    pub fn resolve_deleted_id(&self, input: &str) -> Result<String> {
        let ids = self.state.deleted_tasks.iter().map(|entry| entry.id.as_str());
        resolve_prefix(input, ids)
    }

    pub fn column_id_of(&self, task_id: &str) -> Option<&str> {
        self.find_task(task_id).map(|(column, _)| column.id.as_str())
    }

    pub fn task_view(&self, column: &TaskColumn, task: &Task) -> TaskView {
        let now = self.clock.now();
        let offset = self.clock.offset_at(now);
        let progress = self.progress_of(&task.id);
        let created_at = self.created_at_of(&task.id);
        let (_, window_end) =
            progress::task_window(column.kind, created_at, task.deadline, now, offset);
        TaskView {
            id: task.id.clone(),
            text: task.text.clone(),
            status: task.status,
            column_id: column.id.clone(),
            column_type: column.kind,
            deadline: task.deadline,
            created_at,
            time_left: progress::format_time_left(window_end, now),
            progress,
            urgency: Urgency::classify(progress, &self.config.urgency),
            show_progress: task.status != TaskStatus::Done && progress > 0.0,
        }
    }

    /// Views of every live task, board order, optionally one column type.
    pub fn task_views(&self, kind: Option<ColumnType>) -> Vec<TaskView> {
        self.state
            .all_tasks()
            .filter(|(column, _)| kind.map_or(true, |kind| column.kind == kind))
            .map(|(column, task)| self.task_view(column, task))
            .collect()
    }

    pub fn stats(&self) -> BoardStats {
        let now = self.clock.now();
        stats::compute(&self.state, now, self.clock.offset_at(now))
    }

    fn column_mut(&mut self, column_id: &str) -> Option<&mut TaskColumn> {
        self.state.columns.iter_mut().find(|c| c.id == column_id)
    }

    fn task_mut(&mut self, task_id: &str, column_id: &str) -> Option<&mut Task> {
        self.column_mut(column_id)?
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)
    }

    fn forget_task(&mut self, task_id: &str) {
        self.state.tasks_progress.remove(task_id);
        self.state.created_at.remove(task_id);
    }

    fn mark_dirty(&mut self) {
        let now = self.clock.now();
        self.debouncer.touch(now);
    }
}

fn resolve_prefix<'a>(input: &str, ids: impl Iterator<Item = &'a str>) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
    }
    let needle = trimmed.to_lowercase();

    let mut matches: Vec<String> = Vec::new();
    for id in ids {
        let lowered = id.to_lowercase();
        if lowered == needle {
            return Ok(id.to_string());
        }
        if lowered.starts_with(&needle) {
            matches.push(id.to_string());
        }
    }

    matches.sort();
    matches.dedup();
    match matches.len() {
        0 => Err(Error::TaskNotFound(trimmed.to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::AmbiguousTaskId {
            input: trimmed.to_string(),
            matches,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    const KEY: &str = "todoTasks";

    fn t0() -> DateTime<Utc> {
        "2026-10-17T10:00:00Z".parse().unwrap()
    }

    fn open_with(kv: &MemoryStore, clock: &ManualClock) -> TaskStore {
        TaskStore::open(
            Box::new(kv.clone()),
            Box::new(clock.clone()),
            Config::default(),
        )
        .unwrap()
    }

    fn fixture() -> (TaskStore, MemoryStore, ManualClock) {
        let kv = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut store = open_with(&kv, &clock);
        store.flush().unwrap();
        (store, kv, clock)
    }

    fn short_column(store: &TaskStore) -> String {
        store
            .state()
            .column_of_type(ColumnType::Short)
            .unwrap()
            .id
            .clone()
    }

    fn add_short(store: &mut TaskStore, text: &str) -> Task {
        let deadline = store.now() + Duration::days(2);
        store
            .add_task(text, ColumnType::Short, Some(deadline))
            .unwrap()
            .unwrap()
    }

    fn stored_state(kv: &MemoryStore) -> PersistedState {
        serde_json::from_str(&kv.get(KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn fresh_store_has_default_columns_and_persists_them() {
        let kv = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut store = open_with(&kv, &clock);

        assert_eq!(store.load_outcome(), &LoadOutcome::Fresh);
        assert_eq!(store.columns().len(), 4);
        assert!(store.last_rollover().rolled_over);
        assert!(store.has_pending_write());

        clock.advance(Duration::milliseconds(500));
        assert!(store.poll().unwrap());
        assert_eq!(stored_state(&kv).last_check_date, Some(t0()));
    }

    #[test]
    fn add_then_click_walks_the_status_machine() {
        let (mut store, _, _) = fixture();
        let column = short_column(&store);
        let task = add_short(&mut store, "Buy groceries");

        assert_eq!(task.status, TaskStatus::Idle);
        assert_eq!(store.click(&task.id, &column), Some(TaskStatus::InProgress));
        assert_eq!(store.click(&task.id, &column), Some(TaskStatus::Done));
        assert_eq!(store.click(&task.id, &column), Some(TaskStatus::Done));
        assert_eq!(store.click("missing", &column), None);
    }

    #[test]
    fn validation_rejects_without_mutating() {
        let (mut store, _, _) = fixture();
        let before = store.state().clone();
        let soon = store.now() + Duration::hours(1);

        let cases = [
            ("   ", ColumnType::Short, Some(soon)),
            ("abcd", ColumnType::Short, Some(soon)),
            ("Write report", ColumnType::Long, None),
            ("Write report", ColumnType::Long, Some(store.now())),
        ];
        for (text, kind, deadline) in cases {
            let err = store.add_task(text, kind, deadline).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{text}: {err}");
        }

        assert_eq!(store.state(), &before);
        assert!(!store.has_pending_write());
    }

    #[test]
    fn text_length_counts_characters() {
        let (mut store, _, _) = fixture();
        let task = store
            .add_task("Чай!!", ColumnType::Daily, None)
            .unwrap()
            .unwrap();
        assert_eq!(task.text, "Чай!!");
    }

    #[test]
    fn daily_tasks_take_the_end_of_today() {
        let (mut store, _, _) = fixture();
        let ignored = store.now() + Duration::days(30);
        let task = store
            .add_task("Stretch 10 minutes", ColumnType::Daily, Some(ignored))
            .unwrap()
            .unwrap();

        let today_end: DateTime<Utc> = "2026-10-17T23:59:59.999Z".parse().unwrap();
        assert_eq!(task.deadline, today_end);
        assert_eq!(
            store.created_at_of(&task.id),
            Some("2026-10-17T00:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn add_without_matching_column_is_a_no_op() {
        let (mut store, _, _) = fixture();
        store
            .state
            .columns
            .retain(|column| column.kind != ColumnType::Long);
        let deadline = store.now() + Duration::days(1);

        let added = store
            .add_task("Plan the trip", ColumnType::Long, Some(deadline))
            .unwrap();
        assert!(added.is_none());
        assert_eq!(store.state().task_count(), 0);
    }

    #[test]
    fn delete_archives_and_restore_brings_back_idle() {
        let (mut store, _, clock) = fixture();
        let column = short_column(&store);
        let task = add_short(&mut store, "Buy groceries");
        store.click(&task.id, &column);

        clock.advance(Duration::minutes(5));
        let archived = store.delete_task(&task.id, &column).unwrap();
        assert_eq!(archived.column_type, ColumnType::Short);
        assert_eq!(archived.deleted_at, clock.now());
        assert!(store.find_task(&task.id).is_none());
        assert!(!store.state().tasks_progress.contains_key(&task.id));
        assert!(!store.state().created_at.contains_key(&task.id));

        let restored = store.restore_task(&task.id).unwrap();
        assert_eq!(restored.status, TaskStatus::Idle);
        assert_eq!(restored.deadline, task.deadline);
        assert!(store.deleted_tasks().is_empty());
        assert_eq!(store.column_id_of(&task.id), Some(column.as_str()));
        assert!(store.progress_of(&task.id) > 0.0);
    }

    #[test]
    fn restoring_a_daily_task_keeps_its_deadline() {
        let (mut store, _, clock) = fixture();
        let daily = store
            .state()
            .column_of_type(ColumnType::Daily)
            .unwrap()
            .id
            .clone();
        let task = store
            .add_task("Stretch 10 minutes", ColumnType::Daily, None)
            .unwrap()
            .unwrap();
        store.delete_task(&task.id, &daily).unwrap();

        clock.advance(Duration::days(2));
        let restored = store.restore_task(&task.id).unwrap();
        assert_eq!(restored.text, task.text);
        assert_eq!(restored.deadline, task.deadline);
        assert_eq!(restored.status, TaskStatus::Idle);
        let (_, stored) = store.find_task(&task.id).unwrap();
        assert_eq!(stored.deadline, task.deadline);
        // The countdown still runs over today.
        assert!(store.progress_of(&task.id) > 0.0);
    }

    #[test]
    fn delete_with_wrong_column_does_nothing() {
        let (mut store, _, _) = fixture();
        let task = add_short(&mut store, "Buy groceries");
        assert!(store.delete_task(&task.id, "3").is_none());
        assert!(store.deleted_tasks().is_empty());
        assert!(store.find_task(&task.id).is_some());
    }

    #[test]
    fn restore_without_column_keeps_archive_entry() {
        let (mut store, _, _) = fixture();
        let column = short_column(&store);
        let task = add_short(&mut store, "Buy groceries");
        store.delete_task(&task.id, &column);
        store
            .state
            .columns
            .retain(|column| column.kind != ColumnType::Short);

        assert!(store.restore_task(&task.id).is_none());
        assert_eq!(store.deleted_tasks().len(), 1);
        assert!(store.restore_task("missing").is_none());
    }

    #[test]
    fn move_keeps_fields_and_appends() {
        let (mut store, _, _) = fixture();
        let column = short_column(&store);
        let task = add_short(&mut store, "Buy groceries");
        store.change_status(&task.id, TaskStatus::InProgress, &column);

        assert!(store.move_task(&task.id, &column, "3"));
        let (target, moved) = store.find_task(&task.id).unwrap();
        assert_eq!(target.id, "3");
        assert_eq!(moved.status, TaskStatus::InProgress);
        assert_eq!(moved.deadline, task.deadline);
        assert_eq!(store.state().task_count(), 1);
    }

    #[test]
    fn moving_there_and_back_restores_membership() {
        let (mut store, _, _) = fixture();
        let column = short_column(&store);
        let first = add_short(&mut store, "Buy groceries");
        let second = add_short(&mut store, "Call the bank");
        store.click(&first.id, &column);
        let before = store.state().clone();
        let (_, original) = store.find_task(&first.id).unwrap();
        let original = original.clone();

        assert!(store.move_task(&first.id, &column, "2"));
        assert!(store.move_task(&first.id, "2", &column));

        let (home, back) = store.find_task(&first.id).unwrap();
        assert_eq!(home.id, column);
        assert_eq!(back, &original);
        let ids: Vec<&str> = home.tasks.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, [second.id.as_str(), first.id.as_str()]);
        assert!(store.state().column("2").unwrap().tasks.is_empty());
        assert_eq!(store.state().task_count(), before.task_count());
        assert_eq!(store.state().tasks_progress, before.tasks_progress);
        assert_eq!(store.state().created_at, before.created_at);
    }

    #[test]
    fn move_to_missing_column_leaves_task_in_place() {
        let (mut store, _, _) = fixture();
        let column = short_column(&store);
        let task = add_short(&mut store, "Buy groceries");

        assert!(!store.move_task(&task.id, &column, "99"));
        assert!(!store.move_task("missing", &column, "3"));
        assert_eq!(store.column_id_of(&task.id), Some(column.as_str()));
    }

    #[test]
    fn clear_and_reset() {
        let (mut store, _, _) = fixture();
        let column = short_column(&store);
        let task = add_short(&mut store, "Buy groceries");
        add_short(&mut store, "Call the bank");
        store.delete_task(&task.id, &column);

        assert_eq!(store.clear_deleted_tasks(), 1);
        assert!(store.deleted_tasks().is_empty());

        let marker = store.state().last_check_date;
        store.reset_to_default();
        assert_eq!(store.state().task_count(), 0);
        assert!(store.state().tasks_progress.is_empty());
        assert!(store.state().created_at.is_empty());
        assert_eq!(store.state().last_check_date, marker);
    }

    #[test]
    fn wipe_clears_every_key() {
        let (mut store, kv, _) = fixture();
        kv.set("unrelated", "1").unwrap();
        add_short(&mut store, "Buy groceries");

        store.wipe().unwrap();
        assert!(kv.keys().unwrap().is_empty());
        assert_eq!(store.state().task_count(), 0);
        assert!(!store.has_pending_write());
    }

    #[test]
    fn mutations_within_the_window_coalesce_into_one_write() {
        let (mut store, kv, clock) = fixture();
        let writes = kv.write_count();
        let column = short_column(&store);
        let task = add_short(&mut store, "Buy groceries");

        clock.advance(Duration::milliseconds(200));
        store.click(&task.id, &column);
        clock.advance(Duration::milliseconds(400));
        assert!(!store.poll().unwrap());
        store.click(&task.id, &column);
        clock.advance(Duration::milliseconds(499));
        assert!(!store.poll().unwrap());
        clock.advance(Duration::milliseconds(1));
        assert!(store.poll().unwrap());

        assert_eq!(kv.write_count(), writes + 1);
        let saved = stored_state(&kv);
        assert_eq!(saved.all_tasks().next().unwrap().1.status, TaskStatus::Done);
    }

    #[test]
    fn state_survives_a_restart() {
        let (mut store, kv, clock) = fixture();
        let column = short_column(&store);
        let task = add_short(&mut store, "Buy groceries");
        store.click(&task.id, &column);
        store.flush().unwrap();
        drop(store);

        clock.advance(Duration::hours(1));
        let reopened = open_with(&kv, &clock);
        assert_eq!(reopened.load_outcome(), &LoadOutcome::Loaded);
        let (_, loaded) = reopened.find_task(&task.id).unwrap();
        assert_eq!(loaded.status, TaskStatus::InProgress);
        assert!(!reopened.last_rollover().rolled_over);
    }

    #[test]
    fn progress_refresh_counts_down_and_hides_after_deadline() {
        let (mut store, _, clock) = fixture();
        let deadline = store.now() + Duration::hours(10);
        let task = store
            .add_task("Buy groceries", ColumnType::Short, Some(deadline))
            .unwrap()
            .unwrap();
        assert_eq!(store.progress_of(&task.id), 0.0);

        assert!(store.handle_tick(TickKind::Progress));
        assert_eq!(store.progress_of(&task.id), 100.0);

        clock.advance(Duration::hours(5));
        store.refresh_progress();
        assert_eq!(store.progress_of(&task.id), 50.0);

        clock.advance(Duration::hours(6));
        store.refresh_progress();
        let view = store.task_views(None).remove(0);
        assert_eq!(view.progress, 0.0);
        assert_eq!(view.urgency, Urgency::Expired);
        assert_eq!(view.time_left, progress::EXPIRED_MARKER);
        assert!(!view.show_progress);
    }

    #[test]
    fn midnight_resets_daily_and_purges_done() {
        let (mut store, kv, clock) = fixture();
        let column = short_column(&store);
        let daily_column = store
            .state()
            .column_of_type(ColumnType::Daily)
            .unwrap()
            .id
            .clone();
        let chore = store
            .add_task("Water the plants", ColumnType::Daily, None)
            .unwrap()
            .unwrap();
        let done = add_short(&mut store, "Buy groceries");
        let open = add_short(&mut store, "Call the bank");
        store.click(&chore.id, &daily_column);
        store.change_status(&done.id, TaskStatus::Done, &column);
        store.flush().unwrap();

        clock.set("2026-10-17T23:59:59Z".parse().unwrap());
        assert!(!store.handle_tick(TickKind::DayCheck));

        clock.set("2026-10-18T00:00:01Z".parse().unwrap());
        assert!(store.handle_tick(TickKind::DayCheck));

        let report = store.last_rollover().clone();
        assert_eq!(report.reset, vec![chore.id.clone()]);
        assert_eq!(report.purged, vec![done.id.clone()]);
        assert!(store.find_task(&done.id).is_none());
        assert!(store.find_task(&open.id).is_some());
        assert!(store.deleted_tasks().is_empty());
        let (_, chore_now) = store.find_task(&chore.id).unwrap();
        assert_eq!(chore_now.status, TaskStatus::Idle);
        assert_eq!(chore_now.deadline, chore.deadline);
        let view = store.task_views(Some(ColumnType::Daily)).remove(0);
        assert_ne!(view.time_left, progress::EXPIRED_MARKER);
        assert!(view.show_progress);

        store.flush().unwrap();
        assert_eq!(stored_state(&kv).last_check_date, Some(clock.now()));
    }

    #[test]
    fn reload_skips_while_a_write_is_pending() {
        let (mut store, kv, clock) = fixture();
        let mut other = open_with(&kv, &clock);
        add_short(&mut other, "Written elsewhere");
        other.flush().unwrap();

        add_short(&mut store, "Local edit");
        assert!(!store.reload());
        store.flush().unwrap();

        let mut third = open_with(&kv, &clock);
        add_short(&mut third, "Another remote edit");
        third.flush().unwrap();
        assert!(store.reload());
        assert_eq!(store.state().task_count(), 2);
    }

    #[test]
    fn prefixes_resolve_uniquely() {
        let (mut store, _, _) = fixture();
        let task = add_short(&mut store, "Buy groceries");

        assert_eq!(store.resolve_task_id(&task.id[..8]).unwrap(), task.id);
        assert_eq!(
            store.resolve_task_id(&task.id.to_uppercase()).unwrap(),
            task.id
        );
        assert!(matches!(
            store.resolve_task_id("zzzz"),
            Err(Error::TaskNotFound(_))
        ));
        assert!(matches!(
            store.resolve_task_id(" "),
            Err(Error::InvalidArgument(_))
        ));

        let ids = ["abc1", "abc2"];
        let err = resolve_prefix("abc", ids.into_iter()).unwrap_err();
        assert!(matches!(err, Error::AmbiguousTaskId { ref matches, .. } if matches.len() == 2));
    }

    #[test]
    fn migrated_board_is_written_back_immediately() {
        let kv = MemoryStore::new();
        kv.set(
            KEY,
            r#"{"columns":[{"id":"1","title":"Short","type":"short","tasks":[]}],"deletedTasks":[],"tasksProgress":[]}"#,
        )
        .unwrap();
        kv.set("lastCheckDate", "2026-10-17T01:00:00.000Z").unwrap();
        let clock = ManualClock::new(t0());

        let store = open_with(&kv, &clock);
        assert!(matches!(store.load_outcome(), LoadOutcome::Migrated { .. }));
        assert_eq!(kv.keys().unwrap(), vec![KEY.to_string()]);
        assert_eq!(stored_state(&kv).schema_version, crate::model::SCHEMA_VERSION);
        assert!(!store.last_rollover().rolled_over);
    }
}
