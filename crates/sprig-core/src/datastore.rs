use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::TaskError;
use crate::task::{Task, TaskPatch};

pub const TASKS_FILE: &str = "tasks.data";

/// Where `TaskStore::add` puts new tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddPosition {
    #[default]
    Top,
    Bottom,
}

impl std::str::FromStr for AddPosition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" | "front" => Ok(Self::Top),
            "bottom" | "end" => Ok(Self::Bottom),
            other => Err(anyhow!("invalid add.position: {other} (expected top or bottom)")),
        }
    }
}

/// The authoritative task sequence. Every mutation writes a full snapshot
/// before returning. A failed write keeps the in-memory change and is
/// reported through the returned error.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
    position: AddPosition,
}

impl TaskStore {
    #[tracing::instrument(skip_all)]
    pub fn open(path: impl AsRef<Path>, position: AddPosition) -> Self {
        let path = path.as_ref().to_path_buf();
        let tasks = load_tasks(&path);
        info!(
            file = %path.display(),
            count = tasks.len(),
            ?position,
            "opened task store"
        );
        Self {
            path,
            tasks,
            position,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.uuid == uuid)
    }

    pub fn position(&self, uuid: Uuid) -> Option<usize> {
        self.tasks.iter().position(|t| t.uuid == uuid)
    }

    /// Resolves a 1-based position or a uuid prefix to a task key. A number
    /// that names a position wins; otherwise it is tried as a prefix.
    pub fn resolve(&self, selector: &str) -> Result<Uuid, TaskError> {
        let selector = selector.trim();

        let by_position = selector
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| self.tasks.get(idx));
        if let Some(task) = by_position {
            return Ok(task.uuid);
        }

        let needle = selector.replace('-', "").to_ascii_lowercase();
        if needle.len() < 4 {
            return Err(TaskError::NotFound(selector.to_string()));
        }

        let mut matches = self
            .tasks
            .iter()
            .filter(|t| t.uuid.simple().to_string().starts_with(&needle));
        let first = matches
            .next()
            .ok_or_else(|| TaskError::NotFound(selector.to_string()))?;
        if matches.next().is_some() {
            return Err(TaskError::AmbiguousSelector(selector.to_string()));
        }
        Ok(first.uuid)
    }

    #[tracing::instrument(skip(self, task), fields(uuid = %task.uuid))]
    pub fn add(&mut self, task: Task) -> anyhow::Result<Uuid> {
        let uuid = task.uuid;
        match self.position {
            AddPosition::Top => self.tasks.insert(0, task),
            AddPosition::Bottom => self.tasks.push(task),
        }
        self.save()?;
        Ok(uuid)
    }

    #[tracing::instrument(skip(self), fields(uuid = %uuid))]
    pub fn remove(&mut self, uuid: Uuid) -> anyhow::Result<Task> {
        let idx = self
            .position(uuid)
            .ok_or_else(|| TaskError::NotFound(uuid.to_string()))?;
        let task = self.tasks.remove(idx);
        self.save()?;
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch), fields(uuid = %uuid))]
    pub fn update(&mut self, uuid: Uuid, patch: TaskPatch) -> anyhow::Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.uuid == uuid)
            .ok_or_else(|| TaskError::NotFound(uuid.to_string()))?;
        task.apply(patch)?;
        self.save()
    }

    #[tracing::instrument(skip(self), fields(uuid = %uuid))]
    pub fn toggle_completed(&mut self, uuid: Uuid) -> anyhow::Result<bool> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.uuid == uuid)
            .ok_or_else(|| TaskError::NotFound(uuid.to_string()))?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.save()?;
        Ok(completed)
    }

    /// Moves the element at `from` to `to` (0-based, both in store order).
    #[tracing::instrument(skip(self))]
    pub fn reorder(&mut self, from: usize, to: usize) -> anyhow::Result<()> {
        let len = self.tasks.len();
        for index in [from, to] {
            if index >= len {
                return Err(TaskError::IndexOutOfRange { index, len }.into());
            }
        }
        if from == to {
            debug!("reorder to same position; nothing to do");
            return Ok(());
        }

        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        self.save()
    }

    /// Drag-and-drop placement: the task lands right before `anchor`, or at
    /// the end when there is no anchor.
    #[tracing::instrument(skip(self), fields(uuid = %uuid))]
    pub fn move_before(&mut self, uuid: Uuid, anchor: Option<Uuid>) -> anyhow::Result<()> {
        if anchor == Some(uuid) {
            return Ok(());
        }
        if let Some(anchor) = anchor
            && self.position(anchor).is_none()
        {
            return Err(TaskError::NotFound(anchor.to_string()).into());
        }

        let from = self
            .position(uuid)
            .ok_or_else(|| TaskError::NotFound(uuid.to_string()))?;
        let task = self.tasks.remove(from);

        let insert_at = anchor
            .and_then(|a| self.position(a))
            .unwrap_or(self.tasks.len());
        self.tasks.insert(insert_at, task);
        self.save()
    }

    /// Moves every task in `old` to `new`; saves once if anything changed.
    #[tracing::instrument(skip(self))]
    pub fn reassign_category(&mut self, old: &str, new: &str) -> anyhow::Result<usize> {
        let mut changed = 0;
        for task in self.tasks.iter_mut().filter(|t| t.category == old) {
            task.category = new.to_string();
            changed += 1;
        }

        if changed > 0 {
            self.save()?;
        }
        debug!(changed, "reassigned category");
        Ok(changed)
    }

    #[tracing::instrument(skip(self), fields(count = self.tasks.len()))]
    pub fn save(&self) -> anyhow::Result<()> {
        save_tasks(&self.path, &self.tasks).inspect_err(|err| {
            error!(
                file = %self.path.display(),
                error = %format!("{err:#}"),
                "failed to save tasks; in-memory changes kept"
            );
        })
    }
}

/// Reads the persisted snapshot. A missing file is an empty list; an
/// unreadable one is logged and also treated as empty.
#[tracing::instrument(skip(path), fields(file = %path.display()))]
pub fn load_tasks(path: &Path) -> Vec<Task> {
    if !path.exists() {
        debug!("no task file yet; starting empty");
        return vec![];
    }

    match load_jsonl(path) {
        Ok(tasks) => tasks,
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to load tasks; starting empty");
            vec![]
        }
    }
}

/// Overwrites `path` with the full task list.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    save_jsonl_atomic(path, tasks).with_context(|| format!("failed to save {}", path.display()))
}

#[tracing::instrument(skip(path))]
pub(crate) fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
pub(crate) fn save_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    if !dir.as_os_str().is_empty() && !dir.exists() {
        warn!(dir = %dir.display(), "data directory missing; creating it");
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
