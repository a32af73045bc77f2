use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::datastore::{TaskStore, load_jsonl, save_jsonl_atomic};
use crate::error::TaskError;
use crate::task::{DEFAULT_CATEGORY, Task};

/// Filter-only marker meaning "every category". Never stored on a task.
pub const ALL_CATEGORIES: &str = "All Categories";

pub const CATEGORIES_FILE: &str = "categories.data";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed == ALL_CATEGORIES
            || trimmed.eq_ignore_ascii_case("all")
        {
            Self::All
        } else {
            Self::Named(trimmed.to_string())
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => name == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_CATEGORIES),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Known categories: the ones tasks use plus the ones registered by hand.
///
/// Hand-registered names live in a sidecar file next to the task data so an
/// empty category survives between runs.
#[derive(Debug)]
pub struct CategoryRegistry {
    path: PathBuf,
    manual: BTreeSet<String>,
}

impl CategoryRegistry {
    #[tracing::instrument(skip_all)]
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let manual = if path.exists() {
            match load_jsonl::<String>(&path) {
                Ok(names) => names.into_iter().collect(),
                Err(err) => {
                    error!(
                        file = %path.display(),
                        error = %format!("{err:#}"),
                        "failed to load categories; starting empty"
                    );
                    BTreeSet::new()
                }
            }
        } else {
            BTreeSet::new()
        };

        info!(file = %path.display(), manual = manual.len(), "opened category registry");
        Self { path, manual }
    }

    /// Sentinel first, then every known category in lexical order.
    pub fn recompute(&self, tasks: &[Task]) -> Vec<String> {
        let mut names: BTreeSet<&str> = BTreeSet::new();
        names.insert(DEFAULT_CATEGORY);
        names.extend(tasks.iter().map(|t| t.category.as_str()));
        names.extend(self.manual.iter().map(String::as_str));
        names.remove(ALL_CATEGORIES);

        std::iter::once(ALL_CATEGORIES)
            .chain(names)
            .map(str::to_string)
            .collect()
    }

    pub fn contains(&self, tasks: &[Task], name: &str) -> bool {
        name == ALL_CATEGORIES
            || name == DEFAULT_CATEGORY
            || self.manual.contains(name)
            || tasks.iter().any(|t| t.category == name)
    }

    /// Registers an empty category. Returns `false` if it was already known.
    #[tracing::instrument(skip(self, tasks))]
    pub fn add(&mut self, tasks: &[Task], name: &str) -> anyhow::Result<bool> {
        let name = checked_name(name)?;
        if self.contains(tasks, &name) {
            debug!(name = %name, "category already known");
            return Ok(false);
        }

        self.manual.insert(name);
        self.save()?;
        Ok(true)
    }

    /// Renames `old` everywhere. Returns how many tasks moved.
    #[tracing::instrument(skip(self, store))]
    pub fn rename(&mut self, store: &mut TaskStore, old: &str, new: &str) -> anyhow::Result<usize> {
        let old = old.trim();
        let new = checked_name(new)?;
        if old == ALL_CATEGORIES {
            return Err(TaskError::ReservedCategory(old.to_string()).into());
        }
        if !self.contains(store.tasks(), old) {
            return Err(TaskError::UnknownCategory(old.to_string()).into());
        }
        if old == new {
            return Ok(0);
        }

        // The default stays listed after a rename; the new name must too.
        if self.manual.remove(old) || old == DEFAULT_CATEGORY {
            self.manual.insert(new.clone());
        }
        let moved = store.reassign_category(old, &new);
        self.save()?;
        let moved = moved?;

        info!(old, new = %new, moved, "renamed category");
        Ok(moved)
    }

    /// Removes `name`, moving its tasks to the default category. Returns
    /// how many tasks moved.
    #[tracing::instrument(skip(self, store))]
    pub fn delete(&mut self, store: &mut TaskStore, name: &str) -> anyhow::Result<usize> {
        let name = name.trim();
        if name == ALL_CATEGORIES {
            return Err(TaskError::ReservedCategory(name.to_string()).into());
        }
        if !self.contains(store.tasks(), name) {
            return Err(TaskError::UnknownCategory(name.to_string()).into());
        }
        if name == DEFAULT_CATEGORY {
            debug!("default category is built in; its tasks stay where they are");
            return Ok(0);
        }

        let was_manual = self.manual.remove(name);
        let moved = store.reassign_category(name, DEFAULT_CATEGORY);
        if was_manual {
            self.save()?;
        }
        let moved = moved?;

        info!(name, moved, "deleted category");
        Ok(moved)
    }

    fn save(&self) -> anyhow::Result<()> {
        let names: Vec<&String> = self.manual.iter().collect();
        save_jsonl_atomic(&self.path, &names).inspect_err(|err| {
            error!(
                file = %self.path.display(),
                error = %format!("{err:#}"),
                "failed to save categories; in-memory changes kept"
            );
        })
    }
}

fn checked_name(raw: &str) -> Result<String, TaskError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TaskError::EmptyCategory);
    }
    if name == ALL_CATEGORIES {
        return Err(TaskError::ReservedCategory(name.to_string()));
    }
    Ok(name.to_string())
}
