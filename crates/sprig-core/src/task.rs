use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::ALL_CATEGORIES;
use crate::error::TaskError;

/// Category every task falls back to when none is given.
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Blank input means "use the default", anything else must name a level.
    pub fn parse_or_default(raw: &str) -> Result<Self, TaskError> {
        if raw.trim().is_empty() {
            Ok(Self::default())
        } else {
            raw.parse()
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            _ => Err(TaskError::InvalidPriority(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub uuid: Uuid,

    pub title: String,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub due: Option<NaiveDate>,

    #[serde(default)]
    pub completed: bool,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub priority: Priority,

    pub created_at: DateTime<Utc>,
}

/// Raw input for a new task, before trimming and defaults.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub notes: String,
    pub due: Option<NaiveDate>,
    pub category: String,
    pub priority: Priority,
    pub completed: bool,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Field replacements for an existing task. `None` leaves a field alone;
/// `due: Some(None)` clears the due date.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due: Option<Option<NaiveDate>>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.due.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
    }

    fn validate(&self) -> Result<(), TaskError> {
        if let Some(title) = &self.title {
            normalize_title(title)?;
        }
        if let Some(category) = &self.category {
            normalize_category(category)?;
        }
        Ok(())
    }
}

impl Task {
    pub fn new(draft: TaskDraft, now: DateTime<Utc>) -> Result<Self, TaskError> {
        Ok(Self {
            uuid: Uuid::new_v4(),
            title: normalize_title(&draft.title)?,
            notes: draft.notes.trim().to_string(),
            due: draft.due,
            completed: draft.completed,
            category: normalize_category(&draft.category)?,
            priority: draft.priority,
            created_at: now,
        })
    }

    /// Applies every field of `patch` or none of them.
    pub fn apply(&mut self, patch: TaskPatch) -> Result<(), TaskError> {
        patch.validate()?;

        if let Some(title) = patch.title {
            self.title = normalize_title(&title)?;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes.trim().to_string();
        }
        if let Some(due) = patch.due {
            self.due = due;
        }
        if let Some(category) = patch.category {
            self.category = normalize_category(&category)?;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        Ok(())
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.due == Some(date)
    }

    pub fn short_id(&self) -> String {
        self.uuid.simple().to_string()[..8].to_string()
    }
}

fn normalize_title(raw: &str) -> Result<String, TaskError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(title.to_string())
}

/// Blank means the default category. The filter sentinel is never a
/// task's category.
fn normalize_category(raw: &str) -> Result<String, TaskError> {
    let category = raw.trim();
    if category.is_empty() {
        return Ok(DEFAULT_CATEGORY.to_string());
    }
    if category == ALL_CATEGORIES {
        return Err(TaskError::ReservedCategory(category.to_string()));
    }
    Ok(category.to_string())
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}
