use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;
use tracing::trace;

use crate::category::CategoryFilter;
use crate::error::TaskError;
use crate::task::Task;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum FilterMode {
  #[default]
  All,
  Active,
  Completed
}

impl FilterMode {
  pub fn permits(
    self,
    completed: bool
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Active => !completed,
      | Self::Completed => completed
    }
  }
}

impl FromStr for FilterMode {
  type Err = TaskError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Self::All),
      | "active" | "pending" => {
        Ok(Self::Active)
      }
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | other => Err(
        TaskError::InvalidFilterMode(
          other.to_string()
        )
      )
    }
  }
}

/// `Smart` puts open work first and newest first; `Manual` keeps the
/// store's own order.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum SortOrder {
  #[default]
  Smart,
  Manual
}

impl FromStr for SortOrder {
  type Err = TaskError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "smart" | "default" => {
        Ok(Self::Smart)
      }
      | "manual" | "store" => {
        Ok(Self::Manual)
      }
      | other => Err(
        TaskError::InvalidSortOrder(
          other.to_string()
        )
      )
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
  pub mode:        FilterMode,
  pub text:        String,
  pub category:    CategoryFilter,
  pub today_first: bool,
  pub sort:        SortOrder
}

impl ViewQuery {
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    if !self.mode.permits(task.completed)
    {
      return false;
    }

    let needle =
      self.text.trim().to_lowercase();
    if !needle.is_empty() {
      let blob = format!(
        "{}\n{}\n{}",
        task.title,
        task.notes,
        task.category
      )
      .to_lowercase();
      if !blob.contains(&needle) {
        return false;
      }
    }

    self.category.matches(&task.category)
  }
}

/// Projects `tasks` through `query`. The result borrows from `tasks`.
#[tracing::instrument(skip(
  tasks, query
))]
pub fn compute<'a>(
  tasks: &'a [Task],
  query: &ViewQuery,
  today: NaiveDate
) -> Vec<&'a Task> {
  let mut out: Vec<&Task> = tasks
    .iter()
    .filter(|task| query.matches(task))
    .collect();

  out.sort_by(|a, b| {
    compare(a, b, query, today)
  });

  trace!(
    total = tasks.len(),
    shown = out.len(),
    "computed view"
  );
  out
}

fn compare(
  a: &Task,
  b: &Task,
  query: &ViewQuery,
  today: NaiveDate
) -> Ordering {
  let boost = if query.today_first {
    b.is_due_on(today)
      .cmp(&a.is_due_on(today))
  } else {
    Ordering::Equal
  };

  match query.sort {
    | SortOrder::Manual => boost,
    | SortOrder::Smart => {
      boost
        .then_with(|| {
          a.completed.cmp(&b.completed)
        })
        .then_with(|| {
          b.created_at.cmp(&a.created_at)
        })
    }
  }
}
