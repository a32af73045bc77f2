use std::fmt;
use std::str::FromStr;

use crate::category::CategoryFilter;
use crate::error::TaskError;
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == priority,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed.parse().map(Self::Only)
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(priority) => write!(f, "{priority}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub completed: usize,
    pub pending: usize,
}

impl Stats {
    pub fn total(&self) -> usize {
        self.completed + self.pending
    }

    /// Share of completed tasks, rounded. `None` when nothing matched.
    pub fn completed_percent(&self) -> Option<u8> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let pct = (self.completed as f64 / total as f64 * 100.0).round();
        Some(pct as u8)
    }
}

pub fn compute(tasks: &[Task], category: &CategoryFilter, priority: PriorityFilter) -> Stats {
    tasks
        .iter()
        .filter(|t| category.matches(&t.category) && priority.matches(t.priority))
        .fold(Stats::default(), |mut acc, t| {
            if t.completed {
                acc.completed += 1;
            } else {
                acc.pending += 1;
            }
            acc
        })
}
