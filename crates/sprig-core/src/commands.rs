use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument};

use crate::category::{ALL_CATEGORIES, CATEGORIES_FILE, CategoryFilter, CategoryRegistry};
use crate::config::Config;
use crate::datastore::{AddPosition, TASKS_FILE, TaskStore};
use crate::datetime::{local_date, parse_timezone};
use crate::error::TaskError;
use crate::render::{Renderer, Row};
use crate::stats::{self, PriorityFilter};
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::view::{self, ViewQuery};

/// Everything a user can ask for. Positions are 1-based, selectors are a
/// position or a uuid prefix.
#[derive(Debug, Clone)]
pub enum Action {
    Add(TaskDraft),
    Edit { selector: String, patch: TaskPatch },
    SetCompleted { selector: String, completed: bool },
    Toggle { selector: String },
    Delete { selector: String },
    Reorder { from: usize, to: usize },
    MoveBefore { selector: String, anchor: Option<String> },
    List(ViewQuery),
    Info { selector: String },
    Categories,
    CategoryAdd { name: String },
    CategoryRename { old: String, new: String },
    CategoryDelete { name: String },
    Stats { category: CategoryFilter, priority: PriorityFilter },
    Version,
}

/// The one owner of the task store and the category registry for a run.
#[derive(Debug)]
pub struct Session {
    pub store: TaskStore,
    pub categories: CategoryRegistry,
    timezone: Option<Tz>,
}

impl Session {
    #[instrument(skip(data_dir, cfg))]
    pub fn open(data_dir: &Path, cfg: &Config) -> anyhow::Result<Self> {
        let position = cfg
            .get_parsed::<AddPosition>("add.position")?
            .unwrap_or_default();
        let timezone = cfg
            .get("timezone")
            .and_then(|raw| parse_timezone(&raw, "config:timezone"));

        Ok(Self {
            store: TaskStore::open(data_dir.join(TASKS_FILE), position),
            categories: CategoryRegistry::open(data_dir.join(CATEGORIES_FILE)),
            timezone,
        })
    }

    pub fn new(store: TaskStore, categories: CategoryRegistry, timezone: Option<Tz>) -> Self {
        Self {
            store,
            categories,
            timezone,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today_at(Utc::now())
    }

    pub fn today_at(&self, now: DateTime<Utc>) -> NaiveDate {
        local_date(now, self.timezone)
    }

    /// The listing for `query`, each task paired with its store position.
    pub fn view(&self, query: &ViewQuery, today: NaiveDate) -> Vec<Row<'_>> {
        let tasks = self.store.tasks();
        view::compute(tasks, query, today)
            .into_iter()
            .map(|task| (self.position_of(task), task))
            .collect()
    }

    fn position_of(&self, task: &Task) -> usize {
        self.store.position(task.uuid).map_or(0, |idx| idx + 1)
    }
}

#[instrument(skip(session, renderer, action))]
pub fn dispatch(
    session: &mut Session,
    renderer: &mut Renderer,
    action: Action,
) -> anyhow::Result<()> {
    let now = Utc::now();
    debug!(?action, "dispatching action");

    match action {
        Action::Add(draft) => cmd_add(session, draft, now),
        Action::Edit { selector, patch } => cmd_edit(session, &selector, patch),
        Action::SetCompleted {
            selector,
            completed,
        } => cmd_set_completed(session, &selector, completed),
        Action::Toggle { selector } => cmd_toggle(session, &selector),
        Action::Delete { selector } => cmd_delete(session, &selector),
        Action::Reorder { from, to } => cmd_reorder(session, from, to),
        Action::MoveBefore { selector, anchor } => {
            cmd_move_before(session, &selector, anchor.as_deref())
        }
        Action::List(query) => cmd_list(session, renderer, &query, now),
        Action::Info { selector } => cmd_info(session, renderer, &selector),
        Action::Categories => cmd_categories(session, renderer),
        Action::CategoryAdd { name } => cmd_category_add(session, &name),
        Action::CategoryRename { old, new } => cmd_category_rename(session, &old, &new),
        Action::CategoryDelete { name } => cmd_category_delete(session, &name),
        Action::Stats { category, priority } => cmd_stats(session, renderer, &category, priority),
        Action::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[instrument(skip(session, draft, now))]
fn cmd_add(session: &mut Session, draft: TaskDraft, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command add");
    let task = Task::new(draft, now)?;
    let short = task.short_id();
    let uuid = session.store.add(task)?;
    let position = session.store.position(uuid).map_or(0, |idx| idx + 1);
    println!("Added task {position} ({short}).");
    Ok(())
}

#[instrument(skip(session, patch))]
fn cmd_edit(session: &mut Session, selector: &str, patch: TaskPatch) -> anyhow::Result<()> {
    info!("command edit");
    if patch.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    let uuid = session.store.resolve(selector)?;
    session.store.update(uuid, patch)?;
    println!("Updated task {selector}.");
    Ok(())
}

#[instrument(skip(session))]
fn cmd_set_completed(session: &mut Session, selector: &str, completed: bool) -> anyhow::Result<()> {
    info!("command set completed");
    let uuid = session.store.resolve(selector)?;
    session.store.update(
        uuid,
        TaskPatch {
            completed: Some(completed),
            ..TaskPatch::default()
        },
    )?;
    println!(
        "Marked task {selector} as {}.",
        completion_word(completed)
    );
    Ok(())
}

#[instrument(skip(session))]
fn cmd_toggle(session: &mut Session, selector: &str) -> anyhow::Result<()> {
    info!("command toggle");
    let uuid = session.store.resolve(selector)?;
    let completed = session.store.toggle_completed(uuid)?;
    println!(
        "Marked task {selector} as {}.",
        completion_word(completed)
    );
    Ok(())
}

#[instrument(skip(session))]
fn cmd_delete(session: &mut Session, selector: &str) -> anyhow::Result<()> {
    info!("command delete");
    let uuid = session.store.resolve(selector)?;
    let removed = session.store.remove(uuid)?;
    println!("Deleted task '{}'.", removed.title);
    Ok(())
}

#[instrument(skip(session))]
fn cmd_reorder(session: &mut Session, from: usize, to: usize) -> anyhow::Result<()> {
    info!("command move");
    let len = session.store.len();
    let to_index = |position: usize| {
        position
            .checked_sub(1)
            .filter(|idx| *idx < len)
            .ok_or(TaskError::IndexOutOfRange {
                index: position,
                len,
            })
    };
    session.store.reorder(to_index(from)?, to_index(to)?)?;
    println!("Moved task {from} to position {to}.");
    Ok(())
}

#[instrument(skip(session))]
fn cmd_move_before(
    session: &mut Session,
    selector: &str,
    anchor: Option<&str>,
) -> anyhow::Result<()> {
    info!("command move-before");
    let uuid = session.store.resolve(selector)?;
    let anchor = anchor
        .map(|raw| session.store.resolve(raw))
        .transpose()?;
    session.store.move_before(uuid, anchor)?;
    let position = session.store.position(uuid).map_or(0, |idx| idx + 1);
    println!("Task is now at position {position}.");
    Ok(())
}

#[instrument(skip(session, renderer, query, now))]
fn cmd_list(
    session: &mut Session,
    renderer: &mut Renderer,
    query: &ViewQuery,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let today = session.today_at(now);
    let rows = session.view(query, today);
    debug!(shown = rows.len(), total = session.store.len(), "listing tasks");
    renderer.print_task_table(&rows, today)
}

#[instrument(skip(session, renderer))]
fn cmd_info(session: &mut Session, renderer: &mut Renderer, selector: &str) -> anyhow::Result<()> {
    let uuid = session.store.resolve(selector)?;
    let position = session.store.position(uuid).map_or(0, |idx| idx + 1);
    let task = session
        .store
        .get(uuid)
        .ok_or_else(|| TaskError::NotFound(selector.to_string()))?;
    renderer.print_task_info(position, task)
}

#[instrument(skip(session, renderer))]
fn cmd_categories(session: &mut Session, renderer: &mut Renderer) -> anyhow::Result<()> {
    let tasks = session.store.tasks();
    let entries: Vec<(String, usize)> = session
        .categories
        .recompute(tasks)
        .into_iter()
        .map(|name| {
            let count = if name == ALL_CATEGORIES {
                tasks.len()
            } else {
                tasks.iter().filter(|t| t.category == name).count()
            };
            (name, count)
        })
        .collect();
    renderer.print_categories(&entries)
}

#[instrument(skip(session))]
fn cmd_category_add(session: &mut Session, name: &str) -> anyhow::Result<()> {
    info!("command category add");
    if session.categories.add(session.store.tasks(), name)? {
        println!("Added category '{}'.", name.trim());
    } else {
        println!("Category '{}' already exists.", name.trim());
    }
    Ok(())
}

#[instrument(skip(session))]
fn cmd_category_rename(session: &mut Session, old: &str, new: &str) -> anyhow::Result<()> {
    info!("command category rename");
    let moved = session.categories.rename(&mut session.store, old, new)?;
    println!(
        "Renamed category '{}' to '{}' ({moved} task(s) updated).",
        old.trim(),
        new.trim()
    );
    Ok(())
}

#[instrument(skip(session))]
fn cmd_category_delete(session: &mut Session, name: &str) -> anyhow::Result<()> {
    info!("command category delete");
    let moved = session.categories.delete(&mut session.store, name)?;
    println!(
        "Deleted category '{}' ({moved} task(s) moved to General).",
        name.trim()
    );
    Ok(())
}

#[instrument(skip(session, renderer))]
fn cmd_stats(
    session: &mut Session,
    renderer: &mut Renderer,
    category: &CategoryFilter,
    priority: PriorityFilter,
) -> anyhow::Result<()> {
    let stats = stats::compute(session.store.tasks(), category, priority);
    let label = format!("Completion for {category}, priority {priority}");
    renderer.print_stats(&label, stats)
}

fn completion_word(completed: bool) -> &'static str {
    if completed { "completed" } else { "not completed" }
}
