use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::category::CategoryFilter;
use crate::commands::Action;
use crate::config::Config;
use crate::datetime::parse_due;
use crate::stats::PriorityFilter;
use crate::task::{Priority, TaskDraft, TaskPatch};
use crate::view::{FilterMode, SortOrder, ViewQuery};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sprig",
    version,
    about = "Sprig: a small to-do list manager",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "sprigrc", global = true)]
    pub sprigrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task
    Add(AddArgs),
    /// Change fields of a task
    Edit(EditArgs),
    /// Mark a task completed
    Done { selector: String },
    /// Mark a task not completed
    Undone { selector: String },
    /// Flip a task's completion flag
    Toggle { selector: String },
    /// Delete a task
    Delete { selector: String },
    /// Move the task at position FROM to position TO (1-based)
    Move { from: usize, to: usize },
    /// Place a task right before ANCHOR, or last when no anchor is given
    MoveBefore {
        selector: String,
        anchor: Option<String>,
    },
    /// Show tasks
    List(ListArgs),
    /// Show every field of one task
    Info { selector: String },
    /// List known categories
    Categories,
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Completed vs pending counts
    Stats(StatsArgs),
    /// Print the version
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    Add { name: String },
    Rename { old: String, new: String },
    Delete { name: String },
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,

    #[arg(long, short = 'n', default_value = "")]
    pub notes: String,

    #[arg(long, short = 'd')]
    pub due: Option<String>,

    #[arg(long, short = 'c', default_value = "")]
    pub category: String,

    #[arg(long, short = 'p')]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub done: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub selector: String,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long, short = 'n')]
    pub notes: Option<String>,

    #[arg(long, short = 'd', conflicts_with = "clear_due")]
    pub due: Option<String>,

    #[arg(long)]
    pub clear_due: bool,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long, short = 'f')]
    pub filter: Option<FilterMode>,

    #[arg(long, short = 's')]
    pub search: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long, conflicts_with = "no_today_first")]
    pub today_first: bool,

    #[arg(long)]
    pub no_today_first: bool,

    #[arg(long)]
    pub sort: Option<SortOrder>,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[arg(long, short = 'c', default_value = "")]
    pub category: String,

    #[arg(long, short = 'p', default_value = "all")]
    pub priority: PriorityFilter,
}

impl Command {
    /// Turns parsed arguments into an action, resolving config defaults and
    /// due-date expressions against `today`.
    #[tracing::instrument(skip(self, cfg))]
    pub fn into_action(self, cfg: &Config, today: NaiveDate) -> anyhow::Result<Action> {
        let action = match self {
            Command::Add(args) => {
                let due = match args.due.as_deref() {
                    Some(raw) => parse_due(raw, today)?,
                    None => None,
                };
                Action::Add(TaskDraft {
                    title: args.title,
                    notes: args.notes,
                    due,
                    category: args.category,
                    priority: args.priority.unwrap_or_default(),
                    completed: args.done,
                })
            }
            Command::Edit(args) => {
                let due = if args.clear_due {
                    Some(None)
                } else {
                    match args.due.as_deref() {
                        Some(raw) => Some(parse_due(raw, today)?),
                        None => None,
                    }
                };
                Action::Edit {
                    selector: args.selector,
                    patch: TaskPatch {
                        title: args.title,
                        notes: args.notes,
                        due,
                        category: args.category,
                        priority: args.priority,
                        completed: None,
                    },
                }
            }
            Command::Done { selector } => Action::SetCompleted {
                selector,
                completed: true,
            },
            Command::Undone { selector } => Action::SetCompleted {
                selector,
                completed: false,
            },
            Command::Toggle { selector } => Action::Toggle { selector },
            Command::Delete { selector } => Action::Delete { selector },
            Command::Move { from, to } => Action::Reorder { from, to },
            Command::MoveBefore { selector, anchor } => Action::MoveBefore { selector, anchor },
            Command::List(args) => Action::List(args.into_query(cfg)?),
            Command::Info { selector } => Action::Info { selector },
            Command::Categories => Action::Categories,
            Command::Category { action } => match action {
                CategoryCommand::Add { name } => Action::CategoryAdd { name },
                CategoryCommand::Rename { old, new } => Action::CategoryRename { old, new },
                CategoryCommand::Delete { name } => Action::CategoryDelete { name },
            },
            Command::Stats(args) => Action::Stats {
                category: CategoryFilter::parse(&args.category),
                priority: args.priority,
            },
            Command::Version => Action::Version,
        };

        debug!(?action, "resolved action");
        Ok(action)
    }
}

impl ListArgs {
    pub fn into_query(self, cfg: &Config) -> anyhow::Result<ViewQuery> {
        let today_first = if self.today_first {
            true
        } else if self.no_today_first {
            false
        } else {
            cfg.get_bool("list.today_first").unwrap_or(false)
        };

        let sort = match self.sort {
            Some(sort) => sort,
            None => cfg.get_parsed::<SortOrder>("list.sort")?.unwrap_or_default(),
        };

        Ok(ViewQuery {
            mode: self.filter.unwrap_or_default(),
            text: self.search.unwrap_or_default(),
            category: CategoryFilter::parse(self.category.as_deref().unwrap_or_default()),
            today_first,
            sort,
        })
    }
}

/// Command to run when none is given, from `default.command`.
pub fn default_command(cfg: &Config) -> Command {
    let name = cfg
        .get("default.command")
        .unwrap_or_else(|| "list".to_string());
    match name.trim() {
        "stats" => Command::Stats(StatsArgs {
            category: String::new(),
            priority: PriorityFilter::All,
        }),
        "categories" => Command::Categories,
        "list" => Command::List(ListArgs::default()),
        other => {
            warn!(command = %other, "unsupported default.command; using list");
            Command::List(ListArgs::default())
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
