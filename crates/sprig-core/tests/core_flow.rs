use std::fs;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use sprig_core::category::{ALL_CATEGORIES, CATEGORIES_FILE, CategoryFilter, CategoryRegistry};
use sprig_core::commands::{Action, Session, dispatch};
use sprig_core::config::Config;
use sprig_core::datastore::{AddPosition, TASKS_FILE, TaskStore, load_tasks, save_tasks};
use sprig_core::error::TaskError;
use sprig_core::render::Renderer;
use sprig_core::stats::{self, PriorityFilter, Stats};
use sprig_core::task::{Priority, Task, TaskDraft, TaskPatch};
use sprig_core::view::{self, FilterMode, ViewQuery};
use tempfile::tempdir;

fn draft(title: &str, category: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        category: category.to_string(),
        ..TaskDraft::default()
    }
}

fn titles(view: &[&Task]) -> Vec<String> {
    view.iter().map(|t| t.title.clone()).collect()
}

#[test]
fn snapshot_roundtrip_preserves_order_and_fields() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join(TASKS_FILE);
    let now = Utc::now();

    let mut first = Task::new(
        TaskDraft {
            title: "Buy groceries".to_string(),
            notes: "milk, eggs".to_string(),
            due: NaiveDate::from_ymd_opt(2026, 4, 1),
            category: "Home".to_string(),
            priority: Priority::High,
            completed: true,
        },
        now,
    )
    .expect("valid task");
    first.notes.push_str("\nand bread");
    let second = Task::new(draft("Call mom", "Family"), now + Duration::seconds(1))
        .expect("valid task");
    let tasks = vec![first, second];

    save_tasks(&path, &tasks).expect("save");
    assert_eq!(load_tasks(&path), tasks);

    save_tasks(&path, &tasks[1..]).expect("overwrite");
    assert_eq!(load_tasks(&path), tasks[1..].to_vec());
}

#[test]
fn store_reopens_with_persisted_state() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join(TASKS_FILE);

    let mut store = TaskStore::open(&path, AddPosition::Top);
    let a = store
        .add(Task::new(draft("a", ""), Utc::now()).expect("task"))
        .expect("add a");
    store
        .add(Task::new(draft("b", ""), Utc::now()).expect("task"))
        .expect("add b");
    store
        .update(
            a,
            TaskPatch {
                title: Some("a2".to_string()),
                completed: Some(true),
                ..TaskPatch::default()
            },
        )
        .expect("update");
    store.reorder(0, 1).expect("reorder");

    let reopened = TaskStore::open(&path, AddPosition::Top);
    assert_eq!(reopened.tasks(), store.tasks());
    assert_eq!(reopened.tasks()[0].title, "a2");
    assert!(reopened.tasks()[0].completed);
}

#[test]
fn missing_or_corrupt_file_loads_empty() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join(TASKS_FILE);
    assert!(load_tasks(&path).is_empty());

    fs::write(&path, "{\"uuid\": \"not-a-uuid\"}\ngarbage\n").expect("write corrupt file");
    let store = TaskStore::open(&path, AddPosition::Top);
    assert!(store.is_empty());
}

#[test]
fn failed_save_keeps_in_memory_change() {
    let temp = tempdir().expect("tempdir");
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "a file, not a directory").expect("write blocker");

    let mut store = TaskStore::open(blocker.join(TASKS_FILE), AddPosition::Top);
    let err = store
        .add(Task::new(draft("unsaved", ""), Utc::now()).expect("task"))
        .expect_err("save should fail");

    assert!(err.downcast_ref::<TaskError>().is_none());
    assert_eq!(store.len(), 1);
    assert_eq!(store.tasks()[0].title, "unsaved");
}

#[test]
fn filter_modes_partition_the_store() {
    let now = Utc::now();
    let tasks: Vec<Task> = (0..6)
        .map(|i| {
            Task::new(
                TaskDraft {
                    title: format!("task {i}"),
                    completed: i % 3 == 0,
                    ..TaskDraft::default()
                },
                now + Duration::seconds(i),
            )
            .expect("task")
        })
        .collect();
    let today = now.date_naive();

    let query = |mode| ViewQuery {
        mode,
        ..ViewQuery::default()
    };
    let active = view::compute(&tasks, &query(FilterMode::Active), today);
    let completed = view::compute(&tasks, &query(FilterMode::Completed), today);
    let all = view::compute(&tasks, &query(FilterMode::All), today);

    assert!(active.iter().all(|t| !t.completed));
    assert_eq!(active.len(), tasks.iter().filter(|t| !t.completed).count());
    assert!(completed.iter().all(|t| t.completed));
    assert_eq!(completed.len(), 2);
    assert_eq!(all.len(), tasks.len());
}

#[test]
fn deleting_a_category_moves_tasks_to_general() {
    let temp = tempdir().expect("tempdir");
    let mut store = TaskStore::open(temp.path().join(TASKS_FILE), AddPosition::Bottom);
    let mut registry = CategoryRegistry::open(temp.path().join(CATEGORIES_FILE));
    for (title, category) in [("report", "Work"), ("standup", "Work"), ("dishes", "Home")] {
        store
            .add(Task::new(draft(title, category), Utc::now()).expect("task"))
            .expect("add");
    }

    assert_eq!(registry.delete(&mut store, "Work").expect("delete"), 2);

    assert!(store.tasks().iter().all(|t| t.category != "Work"));
    assert_eq!(store.tasks()[0].category, "General");
    assert_eq!(store.tasks()[1].category, "General");
    assert_eq!(store.tasks()[2].category, "Home");
    assert!(!registry.recompute(store.tasks()).contains(&"Work".to_string()));

    let reopened = TaskStore::open(temp.path().join(TASKS_FILE), AddPosition::Bottom);
    assert!(reopened.tasks().iter().all(|t| t.category != "Work"));

    let err = registry.delete(&mut store, "Work").expect_err("already gone");
    assert_eq!(
        err.downcast_ref::<TaskError>(),
        Some(&TaskError::UnknownCategory("Work".to_string()))
    );
}

#[test]
fn sentinel_is_always_first() {
    let temp = tempdir().expect("tempdir");
    let mut registry = CategoryRegistry::open(temp.path().join(CATEGORIES_FILE));
    let tasks = vec![
        Task::new(draft("a", "!urgent"), Utc::now()).expect("task"),
        Task::new(draft("b", "AAA"), Utc::now()).expect("task"),
    ];
    registry.add(&tasks, "0-inbox").expect("add");

    let names = registry.recompute(&tasks);
    assert_eq!(names[0], ALL_CATEGORIES);
    assert_eq!(names.iter().filter(|n| *n == ALL_CATEGORIES).count(), 1);
    assert_eq!(names, vec![ALL_CATEGORIES, "!urgent", "0-inbox", "AAA", "General"]);
}

#[test]
fn today_first_ordering_scenario() {
    let base = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).single().expect("valid");
    let today = NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid");

    let a = Task::new(
        TaskDraft {
            title: "A".to_string(),
            due: Some(today),
            ..TaskDraft::default()
        },
        base + Duration::seconds(1),
    )
    .expect("task");
    let b = Task::new(
        TaskDraft {
            title: "B".to_string(),
            completed: true,
            ..TaskDraft::default()
        },
        base + Duration::seconds(2),
    )
    .expect("task");
    let c = Task::new(TaskDraft::new("C"), base + Duration::seconds(3)).expect("task");
    let tasks = vec![a, b, c];

    let view = view::compute(
        &tasks,
        &ViewQuery {
            today_first: true,
            ..ViewQuery::default()
        },
        today,
    );
    assert_eq!(titles(&view), vec!["A", "C", "B"]);
}

#[test]
fn search_scenario() {
    let tasks = vec![
        Task::new(draft("Buy groceries", "Home"), Utc::now()).expect("task"),
        Task::new(draft("Call mom", "Family"), Utc::now()).expect("task"),
    ];

    let view = view::compute(
        &tasks,
        &ViewQuery {
            text: "groc".to_string(),
            ..ViewQuery::default()
        },
        Utc::now().date_naive(),
    );
    assert_eq!(titles(&view), vec!["Buy groceries"]);
}

#[test]
fn empty_title_is_rejected_without_saving() {
    let temp = tempdir().expect("tempdir");
    let cfg = Config::default();
    let mut session = Session::new(
        TaskStore::open(temp.path().join(TASKS_FILE), AddPosition::Top),
        CategoryRegistry::open(temp.path().join(CATEGORIES_FILE)),
        None,
    );
    let mut renderer = Renderer::new(&cfg).expect("renderer");

    let err = dispatch(&mut session, &mut renderer, Action::Add(draft("   ", "Home")))
        .expect_err("blank title");

    assert_eq!(err.downcast_ref::<TaskError>(), Some(&TaskError::EmptyTitle));
    assert_eq!(session.store.len(), 0);
    assert!(!temp.path().join(TASKS_FILE).exists());
}

#[test]
fn stats_scenario() {
    let mut tasks = Vec::new();
    for completed in [true, true, false] {
        tasks.push(
            Task::new(
                TaskDraft {
                    title: "work item".to_string(),
                    category: "Work".to_string(),
                    completed,
                    ..TaskDraft::default()
                },
                Utc::now(),
            )
            .expect("task"),
        );
    }
    for _ in 0..2 {
        tasks.push(Task::new(draft("chore", "Home"), Utc::now()).expect("task"));
    }

    let work = stats::compute(
        &tasks,
        &CategoryFilter::Named("Work".to_string()),
        PriorityFilter::All,
    );
    assert_eq!(
        work,
        Stats {
            completed: 2,
            pending: 1
        }
    );

    let everything = stats::compute(&tasks, &CategoryFilter::All, PriorityFilter::All);
    assert_eq!(everything.total(), 5);
    assert_eq!(everything.pending, 3);
}

#[test]
fn session_dispatch_flow() {
    let temp = tempdir().expect("tempdir");
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![("add.position".to_string(), "bottom".to_string())]);
    let mut session = Session::open(temp.path(), &cfg).expect("open session");
    let mut renderer = Renderer::new(&cfg).expect("renderer");

    for title in ["first", "second", "third"] {
        dispatch(&mut session, &mut renderer, Action::Add(draft(title, "Work"))).expect("add");
    }
    dispatch(
        &mut session,
        &mut renderer,
        Action::SetCompleted {
            selector: "2".to_string(),
            completed: true,
        },
    )
    .expect("done");
    dispatch(&mut session, &mut renderer, Action::Reorder { from: 3, to: 1 }).expect("move");
    dispatch(
        &mut session,
        &mut renderer,
        Action::CategoryRename {
            old: "Work".to_string(),
            new: "Office".to_string(),
        },
    )
    .expect("rename");

    let stored: Vec<(&str, bool, &str)> = session
        .store
        .tasks()
        .iter()
        .map(|t| (t.title.as_str(), t.completed, t.category.as_str()))
        .collect();
    assert_eq!(
        stored,
        vec![
            ("third", false, "Office"),
            ("first", false, "Office"),
            ("second", true, "Office"),
        ]
    );

    let err = dispatch(&mut session, &mut renderer, Action::Reorder { from: 0, to: 1 })
        .expect_err("positions are 1-based");
    assert_eq!(
        err.downcast_ref::<TaskError>(),
        Some(&TaskError::IndexOutOfRange { index: 0, len: 3 })
    );

    let reopened = Session::open(temp.path(), &cfg).expect("reopen");
    assert_eq!(reopened.store.tasks(), session.store.tasks());
}

#[test]
fn sentinel_category_never_reaches_a_task() {
    let temp = tempdir().expect("tempdir");
    let cfg = Config::default();
    let mut session = Session::open(temp.path(), &cfg).expect("open session");
    let mut renderer = Renderer::new(&cfg).expect("renderer");
    let tasks_path = temp.path().join(TASKS_FILE);

    let err = dispatch(
        &mut session,
        &mut renderer,
        Action::Add(draft("Plan trip", ALL_CATEGORIES)),
    )
    .expect_err("sentinel is not a category");
    assert_eq!(
        err.downcast_ref::<TaskError>(),
        Some(&TaskError::ReservedCategory(ALL_CATEGORIES.to_string()))
    );
    assert!(session.store.is_empty());
    assert!(!tasks_path.exists());

    dispatch(&mut session, &mut renderer, Action::Add(draft("Plan trip", "Travel")))
        .expect("add");
    let before = fs::read(&tasks_path).expect("read tasks");

    let err = dispatch(
        &mut session,
        &mut renderer,
        Action::Edit {
            selector: "1".to_string(),
            patch: TaskPatch {
                category: Some(ALL_CATEGORIES.to_string()),
                ..TaskPatch::default()
            },
        },
    )
    .expect_err("sentinel is not a category");
    assert!(matches!(
        err.downcast_ref::<TaskError>(),
        Some(TaskError::ReservedCategory(_))
    ));
    assert_eq!(session.store.tasks()[0].category, "Travel");
    assert_eq!(fs::read(&tasks_path).expect("read tasks"), before);
}

#[test]
fn rejected_edit_does_not_touch_the_file() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join(TASKS_FILE);
    let mut store = TaskStore::open(&path, AddPosition::Bottom);
    let uuid = store
        .add(Task::new(draft("Buy groceries", "Home"), Utc::now()).expect("task"))
        .expect("add");
    let before = fs::read(&path).expect("read tasks");

    let err = store
        .update(
            uuid,
            TaskPatch {
                title: Some("   ".to_string()),
                notes: Some("changed".to_string()),
                ..TaskPatch::default()
            },
        )
        .expect_err("blank title");
    assert_eq!(err.downcast_ref::<TaskError>(), Some(&TaskError::EmptyTitle));
    assert_eq!(fs::read(&path).expect("read tasks"), before);
    assert_eq!(store.tasks()[0].notes, "");

    store.remove(uuid::Uuid::new_v4()).expect_err("unknown task");
    assert_eq!(fs::read(&path).expect("read tasks"), before);
    assert_eq!(load_tasks(&path), store.tasks().to_vec());
}

#[test]
fn renamed_default_category_is_listed() {
    let temp = tempdir().expect("tempdir");
    let cfg = Config::default();
    let mut session = Session::open(temp.path(), &cfg).expect("open session");
    let mut renderer = Renderer::new(&cfg).expect("renderer");

    dispatch(
        &mut session,
        &mut renderer,
        Action::CategoryRename {
            old: " General ".to_string(),
            new: "Misc".to_string(),
        },
    )
    .expect("rename");

    let reopened = Session::open(temp.path(), &cfg).expect("reopen");
    assert_eq!(
        reopened.categories.recompute(reopened.store.tasks()),
        vec![ALL_CATEGORIES, "General", "Misc"]
    );
}
