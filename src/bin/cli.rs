//! Command-line board client.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kanban::board::BoardController;
use kanban::config::DEFAULT_LOG_FILTER;
use kanban::reminder::{ConsoleNotifier, ReminderScheduler, SystemClock};
use kanban::task::{ClientZone, Mapper};
use kanban::{
    HttpTaskApi, KanbanConfig, LocalTaskApi, PreferenceStore, Priority, SqliteTaskStore, TaskApi,
    TaskDraft, TaskFilter, TaskId, TaskStatus, Theme,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// How often `watch` reloads the board.
const WATCH_RELOAD_INTERVAL: Duration = Duration::from_secs(60);

/// Kanban: a single-board task tracker.
#[derive(Parser)]
#[command(name = "kanban", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Task API base URL (overrides config).
    #[arg(long)]
    url: Option<String>,

    /// Use the local SQLite database directly instead of the HTTP API.
    #[arg(long)]
    local: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Show the board.
    List(ListArgs),

    /// Add a task.
    Add {
        /// Task title.
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// Edit a task; unspecified fields keep their value.
    Edit {
        /// Task id.
        id: i64,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// Move a task to another column (todo, inprogress, done).
    Move {
        /// Task id.
        id: i64,
        /// Target column.
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },

    /// Delete a task.
    Delete {
        /// Task id.
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Keep the board loaded and print reminders as they come due.
    Watch,

    /// Show, set or toggle the theme.
    Theme {
        /// `light`, `dark` or `toggle`.
        value: Option<String>,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Case-insensitive text search over title and description.
    #[arg(short, long)]
    search: Option<String>,
    /// Only show this priority.
    #[arg(short, long, value_parser = parse_priority)]
    priority: Option<Priority>,
    /// Only show tasks carrying this tag.
    #[arg(short, long)]
    tag: Option<String>,
}

#[derive(Args)]
struct TaskFields {
    /// Description.
    #[arg(short, long)]
    description: Option<String>,
    /// Column (todo, inprogress, done).
    #[arg(short, long, value_parser = parse_status)]
    status: Option<TaskStatus>,
    /// Priority (low, medium, high).
    #[arg(short, long, value_parser = parse_priority)]
    priority: Option<Priority>,
    /// Due date as local time, `YYYY-MM-DDTHH:MM[:SS]`.
    #[arg(long)]
    due: Option<String>,
    /// Remove the due date.
    #[arg(long, conflicts_with = "due")]
    no_due: bool,
    /// Enable or disable the due-date reminder.
    #[arg(long)]
    remind: Option<bool>,
    /// Comma-separated tags.
    #[arg(long)]
    tags: Option<String>,
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(value).ok_or_else(|| format!("unknown status {value:?}"))
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| format!("unknown priority {value:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(KanbanConfig::default_config_path);
    let mut config = KanbanConfig::load_or_default(&config_path)?;
    if let Some(url) = cli.url.clone() {
        config.client.base_url = url;
    }

    let command = cli.command.unwrap_or(Command::List(ListArgs {
        search: None,
        priority: None,
        tag: None,
    }));

    if let Command::Theme { value } = &command {
        return run_theme(value.as_deref());
    }

    if cli.local {
        let db_path = config.store.effective_database_path();
        let store = SqliteTaskStore::open(&db_path)
            .with_context(|| format!("opening {}", db_path.display()))?;
        let api = LocalTaskApi::new(Arc::new(store));
        run(build_board(api, &config)?, command).await
    } else {
        let api = HttpTaskApi::new(&config.client)?;
        run(build_board(api, &config)?, command).await
    }
}

fn build_board<A: TaskApi>(api: A, config: &KanbanConfig) -> anyhow::Result<BoardController<A>> {
    let zone = config.client.zone()?;
    let scheduler = ReminderScheduler::with_clock(
        Arc::new(ConsoleNotifier),
        Arc::new(SystemClock),
        config.reminders.lead(),
    )
    .with_enabled(config.reminders.enabled);
    Ok(BoardController::new(api, Mapper::new(zone), scheduler))
}

async fn run<A: TaskApi>(mut board: BoardController<A>, command: Command) -> anyhow::Result<()> {
    board.mount().await?;
    let zone = board.mapper().zone();

    match command {
        Command::List(args) => {
            let mut filter = TaskFilter::default();
            if let Some(search) = args.search {
                filter = filter.with_search(search);
            }
            if let Some(priority) = args.priority {
                filter = filter.with_priority(priority);
            }
            if let Some(tag) = args.tag {
                filter = filter.with_tag(tag);
            }
            board.set_filter(filter);
            print_board(&board, &zone);
        }
        Command::Add { title, fields } => {
            let draft = fields.apply(TaskDraft::new(title), &zone)?;
            board.add_task(draft).await?;
            println!("Task added.");
        }
        Command::Edit { id, title, fields } => {
            let id = TaskId::from(id);
            let current = board
                .task(&id)
                .with_context(|| format!("no task with id {id}"))?;
            let mut draft = current.to_draft();
            if let Some(title) = title {
                draft.title = title;
            }
            let draft = fields.apply(draft, &zone)?;
            board.edit_task(&id, draft).await?;
            println!("Task {id} updated.");
        }
        Command::Move { id, status } => {
            let id = TaskId::from(id);
            board.move_task(&id, status).await?;
            println!("Task {id} is in {}.", status.title());
        }
        Command::Delete { id, yes } => {
            let id = TaskId::from(id);
            board.request_delete(&id)?;
            let title = board.task(&id).map(|t| t.title.clone()).unwrap_or_default();
            if yes || confirm(&format!("Delete task {id} \"{title}\"?"))? {
                board.confirm_delete().await?;
                println!("Task {id} deleted.");
            } else {
                board.cancel_delete();
                println!("Cancelled.");
            }
        }
        Command::Watch => watch(&mut board).await?,
        Command::Theme { .. } => {}
    }

    board.teardown();
    Ok(())
}

enum WatchEvent {
    Stop,
    Reload,
    Fired,
}

async fn watch<A: TaskApi>(board: &mut BoardController<A>) -> anyhow::Result<()> {
    println!("Watching for reminders. Press Ctrl+C to quit.");
    let mut ticker = tokio::time::interval(WATCH_RELOAD_INTERVAL);
    ticker.tick().await;

    loop {
        let armed = board.scheduler().armed_count() > 0;
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => WatchEvent::Stop,
            _ = ticker.tick() => WatchEvent::Reload,
            Some(_) = board.next_reminder(), if armed => WatchEvent::Fired,
        };
        match event {
            WatchEvent::Stop => {
                info!("received Ctrl+C, stopping watch");
                return Ok(());
            }
            WatchEvent::Reload => {
                if let Err(e) = board.load().await {
                    tracing::warn!("reload failed: {e}");
                }
            }
            WatchEvent::Fired => debug!("reminder delivered"),
        }
    }
}

fn run_theme(value: Option<&str>) -> anyhow::Result<()> {
    let mut prefs = PreferenceStore::open_default();
    let theme = match value {
        None => prefs.theme(),
        Some("toggle") => prefs.toggle_theme()?,
        Some(other) => {
            let theme = Theme::parse(other).with_context(|| format!("unknown theme {other:?}"))?;
            prefs.set_theme(theme)?;
            theme
        }
    };
    println!("{theme}");
    Ok(())
}

impl TaskFields {
    fn apply(self, mut draft: TaskDraft, zone: &ClientZone) -> anyhow::Result<TaskDraft> {
        if let Some(description) = self.description {
            draft.description = Some(description);
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(priority) = self.priority {
            draft.priority = priority;
        }
        if let Some(due) = self.due {
            // Accept minute precision.
            let raw = if due.len() == 16 { format!("{due}:00") } else { due };
            let due = zone
                .decode_due_date(&raw.replacen(' ', "T", 1))
                .with_context(|| format!("invalid due date {raw:?}"))?;
            draft.due_date = Some(due);
            draft.has_notification = true;
        }
        if self.no_due {
            draft.due_date = None;
            draft.has_notification = false;
        }
        if let Some(remind) = self.remind {
            draft.has_notification = remind;
        }
        if let Some(tags) = self.tags {
            draft.tags = kanban::task::mapper::split_tags(Some(&tags));
        }
        Ok(draft)
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    let mut out = std::io::stdout().lock();
    write!(out, "{prompt} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_board<A: TaskApi>(board: &BoardController<A>, zone: &ClientZone) {
    for status in TaskStatus::ALL {
        let column = board.column(status);
        let visible = board.filtered(status);
        println!("== {} ({}) ==", column.title(), column.len());
        for task in visible {
            let mut line = format!("  [{}] {} {}", task.id, task.priority.badge(), task.title);
            if let Some(due) = &task.due_date {
                let bell = if task.has_notification { " 🔔" } else { "" };
                line.push_str(&format!("  due {}{bell}", zone.encode_due_date(due)));
            }
            if !task.tags.is_empty() {
                line.push_str(&format!("  #{}", task.tags.join(" #")));
            }
            println!("{line}");
        }
    }
    let tags = board.available_tags();
    if !tags.is_empty() {
        println!("tags: {}", tags.join(", "));
    }
}
