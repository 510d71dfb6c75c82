use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use officeflow_client::{HttpBackend, WsConnector};
use officeflow_core::config::AppConfig;
use officeflow_core::event::EventBus;
use officeflow_core::types::{
    AppEvent, LogEntry, NoticeLevel, ProjectId, RoleTag, TaskId, TranscriptEntry, WorkflowRecord,
};
use officeflow_sync::{AppState, Board, Store, Subscription};
use officeflow_workflow::Workflow;

const DEFAULT_LOG_FILTER: &str = "officeflow=info,warn";

#[derive(Parser)]
#[command(name = "officeflow", version, about = "Multi-agent project board client")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "officeflow.toml")]
    config: PathBuf,

    /// Backend base URL, overriding the config file
    #[arg(long, env = "OFFICEFLOW_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the step order of a stored workflow (JSON file, offline)
    Order {
        /// Workflow record, or a list of records (the active one is used)
        path: PathBuf,
    },
    /// Follow a project's live activity until Ctrl-C
    Watch {
        #[arg(long)]
        project: i64,
    },
    /// Hand a task to the next department of the active workflow
    Advance {
        #[arg(long)]
        project: i64,
        task: i64,
    },
    /// Move a task to a department, or to `unassigned`
    Move {
        #[arg(long)]
        project: i64,
        task: i64,
        #[arg(long)]
        to: String,
    },
    /// Show the effective configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "officeflow", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(url) = cli.base_url {
        config.backend.base_url = url;
    }

    // RUST_LOG wins over the config file
    let fallback = config.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Order { path } => print_order(&path)?,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Watch { project } => watch(&config, ProjectId(project)).await?,
        Commands::Advance { project, task } => {
            let (board, bus) = open_board(&config, ProjectId(project)).await?;
            let mut notices = bus.subscribe();
            let assignee = board.advance_task(TaskId(task))?;
            board.flush().await;
            fail_on_error_notice(&mut notices)?;
            println!("task {task} -> agent {assignee}");
        }
        Commands::Move { project, task, to } => {
            let destination = parse_destination(&to)?;
            let (board, bus) = open_board(&config, ProjectId(project)).await?;
            let mut notices = bus.subscribe();
            let assignee = board.move_task(TaskId(task), destination)?;
            board.flush().await;
            fail_on_error_notice(&mut notices)?;
            match assignee {
                Some(agent) => println!("task {task} -> agent {agent}"),
                None => println!("task {task} -> unassigned"),
            }
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

fn parse_destination(to: &str) -> anyhow::Result<Option<RoleTag>> {
    if to.eq_ignore_ascii_case("unassigned") {
        return Ok(None);
    }
    Ok(Some(to.parse()?))
}

fn print_order(path: &Path) -> anyhow::Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let record = if value.is_array() {
        let records: Vec<WorkflowRecord> = serde_json::from_value(value)?;
        match officeflow_core::types::active_workflow(&records).or(records.first()) {
            Some(record) => record.clone(),
            None => bail!("{} holds no workflows", path.display()),
        }
    } else {
        serde_json::from_value(value)?
    };

    let workflow = Workflow::from_record(&record);
    let steps: Vec<&str> = workflow.graph.step_order().iter().map(RoleTag::as_str).collect();
    println!("{}: {}", workflow.name, steps.join(" -> "));

    let excluded = workflow.graph.excluded_departments();
    if !excluded.is_empty() {
        let names: Vec<&str> = excluded.iter().map(RoleTag::as_str).collect();
        println!("excluded (cycle): {}", names.join(", "));
    }
    Ok(())
}

async fn open_board(config: &AppConfig, project: ProjectId) -> anyhow::Result<(Board, EventBus)> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let bus = EventBus::new(config.sync.event_bus_capacity);
    let store = Store::new(AppState::new(&config.sync));
    let board = Board::new(store, backend, bus.clone());
    board.load_project(project).await?;
    Ok((board, bus))
}

fn fail_on_error_notice(
    notices: &mut tokio::sync::broadcast::Receiver<AppEvent>,
) -> anyhow::Result<()> {
    while let Ok(event) = notices.try_recv() {
        if let AppEvent::Notice {
            level: NoticeLevel::Error,
            message,
        } = event
        {
            bail!(message);
        }
    }
    Ok(())
}

async fn watch(config: &AppConfig, project: ProjectId) -> anyhow::Result<()> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let connector = Arc::new(WsConnector::new(&config.backend));
    let bus = EventBus::new(config.sync.event_bus_capacity);
    let store = Store::new(AppState::new(&config.sync));

    let board = Board::new(store.clone(), backend.clone(), bus.clone());
    board.load_project(project).await?;

    let mut events = bus.subscribe();
    let mut subscription =
        Subscription::new(connector, backend, store.clone(), bus.clone(), config.sync.clone());
    subscription.set_key(Some(project));
    info!(project = %project, "Watching project");

    let mut printer = Printer::default();
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down watch...");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "Event bus lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick() => store.with(|state| printer.print_new(state)),
        }
    }

    subscription.shutdown().await;
    Ok(())
}

fn print_event(event: &AppEvent) {
    match event {
        AppEvent::ConnectionState(state) => println!("-- connection {state}"),
        AppEvent::Notice { level, message } => println!("-- {level:?}: {message}"),
        AppEvent::RosterRefreshed { agents } => println!("-- roster: {agents} agents"),
        AppEvent::StepOrderChanged { steps } => {
            let names: Vec<&str> = steps.iter().map(RoleTag::as_str).collect();
            println!("-- steps: {}", names.join(" -> "));
        }
    }
}

/// Prints log and transcript lines not yet shown.
#[derive(Default)]
struct Printer {
    last_log: Option<LogEntry>,
    last_line: Option<TranscriptEntry>,
}

impl Printer {
    fn print_new(&mut self, state: &AppState) {
        for entry in unseen(&state.logs, &self.last_log) {
            let who = entry.agent_id.map(|a| a.to_string()).unwrap_or_default();
            println!("[{}] {:>4} {}", entry.level, who, entry.message);
        }
        if let Some(last) = state.logs.back() {
            self.last_log = Some(last.clone());
        }

        for line in unseen(&state.transcript, &self.last_line) {
            println!("<{}> {}", line.from, line.message);
        }
        if let Some(last) = state.transcript.back() {
            self.last_line = Some(last.clone());
        }
    }
}

/// Entries after `last`; everything if `last` has rotated out of the tail.
fn unseen<'a, T: PartialEq>(
    tail: &'a std::collections::VecDeque<T>,
    last: &Option<T>,
) -> impl Iterator<Item = &'a T> {
    let start = match last {
        Some(last) => tail.iter().rposition(|e| e == last).map_or(0, |i| i + 1),
        None => 0,
    };
    tail.iter().skip(start)
}
