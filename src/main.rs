use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use clap::{Parser as ClapParser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use tracing_subscriber::EnvFilter;

use subtrack::events::{self, TailEvent};
use subtrack::ingest::{self, hook, LogTailer};
use subtrack::report::{JsonFormatter, ReportFormatter, SessionReport, TextFormatter};
use subtrack::session::{self, TOOL_CALLS_FILE, TRANSCRIPT_FILE};
use subtrack::transcript::record_line;
use subtrack::{Tracker, TrackerConfig};

#[derive(ClapParser, Debug)]
#[command(name = "subtrack", about = "Attribute and log tool calls of research subagents")]
struct Cli {
    /// TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding session_* directories (overrides the config).
    #[arg(long, global = true)]
    log_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed a stream of PreToolUse/PostToolUse hook events into a new session.
    Replay {
        /// JSON Lines file of hook events; reads stdin if omitted.
        input: Option<PathBuf>,
    },

    /// Per-agent report for a session (latest if omitted).
    Summary {
        session: Option<PathBuf>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print a session's tool calls (latest if omitted).
    Tail {
        session: Option<PathBuf>,

        /// Keep watching for new calls.
        #[arg(short, long)]
        follow: bool,
    },

    /// List recorded sessions.
    Sessions,

    /// Show the subagent roles and their toolsets.
    Roles,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(root) = cli.log_root {
        config.log_root = root;
    }

    match cli.command {
        Command::Replay { input } => replay(config, input.as_deref()),
        Command::Summary { session, json } => summary(&config, session, json),
        Command::Tail { session, follow } => tail(&config, session, follow),
        Command::Sessions => {
            list_sessions(&config);
            Ok(())
        }
        Command::Roles => {
            print_roles(&config);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("subtrack=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn replay(config: TrackerConfig, input: Option<&Path>) -> Result<()> {
    let tracker = Tracker::open(config);

    let stats = match input {
        Some(path) => {
            let file = File::open(path)
                .wrap_err_with(|| format!("Failed to open {}", path.display()))?;
            hook::replay(BufReader::new(file), &tracker)
        }
        None => hook::replay(io::stdin().lock(), &tracker),
    }
    .wrap_err("Failed to read hook events")?;

    let in_flight = tracker.in_flight();
    let session_dir = tracker.session_dir();
    tracker.close();

    println!(
        "Replayed {} events ({} skipped, {} still in flight)",
        stats.applied,
        stats.skipped,
        in_flight.len()
    );
    for call in &in_flight {
        println!("  {} [{}] {}", call.call_id, call.agent_label, call.tool_name);
    }
    match session_dir {
        Some(dir) => {
            println!("Session logs saved to: {}", dir.display());
            println!("  - Transcript: {}", dir.join(TRANSCRIPT_FILE).display());
            println!("  - Tool calls: {}", dir.join(TOOL_CALLS_FILE).display());
        }
        None => println!("Session logs were not written (see warnings above)."),
    }
    Ok(())
}

/// Accept a session directory, a `tool_calls.jsonl` path, or nothing (latest
/// session under the log root).
fn resolve_session(config: &TrackerConfig, session: Option<PathBuf>) -> Result<PathBuf> {
    match session {
        Some(path) if path.is_file() => path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| eyre!("No session directory for {}", path.display())),
        Some(path) if path.is_dir() => Ok(path),
        Some(path) => {
            let under_root = config.log_root.join(&path);
            if under_root.is_dir() {
                Ok(under_root)
            } else {
                Err(eyre!("No such session: {}", path.display()))
            }
        }
        None => session::latest_session(&config.log_root)
            .ok_or_else(|| eyre!("No sessions under {}", config.log_root.display())),
    }
}

fn session_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.display().to_string())
}

fn summary(config: &TrackerConfig, session: Option<PathBuf>, json: bool) -> Result<()> {
    let dir = resolve_session(config, session)?;
    let records = ingest::parse_log_file(&dir.join(TOOL_CALLS_FILE));
    let report = SessionReport::from_records(&records).with_session(session_name(&dir));

    let output = if json {
        JsonFormatter.format(&report)
    } else {
        TextFormatter::default().format(&report)
    };
    println!("{output}");
    Ok(())
}

fn tail(config: &TrackerConfig, session: Option<PathBuf>, follow: bool) -> Result<()> {
    let dir = resolve_session(config, session)?;
    let mut tailer = LogTailer::from_start(dir.join(TOOL_CALLS_FILE));

    for record in tailer.read_new_records() {
        println!("{}", record_line(&record));
    }
    if !follow {
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<TailEvent>();
    events::spawn_tick_timer(tx.clone(), Duration::from_millis(500));
    let _watcher = events::watch_session(&dir, tx)
        .wrap_err_with(|| format!("Failed to watch {}", dir.display()))?;

    // Runs until interrupted.
    while rx.recv().is_ok() {
        for record in tailer.read_new_records() {
            println!("{}", record_line(&record));
        }
    }
    Ok(())
}

fn list_sessions(config: &TrackerConfig) {
    let sessions = session::list_sessions(&config.log_root);
    if sessions.is_empty() {
        println!("No sessions under {}", config.log_root.display());
        return;
    }
    for dir in sessions {
        let records = ingest::parse_log_file(&dir.join(TOOL_CALLS_FILE));
        let report = SessionReport::from_records(&records);
        println!(
            "{}  {} calls, {} agents",
            session_name(&dir),
            report.total_calls(),
            report.agents.len()
        );
    }
}

fn print_roles(config: &TrackerConfig) {
    println!("lead: {}", config.lead_tools.join(", "));
    for role in &config.roles {
        println!();
        println!("{}: {}", role.name, role.tools.join(", "));
        if !role.output_dirs.is_empty() {
            println!("  writes: {}", role.output_dirs.join(", "));
        }
        if !role.description.is_empty() {
            println!("  {}", role.description);
        }
    }
}
