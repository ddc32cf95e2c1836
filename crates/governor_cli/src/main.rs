//! Governor node entry point.
//!
//! # Responsibility
//! - Resolve configuration from file and flags, then bring up logging, the
//!   weekly schedule and the event repository.
//! - Serve requests over a line-based stdin/stdout transport until EOF.

use clap::Parser;
use governor_core::{
    init_logging, Dispatcher, JsonEventRepository, NodeConfig, Reply, Request, Responder,
    Schedule,
};
use log::{debug, error, info, warn};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "governor")]
#[command(about = "Calendar governor node: events, weekly schedule and deadlines")]
#[command(version = governor_core::core_version())]
struct Cli {
    /// TOML config file; missing file means defaults
    #[arg(short, long, default_value = "governor.toml")]
    config: PathBuf,

    /// Address of this node
    #[arg(long)]
    node_id: Option<String>,

    /// Weekly schedule CSV (empty disables the schedule)
    #[arg(short, long)]
    schedule: Option<PathBuf>,

    /// Event file (empty keeps events in memory only)
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(short, long)]
    log: Option<String>,

    /// Directory for rolling log files; stderr when unset
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Lookahead in days for GET DEADLINES without a period
    #[arg(long)]
    lookahead_days: Option<i64>,
}

impl Cli {
    fn apply(self, mut config: NodeConfig) -> NodeConfig {
        if let Some(node_id) = self.node_id {
            config.node_id = node_id;
        }
        if let Some(schedule) = self.schedule {
            config.schedule_path = schedule;
        }
        if let Some(events) = self.events {
            config.events_path = events;
        }
        if let Some(level) = self.log {
            config.log_level = level;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = Some(log_dir);
        }
        if let Some(days) = self.lookahead_days {
            config.deadline_lookahead_days = days;
        }
        config
    }
}

/// Writes replies to stdout, one line per reply.
struct StdoutResponder;

impl Responder for StdoutResponder {
    type Error = std::io::Error;

    fn reply(&self, request: &Request, reply: &Reply) -> Result<(), Self::Error> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", reply.to_line(&request.to, &request.from))?;
        out.flush()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=startup module=cli status=error error={message}");
            eprintln!("governor: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = NodeConfig::load(&cli.config).map_err(|err| err.to_string())?;
    let config = cli.apply(config);
    config.validate().map_err(|err| err.to_string())?;

    let log_dir = match &config.log_dir {
        Some(dir) => Some(absolute(dir)?),
        None => None,
    };
    init_logging(&config.log_level, log_dir.as_deref())?;
    info!(
        "event=startup module=cli status=start node_id={} version={}",
        config.node_id,
        governor_core::core_version()
    );

    let schedule = match config.schedule_source() {
        Some(path) => Schedule::load_csv(path).map_err(|err| err.to_string())?,
        None => {
            info!("event=schedule_load module=cli status=disabled");
            Schedule::default()
        }
    };
    let events = match config.events_source() {
        Some(path) => JsonEventRepository::open(path).map_err(|err| err.to_string())?,
        None => {
            info!("event=events_load module=cli status=in_memory");
            JsonEventRepository::in_memory()
        }
    };
    info!(
        "event=startup module=cli status=ok slots={} events={} events_path={}",
        schedule.len(),
        events.len(),
        events
            .path()
            .map_or_else(|| "memory".to_string(), |path| path.display().to_string())
    );

    let dispatcher = Dispatcher::new(events, schedule)
        .with_deadline_lookahead(config.deadline_lookahead());
    serve_lines(&dispatcher, &config.node_id, std::io::stdin().lock())
}

fn serve_lines(
    dispatcher: &Dispatcher<JsonEventRepository>,
    node_id: &str,
    input: impl BufRead,
) -> Result<(), String> {
    let responder = StdoutResponder;
    for line in input.lines() {
        let line = line.map_err(|err| format!("read stdin: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let request = match Request::parse_line(&line) {
            Ok(request) => request,
            Err(err) => {
                warn!("event=recv module=cli status=dropped error={err}");
                continue;
            }
        };
        if request.to != node_id {
            debug!(
                "event=recv module=cli status=ignored to={} from={}",
                request.to, request.from
            );
            continue;
        }
        dispatcher.serve(&request, &responder);
    }
    info!("event=shutdown module=cli status=ok reason=eof");
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, String> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|err| format!("resolve log dir `{}`: {err}", path.display()))
}
