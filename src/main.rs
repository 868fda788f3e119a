use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cos::config::Settings;
use cos::launcher::{self, LaunchOptions};
use cos::monitor::{MonitorOutcome, StdoutSink, TracingSink};
use cos::platform::{self, ProcessInspector};
use cos::{env, fsutil};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Filesystem and process helpers for the render pipeline.
#[derive(Parser, Debug)]
#[command(name = "cos", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "cos.toml", global = true)]
    config: PathBuf,

    /// Extra logging (check-ins, reader lifecycle, copy decisions)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program under the process monitor
    Run(RunArgs),

    /// Copy files from SRC that DEST doesn't have yet
    Duplicate { src: PathBuf, dest: PathBuf },

    /// Delete the contents of a folder
    Empty {
        folder: PathBuf,

        /// Keep sub-directories, delete only files
        #[arg(long)]
        only_files: bool,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 5)]
        wait_secs: u64,
    },

    /// List files by extension below one or more directories
    Collect {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Extension to include (repeatable; none means all files)
        #[arg(short = 'x', long = "ext")]
        extensions: Vec<String>,

        /// Drop paths containing this text (repeatable)
        #[arg(long = "exclude")]
        excludes: Vec<String>,
    },

    /// Print the environment a launched program would see
    Env {
        /// Extra KEY=VALUE pairs (repeatable)
        #[arg(short = 'e', long = "env", value_parser = parse_key_val)]
        env: Vec<(String, String)>,
    },

    /// Print platform details
    Info,

    /// Terminate leftover job processes on a render node
    KillJobs {
        /// Run even when this host isn't a render node
        #[arg(long)]
        all_hosts: bool,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Timeout in minutes (overrides config)
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds between check-ins (overrides config)
    #[arg(long)]
    check_in_interval: Option<u64>,

    /// Characters of output retained per stream (overrides config)
    #[arg(long)]
    buffer_length: Option<usize>,

    /// Run the command line through the platform shell
    #[arg(long)]
    shell: bool,

    /// Extra KEY=VALUE environment (repeatable)
    #[arg(short = 'e', long = "env", value_parser = parse_key_val)]
    env: Vec<(String, String)>,

    /// Print the outcome as JSON when done
    #[arg(long)]
    json: bool,

    /// Program and arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    argv: Vec<String>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))
}

/// Where `cos run` echoes the child's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Echo {
    /// Straight to stdout.
    Stdout,
    /// Through tracing on stderr; stdout is reserved for the JSON report.
    Log,
}

impl Echo {
    fn for_run(args: &RunArgs) -> Self {
        if args.json {
            Echo::Log
        } else {
            Echo::Stdout
        }
    }
}

/// JSON summary printed by `cos run --json`.
#[derive(Debug, Serialize)]
struct RunReport {
    command: String,
    started_at: DateTime<Utc>,
    duration_secs: f64,
    interrupted: bool,
    #[serde(flatten)]
    outcome: MonitorOutcome,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let settings = match Settings::load(&cli.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let result = match cli.command {
        Commands::Run(args) => handle_run(settings, args).await,
        Commands::Duplicate { src, dest } => handle_duplicate(&src, &dest),
        Commands::Empty {
            folder,
            only_files,
            wait_secs,
        } => handle_empty(&folder, only_files, wait_secs),
        Commands::Collect {
            paths,
            extensions,
            excludes,
        } => handle_collect(&paths, &extensions, &excludes),
        Commands::Env { env } => handle_env(&settings, env),
        Commands::Info => handle_info(&settings),
        Commands::KillJobs { all_hosts } => handle_kill_jobs(&settings, all_hosts),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn handle_run(settings: Settings, args: RunArgs) -> Result<i32, String> {
    let echo = Echo::for_run(&args);
    let mut monitor_config = settings.monitor.clone();
    if let Some(mins) = args.timeout {
        monitor_config.timeout_mins = Some(mins);
    }
    if let Some(secs) = args.check_in_interval {
        monitor_config.check_in_interval_secs = secs;
    }
    if let Some(len) = args.buffer_length {
        monitor_config.output_buffer_length = len;
    }

    let mut options = LaunchOptions::new(args.argv).use_shell(args.shell);
    for (key, value) in args.env {
        options = options.env(key, value);
    }
    let options = options.with_config(&settings.launch);
    let command = launcher::command_line(&options.argv);

    let interrupted = Arc::new(AtomicBool::new(false));
    let ctrl_c = {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping at next check-in");
                interrupted.store(true, Ordering::SeqCst);
            }
        })
    };

    let started_at = Utc::now();
    let start = Instant::now();
    let flag = Arc::clone(&interrupted);
    let outcome = tokio::task::spawn_blocking(move || {
        let monitor = monitor_config.build_monitor();
        let monitor = match echo {
            Echo::Stdout => monitor.sink(StdoutSink),
            Echo::Log => monitor.sink(TracingSink),
        };
        let mut monitor = monitor.check_in(move |_, _| !flag.load(Ordering::SeqCst));
        launcher::run_monitored(&options, &mut monitor)
    })
    .await
    .map_err(|e| format!("monitor task failed: {e}"))?
    .map_err(|e| e.to_string())?;
    ctrl_c.abort();

    let interrupted = interrupted.load(Ordering::SeqCst);
    let duration = start.elapsed();
    let code = exit_code_for(&outcome, interrupted);

    match &outcome {
        MonitorOutcome::Completed { exit_code, .. } => tracing::info!(
            exit_code = ?exit_code,
            duration_secs = duration.as_secs_f64(),
            "process completed"
        ),
        MonitorOutcome::TimedOut { elapsed } => tracing::warn!(
            elapsed_secs = elapsed.as_secs_f64(),
            "process timed out"
        ),
        MonitorOutcome::CheckInFailed => tracing::warn!(interrupted, "process stopped"),
    }

    if args.json {
        let report = RunReport {
            command,
            started_at,
            duration_secs: duration.as_secs_f64(),
            interrupted,
            outcome,
        };
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
    }

    Ok(code)
}

/// Exit status for `cos run`: the child's own code, 124 on timeout (as
/// coreutils `timeout`), 130 when interrupted.
fn exit_code_for(outcome: &MonitorOutcome, interrupted: bool) -> i32 {
    match outcome {
        MonitorOutcome::Completed { exit_code, .. } => exit_code.unwrap_or(1),
        MonitorOutcome::TimedOut { .. } => 124,
        MonitorOutcome::CheckInFailed if interrupted => 130,
        MonitorOutcome::CheckInFailed => 1,
    }
}

fn handle_duplicate(src: &std::path::Path, dest: &std::path::Path) -> Result<i32, String> {
    let report = fsutil::duplicate_dir(src, dest).map_err(|e| e.to_string())?;
    println!(
        "copied {} files, skipped {} existing, created {} directories",
        report.files_copied, report.files_skipped, report.dirs_created
    );
    for failed in &report.failures {
        eprintln!("could not copy: {}", failed.display());
    }
    Ok(if report.failures.is_empty() { 0 } else { 1 })
}

fn handle_empty(folder: &std::path::Path, only_files: bool, wait_secs: u64) -> Result<i32, String> {
    let report = fsutil::empty_folder(folder, only_files, Duration::from_secs(wait_secs));
    println!(
        "removed {} files and {} directories",
        report.files_removed, report.dirs_removed
    );
    if report.timed_out {
        eprintln!("stopped after {wait_secs}s, folder may not be empty");
    }
    Ok(if report.failures == 0 && !report.timed_out {
        0
    } else {
        1
    })
}

fn handle_collect(
    paths: &[PathBuf],
    extensions: &[String],
    excludes: &[String],
) -> Result<i32, String> {
    let files = fsutil::collect_files(paths, extensions, excludes).map_err(|e| e.to_string())?;
    for file in files {
        println!("{}", file.display());
    }
    Ok(0)
}

fn handle_env(settings: &Settings, extra: Vec<(String, String)>) -> Result<i32, String> {
    let mut overrides = settings.launch.env.clone();
    overrides.extend(extra);
    for (key, value) in env::merged_environment(&overrides) {
        println!("{key}={value}");
    }
    Ok(0)
}

fn handle_info(settings: &Settings) -> Result<i32, String> {
    let mut inspector = ProcessInspector::detect();
    let pid = std::process::id();
    println!("platform:     {}", platform::platform_name());
    println!(
        "host:         {}",
        platform::host_name().unwrap_or_else(|| "unknown".to_string())
    );
    match inspector.total_memory() {
        Some(bytes) => println!("memory:       {:.1} GiB", bytes as f64 / 1024f64.powi(3)),
        None => println!("memory:       unavailable"),
    }
    println!("pid:          {pid}");
    if let Some(parent) = inspector.parent_pid(pid) {
        println!("parent pid:   {parent}");
    }
    let temp = settings.ensure_temp_dir().map_err(|e| {
        format!(
            "failed to create temp dir {}: {e}",
            settings.paths.temp_dir.display()
        )
    })?;
    println!("temp dir:     {}", temp.display());
    Ok(0)
}

fn handle_kill_jobs(settings: &Settings, all_hosts: bool) -> Result<i32, String> {
    let mut inspector = ProcessInspector::detect();
    if !inspector.is_available() {
        return Err("process inspection is not available on this platform".to_string());
    }
    let killed = platform::kill_job_processes(&mut inspector, &settings.render_node, !all_hosts);
    for process in &killed {
        println!("terminated {} ({})", process.name, process.pid);
    }
    Ok(0)
}
