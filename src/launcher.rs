/// Process launching: spawn an external program with piped output and hand
/// back a handle the monitor can drive.
use crate::config::LaunchConfig;
use crate::monitor::{Monitor, MonitorOutcome};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// A running external process as seen by the monitor.
///
/// Streams are taken at most once; later calls return `None`.
pub trait ProcessHandle {
    /// OS process id (for logging/diagnostics).
    fn id(&self) -> u32;

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Whether the process is still alive. An exited process that has not
    /// been reaped yet counts as not running.
    fn is_running(&mut self) -> bool;

    fn kill(&mut self) -> io::Result<()>;

    /// Block until the process exits. Returns the exit code, or `None` when
    /// it was terminated by a signal.
    fn wait(&mut self) -> io::Result<Option<i32>>;
}

/// What to launch and how.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub argv: Vec<String>,
    /// Variables overlaid on the environment.
    pub env: BTreeMap<String, String>,
    /// Run through the platform shell instead of executing `argv[0]` directly.
    pub use_shell: bool,
    pub working_dir: Option<PathBuf>,
    /// Start from the current process environment (default). When false the
    /// child only sees `env`.
    pub inherit_env: bool,
}

impl LaunchOptions {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            inherit_env: true,
            ..Default::default()
        }
    }

    /// Apply the `[launch]` section of the settings.
    pub fn with_config(mut self, config: &LaunchConfig) -> Self {
        for (key, value) in &config.env {
            self.env.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self.use_shell = self.use_shell || config.use_shell;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn use_shell(mut self, use_shell: bool) -> Self {
        self.use_shell = use_shell;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }
}

/// Errors that can occur while launching a process.
#[derive(Debug)]
pub enum LaunchError {
    /// No program was given.
    EmptyCommand,
    /// The OS refused to start the program.
    Spawn {
        command: String,
        source: io::Error,
    },
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::EmptyCommand => write!(f, "no command given"),
            LaunchError::Spawn { command, source } => {
                write!(f, "failed to spawn `{}`: {}", command, source)
            }
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::EmptyCommand => None,
            LaunchError::Spawn { source, .. } => Some(source),
        }
    }
}

/// A process started by [`spawn`].
#[derive(Debug)]
pub struct LaunchedProcess {
    child: Child,
    command_line: String,
    own_group: bool,
    /// Set once an exit status has been collected. The pid, and with it the
    /// process group id, may be reused from then on.
    reaped: bool,
}

impl LaunchedProcess {
    /// The printable command line the process was started with.
    pub fn command_line(&self) -> &str {
        &self.command_line
    }
}

impl ProcessHandle for LaunchedProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn is_running(&mut self) -> bool {
        // try_wait reaps a zombie child, so an exited child reads as not running.
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => {
                self.reaped = true;
                false
            }
            Err(e) => {
                tracing::debug!(pid = self.child.id(), error = %e, "liveness check failed");
                false
            }
        }
    }

    /// Kill the process. Processes spawned in their own group are killed
    /// along with everything else in the group.
    fn kill(&mut self) -> io::Result<()> {
        if self.reaped {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if self.own_group {
                let pgid = Pid::from_raw(self.child.id() as i32);
                match killpg(pgid, Signal::SIGKILL) {
                    Ok(()) => return Ok(()),
                    // Group already gone; fall through to the direct kill.
                    Err(Errno::ESRCH) => {}
                    Err(e) => return Err(io::Error::from(e)),
                }
            }
        }
        self.child.kill()
    }

    fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status.code())
    }
}

/// Printable command line. The program is quoted when it contains whitespace.
pub fn command_line(argv: &[String]) -> String {
    let mut parts = Vec::with_capacity(argv.len());
    if let Some(program) = argv.first() {
        if program.chars().any(char::is_whitespace) {
            parts.push(format!("\"{program}\""));
        } else {
            parts.push(program.clone());
        }
    }
    parts.extend(argv.iter().skip(1).cloned());
    parts.join(" ")
}

/// Render `-key value` flag pairs separated by spaces.
pub fn gen_args<K, V>(pairs: &[(K, V)]) -> String
where
    K: std::fmt::Display,
    V: std::fmt::Display,
{
    pairs
        .iter()
        .map(|(k, v)| format!("-{k} {v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `cmd /C` with the line passed verbatim; cmd.exe does its own parsing
/// and doesn't understand the escaping `arg` would apply to its quotes.
#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    use std::os::windows::process::CommandExt;
    let mut c = Command::new("cmd");
    c.arg("/C").raw_arg(line);
    c
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut c = Command::new("sh");
    c.arg("-c").arg(line);
    c
}

fn build_command(options: &LaunchOptions, line: &str) -> Command {
    let mut cmd = if options.use_shell {
        shell_command(line)
    } else {
        let mut c = Command::new(&options.argv[0]);
        c.args(&options.argv[1..]);
        c
    };

    if !options.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(&options.env);

    if let Some(dir) = &options.working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // New process group for clean kill
        cmd.process_group(0);
    }

    cmd
}

/// Start a process with piped stdout and stderr.
pub fn spawn(options: &LaunchOptions) -> Result<LaunchedProcess, LaunchError> {
    if options.argv.is_empty() {
        return Err(LaunchError::EmptyCommand);
    }

    let line = command_line(&options.argv);
    tracing::info!(
        command = %line,
        use_shell = options.use_shell,
        env_overrides = options.env.len(),
        "spawning process"
    );

    let child = build_command(options, &line)
        .spawn()
        .map_err(|e| LaunchError::Spawn {
            command: line.clone(),
            source: e,
        })?;

    tracing::info!(pid = child.id(), "process started");

    Ok(LaunchedProcess {
        child,
        command_line: line,
        own_group: cfg!(unix),
        reaped: false,
    })
}

/// Spawn a process and drive it to completion with `monitor`.
pub fn run_monitored(
    options: &LaunchOptions,
    monitor: &mut Monitor<'_>,
) -> Result<MonitorOutcome, LaunchError> {
    let mut process = spawn(options)?;
    Ok(monitor.run(&mut process))
}
