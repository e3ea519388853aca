//! Process Supervisor
//!
//! Owns the daemon's whole lifecycle:
//!
//! 1. **Probe**: inspect the PID lock file; self-heal a stale one, replace
//!    or refuse when a live instance holds it.
//! 2. **Acquire**: create the working directory, announce the socket path
//!    on stdout, detach into the background (the PID file is written after
//!    the fork so it records the daemon's real pid).
//! 3. **Bind**: clear a stale socket file, bind the listener with
//!    owner-only permissions, start the sweeper.
//! 4. **Running**: sequential accept loop; each connection is serviced to
//!    completion under a deadline before the next accept. Control events
//!    (shutdown, reset) are handled between connections.
//! 5. **Terminal**: orderly teardown removes the socket, env and lock
//!    files. An abrupt death leaves them for the next startup's probe.
//!
//! Control delivery is mechanism-agnostic: [`Daemon::serve`] consumes
//! [`Control`] events from a channel, and [`Daemon::run`] wires the
//! platform's signals (SIGTERM/SIGINT → shutdown, SIGUSR1 → reset) to that
//! channel. Embedders and tests can drive the channel directly.

pub mod lock;

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::store::{SecretStore, Sweeper, SweeperConfig};
use crate::{DEFAULT_TTL_SECS, SOCKET_ENV_VAR};
use daemonize::Daemonize;
use lock::LockStatus;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// How long a replaced instance gets to exit after SIGTERM
const REPLACE_GRACE: Duration = Duration::from_secs(2);

/// Errors raised while supervising the daemon process.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// A live instance already owns the working directory
    #[error("daemon already running with PID {pid}")]
    AlreadyRunning { pid: i32 },

    /// Forking into the background failed
    #[error("failed to detach: {0}")]
    Detach(#[from] daemonize::Error),

    /// Filesystem or socket trouble
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A control operation delivered to the running daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Stop accepting, tear down files, exit
    Shutdown,
    /// Discard every cached secret; keep running
    Reset,
}

/// Daemon configuration, passed in explicitly by the bootstrap layer.
///
/// The core derives every path from `directory` and carries no ambient
/// environment defaults of its own.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Working directory holding the pid, socket, env and log files
    pub directory: PathBuf,
    /// Listen somewhere other than `<directory>/socket`
    pub socket_override: Option<PathBuf>,
    /// TTL applied to SET requests that carry no ttl field
    pub default_ttl_secs: i64,
    /// Interval between background sweeps
    pub sweep_interval: Duration,
    /// Per-connection servicing deadline
    pub connection_deadline: Duration,
    /// Replace a live instance instead of aborting
    pub replace: bool,
    /// Write the socket env line to `<directory>/env` once bound
    pub write_env_file: bool,
}

impl DaemonConfig {
    /// Creates a configuration with defaults rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            socket_override: None,
            default_ttl_secs: DEFAULT_TTL_SECS,
            sweep_interval: Duration::from_secs(60),
            connection_deadline: Duration::from_secs(10),
            replace: false,
            write_env_file: false,
        }
    }

    /// Path of the PID lock file.
    pub fn pid_path(&self) -> PathBuf {
        self.directory.join("pid")
    }

    /// Path the listener binds to.
    pub fn socket_path(&self) -> PathBuf {
        self.socket_override
            .clone()
            .unwrap_or_else(|| self.directory.join("socket"))
    }

    /// Path of the optional env file.
    pub fn env_path(&self) -> PathBuf {
        self.directory.join("env")
    }

    /// Where detached stdout/stderr (and tracing output) land.
    pub fn log_path(&self) -> PathBuf {
        self.directory.join("log")
    }
}

/// The daemon supervisor.
pub struct Daemon {
    config: DaemonConfig,
    store: Arc<SecretStore>,
}

impl Daemon {
    /// Probes the working directory's lock and claims it.
    ///
    /// # Errors
    ///
    /// [`DaemonError::AlreadyRunning`] if a live instance holds the lock and
    /// `replace` is off. With `replace` on, the old instance is sent
    /// SIGTERM and given a short grace period to exit.
    pub fn new(config: DaemonConfig) -> Result<Self, DaemonError> {
        let pid_path = config.pid_path();

        match lock::probe(&pid_path) {
            LockStatus::Free => {}
            LockStatus::Stale => {
                warn!(path = %pid_path.display(), "removing stale lock file");
                lock::release(&pid_path)?;
            }
            LockStatus::Held(pid) if config.replace => {
                warn!(pid = pid, "replacing running daemon");
                lock::terminate(pid)?;
                if !lock::wait_for_exit(pid, REPLACE_GRACE) {
                    warn!(pid = pid, "replaced daemon did not exit in time");
                }
                lock::release(&pid_path)?;
            }
            LockStatus::Held(pid) => return Err(DaemonError::AlreadyRunning { pid }),
        }

        Ok(Self {
            config,
            store: Arc::new(SecretStore::new()),
        })
    }

    /// The shell line announcing the socket path to child processes.
    pub fn env_line(&self) -> String {
        format!(
            "{var}='{path}'; export {var};",
            var = SOCKET_ENV_VAR,
            path = self.config.socket_path().display()
        )
    }

    /// Runs the daemon to completion: announce the socket, detach, then
    /// block on the accept loop until a shutdown control arrives.
    pub fn start(self) -> Result<(), DaemonError> {
        // printed before detaching so a caller can eval it
        println!("{}", self.env_line());
        std::io::stdout().flush()?;

        self.detach()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run())
    }

    /// Forks into the background.
    ///
    /// The working directory is created first (owner-only); the PID file is
    /// written by the child so it records the post-fork pid. Remaining
    /// stdout/stderr output, including tracing, is redirected to the log
    /// file.
    fn detach(&self) -> Result<(), DaemonError> {
        let directory = &self.config.directory;
        if !directory.exists() {
            fs::create_dir_all(directory)?;
            fs::set_permissions(directory, fs::Permissions::from_mode(0o700))?;
        }

        let log = fs::File::create(self.config.log_path())?;
        Daemonize::new()
            .working_directory(directory)
            .umask(0o077)
            .pid_file(self.config.pid_path())
            .stdout(log.try_clone()?)
            .stderr(log)
            .start()?;
        Ok(())
    }

    /// Runs the accept loop with control wired to Unix signals.
    pub async fn run(self) -> Result<(), DaemonError> {
        let (control_tx, control_rx) = mpsc::channel(4);
        tokio::spawn(route_signals(control_tx));
        self.serve(control_rx).await
    }

    /// Binds the socket, starts the sweeper and services connections until
    /// a shutdown control arrives (or every control sender is dropped).
    ///
    /// Mechanism-agnostic core of the daemon: callers decide how [`Control`]
    /// events are produced.
    pub async fn serve(self, mut control: mpsc::Receiver<Control>) -> Result<(), DaemonError> {
        let socket_path = self.config.socket_path();

        // a previous unclean shutdown may have left the socket file behind
        if fs::symlink_metadata(&socket_path).is_ok() {
            fs::remove_file(&socket_path)?;
        }

        let listener = UnixListener::bind(&socket_path)?;
        fs::set_permissions(&socket_path, fs::Permissions::from_mode(0o600))?;

        if self.config.write_env_file {
            fs::write(self.config.env_path(), format!("{}\n", self.env_line()))?;
        }

        let sweeper = Sweeper::start(
            Arc::clone(&self.store),
            SweeperConfig {
                interval: self.config.sweep_interval,
            },
        );
        let stats = Arc::new(ConnectionStats::new());

        info!(socket = %socket_path.display(), "listening for requests");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let handler = CommandHandler::new(
                            Arc::clone(&self.store),
                            self.config.default_ttl_secs,
                        );
                        let stats = Arc::clone(&stats);
                        // one connection serviced to completion before the
                        // next accept; the deadline bounds how long a hung
                        // client can park the loop
                        if timeout(
                            self.config.connection_deadline,
                            handle_connection(stream, handler, stats),
                        )
                        .await
                        .is_err()
                        {
                            warn!("connection exceeded deadline and was dropped");
                        }
                    }
                    Err(err) => error!(error = %err, "failed to accept connection"),
                },
                event = control.recv() => match event {
                    Some(Control::Reset) => {
                        info!("reset requested, clearing cached secrets");
                        self.store.reset();
                    }
                    Some(Control::Shutdown) | None => {
                        info!("shutdown requested");
                        break;
                    }
                },
            }
        }

        sweeper.stop();
        drop(listener);
        self.cleanup(&socket_path);

        info!(
            connections = stats.connections_accepted.load(Ordering::Relaxed),
            served = stats.requests_served.load(Ordering::Relaxed),
            errors = stats.request_errors.load(Ordering::Relaxed),
            "daemon stopped"
        );
        Ok(())
    }

    /// Removes the files this instance owns. Failures are logged, not
    /// propagated: teardown keeps going so the next startup has less to
    /// self-heal.
    fn cleanup(&self, socket_path: &std::path::Path) {
        for path in [socket_path.to_path_buf(), self.config.env_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), error = %err, "failed to remove file"),
            }
        }
        if let Err(err) = lock::release(&self.config.pid_path()) {
            warn!(error = %err, "failed to remove lock file");
        }
    }
}

/// Translates Unix signals into [`Control`] events.
///
/// SIGTERM and SIGINT request shutdown, SIGUSR1 resets the store.
async fn route_signals(tx: mpsc::Sender<Control>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint, mut sigusr1) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
        signal(SignalKind::user_defined1()),
    ) {
        (Ok(term), Ok(int), Ok(usr1)) => (term, int, usr1),
        _ => {
            error!("failed to install signal handlers");
            return;
        }
    };

    loop {
        let event = tokio::select! {
            _ = sigterm.recv() => Control::Shutdown,
            _ = sigint.recv() => Control::Shutdown,
            _ = sigusr1.recv() => Control::Reset,
        };

        let done = event == Control::Shutdown;
        if tx.send(event).await.is_err() || done {
            return;
        }
    }
}
