//! credcache - A Local Credential-Caching Daemon
//!
//! This is the bootstrap entry point: it parses command-line arguments,
//! sets up logging, and hands an explicit configuration to the daemon
//! supervisor. Everything after that (lock acquisition, detaching,
//! binding, the accept loop) lives in the library.

use credcache::{Daemon, DaemonConfig};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Bootstrap configuration
struct Config {
    /// Working directory for the pid, socket, env and log files
    directory: PathBuf,
    /// Listen somewhere other than <directory>/socket
    socket: Option<PathBuf>,
    /// Default TTL in seconds for SET requests without a ttl field
    timeout: i64,
    /// Replace a running daemon instead of aborting
    replace: bool,
    /// Write the socket env line to <directory>/env
    write_env_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            socket: None,
            timeout: credcache::DEFAULT_TTL_SECS,
            replace: false,
            write_env_file: false,
        }
    }
}

/// `~/.credcache`, or a relative fallback when HOME is unset.
fn default_directory() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".credcache"),
        None => PathBuf::from(".credcache"),
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--directory" | "-d" => {
                    if i + 1 < args.len() {
                        config.directory = PathBuf::from(&args[i + 1]);
                        i += 2;
                    } else {
                        eprintln!("Error: --directory requires a value");
                        std::process::exit(1);
                    }
                }
                "--socket" | "-s" => {
                    if i + 1 < args.len() {
                        config.socket = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    } else {
                        eprintln!("Error: --socket requires a value");
                        std::process::exit(1);
                    }
                }
                "--timeout" | "-t" => {
                    if i + 1 < args.len() {
                        config.timeout = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid timeout");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --timeout requires a value");
                        std::process::exit(1);
                    }
                }
                "--replace" | "-r" => {
                    config.replace = true;
                    i += 1;
                }
                "--write-env-file" | "-e" => {
                    config.write_env_file = true;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("credcache version {}", credcache::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

fn print_help() {
    println!(
        r#"
credcache - A Local Credential-Caching Daemon

USAGE:
    credcache [OPTIONS]

OPTIONS:
    -d, --directory <DIR>    Working directory (default: ~/.credcache)
    -s, --socket <PATH>      Socket path (default: <directory>/socket)
    -t, --timeout <SECS>     Default TTL for cached secrets (default: 600)
    -r, --replace            Replace a running daemon instead of aborting
    -e, --write-env-file     Write the socket env line to <directory>/env
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    eval "$(credcache)"             # start and pick up CREDCACHE_SOCKET
    credcache -r -t 900             # replace a running instance, 15min TTL

SIGNALS:
    SIGTERM / SIGINT    orderly shutdown (removes socket and lock files)
    SIGUSR1             discard every cached secret, keep running
"#
    );
}

fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging on stderr; stdout carries only the env line
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    let mut daemon_config = DaemonConfig::new(config.directory);
    daemon_config.socket_override = config.socket;
    daemon_config.default_ttl_secs = config.timeout;
    daemon_config.replace = config.replace;
    daemon_config.write_env_file = config.write_env_file;

    // Probe the lock; aborts here if another instance owns the directory
    let daemon = Daemon::new(daemon_config)?;

    // Announce the socket, detach, and serve until told to stop
    daemon.start()?;
    Ok(())
}
