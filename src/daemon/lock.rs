//! PID Lock File
//!
//! One daemon instance owns a working directory. Ownership is recorded as a
//! lock file holding the owner's process id; startup probes it to decide
//! between acquiring, self-healing a stale lock, replacing a live owner, or
//! aborting.
//!
//! Liveness is probed with `kill(pid, 0)`: no signal is delivered, only the
//! existence check happens. `EPERM` still means the process exists.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

/// What the lock file says about this working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// No lock file present
    Free,
    /// Lock file exists but its owner is dead or its content unreadable
    Stale,
    /// A live process holds the lock
    Held(i32),
}

/// Reads the lock file and probes the recorded process.
pub fn probe(path: &Path) -> LockStatus {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return LockStatus::Free,
    };

    match raw.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => {
            if process_alive(pid) {
                LockStatus::Held(pid)
            } else {
                LockStatus::Stale
            }
        }
        _ => LockStatus::Stale,
    }
}

/// Checks whether a process with this pid currently exists.
pub fn process_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        // exists, owned by someone else
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Asks the recorded owner to terminate.
pub fn terminate(pid: i32) -> io::Result<()> {
    kill(Pid::from_raw(pid), Signal::SIGTERM)
        .map_err(|errno| io::Error::from_raw_os_error(errno as i32))
}

/// Polls until the process is gone or the deadline passes.
///
/// Returns true once the process no longer exists.
pub fn wait_for_exit(pid: i32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(40));
    }
    !process_alive(pid)
}

/// Deletes the lock file. A missing file is not an error.
pub fn release(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
