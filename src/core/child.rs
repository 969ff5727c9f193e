//! # Child process handling for one subnet.
//!
//! Spawns the runtime executable for a subnet, pumps its output, and reports
//! how the process ended.
//!
//! ## Flow
//! ```text
//! spawn(runtime, [entry_point], cwd = installed dir, env = identity)
//!   │
//!   ▼
//! select! {
//!   join!(wait(), pump stdout, pump stderr) ─► ChildEnd::Exited(status)
//!   watchdog.expired()                       ─► ChildEnd::Inactive
//!   token.cancelled()                        ─► ChildEnd::Canceled
//! }
//!   │
//!   ▼ (unless exited on its own)
//! start_kill() + wait()   (reaped before returning)
//! ```
//!
//! ## Rules
//! - Every stdout/stderr line kicks the watchdog and lands in the output tail.
//! - stdout lines go to the [`EventPipeline`]; stderr lines are logged.
//! - The process is always reaped before [`ChildProcess::run`] returns.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use super::pipeline::EventPipeline;
use super::watchdog::Watchdog;
use crate::core::config::Identity;
use crate::error::SubnetError;
use crate::subnets::SubnetDescriptor;

/// Signals the agent (or whoever stops it) uses to shut a process down.
pub(crate) const EXTERNAL_SIGNALS: [&str; 3] = ["SIGTERM", "SIGKILL", "SIGINT"];

/// Bounded ring of the most recent output lines.
pub(crate) struct OutputTail {
    cap: usize,
    lines: Mutex<VecDeque<String>>,
}

impl OutputTail {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            cap,
            lines: Mutex::new(VecDeque::with_capacity(cap.min(64))),
        }
    }

    pub(crate) fn push(&self, line: &str) {
        if self.cap == 0 {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        if lines.len() == self.cap {
            lines.pop_front();
        }
        lines.push_back(line.to_string());
    }

    pub(crate) fn render(&self) -> String {
        let lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// How a child's run ended.
#[derive(Debug)]
pub(crate) enum ChildEnd {
    /// The process exited on its own.
    Exited(ExitStatus),
    /// The watchdog fired; the process was killed.
    Inactive,
    /// The generation ended; the process was killed.
    Canceled,
}

/// Classification of an exit status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ExitClass {
    /// Exit code 0.
    Success,
    /// Stopped by one of [`EXTERNAL_SIGNALS`].
    External { signal: String },
    /// Anything else; `reason` reads `with exit code N` or `via signal SIGX`.
    Crash { reason: String },
}

pub(crate) fn classify(status: ExitStatus) -> ExitClass {
    if status.success() {
        return ExitClass::Success;
    }
    if let Some(code) = status.code() {
        return ExitClass::Crash {
            reason: format!("with exit code {code}"),
        };
    }
    match exit_signal(status) {
        Some(signal) if EXTERNAL_SIGNALS.contains(&signal.as_str()) => {
            ExitClass::External { signal }
        }
        Some(signal) => ExitClass::Crash {
            reason: format!("via signal {signal}"),
        },
        None => ExitClass::Crash {
            reason: "for unknown reason".to_string(),
        },
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(signal_name)
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<String> {
    None
}

/// Conventional name of a Linux signal number.
pub(crate) fn signal_name(signo: i32) -> String {
    let name = match signo {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        7 => "SIGBUS",
        8 => "SIGFPE",
        9 => "SIGKILL",
        10 => "SIGUSR1",
        11 => "SIGSEGV",
        12 => "SIGUSR2",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        _ => return format!("SIG{signo}"),
    };
    name.to_string()
}

/// Everything needed to start one subnet process.
pub(crate) struct ChildCommand<'a> {
    pub runtime: &'a Path,
    pub subnet: &'a SubnetDescriptor,
    pub cwd: PathBuf,
    pub identity: &'a Identity,
    pub state_root: &'a Path,
    pub cache_root: &'a Path,
}

impl ChildCommand<'_> {
    fn command(&self) -> Command {
        let mut cmd = Command::new(self.runtime);
        cmd.arg(self.subnet.entry_point.as_ref())
            .current_dir(&self.cwd)
            .env("STATION_ID", &self.identity.station_id)
            .env("FIL_WALLET_ADDRESS", &self.identity.wallet_address)
            .env("STATE_ROOT", self.state_root)
            .env("CACHE_ROOT", self.cache_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// A running subnet process owned by one generation.
pub(crate) struct ChildProcess {
    subnet: String,
    child: Child,
    watchdog: Watchdog,
    tail: OutputTail,
    pipeline: EventPipeline,
}

impl ChildProcess {
    /// Starts the process.
    pub(crate) fn spawn(
        spec: ChildCommand<'_>,
        watchdog: Watchdog,
        tail_lines: usize,
        pipeline: EventPipeline,
    ) -> Result<Self, SubnetError> {
        let child = spec.command().spawn().map_err(|e| SubnetError::Spawn {
            subnet: spec.subnet.name.to_string(),
            error: e.to_string(),
        })?;
        tracing::debug!(subnet = %spec.subnet.name, pid = ?child.id(), cwd = %spec.cwd.display(), "subnet spawned");
        Ok(Self {
            subnet: spec.subnet.name.to_string(),
            child,
            watchdog,
            tail: OutputTail::new(tail_lines),
            pipeline,
        })
    }

    /// Drives the process until it exits, goes quiet, or `token` is cancelled.
    ///
    /// Returns the end reason and the output tail.
    pub(crate) async fn run(mut self, token: CancellationToken) -> (ChildEnd, String) {
        let stdout = self.child.stdout.take();
        let stderr = self.child.stderr.take();

        let end = {
            let child = &mut self.child;
            let subnet = self.subnet.as_str();
            let watchdog = &self.watchdog;
            let tail = &self.tail;
            let pipeline = &self.pipeline;
            let run = async {
                let (status, _, _) = tokio::join!(
                    child.wait(),
                    pump(stdout, watchdog, tail, |line| pipeline.handle_line(line)),
                    pump(stderr, watchdog, tail, |line| {
                        tracing::warn!(subnet = %subnet, "{line}")
                    }),
                );
                status
            };

            tokio::select! {
                status = run => match status {
                    Ok(status) => ChildEnd::Exited(status),
                    Err(e) => {
                        tracing::error!(subnet = %subnet, error = %e, "cannot wait for subnet process");
                        ChildEnd::Canceled
                    }
                },
                _ = watchdog.expired() => ChildEnd::Inactive,
                _ = token.cancelled() => ChildEnd::Canceled,
            }
        };

        if !matches!(end, ChildEnd::Exited(_)) {
            self.reap().await;
        }
        (end, self.tail.render())
    }

    async fn reap(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(subnet = %self.subnet, error = %e, "kill failed");
        }
        if let Err(e) = self.child.wait().await {
            tracing::warn!(subnet = %self.subnet, error = %e, "cannot reap subnet process");
        }
    }
}

async fn pump<R, F>(stream: Option<R>, watchdog: &Watchdog, tail: &OutputTail, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let Some(stream) = stream else { return };
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                watchdog.kick();
                tail.push(&line);
                on_line(&line);
            }
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(error = %e, "subnet output stream closed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_most_recent_lines() {
        let tail = OutputTail::new(2);
        for line in ["a", "b", "c"] {
            tail.push(line);
        }
        assert_eq!(tail.render(), "b\nc");

        let off = OutputTail::new(0);
        off.push("x");
        assert_eq!(off.render(), "");
    }

    #[test]
    fn signal_names() {
        assert_eq!(signal_name(15), "SIGTERM");
        assert_eq!(signal_name(11), "SIGSEGV");
        assert_eq!(signal_name(64), "SIG64");
    }

    #[cfg(unix)]
    #[test]
    fn classifies_exit_statuses() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(classify(ExitStatus::from_raw(0)), ExitClass::Success);
        assert_eq!(
            classify(ExitStatus::from_raw(1 << 8)),
            ExitClass::Crash {
                reason: "with exit code 1".into()
            }
        );
        assert_eq!(
            classify(ExitStatus::from_raw(15)),
            ExitClass::External {
                signal: "SIGTERM".into()
            }
        );
        assert_eq!(
            classify(ExitStatus::from_raw(11)),
            ExitClass::Crash {
                reason: "via signal SIGSEGV".into()
            }
        );
    }
}
