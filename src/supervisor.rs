use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::error::{CleanupError, SpawnError};

/// A child process whose whole lifetime belongs to the harness. Termination
/// is forced (no graceful shutdown) and idempotent; dropping is a last-resort
/// kill so no exit path leaks a running process.
#[derive(Debug)]
pub struct ManagedProcess {
    label: String,
    child: Child,
    killed: bool,
}

impl ManagedProcess {
    /// Launch an external process. Not retried: a missing binary or denied
    /// permission surfaces immediately as `SpawnError::Io`.
    pub fn spawn(label: &str, program: &str, args: &[String]) -> Result<Self, SpawnError> {
        tracing::info!("spawning {}: {} {:?}", label, program, args);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| SpawnError::Io {
                label: label.to_string(),
                source,
            })?;

        tracing::info!("{} running with pid {}", label, child.id());

        Ok(Self {
            label: label.to_string(),
            child,
            killed: false,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Force-terminate the process and reap it. Safe to call repeatedly and
    /// safe on a child that already exited on its own.
    pub fn kill(&mut self) -> Result<(), std::io::Error> {
        if self.killed {
            return Ok(());
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!("{} already exited with {}", self.label, status);
            }
            _ => {
                self.child.kill()?;
                let _ = self.child.wait();
                tracing::info!("killed {}", self.label);
            }
        }

        self.killed = true;
        Ok(())
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if !self.killed {
            if let Err(e) = self.kill() {
                tracing::warn!("failed to kill {} on drop: {}", self.label, e);
            }
        }
    }
}

/// Terminate every process in the collection, in order. A failed kill does
/// not stop the sweep; failures are aggregated into one `CleanupError`.
pub fn kill_all(processes: &mut [ManagedProcess]) -> Result<(), CleanupError> {
    let mut failures = Vec::new();

    for process in processes.iter_mut() {
        if let Err(e) = process.kill() {
            failures.push(format!("{}: {}", process.label(), e));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CleanupError { failures })
    }
}

/// Connect-with-backoff readiness probe, bounded by `timeout`. Returns as
/// soon as the target accepts a TCP connection; a target that never starts
/// listening fails with `NeverReady`.
pub async fn await_ready(label: &str, addr: &str, timeout: Duration) -> Result<(), SpawnError> {
    let deadline = Instant::now() + timeout;
    let mut backoff = Duration::from_millis(50);

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(SpawnError::NeverReady {
                label: label.to_string(),
                addr: addr.to_string(),
                timeout,
            });
        }

        match tokio::time::timeout(remaining, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => {
                tracing::info!("{} ready at {}", label, addr);
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!("{} not ready at {}: {}", label, addr, e);
            }
            Err(_) => continue,
        }

        tokio::time::sleep(backoff.min(remaining)).await;
        backoff = (backoff * 2).min(Duration::from_millis(500));
    }
}
