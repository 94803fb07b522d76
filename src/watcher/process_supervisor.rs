use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use compio::process::Command;
use compio::runtime::spawn;
use futures_channel::oneshot;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use snafu::{ResultExt, Snafu};
use tracing::{debug, error, info};

use crate::ext::PathReportExt;
use crate::filesystem::HarnessLayout;

const MEMORY_DATABASE_ENV: &str = "DIR_WATCHER_MEMORY_DATABASE";

enum ProcessState {
    Running(oneshot::Receiver<std::io::Result<ExitStatus>>),
    Exited(Option<i32>),
}

/// Exit is observed by a detached wait task, so liveness checks never block.
pub struct WatcherProcess {
    pid: u32,
    state: ProcessState,
}

impl WatcherProcess {
    pub fn start(executable: &Path, layout: &HarnessLayout) -> Result<Self, WatcherError> {
        let mut command = Command::new(executable);
        command
            .arg(std::process::id().to_string())
            .arg(&layout.config_path)
            .arg(&layout.exclude_path)
            .arg(&layout.notify_dir);
        if let Some(value) = std::env::var_os(MEMORY_DATABASE_ENV) {
            debug!("Forwarding {}", MEMORY_DATABASE_ENV);
            command.env(MEMORY_DATABASE_ENV, value);
        }

        Self::spawn(command).context(SpawnSnafu {
            executable: executable.to_path_buf(),
        })
    }

    fn spawn(mut command: Command) -> std::io::Result<Self> {
        let child = command.spawn()?;
        let pid = child.id();
        let (sender, receiver) = oneshot::channel();

        spawn(async move {
            let status = child.wait().await;
            // The receiver is gone once the process was stopped and dropped.
            let _ = sender.send(status);
        })
        .detach();

        info!("Started watcher with pid {}", pid);
        Ok(Self {
            pid,
            state: ProcessState::Running(receiver),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn ensure_alive(&mut self) -> Result<(), WatcherError> {
        self.poll_exit();
        match self.state {
            ProcessState::Running(_) => Ok(()),
            ProcessState::Exited(code) => Err(WatcherError::NotRunning {
                pid: self.pid,
                code,
            }),
        }
    }

    fn poll_exit(&mut self) {
        let ProcessState::Running(receiver) = &mut self.state else {
            return;
        };
        match receiver.try_recv() {
            Ok(None) => {}
            Ok(Some(status)) => self.state = ProcessState::Exited(exit_code(status)),
            Err(_) => self.state = ProcessState::Exited(None),
        }
    }

    pub async fn stop(mut self) -> Result<Option<i32>, WatcherError> {
        self.poll_exit();
        let receiver = match self.state {
            ProcessState::Exited(code) => {
                error!("Watcher {} had already exited with {:?}", self.pid, code);
                return Ok(code);
            }
            ProcessState::Running(receiver) => receiver,
        };

        if !terminate(self.pid)? {
            // Reaped by the wait task after the poll above. Its status is still in flight.
            error!("Watcher {} exited before it could be stopped", self.pid);
        }

        let code = match receiver.await {
            Ok(status) => exit_code(status),
            Err(_) => None,
        };
        info!("Watcher {} exited with {:?}", self.pid, code);
        Ok(code)
    }
}

/// Returns false when there is no such process anymore.
fn terminate(pid: u32) -> Result<bool, WatcherError> {
    debug!("Sending SIGTERM to watcher {}", pid);
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(WatcherError::SignalError { pid, source }),
    }
}

fn exit_code(status: std::io::Result<ExitStatus>) -> Option<i32> {
    match status {
        Ok(status) => status.code(),
        Err(err) => {
            error!("Failed to wait for watcher: {}", err);
            None
        }
    }
}

#[derive(Debug, Snafu)]
pub enum WatcherError {
    #[snafu(display("Failed to launch watcher {}", executable.report_display()))]
    SpawnError {
        executable: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Watcher {} is not running (exit code {:?})", pid, code))]
    NotRunning { pid: u32, code: Option<i32> },
    #[snafu(display("Failed to signal watcher {}", pid))]
    SignalError { pid: u32, source: nix::Error },
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn shell(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.args(["-c", script]);
        command
    }

    #[compio::test]
    async fn test_running_watcher_is_alive_until_stopped() {
        let mut process = WatcherProcess::spawn(shell("sleep 30")).unwrap();
        compio::time::sleep(Duration::from_millis(100)).await;

        assert!(process.ensure_alive().is_ok());
        assert!(process.pid() > 0);

        // Terminated by a signal, so there is no exit code.
        assert_eq!(process.stop().await.unwrap(), None);
    }

    #[compio::test]
    async fn test_exited_watcher_is_detected() {
        let mut process = WatcherProcess::spawn(shell("exit 3")).unwrap();
        compio::time::sleep(Duration::from_millis(500)).await;

        assert!(matches!(
            process.ensure_alive(),
            Err(WatcherError::NotRunning { code: Some(3), .. })
        ));
        assert_eq!(process.stop().await.unwrap(), Some(3));
    }

    fn reaped_child() -> (u32, ExitStatus) {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let status = child.wait().unwrap();
        (child.id(), status)
    }

    #[test]
    fn test_terminate_tolerates_reaped_process() {
        let (pid, _) = reaped_child();

        assert!(!terminate(pid).unwrap());
    }

    #[compio::test]
    async fn test_stop_after_wait_task_reaped_the_watcher() {
        let (pid, status) = reaped_child();
        let (sender, receiver) = oneshot::channel();
        spawn(async move {
            compio::time::sleep(Duration::from_millis(100)).await;
            let _ = sender.send(Ok(status));
        })
        .detach();
        let process = WatcherProcess {
            pid,
            state: ProcessState::Running(receiver),
        };

        assert_eq!(process.stop().await.unwrap(), Some(0));
    }

    #[compio::test]
    async fn test_start_reports_missing_executable() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let layout = HarnessLayout::new(temp_dir.path()).unwrap();

        let result = WatcherProcess::start(&temp_dir.path().join("missing"), &layout);

        assert!(matches!(result, Err(WatcherError::SpawnError { .. })));
    }
}
