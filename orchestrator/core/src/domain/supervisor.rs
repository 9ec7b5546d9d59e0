// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Process Supervisor Domain Service
//!
//! Runs the launch script of an installation in a loop until a terminal state
//! is reached.
//!
//! ## Loop Decision Table
//! | Observation | Action |
//! |-------------|--------|
//! | binary absent before a launch | stop (`BinaryAbsent`) |
//! | child exited with 0 | stop (`VoluntaryExit`) |
//! | child exited non-zero | back off, re-check the binary, relaunch |
//! | cancellation token fired | kill the child if any, stop (`Cancelled`) |
//!
//! Removing the binary is the file-based stop signal used by the reaper. It
//! only prevents future launches: a child that is already running is never
//! killed because its binary disappeared. The cancellation token is the
//! in-band stop for whole-service shutdown and does terminate the child.
//!
//! A child killed by a signal reports `128 + signal`, like a shell would, and
//! counts as a non-zero exit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::artifact::ArtifactStore;
use crate::domain::error::ProcessLaunchError;
use crate::domain::work_dir::WorkDirectory;

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// Where child stdout/stderr go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChildOutput {
    /// Redirect to the null device.
    #[default]
    Discard,
    /// Share the supervisor's own stdout/stderr.
    Inherit,
    /// Append both streams to a file.
    File(PathBuf),
}

/// How to start the service once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub output: ChildOutput,
}

impl LaunchSpec {
    /// `sh <work_dir>/startup.sh`, run from the work directory.
    pub fn for_work_dir(work_dir: &WorkDirectory, output: ChildOutput) -> Self {
        Self {
            program: PathBuf::from("sh"),
            args: vec![work_dir.launch_script_path().display().to_string()],
            working_dir: work_dir.root().to_path_buf(),
            output,
        }
    }
}

/// A started child process.
#[async_trait]
pub trait RunningProcess: Send {
    fn pid(&self) -> Option<u32>;

    /// Wait for exit and return the exit code.
    async fn wait(&mut self) -> Result<i32, ProcessLaunchError>;

    async fn kill(&mut self) -> Result<(), ProcessLaunchError>;
}

#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn RunningProcess>, ProcessLaunchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    VoluntaryExit,
    BinaryAbsent,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Launching { attempt: u32 },
    Running { attempt: u32, pid: Option<u32> },
    Exited { attempt: u32, code: i32 },
    BackingOff { delay: Duration },
    Stopped(StopReason),
}

#[async_trait]
pub trait SupervisorObserver: Send + Sync {
    async fn on_transition(&self, state: &SupervisorState);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisionReport {
    pub launches: u32,
    pub exit_codes: Vec<i32>,
    pub stop_reason: StopReason,
}

pub struct ProcessSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    store: Arc<dyn ArtifactStore>,
    backoff: Duration,
    output: ChildOutput,
    observer: Option<Arc<dyn SupervisorObserver>>,
}

impl ProcessSupervisor {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            launcher,
            store,
            backoff: DEFAULT_BACKOFF,
            output: ChildOutput::default(),
            observer: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_output(mut self, output: ChildOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SupervisorObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    async fn transition(&self, state: SupervisorState) {
        match &state {
            SupervisorState::Idle => debug!("Supervisor idle"),
            SupervisorState::Launching { attempt } => {
                info!(attempt, "Starting service process")
            }
            SupervisorState::Running { attempt, pid } => {
                info!(attempt, pid = ?pid, "Service process running")
            }
            SupervisorState::Exited { attempt, code } if *code == 0 => {
                info!(attempt, exit_code = code, "Service process exited")
            }
            SupervisorState::Exited { attempt, code } => {
                warn!(attempt, exit_code = code, "Service process exited with failure, restarting")
            }
            SupervisorState::BackingOff { delay } => {
                debug!(delay_ms = delay.as_millis() as u64, "Backing off before restart")
            }
            SupervisorState::Stopped(reason) => info!(reason = ?reason, "Supervisor stopped"),
        }
        if let Some(observer) = &self.observer {
            observer.on_transition(&state).await;
        }
    }

    async fn stop(&self, reason: StopReason, launches: u32, exit_codes: Vec<i32>) -> SupervisionReport {
        self.transition(SupervisorState::Stopped(reason)).await;
        SupervisionReport {
            launches,
            exit_codes,
            stop_reason: reason,
        }
    }

    /// Run the service until a terminal state.
    ///
    /// Returns an error only when a child could not be spawned or waited on;
    /// non-zero exits are retried, never surfaced.
    pub async fn supervise(
        &self,
        work_dir: &WorkDirectory,
        cancel: CancellationToken,
    ) -> Result<SupervisionReport, ProcessLaunchError> {
        let binary = work_dir.binary_path();
        let spec = LaunchSpec::for_work_dir(work_dir, self.output.clone());
        let mut launches = 0u32;
        let mut exit_codes = Vec::new();

        self.transition(SupervisorState::Idle).await;

        loop {
            if cancel.is_cancelled() {
                return Ok(self.stop(StopReason::Cancelled, launches, exit_codes).await);
            }
            if !self.store.exists(&binary).await {
                info!(path = %binary.display(), "Service binary absent, not relaunching");
                return Ok(self.stop(StopReason::BinaryAbsent, launches, exit_codes).await);
            }

            launches += 1;
            self.transition(SupervisorState::Launching { attempt: launches }).await;
            metrics::counter!("hyvisor_supervisor_launches_total").increment(1);
            if launches > 1 {
                metrics::counter!("hyvisor_supervisor_restarts_total").increment(1);
            }

            let mut child = self.launcher.spawn(&spec).await?;
            self.transition(SupervisorState::Running {
                attempt: launches,
                pid: child.pid(),
            })
            .await;

            let waited = tokio::select! {
                result = child.wait() => Some(result),
                _ = cancel.cancelled() => None,
            };

            let code = match waited {
                Some(result) => result?,
                None => {
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to kill service process on shutdown");
                    }
                    return Ok(self.stop(StopReason::Cancelled, launches, exit_codes).await);
                }
            };

            exit_codes.push(code);
            self.transition(SupervisorState::Exited {
                attempt: launches,
                code,
            })
            .await;

            if code == 0 {
                return Ok(self.stop(StopReason::VoluntaryExit, launches, exit_codes).await);
            }

            self.transition(SupervisorState::BackingOff {
                delay: self.backoff,
            })
            .await;
            tokio::select! {
                _ = tokio::time::sleep(self.backoff) => {}
                _ = cancel.cancelled() => {
                    return Ok(self.stop(StopReason::Cancelled, launches, exit_codes).await);
                }
            }
        }
    }
}
