// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Child process launcher backed by `tokio::process`.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::domain::error::ProcessLaunchError;
use crate::domain::supervisor::{ChildOutput, LaunchSpec, ProcessLauncher, RunningProcess};

#[derive(Debug, Clone, Default)]
pub struct ShellProcessLauncher;

impl ShellProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

fn output_stdio(output: &ChildOutput) -> Result<(Stdio, Stdio), ProcessLaunchError> {
    match output {
        ChildOutput::Discard => Ok((Stdio::null(), Stdio::null())),
        ChildOutput::Inherit => Ok((Stdio::inherit(), Stdio::inherit())),
        ChildOutput::File(path) => {
            let sink_error = |source| ProcessLaunchError::OutputSink {
                path: path.clone(),
                source,
            };
            let stdout = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(sink_error)?;
            let stderr = stdout.try_clone().map_err(sink_error)?;
            Ok((Stdio::from(stdout), Stdio::from(stderr)))
        }
    }
}

/// Exit code as a shell reports it: `128 + signal` for signal deaths.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[async_trait]
impl ProcessLauncher for ShellProcessLauncher {
    async fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn RunningProcess>, ProcessLaunchError> {
        let (stdout, stderr) = output_stdio(&spec.output)?;
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessLaunchError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        Ok(Box::new(ShellProcess {
            program: spec.program.clone(),
            child,
        }))
    }
}

struct ShellProcess {
    program: PathBuf,
    child: Child,
}

#[async_trait]
impl RunningProcess for ShellProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> Result<i32, ProcessLaunchError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|source| ProcessLaunchError::Wait {
                program: self.program.clone(),
                source,
            })?;
        Ok(exit_code(status))
    }

    async fn kill(&mut self) -> Result<(), ProcessLaunchError> {
        self.child
            .kill()
            .await
            .map_err(|source| ProcessLaunchError::Wait {
                program: self.program.clone(),
                source,
            })
    }
}
