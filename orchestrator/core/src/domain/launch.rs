// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! POSIX launch script.
//!
//! The script `cd`s into the work directory and `exec`s the binary, so the
//! shell is replaced by the service and the script's exit code is the
//! binary's exit code.

use crate::domain::installation::ServiceProfile;
use crate::domain::work_dir::WorkDirectory;

/// Quote a value for a POSIX shell word.
fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ','))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn render_launch_script(work_dir: &WorkDirectory, profile: &ServiceProfile) -> String {
    let mut exec_line = format!("exec ./{}", shell_quote(work_dir.binary_name()));
    for arg in &profile.launch_args {
        exec_line.push(' ');
        exec_line.push_str(&shell_quote(arg));
    }
    exec_line.push(' ');
    exec_line.push_str(&shell_quote(&profile.config_flag));
    exec_line.push(' ');
    exec_line.push_str(&shell_quote(work_dir.config_name()));

    format!(
        "#!/usr/bin/env sh\n\ncd {}\n{}\n",
        shell_quote(&work_dir.root().display().to_string()),
        exec_line
    )
}
