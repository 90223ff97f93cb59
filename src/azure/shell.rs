//! Azure CLI subprocess execution.
//!
//! All provider access goes through the `az` binary. Commands are given as
//! a single string and split on spaces with quoted substrings preserved,
//! so JMESPath filters and `key=value` tags survive intact. Failures carry
//! the captured stderr plus a classification the orchestrator branches on.

use colored::Colorize;
use regex::Regex;
use std::error::Error;
use std::fmt;
use std::process::Command;
use std::sync::OnceLock;

/// Regex for splitting command strings while preserving quoted substrings.
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();

fn command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'\s*|\"([^\"]*)\"\s*|([^'\s]*)\s*"#).expect("Invalid Regex")
    })
}

/// Paged az output should stay well under this; anything bigger means a
/// runaway query.
const MAX_STDOUT_BYTES: usize = 8_000_000;

/// Failure class inferred from a command's stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Missing or expired az session.
    Authentication,
    /// Throttling or availability hiccup; a re-run may succeed.
    Transient,
    /// Everything else.
    Permanent,
}

/// A failed subprocess invocation.
#[derive(Debug)]
pub struct ShellError {
    pub class: FailureClass,
    pub stderr: String,
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stderr.trim())
    }
}

impl Error for ShellError {}

/// Run a shell command and return its stdout.
///
/// The command string is split on spaces, with quoted substrings preserved.
///
/// # Arguments
/// * `cmd` - The command string to execute
///
/// # Returns
/// * `Ok(String)` - The stdout output on success
/// * `Err(ShellError)` - Classified failure with captured stderr
pub fn run(cmd: &str) -> Result<String, ShellError> {
    log::debug!("run({cmd})", cmd = cmd.on_blue());

    let parts: Vec<&str> = split_and_strip(cmd);
    log::trace!("split parts={:?}", parts);
    let program = match parts.first() {
        Some(p) if !p.is_empty() => *p,
        _ => {
            return Err(ShellError {
                class: FailureClass::Permanent,
                stderr: "empty command".to_string(),
            })
        }
    };

    let mut command = Command::new(program);
    for arg in parts.iter().skip(1) {
        command.arg(arg);
    }

    let output = command.output().map_err(|e| {
        log::error!("Command execution failed: {}", e);
        ShellError {
            class: FailureClass::Permanent,
            stderr: format!("failed to execute {program}: {e}"),
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        log::trace!(
            "code={code:?}, status={status}\n┎######\nstderr=\n{stderr}\n┖######",
            code = output.status.code(),
            status = output.status,
            stderr = stderr.red()
        );
        log::warn!(
            "{failed} to run {cmd}",
            failed = "failed".on_red(),
            cmd = cmd.on_blue()
        );
        let class = classify_stderr(&stderr);
        return Err(ShellError { class, stderr });
    }

    log::debug!("Success cmd: {cmd}");
    log::debug!("Success output.stdout.len(): {}", output.stdout.len());
    if output.stdout.len() > MAX_STDOUT_BYTES {
        return Err(ShellError {
            class: FailureClass::Permanent,
            stderr: format!(
                "response too large: {} bytes from {cmd}",
                output.stdout.len()
            ),
        });
    }

    let stdout = String::from_utf8(output.stdout).map_err(|e| ShellError {
        class: FailureClass::Permanent,
        stderr: format!("invalid UTF-8 in command output: {e}"),
    })?;

    Ok(stdout)
}

/// Classify stderr text into the failure classes the orchestrator acts on.
pub fn classify_stderr(stderr: &str) -> FailureClass {
    let lowered = stderr.to_ascii_lowercase();
    const AUTH_MARKERS: [&str; 4] = ["az login", "aadsts", "authentication", "expired token"];
    const TRANSIENT_MARKERS: [&str; 8] = [
        "toomanyrequests",
        "too many requests",
        "429",
        "retryable",
        "timed out",
        "timeout",
        "temporarily unavailable",
        "serviceunavailable",
    ];

    if AUTH_MARKERS.iter().any(|m| lowered.contains(m)) {
        FailureClass::Authentication
    } else if TRANSIENT_MARKERS.iter().any(|m| lowered.contains(m)) {
        FailureClass::Transient
    } else {
        FailureClass::Permanent
    }
}

/// Split a command string on spaces, preserving quoted substrings.
fn split_and_strip(input: &str) -> Vec<&str> {
    command_regex()
        .find_iter(input)
        .map(|m| m.as_str().trim().trim_matches('\'').trim_matches('"'))
        .collect()
}
