//! Failure reporting for GitHub Actions style CI runners.

use std::process::ExitCode;

/// Escapes a workflow command payload the way the runner expects.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

pub fn error_annotation(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

/// Marks the run as failed with `message` and returns the exit code to use.
pub fn set_failed(message: &str) -> ExitCode {
    println!("{}", error_annotation(message));
    ExitCode::FAILURE
}
