use std::fmt;

use chrono::{SecondsFormat, Utc};
use reqwest::StatusCode;

/// Prefix Gerrit puts in front of JSON bodies to defeat XSSI
const XSSI_PREFIX: &str = ")]}'";

/// Result of a side-effecting Gerrit action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The request was only described, not sent
    DryRun { url: String, body: String },
    /// The request was sent and Gerrit answered
    Response { status: StatusCode, body: String },
}

impl ActionOutcome {
    pub fn response(status: StatusCode, body: &str) -> Self {
        let body = body
            .strip_prefix(XSSI_PREFIX)
            .unwrap_or(body)
            .trim()
            .to_string();
        Self::Response { status, body }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun { .. })
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun { url, body } => write!(f, "DRY RUN: POST {} DATA: {}", url, body),
            Self::Response { status, body } if body.is_empty() => write!(f, "{}", status),
            Self::Response { status, body } => write!(f, "{} {}", status, body),
        }
    }
}

/// Format a console status line stamped with the current time
pub fn status_line(message: impl fmt::Display) -> String {
    format!(
        "{}: {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        message
    )
}

/// Print a status line to stdout
pub fn print_status(message: impl fmt::Display) {
    println!("{}", status_line(message));
}
