pub mod config;
pub mod feedback;
pub mod gerrit;
pub mod janitor;
pub mod models;
pub mod projects;
pub mod report;

pub use config::Config;
pub use feedback::days_since_negative_feedback;
pub use gerrit::{GerritClient, GerritQuery};
pub use janitor::{evaluate, ChangeActions, Decision, Janitor, RunSummary, SkipReason};
pub use models::*;
pub use projects::{load_projects, ProjectInfo};
pub use report::ActionOutcome;
