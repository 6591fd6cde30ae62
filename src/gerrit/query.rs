use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::Change;
use crate::projects::ProjectInfo;

/// Trailing row of `gerrit query --format=JSON` output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    pub row_count: usize,
    #[serde(default)]
    pub more_changes: bool,
}

/// One page of query results
#[derive(Debug, Default)]
pub struct QueryPage {
    pub changes: Vec<Change>,
    pub stats: QueryStats,
}

/// Parse the line-delimited JSON printed by `gerrit query --format=JSON`
pub fn parse_query_output(output: &str) -> Result<QueryPage> {
    let mut page = QueryPage::default();

    for (index, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let row: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on query output line {}", index + 1))?;

        let kind = row.get("type").and_then(|t| t.as_str()).map(str::to_string);
        match kind.as_deref() {
            Some("stats") => {
                page.stats = serde_json::from_value(row).context("Invalid query stats row")?;
            }
            Some("error") => {
                let message = row
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error");
                anyhow::bail!("Gerrit query failed: {}", message);
            }
            _ => {
                let change = Change::from_json(row)
                    .with_context(|| format!("Invalid change on query output line {}", index + 1))?;
                page.changes.push(change);
            }
        }
    }

    Ok(page)
}

/// Fetches changes through Gerrit's SSH query interface
pub struct GerritQuery {
    user: String,
    host: String,
    port: u16,
    key_file: Option<PathBuf>,
}

impl GerritQuery {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            user: config.gerrit_user.clone(),
            host: config.gerrit_host()?,
            port: config.ssh_port,
            key_file: config.ssh_key_file.clone(),
        })
    }

    /// Arguments for `ssh` running one page of the query for `project`
    pub fn ssh_args(&self, project: &str, start: usize) -> Vec<String> {
        let mut args = vec!["-p".to_string(), self.port.to_string()];
        if let Some(key_file) = &self.key_file {
            args.push("-i".to_string());
            args.push(key_file.display().to_string());
        }
        args.extend([
            format!("{}@{}", self.user, self.host),
            "gerrit".to_string(),
            "query".to_string(),
            "--format=JSON".to_string(),
            "--commit-message".to_string(),
            "--patch-sets".to_string(),
            "--all-approvals".to_string(),
            "--start".to_string(),
            start.to_string(),
            "status:open".to_string(),
            format!("project:{}", project),
        ]);
        args
    }

    /// Fetch every open change of every subproject
    pub async fn fetch_open_changes(&self, projects: &[ProjectInfo]) -> Result<Vec<Change>> {
        let mut changes = Vec::new();

        for project in projects {
            for subproject in &project.subprojects {
                let fetched = self.fetch_project(subproject).await?;
                info!(project = %subproject, count = fetched.len(), "Fetched open changes");
                changes.extend(fetched);
            }
        }

        Ok(changes)
    }

    async fn fetch_project(&self, project: &str) -> Result<Vec<Change>> {
        let mut changes = Vec::new();
        let mut start = 0;

        loop {
            let output = Command::new("ssh")
                .args(self.ssh_args(project, start))
                .output()
                .await
                .context("Failed to run ssh")?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                anyhow::bail!("gerrit query for {} failed: {}", project, stderr.trim());
            }

            let stdout = String::from_utf8(output.stdout).context("Invalid UTF-8 in query output")?;
            let page = parse_query_output(&stdout)?;

            debug!(project, start, rows = page.stats.row_count, "Fetched query page");

            start += page.stats.row_count;
            changes.extend(page.changes);

            if !page.stats.more_changes || page.stats.row_count == 0 {
                break;
            }
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"{"project":"openstack/tripleo-common","branch":"master","id":"I1","number":1,"url":"https://review.example.org/1","commitMessage":"First\n","lastUpdated":1500000000,"status":"NEW","patchSets":[{"number":1,"revision":"a","approvals":[{"type":"Verified","description":"Verified","value":"-1","grantedOn":1500000000}]}]}
{"project":"openstack/tripleo-common","branch":"master","id":"I2","number":2,"url":"https://review.example.org/2","commitMessage":"Second\n","lastUpdated":1500000100,"status":"NEW","wip":true,"patchSets":[{"number":1,"revision":"b"}]}
{"type":"stats","rowCount":2,"runTimeMilliseconds":12,"moreChanges":true}
"#;

    #[test]
    fn test_parse_query_output() {
        let page = parse_query_output(OUTPUT).unwrap();

        assert_eq!(page.changes.len(), 2);
        assert_eq!(page.changes[0].id, "I1");
        assert_eq!(page.changes[0].patch_sets[0].approvals[0].value, -1);
        assert!(page.changes[1].wip);
        assert_eq!(
            page.stats,
            QueryStats {
                row_count: 2,
                more_changes: true
            }
        );
    }

    #[test]
    fn test_row_without_commit_message_is_rejected() {
        // Gerrit leaves commitMessage out unless --commit-message is passed
        let output = r#"{"project":"openstack/tripleo-common","id":"I1","subject":"First","url":"https://review.example.org/1","lastUpdated":1500000000,"status":"NEW","patchSets":[{"number":1}]}"#;

        let err = parse_query_output(output).unwrap_err();
        assert!(format!("{:#}", err).contains("commitMessage"));
    }

    #[test]
    fn test_parse_empty_output() {
        let page = parse_query_output("{\"type\":\"stats\",\"rowCount\":0}\n").unwrap();
        assert!(page.changes.is_empty());
        assert!(!page.stats.more_changes);
    }

    #[test]
    fn test_parse_error_row() {
        let err = parse_query_output(r#"{"type":"error","message":"permission denied"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_parse_malformed_change() {
        let output = r#"{"id":"I1","url":"u","commitMessage":"m","patchSets":[{"number":1}]}"#;
        assert!(parse_query_output(output).is_err());
        assert!(parse_query_output("not json").is_err());
    }

    #[test]
    fn test_ssh_args() {
        let config = Config {
            gerrit_user: "foo".to_string(),
            ssh_key_file: Some(PathBuf::from("/dev/null")),
            ..Default::default()
        };
        let query = GerritQuery::new(&config).unwrap();
        let args = query.ssh_args("openstack/tripleo-common", 500);

        assert_eq!(&args[..4], &["-p", "29418", "-i", "/dev/null"]);
        assert_eq!(args[4], "foo@review.openstack.org");
        assert!(args.contains(&"--all-approvals".to_string()));
        assert!(args.contains(&"--commit-message".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "--start" && w[1] == "500"));
        assert_eq!(args.last().unwrap(), "project:openstack/tripleo-common");
    }

    #[test]
    fn test_ssh_args_without_key() {
        let config = Config {
            gerrit_user: "foo".to_string(),
            ..Default::default()
        };
        let query = GerritQuery::new(&config).unwrap();
        let args = query.ssh_args("openstack/tripleo-common", 0);

        assert_eq!(args[2], "foo@review.openstack.org");
    }
}
