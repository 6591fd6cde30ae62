use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// A group of Gerrit projects, as listed in a project file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    /// Gerrit project names, e.g. `openstack/tripleo-common`
    #[serde(default)]
    pub subprojects: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectFile {
    One(ProjectInfo),
    Many(Vec<ProjectInfo>),
}

/// Parse project file content. Accepts a single project or a list of them.
pub fn parse_projects(content: &str) -> Result<Vec<ProjectInfo>> {
    let parsed: ProjectFile =
        serde_json::from_str(content).context("Project file is not a project or list of projects")?;

    Ok(match parsed {
        ProjectFile::One(project) => vec![project],
        ProjectFile::Many(projects) => projects,
    })
}

/// Load the project file at `path`
pub fn load_projects(path: impl AsRef<Path>) -> Result<Vec<ProjectInfo>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project file: {}", path.display()))?;

    let projects = parse_projects(&content)
        .with_context(|| format!("Failed to parse project file: {}", path.display()))?;

    info!(
        path = %path.display(),
        subprojects = projects.iter().map(|p| p.subprojects.len()).sum::<usize>(),
        "Loaded projects"
    );

    Ok(projects)
}
