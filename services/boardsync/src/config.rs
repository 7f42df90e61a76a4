// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Sync configuration
//!
//! Deserialized from a YAML file; `validate` enforces the constraints the
//! engine depends on before any remote call is made. Validation messages
//! name the offending YAML path (`sync[2].jira.projectKey`).

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PROJECT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]*$").expect("project-name pattern is valid"));

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Milliseconds between reconciliation passes. Absent means a single
    /// bootstrap pass; negative means no loop either.
    #[serde(default)]
    pub sleep_time: Option<i64>,

    /// Reserved; parsed and carried but currently unused
    #[serde(default)]
    pub enable_api: Option<bool>,

    pub sync: Vec<ProjectConfig>,
}

/// One board project to reconcile
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Also the suffix of the per-project credential env variables
    pub name: String,

    #[serde(default)]
    pub assignees: Vec<AssigneePair>,

    pub github: GithubConfig,
    pub jira: JiraConfig,
}

/// Maps a tracker account (by email) to a board login
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneePair {
    pub jira_email: String,
    pub gh_user: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubConfig {
    pub project_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraConfig {
    pub subdomain: String,
    pub project_key: String,

    /// Custom-field id that receives the board estimate on creation
    #[serde(default)]
    pub estimate_field: Option<String>,

    /// Prepended to the board title when composing the ticket summary
    #[serde(default)]
    pub issue_prefix: Option<String>,

    #[serde(default)]
    pub issues: Vec<IssueTypeConfig>,
}

impl JiraConfig {
    /// Transition plan for an issue type; when several entries share the
    /// type, the last one wins.
    pub fn plan_for(&self, issue_type: &str) -> Option<&IssueTypeConfig> {
        self.issues.iter().rev().find(|e| e.issue_type == issue_type)
    }

    /// Base URL of the tracker instance
    pub fn base_url(&self) -> String {
        format!("https://{}.atlassian.net", self.subdomain)
    }

    /// Browse URL of a ticket on this tracker instance
    pub fn browse_url(&self, key: &jira_api::IssueKey) -> String {
        format!("{}/browse/{}", self.base_url(), key)
    }
}

/// Ordered transition chains for one issue type
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTypeConfig {
    #[serde(rename = "type")]
    pub issue_type: String,

    #[serde(default)]
    pub transitions_to_wip: Vec<i64>,

    #[serde(default)]
    pub transitions_to_done: Vec<i64>,
}

impl Config {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Enforce cross-field constraints, naming offending paths
    pub fn validate(&self) -> Result<()> {
        let mut seen_ids: HashMap<&str, usize> = HashMap::new();

        for (i, project) in self.sync.iter().enumerate() {
            if !PROJECT_NAME.is_match(&project.name) {
                bail!(
                    "sync[{i}].name: \"{}\" must match ^[a-zA-Z0-9_]*$",
                    project.name
                );
            }
            if project.github.project_id.is_empty() {
                bail!("sync[{i}].github.projectId: must not be empty");
            }
            if project.jira.subdomain.is_empty() {
                bail!("sync[{i}].jira.subdomain: must not be empty");
            }
            if project.jira.project_key.is_empty() {
                bail!("sync[{i}].jira.projectKey: must not be empty");
            }

            if let Some(&first) = seen_ids.get(project.github.project_id.as_str()) {
                bail!(
                    "sync[{i}].github.projectId: duplicates sync[{first}].github.projectId (\"{}\")",
                    project.github.project_id
                );
            }
            seen_ids.insert(&project.github.project_id, i);
        }

        Ok(())
    }
}
