// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Domain types shared between the store and the sync engine

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Browse-URL shape of a tracker ticket. Anything else stored in a
/// `jira_url` slot is treated as absent.
#[allow(clippy::expect_used)]
static BROWSE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://[A-Za-z0-9]+\.atlassian\.net/browse/.+")
        .expect("browse-url pattern is valid")
});

/// Whether `url` is a well-formed tracker browse URL
pub fn is_browse_url(url: &str) -> bool {
    BROWSE_URL.is_match(url)
}

/// Board lifecycle state, narrowed to the three values the engine acts on.
///
/// Stored in SQLite as the literal board strings; any other board value is
/// represented as `None` on the nullable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStatus {
    Todo,
    Wip,
    Done,
}

impl IssueStatus {
    /// The literal board string for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Todo => "Todo",
            IssueStatus::Wip => "In Progress",
            IssueStatus::Done => "Done",
        }
    }

    /// Narrow a board status string; out-of-vocabulary values yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Todo" => Some(IssueStatus::Todo),
            "In Progress" => Some(IssueStatus::Wip),
            "Done" => Some(IssueStatus::Done),
            _ => None,
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field ids of a board project, resolved from the well-known field names.
///
/// The seven required slots are persisted; `epic` is optional and held in
/// memory only (the epic field is consulted at resolution time, not during
/// diffing).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFields {
    pub jira_url: String,
    pub jira_issue_type: String,
    pub title: String,
    pub estimate: String,
    pub status: String,
    pub assignees: String,
    pub repository: String,
    pub epic: Option<String>,
}

/// A board project known to the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub fields: ProjectFields,
}

/// One board item as mirrored locally. Identity is `(project_id, item_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub project_id: String,
    pub item_id: String,
    pub title: String,
    pub status: Option<IssueStatus>,
    pub jira_url: Option<String>,
    pub jira_issue_type: Option<String>,
    pub estimate: Option<i64>,
    pub assignees: Vec<String>,
    pub repository: Option<String>,
}

impl Issue {
    /// Whether the mirrored URL is present and well-formed
    pub fn has_tracker_url(&self) -> bool {
        self.jira_url.as_deref().is_some_and(is_browse_url)
    }

    /// The upsertable shape of this row, e.g. for re-mirroring with a
    /// changed status
    pub fn to_remote(&self) -> RemoteIssue {
        RemoteIssue {
            item_id: self.item_id.clone(),
            title: self.title.clone(),
            status: self.status,
            jira_url: self.jira_url.clone(),
            jira_issue_type: self.jira_issue_type.clone(),
            estimate: self.estimate,
            assignees: self.assignees.clone(),
            repository: self.repository.clone(),
        }
    }
}

/// A board item as fetched and normalized this pass, not yet mirrored
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteIssue {
    pub item_id: String,
    pub title: String,
    pub status: Option<IssueStatus>,
    pub jira_url: Option<String>,
    pub jira_issue_type: Option<String>,
    pub estimate: Option<i64>,
    pub assignees: Vec<String>,
    pub repository: Option<String>,
}

impl RemoteIssue {
    /// Whether the remote URL is present and well-formed
    pub fn has_tracker_url(&self) -> bool {
        self.jira_url.as_deref().is_some_and(is_browse_url)
    }
}

/// A detected forward state change: mirror said `prev`, board says `new`
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    pub prev: IssueStatus,
    pub new: IssueStatus,
    pub issue: Issue,
}

/// The three lifecycle edges the engine drives. Everything else is a no-op.
pub fn is_forward_transition(prev: IssueStatus, new: IssueStatus) -> bool {
    matches!(
        (prev, new),
        (IssueStatus::Todo, IssueStatus::Wip)
            | (IssueStatus::Todo, IssueStatus::Done)
            | (IssueStatus::Wip, IssueStatus::Done)
    )
}
