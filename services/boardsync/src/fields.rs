// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Board field resolution
//!
//! The engine requires the board to carry fields with fixed, well-known
//! names. Resolution maps those names to the opaque field ids the board
//! returns, failing the project when a required field is absent. The
//! optional `Epic` field additionally gets its select options reconciled
//! against the tracker's epics.

use anyhow::{Result, bail};
use github_api::{FieldKind, FieldSpec, ProjectField};
use sync_store::ProjectFields;
use tracing::info;

use crate::clients::{BoardApi, TrackerApi};

// Well-known board field names
pub const FIELD_JIRA_URL: &str = "Jira URL";
pub const FIELD_JIRA_ISSUE_TYPE: &str = "Jira issue type";
pub const FIELD_TITLE: &str = "Title";
pub const FIELD_ESTIMATE: &str = "Estimate";
pub const FIELD_STATUS: &str = "Status";
pub const FIELD_ASSIGNEES: &str = "Assignees";
pub const FIELD_REPOSITORY: &str = "Repository";
pub const FIELD_EPIC: &str = "Epic";

// Response aliases used when selecting item field values
pub const ALIAS_JIRA_URL: &str = "jiraUrl";
pub const ALIAS_JIRA_ISSUE_TYPE: &str = "jiraIssueType";
pub const ALIAS_TITLE: &str = "title";
pub const ALIAS_ESTIMATE: &str = "estimate";
pub const ALIAS_STATUS: &str = "status";
pub const ALIAS_ASSIGNEES: &str = "assignees";
pub const ALIAS_REPOSITORY: &str = "repository";

/// Field selection for every item fetch
pub const ITEM_FIELD_SPECS: [FieldSpec; 7] = [
    FieldSpec::new(ALIAS_JIRA_URL, FIELD_JIRA_URL, FieldKind::Text),
    FieldSpec::new(ALIAS_JIRA_ISSUE_TYPE, FIELD_JIRA_ISSUE_TYPE, FieldKind::SingleSelect),
    FieldSpec::new(ALIAS_TITLE, FIELD_TITLE, FieldKind::Text),
    FieldSpec::new(ALIAS_ESTIMATE, FIELD_ESTIMATE, FieldKind::Number),
    FieldSpec::new(ALIAS_STATUS, FIELD_STATUS, FieldKind::SingleSelect),
    FieldSpec::new(ALIAS_ASSIGNEES, FIELD_ASSIGNEES, FieldKind::User),
    FieldSpec::new(ALIAS_REPOSITORY, FIELD_REPOSITORY, FieldKind::Repository),
];

const REQUIRED_FIELDS: [&str; 7] = [
    FIELD_JIRA_URL,
    FIELD_JIRA_ISSUE_TYPE,
    FIELD_TITLE,
    FIELD_ESTIMATE,
    FIELD_STATUS,
    FIELD_ASSIGNEES,
    FIELD_REPOSITORY,
];

/// Upper bound on epics consulted per project
const EPIC_SEARCH_LIMIT: usize = 10_000;
/// Page size per JQL search request; pages are followed by cursor
const EPIC_SEARCH_PAGE: u32 = 1_000;

/// The board's `Epic` single-select field, when present
#[derive(Debug, Clone)]
pub struct EpicField {
    pub id: String,
    /// Current option names on the board
    pub options: Vec<String>,
}

/// Resolved field ids plus the optional epic field
#[derive(Debug, Clone)]
pub struct ResolvedFields {
    pub fields: ProjectFields,
    pub epic: Option<EpicField>,
}

/// Map the well-known field names to board field ids.
///
/// Aborts the project when any required field is missing or when `Epic`
/// exists but is not a single-select field.
pub async fn resolve_fields(
    board: &dyn BoardApi,
    project_name: &str,
    project_id: &str,
) -> Result<ResolvedFields> {
    let definitions = board.get_project_fields(project_id).await?;

    let mut fields = ProjectFields::default();
    let mut epic: Option<EpicField> = None;

    for def in &definitions {
        match def.name.as_str() {
            FIELD_JIRA_URL => fields.jira_url = def.id.clone(),
            FIELD_JIRA_ISSUE_TYPE => fields.jira_issue_type = def.id.clone(),
            FIELD_TITLE => fields.title = def.id.clone(),
            FIELD_ESTIMATE => fields.estimate = def.id.clone(),
            FIELD_STATUS => fields.status = def.id.clone(),
            FIELD_ASSIGNEES => fields.assignees = def.id.clone(),
            FIELD_REPOSITORY => fields.repository = def.id.clone(),
            FIELD_EPIC => {
                if !def.is_single_select() {
                    bail!(
                        "project \"{project_name}\": board field \"{FIELD_EPIC}\" must be a single-select field"
                    );
                }
                fields.epic = Some(def.id.clone());
                epic = Some(EpicField {
                    id: def.id.clone(),
                    options: option_names(def),
                });
            }
            _ => {}
        }
    }

    let missing: Vec<&str> = [
        (FIELD_JIRA_URL, &fields.jira_url),
        (FIELD_JIRA_ISSUE_TYPE, &fields.jira_issue_type),
        (FIELD_TITLE, &fields.title),
        (FIELD_ESTIMATE, &fields.estimate),
        (FIELD_STATUS, &fields.status),
        (FIELD_ASSIGNEES, &fields.assignees),
        (FIELD_REPOSITORY, &fields.repository),
    ]
    .into_iter()
    .filter(|(_, id)| id.is_empty())
    .map(|(name, _)| name)
    .collect();

    if !missing.is_empty() {
        bail!(
            "project \"{project_name}\" is missing required board field(s) [{}]; expected fields: {}",
            missing.join(", "),
            REQUIRED_FIELDS.join(", ")
        );
    }

    Ok(ResolvedFields { fields, epic })
}

fn option_names(def: &ProjectField) -> Vec<String> {
    def.options
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|o| o.name.clone())
        .collect()
}

/// Keep the board's `Epic` options in step with the tracker's epics.
///
/// Any epic whose summary is absent from the current options (compared
/// whitespace-trimmed) triggers a rewrite of the option list to the full
/// epic-title set.
pub async fn sync_epic_options(
    board: &dyn BoardApi,
    tracker: &dyn TrackerApi,
    project_name: &str,
    project_key: &str,
    epic: &EpicField,
) -> Result<()> {
    let jql = format!("project = {project_key} AND issuetype = \"Epic\"");
    let mut titles: Vec<String> = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = tracker
            .search_issues(
                &jql,
                &["summary"],
                None,
                page_token.as_deref(),
                EPIC_SEARCH_PAGE,
            )
            .await?;
        titles.extend(
            page.issues
                .iter()
                .filter_map(|issue| issue.summary())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        );
        if titles.len() >= EPIC_SEARCH_LIMIT {
            titles.truncate(EPIC_SEARCH_LIMIT);
            break;
        }
        match (page.is_last.unwrap_or(false), page.next_page_token) {
            (false, Some(token)) => page_token = Some(token),
            _ => break,
        }
    }

    let current: Vec<String> = epic.options.iter().map(|o| o.trim().to_string()).collect();
    let stale = titles.iter().any(|t| !current.contains(t));
    if !stale {
        return Ok(());
    }

    info!(
        project = %project_name,
        options = titles.len(),
        "Updating epic select options from tracker epics"
    );
    board.update_single_select_options(&epic.id, &titles).await
}
