// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Per-project reconciliation loop
//!
//! One reconciler owns one board project end to end: resolve the board's
//! field ids, bootstrap the mirror when it is empty, then (when polling is
//! configured) keep fetching items and converging tracker state on every
//! tick. Remote errors during a tick are logged and retried next tick;
//! mirror errors are fatal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use jira_api::IssueKey;
use serde_json::json;
use sync_store::{Diff, Issue, ProjectFields, RemoteIssue, StoreError, SyncStore};
use tracing::{error, info, warn};

use crate::assignees;
use crate::clients::{BoardApi, TrackerApi};
use crate::config::ProjectConfig;
use crate::fields::{self, ITEM_FIELD_SPECS};
use crate::normalize::normalize_items;
use crate::transitions;
use github_client::ItemFieldValue;

/// Drives one configured project against the board, the tracker and the
/// mirror
pub struct Reconciler {
    project: ProjectConfig,
    sleep_time: Option<i64>,
    board: Arc<dyn BoardApi>,
    tracker: Arc<dyn TrackerApi>,
    store: SyncStore,
}

/// Resolution products carried through a reconciler's lifetime
struct ProjectState {
    fields: ProjectFields,
    translations: HashMap<String, String>,
}

impl Reconciler {
    pub fn new(
        project: ProjectConfig,
        sleep_time: Option<i64>,
        board: Arc<dyn BoardApi>,
        tracker: Arc<dyn TrackerApi>,
        store: SyncStore,
    ) -> Self {
        Self {
            project,
            sleep_time,
            board,
            tracker,
            store,
        }
    }

    fn project_id(&self) -> &str {
        &self.project.github.project_id
    }

    /// Run the project to completion: field resolution, bootstrap when the
    /// mirror is empty, then the polling loop when one is configured.
    pub async fn run(self) -> Result<()> {
        let name = self.project.name.clone();
        info!(project = %name, "Starting reconciler");

        let resolved =
            fields::resolve_fields(self.board.as_ref(), &name, self.project_id()).await?;
        if let Some(epic) = &resolved.epic {
            fields::sync_epic_options(
                self.board.as_ref(),
                self.tracker.as_ref(),
                &name,
                &self.project.jira.project_key,
                epic,
            )
            .await?;
        }
        self.store
            .projects()
            .upsert(self.project_id(), &resolved.fields)
            .await?;

        let translations =
            assignees::translate(self.tracker.as_ref(), &name, &self.project.assignees).await?;
        let state = ProjectState {
            fields: resolved.fields,
            translations,
        };

        if self.store.issues().all(self.project_id()).await?.is_empty() {
            info!(project = %name, "Mirror is empty, bootstrapping");
            self.bootstrap(&state).await?;
        }

        let Some(sleep_ms) = self.sleep_time else {
            info!(project = %name, "Single pass complete");
            return Ok(());
        };
        if sleep_ms < 0 {
            return Ok(());
        }

        let interval = Duration::from_millis(sleep_ms as u64);
        loop {
            tokio::time::sleep(interval).await;
            if let Err(e) = self.pass(&state).await {
                if e.downcast_ref::<StoreError>().is_some() {
                    return Err(e);
                }
                error!(
                    project = %name,
                    error = format!("{e:#}"),
                    "Reconciliation pass failed, retrying next tick"
                );
            }
        }
    }

    /// First ingest of a project with an empty mirror: persist everything,
    /// converge tracker state for items that already carry a ticket URL and
    /// create tickets for the rest.
    async fn bootstrap(&self, state: &ProjectState) -> Result<()> {
        let page = self
            .board
            .get_project_items(self.project_id(), &ITEM_FIELD_SPECS)
            .await?;
        let remotes = normalize_items(&page.items);
        self.store
            .issues()
            .upsert_many(self.project_id(), &remotes)
            .await?;

        for issue in self.store.issues().with_url(self.project_id()).await? {
            self.sync_from_mirror(&issue).await;
        }
        for issue in self.store.issues().without_url(self.project_id()).await? {
            self.create_ticket(state, &issue.to_remote()).await?;
        }
        Ok(())
    }

    /// One polling tick over the project's items
    async fn pass(&self, state: &ProjectState) -> Result<()> {
        let page = self
            .board
            .get_project_items(self.project_id(), &ITEM_FIELD_SPECS)
            .await?;
        let remotes = normalize_items(&page.items);
        let (with_url, without_url): (Vec<RemoteIssue>, Vec<RemoteIssue>) = remotes
            .iter()
            .cloned()
            .partition(RemoteIssue::has_tracker_url);

        for remote in &without_url {
            self.create_or_log(state, remote).await?;
        }

        let diffs = self
            .store
            .issues()
            .diff(self.project_id(), &with_url)
            .await?;
        for diff in diffs {
            self.apply_diff(&diff).await?;
        }

        // URL-carrying items that never made it into the mirror (the URL
        // predates us, or their normalization was blocked until now) get
        // the creation pipeline too; URL-less items were already handled
        // above.
        let ids: Vec<String> = with_url.iter().map(|r| r.item_id.clone()).collect();
        let missing = self.store.issues().find_missing(self.project_id(), &ids).await?;
        for id in missing {
            let Some(remote) = with_url.iter().find(|r| r.item_id == id) else {
                continue;
            };
            self.create_or_log(state, remote).await?;
        }

        Ok(())
    }

    /// Creation with LOOP error policy: mirror errors propagate, remote
    /// errors are logged and the item is retried on a later pass.
    async fn create_or_log(&self, state: &ProjectState, remote: &RemoteIssue) -> Result<()> {
        if let Err(e) = self.create_ticket(state, remote).await {
            if e.downcast_ref::<StoreError>().is_some() {
                return Err(e);
            }
            error!(
                project = %self.project.name,
                item = %remote.item_id,
                error = format!("{e:#}"),
                "Ticket creation failed, will retry next pass"
            );
        }
        Ok(())
    }

    /// Apply one detected state change: drive the ticket's transitions and
    /// persist the new status while keeping the stored URL.
    async fn apply_diff(&self, diff: &Diff) -> Result<()> {
        let Some(url) = diff.issue.jira_url.as_deref() else {
            warn!(
                project = %self.project.name,
                item = %diff.issue.item_id,
                "Diffed item has no mirrored URL, skipping transition"
            );
            return Ok(());
        };
        match IssueKey::from_browse_url(url) {
            Ok(key) => match diff.issue.jira_issue_type.as_deref() {
                Some(issue_type) => {
                    info!(
                        project = %self.project.name,
                        key = %key,
                        prev = %diff.prev,
                        new = %diff.new,
                        "Driving ticket transition"
                    );
                    transitions::advance(
                        self.tracker.as_ref(),
                        &self.project.jira,
                        &key,
                        issue_type,
                        diff.new,
                    )
                    .await;
                }
                None => warn!(
                    project = %self.project.name,
                    item = %diff.issue.item_id,
                    "Diffed item has no issue type, skipping transition"
                ),
            },
            Err(e) => warn!(
                project = %self.project.name,
                item = %diff.issue.item_id,
                error = %e,
                "Mirrored URL does not contain a ticket key"
            ),
        }

        let mut updated = diff.issue.to_remote();
        updated.status = Some(diff.new);
        self.store.issues().upsert(self.project_id(), &updated).await?;
        Ok(())
    }

    /// Transition-only convergence for a mirrored row that already has a
    /// ticket; used during bootstrap.
    async fn sync_from_mirror(&self, issue: &Issue) {
        let Some(status) = issue.status else {
            return;
        };
        let Some(url) = issue.jira_url.as_deref() else {
            return;
        };
        let key = match IssueKey::from_browse_url(url) {
            Ok(key) => key,
            Err(e) => {
                warn!(
                    project = %self.project.name,
                    item = %issue.item_id,
                    error = %e,
                    "Mirrored URL does not contain a ticket key"
                );
                return;
            }
        };
        let Some(issue_type) = issue.jira_issue_type.as_deref() else {
            warn!(
                project = %self.project.name,
                item = %issue.item_id,
                "Mirrored item has no issue type, skipping transitions"
            );
            return;
        };
        transitions::advance(
            self.tracker.as_ref(),
            &self.project.jira,
            &key,
            issue_type,
            status,
        )
        .await;
    }

    /// Create a tracker ticket for a URL-less item, write the browse URL
    /// back to the board, mirror the row, then drive transitions to the
    /// item's current status.
    async fn create_ticket(&self, state: &ProjectState, remote: &RemoteIssue) -> Result<()> {
        let Some(status) = remote.status else {
            error!(
                project = %self.project.name,
                item = %remote.item_id,
                "Cannot create a ticket for an item without a status"
            );
            return Ok(());
        };
        let Some(issue_type) = remote.jira_issue_type.as_deref() else {
            error!(
                project = %self.project.name,
                item = %remote.item_id,
                "Cannot create a ticket for an item without an issue type"
            );
            return Ok(());
        };

        let jira = &self.project.jira;
        let summary = match jira.issue_prefix.as_deref().filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{} {}", prefix, remote.title),
            None => remote.title.clone(),
        };

        let mut fields = serde_json::Map::new();
        fields.insert("summary".to_string(), json!(summary));
        fields.insert("issuetype".to_string(), json!({ "name": issue_type }));
        fields.insert("project".to_string(), json!({ "key": jira.project_key }));
        if let Some(account_id) = remote
            .assignees
            .first()
            .and_then(|login| state.translations.get(login))
        {
            fields.insert("assignee".to_string(), json!({ "accountId": account_id }));
        }
        if let (Some(field), Some(estimate)) = (
            jira.estimate_field.as_deref().filter(|f| !f.is_empty()),
            remote.estimate,
        ) {
            fields.insert(field.to_string(), json!(estimate));
        }

        let created = self.tracker.create_issue(fields).await?;
        let url = jira.browse_url(&created.key);
        self.board
            .update_item_field(
                self.project_id(),
                &remote.item_id,
                &state.fields.jira_url,
                ItemFieldValue::Text(url.clone()),
            )
            .await?;

        let mut mirrored = remote.clone();
        mirrored.jira_url = Some(url);
        self.store.issues().upsert(self.project_id(), &mirrored).await?;

        info!(
            project = %self.project.name,
            item = %remote.item_id,
            key = %created.key,
            "Created tracker ticket"
        );

        transitions::advance(
            self.tracker.as_ref(),
            jira,
            &created.key,
            issue_type,
            status,
        )
        .await;
        Ok(())
    }
}

/// Per-project tracker credentials: `JIRA_EMAIL_<name>`/`JIRA_TOKEN_<name>`
/// win when both are present, otherwise the global pair applies.
pub fn jira_credentials(
    lookup: impl Fn(&str) -> Option<String>,
    project_name: &str,
    global_email: Option<&str>,
    global_token: Option<&str>,
) -> Result<(String, String)> {
    let email_override = lookup(&format!("JIRA_EMAIL_{}", project_name));
    let token_override = lookup(&format!("JIRA_TOKEN_{}", project_name));
    if let (Some(email), Some(token)) = (email_override, token_override) {
        return Ok((email, token));
    }

    match (global_email, global_token) {
        (Some(email), Some(token)) => Ok((email.to_string(), token.to_string())),
        (None, _) => anyhow::bail!(r#"please set the "JIRA_EMAIL" env variable"#),
        (_, None) => anyhow::bail!(r#"please set the "JIRA_TOKEN" env variable"#),
    }
}
