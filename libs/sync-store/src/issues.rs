// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Issue repository: one row per mirrored board item

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::sync::Mutex;

use crate::StoreError;
use crate::types::{Diff, Issue, IssueStatus, RemoteIssue, is_browse_url, is_forward_transition};

const UPSERT_SQL: &str = r#"INSERT OR REPLACE INTO issues (
        project_id, id, title, jira_url, jira_issue_type,
        estimate, status, assignees, repository
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#;

const SELECT_COLUMNS: &str = r#"SELECT project_id, id, title, jira_url, jira_issue_type,
           estimate, status, assignees, repository
    FROM issues"#;

/// Typed access to the `issues` table
#[derive(Clone)]
pub struct IssueRepo {
    conn: Arc<Mutex<Connection>>,
}

impl IssueRepo {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Upsert one item and return the stored row
    pub async fn upsert(
        &self,
        project_id: &str,
        remote: &RemoteIssue,
    ) -> Result<Issue, StoreError> {
        let conn = self.conn.lock().await;
        upsert_inner(&conn, project_id, remote)?;

        Ok(Issue {
            project_id: project_id.to_string(),
            item_id: remote.item_id.clone(),
            title: remote.title.clone(),
            status: remote.status,
            jira_url: remote.jira_url.clone(),
            jira_issue_type: remote.jira_issue_type.clone(),
            estimate: remote.estimate,
            assignees: remote.assignees.clone(),
            repository: remote.repository.clone(),
        })
    }

    /// Upsert a batch inside one transaction. Any row failure rolls the
    /// whole batch back and surfaces the error.
    pub async fn upsert_many(
        &self,
        project_id: &str,
        remotes: &[RemoteIssue],
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for remote in remotes {
            upsert_inner(&tx, project_id, remote)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Look up one item by its composite identity
    pub async fn get(&self, project_id: &str, item_id: &str) -> Result<Option<Issue>, StoreError> {
        let conn = self.conn.lock().await;
        get_inner(&conn, project_id, item_id)
    }

    /// All mirrored items of a project, in insertion order
    pub async fn all(&self, project_id: &str) -> Result<Vec<Issue>, StoreError> {
        let conn = self.conn.lock().await;
        select_all(&conn, project_id)
    }

    /// Items whose stored URL is present and well-formed, in insertion order
    pub async fn with_url(&self, project_id: &str) -> Result<Vec<Issue>, StoreError> {
        let conn = self.conn.lock().await;
        let issues = select_all(&conn, project_id)?;
        Ok(issues.into_iter().filter(Issue::has_tracker_url).collect())
    }

    /// Items with no URL, plus items whose stored URL is malformed
    pub async fn without_url(&self, project_id: &str) -> Result<Vec<Issue>, StoreError> {
        let conn = self.conn.lock().await;
        let issues = select_all(&conn, project_id)?;
        Ok(issues
            .into_iter()
            .filter(|issue| !issue.has_tracker_url())
            .collect())
    }

    /// Of `ids`, the ones already mirrored, in input order
    pub async fn find_existing(
        &self,
        project_id: &str,
        ids: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let known = self.known_ids(project_id).await?;
        Ok(ids.iter().filter(|id| known.contains(*id)).cloned().collect())
    }

    /// Of `ids`, the ones not yet mirrored, in input order
    pub async fn find_missing(
        &self,
        project_id: &str,
        ids: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let known = self.known_ids(project_id).await?;
        Ok(ids
            .iter()
            .filter(|id| !known.contains(*id))
            .cloned()
            .collect())
    }

    async fn known_ids(&self, project_id: &str) -> Result<HashSet<String>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id FROM issues WHERE project_id = ?")?;
        let ids = stmt
            .query_map(params![project_id], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// Compare a batch of freshly normalized remotes against the mirror.
    ///
    /// Per remote: no mirrored row, mirrored status `Done`, an absent
    /// status on either side, or a pair outside the forward triangle all
    /// skip silently. The emitted [`Diff`] carries the mirrored row, so the
    /// caller still has the stored URL while the new status comes from the
    /// board.
    pub async fn diff(
        &self,
        project_id: &str,
        remotes: &[RemoteIssue],
    ) -> Result<Vec<Diff>, StoreError> {
        let conn = self.conn.lock().await;
        let mut diffs = Vec::new();

        for remote in remotes {
            let Some(local) = get_inner(&conn, project_id, &remote.item_id)? else {
                continue;
            };
            let Some(prev) = local.status else {
                continue;
            };
            if prev == IssueStatus::Done {
                continue;
            }
            let Some(new) = remote.status else {
                continue;
            };
            if !is_forward_transition(prev, new) {
                continue;
            }
            diffs.push(Diff {
                prev,
                new,
                issue: local,
            });
        }

        Ok(diffs)
    }
}

fn upsert_inner(conn: &Connection, project_id: &str, remote: &RemoteIssue) -> Result<(), StoreError> {
    conn.execute(
        UPSERT_SQL,
        params![
            project_id,
            remote.item_id,
            remote.title,
            remote.jira_url,
            remote.jira_issue_type,
            remote.estimate,
            remote.status.map(|s| s.as_str()),
            join_assignees(&remote.assignees),
            remote.repository,
        ],
    )?;
    Ok(())
}

fn get_inner(
    conn: &Connection,
    project_id: &str,
    item_id: &str,
) -> Result<Option<Issue>, StoreError> {
    let sql = format!("{} WHERE project_id = ? AND id = ?", SELECT_COLUMNS);
    let issue = conn
        .query_row(&sql, params![project_id, item_id], issue_from_row)
        .optional()?;
    Ok(issue)
}

fn select_all(conn: &Connection, project_id: &str) -> Result<Vec<Issue>, StoreError> {
    let sql = format!("{} WHERE project_id = ? ORDER BY rowid", SELECT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let issues = stmt
        .query_map(params![project_id], issue_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(issues)
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let status: Option<String> = row.get(6)?;
    let assignees: Option<String> = row.get(7)?;
    Ok(Issue {
        project_id: row.get(0)?,
        item_id: row.get(1)?,
        title: row.get(2)?,
        jira_url: row.get(3)?,
        jira_issue_type: row.get(4)?,
        estimate: row.get(5)?,
        status: status.as_deref().and_then(IssueStatus::parse),
        assignees: split_assignees(assignees.as_deref()),
        repository: row.get(8)?,
    })
}

/// Assignee logins are stored `;`-joined; an empty list is stored as NULL
fn join_assignees(assignees: &[String]) -> Option<String> {
    if assignees.is_empty() {
        None
    } else {
        Some(assignees.join(";"))
    }
}

fn split_assignees(joined: Option<&str>) -> Vec<String> {
    match joined {
        None | Some("") => Vec::new(),
        Some(s) => s.split(';').map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{remote, temp_store};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        let mut item = remote("ITEM_1", Some(IssueStatus::Todo));
        item.jira_url = Some("https://acme.atlassian.net/browse/PLAT-1".to_string());
        item.estimate = Some(5);
        item.assignees = vec!["octocat".to_string(), "hubot".to_string()];
        item.repository = Some("acme/platform".to_string());

        repo.upsert("PVT_1", &item).await.unwrap();
        let got = repo.get("PVT_1", "ITEM_1").await.unwrap().unwrap();

        assert_eq!(got.title, "Item ITEM_1");
        assert_eq!(got.status, Some(IssueStatus::Todo));
        assert_eq!(
            got.jira_url.as_deref(),
            Some("https://acme.atlassian.net/browse/PLAT-1")
        );
        assert_eq!(got.estimate, Some(5));
        // assignee order survives the `;`-joined column
        assert_eq!(got.assignees, vec!["octocat", "hubot"]);
        assert_eq!(got.repository.as_deref(), Some("acme/platform"));
    }

    #[tokio::test]
    async fn empty_assignees_round_trip_as_empty() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        repo.upsert("PVT_1", &remote("ITEM_1", None)).await.unwrap();
        let got = repo.get("PVT_1", "ITEM_1").await.unwrap().unwrap();
        assert!(got.assignees.is_empty());
        assert_eq!(got.status, None);
    }

    #[tokio::test]
    async fn identity_is_scoped_by_project() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        repo.upsert("PVT_1", &remote("ITEM_1", Some(IssueStatus::Todo)))
            .await
            .unwrap();
        repo.upsert("PVT_2", &remote("ITEM_1", Some(IssueStatus::Done)))
            .await
            .unwrap();

        let a = repo.get("PVT_1", "ITEM_1").await.unwrap().unwrap();
        let b = repo.get("PVT_2", "ITEM_1").await.unwrap().unwrap();
        assert_eq!(a.status, Some(IssueStatus::Todo));
        assert_eq!(b.status, Some(IssueStatus::Done));
    }

    #[tokio::test]
    async fn url_partition_treats_malformed_as_without() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        let mut with = remote("ITEM_ok", Some(IssueStatus::Todo));
        with.jira_url = Some("https://acme.atlassian.net/browse/PLAT-1".to_string());
        let mut malformed = remote("ITEM_bad", Some(IssueStatus::Todo));
        malformed.jira_url = Some("not-a-url".to_string());
        let bare = remote("ITEM_none", Some(IssueStatus::Todo));

        repo.upsert_many("PVT_1", &[with, malformed, bare]).await.unwrap();

        let with_url = repo.with_url("PVT_1").await.unwrap();
        assert_eq!(with_url.len(), 1);
        assert_eq!(with_url[0].item_id, "ITEM_ok");

        let without_url = repo.without_url("PVT_1").await.unwrap();
        let ids: Vec<&str> = without_url.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["ITEM_bad", "ITEM_none"]);
    }

    #[tokio::test]
    async fn listing_preserves_insertion_order() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        for id in ["ITEM_c", "ITEM_a", "ITEM_b"] {
            repo.upsert("PVT_1", &remote(id, None)).await.unwrap();
        }
        let ids: Vec<String> = repo
            .all("PVT_1")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.item_id)
            .collect();
        assert_eq!(ids, vec!["ITEM_c", "ITEM_a", "ITEM_b"]);
    }

    #[tokio::test]
    async fn find_existing_and_missing_preserve_input_order() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        repo.upsert("PVT_1", &remote("ITEM_1", None)).await.unwrap();
        repo.upsert("PVT_1", &remote("ITEM_3", None)).await.unwrap();

        let ids: Vec<String> = ["ITEM_3", "ITEM_2", "ITEM_1", "ITEM_4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let existing = repo.find_existing("PVT_1", &ids).await.unwrap();
        assert_eq!(existing, vec!["ITEM_3", "ITEM_1"]);

        let missing = repo.find_missing("PVT_1", &ids).await.unwrap();
        assert_eq!(missing, vec!["ITEM_2", "ITEM_4"]);
    }

    #[tokio::test]
    async fn upsert_many_is_one_batch_last_write_wins() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        let first = remote("ITEM_1", Some(IssueStatus::Todo));
        let second = remote("ITEM_1", Some(IssueStatus::Wip));
        repo.upsert_many("PVT_1", &[first, second]).await.unwrap();

        let all = repo.all("PVT_1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, Some(IssueStatus::Wip));
    }

    #[tokio::test]
    async fn diff_emits_only_forward_transitions() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        repo.upsert("PVT_1", &remote("ITEM_todo", Some(IssueStatus::Todo)))
            .await
            .unwrap();
        repo.upsert("PVT_1", &remote("ITEM_wip", Some(IssueStatus::Wip)))
            .await
            .unwrap();

        let remotes = vec![
            remote("ITEM_todo", Some(IssueStatus::Wip)),
            remote("ITEM_wip", Some(IssueStatus::Done)),
        ];
        let diffs = repo.diff("PVT_1", &remotes).await.unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].prev, IssueStatus::Todo);
        assert_eq!(diffs[0].new, IssueStatus::Wip);
        assert_eq!(diffs[1].prev, IssueStatus::Wip);
        assert_eq!(diffs[1].new, IssueStatus::Done);
    }

    #[tokio::test]
    async fn diff_skips_done_locals_and_backward_moves() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        // mirror says Done; board moving back to Todo must be ignored
        repo.upsert("PVT_1", &remote("ITEM_done", Some(IssueStatus::Done)))
            .await
            .unwrap();
        // mirror says Wip; board moving back to Todo must be ignored
        repo.upsert("PVT_1", &remote("ITEM_wip", Some(IssueStatus::Wip)))
            .await
            .unwrap();

        let remotes = vec![
            remote("ITEM_done", Some(IssueStatus::Todo)),
            remote("ITEM_wip", Some(IssueStatus::Todo)),
        ];
        let diffs = repo.diff("PVT_1", &remotes).await.unwrap();
        assert!(diffs.is_empty());
    }

    #[tokio::test]
    async fn diff_skips_unknown_locals_and_null_statuses() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        repo.upsert("PVT_1", &remote("ITEM_nostatus", None))
            .await
            .unwrap();

        let remotes = vec![
            // not mirrored at all
            remote("ITEM_new", Some(IssueStatus::Wip)),
            // mirrored without a status
            remote("ITEM_nostatus", Some(IssueStatus::Wip)),
            // remote status out of vocabulary (normalized to None)
            remote("ITEM_nostatus", None),
        ];
        let diffs = repo.diff("PVT_1", &remotes).await.unwrap();
        assert!(diffs.is_empty());
    }

    #[tokio::test]
    async fn diff_is_idempotent_after_status_upsert() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        repo.upsert("PVT_1", &remote("ITEM_1", Some(IssueStatus::Todo)))
            .await
            .unwrap();

        let remotes = vec![remote("ITEM_1", Some(IssueStatus::Wip))];
        let first = repo.diff("PVT_1", &remotes).await.unwrap();
        assert_eq!(first.len(), 1);

        // apply the new status the way the reconciler does
        repo.upsert("PVT_1", &remote("ITEM_1", Some(IssueStatus::Wip)))
            .await
            .unwrap();

        let second = repo.diff("PVT_1", &remotes).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn diff_carries_the_mirrored_row() {
        let (_dir, store) = temp_store();
        let repo = store.issues();

        let mut mirrored = remote("ITEM_1", Some(IssueStatus::Todo));
        mirrored.jira_url = Some("https://acme.atlassian.net/browse/PLAT-9".to_string());
        repo.upsert("PVT_1", &mirrored).await.unwrap();

        // the board fetch does not carry the URL; the mirror must
        let fresh = remote("ITEM_1", Some(IssueStatus::Done));
        let diffs = repo.diff("PVT_1", &[fresh]).await.unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(
            diffs[0].issue.jira_url.as_deref(),
            Some("https://acme.atlassian.net/browse/PLAT-9")
        );
    }
}
