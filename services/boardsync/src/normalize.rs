// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Raw board items to canonical issues
//!
//! This is the single place where out-of-vocabulary board values are
//! rejected: malformed tracker URLs become NULL, unknown status names
//! become NULL, and items without a status or issue-type value are
//! dropped outright.

use github_api::ItemNode;
use sync_store::{IssueStatus, RemoteIssue, is_browse_url};
use tracing::debug;

use crate::fields::{
    ALIAS_ASSIGNEES, ALIAS_ESTIMATE, ALIAS_JIRA_ISSUE_TYPE, ALIAS_JIRA_URL, ALIAS_REPOSITORY,
    ALIAS_STATUS, ALIAS_TITLE,
};

/// Normalize one raw item; `None` when the item is unusable
pub fn normalize_item(item: &ItemNode) -> Option<RemoteIssue> {
    let Some(status_name) = item.single_select(ALIAS_STATUS) else {
        debug!(item = %item.id, "Dropping item without a status value");
        return None;
    };
    let Some(issue_type) = item.single_select(ALIAS_JIRA_ISSUE_TYPE) else {
        debug!(item = %item.id, "Dropping item without an issue-type value");
        return None;
    };

    let jira_url = item
        .text(ALIAS_JIRA_URL)
        .filter(|url| is_browse_url(url))
        .map(str::to_string);

    Some(RemoteIssue {
        item_id: item.id.clone(),
        title: item.text(ALIAS_TITLE).unwrap_or_default().to_string(),
        status: IssueStatus::parse(status_name),
        jira_url,
        jira_issue_type: Some(issue_type.to_string()),
        estimate: item.number(ALIAS_ESTIMATE).map(|n| n as i64),
        assignees: item.user_logins(ALIAS_ASSIGNEES),
        repository: item.repository(ALIAS_REPOSITORY).map(str::to_string),
    })
}

/// Normalize a fetched batch, dropping unusable items
pub fn normalize_items(items: &[ItemNode]) -> Vec<RemoteIssue> {
    items.iter().filter_map(normalize_item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::mock_item;
    use test_case::test_case;

    #[test]
    fn full_item_normalizes() {
        let item = mock_item("ITEM_1")
            .title("Ship the thing")
            .status("In Progress")
            .issue_type("Task")
            .jira_url("https://acme.atlassian.net/browse/PLAT-1")
            .estimate(3.0)
            .assignees(&["octocat", "hubot"])
            .repository("acme/platform")
            .build();

        let issue = normalize_item(&item).unwrap();
        assert_eq!(issue.item_id, "ITEM_1");
        assert_eq!(issue.title, "Ship the thing");
        assert_eq!(issue.status, Some(IssueStatus::Wip));
        assert_eq!(
            issue.jira_url.as_deref(),
            Some("https://acme.atlassian.net/browse/PLAT-1")
        );
        assert_eq!(issue.jira_issue_type.as_deref(), Some("Task"));
        assert_eq!(issue.estimate, Some(3));
        assert_eq!(issue.assignees, vec!["octocat", "hubot"]);
        assert_eq!(issue.repository.as_deref(), Some("acme/platform"));
    }

    #[test]
    fn items_without_status_or_issue_type_are_dropped() {
        let no_status = mock_item("ITEM_1").issue_type("Task").build();
        assert!(normalize_item(&no_status).is_none());

        let no_type = mock_item("ITEM_2").status("Todo").build();
        assert!(normalize_item(&no_type).is_none());
    }

    #[test_case("Todo", Some(IssueStatus::Todo))]
    #[test_case("In Progress", Some(IssueStatus::Wip))]
    #[test_case("Done", Some(IssueStatus::Done))]
    #[test_case("Blocked", None; "out of vocabulary narrows to null")]
    fn status_narrowing(raw: &str, expected: Option<IssueStatus>) {
        let item = mock_item("ITEM_1").status(raw).issue_type("Task").build();
        let issue = normalize_item(&item).unwrap();
        assert_eq!(issue.status, expected);
    }

    #[test_case("not-a-url")]
    #[test_case("http://acme.atlassian.net/browse/PLAT-1"; "plain http")]
    #[test_case("https://acme.example.com/browse/PLAT-1"; "wrong host")]
    fn malformed_urls_are_nulled(url: &str) {
        let item = mock_item("ITEM_1")
            .status("Todo")
            .issue_type("Task")
            .jira_url(url)
            .build();
        let issue = normalize_item(&item).unwrap();
        assert_eq!(issue.jira_url, None);
    }

    #[test]
    fn batch_normalization_keeps_usable_items() {
        let items = vec![
            mock_item("ITEM_ok").status("Todo").issue_type("Task").build(),
            mock_item("ITEM_drop").build(),
        ];
        let issues = normalize_items(&items);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].item_id, "ITEM_ok");
    }
}
