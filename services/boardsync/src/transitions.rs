// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Ticket transition driver
//!
//! Transitions are numeric workflow edges configured per issue type.
//! Driving them is deliberately best-effort: a failing step is logged and
//! the remaining steps still run, so a misconfigured id cannot stall the
//! engine.

use jira_api::IssueKey;
use sync_store::IssueStatus;
use tracing::{debug, warn};

use crate::clients::TrackerApi;
use crate::config::JiraConfig;

/// Terminal status a transition chain drives toward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTarget {
    Wip,
    Done,
}

/// Run the configured transition chain for `target` on one ticket
pub async fn transition_to(
    tracker: &dyn TrackerApi,
    jira: &JiraConfig,
    key: &IssueKey,
    issue_type: &str,
    target: TransitionTarget,
) {
    let Some(plan) = jira.plan_for(issue_type) else {
        debug!(
            key = %key,
            issue_type = %issue_type,
            "No transition plan configured for issue type"
        );
        return;
    };

    let ids = match target {
        TransitionTarget::Wip => &plan.transitions_to_wip,
        TransitionTarget::Done => &plan.transitions_to_done,
    };

    for id in ids {
        let id = id.to_string();
        if let Err(e) = tracker.transition_issue(key, &id).await {
            warn!(
                key = %key,
                transition = %id,
                error = %e,
                "Transition step failed, continuing with remaining steps"
            );
        }
    }
}

/// Drive a ticket toward the given board status.
///
/// Reaching DONE always traverses the to-WIP chain first; the board's
/// workflow expects the intermediate state to have been visited.
pub async fn advance(
    tracker: &dyn TrackerApi,
    jira: &JiraConfig,
    key: &IssueKey,
    issue_type: &str,
    status: IssueStatus,
) {
    match status {
        IssueStatus::Todo => {}
        IssueStatus::Wip => {
            transition_to(tracker, jira, key, issue_type, TransitionTarget::Wip).await;
        }
        IssueStatus::Done => {
            transition_to(tracker, jira, key, issue_type, TransitionTarget::Wip).await;
            transition_to(tracker, jira, key, issue_type, TransitionTarget::Done).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTracker;

    fn jira_config(yaml: &str) -> JiraConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn key() -> IssueKey {
        IssueKey::new_unchecked("PLAT-1")
    }

    #[tokio::test]
    async fn runs_chain_in_order() {
        let tracker = MockTracker::default();
        let jira = jira_config(
            r#"
subdomain: acme
projectKey: PLAT
issues:
  - type: Task
    transitionsToWip: [11, 21]
    transitionsToDone: [31]
"#,
        );

        transition_to(&tracker, &jira, &key(), "Task", TransitionTarget::Wip).await;

        let calls = tracker.transitions.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("PLAT-1".to_string(), "11".to_string()),
                ("PLAT-1".to_string(), "21".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_step_does_not_abort_the_chain() {
        let tracker = MockTracker::default();
        tracker.fail_transition("11");
        let jira = jira_config(
            r#"
subdomain: acme
projectKey: PLAT
issues:
  - type: Task
    transitionsToWip: [11, 21]
"#,
        );

        transition_to(&tracker, &jira, &key(), "Task", TransitionTarget::Wip).await;

        let calls = tracker.transitions.lock().unwrap().clone();
        // both attempted despite the first failing
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1, "21");
    }

    #[tokio::test]
    async fn unknown_issue_type_is_a_no_op() {
        let tracker = MockTracker::default();
        let jira = jira_config("subdomain: acme\nprojectKey: PLAT\n");

        transition_to(&tracker, &jira, &key(), "Story", TransitionTarget::Done).await;
        assert!(tracker.transitions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn advance_to_done_traverses_wip_first() {
        let tracker = MockTracker::default();
        let jira = jira_config(
            r#"
subdomain: acme
projectKey: PLAT
issues:
  - type: Task
    transitionsToWip: [11]
    transitionsToDone: [31]
"#,
        );

        advance(&tracker, &jira, &key(), "Task", IssueStatus::Done).await;

        let ids: Vec<String> = tracker
            .transitions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect();
        assert_eq!(ids, vec!["11", "31"]);
    }

    #[tokio::test]
    async fn advance_to_done_with_empty_wip_chain_still_runs_done() {
        let tracker = MockTracker::default();
        let jira = jira_config(
            r#"
subdomain: acme
projectKey: PLAT
issues:
  - type: Task
    transitionsToDone: [31]
"#,
        );

        advance(&tracker, &jira, &key(), "Task", IssueStatus::Done).await;

        let ids: Vec<String> = tracker
            .transitions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect();
        assert_eq!(ids, vec!["31"]);
    }

    #[tokio::test]
    async fn advance_to_todo_does_nothing() {
        let tracker = MockTracker::default();
        let jira = jira_config(
            r#"
subdomain: acme
projectKey: PLAT
issues:
  - type: Task
    transitionsToWip: [11]
"#,
        );

        advance(&tracker, &jira, &key(), "Task", IssueStatus::Todo).await;
        assert!(tracker.transitions.lock().unwrap().is_empty());
    }
}
