// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Board-login to tracker-account translation
//!
//! Each configured `(jiraEmail, ghUser)` pair is resolved by email lookup.
//! Anything but exactly one hit skips the pair with a warning; created
//! tickets simply will not carry that assignee.

use anyhow::Result;
use std::collections::HashMap;
use tracing::warn;

use crate::clients::TrackerApi;
use crate::config::AssigneePair;

/// Ask for two results so a second hit marks the lookup ambiguous
const LOOKUP_LIMIT: u32 = 2;

/// Resolve configured pairs to a `board login -> tracker account id` map
pub async fn translate(
    tracker: &dyn TrackerApi,
    project_name: &str,
    pairs: &[AssigneePair],
) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for pair in pairs {
        let users = tracker
            .search_users("", &pair.jira_email, 0, LOOKUP_LIMIT)
            .await?;

        if users.len() != 1 {
            warn!(
                project = %project_name,
                email = %pair.jira_email,
                matches = users.len(),
                "Assignee email did not resolve to exactly one tracker user, skipping"
            );
            continue;
        }

        map.insert(pair.gh_user.clone(), users[0].account_id.clone());
    }

    Ok(map)
}
