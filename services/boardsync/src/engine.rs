// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! Engine coordinator
//!
//! Fans out one reconciler task per configured project and waits for all
//! of them. Each task receives its own owned `ProjectConfig` plus shared
//! handles to the mirror and the board client; the tracker client is
//! per-project because credentials and subdomain differ. The first worker
//! failure (or panic) is fatal for the whole process.

use std::sync::Arc;

use anyhow::{Context, Result};
use github_client::GithubClient;
use jira_client::JiraClient;
use sync_store::SyncStore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::clients::{BoardApi, TrackerApi};
use crate::config::Config;
use crate::reconciler::{Reconciler, jira_credentials};

/// Tracker credentials as handed to the engine (flag- or env-sourced)
#[derive(Debug, Clone, Default)]
pub struct TrackerAuth {
    pub email: Option<String>,
    pub token: Option<String>,
}

/// Run the sync engine over a validated configuration.
///
/// Returns once every project worker has completed; with polling enabled
/// the workers never complete, so this only returns on failure.
pub async fn run(config: Config, github_token: &str, auth: TrackerAuth) -> Result<()> {
    let store = SyncStore::open_default().context("failed to open mirror database")?;
    let board: Arc<dyn BoardApi> = Arc::new(GithubClient::new(github_token)?);

    let mut workers = JoinSet::new();
    for project in config.sync.clone() {
        let (email, token) = jira_credentials(
            |key| std::env::var(key).ok(),
            &project.name,
            auth.email.as_deref(),
            auth.token.as_deref(),
        )?;
        let tracker: Arc<dyn TrackerApi> = Arc::new(JiraClient::new(
            &project.jira.base_url(),
            &email,
            &token,
        )?);

        let name = project.name.clone();
        let reconciler = Reconciler::new(
            project,
            config.sleep_time,
            Arc::clone(&board),
            tracker,
            store.clone(),
        );
        info!(project = %name, "Spawning sync worker");
        workers.spawn(async move { reconciler.run().await });
    }

    while let Some(joined) = workers.join_next().await {
        let result = joined.context("sync worker panicked")?;
        if let Err(e) = result {
            error!(error = format!("{e:#}"), "Sync worker failed");
            return Err(e);
        }
    }

    Ok(())
}
