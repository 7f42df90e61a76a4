// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Edgecast Cloud LLC.

//! boardsync CLI entry point

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use github_client::GithubClient;

use boardsync::config::Config;
use boardsync::engine::{self, TrackerAuth};

#[derive(Parser)]
#[command(name = "boardsync", version)]
#[command(about = "Sync GitHub project boards with Jira", long_about = None)]
struct Cli {
    /// GitHub token used for the Projects GraphQL API
    #[arg(long = "gh-token", env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    github_token: Option<String>,

    /// Jira email used for basic auth
    #[arg(long, env = "JIRA_EMAIL", hide_env_values = true, global = true)]
    jira_email: Option<String>,

    /// Jira API token used for basic auth
    #[arg(long, env = "JIRA_TOKEN", hide_env_values = true, global = true)]
    jira_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync configured GitHub projects with Jira
    Sync {
        /// Path to the YAML config file
        #[arg(long, short)]
        config: PathBuf,
    },
    /// GitHub utilities
    Github {
        #[command(subcommand)]
        command: GithubCommands,
    },
}

#[derive(Subcommand)]
enum GithubCommands {
    /// List the projects of a user or organization as JSON
    #[command(group(ArgGroup::new("owner").required(true).args(["org", "user"])))]
    ListProjects {
        /// GitHub organization
        #[arg(long)]
        org: Option<String>,

        /// GitHub username
        #[arg(long, short)]
        user: Option<String>,
    },
}

fn github_token(cli: &Cli) -> Result<&str> {
    cli.github_token
        .as_deref()
        .context(r#"please set the "GITHUB_TOKEN" env variable"#)
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Sync { config } => {
            let config = Config::load(config)?;
            let token = github_token(&cli)?.to_string();
            let auth = TrackerAuth {
                email: cli.jira_email.clone(),
                token: cli.jira_token.clone(),
            };
            engine::run(config, &token, auth).await
        }

        Commands::Github { command } => match command {
            GithubCommands::ListProjects { org, user } => {
                let client = GithubClient::new(github_token(&cli)?)?;
                let projects = match (org, user) {
                    (_, Some(user)) => client.list_user_projects(user).await?,
                    (Some(org), None) => client.list_org_projects(org).await?,
                    (None, None) => unreachable!("clap enforces the owner group"),
                };
                println!("{}", serde_json::to_string(&projects)?);
                Ok(())
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "boardsync=info".to_string()),
        ))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Test that the CLI structure is valid and has no conflicts.
    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_projects_requires_an_owner() {
        let err = Cli::try_parse_from(["boardsync", "github", "list-projects"]);
        assert!(err.is_err());
    }

    #[test]
    fn list_projects_rejects_both_owners() {
        let err = Cli::try_parse_from([
            "boardsync",
            "github",
            "list-projects",
            "--org",
            "acme",
            "--user",
            "octocat",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn sync_requires_a_config_path() {
        let err = Cli::try_parse_from(["boardsync", "sync"]);
        assert!(err.is_err());

        let ok = Cli::try_parse_from(["boardsync", "sync", "--config", "sync.yaml"]);
        assert!(ok.is_ok());
    }
}
