//! GitHub repository collector.
//!
//! Pulls the last 24 hours of commits and issues (the issues endpoint also
//! returns pull requests, which we tag in metadata) from each configured
//! repository via the REST API.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CollectError;
use crate::types::{HttpSettings, NewItem};
use crate::Collector;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const MAX_TITLE_LEN: usize = 500;

#[derive(Debug, Deserialize)]
struct GithubConfig {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    repositories: Vec<String>,
}

pub struct GithubCollector {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    repositories: Vec<String>,
}

impl GithubCollector {
    /// Build a collector from a source's JSON config.
    ///
    /// Expected shape: `{"token": "...", "repositories": ["owner/repo", ...]}`
    /// with `token` optional.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::InvalidConfig`] when the config does not match
    /// that shape.
    pub fn from_config(config: &Value, settings: &HttpSettings) -> Result<Self, CollectError> {
        Self::from_config_with_base_url(config, settings, DEFAULT_API_BASE)
    }

    /// Like [`Self::from_config`] but against a custom API base URL.
    pub fn from_config_with_base_url(
        config: &Value,
        settings: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, CollectError> {
        let parsed: GithubConfig = serde_json::from_value(config.clone())
            .map_err(|e| CollectError::InvalidConfig(format!("github config: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: parsed.token,
            repositories: parsed.repositories,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn fetch_json(&self, path: &str) -> Result<Value, CollectError> {
        let response = self.get(path).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn collect_repo(
        &self,
        repo: &str,
        since: DateTime<Utc>,
        items: &mut Vec<NewItem>,
    ) -> Result<(), CollectError> {
        let since_param = since.to_rfc3339();

        let commits = self
            .fetch_json(&format!("/repos/{repo}/commits?since={since_param}"))
            .await?;
        for commit in commits.as_array().into_iter().flatten() {
            if let Some(item) = commit_item(repo, commit) {
                items.push(item);
            }
        }

        let issues = self
            .fetch_json(&format!("/repos/{repo}/issues?state=all&since={since_param}"))
            .await?;
        for issue in issues.as_array().into_iter().flatten() {
            if let Some(item) = issue_item(repo, issue) {
                items.push(item);
            }
        }

        Ok(())
    }
}

impl Collector for GithubCollector {
    fn test_connection(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self.get("/rate_limit").send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("GitHub connection successful");
                    true
                }
                Ok(response) => {
                    tracing::error!(status = %response.status(), "GitHub connection failed");
                    false
                }
                Err(e) => {
                    tracing::error!(error = %e, "GitHub connection failed");
                    false
                }
            }
        })
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<NewItem>, CollectError>> {
        Box::pin(async move {
            let since = Utc::now() - ChronoDuration::hours(24);
            let mut items = Vec::new();

            for repo in &self.repositories {
                tracing::info!(repo, "collecting repository data");
                // One bad repository must not sink the rest.
                if let Err(e) = self.collect_repo(repo, since, &mut items).await {
                    tracing::error!(repo, error = %e, "error collecting repository");
                }
            }

            tracing::info!(count = items.len(), "github collection finished");
            Ok(items)
        })
    }
}

fn truncate_title(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default();
    first_line.chars().take(MAX_TITLE_LEN).collect()
}

fn string_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn commit_item(repo: &str, commit: &Value) -> Option<NewItem> {
    let sha = commit.get("sha").and_then(Value::as_str)?;
    let message = string_at(commit, "/commit/message").unwrap_or_default();
    let author = string_at(commit, "/commit/author/name");
    let published_at = string_at(commit, "/commit/author/date")
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc));

    Some(NewItem {
        item_type: "commit".to_string(),
        external_id: Some(sha.to_string()),
        title: Some(truncate_title(message)),
        content: message.to_string(),
        metadata: json!({
            "repository": repo,
            "author": author,
        }),
        url: string_at(commit, "/html_url").map(str::to_string),
        author: author.map(str::to_string),
        published_at,
    })
}

fn issue_item(repo: &str, issue: &Value) -> Option<NewItem> {
    let number = issue.get("number").and_then(Value::as_i64)?;
    let title = issue.get("title").and_then(Value::as_str).unwrap_or_default();
    let body = issue.get("body").and_then(Value::as_str).unwrap_or_default();
    let labels: Vec<&str> = issue
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|l| l.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    Some(NewItem {
        item_type: "issue".to_string(),
        external_id: Some(number.to_string()),
        title: Some(title.to_string()),
        content: body.to_string(),
        metadata: json!({
            "repository": repo,
            "state": issue.get("state").and_then(Value::as_str),
            "labels": labels,
            "comments": issue.get("comments").and_then(Value::as_i64).unwrap_or(0),
            "is_pull_request": issue.get("pull_request").is_some(),
        }),
        url: string_at(issue, "/html_url").map(str::to_string),
        author: string_at(issue, "/user/login").map(str::to_string),
        published_at: issue
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc)),
    })
}
