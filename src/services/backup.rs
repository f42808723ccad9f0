//! Pushes a snapshot of every page to a gist-style endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::{AuthorizationGate, Capability, Principal};
use crate::config::BackupConfig;
use crate::database::{PageSnapshot, PageStore};
use crate::pipeline::PipelineError;

const GITHUB_V3_JSON: &str = "application/vnd.github.v3+json";

#[derive(Debug, Error)]
pub enum BackupError {
    /// The endpoint answered with something other than 201
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The endpoint could not be reached, or did not answer in time
    #[error("Backup endpoint unreachable: {0}")]
    Transport(String),

    #[error("Backup endpoint returned an unreadable body: {0}")]
    InvalidResponse(String),

    #[error("Failed to build backup client: {0}")]
    Client(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GistFile {
    pub content: String,
}

/// Body posted to the backup endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GistPayload {
    pub files: BTreeMap<String, GistFile>,
    pub description: String,
    pub public: bool,
}

impl GistPayload {
    /// One file per page, keyed by page name. A later duplicate name replaces
    /// an earlier one.
    pub fn from_snapshot(snapshot: &PageSnapshot, description: &str, public: bool) -> Self {
        let files = snapshot
            .entries
            .iter()
            .map(|(name, content)| {
                (
                    name.clone(),
                    GistFile {
                        content: content.clone(),
                    },
                )
            })
            .collect();

        Self {
            files,
            description: description.to_string(),
            public,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GistCreated {
    html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupReceipt {
    pub url: String,
    pub pages: usize,
}

pub struct BackupCoordinator {
    store: Arc<dyn PageStore>,
    gate: AuthorizationGate,
    client: Client,
    config: BackupConfig,
    role: Capability,
}

impl BackupCoordinator {
    pub fn new(
        store: Arc<dyn PageStore>,
        gate: AuthorizationGate,
        config: BackupConfig,
        role: &str,
    ) -> Result<Self, BackupError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .gzip(true)
            .build()
            .map_err(|e| BackupError::Client(e.to_string()))?;

        Ok(Self {
            store,
            gate,
            client,
            config,
            role: Capability::role(role),
        })
    }

    /// Authorize the backup role, read every page once, then post the snapshot.
    pub async fn backup(&self, principal: &Principal) -> Result<BackupReceipt, PipelineError> {
        let decision = self.gate.check(principal, self.role.clone()).await;
        if !decision.is_granted() {
            return Err(PipelineError::Denied(decision.capability));
        }

        let snapshot = PageSnapshot::from(self.store.fetch_all_pages_data().await?);
        let payload = GistPayload::from_snapshot(&snapshot, &self.config.description, self.config.public);
        let pages = payload.files.len();

        let url = self.send(&payload).await?;
        info!("'{}' backed up {} pages to {}", principal.username, pages, url);

        Ok(BackupReceipt { url, pages })
    }

    async fn send(&self, payload: &GistPayload) -> Result<String, BackupError> {
        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header(header::ACCEPT, GITHUB_V3_JSON)
            .json(payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Backup request to {} failed: {}", self.config.endpoint, e);
            BackupError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::CREATED {
            let created: GistCreated = response
                .json()
                .await
                .map_err(|e| BackupError::InvalidResponse(e.to_string()))?;
            return Ok(created.html_url);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read backup rejection body ({}): {}", status, e);
                String::new()
            }
        };
        let message = rejection_message(status, &body);
        error!("{}", message);
        Err(BackupError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn rejection_message(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("Unknown status");
    let mut message = format!("Could not backup the wiki: {}", reason);

    if !body.trim().is_empty() {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| body.to_string());
        message.push('\n');
        message.push_str(&detail);
    }
    message
}
