#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{header, redirect, StatusCode};
use tempfile::TempDir;

use wiki_service::app::{app, AppState};
use wiki_service::auth::UserRealm;
use wiki_service::config::AppConfig;

pub const JWT_SECRET: &str = "integration-test-secret";

/// One in-process server per test, backed by its own SQLite file
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    _dir: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_backup("http://127.0.0.1:9/gists".to_string()).await
    }

    /// Start a server whose backups go to `endpoint`
    pub async fn spawn_with_backup(endpoint: String) -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;

        let mut config = AppConfig::development();
        config.database.url = format!("sqlite://{}", dir.path().join("wiki.db").display());
        config.security.jwt_secret = JWT_SECRET.to_string();
        config.security.users_file = None;
        config.backup.endpoint = endpoint;
        config.backup.token = None;
        config.backup.timeout_secs = 5;

        let state = AppState::build(&config, Arc::new(UserRealm::development())).await?;

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state, false)).await;
        });

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;

        let server = Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            client,
            _dir: dir,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// API token via the `login`/`password` headers
    pub async fn token(&self, login: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .get(self.url("/api/token"))
            .header("login", login)
            .header("password", password)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "token request failed: {}", res.status());
        Ok(res.text().await?)
    }

    /// Browser session cookie (`wiki_session=...`) from the login form
    pub async fn session(&self, username: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/login-auth"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::SEE_OTHER, "login failed: {}", res.status());

        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .context("login did not set a cookie")?
            .to_str()?;
        let pair = set_cookie.split(';').next().unwrap_or_default();
        Ok(pair.to_string())
    }
}
