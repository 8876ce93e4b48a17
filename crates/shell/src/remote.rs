//! Backend remote calls
//!
//! The shell only ever sees the [`Remote`] trait and its closed error
//! taxonomy. String matching on error messages (the legacy
//! `RefreshTokenExpired` check) is replaced by [`RemoteError`], matched
//! exhaustively at every call site.

use async_trait::async_trait;
use groundgate_protocol::{new_id, Credential, Envelope, GroundCreated, RepoCandidate};
use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors a remote call can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Stored access/refresh tokens are no longer valid. The only
    /// cross-cutting error: the session resets and the viewer lands on
    /// the login root.
    #[error("refresh token expired")]
    ExpiredCredential,

    /// Anything else — network failure, decode failure, backend fault.
    /// Surfaced locally, never resets the session.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// The backend surface the shell depends on.
#[async_trait]
pub trait Remote: Send + Sync {
    /// List the viewer's remote repositories, flagged with whether each
    /// one already backs a workspace.
    async fn repo_list(&self, credential: &Credential) -> Result<Vec<RepoCandidate>, RemoteError>;

    /// Provision a workspace from a repository.
    async fn create_ground(
        &self,
        credential: &Credential,
        repo_id: i64,
        name: &str,
    ) -> Result<GroundCreated, RemoteError>;

    /// Mirror the last-visited workspace server-side. Best-effort.
    async fn update_last_ground(
        &self,
        credential: &Credential,
        ground_id: &str,
    ) -> Result<(), RemoteError>;
}

// ---------------------------------------------------------------------------
// HttpRemote
// ---------------------------------------------------------------------------

const REPO_LIST_PATH: &str = "/user/repo/list";
const CREATE_GROUND_PATH: &str = "/ground";
const LAST_GROUND_PATH: &str = "/user/last-ground";

/// reqwest-backed [`Remote`] speaking the backend's envelope format.
pub struct HttpRemote {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn apply_auth(
        request: reqwest::RequestBuilder,
        credential: &Credential,
    ) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&credential.access_token)
            .header("Refresh-Token", &credential.refresh_token)
    }

    /// Map status, then decode the envelope. 401 means the refresh token
    /// is spent; everything else non-2xx is a transport fault.
    async fn read_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        request_id: &str,
    ) -> Result<T, RemoteError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(
                component = "remote",
                event = "remote.credential_expired",
                request_id = %request_id,
            );
            return Err(RemoteError::ExpiredCredential);
        }
        if !status.is_success() {
            return Err(RemoteError::Transport(format!(
                "backend returned {status}"
            )));
        }

        let envelope: Envelope<T> = response.json().await?;
        envelope.into_data().map_err(RemoteError::Transport)
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn repo_list(&self, credential: &Credential) -> Result<Vec<RepoCandidate>, RemoteError> {
        let request_id = new_id();
        debug!(
            component = "remote",
            event = "remote.repo_list",
            request_id = %request_id,
        );
        let response = Self::apply_auth(
            self.client.get(format!("{}{}", self.base_url, REPO_LIST_PATH)),
            credential,
        )
        .send()
        .await?;
        Self::read_envelope(response, &request_id).await
    }

    async fn create_ground(
        &self,
        credential: &Credential,
        repo_id: i64,
        name: &str,
    ) -> Result<GroundCreated, RemoteError> {
        let request_id = new_id();
        debug!(
            component = "remote",
            event = "remote.create_ground",
            request_id = %request_id,
            repo_id,
            name = %name,
        );
        let response = Self::apply_auth(
            self.client
                .post(format!("{}{}", self.base_url, CREATE_GROUND_PATH))
                .json(&json!({ "repoId": repo_id, "name": name })),
            credential,
        )
        .send()
        .await?;
        Self::read_envelope(response, &request_id).await
    }

    async fn update_last_ground(
        &self,
        credential: &Credential,
        ground_id: &str,
    ) -> Result<(), RemoteError> {
        let request_id = new_id();
        debug!(
            component = "remote",
            event = "remote.update_last_ground",
            request_id = %request_id,
            ground_id = %ground_id,
        );
        let response = Self::apply_auth(
            self.client.put(format!(
                "{}{}/{}",
                self.base_url, LAST_GROUND_PATH, ground_id
            )),
            credential,
        )
        .send()
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RemoteError::ExpiredCredential);
        }
        if !status.is_success() {
            return Err(RemoteError::Transport(format!(
                "backend returned {status}"
            )));
        }
        Ok(())
    }
}
