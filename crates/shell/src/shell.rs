//! Navigation shell
//!
//! One logical thread of control: route requests come in, the guard
//! decides, redirects re-enter the guard until a path renders. The shell
//! also drives the setup flow's remote calls and applies its typed
//! effects against the session, so every mutation funnels through here.

use std::sync::Arc;

use groundgate_protocol::{Credential, Decision};
use tracing::{info, warn};

use crate::guard::{self, LOGIN_GROUND_INIT};
use crate::remote::{Remote, RemoteError};
use crate::session::SessionContext;
use crate::setup::{SetupEffect, SetupFlow, SetupState, REMOTE_CALL_TIMEOUT};

/// A redirect chain longer than this is a rule-table bug; the guard's
/// rules can bounce at most twice (`/login` → `/{ws}` → render).
const MAX_REDIRECT_HOPS: usize = 8;

pub struct Shell {
    session: SessionContext,
    remote: Arc<dyn Remote>,
    setup: SetupFlow,
    current_path: String,
}

impl Shell {
    pub fn new(session: SessionContext, remote: Arc<dyn Remote>) -> Self {
        Self {
            session,
            remote,
            setup: SetupFlow::new(),
            current_path: "/".to_string(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Login action from the login screen. Any pending setup work started
    /// under the old credential becomes stale.
    #[allow(dead_code)]
    pub async fn login(&mut self, credential: Credential) {
        self.setup.cancel();
        self.session.login(credential).await;
    }

    /// Logout action from the login screen. Supersedes pending setup work
    /// the same way.
    #[allow(dead_code)]
    pub async fn logout(&mut self) {
        self.setup.cancel();
        self.session.logout().await;
    }

    pub fn setup_state(&self) -> &SetupState {
        self.setup.state()
    }

    /// The path the shell last came to rest on.
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Request navigation to `path`: evaluate the guard, follow redirects
    /// until something renders, and return the resting path. Leaving the
    /// setup screen cancels any in-flight setup work.
    pub fn navigate_to(&mut self, path: &str) -> &str {
        let mut path = path.to_string();
        for hop in 0..MAX_REDIRECT_HOPS {
            match guard::decide(&path, self.session.current()) {
                Decision::Render => break,
                Decision::Redirect { to } => {
                    info!(
                        component = "shell",
                        event = "shell.redirect",
                        from = %path,
                        to = %to,
                        hop,
                    );
                    path = to;
                }
            }
        }

        // The rule table settles in at most two hops; a still-redirecting
        // decision here means a future rule introduced a cycle.
        if let Decision::Redirect { to } = guard::decide(&path, self.session.current()) {
            warn!(
                component = "shell",
                event = "shell.redirect_loop_exhausted",
                path = %path,
                to = %to,
            );
        }

        if self.current_path == LOGIN_GROUND_INIT && path != LOGIN_GROUND_INIT {
            self.setup.cancel();
        }

        info!(
            component = "shell",
            event = "shell.rendered",
            path = %path,
            workspace = guard::workspace_route(&path).unwrap_or(""),
        );
        self.current_path = path;
        &self.current_path
    }

    /// Enter the setup flow: fetch repo candidates under the current
    /// credential. Re-entering supersedes any prior in-flight fetch.
    pub async fn run_setup(&mut self) {
        let Some(credential) = self.credential() else {
            return;
        };

        let token = self.setup.begin_fetch();
        let result = self.call_remote(self.remote.repo_list(&credential)).await;
        let effect = self.setup.on_repo_list(token, result);
        self.apply(effect).await;
    }

    /// Change the selected candidate.
    #[allow(dead_code)]
    pub fn select_candidate(&mut self, index: usize) -> bool {
        self.setup.select(index)
    }

    /// Provision a workspace from the selected candidate.
    pub async fn create_selected(&mut self) {
        let Some(credential) = self.credential() else {
            return;
        };
        let Some((token, repo)) = self.setup.begin_provision() else {
            return;
        };

        let result = self
            .call_remote(self.remote.create_ground(&credential, repo.repo_id, &repo.name))
            .await;
        let effect = self.setup.on_provisioned(token, result);
        self.apply(effect).await;
    }

    /// Wrap a remote call in the cooperative timeout; elapsed becomes a
    /// transport failure so the inert-failure paths stay reachable.
    async fn call_remote<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        match tokio::time::timeout(REMOTE_CALL_TIMEOUT, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Transport("remote call timed out".to_string())),
        }
    }

    async fn apply(&mut self, effect: Option<SetupEffect>) {
        match effect {
            None => {}
            Some(SetupEffect::ResetSession { redirect }) => {
                self.session.logout().await;
                self.navigate_to(&redirect);
            }
            Some(SetupEffect::EnterWorkspace { ground_id, redirect }) => {
                self.session.set_workspace(ground_id.clone()).await;
                // Server-side mirror is best-effort; a failure here never
                // blocks entering the workspace.
                if let Some(credential) = self.credential() {
                    if let Err(err) = self
                        .call_remote(self.remote.update_last_ground(&credential, &ground_id))
                        .await
                    {
                        warn!(
                            component = "shell",
                            event = "shell.last_ground_mirror_failed",
                            error = %err,
                        );
                    }
                }
                self.navigate_to(&redirect);
            }
        }
    }

    fn credential(&self) -> Option<Credential> {
        let credential = self.session.current().credential.clone();
        if credential.is_none() {
            warn!(
                component = "shell",
                event = "shell.setup_without_credential",
                path = %self.current_path,
            );
        }
        credential
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
