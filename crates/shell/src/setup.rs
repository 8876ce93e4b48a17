//! First-login setup flow
//!
//! Turns one of the viewer's remote repositories into a workspace:
//! `Idle → FetchingRepos → AwaitingSelection → Provisioning → Done`, with
//! `NoCandidates` as a terminal display state and inert failure handling
//! everywhere else.
//!
//! Transitions are synchronous and IO-free; the shell performs the remote
//! calls and feeds completions back together with the [`InvocationToken`]
//! it was handed when the call started. A token minted before the current
//! epoch is stale — its completion is discarded, so a superseded fetch or
//! a response arriving after navigation can never mutate anything.

use std::time::Duration;

use groundgate_protocol::{GroundCreated, RepoCandidate};
use tracing::{debug, info, warn};

use crate::guard::LOGIN;
use crate::remote::RemoteError;

/// Cooperative cap on each remote call, so the failure paths stay
/// reachable even when a call never resolves. The source had no policy
/// here; elapsed maps to the transport-failure path.
pub const REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Ties an in-flight remote call to the invocation that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationToken(u64);

/// Where the flow currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum SetupState {
    Idle,
    /// Repo list requested; also the resting state after a transport
    /// failure, awaiting an external retrigger.
    FetchingRepos,
    /// Candidates shown, first one pre-selected. Selection changes freely.
    AwaitingSelection {
        candidates: Vec<RepoCandidate>,
        selected: usize,
    },
    /// Every repository already backs a workspace. Terminal until
    /// credentials or data change.
    NoCandidates,
    Provisioning {
        candidates: Vec<RepoCandidate>,
        selected: usize,
    },
    Done {
        ground_id: String,
    },
}

/// Side effect the shell must carry out after a transition. The flow never
/// touches the session or navigation itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupEffect {
    /// Credential expired: reset the session, then land on `redirect`.
    ResetSession { redirect: String },
    /// Provisioning succeeded: remember the workspace, then navigate.
    EnterWorkspace { ground_id: String, redirect: String },
}

pub struct SetupFlow {
    state: SetupState,
    epoch: u64,
}

impl Default for SetupFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupFlow {
    pub fn new() -> Self {
        Self {
            state: SetupState::Idle,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &SetupState {
        &self.state
    }

    /// Begin (or supersede) a repo fetch. Minting a new token makes every
    /// outstanding completion stale.
    pub fn begin_fetch(&mut self) -> InvocationToken {
        self.epoch += 1;
        self.state = SetupState::FetchingRepos;
        info!(
            component = "setup",
            event = "setup.fetch_started",
            epoch = self.epoch,
        );
        InvocationToken(self.epoch)
    }

    /// Apply the repo-list completion carrying `token`.
    pub fn on_repo_list(
        &mut self,
        token: InvocationToken,
        result: Result<Vec<RepoCandidate>, RemoteError>,
    ) -> Option<SetupEffect> {
        if self.is_stale(token) {
            return None;
        }

        match result {
            Ok(repos) => {
                let candidates: Vec<RepoCandidate> =
                    repos.into_iter().filter(|repo| !repo.is_ground).collect();
                if candidates.is_empty() {
                    info!(component = "setup", event = "setup.no_candidates");
                    self.state = SetupState::NoCandidates;
                } else {
                    info!(
                        component = "setup",
                        event = "setup.candidates_ready",
                        count = candidates.len(),
                    );
                    self.state = SetupState::AwaitingSelection {
                        candidates,
                        selected: 0,
                    };
                }
                None
            }
            Err(RemoteError::ExpiredCredential) => {
                self.reset();
                Some(SetupEffect::ResetSession {
                    redirect: LOGIN.to_string(),
                })
            }
            Err(RemoteError::Transport(error)) => {
                // Inert: stay in FetchingRepos until an external retrigger
                // (credential change, screen re-entry) starts a new fetch.
                warn!(
                    component = "setup",
                    event = "setup.fetch_failed",
                    error = %error,
                );
                None
            }
        }
    }

    /// Change the selected candidate. No state transition.
    pub fn select(&mut self, index: usize) -> bool {
        if let SetupState::AwaitingSelection {
            candidates,
            selected,
        } = &mut self.state
        {
            if index < candidates.len() {
                *selected = index;
                return true;
            }
        }
        false
    }

    /// Invoke "create" on the selected candidate. Returns the token and
    /// the candidate to provision, or `None` outside `AwaitingSelection`.
    pub fn begin_provision(&mut self) -> Option<(InvocationToken, RepoCandidate)> {
        let (candidates, selected) =
            match std::mem::replace(&mut self.state, SetupState::Idle) {
                SetupState::AwaitingSelection {
                    candidates,
                    selected,
                } => (candidates, selected),
                other => {
                    // Create only works while selecting; put the state back.
                    self.state = other;
                    return None;
                }
            };

        let repo = candidates[selected].clone();
        self.epoch += 1;
        info!(
            component = "setup",
            event = "setup.provision_started",
            epoch = self.epoch,
            repo_id = repo.repo_id,
            name = %repo.name,
        );
        self.state = SetupState::Provisioning {
            candidates,
            selected,
        };
        Some((InvocationToken(self.epoch), repo))
    }

    /// Apply the provisioning completion carrying `token`.
    pub fn on_provisioned(
        &mut self,
        token: InvocationToken,
        result: Result<GroundCreated, RemoteError>,
    ) -> Option<SetupEffect> {
        if self.is_stale(token) {
            return None;
        }

        match result {
            Ok(GroundCreated { id }) => {
                info!(
                    component = "setup",
                    event = "setup.provisioned",
                    ground_id = %id,
                );
                let redirect = format!("/{id}/home");
                self.state = SetupState::Done {
                    ground_id: id.clone(),
                };
                Some(SetupEffect::EnterWorkspace {
                    ground_id: id,
                    redirect,
                })
            }
            Err(RemoteError::ExpiredCredential) => {
                self.reset();
                Some(SetupEffect::ResetSession {
                    redirect: LOGIN.to_string(),
                })
            }
            Err(RemoteError::Transport(error)) => {
                // Non-fatal: fall back to the predecessor state with the
                // same selection, awaiting a manual retry.
                warn!(
                    component = "setup",
                    event = "setup.provision_failed",
                    error = %error,
                );
                if let SetupState::Provisioning {
                    candidates,
                    selected,
                } = std::mem::replace(&mut self.state, SetupState::Idle)
                {
                    self.state = SetupState::AwaitingSelection {
                        candidates,
                        selected,
                    };
                }
                None
            }
        }
    }

    /// Navigating away from the setup screen. Pending completions become
    /// stale and the flow returns to `Idle`.
    pub fn cancel(&mut self) {
        if self.state != SetupState::Idle {
            debug!(component = "setup", event = "setup.cancelled");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.state = SetupState::Idle;
    }

    fn is_stale(&self, token: InvocationToken) -> bool {
        if token.0 != self.epoch {
            debug!(
                component = "setup",
                event = "setup.stale_response_discarded",
                token = token.0,
                epoch = self.epoch,
            );
            return true;
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: i64, is_ground: bool) -> RepoCandidate {
        RepoCandidate {
            repo_id: id,
            name: format!("repo{id}"),
            is_ground,
        }
    }

    fn flow_awaiting(candidates: Vec<RepoCandidate>) -> SetupFlow {
        let mut flow = SetupFlow::new();
        let token = flow.begin_fetch();
        assert!(flow.on_repo_list(token, Ok(candidates)).is_none());
        assert!(matches!(
            flow.state(),
            SetupState::AwaitingSelection { .. }
        ));
        flow
    }

    #[test]
    fn fetch_filters_grounded_repos_and_preselects_first() {
        let mut flow = SetupFlow::new();
        let token = flow.begin_fetch();
        assert_eq!(flow.state(), &SetupState::FetchingRepos);

        let effect = flow.on_repo_list(token, Ok(vec![repo(1, true), repo(2, false)]));
        assert!(effect.is_none());

        match flow.state() {
            SetupState::AwaitingSelection {
                candidates,
                selected,
            } => {
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].repo_id, 2);
                assert_eq!(*selected, 0);
            }
            other => panic!("expected AwaitingSelection, got {other:?}"),
        }
    }

    #[test]
    fn fetch_with_only_grounded_repos_is_terminal() {
        let mut flow = SetupFlow::new();
        let token = flow.begin_fetch();
        flow.on_repo_list(token, Ok(vec![repo(1, true)]));
        assert_eq!(flow.state(), &SetupState::NoCandidates);
    }

    #[test]
    fn expired_credential_on_fetch_resets_and_redirects() {
        let mut flow = SetupFlow::new();
        let token = flow.begin_fetch();
        let effect = flow.on_repo_list(token, Err(RemoteError::ExpiredCredential));
        assert_eq!(
            effect,
            Some(SetupEffect::ResetSession {
                redirect: "/login".to_string()
            })
        );
        assert_eq!(flow.state(), &SetupState::Idle);
    }

    #[test]
    fn transport_failure_on_fetch_is_inert() {
        let mut flow = SetupFlow::new();
        let token = flow.begin_fetch();
        let effect = flow.on_repo_list(token, Err(RemoteError::Transport("boom".into())));
        assert!(effect.is_none());
        // Stays in FetchingRepos, waiting for an external retrigger.
        assert_eq!(flow.state(), &SetupState::FetchingRepos);
    }

    #[test]
    fn superseded_fetch_completion_is_discarded() {
        let mut flow = SetupFlow::new();
        let stale = flow.begin_fetch();
        let fresh = flow.begin_fetch();

        // The superseded call resolves late; nothing may change.
        let effect = flow.on_repo_list(stale, Ok(vec![repo(9, false)]));
        assert!(effect.is_none());
        assert_eq!(flow.state(), &SetupState::FetchingRepos);

        // The live call still applies.
        flow.on_repo_list(fresh, Ok(vec![repo(2, false)]));
        assert!(matches!(flow.state(), SetupState::AwaitingSelection { .. }));
    }

    #[test]
    fn stale_expired_credential_does_not_reset() {
        let mut flow = SetupFlow::new();
        let stale = flow.begin_fetch();
        flow.cancel();

        let effect = flow.on_repo_list(stale, Err(RemoteError::ExpiredCredential));
        assert!(effect.is_none());
        assert_eq!(flow.state(), &SetupState::Idle);
    }

    #[test]
    fn selection_changes_within_bounds_only() {
        let mut flow = flow_awaiting(vec![repo(2, false), repo(3, false)]);
        assert!(flow.select(1));
        assert!(!flow.select(5));
        match flow.state() {
            SetupState::AwaitingSelection { selected, .. } => assert_eq!(*selected, 1),
            other => panic!("expected AwaitingSelection, got {other:?}"),
        }
    }

    #[test]
    fn provision_success_enters_workspace() {
        let mut flow = flow_awaiting(vec![repo(42, false)]);
        let (token, repo) = flow.begin_provision().unwrap();
        assert_eq!(repo.repo_id, 42);
        assert!(matches!(flow.state(), SetupState::Provisioning { .. }));

        let effect = flow.on_provisioned(token, Ok(GroundCreated { id: "ws1".into() }));
        assert_eq!(
            effect,
            Some(SetupEffect::EnterWorkspace {
                ground_id: "ws1".to_string(),
                redirect: "/ws1/home".to_string(),
            })
        );
        assert_eq!(
            flow.state(),
            &SetupState::Done {
                ground_id: "ws1".to_string()
            }
        );
    }

    #[test]
    fn provision_transport_failure_returns_to_selection() {
        let mut flow = flow_awaiting(vec![repo(2, false), repo(3, false)]);
        flow.select(1);
        let (token, _) = flow.begin_provision().unwrap();

        let effect = flow.on_provisioned(token, Err(RemoteError::Transport("boom".into())));
        assert!(effect.is_none());
        match flow.state() {
            SetupState::AwaitingSelection {
                candidates,
                selected,
            } => {
                // Selection survives the failed attempt.
                assert_eq!(candidates.len(), 2);
                assert_eq!(*selected, 1);
            }
            other => panic!("expected AwaitingSelection, got {other:?}"),
        }
    }

    #[test]
    fn provision_expired_credential_resets_and_redirects() {
        let mut flow = flow_awaiting(vec![repo(2, false)]);
        let (token, _) = flow.begin_provision().unwrap();
        let effect = flow.on_provisioned(token, Err(RemoteError::ExpiredCredential));
        assert_eq!(
            effect,
            Some(SetupEffect::ResetSession {
                redirect: "/login".to_string()
            })
        );
        assert_eq!(flow.state(), &SetupState::Idle);
    }

    #[test]
    fn provision_outside_selection_is_rejected() {
        let mut flow = SetupFlow::new();
        assert!(flow.begin_provision().is_none());
    }

    #[test]
    fn cancel_makes_pending_provision_stale() {
        let mut flow = flow_awaiting(vec![repo(2, false)]);
        let (token, _) = flow.begin_provision().unwrap();
        flow.cancel();

        let effect = flow.on_provisioned(token, Ok(GroundCreated { id: "ws1".into() }));
        assert!(effect.is_none());
        assert_eq!(flow.state(), &SetupState::Idle);
    }
}
