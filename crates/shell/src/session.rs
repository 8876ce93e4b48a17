//! Session context
//!
//! Owns the one [`Session`] for this process and is the only writer to it.
//! Every mutation goes through an explicit action (`login`, `logout`,
//! `set_workspace`), is applied atomically, persisted, and published as a
//! lock-free snapshot. Readers (the guard, any render layer) only ever see
//! fully-formed sessions.

use std::sync::Arc;

use arc_swap::ArcSwap;
use groundgate_protocol::{Credential, Session, WorkspaceRef};
use tracing::{info, warn};

use crate::store::SessionStore;

pub struct SessionContext {
    session: Session,
    store: Box<dyn SessionStore>,
    snapshot: Arc<ArcSwap<Session>>,
}

impl SessionContext {
    /// Rehydrate the persisted session before the first guard evaluation.
    ///
    /// A missing or unreadable record, and any record violating
    /// `logged_in ⇒ credential present`, degrades to logged-out defaults —
    /// an unhydrated session is indistinguishable from a logged-out one.
    pub async fn rehydrate(store: Box<dyn SessionStore>) -> Self {
        let session = match store.load().await {
            Ok(Some(session)) if session.is_well_formed() => session,
            Ok(Some(session)) => {
                warn!(
                    component = "session",
                    event = "session.rehydrate_repaired",
                    logged_in = session.logged_in,
                    "persisted session was logged in without a credential, resetting"
                );
                Session::default()
            }
            Ok(None) => Session::default(),
            Err(err) => {
                warn!(
                    component = "session",
                    event = "session.rehydrate_failed",
                    error = %err,
                    "falling back to logged-out defaults"
                );
                Session::default()
            }
        };

        let snapshot = Arc::new(ArcSwap::from_pointee(session.clone()));
        Self {
            session,
            store,
            snapshot,
        }
    }

    /// The current session. Always well-formed.
    pub fn current(&self) -> &Session {
        &self.session
    }

    /// Lock-free snapshot handle for readers outside the shell's thread.
    #[allow(dead_code)]
    pub fn snapshot_handle(&self) -> Arc<ArcSwap<Session>> {
        self.snapshot.clone()
    }

    /// Log the viewer in with a fresh credential pair.
    pub async fn login(&mut self, credential: Credential) {
        self.session.logged_in = true;
        self.session.credential = Some(credential);
        info!(component = "session", event = "session.login");
        self.commit().await;
    }

    /// Reset to defaults: logged out, no credential. The last workspace is
    /// cleared too — logout resets, it never partially clears.
    pub async fn logout(&mut self) {
        self.session = Session::default();
        info!(component = "session", event = "session.logout");
        self.commit().await;
    }

    /// Remember the viewer's workspace after setup or a workspace switch.
    pub async fn set_workspace(&mut self, id: impl Into<String>) {
        let id = id.into();
        info!(
            component = "session",
            event = "session.set_workspace",
            workspace = %id,
        );
        self.session.last_workspace = WorkspaceRef::Workspace(id);
        self.commit().await;
    }

    /// Persist and publish. A failed write keeps the in-memory session
    /// authoritative for this process; the next mutation retries.
    async fn commit(&mut self) {
        debug_assert!(self.session.is_well_formed());
        if let Err(err) = self.store.save(&self.session).await {
            warn!(
                component = "session",
                event = "session.persist_failed",
                error = %err,
            );
        }
        self.snapshot.store(Arc::new(self.session.clone()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
