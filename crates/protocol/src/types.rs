//! Core types shared across the protocol

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reference to the viewer's last-used workspace ("ground").
///
/// The legacy store persisted both a real `null` and the string `"null"`
/// for "no workspace yet"; both rehydrate to [`WorkspaceRef::NoWorkspace`]
/// and only one canonical form (`null`) is ever written back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkspaceRef {
    Workspace(String),
    #[default]
    NoWorkspace,
}

impl WorkspaceRef {
    pub fn workspace(id: impl Into<String>) -> Self {
        WorkspaceRef::Workspace(id.into())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, WorkspaceRef::NoWorkspace)
    }

    /// The path segment used when interpolating this reference into a route.
    ///
    /// `NoWorkspace` keeps the legacy literal `null` segment — the exact
    /// `/login` redirect intentionally passes it through unchanged.
    pub fn as_segment(&self) -> &str {
        match self {
            WorkspaceRef::Workspace(id) => id,
            WorkspaceRef::NoWorkspace => "null",
        }
    }
}

impl Serialize for WorkspaceRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WorkspaceRef::Workspace(id) => serializer.serialize_some(id),
            WorkspaceRef::NoWorkspace => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for WorkspaceRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw {
            None => WorkspaceRef::NoWorkspace,
            Some(id) if id == "null" => WorkspaceRef::NoWorkspace,
            Some(id) => WorkspaceRef::Workspace(id),
        })
    }
}

/// Access/refresh token pair issued by the backend after GitHub OAuth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

/// The viewer's persisted authentication and last-used-workspace state.
///
/// Invariant: `logged_in == true` implies `credential.is_some()`. The
/// session context enforces it on every action and repairs violating
/// rehydrated state back to logged-out defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub logged_in: bool,
    pub last_workspace: WorkspaceRef,
    pub credential: Option<Credential>,
}

impl Session {
    /// Whether the invariant `logged_in ⇒ credential present` holds.
    pub fn is_well_formed(&self) -> bool {
        !self.logged_in || self.credential.is_some()
    }
}

/// A remote repository offered during first-login setup.
///
/// Fetched per setup invocation, never persisted. `is_ground` marks repos
/// that already back a workspace and are filtered out of selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoCandidate {
    pub repo_id: i64,
    pub name: String,
    pub is_ground: bool,
}

/// A freshly provisioned workspace, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundCreated {
    pub id: String,
}

/// Output of the navigation guard for one route request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Render whatever route matched the requested path.
    Render,
    /// Navigate to `to` instead; the guard re-evaluates the new path.
    Redirect { to: String },
}

impl Decision {
    pub fn redirect(to: impl Into<String>) -> Self {
        Decision::Redirect { to: to.into() }
    }
}
