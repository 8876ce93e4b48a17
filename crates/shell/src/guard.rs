//! Pure navigation guard
//!
//! All route gating lives here as a pure, synchronous function:
//! `decide(path, session) -> Decision`. No IO, no async, no hidden state —
//! identical inputs always yield identical decisions, and every
//! (path, session) pair yields exactly one decision.

use groundgate_protocol::{Decision, Session};

/// Login root. Reachable logged out; special-cased when logged in.
pub const LOGIN: &str = "/login";
/// GitHub OAuth redirect landing page.
pub const LOGIN_GITHUB: &str = "/login/github";
/// First-login workspace setup screen.
pub const LOGIN_GROUND_INIT: &str = "/login/groundinit";
/// Workspace creation screen for viewers who already have one.
pub const NEW_GROUND: &str = "/newground";

/// Paths reachable without being logged in.
const ALLOW_LIST: [&str; 2] = [LOGIN, LOGIN_GITHUB];

/// Decide what happens for a route request, first match wins.
///
/// Rules, in order:
/// 1. logged out + allow-listed path → render the login screen
/// 2. logged in:
///    a. exact `/login` → redirect to `/{last_workspace}` — intentionally
///       passes the NoWorkspace sentinel through as the literal `null`
///       segment, matching the legacy SPA (kept distinct from 2b pending
///       product clarification)
///    b. `/` → `/login/groundinit` when no workspace yet, else `/{last}`
///    c. `/{workspaceId}/*` and `/newground` → render (the per-workspace
///       gate is a separate layer)
///    d. anything else → render (wildcard fallback; no restriction here)
/// 3. logged out + anything else → redirect to `/login`
pub fn decide(path: &str, session: &Session) -> Decision {
    if !session.logged_in {
        return if ALLOW_LIST.contains(&path) {
            Decision::Render
        } else {
            Decision::redirect(LOGIN)
        };
    }

    if path == LOGIN {
        return Decision::redirect(format!("/{}", session.last_workspace.as_segment()));
    }

    if path == "/" {
        return if session.last_workspace.is_none() {
            Decision::redirect(LOGIN_GROUND_INIT)
        } else {
            Decision::redirect(format!("/{}", session.last_workspace.as_segment()))
        };
    }

    // 2c and 2d both render; the distinction only matters to the
    // per-workspace layer, which is not this guard's concern.
    Decision::Render
}

/// Extract the workspace id from a `/{workspaceId}` or `/{workspaceId}/*`
/// path. Login and workspace-creation routes are not workspace routes.
pub fn workspace_route(path: &str) -> Option<&str> {
    let mut segments = path.strip_prefix('/')?.splitn(2, '/');
    let first = segments.next().filter(|s| !s.is_empty())?;
    if LOGIN.strip_prefix('/') == Some(first) || NEW_GROUND.strip_prefix('/') == Some(first) {
        return None;
    }
    Some(first)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use groundgate_protocol::{Credential, WorkspaceRef};

    fn logged_out() -> Session {
        Session::default()
    }

    fn logged_in(last: WorkspaceRef) -> Session {
        Session {
            logged_in: true,
            last_workspace: last,
            credential: Some(Credential {
                access_token: "access".into(),
                refresh_token: "refresh".into(),
            }),
        }
    }

    #[test]
    fn logged_out_renders_allow_listed_paths() {
        assert_eq!(decide("/login", &logged_out()), Decision::Render);
        assert_eq!(decide("/login/github", &logged_out()), Decision::Render);
    }

    #[test]
    fn logged_out_redirects_everything_else_to_login() {
        for path in ["/", "/anything", "/g7/home", "/newground", "/login/groundinit"] {
            assert_eq!(decide(path, &logged_out()), Decision::redirect("/login"));
        }
    }

    #[test]
    fn logged_in_root_without_workspace_goes_to_setup() {
        let session = logged_in(WorkspaceRef::NoWorkspace);
        assert_eq!(decide("/", &session), Decision::redirect("/login/groundinit"));
    }

    #[test]
    fn logged_in_root_with_workspace_goes_to_it() {
        let session = logged_in(WorkspaceRef::workspace("g7"));
        assert_eq!(decide("/", &session), Decision::redirect("/g7"));
    }

    #[test]
    fn logged_in_login_exact_redirects_to_last_workspace() {
        let session = logged_in(WorkspaceRef::workspace("g7"));
        assert_eq!(decide("/login", &session), Decision::redirect("/g7"));
    }

    #[test]
    fn logged_in_login_exact_passes_no_workspace_sentinel_through() {
        // Legacy quirk preserved: the redirect target is the literal /null.
        let session = logged_in(WorkspaceRef::NoWorkspace);
        assert_eq!(decide("/login", &session), Decision::redirect("/null"));
    }

    #[test]
    fn logged_in_renders_login_github() {
        // The allow-list only restricts logged-out viewers; logged in, the
        // path misses 2a-2b and falls through to render.
        let session = logged_in(WorkspaceRef::workspace("g7"));
        assert_eq!(decide("/login/github", &session), Decision::Render);
    }

    #[test]
    fn logged_in_renders_workspace_and_fallback_routes() {
        let session = logged_in(WorkspaceRef::workspace("g7"));
        for path in ["/g7/home", "/g7", "/newground", "/totally/unknown"] {
            assert_eq!(decide(path, &session), Decision::Render);
        }
    }

    #[test]
    fn decide_is_idempotent() {
        let sessions = [
            logged_out(),
            logged_in(WorkspaceRef::NoWorkspace),
            logged_in(WorkspaceRef::workspace("g7")),
        ];
        for session in &sessions {
            for path in ["/", "/login", "/login/github", "/g7/home", "/x"] {
                assert_eq!(decide(path, session), decide(path, session));
            }
        }
    }

    #[test]
    fn workspace_route_extracts_first_segment() {
        assert_eq!(workspace_route("/g7/home"), Some("g7"));
        assert_eq!(workspace_route("/g7"), Some("g7"));
        assert_eq!(workspace_route("/login/github"), None);
        assert_eq!(workspace_route("/newground"), None);
        assert_eq!(workspace_route("/"), None);
    }
}
