//! groundgate
//!
//! Navigation guard and first-login bootstrap shell for ground
//! workspaces: rehydrates the persisted session, routes the requested
//! path through the guard, and optionally drives the setup flow when
//! boot lands on the setup screen.

mod guard;
mod logging;
mod remote;
mod session;
mod setup;
mod shell;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::guard::LOGIN_GROUND_INIT;
use crate::remote::HttpRemote;
use crate::session::SessionContext;
use crate::setup::SetupState;
use crate::shell::Shell;
use crate::store::{MemoryStore, SessionStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "groundgate", about = "Navigation shell for ground workspaces")]
struct Cli {
    /// Backend base URL
    #[arg(
        long,
        env = "GROUNDGATE_BACKEND_URL",
        default_value = "http://localhost:8080"
    )]
    backend_url: String,

    /// Session database path (defaults to ~/.groundgate/session.db)
    #[arg(long, env = "GROUNDGATE_SESSION_DB")]
    session_db: Option<PathBuf>,

    /// Keep the session in memory only, never touching disk
    #[arg(long)]
    ephemeral: bool,

    /// Path to navigate to after boot
    #[arg(long, default_value = "/")]
    path: String,

    /// Drive the first-login setup flow when boot lands on it,
    /// provisioning the default candidate
    #[arg(long)]
    auto_provision: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init()?;
    let run_id = std::env::var("GROUNDGATE_RUN_ID")
        .unwrap_or_else(|_| format!("pid-{}", std::process::id()));
    info!(
        component = "main",
        event = "shell.starting",
        run_id = %run_id,
        backend_url = %cli.backend_url,
    );

    let store: Box<dyn SessionStore> = if cli.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        let path = match cli.session_db {
            Some(path) => path,
            None => dirs::home_dir()
                .context("cannot determine home directory for the session db")?
                .join(".groundgate")
                .join("session.db"),
        };
        Box::new(SqliteStore::new(path))
    };

    // Rehydrate before the first guard evaluation; an unreadable store is
    // the same as a logged-out session.
    let session = SessionContext::rehydrate(store).await;
    let remote = Arc::new(HttpRemote::new(cli.backend_url));
    let mut shell = Shell::new(session, remote);

    let landed = shell.navigate_to(&cli.path).to_string();
    println!("{landed}");

    if cli.auto_provision && landed == LOGIN_GROUND_INIT {
        shell.run_setup().await;
        if matches!(shell.setup_state(), SetupState::AwaitingSelection { .. }) {
            shell.create_selected().await;
        }
        println!("{}", shell.current_path());
    }

    info!(
        component = "main",
        event = "shell.finished",
        path = %shell.current_path(),
    );
    Ok(())
}
