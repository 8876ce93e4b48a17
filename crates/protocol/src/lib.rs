//! Groundgate Protocol
//!
//! Shared types for the navigation shell and the backend wire format.
//! Session state is serialized as JSON into the local store; wire types
//! mirror the backend's response envelope.

use uuid::Uuid;

// Re-exports
pub mod types;
pub mod wire;

pub use types::*;
pub use wire::Envelope;

/// Generate a new unique ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
