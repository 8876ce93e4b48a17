//! Backend wire format
//!
//! Every backend endpoint wraps its payload in the same JSON envelope
//! (`{ code, message, data }`). Transport-level failures never reach these
//! types; the remote client maps HTTP status codes before decoding.

use serde::{Deserialize, Serialize};

/// The backend's uniform response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, treating a missing `data` as a malformed reply.
    pub fn into_data(self) -> Result<T, String> {
        match self.data {
            Some(data) => Ok(data),
            None => Err(format!(
                "envelope code {} carried no data: {}",
                self.code, self.message
            )),
        }
    }
}
