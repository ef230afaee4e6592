//! HTTP endpoint handlers.
//!
//! One file per endpoint. Each handler performs a single atomic
//! mutation against one room under its lock, requests a persistence
//! flush, and maps domain errors straight onto the wire via
//! `RoomError: IntoResponse`.

pub mod admin;
pub mod clear;
pub mod delete_message;
pub mod edit;
pub mod join;
pub mod leave;
pub mod pin;
pub mod poll;
pub mod rooms;
pub mod send;

use serde::Serialize;

use crate::error::{RoomError, RoomResult};

/// Minimal success body for endpoints with nothing else to say.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> axum::Json<Self> {
        axum::Json(Self { success: true })
    }
}

/// Reject a blank required field: 400 with the field named.
pub(crate) fn require(field: &'static str, value: &str) -> RoomResult<()> {
    if value.trim().is_empty() {
        return Err(RoomError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Treat an absent or empty optional field as not supplied.
pub(crate) fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Label the failure for metrics on its way out.
pub(crate) fn reject(endpoint: &'static str, err: RoomError) -> RoomError {
    crate::metrics::record_request_error(endpoint, err.error_code());
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_empty_and_blank() {
        assert!(require("roomId", "demo").is_ok());
        assert!(require("roomId", "").is_err());
        assert!(require("roomId", "   ").is_err());
    }

    #[test]
    fn optional_filters_empty_strings() {
        assert_eq!(optional(&Some("tok".into())), Some("tok"));
        assert_eq!(optional(&Some(String::new())), None);
        assert_eq!(optional(&None), None);
    }
}
