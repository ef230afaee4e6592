//! Unified error handling for roomd.
//!
//! One taxonomy covers every room operation. Each variant carries a
//! stable `error_code` for metric labeling and maps to exactly one
//! HTTP status, so handlers can bubble errors with `?` and let the
//! `IntoResponse` impl shape the wire reply.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while operating on a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Bad room id or passkey.
    #[error("authentication failed: invalid room or passkey")]
    AuthFailed,

    /// The caller is an active member but presented the wrong session
    /// token. Distinct from `NotActive` so the client can decide
    /// whether to re-join or fail hard.
    #[error("session token mismatch")]
    SessionConflict,

    /// A join attempt for a username that already has a live session,
    /// without a matching token or admin override.
    #[error("username '{0}' has an active session in this room")]
    SessionHeld(String),

    /// The caller is not currently a member of the room.
    #[error("not an active member of this room")]
    NotActive,

    #[error("username '{0}' is banned from this room")]
    Banned(String),

    /// No admin is present and the caller supplied no proof of
    /// identity; an orphaned room does not accept strangers.
    #[error("room entry is restricted: no admin present")]
    EntryRestricted,

    /// Deletion has been scheduled or completed for this room.
    #[error("room is closing")]
    RoomClosing,

    #[error("{0}")]
    Validation(String),

    #[error("message not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),
}

impl RoomError {
    /// Get a static error code string for metrics labeling and for
    /// clients that want to branch on the failure kind.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthFailed => "auth_failed",
            Self::SessionConflict => "session_conflict",
            Self::SessionHeld(_) => "session_held",
            Self::NotActive => "not_active",
            Self::Banned(_) => "banned",
            Self::EntryRestricted => "entry_restricted",
            Self::RoomClosing => "room_closing",
            Self::Validation(_) => "validation",
            Self::NotFound => "not_found",
            Self::Forbidden(_) => "forbidden",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthFailed => StatusCode::FORBIDDEN,
            Self::SessionConflict => StatusCode::UNAUTHORIZED,
            Self::SessionHeld(_) => StatusCode::FORBIDDEN,
            Self::NotActive => StatusCode::UNAUTHORIZED,
            Self::Banned(_) => StatusCode::FORBIDDEN,
            Self::EntryRestricted => StatusCode::FORBIDDEN,
            Self::RoomClosing => StatusCode::GONE,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

/// JSON body sent for every failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    code: &'static str,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            code: self.error_code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Result type for room operations.
pub type RoomResult<T> = Result<T, RoomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(RoomError::AuthFailed.error_code(), "auth_failed");
        assert_eq!(RoomError::SessionConflict.error_code(), "session_conflict");
        assert_eq!(
            RoomError::SessionHeld("alice".into()).error_code(),
            "session_held"
        );
        assert_eq!(RoomError::NotActive.error_code(), "not_active");
        assert_eq!(RoomError::RoomClosing.error_code(), "room_closing");
    }

    #[test]
    fn status_mapping() {
        // /poll distinguishes 401s the client can recover from.
        assert_eq!(RoomError::SessionConflict.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(RoomError::NotActive.status(), StatusCode::UNAUTHORIZED);
        // /join rejects a held identity with 403.
        assert_eq!(
            RoomError::SessionHeld("alice".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(RoomError::RoomClosing.status(), StatusCode::GONE);
        assert_eq!(
            RoomError::Validation("missing field".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RoomError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn banned_message_names_the_user() {
        let err = RoomError::Banned("mallory".into());
        assert!(err.to_string().contains("mallory"));
    }
}
