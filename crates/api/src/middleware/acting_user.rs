//! Acting-user extractor.
//!
//! The API carries no authentication. Mutating routes take the caller's
//! opaque user id from the `X-User-Id` header and stamp it on every row
//! they write.

use axum::{extract::FromRequestParts, http::request::Parts};

use bukubesar_shared::types::UserId;

use crate::ApiError;

/// Header carrying the acting user's UUID.
pub const USER_HEADER: &str = "x-user-id";

/// The user on whose behalf a mutating request runs.
///
/// ```ignore
/// async fn handler(user: ActingUser) -> impl IntoResponse {
///     let posted_by = user.id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ActingUser(pub UserId);

impl ActingUser {
    /// Returns the user ID.
    #[must_use]
    pub const fn id(self) -> UserId {
        self.0
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_HEADER) else {
            return Err(ApiError::validation(
                "MISSING_ACTING_USER",
                "X-User-Id header is required",
            ));
        };

        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<UserId>().ok())
            .map(ActingUser)
            .ok_or_else(|| ApiError::validation("INVALID_ACTING_USER", "X-User-Id must be a UUID"))
    }
}
