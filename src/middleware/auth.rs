use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Authenticated owner identity, as established by the product's upstream
/// auth layer and forwarded in the `x-user-id` header. Guests never carry
/// this; their capability token is their only credential.
pub struct OwnerId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".into()))?;

        let user_id = Uuid::parse_str(header)
            .map_err(|_| AppError::Unauthorized("Invalid x-user-id header".into()))?;

        Ok(OwnerId(user_id))
    }
}
