//! Request principal extraction.
//!
//! Development: the actor is read from `x-user-id`, `x-hub-id`, and `x-role`
//! headers set by the gateway. Production: replace with JWT validation at the
//! gateway, which injects the same headers after verifying the token.

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use mediaplan_core::types::{Actor, Role};
use uuid::Uuid;

use crate::rest::ErrorResponse;

type AuthError = (StatusCode, Json<ErrorResponse>);

fn unauthorized(message: &str) -> AuthError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "unauthorized".to_string(),
            message: message.to_string(),
        }),
    )
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Uuid, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| unauthorized(&format!("missing or invalid {name} header")))
}

/// Resolve the acting principal from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AuthError> {
    let user_id = header_uuid(headers, "x-user-id")?;
    let hub_id = header_uuid(headers, "x-hub-id")?;
    let role = match headers.get("x-role").and_then(|v| v.to_str().ok()) {
        Some("hub_admin") => Role::HubAdmin,
        Some("advertiser") => Role::Advertiser,
        Some("publisher") => Role::Publisher,
        _ => return Err(unauthorized("missing or invalid x-role header")),
    };
    Ok(Actor {
        user_id,
        hub_id,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(role: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            "x-user-id",
            HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
        );
        h.insert(
            "x-hub-id",
            HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
        );
        h.insert("x-role", HeaderValue::from_str(role).unwrap());
        h
    }

    #[test]
    fn valid_headers_resolve() {
        let actor = actor_from_headers(&headers("hub_admin")).unwrap();
        assert!(actor.is_hub_admin());
    }

    #[test]
    fn unknown_role_rejected() {
        assert!(actor_from_headers(&headers("intern")).is_err());
    }

    #[test]
    fn missing_headers_rejected() {
        assert!(actor_from_headers(&HeaderMap::new()).is_err());
    }
}
