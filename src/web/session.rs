use crate::db;
use crate::domain::models::Role;
use crate::web::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct SessionClaims {
    pub employee_id: i64,
    pub role: Role,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
    #[error("bad role")]
    Role,
}

pub fn sign_session(employee_id: i64, role: Role, key: &[u8]) -> Result<String, SessionError> {
    let exp = Utc::now() + Duration::hours(24);
    let payload = format!("{}|{}|{}", employee_id, role_string(role), exp.timestamp());
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::STANDARD.encode(payload.as_bytes()),
        general_purpose::STANDARD.encode(sig)
    ))
}

pub fn verify_session(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(SessionError::Invalid);
    }
    let payload_bytes = general_purpose::STANDARD
        .decode(parts[0])
        .map_err(|_| SessionError::Invalid)?;
    let sig_bytes = general_purpose::STANDARD
        .decode(parts[1])
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| SessionError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Invalid)?;
    let pieces: Vec<&str> = payload.split('|').collect();
    if pieces.len() != 3 {
        return Err(SessionError::Invalid);
    }
    let employee_id: i64 = pieces[0].parse().map_err(|_| SessionError::Invalid)?;
    let role = parse_role(pieces[1])?;
    let exp: i64 = pieces[2].parse().map_err(|_| SessionError::Invalid)?;
    if Utc::now().timestamp() > exp {
        return Err(SessionError::Expired);
    }
    Ok(SessionClaims {
        employee_id,
        role,
        exp,
    })
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(val) = auth.to_str() {
            if let Some(bearer) = val.strip_prefix("Bearer ") {
                return Some(bearer.trim().to_string());
            }
        }
    }
    if let Some(cookie) = headers.get(axum::http::header::COOKIE) {
        if let Ok(val) = cookie.to_str() {
            for pair in val.split(';') {
                let trimmed = pair.trim();
                if let Some(rest) = trimmed.strip_prefix("session=") {
                    return Some(rest.to_string());
                }
            }
        }
    }
    None
}

fn role_string(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Employee => "employee",
        Role::None => "none",
    }
}

fn parse_role(raw: &str) -> Result<Role, SessionError> {
    match raw {
        "admin" => Ok(Role::Admin),
        "employee" => Ok(Role::Employee),
        "none" => Ok(Role::None),
        _ => Err(SessionError::Role),
    }
}

/// Axum extractor that validates the session and yields the employee id.
pub struct UserSession(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for UserSession
where
    S: Send + Sync,
    crate::state::SharedState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared_state = crate::state::SharedState::from_ref(state);

        let token = extract_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        let claims = verify_session(&token, &shared_state.session_key).map_err(|e| {
            tracing::warn!("Session verification failed: {}", e);
            ApiError::Unauthorized
        })?;

        let employee = db::find_employee_by_id(&shared_state.pool, claims.employee_id)
            .await
            .map_err(|e| {
                tracing::warn!("Employee lookup failed for session: {}", e);
                ApiError::Unauthorized
            })?;

        let Some(employee) = employee else {
            return Err(ApiError::Unauthorized);
        };

        if employee.role == Role::None {
            return Err(ApiError::Unauthorized);
        }

        Ok(UserSession(claims.employee_id))
    }
}

/// Load the requesting employee and require the admin role.
pub async fn require_admin(
    state: &crate::state::SharedState,
    employee_id: i64,
) -> Result<crate::domain::models::Employee, ApiError> {
    let employee = db::find_employee_by_id(&state.pool, employee_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if employee.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    Ok(employee)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let key = b"test-session-key";
        let token = sign_session(42, Role::Admin, key).unwrap();
        let claims = verify_session(&token, key).unwrap();
        assert_eq!(claims.employee_id, 42);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let key = b"test-session-key";
        let token = sign_session(42, Role::Employee, key).unwrap();

        let mut tampered = token.clone();
        tampered.insert(3, 'x');
        assert!(verify_session(&tampered, key).is_err());

        assert!(matches!(
            verify_session(&token, b"other-key"),
            Err(SessionError::Signature)
        ));
    }
}
