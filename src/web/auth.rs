use crate::db;
use crate::domain::models::Role;
use crate::state::SharedState;
use crate::web::error::{ok, ApiError, Envelope};
use crate::web::session::{self, UserSession};
use argon2::{password_hash::PasswordHash, Argon2, PasswordVerifier};
use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: SessionUser,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

async fn login(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ip = addr.ip().to_string();
    if !state.login_limiter.check(&ip).await {
        tracing::warn!("Login rate limit exceeded for IP: {}", ip);
        return Err(ApiError::TooManyRequests);
    }

    let email = payload.email.trim().to_lowercase();
    let employee = db::find_employee_by_email(&state.pool, &email).await?;

    let Some(employee) = employee else {
        db::record_login_log(&state.pool, None, &email, &ip, false).await?;
        return Err(ApiError::Unauthorized);
    };

    if employee.role == Role::None {
        db::record_login_log(&state.pool, Some(employee.id), &email, &ip, false).await?;
        return Err(ApiError::Forbidden);
    }

    let verified = PasswordHash::new(&employee.hash)
        .ok()
        .map(|parsed| {
            Argon2::default()
                .verify_password(payload.password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false);

    db::record_login_log(&state.pool, Some(employee.id), &email, &ip, verified).await?;
    if !verified {
        return Err(ApiError::Unauthorized);
    }

    let token = session::sign_session(employee.id, employee.role, &state.session_key)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to sign session: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        format!("session={token}; HttpOnly; SameSite=Lax; Path=/")
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid cookie header: {e}")))?,
    );

    let body = ok(LoginResponse {
        user: SessionUser {
            id: employee.id,
            name: employee.name,
            email: employee.email,
            role: employee.role,
        },
    });

    Ok((headers, body))
}

async fn logout() -> Result<impl IntoResponse, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        "session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid cookie header: {e}")))?,
    );
    Ok((headers, crate::web::error::ok_empty()))
}

async fn me(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<Envelope<LoginResponse>>, ApiError> {
    let employee = db::find_employee_by_id(&state.pool, employee_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(ok(LoginResponse {
        user: SessionUser {
            id: employee.id,
            name: employee.name,
            email: employee.email,
            role: employee.role,
        },
    }))
}
