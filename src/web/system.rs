//! System-ops surface: health/status, process restart, database backup
//! and restore. Backup shells out to pg_dump and streams the dump back
//! as a .sql attachment; restore pipes an uploaded dump into psql.

use crate::state::SharedState;
use crate::web::error::{ok, ApiError, ApiResult, Empty};
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub uptime_seconds: i64,
    pub database: &'static str,
    pub version: &'static str,
    pub now: chrono::DateTime<Utc>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/restart", post(restart))
        .route("/backup", post(backup))
        .route("/restore", post(restore))
        .with_state(state)
}

async fn status(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<SystemStatus> {
    require_admin(&state, employee_id).await?;

    let database = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
    {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            "error"
        }
    };

    Ok(ok(SystemStatus {
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        database,
        version: env!("CARGO_PKG_VERSION"),
        now: Utc::now(),
    }))
}

/// Fire-and-forget: confirm to the client, then exit and let the process
/// manager bring the service back.
async fn restart(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    tracing::warn!("Restart requested by employee {}", employee_id);
    tokio::spawn(async {
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        std::process::exit(0);
    });

    Ok(ok(Empty {}))
}

async fn backup(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, employee_id).await?;

    let output = Command::new("pg_dump")
        .arg("--dbname")
        .arg(&state.database_url)
        .arg("--no-owner")
        .output()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to run pg_dump: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!("pg_dump failed: {}", stderr);
        return Err(ApiError::Internal(anyhow::anyhow!(
            "pg_dump exited with {}",
            output.status
        )));
    }

    let filename = format!("backup_{}.sql", Utc::now().format("%Y%m%d_%H%M%S"));
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        "application/sql"
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid header: {e}")))?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\"")
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid header: {e}")))?,
    );

    tracing::info!("Backup created ({} bytes)", output.stdout.len());
    Ok((headers, output.stdout))
}

async fn restore(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> ApiResult<Empty> {
    require_admin(&state, employee_id).await?;

    let mut dump: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("アップロードの読み込みに失敗しました: {e}")))?
    {
        if field.name() == Some("file") || dump.is_none() {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("ファイルの読み込みに失敗しました: {e}")))?;
            dump = Some(bytes.to_vec());
        }
    }

    let dump = dump.filter(|d| !d.is_empty()).ok_or_else(|| {
        ApiError::BadRequest("リストアするSQLファイルを指定してください".to_string())
    })?;

    let mut child = Command::new("psql")
        .arg("--dbname")
        .arg(&state.database_url)
        .arg("--quiet")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to run psql: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(&dump)
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to feed psql: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("psql did not finish: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!("Restore failed: {}", stderr);
        return Err(ApiError::Internal(anyhow::anyhow!(
            "psql exited with {}",
            output.status
        )));
    }

    tracing::warn!("Database restored from upload by employee {}", employee_id);
    Ok(ok(Empty {}))
}
