use crate::db;
use crate::domain::models::LoginLog;
use crate::state::SharedState;
use crate::web::error::{ok, ApiResult};
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct LoginLogList {
    pub logs: Vec<LoginLog>,
}

#[derive(Serialize)]
pub struct DeleteResult {
    pub deleted: u64,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).delete(remove))
        .with_state(state)
}

async fn list(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<LoginLogList> {
    require_admin(&state, employee_id).await?;
    let logs = db::list_login_logs(&state.pool, range.start_date, range.end_date).await?;
    Ok(ok(LoginLogList { logs }))
}

async fn remove(
    UserSession(employee_id): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<DeleteResult> {
    require_admin(&state, employee_id).await?;
    let deleted = db::delete_login_logs(&state.pool, range.start_date, range.end_date).await?;
    tracing::info!("Deleted {} login log rows", deleted);
    Ok(ok(DeleteResult { deleted }))
}
