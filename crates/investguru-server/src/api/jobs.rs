use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    jobs::JobSnapshot,
    main_lib::AppState,
};

#[derive(Debug, Deserialize)]
pub struct QuoteJobRequest {
    pub symbol: String,
}

pub async fn enqueue_quote(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QuoteJobRequest>,
) -> ApiResult<Json<Value>> {
    let job_id = state
        .jobs
        .enqueue(body.symbol)
        .await
        .map_err(|err| ApiError::ServiceUnavailable(format!("Unable to queue job: {err}")))?;
    Ok(Json(json!({ "job_id": job_id })))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    let not_found = || ApiError::NotFound(String::from("Job not found"));
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    state.jobs.get(&id).await.map(Json).ok_or_else(not_found)
}
