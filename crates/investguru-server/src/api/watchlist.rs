use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task;

use crate::{auth::CurrentUser, error::ApiResult, main_lib::AppState};

#[derive(Debug, Deserialize)]
pub struct WatchlistAdd {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct WatchlistOut {
    pub id: i64,
    pub symbol: String,
}

pub async fn add_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<WatchlistAdd>,
) -> ApiResult<Json<Value>> {
    let store = state.store.clone();
    let item = task::spawn_blocking(move || store.add_watchlist_item(user.id, &body.symbol)).await??;
    Ok(Json(json!({ "ok": true, "symbol": item.symbol })))
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<WatchlistOut>>> {
    let store = state.store.clone();
    let items = task::spawn_blocking(move || store.list_watchlist(user.id)).await??;
    Ok(Json(
        items
            .into_iter()
            .map(|item| WatchlistOut {
                id: item.id,
                symbol: item.symbol,
            })
            .collect(),
    ))
}

pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let store = state.store.clone();
    task::spawn_blocking(move || store.remove_watchlist_item(user.id, item_id)).await??;
    Ok(Json(json!({ "ok": true })))
}
