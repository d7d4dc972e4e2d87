use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use investguru_core::QuoteRecord;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

/// No-data and provider outages both surface as 404 here; the distinction
/// is only logged.
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<QuoteRecord>> {
    match state.resolver.resolve(&symbol).await {
        Ok(quote) => Ok(Json(quote)),
        Err(unresolved) => {
            if !unresolved.failures().is_empty() {
                tracing::warn!(
                    symbol = %symbol,
                    failures = unresolved.failures().len(),
                    "quote unresolved with provider errors"
                );
            }
            Err(ApiError::NotFound(unresolved.to_string()))
        }
    }
}
