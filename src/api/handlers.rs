//! API request handlers

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;
use tracing::info;

use crate::api::types::ErrorDetail;
use crate::api::types::HealthResponse;
use crate::api::types::QueryRequest;
use crate::rag::RagAnswer;
use crate::rag::RecipeResponse;
use crate::rag::RecipeService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recipe_service: Arc<RecipeService>,
}

type ApiError = (StatusCode, Json<ErrorDetail>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(ErrorDetail::new(detail)))
}

/// Health check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Structured recipe search
///
/// Blank queries are a 400, no candidates under the threshold is the sole
/// 404 path (its message echoes the query), and transport failures are a
/// 500 with a generic message — internal error text never reaches the
/// structured surface.
pub async fn search_recipe(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<RecipeResponse>, ApiError> {
    info!("POST /api/search: {}", req.query);

    if req.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "搜索词不能为空"));
    }

    match state.recipe_service.search(&req.query).await {
        Ok(Some(response)) => Ok(Json(response)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("抱歉，暂未收录关于“{}”的菜谱，请尝试其他关键词。", req.query),
        )),
        Err(e) => {
            error!("Error processing search: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "服务器内部错误，请稍后再试。",
            ))
        }
    }
}

/// Free-text answer with sources
pub async fn answer_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<RagAnswer>, ApiError> {
    info!("POST /api/answer: {}", req.query);

    if req.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "搜索词不能为空"));
    }

    match state.recipe_service.answer(&req.query).await {
        Ok(answer) => Ok(Json(answer)),
        Err(e) => {
            error!("Error processing answer: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "服务器内部错误，请稍后再试。",
            ))
        }
    }
}
