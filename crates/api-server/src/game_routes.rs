//! Game API Routes
//!
//! Endpoints for product info and duel sessions.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use duel_core::{ContractKind, ContractMetadata};
use duel_engine::{ContestResult, GameSession, SessionView};
use serde::Deserialize;
use uuid::Uuid;

use crate::{duel_err, session_err, Action, ApiResponse, AppError, AppState};

#[cfg(test)]
#[path = "game_routes_tests.rs"]
mod game_routes_tests;

/// Query for starting a session
#[derive(Deserialize)]
pub struct StartQuery {
    pub product: String,
}

pub fn game_routes() -> Router<AppState> {
    Router::new()
        .route("/api/game/info", get(game_info))
        .route("/api/game/start", post(start_session))
        .route("/api/game/session/:id", get(get_session))
        .route("/api/game/session/:id/hold", post(hold))
        .route("/api/game/session/:id/exercise", post(exercise))
        .route("/api/game/session/:id/abandon", post(abandon))
        .route("/api/game/session/:id/result", get(get_result))
}

/// Metadata of every playable product, keyed by product id
async fn game_info(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HashMap<String, ContractMetadata>>>, AppError> {
    let products = state
        .provider
        .products()
        .into_iter()
        .map(|m| (m.kind.id().to_string(), m))
        .collect();

    Ok(Json(ApiResponse::success(products)))
}

/// Build a bundle for the product and start a session on it
async fn start_session(
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let kind: ContractKind = query.product.parse().map_err(duel_err)?;

    let bundle = state.provider.next_bundle(kind).await.map_err(duel_err)?;
    let session = GameSession::new(bundle, state.config.timing).map_err(duel_err)?;
    let view = state.registry.start(session).map_err(session_err)?;

    Ok(Json(ApiResponse::success(view)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let view = state.registry.view(id).await.map_err(session_err)?;
    Ok(Json(ApiResponse::success(view)))
}

async fn hold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    act(&state, id, Action::Hold).await
}

async fn exercise(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    act(&state, id, Action::Exercise).await
}

/// Reset before termination; cancels any pending reveal
async fn abandon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    act(&state, id, Action::Abandon).await
}

async fn act(
    state: &AppState,
    id: Uuid,
    action: Action,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let view = state.registry.act(id, action).await.map_err(session_err)?;
    Ok(Json(ApiResponse::success(view)))
}

/// Final comparison, available once the session has terminated
async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ContestResult>>, AppError> {
    let view = state.registry.view(id).await.map_err(session_err)?;
    let result = view.result.ok_or_else(|| {
        AppError::with_status(
            StatusCode::CONFLICT,
            anyhow::anyhow!("Session {} has not terminated ({})", id, view.phase),
        )
    })?;

    Ok(Json(ApiResponse::success(result)))
}
