//! HTTP endpoint of a node: `POST /order` and `GET /order/status/{id}`.
//!
//! A plain status request is answered through [`QueryRouter::status_of`], so any node can
//! be asked about any order. A request carrying [`FORWARDED_HEADER`] was already
//! routed by a peer and is answered from the local shard only.

use super::{QueryError, QueryRouter};
use crate::log::LogError;
use crate::model::{Order, OrderId, OrderRequest, OrderStatus};
use crate::submitter::{OrderSubmitter, SubmitError};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Marks a query forwarded by a peer.
pub const FORWARDED_HEADER: &str = "x-order-forwarded";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Handles shared by every request.
#[derive(Clone)]
pub struct ApiState {
    pub query: Arc<QueryRouter>,
    pub submitter: OrderSubmitter,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/order", post(place_order))
        .route("/order/status/{id}", get(order_status))
        .with_state(state)
}

/// Serves the endpoint until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Node endpoint listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!(%addr, "Node endpoint stopped");
    Ok(())
}

async fn place_order(
    State(state): State<ApiState>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Order>), SubmitError> {
    let order = state.submitter.submit(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn order_status(
    State(ApiState { query, .. }): State<ApiState>,
    Path(id): Path<OrderId>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, QueryError> {
    let status = if headers.contains_key(FORWARDED_HEADER) {
        debug!(order_id = %id, "Forwarded status query");
        query.local_status(id).await?
    } else {
        query.status_of(id).await?
    };
    Ok(Json(StatusResponse {
        order_id: id,
        status,
    }))
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueryError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            QueryError::NotOwner { .. } => StatusCode::MISDIRECTED_REQUEST,
            QueryError::ShardUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::Transport { .. } | QueryError::UnexpectedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            QueryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            QueryError::Cancelled | QueryError::Client(_) | QueryError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let status = match &self {
            SubmitError::Append(LogError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            SubmitError::Append(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
