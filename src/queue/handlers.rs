use super::broker::{InMemoryBroker, MessageBroker};
use super::protocol::*;

use axum::{Extension, Json, Router, http::StatusCode, routing::post};
use std::sync::Arc;
use std::time::Duration;

/// Routes of the `broker` subcommand.
pub fn broker_router(broker: Arc<InMemoryBroker>) -> Router {
    Router::new()
        .route(ENDPOINT_PUBLISH, post(handle_publish))
        .route(ENDPOINT_CONSUME, post(handle_consume))
        .route(ENDPOINT_POLL, post(handle_poll))
        .layer(Extension(broker))
}

pub async fn handle_publish(
    Extension(broker): Extension<Arc<InMemoryBroker>>,
    Json(req): Json<PublishRequest>,
) -> (StatusCode, Json<PublishResponse>) {
    match broker.publish(&req.topic, req.key, req.value).await {
        Ok(offset) => (StatusCode::OK, Json(PublishResponse { offset: Some(offset) })),
        Err(e) => {
            tracing::error!("Failed to publish on {}: {}", req.topic, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PublishResponse { offset: None }),
            )
        }
    }
}

pub async fn handle_consume(
    Extension(broker): Extension<Arc<InMemoryBroker>>,
    Json(req): Json<ConsumeRequest>,
) -> (StatusCode, Json<ConsumeResponse>) {
    match broker
        .consume_one(&req.topic, Duration::from_millis(req.timeout_ms))
        .await
    {
        Ok(record) => (StatusCode::OK, Json(ConsumeResponse { record })),
        Err(e) => {
            tracing::error!("Failed to consume from {}: {}", req.topic, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ConsumeResponse { record: None }),
            )
        }
    }
}

pub async fn handle_poll(
    Extension(broker): Extension<Arc<InMemoryBroker>>,
    Json(req): Json<PollRequest>,
) -> (StatusCode, Json<PollResponse>) {
    match broker
        .poll(&req.topics, &req.group, Duration::from_millis(req.timeout_ms))
        .await
    {
        Ok(records) => {
            if !records.is_empty() {
                tracing::debug!("Group {} polled {} records", req.group, records.len());
            }
            (StatusCode::OK, Json(PollResponse { records }))
        }
        Err(e) => {
            tracing::error!("Failed to poll {:?}: {}", req.topics, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PollResponse { records: vec![] }),
            )
        }
    }
}
