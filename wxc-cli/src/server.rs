//! Push notification endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use wx_component::notify::NotifyParams;
use wx_component::{Component, ComponentError};

/// Body the platform expects once a push is accepted.
const ACK: &str = "success";

pub fn router(component: Component, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/notify", post(notify))
        .with_state(component)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(component: Component, listen: &str, body_limit_bytes: usize) -> anyhow::Result<()> {
    let addr: SocketAddr = listen.parse()?;
    let app = router(component, body_limit_bytes);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Push endpoint listening on POST /notify");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Push endpoint stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn notify(
    State(component): State<Component>,
    Query(params): Query<NotifyParams>,
    body: String,
) -> Response {
    match component.notifications().handle(&params, &body).await {
        Ok(event) => {
            info!(info_type = event.info_type(), "Push accepted");
            (StatusCode::OK, ACK).into_response()
        }
        Err(e) => status_for(&e).into_response(),
    }
}

fn status_for(error: &ComponentError) -> StatusCode {
    match error {
        ComponentError::SignatureMismatch => StatusCode::UNAUTHORIZED,
        e if e.is_integrity_failure() => StatusCode::BAD_REQUEST,
        e => {
            error!(error = %e, "Failed to process push");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
