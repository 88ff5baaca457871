//! Minimal gateway showing the attribution layer wired into an axum
//! app, with a stand-in auth layer that fills the actor cell.
//!
//! ```text
//! cargo run --example gateway
//! curl localhost:3000/whoami
//! curl -H 'authorization: Bearer alice' \
//!      -H 'x-forwarded-for: 203.0.113.9:4711' localhost:3000/whoami
//! ```

use std::net::SocketAddr;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use byline::{context, Actor, AttributionLayer};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

async fn whoami() -> Json<Value> {
    Json(json!({
        "request_id": context::current_request_id(),
        "remote_addr": context::current_remote_addr(),
        "actor": context::current_actor().map(|a| a.to_string()),
    }))
}

/// Trusts `authorization: Bearer <id>` as-is. A real deployment would
/// verify a session or token here before recording the actor.
async fn bearer_auth(request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    if let Some(id) = token {
        context::record_actor(Actor::new(id));
    }

    next.run(request).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::filter::Targets::new().with_default(tracing::Level::DEBUG);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().pretty())
        .init();

    let app = Router::new()
        .route("/whoami", get(whoami))
        .layer(middleware::from_fn(bearer_auth))
        .layer(AttributionLayer::default())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = "0.0.0.0:3000".parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "gateway started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("gateway stopped");
    Ok(())
}
