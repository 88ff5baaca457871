//! Tower middleware that opens an attribution scope per request.
//!
//! [`AttributionLayer`] wraps an inner service in an
//! [`AttributionService`]. For every request the service resolves the
//! client address (forwarded-for chain over socket peer), picks up or
//! generates a request id, plants an empty [`ActorCell`] in the
//! request extensions for authentication code to fill, and runs the
//! rest of the request inside [`context::scope`]. The scope ends with
//! the response future, on success and failure alike.
//!
//! The layer must sit *outside* authentication middleware, so that
//! auth code runs within the scope and can call
//! [`context::record_actor`] (or fill the [`ActorCell`] it finds in
//! the extensions).

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use tokio::task::futures::TaskLocalFuture;
use tower::{Layer, Service};

use crate::actor::ActorCell;
use crate::addr;
use crate::config::{self, AttributionConfig};
use crate::context::{self, Attribution};
use crate::error::BylineError;

/// Tower layer producing [`AttributionService`].
#[derive(Clone, Debug, Default)]
pub struct AttributionLayer {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    forwarded_header: HeaderName,
    request_id_header: HeaderName,
    trust_forwarded: bool,
    collect_remote_addr: bool,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            forwarded_header: HeaderName::from_static(config::DEFAULT_FORWARDED_HEADER),
            request_id_header: HeaderName::from_static(config::DEFAULT_REQUEST_ID_HEADER),
            trust_forwarded: true,
            collect_remote_addr: true,
        }
    }
}

impl AttributionLayer {
    /// Build a layer from configuration.
    ///
    /// Header names are validated here once so the per-request path
    /// never parses them.
    pub fn new(config: AttributionConfig) -> Result<Self, BylineError> {
        let forwarded_header = parse_header(&config.forwarded_header, "forwarded_header")?;
        let request_id_header = parse_header(&config.request_id_header, "request_id_header")?;

        Ok(Self {
            shared: Arc::new(Shared {
                forwarded_header,
                request_id_header,
                trust_forwarded: config.trust_forwarded,
                collect_remote_addr: config.collect_remote_addr,
            }),
        })
    }
}

fn parse_header(name: &str, field: &'static str) -> Result<HeaderName, BylineError> {
    name.parse::<HeaderName>()
        .map_err(|source| BylineError::InvalidHeaderName {
            field,
            name: name.to_string(),
            source,
        })
}

impl<S> Layer<S> for AttributionLayer {
    type Service = AttributionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AttributionService {
            inner,
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Service produced by [`AttributionLayer`].
#[derive(Clone, Debug)]
pub struct AttributionService<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S, B> Service<Request<B>> for AttributionService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = TaskLocalFuture<Attribution, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let remote_addr = if self.shared.collect_remote_addr {
            // Populated by axum's into_make_service_with_connect_info;
            // absent in plain tower stacks and some tests.
            let peer = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0);
            addr::client_addr(
                req.headers(),
                peer,
                &self.shared.forwarded_header,
                self.shared.trust_forwarded,
            )
        } else {
            None
        };

        let request_id = req
            .headers()
            .get(&self.shared.request_id_header)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

        let cell = ActorCell::new();
        req.extensions_mut().insert(cell.clone());

        let attribution = Attribution::new(request_id)
            .with_remote_addr(remote_addr)
            .with_actor_cell(cell);

        tracing::debug!(
            request_id = %attribution.request_id(),
            remote_addr = attribution.remote_addr().unwrap_or("-"),
            "attribution scope opened"
        );

        context::scope(attribution, self.inner.call(req))
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use tower::ServiceExt;

    use super::*;

    fn request() -> Request<()> {
        Request::builder().body(()).unwrap()
    }

    async fn snapshot(_req: Request<()>) -> Result<(Option<String>, Option<String>), Infallible> {
        Ok((context::current_request_id(), context::current_remote_addr()))
    }

    #[tokio::test]
    async fn opens_scope_around_inner_service() {
        let svc = AttributionLayer::default().layer(tower::service_fn(snapshot));
        let req = Request::builder()
            .header("x-request-id", "req-7")
            .header("x-forwarded-for", "203.0.113.9:4711")
            .body(())
            .unwrap();

        let (id, addr) = svc.oneshot(req).await.unwrap();
        assert_eq!(id.as_deref(), Some("req-7"));
        assert_eq!(addr.as_deref(), Some("203.0.113.9"));
        assert!(context::current().is_none());
    }

    #[tokio::test]
    async fn generates_request_id_when_header_is_missing() {
        let svc = AttributionLayer::default().layer(tower::service_fn(snapshot));
        let (id, _) = svc.oneshot(request()).await.unwrap();
        assert!(!id.expect("scope active inside the service").is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_peer_address() {
        let svc = AttributionLayer::default().layer(tower::service_fn(snapshot));
        let mut req = request();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 1, 2, 3], 9000))));

        let (_, addr) = svc.oneshot(req).await.unwrap();
        assert_eq!(addr.as_deref(), Some("10.1.2.3"));
    }

    #[tokio::test]
    async fn inserts_actor_cell_into_extensions() {
        let svc =
            AttributionLayer::default().layer(tower::service_fn(|req: Request<()>| async move {
                Ok::<_, Infallible>(req.extensions().get::<ActorCell>().is_some())
            }));
        assert!(svc.oneshot(request()).await.unwrap());
    }

    #[tokio::test]
    async fn untrusted_forwarded_header_is_ignored() {
        let config = AttributionConfig {
            trust_forwarded: false,
            ..AttributionConfig::default()
        };
        let svc = AttributionLayer::new(config)
            .unwrap()
            .layer(tower::service_fn(snapshot));
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();

        let (_, addr) = svc.oneshot(req).await.unwrap();
        assert_eq!(addr, None);
    }

    #[tokio::test]
    async fn address_collection_can_be_disabled() {
        let config = AttributionConfig {
            collect_remote_addr: false,
            ..AttributionConfig::default()
        };
        let svc = AttributionLayer::new(config)
            .unwrap()
            .layer(tower::service_fn(snapshot));
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 1, 2, 3], 9000))));

        let (_, addr) = svc.oneshot(req).await.unwrap();
        assert_eq!(addr, None);
    }

    #[test]
    fn rejects_invalid_header_names() {
        let config = AttributionConfig {
            forwarded_header: "not a header".into(),
            ..AttributionConfig::default()
        };
        assert!(AttributionLayer::new(config).is_err());
    }
}
