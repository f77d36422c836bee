//! Single-origin reverse proxy.
//!
//! `/api` and everything under `/api/` goes to the backend, all other paths
//! go to the frontend dev server. Upstream ports are read per request, so a
//! backend that moved to a new port is picked up immediately. Upgrade
//! requests (the bundler's HMR websocket) are tunneled byte for byte.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use super::state::PortAssignment;
use super::Shutdown;
use crate::error::DevError;

/// Grace period for in-flight requests when the proxy stops.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Where a request is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Frontend,
    Backend,
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Upstream::Frontend => f.write_str("frontend"),
            Upstream::Backend => f.write_str("backend"),
        }
    }
}

/// Route by path only: `/api` and `/api/...` are backend paths.
pub fn route_target(path: &str) -> Upstream {
    if path == "/api" || path.starts_with("/api/") {
        Upstream::Backend
    } else {
        Upstream::Frontend
    }
}

/// Whether the request asks for a protocol upgrade.
pub fn is_upgrade(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    connection_upgrade && headers.contains_key(header::UPGRADE)
}

struct ProxyState {
    ports: Arc<PortAssignment>,
    client: Client<HttpConnector, Body>,
    shutdown: Shutdown,
}

/// Build the proxy router.
pub fn router(ports: Arc<PortAssignment>, shutdown: Shutdown) -> Router {
    let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    let state = Arc::new(ProxyState {
        ports,
        client,
        shutdown,
    });

    Router::new()
        .fallback(forward)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn forward(State(proxy): State<Arc<ProxyState>>, mut req: Request) -> Response {
    let upstream = route_target(req.uri().path());
    let port = match upstream {
        Upstream::Backend => proxy.ports.backend(),
        Upstream::Frontend => proxy.ports.frontend(),
    };

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri: Uri = match format!("http://localhost:{port}{path_and_query}").parse() {
        Ok(uri) => uri,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid request uri: {e}")).into_response(),
    };
    *req.uri_mut() = uri;

    let client_upgrade = is_upgrade(req.headers()).then(|| hyper::upgrade::on(&mut req));

    match proxy.client.request(req).await {
        Ok(mut response) => {
            if let Some(client_upgrade) = client_upgrade {
                if response.status() == StatusCode::SWITCHING_PROTOCOLS {
                    let upstream_upgrade = hyper::upgrade::on(&mut response);
                    tokio::spawn(tunnel(client_upgrade, upstream_upgrade, proxy.shutdown.clone()));
                }
            }
            response.into_response()
        }
        Err(e) => {
            tracing::debug!(%upstream, port, error = %e, "upstream request failed");
            (
                StatusCode::BAD_GATEWAY,
                format!("{upstream} on port {port} is not reachable: {e}"),
            )
                .into_response()
        }
    }
}

async fn tunnel(client: hyper::upgrade::OnUpgrade, upstream: hyper::upgrade::OnUpgrade, shutdown: Shutdown) {
    let (client, upstream) = match tokio::try_join!(client, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::debug!(error = %e, "upgrade failed");
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut upstream = TokioIo::new(upstream);
    tokio::select! {
        result = tokio::io::copy_bidirectional(&mut client, &mut upstream) => {
            if let Err(e) = result {
                tracing::debug!(error = %e, "tunnel closed");
            }
        }
        _ = shutdown.wait() => {}
    }
}

/// A running proxy server.
pub struct ProxyHandle {
    port: u16,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ProxyHandle {
    /// Bind `port` and start serving.
    pub async fn start(
        port: u16,
        ports: Arc<PortAssignment>,
        shutdown: Shutdown,
    ) -> Result<Self, DevError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|source| DevError::ProxyBind { port, source })?;
        Self::serve(listener, ports, shutdown)
    }

    /// Serve on an already bound listener.
    pub fn serve(
        listener: TcpListener,
        ports: Arc<PortAssignment>,
        shutdown: Shutdown,
    ) -> Result<Self, DevError> {
        let port = listener.local_addr()?.port();
        let app = router(ports, shutdown);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(port, error = %e, "proxy server failed");
            }
        });

        tracing::debug!(port, "proxy listening");
        Ok(Self {
            port,
            stop: Some(stop_tx),
            task,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting, let in-flight requests finish for up to `deadline`,
    /// then abort whatever is left. Returns whether the drain completed.
    pub async fn shutdown(mut self, deadline: Duration) -> bool {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match tokio::time::timeout(deadline, &mut self.task).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(port = self.port, "proxy did not drain in time, closing");
                self.task.abort();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_prefix_routes_to_backend() {
        assert_eq!(route_target("/api"), Upstream::Backend);
        assert_eq!(route_target("/api/"), Upstream::Backend);
        assert_eq!(route_target("/api/users/42"), Upstream::Backend);
    }

    #[test]
    fn everything_else_routes_to_frontend() {
        assert_eq!(route_target("/"), Upstream::Frontend);
        assert_eq!(route_target("/apix"), Upstream::Frontend);
        assert_eq!(route_target("/apidocs/index.html"), Upstream::Frontend);
        assert_eq!(route_target("/src/api/client.ts"), Upstream::Frontend);
        assert_eq!(route_target("/@vite/client"), Upstream::Frontend);
    }

    #[test]
    fn upgrade_needs_both_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        assert!(!is_upgrade(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        assert!(is_upgrade(&headers));

        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        assert!(!is_upgrade(&headers));
    }
}
