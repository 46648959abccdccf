// crates/dsp-tck-core/src/server.rs
// ============================================================================
// Module: Callback Server
// Description: HTTP server fronting the callback endpoint.
// Purpose: Accept protocol requests from the connector under test.
// Dependencies: axum, bytes, tokio, tracing, crate::endpoint
// ============================================================================

//! ## Overview
//! [`CallbackServer`] binds the configured host and port and forwards every
//! request to a [`CallbackEndpoint`]. The server runs on a dedicated thread
//! with its own single-threaded tokio runtime so callers stay synchronous.
//! Handlers run on the blocking pool because they issue blocking HTTP calls.
//! Invariants:
//! - Binding happens before [`CallbackServer::start`] returns.
//! - Binding port `0` advertises `http://localhost:<bound port>`.
//! - Dropping the server shuts it down and joins its thread.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::thread;

use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::response::Response;
use bytes::Bytes;
use thiserror::Error;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::endpoint::CallbackEndpoint;
use crate::endpoint::HandlerResponse;
use crate::endpoint::RequestHeaders;
use crate::properties::PropertyError;
use crate::properties::TCK_CALLBACK_ADDRESS;
use crate::properties::TCK_DEFAULT_CALLBACK_ADDRESS;
use crate::properties::TCK_DEFAULT_HOST;
use crate::properties::TCK_DEFAULT_PORT;
use crate::properties::TCK_HOST;
use crate::properties::TCK_PORT;
use crate::properties::TckProperties;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Callback server startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Server configuration is invalid.
    #[error(transparent)]
    Config(#[from] PropertyError),
    /// Listener could not be bound or configured.
    #[error("callback server bind failed for {address}: {message}")]
    Bind {
        /// Requested bind address.
        address: String,
        /// Underlying error text.
        message: String,
    },
}

// ============================================================================
// SECTION: Callback Server
// ============================================================================

/// Running callback server.
///
/// # Invariants
/// - `shutdown` and `join` are `Some` until the server is dropped.
pub struct CallbackServer {
    /// Bound socket address.
    local_addr: SocketAddr,
    /// Endpoint receiving requests.
    endpoint: Arc<CallbackEndpoint>,
    /// Shutdown signal for the serve loop.
    shutdown: Option<oneshot::Sender<()>>,
    /// Server thread handle.
    join: Option<thread::JoinHandle<()>>,
}

impl CallbackServer {
    /// Binds and starts a callback server configured from properties.
    ///
    /// # Errors
    /// Returns [`ServerError`] when the port is malformed or binding fails.
    pub fn start(properties: &TckProperties) -> Result<Self, ServerError> {
        let host = properties.string_or(TCK_HOST, TCK_DEFAULT_HOST);
        let port = properties.parse_or::<u16>(TCK_PORT, TCK_DEFAULT_PORT)?;
        let bind_address = format!("{host}:{port}");
        let listener = StdTcpListener::bind(&bind_address).map_err(|err| ServerError::Bind {
            address: bind_address.clone(),
            message: err.to_string(),
        })?;
        listener.set_nonblocking(true).map_err(|err| ServerError::Bind {
            address: bind_address.clone(),
            message: err.to_string(),
        })?;
        let local_addr = listener.local_addr().map_err(|err| ServerError::Bind {
            address: bind_address.clone(),
            message: err.to_string(),
        })?;
        let callback_address = if port == 0 {
            format!("http://localhost:{}", local_addr.port())
        } else {
            properties.string_or(TCK_CALLBACK_ADDRESS, TCK_DEFAULT_CALLBACK_ADDRESS)
        };
        let endpoint = Arc::new(CallbackEndpoint::new(&callback_address));
        let app = Router::new().fallback(dispatch).with_state(Arc::clone(&endpoint));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!(error = %err, "callback server runtime failed to start");
                    return;
                }
            };
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        warn!(error = %err, "callback server listener conversion failed");
                        return;
                    }
                };
                let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
                if let Err(err) = server.await {
                    warn!(error = %err, "callback server stopped with error");
                }
            });
        });
        info!(bind = %local_addr, callback = %callback_address, "callback server started");
        Ok(Self {
            local_addr,
            endpoint,
            shutdown: Some(shutdown_tx),
            join: Some(join),
        })
    }

    /// Returns the bound socket address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the endpoint receiving requests.
    #[must_use]
    pub fn endpoint(&self) -> Arc<CallbackEndpoint> {
        Arc::clone(&self.endpoint)
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

// ============================================================================
// SECTION: Request Dispatch
// ============================================================================

/// Routes every request to the callback endpoint.
async fn dispatch(
    State(endpoint): State<Arc<CallbackEndpoint>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    debug!(path = %path, bytes = body.len(), "callback request received");
    let request_headers = collect_headers(&headers);
    let result = tokio::task::spawn_blocking(move || {
        endpoint.dispatch(&path, &request_headers, &body)
    })
    .await;
    match result {
        Ok(response) => into_http_response(response),
        Err(err) => {
            warn!(error = %err, "callback handler task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Converts request headers into lower-case keyed lists.
fn collect_headers(headers: &HeaderMap) -> RequestHeaders {
    let mut collected = RequestHeaders::new();
    for (name, value) in headers {
        if let Ok(text) = value.to_str() {
            collected.entry(name.as_str().to_ascii_lowercase()).or_default().push(text.to_string());
        }
    }
    collected
}

/// Converts a handler response into an HTTP response.
fn into_http_response(response: HandlerResponse) -> Response {
    let status = StatusCode::from_u16(response.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http = match response.body {
        Some(body) => {
            let mut http = (status, body).into_response();
            http.headers_mut().insert(
                axum::http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            http
        }
        None => status.into_response(),
    };
    for (name, value) in response.headers {
        if let (Ok(name), Ok(value)) =
            (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str()))
        {
            http.headers_mut().insert(name, value);
        }
    }
    http
}
