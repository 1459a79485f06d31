//! One-shot local listener for the OAuth redirect.
//!
//! The browser is sent to `http://localhost:<port>/?code=...&state=...` once
//! the user has consented. The first GET to `/` is answered with the consent
//! page, its query parameters are handed to whoever awaits
//! [`CallbackServer::wait`], and the listener shuts down. Any other path gets
//! a 404 and leaves the listener running.

use std::collections::HashMap;
use std::future::IntoFuture;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// How long `wait` gives the server task to wind down after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Query parameters delivered on the redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams(HashMap<String, String>);

impl CallbackParams {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self(params)
    }

    /// The authorization code.
    pub fn code(&self) -> Option<&str> {
        self.get("code")
    }

    /// The provider's error code (e.g. `access_denied`).
    pub fn error(&self) -> Option<&str> {
        self.get("error")
    }

    pub fn error_description(&self) -> Option<&str> {
        self.get("error_description")
    }

    pub fn state(&self) -> Option<&str> {
        self.get("state")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }
}

#[derive(Clone)]
struct CallbackState {
    tx: Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>,
    page: Arc<str>,
    shutdown: CancellationToken,
}

/// A running callback listener. Consumed by [`CallbackServer::wait`].
pub struct CallbackServer {
    local_addr: SocketAddr,
    rx: oneshot::Receiver<CallbackParams>,
    shutdown: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

impl CallbackServer {
    /// Bind `127.0.0.1:<port>` (0 picks a free port) and start serving.
    ///
    /// The same port is also bound on `[::1]` when IPv6 loopback is
    /// available, so `localhost` reaches the listener whichever family it
    /// resolves to. `page` is the body returned to the browser on the redirect.
    pub async fn start(port: u16, page: impl Into<Arc<str>>) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|source| Error::Bind { port, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| Error::Bind { port, source })?;
        let listener_v6 = match TcpListener::bind((Ipv6Addr::LOCALHOST, local_addr.port())).await {
            Ok(l) => Some(l),
            Err(e) => {
                debug!(error = %e, "IPv6 loopback unavailable; serving on IPv4 only");
                None
            }
        };

        let (tx, rx) = oneshot::channel();
        let shutdown = CancellationToken::new();
        let state = CallbackState {
            tx: Arc::new(Mutex::new(Some(tx))),
            page: page.into(),
            shutdown: shutdown.clone(),
        };

        let app = router(state);
        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            let v4 = axum::serve(listener, app.clone())
                .with_graceful_shutdown(signal.clone().cancelled_owned())
                .into_future();
            match listener_v6 {
                Some(listener_v6) => {
                    let v6 = axum::serve(listener_v6, app)
                        .with_graceful_shutdown(signal.cancelled_owned())
                        .into_future();
                    tokio::try_join!(v4, v6).map(|_| ())
                }
                None => v4.await,
            }
        });

        info!(addr = %local_addr, "OAuth callback listener started");
        Ok(Self {
            local_addr,
            rx,
            shutdown,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The redirect URI to register with the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.local_addr.port())
    }

    /// Wait for the redirect.
    ///
    /// Fails with [`Error::CallbackTimeout`] once `timeout` elapses, or
    /// [`Error::CallbackClosed`] if the server stopped first. The listener
    /// is closed before this returns, whatever the outcome.
    pub async fn wait(self, timeout: Option<Duration>) -> Result<CallbackParams> {
        let Self {
            local_addr,
            rx,
            shutdown,
            mut task,
        } = self;

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(r) => r.map_err(|_| Error::CallbackClosed),
                Err(_) => Err(Error::CallbackTimeout(limit)),
            },
            None => rx.await.map_err(|_| Error::CallbackClosed),
        };

        shutdown.cancel();
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "OAuth callback listener failed"),
            Ok(Err(e)) => warn!(error = %e, "OAuth callback listener task panicked"),
            Err(_) => {
                warn!("OAuth callback listener did not stop in time; aborting");
                task.abort();
            }
        }
        debug!(addr = %local_addr, "OAuth callback listener closed");

        received
    }
}

fn router(state: CallbackState) -> Router {
    Router::new()
        .route("/", get(handle_redirect))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_redirect(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<String> {
    if let Some(tx) = state.tx.lock().await.take() {
        debug!(has_code = params.contains_key("code"), "OAuth redirect received");
        let _ = tx.send(CallbackParams::new(params));
        state.shutdown.cancel();
    }
    Html(state.page.to_string())
}
