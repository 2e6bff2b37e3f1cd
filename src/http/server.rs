//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router (every path and method goes to dispatch)
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Open or create the caller's session from the session cookie
//! - Run the application on a blocking worker and write its response
//! - Apply reloaded config tables until shutdown
//! - Sweep idle sessions until shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::App;
use crate::config::schema::ServerConfig;
use crate::config::store::ConfigTables;
use crate::config::value::Value;
use crate::http::request::{cookie, request_args, request_id, user_agent};
use crate::http::response::into_http;
use crate::lifecycle::Shutdown;
use crate::request::context::RequestContext;
use crate::request::session::SessionStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    pub sessions: SessionStore,
    pub session_cookie: String,
    pub max_body_size: usize,
}

/// HTTP front for an [`App`].
pub struct HttpServer {
    router: Router,
    app: Arc<App>,
    sessions: SessionStore,
    sweep_interval: Duration,
}

impl HttpServer {
    pub fn new(app: Arc<App>, config: &ServerConfig) -> Self {
        let sessions = SessionStore::with_idle_ttl(Duration::from_secs(config.session_idle_timeout_secs));
        Self::with_sessions(app, config, sessions)
    }

    /// Serve with an existing session store.
    pub fn with_sessions(app: Arc<App>, config: &ServerConfig, sessions: SessionStore) -> Self {
        let state = AppState {
            app: app.clone(),
            sessions: sessions.clone(),
            session_cookie: config.session_cookie.clone(),
            max_body_size: config.max_body_size,
        };
        let router = Self::build_router(config, state);
        Self {
            router,
            app,
            sessions,
            sweep_interval: Duration::from_secs(config.session_sweep_interval_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(config.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)));

        Router::new()
            .route("/", any(dispatch_handler))
            .route("/{*path}", any(dispatch_handler))
            .with_state(state)
            .layer(layers)
    }

    /// Serve on `listener` until `shutdown` fires, swapping in config tables
    /// received on `config_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: UnboundedReceiver<ConfigTables>,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.app.clone();
        let updates_shutdown = shutdown.clone();
        let updates = tokio::spawn(async move {
            loop {
                tokio::select! {
                    tables = config_updates.recv() => match tables {
                        Some(tables) => {
                            tracing::info!(named_configs = tables.len(), "Applying reloaded config tables");
                            app.store().replace(tables);
                        }
                        None => break,
                    },
                    _ = updates_shutdown.wait() => break,
                }
            }
        });

        let sweeper = tokio::spawn(sweep_sessions(self.sessions.clone(), self.sweep_interval, shutdown.clone()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        updates.abort();
        sweeper.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Builds the request context, runs the app and writes the response.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> HttpResponse {
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejecting request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let args = request_args(parts.uri.query(), &parts.headers, &body);
    let callback = args.get("callback").and_then(Value::as_str).map(str::to_string);

    let mut context = RequestContext::build(parts.uri.path(), args);
    if let Some(agent) = user_agent(&parts.headers) {
        context = context.with_user_agent(agent);
    }

    let resumed = cookie(&parts.headers, &state.session_cookie).and_then(|id| state.sessions.resume(&id));
    let is_new_session = resumed.is_none();
    let session = resumed.unwrap_or_else(|| state.sessions.issue());
    let session_id = session.id().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %context.path(),
        new_session = is_new_session,
        "Dispatching request"
    );

    let app = state.app.clone();
    let response = match tokio::task::spawn_blocking(move || app.handle(&context, &session)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Dispatch task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut http = into_http(response, callback.as_deref());
    if is_new_session {
        let cookie = format!("{}={}; Path=/; HttpOnly", state.session_cookie, session_id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            http.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    http
}

/// Drop idle sessions every `interval` until shutdown.
async fn sweep_sessions(sessions: SessionStore, interval: Duration, shutdown: Shutdown) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let dropped = sessions.sweep();
                if dropped > 0 {
                    tracing::debug!(dropped, remaining = sessions.count(), "Swept idle sessions");
                }
            }
            _ = shutdown.wait() => break,
        }
    }
}
