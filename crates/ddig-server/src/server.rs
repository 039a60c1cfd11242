use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ddig_notify::Dispatcher;
use ddig_settings::DdigSettings;
use ddig_store::RecordStore;
use serde_json::json;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::admin::admin_handler;
use crate::registry::{FormContext, FormRegistry, RegistryError};
use crate::submission::Submission;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<FormRegistry>,
    pub forms: FormContext,
}

impl AppState {
    pub fn new(
        settings: Arc<DdigSettings>,
        store: Arc<dyn RecordStore>,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, RegistryError> {
        let timeout = std::time::Duration::from_secs(settings.server.handler_timeout_secs);
        Ok(Self {
            registry: Arc::new(FormRegistry::builtin(timeout)?),
            forms: FormContext::new(store, dispatcher, settings),
        })
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route(
            "/submit",
            get(submit_handler).post(submit_handler).options(preflight),
        )
        .route("/api", get(admin_handler).options(preflight))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve. Returns a handle that stops the server when shut down.
pub async fn start(state: AppState) -> Result<ServerHandle, ServerError> {
    let settings = &state.forms.settings;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    if settings.admin.api_token.as_deref().unwrap_or("").is_empty() {
        warn!("no admin token configured; get_registrations and export_data are disabled");
    }
    let mailer = state.forms.dispatcher.mailer_name();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
        addr: addr.clone(),
        source,
    })?;

    let router = build_router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let service = router.into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, service)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server stopped with error");
        }
    });

    info!(addr = %local_addr, mailer, "DDIG server started");

    Ok(ServerHandle {
        addr: local_addr,
        shutdown: shutdown_tx,
        server,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.server.await;
    }
}

async fn submit_handler(State(state): State<AppState>, submission: Submission) -> Response {
    match state.registry.dispatch(&submission, &state.forms).await {
        Ok(envelope) => envelope.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "mailer": state.forms.dispatcher.mailer_name(),
    }))
}
