//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every API route
//! - Wire up middleware (request id, tracing, timeout, body limit, headers)
//! - Serve local blobs when the local storage backend is active
//! - Apply hot-reloaded configuration to shared state
//! - Bind plain TCP or TLS and shut down gracefully

use arc_swap::ArcSwap;
use axum::extract::{DefaultBodyLimit, MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::blockchain::SolanaClient;
use crate::config::{AppConfig, StorageBackendKind};
use crate::db::RecordStore;
use crate::files::FileService;
use crate::http::handlers;
use crate::mint::NftMinter;
use crate::observability::metrics;
use crate::payments::PaymentVerifier;
use crate::security::headers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live configuration, swapped on reload.
    pub config: Arc<ArcSwap<AppConfig>>,
    pub files: FileService,
    pub payments: PaymentVerifier,
    /// Present only when a mint authority key is loaded.
    pub minter: Option<NftMinter>,
    pub store: Arc<dyn RecordStore>,
    pub client: SolanaClient,
}

/// HTTP server for the file host.
pub struct HttpServer {
    router: Router,
    state: AppState,
    tls: Option<crate::config::schema::TlsConfig>,
}

impl HttpServer {
    /// Build the server around prepared state.
    pub fn new(state: AppState) -> Self {
        let config = state.config.load_full();
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            tls: config.listener.tls.clone(),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Timeout, body limit and header settings are read once here; changing
    /// them takes a restart.
    #[allow(deprecated)]
    pub fn build_router(config: &AppConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/upload", post(handlers::files::upload))
            .route("/files", get(handlers::files::list_wallet_files))
            .route(
                "/file/{id}",
                get(handlers::files::get_file).delete(handlers::files::delete_file),
            )
            .route("/f/{id}", get(handlers::files::get_shared_file))
            .route("/update-public", post(handlers::files::update_public))
            .route("/explorer", get(handlers::files::explorer))
            .route("/check-payment", post(handlers::payments::check_payment))
            .route("/payments/recent", get(handlers::payments::recent_payments))
            .route("/mint-nft", post(handlers::mint::mint_nft));

        let mut router = Router::new()
            .nest("/api", api)
            .route("/health", get(handlers::health::health))
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state);

        if config.storage.backend == StorageBackendKind::Local {
            let root = PathBuf::from(&config.storage.local_root);
            router = router.nest_service("/blobs", ServeDir::new(root));
        }

        let router = router
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        let router = if config.security.enable_headers {
            headers::apply(router)
        } else {
            router
        };

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Consume the server and hand back the router (tests drive it directly).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Config updates are swapped into shared state as they arrive. Returns
    /// once `shutdown` fires and in-flight requests have drained.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        let live = self.state.config.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                live.store(Arc::new(new_config));
                tracing::info!("Configuration reloaded");
            }
        });

        match self.tls {
            Some(tls) => {
                tracing::info!(address = %addr, "HTTPS server starting");
                let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                    &tls.cert_path,
                    &tls.key_path,
                )
                .await?;

                let handle = axum_server::Handle::new();
                let stopper = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    stopper.graceful_shutdown(Some(Duration::from_secs(10)));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await?;
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Count requests by matched route and status.
async fn track_metrics(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16());
    response
}
