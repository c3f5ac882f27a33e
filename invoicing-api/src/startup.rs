use crate::config::{InvoicingConfig, StoreBackend};
use crate::handlers;
use crate::middleware::session_middleware;
use crate::services::{
    AuthService, ClientService, InMemoryStore, InvoiceService, JwtService, LocalStorage, MongoDb,
    Repository, Storage, WorkspaceService,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use service_core::error::{expose_error_details, AppError};
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Path under which stored logos are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Request bodies on the logo route may exceed the logo limit so oversized
/// files get a readable rejection instead of a truncated stream.
const LOGO_BODY_LIMIT: usize = 2 * handlers::business_profile::MAX_LOGO_BYTES;

#[derive(Clone)]
pub struct AppState {
    pub config: InvoicingConfig,
    pub repo: Arc<dyn Repository>,
    pub auth: AuthService,
    pub workspaces: WorkspaceService,
    pub clients: ClientService,
    pub invoices: InvoiceService,
}

pub struct Application {
    port: u16,
    server: Box<dyn Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

async fn open_store(config: &InvoicingConfig) -> Result<Arc<dyn Repository>, AppError> {
    match (config.store.backend, &config.store.mongodb) {
        (StoreBackend::Mongo, Some(mongo)) => {
            let db = MongoDb::connect(&mongo.uri, &mongo.database)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to MongoDB: {}", e);
                    AppError::from(e)
                })?;
            db.initialize_indexes().await.map_err(|e| {
                tracing::error!("Failed to initialize database indexes: {}", e);
                AppError::from(e)
            })?;
            let repo: Arc<dyn Repository> = Arc::new(db);
            Ok(repo)
        }
        (StoreBackend::Mongo, None) => Err(AppError::ConfigError(anyhow::anyhow!(
            "MongoDB settings are required for the mongo store backend"
        ))),
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            let repo: Arc<dyn Repository> = Arc::new(InMemoryStore::new());
            Ok(repo)
        }
    }
}

impl AppState {
    pub async fn new(config: InvoicingConfig) -> Result<Self, AppError> {
        let repo = open_store(&config).await?;

        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(&config.uploads.local_path, &config.uploads.public_base_url)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.uploads.local_path,
                        e
                    );
                    AppError::from(e)
                })?,
        );

        let jwt = JwtService::new(&config.jwt.secret, config.jwt.expires_in_days);

        Ok(Self {
            auth: AuthService::new(repo.clone(), jwt),
            workspaces: WorkspaceService::new(repo.clone(), storage),
            clients: ClientService::new(repo.clone()),
            invoices: InvoiceService::new(repo.clone()),
            repo,
            config,
        })
    }
}

fn api_router(state: &AppState) -> Router<AppState> {
    use handlers::{auth, business_profile, clients, invoices};

    let public = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/invoices/public/:token", get(invoices::public_invoice));

    let protected = Router::new()
        .route("/auth/me", get(auth::get_me).put(auth::update_me))
        .route(
            "/business-profile",
            get(business_profile::get_profile)
                .post(business_profile::create_profile)
                .put(business_profile::update_profile),
        )
        .route(
            "/business-profile/logo",
            put(business_profile::upload_logo)
                .delete(business_profile::delete_logo)
                .layer(DefaultBodyLimit::max(LOGO_BODY_LIMIT)),
        )
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route("/clients/stats", get(clients::client_stats))
        .route(
            "/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/invoices/stats", get(invoices::invoice_stats))
        .route(
            "/invoices/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route_layer(from_fn_with_state(state.clone(), session_middleware));

    public.merge(protected)
}

fn cors_layer(config: &InvoicingConfig) -> Result<CorsLayer, AppError> {
    let origin = config.frontend_url.parse::<HeaderValue>().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "Invalid FRONTEND_URL '{}': {}",
            config.frontend_url,
            e
        ))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config)?;
    let uploads = ServeDir::new(&state.config.uploads.local_path);

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/api/v1", api_router(&state))
        .nest_service(UPLOADS_ROUTE, uploads)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors);

    Ok(app)
}

impl Application {
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        expose_error_details(!config.is_production());

        let state = AppState::new(config.clone()).await?;
        let app = build_router(state.clone())?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, environment = ?config.common.environment, "invoicing-api listening");

        let server = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .into_future();

        Ok(Self {
            port,
            server: Box::new(server),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
