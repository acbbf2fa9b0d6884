mod core;
mod features;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware, server};
use crate::features::auth::JwtValidator;
use crate::features::categories::{routes as categories_routes, CategoryService, ListingCountTrigger};
use crate::features::listings::{routes as listings_routes, ListingService, ListingState};
use crate::features::reviews::{routes as reviews_routes, ReviewService};
use crate::features::search::{routes as search_routes, SearchService};
use axum::{http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Configuration loaded: tokio_worker_threads={}, count_active_only={}, bulk_chunk_size={}",
        worker_threads,
        config.directory.count_active_only,
        config.directory.bulk_chunk_size
    );

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    let jwt_validator = Arc::new(JwtValidator::new(&config.auth));
    tracing::info!("Auth configuration initialized");

    // Categories also own the listing-count recompute that listing writes trigger
    let category_service = Arc::new(CategoryService::new(pool.clone(), &config.directory));
    let count_trigger: Arc<dyn ListingCountTrigger> = category_service.clone();

    let listing_state = ListingState {
        businesses: Arc::new(ListingService::new(
            pool.clone(),
            Arc::clone(&count_trigger),
            &config.directory,
        )),
        providers: Arc::new(ListingService::new(
            pool.clone(),
            Arc::clone(&count_trigger),
            &config.directory,
        )),
    };
    let search_service = Arc::new(SearchService::new(pool.clone(), &config.directory));
    let review_service = Arc::new(ReviewService::new(pool.clone(), &config.directory));
    tracing::info!("Directory services initialized");

    let api_routes = Router::new()
        .merge(categories_routes::routes(category_service))
        .merge(listings_routes::routes(listing_state))
        .merge(search_routes::routes(search_service))
        .merge(reviews_routes::routes(review_service))
        // Reads are public; the token is decoded when present so handlers can
        // extract the caller they need
        .route_layer(from_fn_with_state(
            jwt_validator,
            middleware::optional_auth_middleware,
        ));

    let app = Router::new()
        .merge(swagger_routes(&config))
        .merge(api_routes)
        .route("/health", get(|| async { StatusCode::OK }))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // X-Request-Id: client-provided or a fresh UUID v7
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let listener = server::bind_listener(socket_addr)?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Swagger UI and the OpenAPI document, behind basic auth when credentials are configured
fn swagger_routes(config: &Config) -> Router {
    let mut openapi = ApiDoc::openapi();
    SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    }
    .modify(&mut openapi);

    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    match config.swagger.credentials() {
        Some(credentials) => {
            tracing::info!("Swagger UI basic auth enabled");
            swagger.layer(from_fn_with_state(
                Arc::new(credentials),
                middleware::basic_auth_middleware,
            ))
        }
        None => {
            tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
            swagger
        }
    }
}
