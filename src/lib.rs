pub mod app_state;
pub mod command;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod job;
pub mod logo;
pub mod middleware;
pub mod region;
pub mod removal;
pub mod routes;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tracing::{info, warn};

//
// Re-export
//
pub use app_state::AppState;
pub use command::FfmpegInvocation;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use job::TempFiles;
pub use logo::{LogoAsset, LogoLibrary, LogoPreset};
pub use region::{Resolution, WatermarkPosition, WatermarkRegion, calculate};

/// Assemble the service router over shared state. Body size enforcement
/// happens during staging against the configured caps, so the framework
/// default limit is lifted here.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/presets", get(routes::presets))
        .route("/api/process-video", post(routes::process_video))
        .route("/api/remove-background", post(routes::remove_background))
        .route("/api/cleanup", delete(routes::cleanup))
        .layer(axum::middleware::from_fn(middleware::log_request_errors))
        .layer(cors)
        .layer(DefaultBodyLimit::disable())
        .layer(Extension(state))
}

/// CORS layer from the configured origin list. An entry of `*` opens the
/// API up entirely (credentials cannot be combined with a wildcard);
/// anything else is parsed as an exact origin and allows credentials, with
/// request headers mirrored back since wildcard headers are likewise
/// incompatible with credentialed requests.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .inspect_err(|error| warn!(origin, %error, "Skipping unparseable CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(methods)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config).await?;
    let cors = cors_layer(&config.origins());
    let app = router(state, cors);

    let addr = format!("0.0.0.0:{}", config.listen_on_port);
    info!("Listening on http://{addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
