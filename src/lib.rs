//! # VideoTube Server
//!
//! REST backend for a video sharing platform.
//!
//! ## Features
//!
//! - **Accounts**: registration with avatar upload, cookie based JWT sessions
//!   with rotating refresh tokens, profile and password management
//! - **Videos**: upload to a media host, search, sorting, view counting and
//!   watch history
//! - **Social**: subscriptions, comments, likes, playlists and tweets
//! - **Dashboard**: per-channel statistics
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  HTTP Server                      │
//! │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────────┐ │
//! │  │ Users  │ │ Videos │ │ Social │ │ Dashboard  │ │
//! │  └────────┘ └────────┘ └────────┘ └────────────┘ │
//! ├──────────────────────────────────────────────────┤
//! │                   Services                        │
//! │  ┌────────────┐ ┌────────────┐ ┌───────────────┐ │
//! │  │    Auth    │ │   Media    │ │   Database    │ │
//! │  │ (JWT/argon)│ │ (Cloudinary│ │   (RocksDB)   │ │
//! │  │            │ │  / local)  │ │               │ │
//! │  └────────────┘ └────────────┘ └───────────────┘ │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the server
//! cargo run --release
//!
//! # Register
//! curl -X POST http://localhost:8000/api/v1/users/register \
//!   -F username=alice -F email=alice@example.com -F fullname="Alice" \
//!   -F password=secret -F "avatar=@me.png"
//!
//! # Log in and keep the session cookies
//! curl -c cookies.txt -X POST http://localhost:8000/api/v1/users/login \
//!   -H 'content-type: application/json' \
//!   -d '{"username":"alice","password":"secret"}'
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::{AuthConfig, Config};
pub use error::{AppError, Result};
pub use middleware::{AuthUser, RateLimiter};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    compression::{
        predicate::{NotForContentType, Predicate},
        CompressionLayer, DefaultPredicate,
    },
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::config::MediaProvider;

/// Run the server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(config.clone()).await?;

    let rate_limiter = RateLimiter::new(&config.rate_limit);
    if config.rate_limit.enabled {
        info!(
            requests_per_window = config.rate_limit.requests_per_window,
            window_seconds = config.rate_limit.window_seconds,
            paths = ?config.rate_limit.paths,
            "Rate limiting enabled"
        );

        let limiter = rate_limiter.clone();
        let interval = Duration::from_secs(config.rate_limit.window_seconds.max(60));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                limiter.cleanup();
                debug!(clients = limiter.tracked_clients(), "Rate limiter buckets pruned");
            }
        });
    }

    let app = create_router(state, &rate_limiter);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!(address = %addr, "API server starting");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Create the API router
pub fn create_router(state: AppState, rate_limiter: &RateLimiter) -> Router {
    let body_limit = state.config.upload.max_body_size();

    let api = Router::new()
        .nest("/users", handlers::user_routes())
        .nest("/videos", handlers::video_routes())
        .nest("/subscriptions", handlers::subscription_routes())
        .nest("/comments", handlers::comment_routes())
        .nest("/likes", handlers::like_routes())
        .nest("/playlist", handlers::playlist_routes())
        .nest("/tweets", handlers::tweet_routes())
        .nest("/dashboard", handlers::dashboard_routes())
        .nest("/healthcheck", handlers::health_routes());

    let mut app = Router::new()
        .route("/", get(home))
        .nest("/api/v1", api);

    if state.config.media.provider == MediaProvider::Local {
        app = app.nest_service("/media", ServeDir::new(state.config.storage.media_path()));
    }
    if state.config.server.public_dir.is_dir() {
        app = app.fallback_service(ServeDir::new(&state.config.server.public_dir));
    }

    // Never gzip video bodies
    let compression = CompressionLayer::new()
        .compress_when(DefaultPredicate::new().and(NotForContentType::const_new("video/")));

    app.layer(compression)
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(rate_limiter.layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /
async fn home() -> &'static str {
    "Welcome to home page"
}

/// Credentialed CORS for the configured origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}
