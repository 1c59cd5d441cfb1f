//! HTTP server.
//!
//! Every route answers JSON. Authentication is a bearer token issued by
//! `POST /login`; role and ownership checks happen in the handlers through
//! [`crate::policy`].

mod auth;
mod catalog;
mod categories;
mod destinations;
mod error;
mod extract;
mod images;
mod state;
mod testimonials;
mod users;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use extract::{CurrentUser, MaybeUser};
pub use images::UploadData;
pub use state::AppState;

use crate::error::Result;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| warn!("Ignoring invalid CORS origin: {}", origin))
                .ok()
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let server = &state.config().server;
    let body_limit = server.max_body_bytes;
    let cors = cors_layer(&server.cors_origins);

    Router::new()
        // Public catalog
        .route("/", get(catalog::home))
        .route("/katalog", get(catalog::browse))
        .route("/katalog/{id}", get(catalog::detail))
        // Sessions
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        // Destinations
        .route(
            "/destination",
            get(destinations::index).post(destinations::store),
        )
        .route("/destination/create", get(destinations::create_form))
        .route(
            "/destination/{id}",
            get(destinations::show)
                .put(destinations::update)
                .delete(destinations::destroy),
        )
        .route("/destination/{id}/edit", get(destinations::edit_form))
        // Testimonials
        .route(
            "/testimonial",
            get(testimonials::index).post(testimonials::store),
        )
        .route("/testimonial/create", get(testimonials::create_form))
        .route(
            "/testimonial/{id}",
            get(testimonials::show)
                .put(testimonials::update)
                .delete(testimonials::destroy),
        )
        .route("/testimonial/{id}/edit", get(testimonials::edit_form))
        // Categories
        .route(
            "/category",
            get(categories::index).post(categories::store),
        )
        .route(
            "/category/{id}",
            put(categories::update).delete(categories::destroy),
        )
        // Users
        .route("/user", get(users::index).post(users::store))
        .route("/user/{id}", put(users::update).delete(users::destroy))
        // Image API
        .route("/api/imagekit/upload", post(images::upload))
        .route("/api/imagekit/generate-url", post(images::generate_url))
        .route(
            "/api/imagekit/generate-signed-url",
            post(images::generate_signed_url),
        )
        .route("/api/imagekit/auth-params", get(images::auth_params))
        .route("/api/imagekit/delete-file", delete(images::delete_file))
        .route("/api/imagekit/file-details", get(images::file_details))
        .route("/api/imagekit/list-files", get(images::list_files))
        .route("/api/imagekit/phash-distance", post(images::phash_distance))
        .route(
            "/api/upload/destination-image",
            post(images::upload_destination_image),
        )
        .route("/api/upload/delete-image", delete(images::delete_image))
        .route("/api/upload/optimized-url", post(images::optimized_url))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let purged = state.with_storage(crate::storage::Storage::purge_expired_sessions)?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
