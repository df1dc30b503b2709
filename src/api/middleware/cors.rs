//! CORS middleware configuration
//!
//! With no configured origins every origin, method and header is allowed,
//! credentials included. Browsers reject `*` together with credentials, so
//! the request's own origin, method and headers are mirrored back instead.

use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::debug;

/// Create a CORS layer with the specified allowed origins
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    if allowed_origins.is_empty() {
        debug!("CORS: No origins specified, allowing any origin");
        layer.allow_origin(AllowOrigin::mirror_request())
    } else {
        debug!("CORS: Allowing origins: {:?}", allowed_origins);
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        layer.allow_origin(origins)
    }
}
