use axum::http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// Build the CORS layer for browser clients.
///
/// - Origins: any (the API carries no cookies, so wildcard is safe)
/// - Methods: GET, POST, OPTIONS
/// - Headers: Authorization, X-Client-Info, Apikey, Content-Type (the
///   exact set the journaling web client sends)
/// - Max age: 3600s
pub fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            HeaderName::from_static("content-type"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}
