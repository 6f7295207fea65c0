mod handlers;
pub mod middleware;

use axum::{
    http::{HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::db::Database;
pub use middleware::{ActingUser, SecurityConfig};

/// Router with no gateway authentication, for local use and tests.
pub fn create_router(db: Database) -> Router {
    create_router_with_security(db, SecurityConfig::disabled())
}

pub fn create_router_with_security(db: Database, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Courses
        .route("/courses", get(handlers::list_courses).post(handlers::create_course))
        .route("/courses/{id}", get(handlers::get_course))
        .route(
            "/courses/{id}/nodes",
            get(handlers::list_course_nodes).post(handlers::create_node),
        )
        .route("/courses/{id}/levels", post(handlers::create_level))
        .route("/courses/{id}/hierarchy", get(handlers::get_course_hierarchy))
        // Learner progress
        .route("/courses/{id}/progress", get(handlers::get_course_progress))
        .route("/courses/{id}/map", get(handlers::get_course_map))
        // Levels
        .route("/levels/{id}/missions", post(handlers::create_mission))
        // Nodes
        .route("/nodes/{id}", get(handlers::get_node))
        .route("/nodes/{id}/complete", post(handlers::complete_node))
        .route_layer(axum::middleware::from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ))
        // Health stays reachable without the gateway secret
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&security)),
        )
        .with_state(db)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    HeaderName::from_static(middleware::USER_ID_HEADER),
                ])
                .max_age(std::time::Duration::from_secs(600))
        }
    }
}
