use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::{
    internal_key_middleware, jwt_auth_middleware, resolve_identity_middleware, INTERNAL_KEY_HEADER,
};
use crate::state::AppState;

/// Full HTTP surface. Tests drive this directly with `oneshot`.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(handlers::status::root))
        .route("/health", get(handlers::status::health))
        // Service-to-service
        .merge(internal_routes(state.clone()))
        // Staff API: JWT, then identity resolution
        .merge(protected_routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(session_routes())
        .merge(admin_routes())
        .merge(push_routes())
        // Layers run bottom-up: the JWT gate is outermost
        .route_layer(from_fn_with_state(state.clone(), resolve_identity_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami))
}

fn session_routes() -> Router<AppState> {
    use handlers::{reply, sessions};

    Router::new()
        .route(
            "/api/sessions",
            get(sessions::list_sessions)
                .patch(sessions::patch_session)
                .post(sessions::bulk_session_action),
        )
        .route("/api/sessions/:id/escalations", get(sessions::session_escalations))
        .route("/api/messages", get(sessions::list_messages))
        .route("/api/reply", post(reply::post_reply))
}

fn admin_routes() -> Router<AppState> {
    use handlers::admin::{teams, users};

    Router::new()
        .route(
            "/api/admin/teams",
            get(teams::list_teams)
                .post(teams::create_team)
                .patch(teams::update_team)
                .delete(teams::delete_team),
        )
        .route(
            "/api/admin/users",
            get(users::list_users)
                .post(users::invite_user)
                .patch(users::update_user)
                .delete(users::remove_user),
        )
}

fn push_routes() -> Router<AppState> {
    use handlers::push;

    Router::new().route("/api/push/subscribe", post(push::subscribe).delete(push::unsubscribe))
}

fn internal_routes(state: AppState) -> Router<AppState> {
    use handlers::push;

    Router::new()
        .route("/api/push/send", post(push::send))
        .route_layer(from_fn_with_state(state, internal_key_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(INTERNAL_KEY_HEADER),
        ])
}
