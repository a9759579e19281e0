use axum::{Router, http::Method, middleware, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{Authenticator, authenticate};
use crate::handler::{
    API_PREFIX, AppState, create_bookmark, delete_bookmark, get_bookmark, healthcheck, list_bookmarks,
    update_bookmark,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookmarks", get(list_bookmarks).post(create_bookmark))
        .route(
            "/bookmarks/:id",
            get(get_bookmark).patch(update_bookmark).delete(delete_bookmark),
        )
}

/// The full application: API routes, token authentication and CORS.
pub fn app(state: AppState, auth: Authenticator) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthcheck))
        .nest(API_PREFIX, routes())
        .layer(middleware::from_fn_with_state(auth, authenticate))
        .layer(cors)
        .with_state(state)
}
