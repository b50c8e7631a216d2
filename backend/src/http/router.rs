//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, the per-route rate limits, middleware
//! (auth header validation, CORS, compression, tracing) and the JSON
//! fallbacks for unknown routes and methods.

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::extract::authenticate;
use super::handlers;
use super::rate_limit::{enforce, RateGuard, RatePolicy};
use super::state::AppState;

/// Budget for plain reads per rate-limit window.
pub const READ_LIMIT: u32 = 300;
/// Budget for search and favorites listing per rate-limit window.
pub const SEARCH_LIMIT: u32 = 600;

/// Wrap a method router in the rate limit for `policy`.
fn limited(
    state: &AppState,
    policy: RatePolicy,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    let guard = RateGuard::new(state.limiter.clone(), policy);
    route.layer(middleware::from_fn_with_state(guard, enforce))
}

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let files = ServeDir::new(state.storage.root())
        .not_found_service(handlers::not_found.into_service());

    let read = |name| RatePolicy::new(name, READ_LIMIT);
    let search = |name| RatePolicy::new(name, SEARCH_LIMIT);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Teams
        .route(
            "/team",
            limited(&state, read("team.list"), get(handlers::list_teams))
                .post(handlers::create_team),
        )
        .route(
            "/team/{id}",
            limited(&state, read("team.get"), get(handlers::get_team))
                .put(handlers::update_team)
                .delete(handlers::delete_team),
        )
        .route("/team/{id}/image", post(handlers::upload_team_images))
        // Favorites
        .route(
            "/team/favorite",
            limited(&state, search("favorite.list"), get(handlers::list_favorite_teams))
                .merge(limited(
                    &state,
                    read("favorite.add"),
                    post(handlers::favorite_team),
                ))
                .merge(limited(
                    &state,
                    read("favorite.remove"),
                    axum::routing::delete(handlers::unfavorite_team),
                )),
        )
        .route(
            "/team/unfavorite",
            limited(&state, read("favorite.remove"), post(handlers::unfavorite_team)),
        )
        // Players
        .route(
            "/player",
            limited(&state, read("player.list"), get(handlers::list_players))
                .post(handlers::create_player),
        )
        .route(
            "/player/{id}",
            limited(&state, read("player.get"), get(handlers::get_player))
                .put(handlers::update_player)
                .delete(handlers::delete_player),
        )
        .route("/player/{id}/image", post(handlers::upload_player_images))
        // Search
        .route(
            "/search/team",
            limited(&state, search("search.team"), get(handlers::search_teams)),
        )
        .route(
            "/search/player",
            limited(&state, search("search.player"), get(handlers::search_players)),
        )
        // Standings
        .route(
            "/standing",
            limited(&state, read("standing.list"), get(handlers::list_standings))
                .post(handlers::upsert_standing),
        )
        // Tokens
        .route("/internal/token", post(handlers::issue_token))
        .nest_service("/files", files)
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(DefaultBodyLimit::max(state.config.server.max_content_length))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::FullRepository;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn FullRepository>;
        let state = AppState::new(repo, AppConfig::default()).unwrap();
        let _router = create_router(state);
    }
}
