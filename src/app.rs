use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/signup", post(handlers::signup))
        .route("/api/guest", post(handlers::create_guest))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route(
            "/api/me",
            get(handlers::get_profile).delete(handlers::delete_profile),
        )
        .route("/api/me/baseline", put(handlers::update_baseline))
        .route("/api/me/goal", put(handlers::update_goal))
        .route(
            "/api/entries",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route("/api/entries/export", get(handlers::export_entries))
        .route("/api/status", get(handlers::get_status))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/leaderboard", get(handlers::get_leaderboard))
        .route("/api/community", get(handlers::get_community))
        .route("/api/demo", post(handlers::seed_demo))
        .with_state(state)
}
