use crate::accounts;
use crate::auth::Session;
use crate::demo::seed_demo_at;
use crate::entries::submit_entry;
use crate::errors::AppError;
use crate::leaderboard::rank_at;
use crate::models::{
    AuthResponse, Baseline, CommunityResponse, DemoResponse, Entry, EntryRequest, GoalRequest,
    GuestRequest, LeaderboardQuery, LeaderboardRow, LoginRequest, ProfileResponse, SignupRequest,
    StatusResponse, SummaryResponse, User,
};
use crate::state::AppState;
use crate::stats::{build_community_at, build_status_at, build_summary_at, today};
use crate::storage::entries_to_csv;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use tracing::info;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn signup(
    State(state): State<AppState>,
    session: Option<Session>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(payload) = payload?;
    let created = {
        let _guard = state.writes.lock().await;
        let guest = session.as_ref().map(|session| session.username.as_str());
        accounts::signup(state.store.as_ref(), payload, guest).await?
    };

    if let Some(guest) = &created.guest {
        state.sessions.revoke_user(guest).await;
    }

    let token = state.sessions.issue(&created.user.username).await;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            username: created.user.username,
            is_guest: false,
            migrated_entries: created.migrated_entries,
        }),
    ))
}

pub async fn create_guest(
    State(state): State<AppState>,
    payload: Result<Json<GuestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let baseline = match payload {
        Ok(Json(request)) => request.baseline,
        Err(JsonRejection::MissingJsonContentType(_)) => Baseline::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let user = {
        let _guard = state.writes.lock().await;
        accounts::create_guest(state.store.as_ref(), baseline).await?
    };

    let token = state.sessions.issue(&user.username).await;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            username: user.username,
            is_guest: true,
            migrated_entries: 0,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let user = accounts::login(state.store.as_ref(), &payload.username, &payload.password).await?;
    let token = state.sessions.issue(&user.username).await;
    info!(user = %user.username, "logged in");
    Ok(Json(AuthResponse {
        token,
        username: user.username,
        is_guest: false,
        migrated_entries: 0,
    }))
}

pub async fn logout(State(state): State<AppState>, session: Session) -> StatusCode {
    state.sessions.revoke(&session.token).await;
    StatusCode::NO_CONTENT
}

pub async fn get_profile(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = current_user(&state, &session).await?;
    Ok(Json(ProfileResponse::from(&user)))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    session: Session,
) -> Result<StatusCode, AppError> {
    {
        let _guard = state.writes.lock().await;
        accounts::delete_guest(state.store.as_ref(), &session.username).await?;
    }
    state.sessions.revoke_user(&session.username).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_baseline(
    State(state): State<AppState>,
    session: Session,
    baseline: Result<Json<Baseline>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(baseline) = baseline?;
    let _guard = state.writes.lock().await;
    let user = accounts::update_baseline(state.store.as_ref(), &session.username, baseline).await?;
    Ok(Json(ProfileResponse::from(&user)))
}

pub async fn update_goal(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<GoalRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(payload) = payload?;
    let _guard = state.writes.lock().await;
    let user =
        accounts::update_goal(state.store.as_ref(), &session.username, payload.weekly_goal).await?;
    Ok(Json(ProfileResponse::from(&user)))
}

pub async fn list_entries(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Entry>>, AppError> {
    let user = current_user(&state, &session).await?;
    Ok(Json(state.store.load_entries(&user.username).await))
}

pub async fn create_entry(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<EntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Entry>), AppError> {
    let Json(payload) = payload?;
    let _guard = state.writes.lock().await;
    let user = current_user(&state, &session).await?;
    let entry = submit_entry(
        state.store.as_ref(),
        &user,
        payload,
        today(),
        Local::now().to_rfc3339(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn export_entries(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let user = current_user(&state, &session).await?;
    let entries = state.store.load_entries(&user.username).await;
    let body = entries_to_csv(&entries)?;
    let disposition = format!("attachment; filename=\"{}-entries.csv\"", user.username);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub async fn get_status(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<StatusResponse>, AppError> {
    let user = current_user(&state, &session).await?;
    let entries = state.store.load_entries(&user.username).await;
    Ok(Json(build_status_at(today(), &entries)))
}

pub async fn get_summary(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SummaryResponse>, AppError> {
    let user = current_user(&state, &session).await?;
    let entries = state.store.load_entries(&user.username).await;
    Ok(Json(build_summary_at(today(), &user, &entries)))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<Vec<LeaderboardRow>>, AppError> {
    let Query(query) = query?;
    let logs = all_logs(&state).await;
    Ok(Json(rank_at(today(), &logs, query.period, query.limit)))
}

pub async fn get_community(State(state): State<AppState>) -> Json<CommunityResponse> {
    let logs = all_logs(&state).await;
    Json(build_community_at(today(), &logs))
}

pub async fn seed_demo(State(state): State<AppState>) -> Result<Json<DemoResponse>, AppError> {
    if !state.config.enable_demo {
        return Err(AppError::not_found("demo data is disabled"));
    }
    let _guard = state.writes.lock().await;
    let seeded = seed_demo_at(state.store.as_ref(), today(), &Local::now().to_rfc3339()).await?;
    Ok(Json(seeded))
}

/// Sessions are revoked by the handlers that delete or migrate accounts, so a
/// failed lookup here only rejects the request.
async fn current_user(state: &AppState, session: &Session) -> Result<User, AppError> {
    state
        .store
        .get_user(&session.username)
        .await
        .ok_or_else(|| AppError::unauthorized("account no longer exists"))
}

async fn all_logs(state: &AppState) -> Vec<(User, Vec<Entry>)> {
    let mut logs = Vec::new();
    for user in state.store.list_users().await {
        let entries = state.store.load_entries(&user.username).await;
        logs.push((user, entries));
    }
    logs
}
