use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::analytics::{self, UnitSample, UnitTag};
use crate::auth::{self, AuthUser};
use crate::db;
use crate::error::AppError;
use crate::feedback;
use crate::models::*;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        // accounts
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/verify-id", post(verify_id))
        // content
        .route("/api/courses", get(list_courses))
        .route("/api/courses/:course_id", get(get_course))
        .route("/api/units", get(list_units))
        .route("/api/units/:course_id", get(list_course_units))
        .route("/api/feedback-templates", get(list_feedback_templates))
        // view activity
        .route("/api/user-activity", post(log_view))
        .route("/api/user-activity/:unit_id", get(view_logged))
        .route("/api/user-activity/course/:course_id", get(viewed_units))
        .route("/api/user-activity/course/:course_id/progress", get(course_progress))
        // behavior logging
        .route("/api/user-behavior/time-spent", post(log_time_spent))
        .route("/api/user-behavior/scroll-percentage", post(log_scroll_percentage))
        .route("/api/user-behavior/scroll-percentages", delete(consolidate_scroll_records))
        // analytics
        .route("/api/analytics/scroll", get(scroll_analytics))
        .route("/api/analytics/time-spent", get(time_spent_analytics))
        .route("/api/analytics/course/:course_id", get(course_analytics))
        .route("/api/analytics/general", get(general_analytics))
        .with_state(state)
}

// --- accounts ---

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> Result<Json<UserProfile>, AppError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("some fields are missing".into()));
    }

    let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(req.email.trim())
        .fetch_optional(&state.db)
        .await?;
    if taken.is_some() {
        return Err(AppError::Validation("email is already registered".into()));
    }

    let password_hash = auth::hash_password(&req.password)?;
    let user_id = db::next_sequence(&state.db, "userId").await?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, uuid)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(req.username.trim())
    .bind(req.email.trim())
    .bind(&password_hash)
    .bind(Uuid::new_v4())
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user = user.id, "registered new user");
    Ok(Json(user.into()))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("some fields are missing".into()));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(req.email.trim())
        .fetch_optional(&state.db)
        .await?;

    // one indistinct message for unknown email and wrong password
    let Some(user) = user else {
        return Err(AppError::Unauthorized("invalid email or password".into()));
    };
    if !auth::verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("invalid email or password".into()));
    }

    let token = auth::issue_token(
        user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.token_ttl_secs,
    )?;

    Ok(Json(json!({
        "token": token,
        "username": user.username,
        "email": user.email,
    })))
}

async fn logout(_user: AuthUser) -> Json<serde_json::Value> {
    // tokens are stateless; the client drops its copy
    Json(json!({
        "status": "Logged Out",
        "message": "You have successfully logged out",
    }))
}

async fn verify_id(
    State(state): State<AppState>,
    Json(req): Json<VerifyIdReq>,
) -> Result<Json<UserProfile>, AppError> {
    let raw = req.uuid.trim();
    if raw.is_empty() {
        return Err(AppError::Validation("id is missing".into()));
    }
    let uuid =
        Uuid::parse_str(raw).map_err(|_| AppError::Validation("id is not a valid UUID".into()))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE uuid = $1")
        .bind(uuid)
        .fetch_optional(&state.db)
        .await?;

    match user {
        Some(user) => Ok(Json(user.into())),
        None => Err(AppError::Unauthorized("no user exists with this id".into())),
    }
}

// --- content ---

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = sqlx::query_as("SELECT * FROM courses ORDER BY created_at")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(courses))
}

async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Course>, AppError> {
    sqlx::query_as("SELECT * FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("course"))
}

async fn list_units(State(state): State<AppState>) -> Result<Json<Vec<Unit>>, AppError> {
    let units = sqlx::query_as("SELECT * FROM units ORDER BY course_id, position, created_at")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(units))
}

async fn list_course_units(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<Unit>>, AppError> {
    let units =
        sqlx::query_as("SELECT * FROM units WHERE course_id = $1 ORDER BY position, created_at")
            .bind(course_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(units))
}

async fn list_feedback_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedbackTemplate>>, AppError> {
    let templates = sqlx::query_as("SELECT * FROM feedback_templates ORDER BY id")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(templates))
}

// --- view activity ---

async fn log_view(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<LogViewReq>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_unit(&state, req.course_id, req.unit_id).await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO view_events (user_id, course_id, unit_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, unit_id) DO NOTHING
        "#,
    )
    .bind(user.user_id)
    .bind(req.course_id)
    .bind(req.unit_id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Ok(Json(json!({
            "status": "Activity Exists",
            "message": "This unit has already been logged as viewed for this user.",
            "already_logged": true,
        })));
    }
    Ok(Json(json!({
        "status": "Activity Logged",
        "message": "Unit view has been logged successfully.",
        "already_logged": false,
    })))
}

async fn view_logged(
    State(state): State<AppState>,
    user: AuthUser,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM view_events WHERE user_id = $1 AND unit_id = $2")
            .bind(user.user_id)
            .bind(unit_id)
            .fetch_optional(&state.db)
            .await?;
    Ok(Json(json!({ "already_logged": existing.is_some() })))
}

async fn viewed_units(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let viewed: Vec<Uuid> =
        sqlx::query_scalar("SELECT unit_id FROM view_events WHERE user_id = $1 AND course_id = $2")
            .bind(user.user_id)
            .bind(course_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(json!({ "viewed_units": viewed })))
}

async fn course_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_course(&state, course_id).await?;

    let unit_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM units WHERE course_id = $1")
        .bind(course_id)
        .fetch_all(&state.db)
        .await?;
    let viewed: Vec<Uuid> =
        sqlx::query_scalar("SELECT unit_id FROM view_events WHERE user_id = $1 AND course_id = $2")
            .bind(user.user_id)
            .bind(course_id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(json!({
        "total_units": unit_ids.len(),
        "viewed_units": viewed.len(),
        "progress_percent": analytics::progress_percent(&unit_ids, &viewed),
    })))
}

// --- behavior logging ---

async fn log_time_spent(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<LogTimeSpentReq>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.time_spent_secs < 1 {
        return Err(AppError::Validation("time_spent_secs must be positive".into()));
    }
    require_unit(&state, req.course_id, req.unit_id).await?;

    // increments accumulate in the store, never read-modify-write
    sqlx::query(
        r#"
        INSERT INTO time_spent (user_id, course_id, unit_id, video_included, time_spent_secs)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, course_id, unit_id)
        DO UPDATE SET time_spent_secs = time_spent.time_spent_secs + EXCLUDED.time_spent_secs,
                      video_included = EXCLUDED.video_included,
                      date = now()
        "#,
    )
    .bind(user.user_id)
    .bind(req.course_id)
    .bind(req.unit_id)
    .bind(req.video_included)
    .bind(req.time_spent_secs)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({
        "status": "Behavior Logged",
        "message": "Time spent has been logged successfully.",
    })))
}

async fn log_scroll_percentage(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<LogScrollReq>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !(0.0..=100.0).contains(&req.scroll_percentage) {
        return Err(AppError::Validation("scroll_percentage must be within 0..=100".into()));
    }
    require_unit(&state, req.course_id, req.unit_id).await?;

    sqlx::query(
        r#"
        INSERT INTO scroll_records (user_id, course_id, unit_id, scroll_percentage, video_included)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user.user_id)
    .bind(req.course_id)
    .bind(req.unit_id)
    .bind(req.scroll_percentage)
    .bind(req.video_included)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({
        "status": "Behavior Logged",
        "message": "Scroll percentage has been logged successfully.",
    })))
}

/// Keeps the row with the maximum scroll percentage for the key and deletes
/// the rest. Idempotent; an empty or already-consolidated key is a no-op.
async fn consolidate_scroll_records(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ConsolidateScrollReq>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = state.db.begin().await?;

    let rows: Vec<(Uuid, f64)> = sqlx::query_as(
        r#"
        SELECT id, scroll_percentage FROM scroll_records
        WHERE user_id = $1 AND course_id = $2 AND unit_id = $3
        ORDER BY date, id
        FOR UPDATE
        "#,
    )
    .bind(user.user_id)
    .bind(req.course_id)
    .bind(req.unit_id)
    .fetch_all(&mut *tx)
    .await?;

    let Some(plan) = analytics::plan_scroll_pruning(&rows) else {
        tx.commit().await?;
        return Ok(Json(json!({
            "status": "No Extra Records",
            "message": "No scroll records needed consolidation.",
            "deleted": 0,
        })));
    };

    let deleted = sqlx::query("DELETE FROM scroll_records WHERE id = ANY($1)")
        .bind(&plan.delete)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;

    tracing::debug!(deleted, unit = %req.unit_id, "consolidated scroll records");
    Ok(Json(json!({
        "status": "Records Consolidated",
        "message": "Extra scroll records have been deleted.",
        "deleted": deleted,
    })))
}

// --- analytics ---

async fn scroll_analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ScrollRecord>>, AppError> {
    let rows = sqlx::query_as("SELECT * FROM scroll_records WHERE user_id = $1 ORDER BY date, id")
        .bind(user.user_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

async fn time_spent_analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<TimeSpentRecord>>, AppError> {
    let rows = sqlx::query_as("SELECT * FROM time_spent WHERE user_id = $1 ORDER BY date, id")
        .bind(user.user_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

async fn course_analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseAnalyticsRes>, AppError> {
    require_course(&state, course_id).await?;

    let units: Vec<Unit> =
        sqlx::query_as("SELECT * FROM units WHERE course_id = $1 ORDER BY position, created_at")
            .bind(course_id)
            .fetch_all(&state.db)
            .await?;
    let activities: Vec<ViewEvent> =
        sqlx::query_as("SELECT * FROM view_events WHERE user_id = $1 AND course_id = $2")
            .bind(user.user_id)
            .bind(course_id)
            .fetch_all(&state.db)
            .await?;
    let time_rows: Vec<TimeSpentRecord> = sqlx::query_as(
        "SELECT * FROM time_spent WHERE user_id = $1 AND course_id = $2 ORDER BY date, id",
    )
    .bind(user.user_id)
    .bind(course_id)
    .fetch_all(&state.db)
    .await?;
    let scroll_rows: Vec<ScrollRecord> = sqlx::query_as(
        "SELECT * FROM scroll_records WHERE user_id = $1 AND course_id = $2 ORDER BY date, id",
    )
    .bind(user.user_id)
    .bind(course_id)
    .fetch_all(&state.db)
    .await?;
    let templates: Vec<FeedbackTemplate> =
        sqlx::query_as("SELECT * FROM feedback_templates ORDER BY id")
            .fetch_all(&state.db)
            .await?;

    let tags: Vec<UnitTag> = units
        .iter()
        .map(|u| UnitTag { unit_id: u.id, has_video: u.has_video() })
        .collect();
    let time_samples: Vec<UnitSample> = time_rows
        .iter()
        .map(|r| UnitSample { unit_id: r.unit_id, value: r.time_spent_secs as f64 })
        .collect();
    let scroll_samples: Vec<UnitSample> = scroll_rows
        .iter()
        .map(|r| UnitSample { unit_id: r.unit_id, value: r.scroll_percentage })
        .collect();

    let time = analytics::split_averages(&tags, &time_samples);
    let scroll = analytics::split_averages(&tags, &scroll_samples);

    let unit_ids: Vec<Uuid> = units.iter().map(|u| u.id).collect();
    let viewed: Vec<Uuid> = activities.iter().map(|a| a.unit_id).collect();

    let summary = AnalyticsSummary {
        time_video_avg: time.video,
        time_non_video_avg: time.non_video,
        scroll_video_avg: scroll.video,
        scroll_non_video_avg: scroll.non_video,
        progress_percent: analytics::progress_percent(&unit_ids, &viewed),
        messages: FeedbackMessages {
            time_video: feedback::resolve(&templates, feedback::TIME_VIDEO, time.video),
            time_non_video: feedback::resolve(&templates, feedback::TIME_NON_VIDEO, time.non_video),
            scroll_video: feedback::resolve(&templates, feedback::SCROLL_VIDEO, scroll.video),
            scroll_non_video: feedback::resolve(
                &templates,
                feedback::SCROLL_NON_VIDEO,
                scroll.non_video,
            ),
        },
    };

    Ok(Json(CourseAnalyticsRes {
        activities,
        time_spent: time_rows,
        scroll_percentages: scroll_rows,
        summary,
    }))
}

async fn general_analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<CourseAveragesRes>>, AppError> {
    let courses: Vec<Course> = sqlx::query_as("SELECT * FROM courses ORDER BY created_at")
        .fetch_all(&state.db)
        .await?;
    let units: Vec<Unit> = sqlx::query_as("SELECT * FROM units")
        .fetch_all(&state.db)
        .await?;
    let time_rows: Vec<TimeSpentRecord> =
        sqlx::query_as("SELECT * FROM time_spent WHERE user_id = $1 ORDER BY date, id")
            .bind(user.user_id)
            .fetch_all(&state.db)
            .await?;
    let scroll_rows: Vec<ScrollRecord> =
        sqlx::query_as("SELECT * FROM scroll_records WHERE user_id = $1 ORDER BY date, id")
            .bind(user.user_id)
            .fetch_all(&state.db)
            .await?;

    let out = courses
        .into_iter()
        .map(|course| {
            let tags: Vec<UnitTag> = units
                .iter()
                .filter(|u| u.course_id == course.id)
                .map(|u| UnitTag { unit_id: u.id, has_video: u.has_video() })
                .collect();
            let time_samples: Vec<UnitSample> = time_rows
                .iter()
                .filter(|r| r.course_id == course.id)
                .map(|r| UnitSample { unit_id: r.unit_id, value: r.time_spent_secs as f64 })
                .collect();
            let scroll_samples: Vec<UnitSample> = scroll_rows
                .iter()
                .filter(|r| r.course_id == course.id)
                .map(|r| UnitSample { unit_id: r.unit_id, value: r.scroll_percentage })
                .collect();

            let time = analytics::split_averages(&tags, &time_samples);
            let scroll = analytics::split_averages(&tags, &scroll_samples);

            CourseAveragesRes {
                course_id: course.id,
                course_title: course.title,
                time_video_avg: time.video,
                time_non_video_avg: time.non_video,
                scroll_video_avg: scroll.video,
                scroll_non_video_avg: scroll.non_video,
            }
        })
        .collect();

    Ok(Json(out))
}

// --- helpers ---

async fn require_course(state: &AppState, course_id: Uuid) -> Result<(), AppError> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(&state.db)
        .await?;
    found.map(|_| ()).ok_or(AppError::NotFound("course"))
}

async fn require_unit(state: &AppState, course_id: Uuid, unit_id: Uuid) -> Result<(), AppError> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM units WHERE id = $1 AND course_id = $2")
            .bind(unit_id)
            .bind(course_id)
            .fetch_optional(&state.db)
            .await?;
    found.map(|_| ()).ok_or(AppError::NotFound("unit"))
}
