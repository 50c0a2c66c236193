use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Unit {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub body: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl Unit {
    pub fn has_video(&self) -> bool {
        self.video_url.is_some()
    }
}

// Not Serialize: the hash must never reach a response body.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub uuid: Uuid,
    pub subscription: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub uuid: Uuid,
    pub subscription: String,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            uuid: user.uuid,
            subscription: user.subscription,
            date_joined: user.date_joined,
        }
    }
}

/// One row per (user, unit); repeat visits never add rows.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct ViewEvent {
    pub id: Uuid,
    pub user_id: i64,
    pub course_id: Uuid,
    pub unit_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

/// One row per (user, course, unit); repeat logging accumulates seconds.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct TimeSpentRecord {
    pub id: Uuid,
    pub user_id: i64,
    pub course_id: Uuid,
    pub unit_id: Uuid,
    pub video_included: bool,
    pub time_spent_secs: i64,
    pub date: DateTime<Utc>,
}

/// Logically one row per (user, unit); duplicates may exist between a
/// logging burst and the next consolidation pass.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct ScrollRecord {
    pub id: Uuid,
    pub user_id: i64,
    pub course_id: Uuid,
    pub unit_id: Uuid,
    pub scroll_percentage: f64,
    pub video_included: bool,
    pub date: DateTime<Utc>,
}

/// Curated reference data; `average` holds the inclusive [min, max] range.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct FeedbackTemplate {
    pub id: i64,
    pub category: String,
    pub average: Vec<f64>,
    pub first_part: String,
    pub second_part: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterReq {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerifyIdReq {
    pub uuid: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogViewReq {
    pub course_id: Uuid,
    pub unit_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogTimeSpentReq {
    pub course_id: Uuid,
    pub unit_id: Uuid,
    pub video_included: bool,
    pub time_spent_secs: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogScrollReq {
    pub course_id: Uuid,
    pub unit_id: Uuid,
    pub scroll_percentage: f64,
    pub video_included: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConsolidateScrollReq {
    pub course_id: Uuid,
    pub unit_id: Uuid,
}

#[derive(Serialize, Debug, Clone)]
pub struct FeedbackMessages {
    pub time_video: String,
    pub time_non_video: String,
    pub scroll_video: String,
    pub scroll_non_video: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct AnalyticsSummary {
    pub time_video_avg: f64,
    pub time_non_video_avg: f64,
    pub scroll_video_avg: f64,
    pub scroll_non_video_avg: f64,
    pub progress_percent: i64,
    pub messages: FeedbackMessages,
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseAnalyticsRes {
    pub activities: Vec<ViewEvent>,
    pub time_spent: Vec<TimeSpentRecord>,
    pub scroll_percentages: Vec<ScrollRecord>,
    pub summary: AnalyticsSummary,
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseAveragesRes {
    pub course_id: Uuid,
    pub course_title: String,
    pub time_video_avg: f64,
    pub time_non_video_avg: f64,
    pub scroll_video_avg: f64,
    pub scroll_non_video_avg: f64,
}
