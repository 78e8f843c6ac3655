use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::venue::{SeatGrade, Venue};

#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Performance {
    pub id: i32,
    pub company_id: i32,
    pub venue_id: i32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub running_minutes: i32,
    pub age_rating: String,
    pub poster_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_run_dates"))]
pub struct PerformanceRequest {
    pub company_id: i32,
    pub venue_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 32))]
    pub category: String,
    #[validate(range(min = 1, max = 1440))]
    pub running_minutes: i32,
    #[validate(length(min = 1, max = 32))]
    pub age_rating: String,
    #[validate(url)]
    pub poster_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn validate_run_dates(request: &PerformanceRequest) -> Result<(), ValidationError> {
    if request.end_date < request.start_date {
        let mut err = ValidationError::new("run_dates");
        err.message = Some("end_date must not be before start_date".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct PerformanceQuery {
    pub category: Option<String>,
    pub keyword: Option<String>,
}

// Listing row, price range comes from the venue's grades
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct PerformanceSummary {
    pub id: i32,
    pub title: String,
    pub category: String,
    pub poster_url: Option<String>,
    pub venue_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PerformanceDetail {
    pub performance: Performance,
    pub venue: Venue,
    pub grades: Vec<SeatGrade>,
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Schedule {
    pub id: i32,
    pub performance_id: i32,
    pub starts_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScheduleRequest {
    pub starts_at: NaiveDateTime,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ScheduleCreated {
    pub schedule: Schedule,
    pub seat_count: u64,
}

// Joined view used by booking and payment snapshots
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleContext {
    pub schedule_id: i32,
    pub starts_at: NaiveDateTime,
    pub performance_id: i32,
    pub performance_title: String,
    pub venue_id: i32,
    pub venue_name: String,
}
