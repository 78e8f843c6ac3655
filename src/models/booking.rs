use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use validator::Validate;

// Seat status per schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SeatStatus {
    Available,
    Held,
    Booked,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ScheduleSeat {
    pub schedule_id: i32,
    pub seat_id: i32,
    pub status: String,
    pub held_by: Option<i32>,
    pub held_until: Option<NaiveDateTime>,
    pub version: i32,
}

impl ScheduleSeat {
    /// Whether `user_id` may take this seat at `now`: free, an expired hold, or already theirs.
    pub fn is_holdable_by(&self, user_id: i32, now: NaiveDateTime) -> bool {
        match self.status.parse::<SeatStatus>() {
            Ok(SeatStatus::Available) => true,
            Ok(SeatStatus::Held) => {
                self.held_by == Some(user_id) || self.held_until.map_or(true, |until| until <= now)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct HoldSeatsRequest {
    pub schedule_id: i32,
    #[validate(length(min = 1, message = "select at least one seat"))]
    pub seat_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct SelectedSeat {
    pub seat_id: i32,
    pub section: String,
    pub row_label: String,
    pub seat_number: i32,
    pub grade_name: String,
    pub price: Decimal,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SeatSelection {
    pub schedule_id: i32,
    pub seats: Vec<SelectedSeat>,
    pub total_price: Decimal,
    pub held_until: Option<NaiveDateTime>,
}

impl SeatSelection {
    pub fn new(schedule_id: i32, seats: Vec<SelectedSeat>, held_until: Option<NaiveDateTime>) -> Self {
        let total_price = seats.iter().map(|s| s.price).sum();
        SeatSelection {
            schedule_id,
            seats,
            total_price,
            held_until,
        }
    }
}
