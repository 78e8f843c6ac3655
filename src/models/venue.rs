use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Venue {
    pub id: i32,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct VenueRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct SeatGrade {
    pub id: i32,
    pub venue_id: i32,
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct SeatGradeRequest {
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    pub price: Decimal,
}

/// A rectangular block of seats of one grade: `rows` rows labelled from
/// `first_row` onwards, each holding `seats_per_row` seats numbered from 1.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct SeatBlockRequest {
    pub grade_id: i32,
    #[validate(length(min = 1, max = 32))]
    pub section: String,
    #[validate(range(min = 1, max = 52))]
    pub rows: u32,
    #[validate(range(min = 1, max = 200))]
    pub seats_per_row: u32,
    /// Zero-based index of the first row label (0 = "A", 701 = "ZZ").
    #[serde(default)]
    #[validate(range(max = 701))]
    pub first_row: u32,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SeatBlockResponse {
    pub venue_id: i32,
    pub created: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct VenueDetail {
    pub venue: Venue,
    pub grades: Vec<SeatGrade>,
    pub seat_count: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ChartSeat {
    pub seat_id: i32,
    pub section: String,
    pub row_label: String,
    pub seat_number: i32,
    pub grade_id: i32,
    pub grade_name: String,
    pub price: Decimal,
    pub available: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SeatingChart {
    pub schedule_id: i32,
    pub performance_id: i32,
    pub venue_id: i32,
    pub grades: Vec<SeatGrade>,
    pub available_count: usize,
    pub seats: Vec<ChartSeat>,
}

// Row labels run A..Z, then AA, AB, ...
pub fn row_label(index: u32) -> String {
    let mut n = u64::from(index) + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        label.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    label.iter().rev().collect()
}

/// Human readable seat name, e.g. `Floor A-12`.
pub fn seat_label(section: &str, row_label: &str, seat_number: i32) -> String {
    format!("{} {}-{}", section, row_label, seat_number)
}
