use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use validator::Validate;

use crate::models::coupon::{PriceLine, SeatCouponRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pending,
    Paid,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Reservation {
    pub id: i32,
    pub merchant_uid: String,
    pub user_id: i32,
    pub schedule_id: i32,
    pub status: String,
    pub total_price: Decimal,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
    pub payment_key: Option<String>,
    pub created_at: NaiveDateTime,
    pub paid_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
}

impl Reservation {
    pub fn status(&self) -> ReservationStatus {
        self.status.parse().unwrap_or(ReservationStatus::Failed)
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct PaymentPrepareRequest {
    pub schedule_id: i32,
    #[validate(length(min = 1, message = "select at least one seat"))]
    pub seats: Vec<SeatCouponRequest>,
}

/// What the client hands to the payment gateway popup.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PaymentOrder {
    pub reservation_id: i32,
    pub merchant_uid: String,
    pub order_name: String,
    pub amount: Decimal,
    pub buyer_name: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct PaymentCompleteRequest {
    #[validate(length(min = 1, max = 64))]
    pub merchant_uid: String,
    /// Gateway payment id returned to the popup; omitted for zero-amount orders.
    #[validate(length(min = 1, max = 128))]
    pub payment_key: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PaymentConfirmation {
    pub reservation_id: i32,
    pub merchant_uid: String,
    pub status: ReservationStatus,
    pub performance_title: String,
    pub venue_name: String,
    pub starts_at: NaiveDateTime,
    pub tickets: Vec<PriceLine>,
    pub total_price: Decimal,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
    pub paid_at: Option<NaiveDateTime>,
}
