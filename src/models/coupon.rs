use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum DiscountType {
    /// Flat amount off the seat price.
    Fixed,
    /// Percentage of the seat price, optionally capped by `max_discount`.
    Percent,
}

#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub min_price: Decimal,
    pub max_discount: Option<Decimal>,
    pub performance_id: Option<i32>,
    pub valid_from: NaiveDateTime,
    pub valid_until: NaiveDateTime,
    pub active: bool,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_coupon_request"))]
pub struct CouponRequest {
    #[validate(length(min = 3, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_price: Decimal,
    pub max_discount: Option<Decimal>,
    pub performance_id: Option<i32>,
    pub valid_from: NaiveDateTime,
    pub valid_until: NaiveDateTime,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn validate_coupon_request(request: &CouponRequest) -> Result<(), ValidationError> {
    let invalid = |code: &'static str, message: &'static str| {
        let mut err = ValidationError::new(code);
        err.message = Some(message.into());
        Err(err)
    };

    if request.discount_value <= Decimal::ZERO {
        return invalid("discount_value", "discount_value must be positive");
    }
    if request.discount_type == DiscountType::Percent && request.discount_value > Decimal::ONE_HUNDRED {
        return invalid("discount_value", "percent discount cannot exceed 100");
    }
    if request.min_price < Decimal::ZERO {
        return invalid("min_price", "min_price cannot be negative");
    }
    if matches!(request.max_discount, Some(max) if max <= Decimal::ZERO) {
        return invalid("max_discount", "max_discount must be positive");
    }
    if request.valid_until <= request.valid_from {
        return invalid("validity", "valid_until must be after valid_from");
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SeatCouponRequest {
    pub seat_id: i32,
    pub coupon_id: Option<i32>,
}

/// Seats of a held selection, each with an optional coupon.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct CouponValidationRequest {
    pub schedule_id: i32,
    #[validate(length(min = 1, message = "select at least one seat"))]
    pub seats: Vec<SeatCouponRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PriceLine {
    pub seat_id: i32,
    pub seat_label: String,
    pub grade_name: String,
    pub price: Decimal,
    pub coupon_id: Option<i32>,
    pub coupon_name: Option<String>,
    pub discount: Decimal,
    pub final_price: Decimal,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PriceBreakdown {
    pub schedule_id: i32,
    pub lines: Vec<PriceLine>,
    pub total_price: Decimal,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
}
