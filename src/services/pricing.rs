//! Coupon discount rules and price breakdowns.
//!
//! Everything here is pure so the coupon service can load rows, call in and
//! persist the result.

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;
use std::fmt;

use crate::models::coupon::{Coupon, DiscountType, PriceBreakdown, PriceLine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    Inactive,
    NotYetValid,
    Expired,
    OtherPerformance,
    BelowMinimum(Decimal),
    AlreadyUsed,
    AppliedTwice,
    UnknownType(String),
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponRejection::Inactive => write!(f, "is no longer available"),
            CouponRejection::NotYetValid => write!(f, "cannot be used yet"),
            CouponRejection::Expired => write!(f, "has expired"),
            CouponRejection::OtherPerformance => write!(f, "does not apply to this performance"),
            CouponRejection::BelowMinimum(min) => {
                write!(f, "requires a seat price of at least {}", min)
            }
            CouponRejection::AlreadyUsed => write!(f, "has already been used"),
            CouponRejection::AppliedTwice => write!(f, "can only be applied to one seat"),
            CouponRejection::UnknownType(t) => write!(f, "has an unknown discount type {}", t),
        }
    }
}

/// Discount `coupon` grants on one seat priced `price`.
///
/// Percent discounts are truncated to whole currency units and capped by
/// `max_discount`; no discount exceeds the seat price.
pub fn coupon_discount(
    coupon: &Coupon,
    price: Decimal,
    performance_id: i32,
    now: NaiveDateTime,
) -> Result<Decimal, CouponRejection> {
    if !coupon.active {
        return Err(CouponRejection::Inactive);
    }
    if now < coupon.valid_from {
        return Err(CouponRejection::NotYetValid);
    }
    if now > coupon.valid_until {
        return Err(CouponRejection::Expired);
    }
    if matches!(coupon.performance_id, Some(id) if id != performance_id) {
        return Err(CouponRejection::OtherPerformance);
    }
    if price < coupon.min_price {
        return Err(CouponRejection::BelowMinimum(coupon.min_price));
    }

    let discount_type: DiscountType = coupon
        .discount_type
        .parse()
        .map_err(|_| CouponRejection::UnknownType(coupon.discount_type.clone()))?;

    let mut discount = match discount_type {
        DiscountType::Fixed => coupon.discount_value,
        DiscountType::Percent => (price * coupon.discount_value / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::ToZero),
    };
    if let Some(max) = coupon.max_discount {
        discount = discount.min(max);
    }
    Ok(discount.min(price).max(Decimal::ZERO))
}

/// Tracks coupons already placed on a seat within one quote.
#[derive(Debug, Default)]
pub struct CouponUsage {
    used: HashSet<i32>,
}

impl CouponUsage {
    pub fn claim(&mut self, coupon_id: i32) -> Result<(), CouponRejection> {
        if self.used.insert(coupon_id) {
            Ok(())
        } else {
            Err(CouponRejection::AppliedTwice)
        }
    }
}

pub fn price_line(
    seat_id: i32,
    seat_label: String,
    grade_name: String,
    price: Decimal,
    coupon: Option<(&Coupon, Decimal)>,
) -> PriceLine {
    let discount = coupon.map(|(_, d)| d).unwrap_or(Decimal::ZERO);
    PriceLine {
        seat_id,
        seat_label,
        grade_name,
        price,
        coupon_id: coupon.map(|(c, _)| c.id),
        coupon_name: coupon.map(|(c, _)| c.name.clone()),
        discount,
        final_price: price - discount,
    }
}

pub fn breakdown(schedule_id: i32, lines: Vec<PriceLine>) -> PriceBreakdown {
    let total_price: Decimal = lines.iter().map(|l| l.price).sum();
    let discount_amount: Decimal = lines.iter().map(|l| l.discount).sum();
    PriceBreakdown {
        schedule_id,
        lines,
        total_price,
        discount_amount,
        final_price: total_price - discount_amount,
    }
}
