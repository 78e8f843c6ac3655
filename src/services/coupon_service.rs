use crate::config::BookingConfig;
use crate::models::coupon::{Coupon, CouponRequest, CouponValidationRequest, PriceBreakdown, SeatCouponRequest};
use crate::models::venue::seat_label;
use crate::services::booking_service::BookingService;
use crate::services::performance_service::PerformanceService;
use crate::services::pricing::{self, CouponRejection, CouponUsage};
use crate::utils::error::{AppError, AppResult};
use sqlx::MySqlPool;
use std::collections::{HashMap, HashSet};
use validator::Validate;

const COUPON_COLUMNS: &str = "id, code, name, discount_type, discount_value, min_price, \
    max_discount, performance_id, valid_from, valid_until, active";

#[derive(Clone)]
pub struct CouponService {
    pool: MySqlPool,
    booking_service: BookingService,
    performance_service: PerformanceService,
}

impl CouponService {
    pub fn new(pool: MySqlPool, booking: BookingConfig) -> Self {
        CouponService {
            booking_service: BookingService::new(pool.clone(), booking),
            performance_service: PerformanceService::new(pool.clone()),
            pool,
        }
    }

    pub async fn create_coupon(&self, request: CouponRequest) -> AppResult<Coupon> {
        request.validate()?;
        let code = request.code.trim().to_uppercase();
        self.ensure_unique_code(&code, None).await?;
        if let Some(performance_id) = request.performance_id {
            self.performance_service.get_performance(performance_id).await?;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO coupon
            (code, name, discount_type, discount_value, min_price, max_discount,
                performance_id, valid_from, valid_until, active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&code)
        .bind(&request.name)
        .bind(request.discount_type.to_string())
        .bind(request.discount_value)
        .bind(request.min_price)
        .bind(request.max_discount)
        .bind(request.performance_id)
        .bind(request.valid_from)
        .bind(request.valid_until)
        .bind(request.active)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i32;
        tracing::info!(coupon_id = id, %code, "coupon created");
        self.get_coupon(id).await
    }

    pub async fn list_coupons(&self) -> AppResult<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupon ORDER BY valid_until DESC, id",
            COUPON_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(coupons)
    }

    pub async fn get_coupon(&self, id: i32) -> AppResult<Coupon> {
        self.find_coupon(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Coupon not found".into()))
    }

    async fn find_coupon(&self, id: i32) -> AppResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupon WHERE id = ?",
            COUPON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(coupon)
    }

    pub async fn update_coupon(&self, id: i32, request: CouponRequest) -> AppResult<Coupon> {
        request.validate()?;
        self.get_coupon(id).await?;
        let code = request.code.trim().to_uppercase();
        self.ensure_unique_code(&code, Some(id)).await?;
        if let Some(performance_id) = request.performance_id {
            self.performance_service.get_performance(performance_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE coupon
            SET code = ?, name = ?, discount_type = ?, discount_value = ?, min_price = ?,
                max_discount = ?, performance_id = ?, valid_from = ?, valid_until = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(&code)
        .bind(&request.name)
        .bind(request.discount_type.to_string())
        .bind(request.discount_value)
        .bind(request.min_price)
        .bind(request.max_discount)
        .bind(request.performance_id)
        .bind(request.valid_from)
        .bind(request.valid_until)
        .bind(request.active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_coupon(id).await
    }

    // Coupons are deactivated rather than deleted, redemptions keep pointing at them
    pub async fn deactivate_coupon(&self, id: i32) -> AppResult<Coupon> {
        self.get_coupon(id).await?;
        sqlx::query("UPDATE coupon SET active = FALSE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::info!(coupon_id = id, "coupon deactivated");
        self.get_coupon(id).await
    }

    /// Coupons the user can still apply, optionally narrowed to one performance.
    pub async fn available_coupons(&self, user_id: i32, performance_id: Option<i32>) -> AppResult<Vec<Coupon>> {
        let now = chrono::Utc::now().naive_utc();
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            r#"
            SELECT {} FROM coupon c
            WHERE c.active = TRUE
            AND c.valid_from <= ?
            AND c.valid_until >= ?
            AND (c.performance_id IS NULL OR ? IS NULL OR c.performance_id = ?)
            AND NOT EXISTS (
                SELECT 1 FROM coupon_redemption r
                WHERE r.coupon_id = c.id AND r.user_id = ?
            )
            ORDER BY c.valid_until, c.id
            "#,
            COUPON_COLUMNS
        ))
        .bind(now)
        .bind(now)
        .bind(performance_id)
        .bind(performance_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(coupons)
    }

    pub async fn validate_coupons(&self, user_id: i32, request: CouponValidationRequest) -> AppResult<PriceBreakdown> {
        request.validate()?;
        self.quote(user_id, request.schedule_id, &request.seats).await
    }

    /// Price the user's held seats with the requested coupons applied.
    ///
    /// Every seat must be held by the user; a coupon discounts at most one
    /// seat and only if the user has not redeemed it before.
    pub async fn quote(
        &self,
        user_id: i32,
        schedule_id: i32,
        seats: &[SeatCouponRequest],
    ) -> AppResult<PriceBreakdown> {
        if seats.is_empty() {
            return Err(AppError::ValidationError("select at least one seat".into()));
        }
        let requested: HashSet<i32> = seats.iter().map(|s| s.seat_id).collect();
        if requested.len() != seats.len() {
            return Err(AppError::ValidationError("seats contains duplicates".into()));
        }

        let context = self.performance_service.schedule_context(schedule_id).await?;
        let selection = self.booking_service.get_selection(user_id, schedule_id).await?;
        let held: HashMap<i32, _> = selection
            .seats
            .into_iter()
            .map(|seat| (seat.seat_id, seat))
            .collect();

        let now = chrono::Utc::now().naive_utc();
        let mut usage = CouponUsage::default();
        let mut lines = Vec::with_capacity(seats.len());

        for request in seats {
            let seat = held.get(&request.seat_id).ok_or_else(|| {
                AppError::Conflict(format!(
                    "Seat {} is not held by you, select it again",
                    request.seat_id
                ))
            })?;
            let label = seat_label(&seat.section, &seat.row_label, seat.seat_number);

            let line = match request.coupon_id {
                None => pricing::price_line(seat.seat_id, label, seat.grade_name.clone(), seat.price, None),
                Some(coupon_id) => {
                    let coupon = self.find_coupon(coupon_id).await?.ok_or_else(|| {
                        AppError::Unprocessable(format!("Coupon {} does not exist", coupon_id))
                    })?;
                    let reject = |rejection: CouponRejection| {
                        AppError::Unprocessable(format!("Coupon '{}' {}", coupon.name, rejection))
                    };

                    if self.is_redeemed(coupon.id, user_id).await? {
                        return Err(reject(CouponRejection::AlreadyUsed));
                    }
                    usage.claim(coupon.id).map_err(reject)?;
                    let discount = pricing::coupon_discount(&coupon, seat.price, context.performance_id, now)
                        .map_err(reject)?;

                    pricing::price_line(
                        seat.seat_id,
                        label,
                        seat.grade_name.clone(),
                        seat.price,
                        Some((&coupon, discount)),
                    )
                }
            };
            lines.push(line);
        }

        let breakdown = pricing::breakdown(schedule_id, lines);
        tracing::debug!(
            user_id,
            schedule_id,
            total = %breakdown.total_price,
            discount = %breakdown.discount_amount,
            "quote computed"
        );
        Ok(breakdown)
    }

    async fn is_redeemed(&self, coupon_id: i32, user_id: i32) -> AppResult<bool> {
        let redeemed = sqlx::query("SELECT 1 FROM coupon_redemption WHERE coupon_id = ? AND user_id = ?")
            .bind(coupon_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(redeemed.is_some())
    }

    async fn ensure_unique_code(&self, code: &str, except_id: Option<i32>) -> AppResult<()> {
        let existing: Option<(i32,)> = sqlx::query_as("SELECT id FROM coupon WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        match existing {
            Some((id,)) if Some(id) != except_id => {
                Err(AppError::Conflict(format!("Coupon code {} already exists", code)))
            }
            _ => Ok(()),
        }
    }
}
