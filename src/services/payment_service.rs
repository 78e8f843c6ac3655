use crate::config::{AuthConfig, BookingConfig};
use crate::models::booking::SeatStatus;
use crate::models::payment::{
    PaymentCompleteRequest, PaymentConfirmation, PaymentOrder, PaymentPrepareRequest,
    Reservation, ReservationStatus,
};
use crate::services::booking_service::BookingService;
use crate::services::coupon_service::CouponService;
use crate::services::payment_gateway::{GatewayError, PaymentGateway};
use crate::services::performance_service::PerformanceService;
use crate::services::reservation_service::ReservationService;
use crate::services::user_service::UserService;
use crate::utils::error::{AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct PaymentService {
    pool: MySqlPool,
    gateway: Arc<dyn PaymentGateway>,
    booking_service: BookingService,
    coupon_service: CouponService,
    performance_service: PerformanceService,
    reservation_service: ReservationService,
    user_service: UserService,
}

impl PaymentService {
    pub fn new(
        pool: MySqlPool,
        gateway: Arc<dyn PaymentGateway>,
        booking: BookingConfig,
        auth: AuthConfig,
    ) -> Self {
        PaymentService {
            booking_service: BookingService::new(pool.clone(), booking.clone()),
            coupon_service: CouponService::new(pool.clone(), booking),
            performance_service: PerformanceService::new(pool.clone()),
            reservation_service: ReservationService::new(pool.clone(), gateway.clone()),
            user_service: UserService::new(pool.clone(), auth),
            pool,
            gateway,
        }
    }

    /// Snapshot the quoted selection into a pending reservation and register the
    /// amount with the gateway. Older pending orders of the user on the same schedule are dropped.
    pub async fn prepare_payment(&self, user_id: i32, request: PaymentPrepareRequest) -> AppResult<PaymentOrder> {
        request.validate()?;

        // Totals always come from a fresh quote, never from the client
        let quote = self
            .coupon_service
            .quote(user_id, request.schedule_id, &request.seats)
            .await?;
        let context = self
            .performance_service
            .schedule_context(request.schedule_id)
            .await?;
        let buyer = self.user_service.get_profile(user_id).await?;

        let merchant_uid = format!("order_{}", Uuid::new_v4().simple());
        let now = chrono::Utc::now().naive_utc();
        let held_until = now + self.booking_service.hold_window();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE reservation SET status = ?, cancelled_at = ? WHERE user_id = ? AND schedule_id = ? AND status = ?",
        )
        .bind(ReservationStatus::Cancelled.to_string())
        .bind(now)
        .bind(user_id)
        .bind(request.schedule_id)
        .bind(ReservationStatus::Pending.to_string())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO reservation
            (merchant_uid, user_id, schedule_id, status, total_price, discount_amount,
                final_price, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&merchant_uid)
        .bind(user_id)
        .bind(request.schedule_id)
        .bind(ReservationStatus::Pending.to_string())
        .bind(quote.total_price)
        .bind(quote.discount_amount)
        .bind(quote.final_price)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let reservation_id = result.last_insert_id() as i32;

        for line in &quote.lines {
            sqlx::query(
                r#"
                INSERT INTO reservation_seat
                (reservation_id, seat_id, seat_label, grade_name, price, coupon_id, discount)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(reservation_id)
            .bind(line.seat_id)
            .bind(&line.seat_label)
            .bind(&line.grade_name)
            .bind(line.price)
            .bind(line.coupon_id)
            .bind(line.discount)
            .execute(&mut *tx)
            .await?;

            // keep the seats while the gateway popup is open
            let extended = sqlx::query(
                r#"
                UPDATE schedule_seat
                SET held_until = ?, version = version + 1
                WHERE schedule_id = ? AND seat_id = ? AND held_by = ? AND status = ? AND held_until > ?
                "#,
            )
            .bind(held_until)
            .bind(request.schedule_id)
            .bind(line.seat_id)
            .bind(user_id)
            .bind(SeatStatus::Held.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if extended.rows_affected() != 1 {
                tx.rollback().await?;
                return Err(AppError::Conflict(format!(
                    "Seat {} is no longer held for you, select it again",
                    line.seat_label
                )));
            }
        }

        tx.commit().await?;

        if quote.final_price > Decimal::ZERO {
            if let Err(e) = self.gateway.prepare(&merchant_uid, quote.final_price).await {
                self.reservation_service
                    .fail(reservation_id, None, "gateway prepare failed")
                    .await?;
                return Err(AppError::PaymentError(e.to_string()));
            }
        }

        tracing::info!(
            user_id,
            reservation_id,
            %merchant_uid,
            amount = %quote.final_price,
            "payment prepared"
        );

        let ticket_count = quote.lines.len();
        Ok(PaymentOrder {
            reservation_id,
            merchant_uid,
            order_name: format!("{} x{}", context.performance_title, ticket_count),
            amount: quote.final_price,
            buyer_name: buyer.name,
        })
    }

    /// Verify the gateway payment and turn the held seats into bookings.
    pub async fn complete_payment(&self, user_id: i32, request: PaymentCompleteRequest) -> AppResult<PaymentConfirmation> {
        request.validate()?;

        let reservation = self
            .reservation_service
            .find_by_merchant_uid(user_id, &request.merchant_uid)
            .await?;

        match reservation.status() {
            ReservationStatus::Pending => {}
            ReservationStatus::Paid if reservation.payment_key == request.payment_key => {
                return self.reservation_service.confirmation(&reservation).await;
            }
            status => {
                // the order was closed while the popup was open; money taken for it goes back
                let refunded = match request.payment_key.as_deref() {
                    Some(key) if reservation.payment_key.as_deref() != Some(key) => {
                        self.refund_stray_payment(&reservation, key).await
                    }
                    _ => false,
                };
                if refunded {
                    return Err(AppError::Conflict(format!(
                        "Reservation is {}, the payment has been refunded",
                        status
                    )));
                }
                return Err(AppError::Conflict(format!("Reservation is {}", status)));
            }
        }

        let payment_key = if reservation.final_price > Decimal::ZERO {
            let key = request
                .payment_key
                .as_deref()
                .ok_or_else(|| AppError::ValidationError("payment_key is required".into()))?;

            let payment = match self.gateway.verify(key, &reservation.merchant_uid).await {
                Ok(payment) => payment,
                Err(e @ GatewayError::Unavailable(_)) => {
                    // leave the order pending so the client can retry
                    return Err(AppError::PaymentError(e.to_string()));
                }
                Err(e) => {
                    self.reservation_service
                        .fail(reservation.id, None, &e.to_string())
                        .await?;
                    return Err(AppError::PaymentError(e.to_string()));
                }
            };

            if payment.merchant_uid != reservation.merchant_uid {
                // the key pays for a different order, which must not be refunded from here
                tracing::warn!(
                    reservation_id = reservation.id,
                    paid_for = %payment.merchant_uid,
                    "payment key belongs to another order"
                );
                self.reservation_service
                    .fail(reservation.id, None, "payment belongs to another order")
                    .await?;
                return Err(AppError::PaymentError(
                    "Payment does not belong to this order".into(),
                ));
            }

            if payment.amount != reservation.final_price {
                tracing::warn!(
                    reservation_id = reservation.id,
                    expected = %reservation.final_price,
                    paid = %payment.amount,
                    "paid amount mismatch"
                );
                self.reservation_service
                    .fail(reservation.id, Some(key), "paid amount mismatch")
                    .await?;
                return Err(AppError::PaymentError(
                    "Paid amount does not match the order total".into(),
                ));
            }
            Some(key.to_string())
        } else {
            None
        };

        if let Err(e) = self
            .book_reservation(user_id, reservation.id, reservation.schedule_id, payment_key.as_deref())
            .await
        {
            // a concurrent completion of the same payment already booked it
            let current = self
                .reservation_service
                .get_reservation(user_id, reservation.id)
                .await?;
            if current.status() == ReservationStatus::Paid && current.payment_key == payment_key {
                return self.reservation_service.confirmation(&current).await;
            }
            self.reservation_service
                .fail(reservation.id, payment_key.as_deref(), "booking failed after payment")
                .await?;
            return Err(e);
        }

        tracing::info!(
            user_id,
            reservation_id = reservation.id,
            amount = %reservation.final_price,
            "payment completed"
        );
        let paid = self
            .reservation_service
            .get_reservation(user_id, reservation.id)
            .await?;
        self.reservation_service.confirmation(&paid).await
    }

    /// Refund a verified payment made for `reservation` after it stopped being pending.
    async fn refund_stray_payment(&self, reservation: &Reservation, payment_key: &str) -> bool {
        let payment = match self.gateway.verify(payment_key, &reservation.merchant_uid).await {
            Ok(payment) if payment.merchant_uid == reservation.merchant_uid => payment,
            Ok(_) => return false,
            Err(e) => {
                tracing::debug!(reservation_id = reservation.id, error = %e, "no payment to refund");
                return false;
            }
        };

        match self.gateway.cancel(&payment.payment_key, "order is no longer pending").await {
            Ok(()) => {
                tracing::warn!(
                    reservation_id = reservation.id,
                    payment_key,
                    amount = %payment.amount,
                    "refunded payment for a closed order"
                );
                true
            }
            Err(e) => {
                tracing::error!(reservation_id = reservation.id, payment_key, error = %e, "refund failed");
                false
            }
        }
    }

    async fn book_reservation(
        &self,
        user_id: i32,
        reservation_id: i32,
        schedule_id: i32,
        payment_key: Option<&str>,
    ) -> AppResult<()> {
        let seats: Vec<(i32, String, Option<i32>)> = sqlx::query_as(
            "SELECT seat_id, seat_label, coupon_id FROM reservation_seat WHERE reservation_id = ?",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        let now = chrono::Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        for (seat_id, seat_label, coupon_id) in &seats {
            let booked = sqlx::query(
                r#"
                UPDATE schedule_seat
                SET status = ?, held_by = NULL, held_until = NULL, version = version + 1
                WHERE schedule_id = ? AND seat_id = ? AND held_by = ? AND status = ?
                "#,
            )
            .bind(SeatStatus::Booked.to_string())
            .bind(schedule_id)
            .bind(seat_id)
            .bind(user_id)
            .bind(SeatStatus::Held.to_string())
            .execute(&mut *tx)
            .await?;

            if booked.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(AppError::Conflict(format!(
                    "Seat {} is no longer held for you",
                    seat_label
                )));
            }

            if let Some(coupon_id) = coupon_id {
                let redeemed = sqlx::query(
                    "INSERT INTO coupon_redemption (coupon_id, user_id, reservation_id, redeemed_at) VALUES (?, ?, ?, ?)",
                )
                .bind(coupon_id)
                .bind(user_id)
                .bind(reservation_id)
                .bind(now)
                .execute(&mut *tx)
                .await;

                if let Err(e) = redeemed {
                    tx.rollback().await?;
                    if is_unique_violation(&e) {
                        return Err(AppError::Unprocessable(
                            "Coupon has already been used".into(),
                        ));
                    }
                    return Err(e.into());
                }
            }
        }

        let paid = sqlx::query(
            "UPDATE reservation SET status = ?, payment_key = ?, paid_at = ? WHERE id = ? AND status = ?",
        )
        .bind(ReservationStatus::Paid.to_string())
        .bind(payment_key)
        .bind(now)
        .bind(reservation_id)
        .bind(ReservationStatus::Pending.to_string())
        .execute(&mut *tx)
        .await?;
        if paid.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict("Reservation changed concurrently".into()));
        }

        tx.commit().await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
