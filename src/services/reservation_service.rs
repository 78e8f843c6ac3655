use crate::models::booking::SeatStatus;
use crate::models::coupon::PriceLine;
use crate::models::payment::{PaymentConfirmation, Reservation, ReservationStatus};
use crate::services::payment_gateway::PaymentGateway;
use crate::services::performance_service::PerformanceService;
use crate::utils::error::{AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use std::sync::Arc;

pub(crate) const RESERVATION_COLUMNS: &str = "id, merchant_uid, user_id, schedule_id, status, \
    total_price, discount_amount, final_price, payment_key, created_at, paid_at, cancelled_at";

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    seat_id: i32,
    seat_label: String,
    grade_name: String,
    price: Decimal,
    coupon_id: Option<i32>,
    coupon_name: Option<String>,
    discount: Decimal,
}

#[derive(Clone)]
pub struct ReservationService {
    pool: MySqlPool,
    gateway: Arc<dyn PaymentGateway>,
    performance_service: PerformanceService,
}

impl ReservationService {
    pub fn new(pool: MySqlPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        ReservationService {
            performance_service: PerformanceService::new(pool.clone()),
            pool,
            gateway,
        }
    }

    pub async fn find_by_merchant_uid(&self, user_id: i32, merchant_uid: &str) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservation WHERE merchant_uid = ? AND user_id = ?",
            RESERVATION_COLUMNS
        ))
        .bind(merchant_uid)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".into()))
    }

    pub async fn get_reservation(&self, user_id: i32, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservation WHERE id = ? AND user_id = ?",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".into()))
    }

    pub async fn my_reservations(&self, user_id: i32) -> AppResult<Vec<PaymentConfirmation>> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservation WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            RESERVATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut confirmations = Vec::with_capacity(reservations.len());
        for reservation in &reservations {
            confirmations.push(self.confirmation(reservation).await?);
        }
        Ok(confirmations)
    }

    pub async fn get_confirmation(&self, user_id: i32, id: i32) -> AppResult<PaymentConfirmation> {
        let reservation = self.get_reservation(user_id, id).await?;
        self.confirmation(&reservation).await
    }

    /// Ticket details and price breakdown as stored when payment was prepared.
    pub async fn confirmation(&self, reservation: &Reservation) -> AppResult<PaymentConfirmation> {
        let context = self
            .performance_service
            .schedule_context(reservation.schedule_id)
            .await?;

        let tickets = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT
                rs.seat_id,
                rs.seat_label,
                rs.grade_name,
                rs.price,
                rs.coupon_id,
                c.name AS coupon_name,
                rs.discount
            FROM reservation_seat rs
            LEFT JOIN coupon c ON c.id = rs.coupon_id
            WHERE rs.reservation_id = ?
            ORDER BY rs.seat_label
            "#,
        )
        .bind(reservation.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| PriceLine {
            seat_id: row.seat_id,
            seat_label: row.seat_label,
            grade_name: row.grade_name,
            price: row.price,
            coupon_id: row.coupon_id,
            coupon_name: row.coupon_name,
            discount: row.discount,
            final_price: row.price - row.discount,
        })
        .collect();

        Ok(PaymentConfirmation {
            reservation_id: reservation.id,
            merchant_uid: reservation.merchant_uid.clone(),
            status: reservation.status(),
            performance_title: context.performance_title,
            venue_name: context.venue_name,
            starts_at: context.starts_at,
            tickets,
            total_price: reservation.total_price,
            discount_amount: reservation.discount_amount,
            final_price: reservation.final_price,
            paid_at: reservation.paid_at,
        })
    }

    /// Mark a pending reservation failed, refunding the gateway payment when one was taken.
    pub async fn fail(&self, reservation_id: i32, payment_key: Option<&str>, reason: &str) -> AppResult<()> {
        if let Some(key) = payment_key {
            if let Err(e) = self.gateway.cancel(key, reason).await {
                tracing::error!(reservation_id, payment_key = key, error = %e, "refund after failure did not go through");
            }
        }
        // keep the refunded key so a repeated completion does not refund it again
        sqlx::query(
            "UPDATE reservation SET status = ?, payment_key = COALESCE(?, payment_key) WHERE id = ? AND status = ?",
        )
        .bind(ReservationStatus::Failed.to_string())
        .bind(payment_key)
        .bind(reservation_id)
        .bind(ReservationStatus::Pending.to_string())
        .execute(&self.pool)
        .await?;
        tracing::warn!(reservation_id, reason, "reservation failed");
        Ok(())
    }

    /// Cancel a reservation: pending ones release their holds, paid ones are
    /// refunded and their seats and coupons freed. Shows already started cannot be cancelled.
    pub async fn cancel(&self, user_id: i32, id: i32) -> AppResult<PaymentConfirmation> {
        let reservation = self.get_reservation(user_id, id).await?;
        let now = chrono::Utc::now().naive_utc();

        match reservation.status() {
            ReservationStatus::Pending => {
                let mut tx = self.pool.begin().await?;
                sqlx::query(
                    r#"
                    UPDATE schedule_seat ss
                    JOIN reservation_seat rs ON rs.seat_id = ss.seat_id AND rs.reservation_id = ?
                    SET ss.status = ?, ss.held_by = NULL, ss.held_until = NULL, ss.version = ss.version + 1
                    WHERE ss.schedule_id = ? AND ss.held_by = ? AND ss.status = ?
                    "#,
                )
                .bind(reservation.id)
                .bind(SeatStatus::Available.to_string())
                .bind(reservation.schedule_id)
                .bind(user_id)
                .bind(SeatStatus::Held.to_string())
                .execute(&mut *tx)
                .await?;
                self.mark_cancelled(&mut tx, reservation.id, ReservationStatus::Pending, now)
                    .await?;
                tx.commit().await?;
            }
            ReservationStatus::Paid => {
                let context = self
                    .performance_service
                    .schedule_context(reservation.schedule_id)
                    .await?;
                if context.starts_at <= now {
                    return Err(AppError::Conflict(
                        "Reservations cannot be cancelled after the show has started".into(),
                    ));
                }

                if reservation.final_price > Decimal::ZERO {
                    let key = reservation.payment_key.as_deref().ok_or_else(|| {
                        AppError::PaymentError("Paid reservation has no payment key".into())
                    })?;
                    self.gateway
                        .cancel(key, "cancelled by customer")
                        .await
                        .map_err(|e| AppError::PaymentError(e.to_string()))?;
                }

                let mut tx = self.pool.begin().await?;
                sqlx::query(
                    r#"
                    UPDATE schedule_seat ss
                    JOIN reservation_seat rs ON rs.seat_id = ss.seat_id AND rs.reservation_id = ?
                    SET ss.status = ?, ss.held_by = NULL, ss.held_until = NULL, ss.version = ss.version + 1
                    WHERE ss.schedule_id = ? AND ss.status = ?
                    "#,
                )
                .bind(reservation.id)
                .bind(SeatStatus::Available.to_string())
                .bind(reservation.schedule_id)
                .bind(SeatStatus::Booked.to_string())
                .execute(&mut *tx)
                .await?;
                sqlx::query("DELETE FROM coupon_redemption WHERE reservation_id = ?")
                    .bind(reservation.id)
                    .execute(&mut *tx)
                    .await?;
                self.mark_cancelled(&mut tx, reservation.id, ReservationStatus::Paid, now)
                    .await?;
                tx.commit().await?;
            }
            status => {
                return Err(AppError::Conflict(format!(
                    "Reservation is already {}",
                    status
                )));
            }
        }

        tracing::info!(user_id, reservation_id = id, "reservation cancelled");
        self.get_confirmation(user_id, id).await
    }

    async fn mark_cancelled(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
        reservation_id: i32,
        expected: ReservationStatus,
        now: chrono::NaiveDateTime,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE reservation SET status = ?, cancelled_at = ? WHERE id = ? AND status = ?",
        )
        .bind(ReservationStatus::Cancelled.to_string())
        .bind(now)
        .bind(reservation_id)
        .bind(expected.to_string())
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("Reservation changed concurrently".into()));
        }
        Ok(())
    }
}
