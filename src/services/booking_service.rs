use crate::config::BookingConfig;
use crate::models::booking::{HoldSeatsRequest, ScheduleSeat, SeatSelection, SeatStatus, SelectedSeat};
use crate::services::performance_service::PerformanceService;
use crate::utils::error::{AppError, AppResult};
use chrono::{Duration, NaiveDateTime};
use sqlx::MySqlPool;
use std::collections::HashSet;
use validator::Validate;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, sqlx::FromRow)]
struct HeldSeatRow {
    #[sqlx(flatten)]
    seat: SelectedSeat,
    held_until: Option<NaiveDateTime>,
}

#[derive(Clone)]
pub struct BookingService {
    pool: MySqlPool,
    config: BookingConfig,
    performance_service: PerformanceService,
}

impl BookingService {
    pub fn new(pool: MySqlPool, config: BookingConfig) -> Self {
        BookingService {
            performance_service: PerformanceService::new(pool.clone()),
            pool,
            config,
        }
    }

    pub fn hold_window(&self) -> Duration {
        Duration::minutes(self.config.seat_hold_minutes)
    }

    /// Hold `seat_ids` for the user, replacing any previous selection on the schedule.
    pub async fn hold_seats(&self, user_id: i32, request: HoldSeatsRequest) -> AppResult<SeatSelection> {
        request.validate()?;

        let unique: HashSet<i32> = request.seat_ids.iter().copied().collect();
        if unique.len() != request.seat_ids.len() {
            return Err(AppError::ValidationError("seat_ids contains duplicates".into()));
        }
        if request.seat_ids.len() > self.config.max_seats_per_booking {
            return Err(AppError::ValidationError(format!(
                "at most {} seats can be booked at once",
                self.config.max_seats_per_booking
            )));
        }

        // Make sure the schedule exists before touching its seats
        self.performance_service
            .schedule_context(request.schedule_id)
            .await?;

        let mut retries = 0;
        while retries < MAX_RETRIES {
            let now = chrono::Utc::now().naive_utc();
            let held_until = now + self.hold_window();
            let mut tx = self.pool.begin().await?;

            // drop the previous selection, the new one replaces it
            sqlx::query(
                r#"
                UPDATE schedule_seat
                SET status = ?, held_by = NULL, held_until = NULL, version = version + 1
                WHERE schedule_id = ? AND held_by = ? AND status = ?
                "#,
            )
            .bind(SeatStatus::Available.to_string())
            .bind(request.schedule_id)
            .bind(user_id)
            .bind(SeatStatus::Held.to_string())
            .execute(&mut *tx)
            .await?;

            let mut lost_race = false;
            for seat_id in &request.seat_ids {
                let seat = sqlx::query_as::<_, ScheduleSeat>(
                    r#"
                    SELECT schedule_id, seat_id, status, held_by, held_until, version
                    FROM schedule_seat
                    WHERE schedule_id = ? AND seat_id = ?
                    "#,
                )
                .bind(request.schedule_id)
                .bind(seat_id)
                .fetch_optional(&mut *tx)
                .await?;

                let seat = match seat {
                    Some(seat) => seat,
                    None => {
                        tx.rollback().await?;
                        return Err(AppError::NotFound(format!(
                            "Seat {} does not exist for this schedule",
                            seat_id
                        )));
                    }
                };

                if !seat.is_holdable_by(user_id, now) {
                    tx.rollback().await?;
                    return Err(AppError::Conflict(format!(
                        "Seat {} is no longer available",
                        seat_id
                    )));
                }

                let update_result = sqlx::query(
                    r#"
                    UPDATE schedule_seat
                    SET status = ?, held_by = ?, held_until = ?, version = version + 1
                    WHERE schedule_id = ? AND seat_id = ? AND version = ?
                    "#,
                )
                .bind(SeatStatus::Held.to_string())
                .bind(user_id)
                .bind(held_until)
                .bind(request.schedule_id)
                .bind(seat_id)
                .bind(seat.version)
                .execute(&mut *tx)
                .await?;

                if update_result.rows_affected() == 0 {
                    lost_race = true;
                    break;
                }
            }

            if lost_race {
                tx.rollback().await?;
                retries += 1;
                tracing::debug!(user_id, schedule_id = request.schedule_id, retries, "seat hold raced, retrying");
                continue;
            }

            tx.commit().await?;
            tracing::info!(
                user_id,
                schedule_id = request.schedule_id,
                seats = request.seat_ids.len(),
                "seats held"
            );
            return self.get_selection(user_id, request.schedule_id).await;
        }

        Err(AppError::Conflict(
            "Failed to hold seats after maximum retries".into(),
        ))
    }

    /// Seats currently held by the user on the schedule; expired holds are left out.
    pub async fn get_selection(&self, user_id: i32, schedule_id: i32) -> AppResult<SeatSelection> {
        let now = chrono::Utc::now().naive_utc();
        let rows = sqlx::query_as::<_, HeldSeatRow>(
            r#"
            SELECT
                s.id AS seat_id,
                s.section,
                s.row_label,
                s.seat_number,
                g.name AS grade_name,
                g.price,
                ss.held_until
            FROM schedule_seat ss
            JOIN seat s ON s.id = ss.seat_id
            JOIN seat_grade g ON g.id = s.grade_id
            WHERE ss.schedule_id = ?
            AND ss.held_by = ?
            AND ss.status = ?
            AND ss.held_until > ?
            ORDER BY s.section, LENGTH(s.row_label), s.row_label, s.seat_number
            "#,
        )
        .bind(schedule_id)
        .bind(user_id)
        .bind(SeatStatus::Held.to_string())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let held_until = rows.iter().filter_map(|r| r.held_until).min();
        let seats = rows.into_iter().map(|r| r.seat).collect();
        Ok(SeatSelection::new(schedule_id, seats, held_until))
    }

    pub async fn release_selection(&self, user_id: i32, schedule_id: i32) -> AppResult<u64> {
        let released = sqlx::query(
            r#"
            UPDATE schedule_seat
            SET status = ?, held_by = NULL, held_until = NULL, version = version + 1
            WHERE schedule_id = ? AND held_by = ? AND status = ?
            "#,
        )
        .bind(SeatStatus::Available.to_string())
        .bind(schedule_id)
        .bind(user_id)
        .bind(SeatStatus::Held.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        tracing::info!(user_id, schedule_id, released, "selection released");
        Ok(released)
    }
}
