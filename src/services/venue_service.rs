use crate::models::booking::SeatStatus;
use crate::models::venue::{
    row_label, ChartSeat, SeatBlockRequest, SeatBlockResponse, SeatGrade, SeatGradeRequest,
    SeatingChart, Venue, VenueDetail, VenueRequest,
};
use crate::utils::error::{AppError, AppResult};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use validator::Validate;

#[derive(Debug, sqlx::FromRow)]
struct ChartSeatRow {
    seat_id: i32,
    section: String,
    row_label: String,
    seat_number: i32,
    grade_id: i32,
    grade_name: String,
    price: Decimal,
    status: String,
    held_until: Option<NaiveDateTime>,
}

#[derive(Clone)]
pub struct VenueService {
    pool: MySqlPool,
}

impl VenueService {
    pub fn new(pool: MySqlPool) -> Self {
        VenueService { pool }
    }

    pub async fn create_venue(&self, request: VenueRequest) -> AppResult<Venue> {
        request.validate()?;
        let result = sqlx::query("INSERT INTO venue (name, address) VALUES (?, ?)")
            .bind(&request.name)
            .bind(&request.address)
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_id() as i32;
        tracing::info!(venue_id = id, name = %request.name, "venue created");
        self.get_venue(id).await
    }

    pub async fn list_venues(&self) -> AppResult<Vec<Venue>> {
        let venues = sqlx::query_as::<_, Venue>("SELECT id, name, address FROM venue ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(venues)
    }

    pub async fn get_venue(&self, id: i32) -> AppResult<Venue> {
        sqlx::query_as::<_, Venue>("SELECT id, name, address FROM venue WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Venue not found".into()))
    }

    pub async fn get_venue_detail(&self, id: i32) -> AppResult<VenueDetail> {
        let venue = self.get_venue(id).await?;
        let grades = self.list_grades(id).await?;
        let (seat_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM seat WHERE venue_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(VenueDetail {
            venue,
            grades,
            seat_count,
        })
    }

    pub async fn update_venue(&self, id: i32, request: VenueRequest) -> AppResult<Venue> {
        request.validate()?;
        self.get_venue(id).await?;

        sqlx::query("UPDATE venue SET name = ?, address = ? WHERE id = ?")
            .bind(&request.name)
            .bind(&request.address)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get_venue(id).await
    }

    pub async fn delete_venue(&self, id: i32) -> AppResult<()> {
        let (performances,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM performance WHERE venue_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if performances > 0 {
            return Err(AppError::Conflict("Venue is used by performances".into()));
        }

        let mut tx = self.pool.begin().await?;
        // seats reference grades, remove them first
        sqlx::query("DELETE FROM seat WHERE venue_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM venue WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound("Venue not found".into()));
        }
        tx.commit().await?;

        tracing::info!(venue_id = id, "venue deleted");
        Ok(())
    }

    pub async fn add_grade(&self, venue_id: i32, request: SeatGradeRequest) -> AppResult<SeatGrade> {
        request.validate()?;
        if request.price < Decimal::ZERO {
            return Err(AppError::ValidationError("price cannot be negative".into()));
        }
        self.get_venue(venue_id).await?;

        let existing = sqlx::query("SELECT id FROM seat_grade WHERE venue_id = ? AND name = ?")
            .bind(venue_id)
            .bind(&request.name)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "Grade {} already exists for this venue",
                request.name
            )));
        }

        let result = sqlx::query("INSERT INTO seat_grade (venue_id, name, price) VALUES (?, ?, ?)")
            .bind(venue_id)
            .bind(&request.name)
            .bind(request.price)
            .execute(&self.pool)
            .await?;

        Ok(SeatGrade {
            id: result.last_insert_id() as i32,
            venue_id,
            name: request.name,
            price: request.price,
        })
    }

    pub async fn list_grades(&self, venue_id: i32) -> AppResult<Vec<SeatGrade>> {
        let grades = sqlx::query_as::<_, SeatGrade>(
            "SELECT id, venue_id, name, price FROM seat_grade WHERE venue_id = ? ORDER BY price DESC",
        )
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(grades)
    }

    /// Generate a block of seats; positions that already exist are skipped.
    /// New seats also join every existing schedule held at this venue.
    pub async fn add_seats(&self, venue_id: i32, request: SeatBlockRequest) -> AppResult<SeatBlockResponse> {
        request.validate()?;

        let grade = sqlx::query("SELECT id FROM seat_grade WHERE id = ? AND venue_id = ?")
            .bind(request.grade_id)
            .bind(venue_id)
            .fetch_optional(&self.pool)
            .await?;
        if grade.is_none() {
            return Err(AppError::NotFound("Seat grade not found for this venue".into()));
        }

        let last_row = request
            .first_row
            .checked_add(request.rows)
            .ok_or_else(|| AppError::ValidationError("first_row: range".into()))?;
        let positions: Vec<(String, i32)> = (request.first_row..last_row)
            .flat_map(|row| {
                let label = row_label(row);
                (1..=request.seats_per_row as i32).map(move |n| (label.clone(), n))
            })
            .collect();

        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
            "INSERT IGNORE INTO seat (venue_id, grade_id, section, row_label, seat_number) ",
        );
        builder.push_values(positions.iter(), |mut b, (label, number)| {
            b.push_bind(venue_id)
                .push_bind(request.grade_id)
                .push_bind(&request.section)
                .push_bind(label)
                .push_bind(*number);
        });
        let created = builder.build().execute(&mut *tx).await?.rows_affected();

        sqlx::query(
            r#"
            INSERT IGNORE INTO schedule_seat (schedule_id, seat_id)
            SELECT sc.id, s.id
            FROM schedule sc
            JOIN performance p ON p.id = sc.performance_id
            JOIN seat s ON s.venue_id = p.venue_id
            WHERE p.venue_id = ?
            "#,
        )
        .bind(venue_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(venue_id, section = %request.section, created, "seats added");
        Ok(SeatBlockResponse { venue_id, created })
    }

    /// Every seat of the schedule's venue with its grade, price and availability.
    pub async fn seating_chart(&self, schedule_id: i32) -> AppResult<SeatingChart> {
        let (performance_id, venue_id): (i32, i32) = sqlx::query_as(
            r#"
            SELECT p.id, p.venue_id
            FROM schedule sc
            JOIN performance p ON p.id = sc.performance_id
            WHERE sc.id = ?
            "#,
        )
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Schedule not found".into()))?;

        let rows = sqlx::query_as::<_, ChartSeatRow>(
            r#"
            SELECT
                s.id AS seat_id,
                s.section,
                s.row_label,
                s.seat_number,
                g.id AS grade_id,
                g.name AS grade_name,
                g.price,
                ss.status,
                ss.held_until
            FROM schedule_seat ss
            JOIN seat s ON s.id = ss.seat_id
            JOIN seat_grade g ON g.id = s.grade_id
            WHERE ss.schedule_id = ?
            ORDER BY s.section, LENGTH(s.row_label), s.row_label, s.seat_number
            "#,
        )
        .bind(schedule_id)
        .fetch_all(&self.pool)
        .await?;

        let now = chrono::Utc::now().naive_utc();
        let seats: Vec<ChartSeat> = rows
            .into_iter()
            .map(|row| {
                let available = match row.status.parse::<SeatStatus>() {
                    Ok(SeatStatus::Available) => true,
                    Ok(SeatStatus::Held) => row.held_until.map_or(true, |until| until <= now),
                    _ => false,
                };
                ChartSeat {
                    seat_id: row.seat_id,
                    section: row.section,
                    row_label: row.row_label,
                    seat_number: row.seat_number,
                    grade_id: row.grade_id,
                    grade_name: row.grade_name,
                    price: row.price,
                    available,
                }
            })
            .collect();

        Ok(SeatingChart {
            schedule_id,
            performance_id,
            venue_id,
            grades: self.list_grades(venue_id).await?,
            available_count: seats.iter().filter(|s| s.available).count(),
            seats,
        })
    }
}
