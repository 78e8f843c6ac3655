use crate::models::performance::{
    Performance, PerformanceDetail, PerformanceQuery, PerformanceRequest, PerformanceSummary,
    Schedule, ScheduleContext, ScheduleCreated, ScheduleRequest,
};
use crate::services::venue_service::VenueService;
use crate::utils::error::{AppError, AppResult};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use validator::Validate;

const PERFORMANCE_COLUMNS: &str = "id, company_id, venue_id, title, description, category, \
    running_minutes, age_rating, poster_url, start_date, end_date";

#[derive(Clone)]
pub struct PerformanceService {
    pool: MySqlPool,
    venue_service: VenueService,
}

impl PerformanceService {
    pub fn new(pool: MySqlPool) -> Self {
        PerformanceService {
            venue_service: VenueService::new(pool.clone()),
            pool,
        }
    }

    pub async fn create_performance(&self, request: PerformanceRequest) -> AppResult<Performance> {
        request.validate()?;
        self.check_references(&request).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO performance
            (company_id, venue_id, title, description, category, running_minutes,
                age_rating, poster_url, start_date, end_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.company_id)
        .bind(request.venue_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.category)
        .bind(request.running_minutes)
        .bind(&request.age_rating)
        .bind(&request.poster_url)
        .bind(request.start_date)
        .bind(request.end_date)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i32;
        tracing::info!(performance_id = id, title = %request.title, "performance created");
        self.get_performance(id).await
    }

    pub async fn get_performance(&self, id: i32) -> AppResult<Performance> {
        sqlx::query_as::<_, Performance>(&format!(
            "SELECT {} FROM performance WHERE id = ?",
            PERFORMANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Performance not found".into()))
    }

    // Search performances, both filters are optional
    pub async fn list_performances(&self, query: PerformanceQuery) -> AppResult<Vec<PerformanceSummary>> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
            r#"
            SELECT
                p.id,
                p.title,
                p.category,
                p.poster_url,
                v.name AS venue_name,
                p.start_date,
                p.end_date,
                (SELECT MIN(g.price) FROM seat_grade g WHERE g.venue_id = p.venue_id) AS min_price,
                (SELECT MAX(g.price) FROM seat_grade g WHERE g.venue_id = p.venue_id) AS max_price
            FROM performance p
            JOIN venue v ON v.id = p.venue_id
            WHERE 1 = 1
            "#,
        );
        if let Some(category) = query.category.filter(|c| !c.is_empty()) {
            builder.push(" AND p.category = ").push_bind(category);
        }
        if let Some(keyword) = query.keyword.filter(|k| !k.trim().is_empty()) {
            builder
                .push(" AND p.title LIKE ")
                .push_bind(format!("%{}%", keyword.trim()));
        }
        builder.push(" ORDER BY p.start_date, p.id");

        let performances = builder
            .build_query_as::<PerformanceSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(performances)
    }

    pub async fn get_performance_detail(&self, id: i32) -> AppResult<PerformanceDetail> {
        let performance = self.get_performance(id).await?;
        let venue = self.venue_service.get_venue(performance.venue_id).await?;
        let grades = self.venue_service.list_grades(performance.venue_id).await?;
        let schedules = self.list_schedules(id).await?;

        Ok(PerformanceDetail {
            performance,
            venue,
            grades,
            schedules,
        })
    }

    pub async fn update_performance(&self, id: i32, request: PerformanceRequest) -> AppResult<Performance> {
        request.validate()?;
        let current = self.get_performance(id).await?;
        self.check_references(&request).await?;

        if current.venue_id != request.venue_id && !self.list_schedules(id).await?.is_empty() {
            return Err(AppError::Conflict(
                "Cannot move a performance with schedules to another venue".into(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE performance
            SET company_id = ?, venue_id = ?, title = ?, description = ?, category = ?,
                running_minutes = ?, age_rating = ?, poster_url = ?, start_date = ?, end_date = ?
            WHERE id = ?
            "#,
        )
        .bind(request.company_id)
        .bind(request.venue_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.category)
        .bind(request.running_minutes)
        .bind(&request.age_rating)
        .bind(&request.poster_url)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_performance(id).await
    }

    pub async fn delete_performance(&self, id: i32) -> AppResult<()> {
        self.get_performance(id).await?;

        let (reservations,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM reservation r
            JOIN schedule sc ON sc.id = r.schedule_id
            WHERE sc.performance_id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if reservations > 0 {
            return Err(AppError::Conflict("Performance has reservations".into()));
        }

        sqlx::query("DELETE FROM performance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::info!(performance_id = id, "performance deleted");
        Ok(())
    }

    /// Add a show time and open every venue seat for it.
    pub async fn add_schedule(&self, performance_id: i32, request: ScheduleRequest) -> AppResult<ScheduleCreated> {
        let performance = self.get_performance(performance_id).await?;

        let show_date = request.starts_at.date();
        if show_date < performance.start_date || show_date > performance.end_date {
            return Err(AppError::ValidationError(format!(
                "starts_at must fall between {} and {}",
                performance.start_date, performance.end_date
            )));
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO schedule (performance_id, starts_at) VALUES (?, ?)")
            .bind(performance_id)
            .bind(request.starts_at)
            .execute(&mut *tx)
            .await?;
        let schedule_id = result.last_insert_id() as i32;

        let seat_count = sqlx::query(
            r#"
            INSERT INTO schedule_seat (schedule_id, seat_id)
            SELECT ?, s.id FROM seat s WHERE s.venue_id = ?
            "#,
        )
        .bind(schedule_id)
        .bind(performance.venue_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(performance_id, schedule_id, seat_count, "schedule added");
        Ok(ScheduleCreated {
            schedule: Schedule {
                id: schedule_id,
                performance_id,
                starts_at: request.starts_at,
            },
            seat_count,
        })
    }

    pub async fn list_schedules(&self, performance_id: i32) -> AppResult<Vec<Schedule>> {
        let schedules = sqlx::query_as::<_, Schedule>(
            "SELECT id, performance_id, starts_at FROM schedule WHERE performance_id = ? ORDER BY starts_at",
        )
        .bind(performance_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }

    pub async fn delete_schedule(&self, schedule_id: i32) -> AppResult<()> {
        let (reservations,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reservation WHERE schedule_id = ?")
                .bind(schedule_id)
                .fetch_one(&self.pool)
                .await?;
        if reservations > 0 {
            return Err(AppError::Conflict("Schedule has reservations".into()));
        }

        let result = sqlx::query("DELETE FROM schedule WHERE id = ?")
            .bind(schedule_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Schedule not found".into()));
        }
        tracing::info!(schedule_id, "schedule deleted");
        Ok(())
    }

    pub async fn schedule_context(&self, schedule_id: i32) -> AppResult<ScheduleContext> {
        sqlx::query_as::<_, ScheduleContext>(
            r#"
            SELECT
                sc.id AS schedule_id,
                sc.starts_at,
                p.id AS performance_id,
                p.title AS performance_title,
                v.id AS venue_id,
                v.name AS venue_name
            FROM schedule sc
            JOIN performance p ON p.id = sc.performance_id
            JOIN venue v ON v.id = p.venue_id
            WHERE sc.id = ?
            "#,
        )
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Schedule not found".into()))
    }

    async fn check_references(&self, request: &PerformanceRequest) -> AppResult<()> {
        let company = sqlx::query("SELECT id FROM company WHERE id = ?")
            .bind(request.company_id)
            .fetch_optional(&self.pool)
            .await?;
        if company.is_none() {
            return Err(AppError::NotFound("Company not found".into()));
        }
        self.venue_service.get_venue(request.venue_id).await?;
        Ok(())
    }
}
