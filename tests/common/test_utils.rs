#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use dotenv::dotenv;
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool as Pool;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::Error;
use std::env;
use std::sync::atomic::{AtomicU32, Ordering};
use ticket_booking_system::config::{AuthConfig, BookingConfig};
use ticket_booking_system::db;
use ticket_booking_system::models::company::CompanyRequest;
use ticket_booking_system::models::coupon::{CouponRequest, DiscountType};
use ticket_booking_system::models::performance::{PerformanceRequest, ScheduleRequest};
use ticket_booking_system::models::user::UserRegistrationRequest;
use ticket_booking_system::models::venue::{SeatBlockRequest, SeatGradeRequest, VenueRequest};
use ticket_booking_system::services::company_service::CompanyService;
use ticket_booking_system::services::performance_service::PerformanceService;
use ticket_booking_system::services::user_service::UserService;
use ticket_booking_system::services::venue_service::VenueService;
use tokio::sync::Mutex;

static TEST_DB: OnceCell<Mutex<Option<TestDb>>> = OnceCell::new();
static DB_NAME: OnceCell<String> = OnceCell::new();
static SEQUENCE: AtomicU32 = AtomicU32::new(0);

#[derive(Debug)]
pub struct TestDb {
    pub pool: Pool,
    pub db_name: String,
}

fn server_url() -> String {
    dotenv().ok();
    let db_url = env::var("ADMIN_DATABASE_URL").expect("ADMIN_DATABASE_URL must be set in .env file");
    db_url.split('/').collect::<Vec<&str>>()[..3].join("/")
}

// Connection without a database, used to create and drop the test database
async fn create_connection_pool_without_db() -> Result<Pool, Error> {
    MySqlPoolOptions::new()
        .max_connections(2)
        .connect(&server_url())
        .await
}

async fn create_connection_pool_with_db(db_name: &str) -> Result<Pool, Error> {
    MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&format!("{}/{}", server_url(), db_name))
        .await
}

impl TestDb {
    // One database per test binary, shared by every test in it
    pub async fn get_instance() -> Result<Pool, Error> {
        let test_db = TEST_DB.get_or_init(|| Mutex::new(None));
        let mut guard = test_db.lock().await;

        if let Some(db) = guard.as_ref() {
            return Ok(db.pool.clone());
        }

        let db = Self::setup_database().await?;
        let pool = db.pool.clone();
        *guard = Some(db);
        Ok(pool)
    }

    async fn setup_database() -> Result<Self, Error> {
        let db_name = DB_NAME
            .get_or_init(|| {
                format!(
                    "ticket_test_{}_{}",
                    Utc::now().timestamp(),
                    std::process::id()
                )
            })
            .clone();

        let admin_pool = create_connection_pool_without_db().await?;
        sqlx::query(&format!("CREATE DATABASE {}", db_name))
            .execute(&admin_pool)
            .await?;

        let pool = create_connection_pool_with_db(&db_name).await?;
        db::init_schema(&pool).await?;

        Ok(Self { pool, db_name })
    }

    // Drop the database once the test binary exits. Runs from a dtor, so it
    // brings its own runtime.
    pub fn cleanup_database_sync() -> Result<(), Error> {
        let db_name = match DB_NAME.get() {
            Some(name) => name.clone(),
            None => return Ok(()),
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async move {
            let admin_pool = create_connection_pool_without_db().await?;
            sqlx::query(&format!("DROP DATABASE IF EXISTS {}", db_name))
                .execute(&admin_pool)
                .await?;
            admin_pool.close().await;
            Ok::<(), Error>(())
        })
    }
}

/// Name that is unique within the test run.
pub fn unique(prefix: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        std::process::id(),
        SEQUENCE.fetch_add(1, Ordering::SeqCst)
    )
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        jwt_expiration_hours: 1,
    }
}

pub fn booking_config() -> BookingConfig {
    BookingConfig {
        seat_hold_minutes: 10,
        max_seats_per_booking: 4,
    }
}

pub async fn register_user(user_service: &UserService, prefix: &str) -> i32 {
    user_service
        .register_user(UserRegistrationRequest {
            username: unique(prefix),
            password: "correct-horse-battery".to_string(),
            name: "Test Customer".to_string(),
        })
        .await
        .expect("Failed to register test user")
}

/// A venue with two grades, a performance running for a month and one
/// schedule a week from now.
#[derive(Debug)]
pub struct Show {
    pub company_id: i32,
    pub venue_id: i32,
    pub vip_grade_id: i32,
    pub r_grade_id: i32,
    pub performance_id: i32,
    pub schedule_id: i32,
    pub starts_at: NaiveDateTime,
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn performance_request(company_id: i32, venue_id: i32, title: &str) -> PerformanceRequest {
    PerformanceRequest {
        company_id,
        venue_id,
        title: title.to_string(),
        description: "A musical in two acts".to_string(),
        category: "MUSICAL".to_string(),
        running_minutes: 150,
        age_rating: "8+".to_string(),
        poster_url: None,
        start_date: today(),
        end_date: today() + Duration::days(30),
    }
}

/// VIP row A holds 4 seats at 150000, R row B holds 4 seats at 90000.
pub async fn seed_show(pool: &Pool, title: &str) -> Show {
    let companies = CompanyService::new(pool.clone());
    let venues = VenueService::new(pool.clone());
    let performances = PerformanceService::new(pool.clone());

    let company = companies
        .create_company(CompanyRequest {
            name: unique("Company"),
            business_number: unique("BN"),
            contact_email: "contact@example.com".to_string(),
            phone: None,
        })
        .await
        .expect("Failed to create company");

    let venue = venues
        .create_venue(VenueRequest {
            name: unique("Hall"),
            address: "1 Theatre Street".to_string(),
        })
        .await
        .expect("Failed to create venue");

    let vip = venues
        .add_grade(
            venue.id,
            SeatGradeRequest {
                name: "VIP".to_string(),
                price: Decimal::from(150_000),
            },
        )
        .await
        .expect("Failed to add VIP grade");
    let r = venues
        .add_grade(
            venue.id,
            SeatGradeRequest {
                name: "R".to_string(),
                price: Decimal::from(90_000),
            },
        )
        .await
        .expect("Failed to add R grade");

    for (grade_id, first_row) in [(vip.id, 0), (r.id, 1)] {
        venues
            .add_seats(
                venue.id,
                SeatBlockRequest {
                    grade_id,
                    section: "Floor".to_string(),
                    rows: 1,
                    seats_per_row: 4,
                    first_row,
                },
            )
            .await
            .expect("Failed to add seats");
    }

    let performance = performances
        .create_performance(performance_request(company.id, venue.id, title))
        .await
        .expect("Failed to create performance");

    let starts_at = (today() + Duration::days(7))
        .and_hms_opt(19, 30, 0)
        .expect("valid time");
    let created = performances
        .add_schedule(performance.id, ScheduleRequest { starts_at })
        .await
        .expect("Failed to add schedule");

    Show {
        company_id: company.id,
        venue_id: venue.id,
        vip_grade_id: vip.id,
        r_grade_id: r.id,
        performance_id: performance.id,
        schedule_id: created.schedule.id,
        starts_at,
    }
}

/// Seat ids of the schedule ordered by label, VIP seats first.
pub async fn schedule_seat_ids(pool: &Pool, schedule_id: i32) -> Vec<i32> {
    let rows: Vec<(i32,)> = sqlx::query_as(
        r#"
        SELECT s.id
        FROM schedule_seat ss
        JOIN seat s ON s.id = ss.seat_id
        WHERE ss.schedule_id = ?
        ORDER BY s.row_label, s.seat_number
        "#,
    )
    .bind(schedule_id)
    .fetch_all(pool)
    .await
    .expect("Failed to list schedule seats");
    rows.into_iter().map(|(id,)| id).collect()
}

pub fn coupon_request(discount_type: DiscountType, value: i64) -> CouponRequest {
    let now = Utc::now().naive_utc();
    CouponRequest {
        code: unique("save"),
        name: unique("Coupon"),
        discount_type,
        discount_value: Decimal::from(value),
        min_price: Decimal::ZERO,
        max_discount: None,
        performance_id: None,
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(30),
        active: true,
    }
}
