use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

// Database connection manager
pub struct Database {
    pub pool: MySqlPool,
}

impl Database {
    // Create a new database connection pool
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    // Get a reference to the connection pool
    pub fn get_pool(&self) -> &MySqlPool {
        &self.pool
    }
}

// Tables in dependency order; every statement is idempotent
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INT AUTO_INCREMENT PRIMARY KEY,
        username VARCHAR(64) NOT NULL,
        password VARCHAR(255) NOT NULL,
        name VARCHAR(128) NOT NULL,
        role VARCHAR(16) DEFAULT 'USER' NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP NOT NULL,
        CONSTRAINT users_username_uindex UNIQUE (username)
    )",
    "CREATE TABLE IF NOT EXISTS company (
        id INT AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(128) NOT NULL,
        business_number VARCHAR(32) NOT NULL,
        contact_email VARCHAR(255) NOT NULL,
        phone VARCHAR(32) NULL,
        CONSTRAINT company_business_number_uindex UNIQUE (business_number)
    )",
    "CREATE TABLE IF NOT EXISTS venue (
        id INT AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(128) NOT NULL,
        address VARCHAR(255) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS seat_grade (
        id INT AUTO_INCREMENT PRIMARY KEY,
        venue_id INT NOT NULL,
        name VARCHAR(32) NOT NULL,
        price DECIMAL(12,2) NOT NULL,
        CONSTRAINT seat_grade_venue_name_uindex UNIQUE (venue_id, name),
        CONSTRAINT seat_grade_venue_id_fk
            FOREIGN KEY (venue_id) REFERENCES venue(id)
            ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS seat (
        id INT AUTO_INCREMENT PRIMARY KEY,
        venue_id INT NOT NULL,
        grade_id INT NOT NULL,
        section VARCHAR(32) NOT NULL,
        row_label VARCHAR(8) NOT NULL,
        seat_number INT NOT NULL,
        CONSTRAINT seat_position_uindex UNIQUE (venue_id, section, row_label, seat_number),
        CONSTRAINT seat_venue_id_fk
            FOREIGN KEY (venue_id) REFERENCES venue(id)
            ON DELETE CASCADE,
        CONSTRAINT seat_grade_id_fk
            FOREIGN KEY (grade_id) REFERENCES seat_grade(id)
    )",
    "CREATE TABLE IF NOT EXISTS performance (
        id INT AUTO_INCREMENT PRIMARY KEY,
        company_id INT NOT NULL,
        venue_id INT NOT NULL,
        title VARCHAR(255) NOT NULL,
        description TEXT NOT NULL,
        category VARCHAR(32) NOT NULL,
        running_minutes INT NOT NULL,
        age_rating VARCHAR(32) NOT NULL,
        poster_url VARCHAR(512) NULL,
        start_date DATE NOT NULL,
        end_date DATE NOT NULL,
        CONSTRAINT performance_company_id_fk
            FOREIGN KEY (company_id) REFERENCES company(id),
        CONSTRAINT performance_venue_id_fk
            FOREIGN KEY (venue_id) REFERENCES venue(id)
    )",
    "CREATE TABLE IF NOT EXISTS schedule (
        id INT AUTO_INCREMENT PRIMARY KEY,
        performance_id INT NOT NULL,
        starts_at DATETIME NOT NULL,
        CONSTRAINT schedule_performance_id_fk
            FOREIGN KEY (performance_id) REFERENCES performance(id)
            ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS schedule_seat (
        schedule_id INT NOT NULL,
        seat_id INT NOT NULL,
        status VARCHAR(16) DEFAULT 'AVAILABLE' NOT NULL,
        held_by INT NULL,
        held_until DATETIME NULL,
        version INT DEFAULT 0 NOT NULL,
        PRIMARY KEY (schedule_id, seat_id),
        CONSTRAINT schedule_seat_schedule_id_fk
            FOREIGN KEY (schedule_id) REFERENCES schedule(id)
            ON DELETE CASCADE,
        CONSTRAINT schedule_seat_seat_id_fk
            FOREIGN KEY (seat_id) REFERENCES seat(id)
            ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS coupon (
        id INT AUTO_INCREMENT PRIMARY KEY,
        code VARCHAR(64) NOT NULL,
        name VARCHAR(128) NOT NULL,
        discount_type VARCHAR(16) NOT NULL,
        discount_value DECIMAL(12,2) NOT NULL,
        min_price DECIMAL(12,2) DEFAULT 0 NOT NULL,
        max_discount DECIMAL(12,2) NULL,
        performance_id INT NULL,
        valid_from DATETIME NOT NULL,
        valid_until DATETIME NOT NULL,
        active BOOLEAN DEFAULT TRUE NOT NULL,
        CONSTRAINT coupon_code_uindex UNIQUE (code),
        CONSTRAINT coupon_performance_id_fk
            FOREIGN KEY (performance_id) REFERENCES performance(id)
            ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS reservation (
        id INT AUTO_INCREMENT PRIMARY KEY,
        merchant_uid VARCHAR(64) NOT NULL,
        user_id INT NOT NULL,
        schedule_id INT NOT NULL,
        status VARCHAR(16) NOT NULL,
        total_price DECIMAL(12,2) NOT NULL,
        discount_amount DECIMAL(12,2) NOT NULL,
        final_price DECIMAL(12,2) NOT NULL,
        payment_key VARCHAR(128) NULL,
        created_at DATETIME NOT NULL,
        paid_at DATETIME NULL,
        cancelled_at DATETIME NULL,
        CONSTRAINT reservation_merchant_uid_uindex UNIQUE (merchant_uid),
        CONSTRAINT reservation_payment_key_uindex UNIQUE (payment_key),
        CONSTRAINT reservation_user_id_fk
            FOREIGN KEY (user_id) REFERENCES users(id),
        CONSTRAINT reservation_schedule_id_fk
            FOREIGN KEY (schedule_id) REFERENCES schedule(id)
    )",
    "CREATE TABLE IF NOT EXISTS reservation_seat (
        reservation_id INT NOT NULL,
        seat_id INT NOT NULL,
        seat_label VARCHAR(64) NOT NULL,
        grade_name VARCHAR(32) NOT NULL,
        price DECIMAL(12,2) NOT NULL,
        coupon_id INT NULL,
        discount DECIMAL(12,2) NOT NULL,
        PRIMARY KEY (reservation_id, seat_id),
        CONSTRAINT reservation_seat_reservation_id_fk
            FOREIGN KEY (reservation_id) REFERENCES reservation(id)
            ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS coupon_redemption (
        coupon_id INT NOT NULL,
        user_id INT NOT NULL,
        reservation_id INT NOT NULL,
        redeemed_at DATETIME NOT NULL,
        PRIMARY KEY (coupon_id, user_id),
        CONSTRAINT coupon_redemption_coupon_id_fk
            FOREIGN KEY (coupon_id) REFERENCES coupon(id)
            ON DELETE CASCADE,
        CONSTRAINT coupon_redemption_reservation_id_fk
            FOREIGN KEY (reservation_id) REFERENCES reservation(id)
            ON DELETE CASCADE
    )",
];

// Create every table that does not exist yet
pub async fn init_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!(tables = SCHEMA.len(), "schema ready");
    Ok(())
}
