use rocket::{launch, Build, Rocket};
use ticket_booking_system::config::AppConfig;
use ticket_booking_system::db::{self, Database};
use ticket_booking_system::services::payment_gateway::MockPaymentGateway;
use ticket_booking_system::services::user_service::UserService;
use ticket_booking_system::utils::logging::init_tracing;
use ticket_booking_system::build_rocket;

#[launch]
async fn rocket() -> Rocket<Build> {
    init_tracing();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Connect to the database
    let database = Database::new(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");
    let pool = database.get_pool().clone();

    db::init_schema(&pool)
        .await
        .expect("Failed to initialize database schema");

    if let Some(admin) = &config.bootstrap_admin {
        UserService::new(pool.clone(), config.auth.clone())
            .ensure_bootstrap_admin(admin)
            .await
            .expect("Failed to create bootstrap admin");
    }

    tracing::info!(
        hold_minutes = config.booking.seat_hold_minutes,
        "ticket booking service starting"
    );

    build_rocket(pool, config, MockPaymentGateway::shared())
}
