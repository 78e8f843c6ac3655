#[macro_use]
extern crate rocket;

pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
pub mod swagger;
pub mod utils;

use crate::config::AppConfig;
use crate::services::payment_gateway::PaymentGateway;
use crate::swagger::{rapidoc, swagger_ui};
use rocket::fairing::AdHoc;
use rocket::http::{ContentType, Status};
use rocket::serde::json::json;
use rocket::{Build, Request, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::rapidoc::make_rapidoc;
use rocket_okapi::swagger_ui::make_swagger_ui;
use sqlx::MySqlPool;
use std::sync::Arc;

use services::{
    booking_service::BookingService, company_service::CompanyService,
    coupon_service::CouponService, payment_service::PaymentService,
    performance_service::PerformanceService, reservation_service::ReservationService,
    user_service::UserService, venue_service::VenueService,
};

fn error_body(status: Status, message: &str) -> (Status, (ContentType, String)) {
    (
        status,
        (ContentType::JSON, json!({ "error": message }).to_string()),
    )
}

#[catch(400)]
fn bad_request(_: &Request) -> (Status, (ContentType, String)) {
    error_body(Status::BadRequest, "Bad request")
}

#[catch(401)]
fn unauthorized(_: &Request) -> (Status, (ContentType, String)) {
    error_body(Status::Unauthorized, "Authentication error: missing or invalid token")
}

#[catch(403)]
fn forbidden(_: &Request) -> (Status, (ContentType, String)) {
    error_body(Status::Forbidden, "Forbidden: Admin role required")
}

#[catch(404)]
fn not_found(req: &Request) -> (Status, (ContentType, String)) {
    error_body(Status::NotFound, &format!("Not found: {}", req.uri().path()))
}

#[catch(422)]
fn unprocessable(_: &Request) -> (Status, (ContentType, String)) {
    error_body(Status::UnprocessableEntity, "Unprocessable: malformed request body")
}

#[catch(500)]
fn internal_error(_: &Request) -> (Status, (ContentType, String)) {
    error_body(Status::InternalServerError, "Internal server error")
}

/// Assemble the application: managed services, API routes under `/api`,
/// API docs, CORS and request logging.
pub fn build_rocket(
    pool: MySqlPool,
    config: AppConfig,
    gateway: Arc<dyn PaymentGateway>,
) -> Rocket<Build> {
    let user_service = UserService::new(pool.clone(), config.auth.clone());
    let company_service = CompanyService::new(pool.clone());
    let venue_service = VenueService::new(pool.clone());
    let performance_service = PerformanceService::new(pool.clone());
    let booking_service = BookingService::new(pool.clone(), config.booking.clone());
    let coupon_service = CouponService::new(pool.clone(), config.booking.clone());
    let reservation_service = ReservationService::new(pool.clone(), gateway.clone());
    let payment_service = PaymentService::new(
        pool,
        gateway,
        config.booking.clone(),
        config.auth.clone(),
    );

    rocket::build()
        .manage(config.auth.clone())
        .manage(user_service)
        .manage(company_service)
        .manage(venue_service)
        .manage(performance_service)
        .manage(booking_service)
        .manage(coupon_service)
        .manage(reservation_service)
        .manage(payment_service)
        .mount(
            "/api",
            openapi_get_routes![
                routes::user_route::register,
                routes::user_route::login,
                routes::user_route::me,
                routes::user_route::create_admin,
                routes::performance_route::list_performances,
                routes::performance_route::get_performance,
                routes::performance_route::list_schedules,
                routes::performance_route::create_performance,
                routes::performance_route::update_performance,
                routes::performance_route::delete_performance,
                routes::performance_route::add_schedule,
                routes::performance_route::delete_schedule,
                routes::venue_route::seating_chart,
                routes::venue_route::create_venue,
                routes::venue_route::list_venues,
                routes::venue_route::get_venue,
                routes::venue_route::update_venue,
                routes::venue_route::delete_venue,
                routes::venue_route::add_grade,
                routes::venue_route::list_grades,
                routes::venue_route::add_seats,
                routes::company_route::create_company,
                routes::company_route::list_companies,
                routes::company_route::get_company,
                routes::company_route::update_company,
                routes::company_route::delete_company,
                routes::booking_route::hold_seats,
                routes::booking_route::get_selection,
                routes::booking_route::release_selection,
                routes::coupon_route::available_coupons,
                routes::coupon_route::validate_coupons,
                routes::coupon_route::create_coupon,
                routes::coupon_route::list_coupons,
                routes::coupon_route::get_coupon,
                routes::coupon_route::update_coupon,
                routes::coupon_route::deactivate_coupon,
                routes::payment_route::prepare_payment,
                routes::payment_route::complete_payment,
                routes::payment_route::my_reservations,
                routes::payment_route::get_reservation,
                routes::payment_route::cancel_reservation,
            ],
        )
        .mount("/swagger", make_swagger_ui(&swagger_ui()))
        .mount("/rapidoc", make_rapidoc(&rapidoc()))
        .register(
            "/",
            catchers![bad_request, unauthorized, forbidden, not_found, unprocessable, internal_error],
        )
        .attach(utils::logging::request_logger())
        .attach(utils::logging::response_logger())
        .attach(AdHoc::on_response("CORS", |_, res| {
            Box::pin(async move {
                res.set_header(rocket::http::Header::new(
                    "Access-Control-Allow-Origin",
                    "*",
                ));
            })
        }))
}
