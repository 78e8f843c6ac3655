use crate::models::booking::{HoldSeatsRequest, SeatSelection};
use crate::services::booking_service::BookingService;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedUser;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// Hold seats for the current user, replacing the previous selection
#[openapi(tag = "Booking")]
#[post("/bookings/hold", format = "json", data = "<request>")]
pub async fn hold_seats(
    request: Json<HoldSeatsRequest>,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<SeatSelection>, AppError> {
    let selection = booking_service
        .hold_seats(auth.user_id, request.into_inner())
        .await?;
    Ok(Json(selection))
}

#[openapi(tag = "Booking")]
#[get("/bookings/<schedule_id>")]
pub async fn get_selection(
    schedule_id: i32,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<SeatSelection>, AppError> {
    let selection = booking_service
        .get_selection(auth.user_id, schedule_id)
        .await?;
    Ok(Json(selection))
}

/// Release every seat the user holds on the schedule
#[openapi(tag = "Booking")]
#[delete("/bookings/<schedule_id>")]
pub async fn release_selection(
    schedule_id: i32,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<Value>, AppError> {
    let released = booking_service
        .release_selection(auth.user_id, schedule_id)
        .await?;
    Ok(Json(json!({ "released": released })))
}
