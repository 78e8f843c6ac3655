use crate::models::payment::{
    PaymentCompleteRequest, PaymentConfirmation, PaymentOrder, PaymentPrepareRequest,
};
use crate::services::payment_service::PaymentService;
use crate::services::reservation_service::ReservationService;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedUser;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

/// Create a pending order for the gateway popup
#[openapi(tag = "Payments")]
#[post("/payments/prepare", format = "json", data = "<request>")]
pub async fn prepare_payment(
    request: Json<PaymentPrepareRequest>,
    auth: AuthenticatedUser,
    payment_service: &State<PaymentService>,
) -> Result<Json<PaymentOrder>, AppError> {
    let order = payment_service
        .prepare_payment(auth.user_id, request.into_inner())
        .await?;
    Ok(Json(order))
}

/// Verify the gateway payment and confirm the booking
#[openapi(tag = "Payments")]
#[post("/payments/complete", format = "json", data = "<request>")]
pub async fn complete_payment(
    request: Json<PaymentCompleteRequest>,
    auth: AuthenticatedUser,
    payment_service: &State<PaymentService>,
) -> Result<Json<PaymentConfirmation>, AppError> {
    let confirmation = payment_service
        .complete_payment(auth.user_id, request.into_inner())
        .await?;
    Ok(Json(confirmation))
}

#[openapi(tag = "Reservations")]
#[get("/reservations")]
pub async fn my_reservations(
    auth: AuthenticatedUser,
    reservation_service: &State<ReservationService>,
) -> Result<Json<Vec<PaymentConfirmation>>, AppError> {
    Ok(Json(reservation_service.my_reservations(auth.user_id).await?))
}

#[openapi(tag = "Reservations")]
#[get("/reservations/<id>")]
pub async fn get_reservation(
    id: i32,
    auth: AuthenticatedUser,
    reservation_service: &State<ReservationService>,
) -> Result<Json<PaymentConfirmation>, AppError> {
    Ok(Json(reservation_service.get_confirmation(auth.user_id, id).await?))
}

/// Cancel a pending or paid reservation (paid ones are refunded)
#[openapi(tag = "Reservations")]
#[post("/reservations/<id>/cancel")]
pub async fn cancel_reservation(
    id: i32,
    auth: AuthenticatedUser,
    reservation_service: &State<ReservationService>,
) -> Result<Json<PaymentConfirmation>, AppError> {
    Ok(Json(reservation_service.cancel(auth.user_id, id).await?))
}
