use crate::models::coupon::{Coupon, CouponRequest, CouponValidationRequest, PriceBreakdown};
use crate::services::coupon_service::CouponService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

/// Coupons the current user can still use
#[openapi(tag = "Coupons")]
#[get("/coupons/available?<performance_id>")]
pub async fn available_coupons(
    performance_id: Option<i32>,
    auth: AuthenticatedUser,
    coupon_service: &State<CouponService>,
) -> Result<Json<Vec<Coupon>>, AppError> {
    let coupons = coupon_service
        .available_coupons(auth.user_id, performance_id)
        .await?;
    Ok(Json(coupons))
}

/// Apply coupons to the held seats and return the price breakdown
#[openapi(tag = "Coupons")]
#[post("/coupons/validate", format = "json", data = "<request>")]
pub async fn validate_coupons(
    request: Json<CouponValidationRequest>,
    auth: AuthenticatedUser,
    coupon_service: &State<CouponService>,
) -> Result<Json<PriceBreakdown>, AppError> {
    let breakdown = coupon_service
        .validate_coupons(auth.user_id, request.into_inner())
        .await?;
    Ok(Json(breakdown))
}

#[openapi(tag = "Admin")]
#[post("/admin/coupons", format = "json", data = "<request>")]
pub async fn create_coupon(
    request: Json<CouponRequest>,
    _admin: AdminUser,
    coupon_service: &State<CouponService>,
) -> Result<Json<Coupon>, AppError> {
    Ok(Json(coupon_service.create_coupon(request.into_inner()).await?))
}

#[openapi(tag = "Admin")]
#[get("/admin/coupons")]
pub async fn list_coupons(
    _admin: AdminUser,
    coupon_service: &State<CouponService>,
) -> Result<Json<Vec<Coupon>>, AppError> {
    Ok(Json(coupon_service.list_coupons().await?))
}

#[openapi(tag = "Admin")]
#[get("/admin/coupons/<id>")]
pub async fn get_coupon(
    id: i32,
    _admin: AdminUser,
    coupon_service: &State<CouponService>,
) -> Result<Json<Coupon>, AppError> {
    Ok(Json(coupon_service.get_coupon(id).await?))
}

#[openapi(tag = "Admin")]
#[put("/admin/coupons/<id>", format = "json", data = "<request>")]
pub async fn update_coupon(
    id: i32,
    request: Json<CouponRequest>,
    _admin: AdminUser,
    coupon_service: &State<CouponService>,
) -> Result<Json<Coupon>, AppError> {
    Ok(Json(coupon_service.update_coupon(id, request.into_inner()).await?))
}

/// Deactivate a coupon; redeemed coupons stay on record
#[openapi(tag = "Admin")]
#[delete("/admin/coupons/<id>")]
pub async fn deactivate_coupon(
    id: i32,
    _admin: AdminUser,
    coupon_service: &State<CouponService>,
) -> Result<Json<Coupon>, AppError> {
    Ok(Json(coupon_service.deactivate_coupon(id).await?))
}
