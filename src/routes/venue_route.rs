use crate::models::venue::{
    SeatBlockRequest, SeatBlockResponse, SeatGrade, SeatGradeRequest, SeatingChart, Venue,
    VenueDetail, VenueRequest,
};
use crate::services::venue_service::VenueService;
use crate::utils::error::AppError;
use crate::utils::jwt::AdminUser;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// Seating chart of a schedule with live availability
#[openapi(tag = "Performances")]
#[get("/schedules/<schedule_id>/seating-chart")]
pub async fn seating_chart(
    schedule_id: i32,
    venue_service: &State<VenueService>,
) -> Result<Json<SeatingChart>, AppError> {
    Ok(Json(venue_service.seating_chart(schedule_id).await?))
}

#[openapi(tag = "Admin")]
#[post("/admin/venues", format = "json", data = "<request>")]
pub async fn create_venue(
    request: Json<VenueRequest>,
    _admin: AdminUser,
    venue_service: &State<VenueService>,
) -> Result<Json<Venue>, AppError> {
    Ok(Json(venue_service.create_venue(request.into_inner()).await?))
}

#[openapi(tag = "Admin")]
#[get("/admin/venues")]
pub async fn list_venues(
    _admin: AdminUser,
    venue_service: &State<VenueService>,
) -> Result<Json<Vec<Venue>>, AppError> {
    Ok(Json(venue_service.list_venues().await?))
}

#[openapi(tag = "Admin")]
#[get("/admin/venues/<id>")]
pub async fn get_venue(
    id: i32,
    _admin: AdminUser,
    venue_service: &State<VenueService>,
) -> Result<Json<VenueDetail>, AppError> {
    Ok(Json(venue_service.get_venue_detail(id).await?))
}

#[openapi(tag = "Admin")]
#[put("/admin/venues/<id>", format = "json", data = "<request>")]
pub async fn update_venue(
    id: i32,
    request: Json<VenueRequest>,
    _admin: AdminUser,
    venue_service: &State<VenueService>,
) -> Result<Json<Venue>, AppError> {
    Ok(Json(venue_service.update_venue(id, request.into_inner()).await?))
}

#[openapi(tag = "Admin")]
#[delete("/admin/venues/<id>")]
pub async fn delete_venue(
    id: i32,
    _admin: AdminUser,
    venue_service: &State<VenueService>,
) -> Result<Json<Value>, AppError> {
    venue_service.delete_venue(id).await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

/// Add a seat grade (VIP, R, S, ...) with its price
#[openapi(tag = "Admin")]
#[post("/admin/venues/<id>/grades", format = "json", data = "<request>")]
pub async fn add_grade(
    id: i32,
    request: Json<SeatGradeRequest>,
    _admin: AdminUser,
    venue_service: &State<VenueService>,
) -> Result<Json<SeatGrade>, AppError> {
    Ok(Json(venue_service.add_grade(id, request.into_inner()).await?))
}

#[openapi(tag = "Admin")]
#[get("/admin/venues/<id>/grades")]
pub async fn list_grades(
    id: i32,
    _admin: AdminUser,
    venue_service: &State<VenueService>,
) -> Result<Json<Vec<SeatGrade>>, AppError> {
    Ok(Json(venue_service.list_grades(id).await?))
}

/// Generate a block of seats for the seating chart
#[openapi(tag = "Admin")]
#[post("/admin/venues/<id>/seats", format = "json", data = "<request>")]
pub async fn add_seats(
    id: i32,
    request: Json<SeatBlockRequest>,
    _admin: AdminUser,
    venue_service: &State<VenueService>,
) -> Result<Json<SeatBlockResponse>, AppError> {
    Ok(Json(venue_service.add_seats(id, request.into_inner()).await?))
}
