use crate::models::performance::{
    Performance, PerformanceDetail, PerformanceQuery, PerformanceRequest, PerformanceSummary,
    Schedule, ScheduleCreated, ScheduleRequest,
};
use crate::services::performance_service::PerformanceService;
use crate::utils::error::AppError;
use crate::utils::jwt::AdminUser;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

/// List performances, optionally by category or title keyword
#[openapi(tag = "Performances")]
#[get("/performances?<category>&<keyword>")]
pub async fn list_performances(
    category: Option<String>,
    keyword: Option<String>,
    performance_service: &State<PerformanceService>,
) -> Result<Json<Vec<PerformanceSummary>>, AppError> {
    let performances = performance_service
        .list_performances(PerformanceQuery { category, keyword })
        .await?;
    Ok(Json(performances))
}

/// Performance detail with venue, grades and schedules
#[openapi(tag = "Performances")]
#[get("/performances/<id>")]
pub async fn get_performance(
    id: i32,
    performance_service: &State<PerformanceService>,
) -> Result<Json<PerformanceDetail>, AppError> {
    Ok(Json(performance_service.get_performance_detail(id).await?))
}

#[openapi(tag = "Performances")]
#[get("/performances/<id>/schedules")]
pub async fn list_schedules(
    id: i32,
    performance_service: &State<PerformanceService>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    performance_service.get_performance(id).await?;
    Ok(Json(performance_service.list_schedules(id).await?))
}

#[openapi(tag = "Admin")]
#[post("/admin/performances", format = "json", data = "<request>")]
pub async fn create_performance(
    request: Json<PerformanceRequest>,
    _admin: AdminUser,
    performance_service: &State<PerformanceService>,
) -> Result<Json<Performance>, AppError> {
    let performance = performance_service
        .create_performance(request.into_inner())
        .await?;
    Ok(Json(performance))
}

#[openapi(tag = "Admin")]
#[put("/admin/performances/<id>", format = "json", data = "<request>")]
pub async fn update_performance(
    id: i32,
    request: Json<PerformanceRequest>,
    _admin: AdminUser,
    performance_service: &State<PerformanceService>,
) -> Result<Json<Performance>, AppError> {
    let performance = performance_service
        .update_performance(id, request.into_inner())
        .await?;
    Ok(Json(performance))
}

#[openapi(tag = "Admin")]
#[delete("/admin/performances/<id>")]
pub async fn delete_performance(
    id: i32,
    _admin: AdminUser,
    performance_service: &State<PerformanceService>,
) -> Result<Json<Value>, AppError> {
    performance_service.delete_performance(id).await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

#[openapi(tag = "Admin")]
#[post("/admin/performances/<id>/schedules", format = "json", data = "<request>")]
pub async fn add_schedule(
    id: i32,
    request: Json<ScheduleRequest>,
    _admin: AdminUser,
    performance_service: &State<PerformanceService>,
) -> Result<Json<ScheduleCreated>, AppError> {
    let created = performance_service
        .add_schedule(id, request.into_inner())
        .await?;
    Ok(Json(created))
}

#[openapi(tag = "Admin")]
#[delete("/admin/schedules/<id>")]
pub async fn delete_schedule(
    id: i32,
    _admin: AdminUser,
    performance_service: &State<PerformanceService>,
) -> Result<Json<Value>, AppError> {
    performance_service.delete_schedule(id).await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}
