use crate::models::company::{Company, CompanyRequest};
use crate::services::company_service::CompanyService;
use crate::utils::error::AppError;
use crate::utils::jwt::AdminUser;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use rocket_okapi::openapi;

#[openapi(tag = "Admin")]
#[post("/admin/companies", format = "json", data = "<request>")]
pub async fn create_company(
    request: Json<CompanyRequest>,
    _admin: AdminUser,
    company_service: &State<CompanyService>,
) -> Result<Json<Company>, AppError> {
    let company = company_service.create_company(request.into_inner()).await?;
    Ok(Json(company))
}

#[openapi(tag = "Admin")]
#[get("/admin/companies")]
pub async fn list_companies(
    _admin: AdminUser,
    company_service: &State<CompanyService>,
) -> Result<Json<Vec<Company>>, AppError> {
    Ok(Json(company_service.list_companies().await?))
}

#[openapi(tag = "Admin")]
#[get("/admin/companies/<id>")]
pub async fn get_company(
    id: i32,
    _admin: AdminUser,
    company_service: &State<CompanyService>,
) -> Result<Json<Company>, AppError> {
    Ok(Json(company_service.get_company(id).await?))
}

#[openapi(tag = "Admin")]
#[put("/admin/companies/<id>", format = "json", data = "<request>")]
pub async fn update_company(
    id: i32,
    request: Json<CompanyRequest>,
    _admin: AdminUser,
    company_service: &State<CompanyService>,
) -> Result<Json<Company>, AppError> {
    let company = company_service
        .update_company(id, request.into_inner())
        .await?;
    Ok(Json(company))
}

#[openapi(tag = "Admin")]
#[delete("/admin/companies/<id>")]
pub async fn delete_company(
    id: i32,
    _admin: AdminUser,
    company_service: &State<CompanyService>,
) -> Result<Json<Value>, AppError> {
    company_service.delete_company(id).await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}
