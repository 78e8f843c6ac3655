use crate::utils::error::AppError;
use rocket_okapi::okapi::openapi3::{Response, Responses, MediaType};
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::RefOr;
use okapi::openapi3::SchemaObject;
use indexmap::IndexMap;
use serde_json::json;

impl<'r> OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();

        // Define error responses
        let error_responses = [
            ("Bad Request", AppError::ValidationError("Bad Requests".to_string())),
            ("Unauthorized", AppError::AuthError("Unauthorized".to_string())),
            ("Payment Required", AppError::PaymentError("Payment was not approved".to_string())),
            ("Forbidden", AppError::Forbidden("Admin role required".to_string())),
            ("NotFound", AppError::NotFound("Not Found".to_string())),
            ("Conflict", AppError::Conflict("Seat is already held".to_string())),
            ("InternalServerError", AppError::DatabaseError("Internal ServerError".to_string())),
            ("Unprocessable", AppError::Unprocessable("Coupon has expired".to_string())),
        ];

        for (description, error) in error_responses {
            responses.responses.insert(
                error.status().code.to_string(),
                RefOr::Object(Response {
                    description: description.to_string(),
                    content: {
                        let mut content = IndexMap::new();
                        content.insert(
                            "application/json".to_string(),
                            MediaType {
                                schema: Some(SchemaObject::default()),
                                example: Some(json!({
                                    "error": error.to_string()
                                })),
                                ..Default::default()
                            },
                        );
                        content
                    },
                    ..Default::default()
                }),
            );
        }

        Ok(responses)
    }
}
