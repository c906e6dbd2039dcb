/// HTTP admin surface for task administration.
pub mod routes;

use actix_web::HttpResponse;
use serde::Serialize;

pub use routes::routes;

/// Uniform response envelope for every admin endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn success<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        status: "success",
        message: message.to_string(),
        data: Some(data),
    })
}

pub fn failure(message: String) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::<()> { status: "error", message, data: None })
}
