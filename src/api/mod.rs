pub mod attendance;
pub mod error;

use actix_web::{HttpResponse, Responder};
use utoipa::OpenApi;

use crate::docs::ApiDoc;

pub async fn health() -> impl Responder {
    "OK"
}

pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
