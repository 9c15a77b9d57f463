// frontend-server/src/routing.rs
use actix_web::{http::header, web, HttpResponse, Responder};
use crate::page::{AuthPage, CONTENT_SECURITY_POLICY};

/// Configure routes for the page server
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").to(index))
        .default_service(web::route().to(not_found));
}

async fn index(page: web::Data<AuthPage>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html")
        .insert_header((header::X_FRAME_OPTIONS, "SAMEORIGIN"))
        .insert_header((header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY))
        .body(page.html().to_string())
}

async fn not_found() -> impl Responder {
    HttpResponse::NotFound().body("Not Found")
}
