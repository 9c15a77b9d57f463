// backend-server/src/api/mod.rs
pub mod session;

use actix_web::web;
use crate::proxy;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/decode").to(session::decode))
        .service(web::resource("/health").to(session::health))
        .service(
            web::resource("/graphql")
                .route(web::post().to(proxy::graphql_route))
                .default_service(web::route().to(session::not_found)),
        )
        .default_service(web::route().to(session::not_found));
}
