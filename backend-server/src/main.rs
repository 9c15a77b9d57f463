// backend-server/src/main.rs
use actix_web::{web, App, HttpServer};
use backend_server::{api, middleware::gate::Gate, state::AppState};
use common::{setup_tracing, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();
    let server_addr = config.backend_server_addr.clone();
    let backend = config.backend;

    if backend.allows_any_origin() {
        tracing::warn!("ALLOWED_ORIGIN is '*': any origin is reflected with credentials allowed");
    }
    if backend.public_key.trim().is_empty() {
        tracing::warn!("PUBLIC_KEY is not set, /decode will reject every token");
    }

    tracing::info!("Starting Backend Server on {}", server_addr);
    tracing::info!("Proxying GraphQL to {}", backend.graphql_endpoint());

    let state = web::Data::new(AppState::new(backend.clone()));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Gate::new(backend.clone()))
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
