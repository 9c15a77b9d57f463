// frontend-server/src/main.rs
use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config};
use frontend_server::{page::AuthPage, routing::routes};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();
    let server_addr = config.frontend_server_addr.clone();

    tracing::info!("Starting Frontend Server on {}", server_addr);
    tracing::info!(
        "Provider {} (origin {}), backend {}",
        config.frontend.target_iframe_url,
        config.frontend.allowed_origin,
        config.frontend.backend_url
    );

    let page = web::Data::new(AuthPage::render(&config.frontend));

    HttpServer::new(move || {
        App::new()
            .app_data(page.clone())
            .configure(routes)
    })
    .bind(&server_addr)?
    .run()
    .await
}
