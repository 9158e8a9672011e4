mod catalog;
mod config;
mod inference;
mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use inference::{FallbackGenerator, ImageNormalizer, ModelProvider, PredictionService};
use routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let provider = ModelProvider::from_resolution(inference::model::resolve(&config.model));
    let service = web::Data::new(PredictionService::new(
        provider,
        FallbackGenerator::from_config(&config.fallback),
        ImageNormalizer::new(config.image.preprocessing.resize_method),
    ));

    let bind_address = config.bind_address();
    log::info!("Starting server on {}:{}", bind_address.0, bind_address.1);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(service.clone())
            .configure(configure_routes)
    })
    .bind(bind_address)?
    .run()
    .await
}
