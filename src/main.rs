use std::io;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;

use shop_backend::config::{Config, CorsOrigins};
use shop_backend::routes;
use shop_backend::state::AppState;

fn cors(origins: &CorsOrigins) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);
    match origins {
        CorsOrigins::Any => cors.allow_any_origin(),
        CorsOrigins::List(list) => list
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin)),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok(); // Load environment variables from .env file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    std::fs::create_dir_all(&config.upload_dir)?;

    let state = AppState::new(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let state = web::Data::new(state);

    info!("Server Running on port {}", config.port);
    let origins = config.cors_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(Logger::default())
            .configure(|cfg| routes::configure(cfg, &state))
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}
