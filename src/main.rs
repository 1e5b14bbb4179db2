mod auth;
mod classifier;
mod database;
mod errors;
mod handlers;
mod models;
mod query;
mod slug;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::env;

use crate::database::Database;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("{}:{}", host, port);

    let database_url = env::var("DATABASE_URL").map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "DATABASE_URL must be set in environment",
        )
    })?;

    let db = Database::connect(&database_url).await.map_err(|err| {
        log::error!("Failed to initialize database: {err:?}");
        std::io::Error::new(std::io::ErrorKind::Other, err)
    })?;

    let db_data = web::Data::new(db.clone());

    log::info!("🚀 Starting Trusted Business Directory on {}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(
                web::scope("/api")
                    // Public directory
                    .service(handlers::list_businesses)
                    .service(handlers::get_business)
                    .service(handlers::submit_review)
                    .service(handlers::search_suggestions)
                    .service(handlers::home)
                    // Accounts
                    .service(handlers::signup)
                    .service(handlers::login)
                    .service(handlers::logout)
                    .service(handlers::get_profile)
                    .service(handlers::update_profile)
                    .service(handlers::change_password)
                    // Admin
                    .service(handlers::admin_list_businesses)
                    .service(handlers::admin_business_action)
                    .service(handlers::admin_delete_business)
                    .service(handlers::admin_list_reviews)
                    .service(handlers::admin_review_action)
                    .service(handlers::admin_list_users)
                    .service(handlers::admin_user_action)
                    .service(handlers::admin_stats)
                    .service(handlers::admin_get_settings)
                    .service(handlers::admin_save_settings),
            )
    })
    .bind(&bind_address)?
    .run()
    .await?;

    // Drain pooled connections before exiting.
    db.close().await;

    Ok(())
}
