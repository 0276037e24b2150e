use actix_web::{web, App, HttpResponse, HttpServer};
use chrono::Utc;
use db_pool::{create_pool, DbConfig};
use engagement_service::services::EventPublisher;
use engagement_service::Config;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    timestamp: String,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        service: "engagement-service",
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn ready(pool: web::Data<PgPool>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "ready": true,
            "timestamp": Utc::now().to_rfc3339(),
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "ready": false,
            "error": e.to_string(),
        })),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(env = %config.app.env, "Starting engagement-service");

    let db_config = DbConfig {
        service_name: "engagement-service".to_string(),
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..DbConfig::default()
    };
    db_config.log_config();

    let pool = create_pool(db_config).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations completed");

    let events = EventPublisher::new(config.redis.url.as_deref());
    info!(realtime = events.is_enabled(), "Event publisher initialized");

    let bind_addr = (config.app.host.clone(), config.app.http_port);
    info!(host = %config.app.host, port = config.app.http_port, "HTTP server listening");

    HttpServer::new({
        let pool = pool.clone();
        let events = events.clone();
        move || {
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .app_data(web::Data::new(events.clone()))
                .route("/health", web::get().to(health))
                .route("/ready", web::get().to(ready))
        }
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}
