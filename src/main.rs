mod db;
mod domain;
mod import_utils;
mod middleware;
mod scoring;
mod services;
mod state;
mod web;

use crate::middleware::RateLimiter;
use crate::services::notify::Notifier;
use crate::state::SharedState;
use axum::{routing::get_service, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, services::ServeDir, services::ServeFile, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL missing");
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    db::seed::seed_all(&pool).await?;

    let session_key = std::env::var("SESSION_KEY")
        .expect("SESSION_KEY missing")
        .into_bytes();

    let shared: SharedState = Arc::new(state::AppState {
        pool,
        session_key,
        notifier: Notifier::from_env(),
        login_limiter: RateLimiter::new(5, 60),
        database_url,
        org_tz: state::org_timezone(),
        started_at: chrono::Utc::now(),
    });

    let scheduler = JobScheduler::new().await?;

    // Reminder sweep for running surveys, 09:00 JST daily.
    if shared.notifier.is_configured() {
        let shared_for_reminders = shared.clone();
        scheduler
            .add(Job::new_async("0 0 0 * * *", move |_uuid, _l| {
                let state = shared_for_reminders.clone();
                Box::pin(async move {
                    if let Err(e) = send_survey_reminders(&state).await {
                        tracing::error!("Reminder sweep failed: {}", e);
                    }
                })
            })?)
            .await?;
    } else {
        tracing::info!("Reminder sweep disabled (no notification webhook)");
    }

    // Login rate-limiter housekeeping, hourly.
    let shared_for_cleanup = shared.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let state = shared_for_cleanup.clone();
            Box::pin(async move {
                state.login_limiter.cleanup().await;
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Scheduler started");

    let static_handler = ServeDir::new("static").not_found_service(ServeFile::new("static/index.html"));

    let app = Router::new()
        .merge(web::routes(shared.clone()))
        .fallback_service(get_service(static_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
        let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        format!("0.0.0.0:{}", port)
    });
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Remind everyone who has not fully answered a currently running survey.
async fn send_survey_reminders(state: &SharedState) -> anyhow::Result<()> {
    let surveys = db::list_surveys(&state.pool).await?;
    let running: Vec<_> = surveys.into_iter().filter(|s| s.running).collect();

    for survey in running {
        let targets = db::non_responders(&state.pool, survey.id).await?;
        if targets.is_empty() {
            continue;
        }
        tracing::info!(
            "Sending reminders for survey '{}' to {} employees",
            survey.name,
            targets.len()
        );

        let mut sent = 0usize;
        let mut failed = 0usize;
        for employee in targets {
            match state.notifier.send(&employee, &survey, None).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!("Failed to remind {}: {}", employee.email, e);
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
        }

        tracing::info!(
            "Reminder sweep for '{}' finished: {} sent, {} failed",
            survey.name,
            sent,
            failed
        );
    }

    Ok(())
}
