// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Lead Intake Service
//!
//! Accepts quote requests from the public form and exposes stored leads to
//! an authenticated admin.
//!
//! ## Usage
//!
//! - `lead-intake` or `lead-intake serve`: run the HTTP service.
//! - `lead-intake hash-password [PASSWORD]`: print an Argon2 PHC string for
//!   `ADMIN_PASSWORD_HASH`. Reads the password from stdin when omitted.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env` if present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `DATABASE_URL`: SurrealDB endpoint, `memory` for an embedded store
//! - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS`: submissions per window (default: 5 / 900)
//! - `CAPTCHA_SECRET`: human-verification provider secret
//! - `SMTP_HOST`, `SMTP_USER`, `SMTP_PASSWORD`, `SALES_EMAIL`: notification mail
//! - `SESSION_SECRET`, `ADMIN_EMAIL`, `ADMIN_PASSWORD_HASH`: admin access

use anyhow::Context;
use clap::{Parser, Subcommand};
use http::{header, HeaderValue, Method};
use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lead_intake::{
    config::Config,
    db::SurrealLeadStore,
    handlers::{router, AppState},
    intake::IntakeService,
    limiter::RateLimiter,
    metrics::Metrics,
    notifier::{MailTransport, Notifier, SmtpMailTransport},
    session::{self, SessionGuard},
    store::LeadStore,
    validator::LeadValidator,
    verification::CaptchaVerifier,
};

#[derive(Parser)]
#[command(name = "lead-intake", about = "Quote request intake service", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Print an Argon2 hash for ADMIN_PASSWORD_HASH
    HashPassword {
        /// Password to hash; read from stdin when omitted
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::HashPassword { password }) = args.command {
        return hash_password(password);
    }

    // `.env` first, so a RUST_LOG set there reaches the filter
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(log_filter())
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        environment = ?config.environment,
        max_submissions = config.rate_limit.max_submissions,
        window_secs = config.rate_limit.window_secs,
        notify_mode = ?config.intake.notify_mode,
        "Starting lead intake service"
    );

    if config.admin.open_access && config.environment.is_production() {
        warn!("ADMIN_OPEN_ACCESS is ignored in production");
    }

    let store: Arc<dyn LeadStore> = Arc::new(
        SurrealLeadStore::connect(&config.database)
            .await
            .context("failed to connect to lead store")?,
    );

    let transport: Option<Arc<dyn MailTransport>> =
        match SmtpMailTransport::from_config(&config.mail)? {
            Some(smtp) => Some(Arc::new(smtp)),
            None => {
                warn!("SMTP not configured, lead notifications will only be logged");
                None
            }
        };
    let notifier = Arc::new(Notifier::new(
        transport,
        config.mail.sales_address.clone(),
        config.mail.timeout(),
    ));

    let verifier = CaptchaVerifier::new(config.captcha.clone())?;
    info!(mode = ?verifier.mode(), "Human verification configured");

    let metrics = Arc::new(Metrics::new()?);
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

    let intake = IntakeService::new(
        Arc::clone(&limiter),
        verifier,
        LeadValidator::new(config.validation.clone()),
        Arc::clone(&store),
        notifier,
        Arc::clone(&metrics),
        config.intake.clone(),
    );

    let state = Arc::new(AppState {
        intake,
        store,
        sessions: Arc::new(SessionGuard::new(&config.admin)),
        metrics,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_interval = config.rate_limit.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let removed = limiter.cleanup().await;
            if removed > 0 {
                info!(removed, "Expired rate limit windows cleaned up");
            }
        }
    });

    let mut app = router(state);
    if let Some(cors) = cors_layer(&config.cors_origins) {
        app = app.layer(cors);
    }

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

fn log_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy()
}

/// CORS for the public form, or `None` when no origins are allowed.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn hash_password(password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    anyhow::ensure!(!password.is_empty(), "password must not be empty");

    println!("{}", session::hash_password(&password)?);
    Ok(())
}
