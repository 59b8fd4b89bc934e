use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursepay::config::Config;
use coursepay::db::{create_pool, init_db, queries, AppState};
use coursepay::handlers;
use coursepay::models::{CreateCourse, CreateDiscount, DiscountKind};

#[derive(Parser, Debug)]
#[command(name = "coursepay")]
#[command(about = "Checkout and payment reconciliation for an online course marketplace")]
struct Cli {
    /// Seed the database with dev data (courses and discount codes)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with dev data for manual testing.
/// Only runs when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count = queries::count_courses(&conn).expect("Failed to count courses");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("Seeding dev data");

    let course = queries::create_course(
        &conn,
        &CreateCourse {
            name: "Fullstack Web Development".to_string(),
            slug: "fullstack-web-development".to_string(),
            price: 299_000,
        },
    )
    .expect("Failed to create dev course");

    queries::create_course(
        &conn,
        &CreateCourse {
            name: "UI Design Fundamentals".to_string(),
            slug: "ui-design-fundamentals".to_string(),
            price: 149_000,
        },
    )
    .expect("Failed to create dev course");

    let discount = queries::create_discount(
        &conn,
        &CreateDiscount {
            code: "LAUNCH50".to_string(),
            kind: DiscountKind::Percentage,
            value: 50,
            minimum_amount: None,
            maximum_discount: Some(100_000),
            usage_limit: Some(100),
            start_date: None,
            end_date: None,
        },
    )
    .expect("Failed to create dev discount");

    tracing::info!("Seeded course {} and discount {}", course.slug, discount.code);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if config.dev_mode {
                "coursepay=debug,tower_http=debug".into()
            } else {
                "coursepay=info".into()
            }
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = pool.get().expect("Failed to get database connection");
        init_db(&conn).expect("Failed to initialize schema");
    }

    let state = AppState {
        db: pool,
        base_url: config.base_url.clone(),
        admin_fee: config.admin_fee,
        midtrans: config.midtrans.clone(),
        tripay: config.tripay.clone(),
        notify_url: config.notify_webhook_url.clone(),
        http: reqwest::Client::new(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed requested outside dev mode, skipping");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/checkout", post(handlers::initiate_checkout))
        .route("/discounts/validate", post(handlers::validate_discount))
        .route(
            "/webhooks/midtrans",
            post(handlers::webhooks::handle_midtrans_webhook),
        )
        .route(
            "/webhooks/tripay",
            post(handlers::webhooks::handle_tripay_webhook),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for shutdown signal");
        })
        .await
        .expect("Server error");

    if cli.ephemeral && config.dev_mode {
        tracing::info!("Ephemeral mode: removing {}", config.database_path);
        let _ = std::fs::remove_file(&config.database_path);
        let _ = std::fs::remove_file(format!("{}-wal", config.database_path));
        let _ = std::fs::remove_file(format!("{}-shm", config.database_path));
    }
}
