use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use lifebuddy::adapters::auth::JwtSessionValidator;
use lifebuddy::adapters::http::{api_router, SubscriptionAppState};
use lifebuddy::adapters::memory::InMemorySubscriptionRepository;
use lifebuddy::adapters::postgres::PostgresSubscriptionRepository;
use lifebuddy::adapters::InMemoryEventBus;
use lifebuddy::application::handlers::subscription::{ExpireTrialsCommand, ExpireTrialsHandler};
use lifebuddy::config::{AppConfig, DatabaseConfig, ServerConfig};
use lifebuddy::domain::foundation::Timestamp;
use lifebuddy::ports::{EventPublisher, SubscriptionRepository};

type BoxError = Box<dyn Error + Send + Sync>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server)?;
    config.validate()?;

    match std::env::args().nth(1).as_deref() {
        None | Some("serve") => serve(config).await,
        Some("sweep") => sweep(config).await,
        Some("version") => {
            println!("lifebuddy v{VERSION}");
            Ok(())
        }
        Some(other) => {
            Err(format!("unknown command '{other}'; usage: lifebuddy <serve | sweep | version>").into())
        }
    }
}

async fn serve(config: AppConfig) -> Result<(), BoxError> {
    let repository = subscription_repository(config.database.as_ref(), config.is_production()).await?;
    let event_publisher: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
    let validator = Arc::new(JwtSessionValidator::new(
        &config.auth.jwt_secret,
        config.auth.jwt_issuer.as_deref(),
    ));

    let admins = config.entitlements.admin_allowlist();
    tracing::info!(
        admins = admins.len(),
        trial_days = config.entitlements.trial_days,
        "entitlements configured"
    );

    let state = SubscriptionAppState::new(
        repository,
        event_publisher,
        admins,
        config.entitlements.trial_policy(),
    );

    let app = api_router(state, validator)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, version = VERSION, "lifebuddy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// One expiry sweep, for an external scheduler to run periodically.
async fn sweep(config: AppConfig) -> Result<(), BoxError> {
    let repository = subscription_repository(config.database.as_ref(), config.is_production()).await?;
    let handler = ExpireTrialsHandler::new(repository, Arc::new(InMemoryEventBus::new()));

    let result = handler
        .handle(ExpireTrialsCommand {
            now: Timestamp::now(),
        })
        .await?;

    tracing::info!(
        trials_expired = result.trials_expired,
        subscriptions_expired = result.subscriptions_expired,
        failed = result.failed,
        "expiry sweep finished"
    );
    Ok(())
}

async fn subscription_repository(
    database: Option<&DatabaseConfig>,
    is_production: bool,
) -> Result<Arc<dyn SubscriptionRepository>, BoxError> {
    let Some(database) = database else {
        if is_production {
            tracing::warn!("no database configured; subscriptions will not survive a restart");
        } else {
            tracing::info!("using in-memory subscription store");
        }
        return Ok(Arc::new(InMemorySubscriptionRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect(&database.url)
        .await?;

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }

    Ok(Arc::new(PostgresSubscriptionRepository::new(pool)))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() && !server.is_production() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// JSON logs in production, pretty logs elsewhere. `RUST_LOG` wins over
/// `server.log_level`.
fn init_tracing(server: &ServerConfig) -> Result<(), BoxError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directive) => EnvFilter::from_str(&directive)?,
        Err(_) => EnvFilter::from_str(&server.log_level)?,
    };

    let subscriber = tracing_subscriber::registry()
        .with(if server.is_production() {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true),
            ) as Box<dyn Layer<_> + Send + Sync>
        } else {
            Box::new(tracing_subscriber::fmt::layer().pretty())
        })
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("received interrupt signal");
}
