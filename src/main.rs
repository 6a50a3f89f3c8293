use std::net::SocketAddr;
use std::sync::Arc;

use usergate::core::auth::{
    AppState, AttemptThrottle, AuthService, JwtConfig, JwtService, LogResetNotifier,
    PasswordResetService, RetentionTask, RevocationList, SessionGuard, api_router,
};
use usergate::core::config::Config;
use usergate::core::db::{
    DbConfig, MemoryStore, ResetTicketRepository, ResetTicketStore, RevokedTokenRepository,
    RevokedTokenStore, UserRepository, UserStore, create_pool_with_migrations,
};

struct Stores {
    users: Arc<dyn UserStore>,
    revoked: Arc<dyn RevokedTokenStore>,
    tickets: Arc<dyn ResetTicketStore>,
}

async fn open_stores(config: &Config) -> Result<Stores, Box<dyn std::error::Error>> {
    if !config.has_database() && cfg!(debug_assertions) {
        tracing::warn!("DATABASE_URL not set, using in-memory storage (state is lost on restart)");
        let store = Arc::new(MemoryStore::new());
        return Ok(Stores {
            users: store.clone(),
            revoked: store.clone(),
            tickets: store,
        });
    }

    let db_config = DbConfig::from_config(config)?;
    let pool = create_pool_with_migrations(&db_config).await?;
    tracing::info!("Connected to database");

    Ok(Stores {
        users: Arc::new(UserRepository::new(pool.clone())),
        revoked: Arc::new(RevokedTokenRepository::new(pool.clone())),
        tickets: Arc::new(ResetTicketRepository::new(pool)),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load application config from environment variables
    let config = Config::from_env();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, jwt_secret={}, rate_limit={}/{}s",
        config.has_database(),
        config.has_jwt_secret(),
        config.rate_limit,
        config.rate_limit_window_secs
    );

    let jwt = JwtService::new(JwtConfig::from_config(&config)?);
    let stores = open_stores(&config).await?;

    let revocations = RevocationList::new(stores.revoked);
    let throttle = Arc::new(AttemptThrottle::from_config(&config));

    if let Some(period) = config.retention_sweep_interval() {
        RetentionTask::new(
            revocations.clone(),
            stores.tickets.clone(),
            throttle.clone(),
            config.reset_ticket_retention(),
        )
        .spawn(period);
    }

    let state = AppState {
        auth_service: AuthService::new(
            stores.users.clone(),
            jwt.clone(),
            revocations.clone(),
            config.bcrypt_cost,
        ),
        reset_service: PasswordResetService::new(
            stores.users,
            stores.tickets,
            Arc::new(LogResetNotifier),
            &config,
        ),
        guard: SessionGuard::new(jwt, revocations),
        throttle,
    };

    let app = api_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
