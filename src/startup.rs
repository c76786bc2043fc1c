//! Application Startup
//!
//! Application building and server initialization.

use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::application::services::{ConnectionLifecycle, RealtimeServices};
use crate::config::Settings;
use crate::domain::{ContactRepository, Delivery, DeliveryTarget, StoryRepository};
use crate::infrastructure::cache::{
    self, run_delivery_subscriber, EventBus, RedisEventBus, RedisStore, SharedStore,
};
use crate::infrastructure::repositories::{PgContactRepository, PgStoryRepository};
use crate::infrastructure::{database, metrics};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::gateway::Gateway;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<dyn SharedStore>,
    pub gateway: Arc<Gateway>,
    pub realtime: RealtimeServices,
    pub lifecycle: ConnectionLifecycle,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the realtime services over the given collaborators
    pub fn new(
        db: PgPool,
        store: Arc<dyn SharedStore>,
        bus: Arc<dyn EventBus>,
        contacts: Arc<dyn ContactRepository>,
        stories: Arc<dyn StoryRepository>,
        settings: Settings,
    ) -> Self {
        let id_generator = Arc::new(SnowflakeGenerator::new(
            u64::from(settings.snowflake.machine_id),
            settings.snowflake.epoch,
        ));
        let realtime = RealtimeServices::build(
            store.clone(),
            bus,
            contacts,
            stories,
            id_generator,
            &settings,
        );

        Self {
            db,
            store,
            gateway: Arc::new(Gateway::new(settings.websocket.heartbeat_interval_ms)),
            lifecycle: ConnectionLifecycle::new(realtime.clone()),
            realtime,
            settings: Arc::new(settings),
        }
    }
}

/// Build the router with every middleware layer applied
pub fn build_router(state: AppState) -> Router {
    let cors_layer = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors_layer)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    subscriber: JoinHandle<()>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        // Create Redis connections: one manager for commands, one client for pub/sub
        let redis = cache::create_redis_client(&settings.redis).await?;
        let pubsub_client = redis::Client::open(settings.redis.url.as_str())?;
        let channel = settings.redis.delivery_channel.clone();

        let store: Arc<dyn SharedStore> = Arc::new(RedisStore::new(redis.clone()));
        let bus: Arc<dyn EventBus> = Arc::new(RedisEventBus::new(redis, channel.clone()));
        let contacts: Arc<dyn ContactRepository> = Arc::new(PgContactRepository::new(db.clone()));
        let stories: Arc<dyn StoryRepository> = Arc::new(PgStoryRepository::new(db.clone()));

        let addr = settings.server_addr();
        let state = AppState::new(db, store, bus, contacts, stories, settings);

        // Forward bus deliveries to the connections this process holds
        let gateway = state.gateway.clone();
        let subscriber = tokio::spawn(run_delivery_subscriber(
            pubsub_client,
            channel,
            move |delivery: Delivery| {
                metrics::record_bus_delivery(delivery.target == DeliveryTarget::All);
                let queued = gateway.deliver(delivery);
                tracing::trace!(queued = queued, "Delivery forwarded");
            },
        ));

        // Build router with middleware
        let router = build_router(state);

        // Bind to address
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            subscriber,
        })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        let result: Result<()> = tokio::select! {
            result = axum::serve(self.listener, self.router).into_future() => result.map_err(Into::into),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                Ok(())
            }
        };
        self.subscriber.abort();
        result
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}
