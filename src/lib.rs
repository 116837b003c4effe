pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;
use tracing::info;

use services::{JwtKeys, TicketService};
use store::{PgTicketStore, TicketStore};

// Shared state for every request
#[derive(Clone)]
pub struct AppState {
    pub tickets: TicketService,
    pub store: Arc<dyn TicketStore>,
    pub jwt: JwtKeys,
    pub config: config::Config,
}

impl AppState {
    /// Connects to PostgreSQL, runs the migrations and wires the services.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database).await?;
        info!("Database connected");

        db.run_migrations().await?;

        let store: Arc<dyn TicketStore> = Arc::new(PgTicketStore::new(db.pool.clone()));
        Ok(Self::with_store(config, store))
    }

    /// Wires the services over an already built store.
    pub fn with_store(config: config::Config, store: Arc<dyn TicketStore>) -> Arc<Self> {
        let tickets = TicketService::new(
            store.clone(),
            config.tickets.max,
            config.database.store_timeout(),
        );
        let jwt = JwtKeys::from_config(&config.jwt);

        Arc::new(Self {
            tickets,
            store,
            jwt,
            config,
        })
    }
}
