//! Composition root: wires the account service, store, matchmaker, robot
//! manager, and statistics worker together, and runs the HTTP listener.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::core::{Clock, RandomSource, SharedRng, SystemClock};
use crate::matchmaker::Matchmaker;
use crate::network::http::build_router;
use crate::robot::RobotManager;
use crate::services::{AccountService, HttpAccountService, MongoStore, Store};
use crate::statistics::StatisticsManager;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("store connection failed: {0}")]
    Store(#[from] crate::errors::StoreError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("http server failed: {0}")]
    Http(#[source] std::io::Error),
}

/// Holds every long-lived collaborator the HTTP handlers need.
pub struct Server {
    pub config: Arc<Config>,
    pub matchmaker: Arc<Matchmaker>,
}

impl Server {
    /// Build the full dependency graph against a real Mongo store and the
    /// real account HTTP backend.
    pub async fn build(config: Config) -> Result<Arc<Self>, ServerError> {
        let config = Arc::new(config);
        let store: Arc<dyn Store> = Arc::new(MongoStore::connect(&config.mongo_uri, &config.mongo_db).await?);
        let accounts: Arc<dyn AccountService> = Arc::new(HttpAccountService::new(
            config.endpoint_describe_user.clone(),
            config.endpoint_transfer.clone(),
            config.robot_uid,
            config.robot_fb_open_id.clone(),
        ));
        Ok(Self::build_with(config, accounts, store))
    }

    /// Build with injected collaborators, for tests or alternative deployments.
    pub fn build_with(config: Arc<Config>, accounts: Arc<dyn AccountService>, store: Arc<dyn Store>) -> Arc<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let rng: Arc<dyn RandomSource> = Arc::new(SharedRng::from_entropy());
        let statistics = StatisticsManager::spawn(store.clone());

        let matchmaker = Arc::new(Matchmaker::new(
            config.clone(),
            accounts.clone(),
            store.clone(),
            statistics,
            clock.clone(),
            rng.clone(),
        ));

        let robot_manager = Arc::new(RobotManager::new(
            matchmaker.clone(),
            accounts,
            rng,
            clock,
            config.robot_uid,
            config.robot_lifetime_second,
        ));
        matchmaker.attach_robot_manager(robot_manager);

        Arc::new(Self { config, matchmaker })
    }

    /// Run the background ticks and the HTTP listener until the process is
    /// terminated.
    pub async fn run(self: Arc<Self>) -> Result<(), ServerError> {
        tokio::spawn(self.matchmaker.clone().run_ticks());

        let addr = self.config.http_bind_addr.clone();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        info!(%addr, "fingerplay server listening");

        let router = build_router(self);
        axum::serve(listener, router).await.map_err(ServerError::Http)?;
        Ok(())
    }
}
