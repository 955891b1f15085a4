use std::sync::Arc;

use crate::cache_key::CacheKeys;
use crate::clients::jikan::{JikanApi, JikanClient};
use crate::clients::queue::RequestQueue;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    Acquisition, AcquisitionSettings, AnticipatedService, OverrideRegistry, RankingEngine,
    RankingSettings,
};

/// Everything a command needs, built once per process.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub acquisition: Arc<Acquisition>,

    pub ranking: Arc<RankingEngine>,

    pub anticipated: Arc<AnticipatedService>,

    pub overrides: OverrideRegistry,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let queue = Arc::new(RequestQueue::new(config.jikan.min_request_interval()));
        let jikan = JikanClient::new(&config.jikan, queue)
            .map_err(|e| anyhow::anyhow!("Failed to build Jikan client: {e}"))?;

        Self::with_api(config, Arc::new(jikan)).await
    }

    /// Wires the services around an arbitrary remote API implementation.
    pub async fn with_api(config: Config, api: Arc<dyn JikanApi>) -> anyhow::Result<Self> {
        let keys = CacheKeys::new(config.cache.version.clone());
        let store = Store::new(&config.general.database_path)
            .await?
            .with_cache_ttl(chrono::Duration::hours(config.cache.ttl_hours))
            .with_cache_keys(&keys);

        let acquisition = Arc::new(Acquisition::new(
            api,
            store.clone(),
            keys,
            AcquisitionSettings::from(&config.ranking),
        ));

        let overrides = OverrideRegistry::builtin();

        let ranking = Arc::new(RankingEngine::new(
            acquisition.clone(),
            overrides.clone(),
            RankingSettings::from(&config),
        ));

        let anticipated = Arc::new(AnticipatedService::new(acquisition.clone()));

        Ok(Self {
            config: Arc::new(config),
            store,
            acquisition,
            ranking,
            anticipated,
            overrides,
        })
    }
}
