use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::{MemoryStore, Store};
use crate::throttle::{CounterStore, MemoryCounterStore, Throttler};

/// Shared handles cloned into every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub throttler: Throttler,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, counters: Arc<dyn CounterStore>) -> Self {
        let tokens = TokenService::new(&config.security);
        let throttler = Throttler::new(counters, config.throttle.clone());
        Self {
            config: Arc::new(config),
            store,
            tokens,
            throttler,
        }
    }

    /// Process-local store and counters; data is lost on restart
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCounterStore::new()),
        )
    }
}
