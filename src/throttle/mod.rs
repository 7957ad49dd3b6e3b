// Scoped request throttling
//
// Each scope has its own budget; hits are keyed by scope plus caller
// identity so anonymous clients (by IP) and accounts (by user id) are
// counted independently.

pub mod rate;
pub mod store;

use std::sync::Arc;

pub use rate::{Period, Rate, Scope};
pub use store::{CounterStore, MemoryCounterStore};

use crate::config::ThrottleConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct Throttler {
    store: Arc<dyn CounterStore>,
    config: ThrottleConfig,
}

impl Throttler {
    pub fn new(store: Arc<dyn CounterStore>, config: ThrottleConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Record a request for `identity` against `scope`, failing with 429 once
    /// the scope's budget for the current window is spent. Scopes without a
    /// configured rate are unlimited.
    pub async fn check(&self, scope: Scope, identity: &str) -> Result<(), ApiError> {
        if !self.config.enabled {
            return Ok(());
        }

        let Some(rate) = self.config.rate(scope) else {
            return Ok(());
        };

        let key = format!("throttle_{}_{}", scope.as_str(), identity);
        self.store.hit(&key, rate).await.map_err(|retry_after| {
            tracing::warn!(
                "Throttled {} on scope '{}' ({}), retry after {}s",
                identity,
                scope,
                rate,
                retry_after
            );
            ApiError::too_many_requests(retry_after)
        })
    }
}
