//! Proposition cache.
//!
//! Identical alerts (same category and description) tend to arrive in
//! bursts, like a flapping CI job or a spam wave. Caching the last successful
//! fetch keeps repeat alerts off the downstream service. Only successful,
//! non-empty fetches are cached; failures never are.

use crate::config::CacheConfig;
use moka::future::Cache;
use remedian_core::{Alert, Proposition};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// TTL-bounded cache of fetched propositions.
pub struct PropositionCache {
    cache: Cache<u64, Vec<Proposition>>,
}

impl PropositionCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    fn key(alert: &Alert) -> u64 {
        let mut hasher = DefaultHasher::new();
        alert.category.as_str().hash(&mut hasher);
        alert.description.hash(&mut hasher);
        hasher.finish()
    }

    pub async fn get(&self, alert: &Alert) -> Option<Vec<Proposition>> {
        self.cache.get(&Self::key(alert)).await
    }

    pub async fn insert(&self, alert: &Alert, propositions: Vec<Proposition>) {
        self.cache.insert(Self::key(alert), propositions).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedian_core::{ActionKind, AlertCategory};
    use std::collections::HashMap;

    fn proposition(id: &str) -> Proposition {
        Proposition {
            id: id.to_string(),
            alert_id: "a-1".to_string(),
            action_kind: ActionKind::Review,
            confidence: 0.7,
            recommendation: "review".to_string(),
            execution_details: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_hit_requires_same_category_and_description() {
        let cache = PropositionCache::new(&CacheConfig::default());
        let alert = Alert::new("a-1", AlertCategory::CiFailure, 5, "assertion failed").unwrap();
        cache.insert(&alert, vec![proposition("p-1")]).await;

        // Same content under a different alert id still hits.
        let twin = Alert::new("a-2", AlertCategory::CiFailure, 9, "assertion failed").unwrap();
        assert!(cache.get(&twin).await.is_some());

        let other = Alert::new("a-3", AlertCategory::CiFailure, 5, "different text").unwrap();
        assert!(cache.get(&other).await.is_none());

        let cross = Alert::new("a-4", AlertCategory::SpamIncident, 5, "assertion failed").unwrap();
        assert!(cross.category != alert.category);
        assert!(cache.get(&cross).await.is_none());
    }
}
