//! Versioned offline cache with cache-first request handling

use bbtimer_config::Manifest;
use bbtimer_host_api::{
    FetchMode, Network, Request, Response, WorkerHost, STATUS_REQUEST_TIMEOUT,
};
use bbtimer_store::CacheStorage;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{CacheError, CacheResult, PrecacheError};

/// Body of the synthetic response served when nothing else can answer
pub const OFFLINE_BODY: &str =
    "Requested page unavailable in offline cache, and network connection not available.";

/// Outcome of a successful install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub generation: String,
    pub asset_count: usize,
    pub total_bytes: usize,
}

/// Outcome of a successful activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub generation: String,
    /// Stale generations that were deleted
    pub purged: Vec<String>,
    /// Whether open clients are now controlled by this generation
    pub clients_claimed: bool,
}

/// The offline asset cache
pub struct OfflineCache {
    manifest: Manifest,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    worker: Arc<dyn WorkerHost>,
}

impl OfflineCache {
    pub fn new(
        manifest: Manifest,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        worker: Arc<dyn WorkerHost>,
    ) -> Self {
        Self {
            manifest,
            storage,
            network,
            worker,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Key of the generation this version owns
    pub fn generation_key(&self) -> String {
        self.manifest.generation_key()
    }

    /// Precache every manifest URL into the current generation.
    ///
    /// All assets are fetched before anything is written, and the generation
    /// is written in one storage transaction: a failed install leaves storage
    /// exactly as it was.
    pub async fn install(&self) -> CacheResult<InstallReport> {
        let generation = self.generation_key();
        info!(
            generation = %generation,
            asset_count = self.manifest.urls.len(),
            "Caching assets for offline use"
        );

        let mut entries = Vec::with_capacity(self.manifest.urls.len());
        for url in &self.manifest.urls {
            let request = Request::get(url.clone());
            let response = self
                .network
                .fetch(&request, FetchMode::NoStore)
                .await
                .map_err(|source| PrecacheError::Network {
                    url: url.clone(),
                    source,
                })?;

            if !response.is_cacheable() {
                warn!(url = %url, status = response.status, "Precache fetch rejected");
                return Err(PrecacheError::BadStatus {
                    url: url.clone(),
                    status: response.status,
                }
                .into());
            }

            debug!(url = %url, bytes = response.body.len(), "Asset fetched");
            entries.push((request.cache_key().to_string(), response));
        }

        self.storage.write_generation(&generation, &entries)?;

        let total_bytes = entries.iter().map(|(_, r)| r.body.len()).sum();

        // Take over from any waiting installation right away
        if let Err(e) = self.worker.skip_waiting().await {
            warn!(error = %e, "Failed to skip waiting");
        }

        info!(generation = %generation, total_bytes, "Install complete");

        Ok(InstallReport {
            generation,
            asset_count: entries.len(),
            total_bytes,
        })
    }

    /// Delete every generation except the current one and claim open clients.
    ///
    /// Refuses to run if the current generation was never installed, so a
    /// failed install cannot cost clients their last working cache.
    pub async fn activate(&self) -> CacheResult<ActivateReport> {
        let generation = self.generation_key();
        info!(generation = %generation, "Activating cache generation");

        if !self.storage.has_generation(&generation)? {
            warn!(generation = %generation, "Current generation missing, keeping existing caches");
            return Err(CacheError::NotInstalled(generation));
        }

        let purge = async { self.purge_stale(&generation) };
        let (purged, claimed) = tokio::join!(purge, self.worker.claim_clients());

        let purged = purged?;
        let clients_claimed = match claimed {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to claim clients; they switch over on next load");
                false
            }
        };

        info!(
            generation = %generation,
            purged_count = purged.len(),
            clients_claimed,
            "Activation complete"
        );

        Ok(ActivateReport {
            generation,
            purged,
            clients_claimed,
        })
    }

    fn purge_stale(&self, current: &str) -> CacheResult<Vec<String>> {
        let mut purged = Vec::new();
        for key in self.storage.generation_keys()? {
            if key == current {
                continue;
            }
            info!(generation = %key, "Deleting stale cache");
            if self.storage.delete_generation(&key)? {
                purged.push(key);
            }
        }
        Ok(purged)
    }

    /// Answer a request: cache first, then network, then the fallback page.
    ///
    /// Never fails; the last resort is a synthetic 408.
    pub async fn handle(&self, request: &Request) -> Response {
        let generation = self.generation_key();

        if request.is_get() {
            match self.storage.lookup(&generation, request.cache_key()) {
                Ok(Some(response)) => {
                    debug!(url = %request.url, "Cache hit");
                    return response;
                }
                Ok(None) => debug!(url = %request.url, "Cache miss"),
                Err(e) => warn!(url = %request.url, error = %e, "Cache lookup failed"),
            }
        }

        match self.network.fetch(request, FetchMode::Default).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Network fetch failed, serving fallback");
                self.offline_response(&generation)
            }
        }
    }

    fn offline_response(&self, generation: &str) -> Response {
        match self.storage.lookup(generation, &self.manifest.fallback_url) {
            Ok(Some(fallback)) => fallback,
            Ok(None) => Response::text(STATUS_REQUEST_TIMEOUT, OFFLINE_BODY),
            Err(e) => {
                warn!(error = %e, "Fallback lookup failed");
                Response::text(STATUS_REQUEST_TIMEOUT, OFFLINE_BODY)
            }
        }
    }

    /// Request keys stored in the current generation
    pub fn generation_entries(&self) -> CacheResult<Vec<String>> {
        Ok(self.storage.entry_keys(&self.generation_key())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbtimer_host_api::{MockNetwork, MockWorkerHost};
    use bbtimer_store::{MemoryStore, UnavailableStore};

    const INDEX: &str = "/timer/index.html";
    const SCRIPT: &str = "/timer/timer.js";
    const BEEP: &str = "/timer/media/sounds/beep.mp3";

    struct Fixture {
        storage: Arc<MemoryStore>,
        network: Arc<MockNetwork>,
        worker: Arc<MockWorkerHost>,
    }

    impl Fixture {
        fn new() -> Self {
            let network = MockNetwork::new();
            network.serve(INDEX, Response::new(200, "<html>timer</html>"));
            network.serve(SCRIPT, Response::new(200, "tick()"));
            network.serve(BEEP, Response::new(200, vec![0xff, 0xfb]));

            Self {
                storage: Arc::new(MemoryStore::new()),
                network: Arc::new(network),
                worker: Arc::new(MockWorkerHost::new()),
            }
        }

        fn cache(&self, version: &str, urls: &[&str]) -> OfflineCache {
            let manifest = Manifest::new(
                version,
                "bbtimer_",
                urls.iter().map(|u| u.to_string()).collect(),
                INDEX,
            );
            OfflineCache::new(
                manifest,
                self.storage.clone(),
                self.network.clone(),
                self.worker.clone(),
            )
        }
    }

    #[tokio::test]
    async fn install_stores_exactly_the_manifest() {
        let fx = Fixture::new();
        let cache = fx.cache("0.2", &[INDEX, SCRIPT, BEEP]);

        let report = cache.install().await.unwrap();

        assert_eq!(report.generation, "bbtimer_0.2");
        assert_eq!(report.asset_count, 3);
        assert_eq!(cache.generation_entries().unwrap(), vec![INDEX, SCRIPT, BEEP]);
        assert_eq!(
            fx.storage.lookup("bbtimer_0.2", BEEP).unwrap().unwrap().body,
            vec![0xff, 0xfb]
        );
        // Every precache fetch bypasses HTTP caches
        assert!(fx.network.fetched().iter().all(|(_, mode)| *mode == FetchMode::NoStore));
        assert_eq!(fx.worker.skip_waiting_calls(), 1);
    }

    #[tokio::test]
    async fn install_fails_on_missing_asset() {
        let fx = Fixture::new();
        let cache = fx.cache("0.2", &[INDEX, "/timer/help.html"]);

        let result = cache.install().await;

        assert!(matches!(
            result,
            Err(CacheError::Precache(PrecacheError::BadStatus { status: 404, .. }))
        ));
        assert!(!fx.storage.has_generation("bbtimer_0.2").unwrap());
        assert_eq!(fx.worker.skip_waiting_calls(), 0);
    }

    #[tokio::test]
    async fn install_rejects_partial_content() {
        let fx = Fixture::new();
        fx.network.serve(BEEP, Response::new(206, vec![0xff]));
        let cache = fx.cache("0.2", &[INDEX, BEEP]);

        let result = cache.install().await;

        assert!(matches!(
            result,
            Err(CacheError::Precache(PrecacheError::BadStatus { status: 206, .. }))
        ));
        assert!(fx.storage.generation_keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_fails_when_offline() {
        let fx = Fixture::new();
        fx.network.set_offline(true);
        let cache = fx.cache("0.2", &[INDEX]);

        let result = cache.install().await;
        assert!(matches!(
            result,
            Err(CacheError::Precache(PrecacheError::Network { .. }))
        ));
    }

    #[tokio::test]
    async fn activate_after_failed_install_keeps_old_generations() {
        let fx = Fixture::new();
        fx.cache("0.1", &[INDEX]).install().await.unwrap();

        let next = fx.cache("0.2", &[INDEX, "/timer/missing.css"]);
        assert!(next.install().await.is_err());

        let result = next.activate().await;
        assert!(matches!(result, Err(CacheError::NotInstalled(_))));
        assert_eq!(fx.storage.generation_keys().unwrap(), vec!["bbtimer_0.1"]);
        assert_eq!(fx.worker.claim_calls(), 0);
    }

    #[tokio::test]
    async fn activate_leaves_only_current_generation() {
        let fx = Fixture::new();
        fx.cache("0.0.1", &[INDEX]).install().await.unwrap();
        fx.cache("0.1", &[SCRIPT]).install().await.unwrap();
        fx.storage
            .write_generation("someone-elses-cache", &[])
            .unwrap();

        let cache = fx.cache("0.2", &[INDEX, SCRIPT]);
        cache.install().await.unwrap();
        let report = cache.activate().await.unwrap();

        assert_eq!(fx.storage.generation_keys().unwrap(), vec!["bbtimer_0.2"]);
        assert_eq!(report.purged.len(), 3);
        assert!(report.clients_claimed);
        assert_eq!(fx.worker.claim_calls(), 1);
    }

    #[tokio::test]
    async fn activate_survives_claim_failure() {
        let fx = Fixture::new();
        *fx.worker.fail_claim.lock().unwrap() = true;
        let cache = fx.cache("0.2", &[INDEX]);
        cache.install().await.unwrap();

        let report = cache.activate().await.unwrap();
        assert!(!report.clients_claimed);
    }

    #[tokio::test]
    async fn handle_serves_hits_without_network() {
        let fx = Fixture::new();
        let cache = fx.cache("0.2", &[INDEX, SCRIPT]);
        cache.install().await.unwrap();
        let fetches_after_install = fx.network.fetch_count();

        // Network content changes, cached copy still wins
        fx.network.serve(SCRIPT, Response::new(200, "tick2()"));
        let response = cache.handle(&Request::get(SCRIPT)).await;

        assert_eq!(response.body, b"tick()");
        assert_eq!(fx.network.fetch_count(), fetches_after_install);
    }

    #[tokio::test]
    async fn handle_miss_goes_to_network_without_storing() {
        let fx = Fixture::new();
        fx.network.serve("/timer/help.html", Response::new(200, "help"));
        let cache = fx.cache("0.2", &[INDEX]);
        cache.install().await.unwrap();

        let response = cache.handle(&Request::get("/timer/help.html")).await;

        assert_eq!(response.body, b"help");
        assert_eq!(cache.generation_entries().unwrap(), vec![INDEX]);
    }

    #[tokio::test]
    async fn handle_offline_serves_fallback() {
        let fx = Fixture::new();
        let cache = fx.cache("0.2", &[INDEX]);
        cache.install().await.unwrap();
        fx.network.set_offline(true);

        let response = cache.handle(&Request::get("/timer/help.html")).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"<html>timer</html>");
    }

    #[tokio::test]
    async fn handle_offline_without_fallback_is_408() {
        let fx = Fixture::new();
        let cache = fx.cache("0.2", &[SCRIPT]);
        cache.install().await.unwrap();
        fx.network.set_offline(true);

        let response = cache.handle(&Request::get("/timer/help.html")).await;
        assert_eq!(response.status, 408);
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert_eq!(response.body, OFFLINE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn handle_non_get_bypasses_cache() {
        let fx = Fixture::new();
        let cache = fx.cache("0.2", &[INDEX]);
        cache.install().await.unwrap();
        let before = fx.network.fetch_count();

        let response = cache.handle(&Request::new("POST", INDEX)).await;
        assert_eq!(response.status, 200);
        assert_eq!(fx.network.fetch_count(), before + 1);
    }

    #[tokio::test]
    async fn handle_with_broken_storage_still_answers() {
        let network = Arc::new(MockNetwork::new());
        network.set_offline(true);
        let cache = OfflineCache::new(
            Manifest::new("0.2", "bbtimer_", vec![INDEX.into()], INDEX),
            Arc::new(UnavailableStore),
            network,
            Arc::new(MockWorkerHost::new()),
        );

        let response = cache.handle(&Request::get(INDEX)).await;
        assert_eq!(response.status, 408);
    }
}
