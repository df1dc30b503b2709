//! Proxy pool with lazy refresh and random selection

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::provider::ProxyProvider;
use crate::models::ProxyCandidate;

/// Supplies the proxy to use for the next upstream attempt.
///
/// `None` means "connect directly".
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn get_candidate(&self) -> Option<ProxyCandidate>;
}

/// Candidate source used when proxying is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectConnection;

#[async_trait]
impl CandidateSource for DirectConnection {
    async fn get_candidate(&self) -> Option<ProxyCandidate> {
        None
    }
}

/// Best-effort pool of proxies sourced from external list providers.
///
/// The pool may be empty. An empty pool is refreshed on the next draw and,
/// if it is still empty afterwards, the draw yields no proxy.
pub struct ProxySource {
    providers: Vec<Arc<dyn ProxyProvider>>,
    provider_timeout: Duration,
    pool: RwLock<Vec<Arc<ProxyCandidate>>>,
    /// Serialises refreshes so concurrent empty-pool draws share one round
    refresh_lock: Mutex<()>,
}

impl ProxySource {
    pub fn new(providers: Vec<Arc<dyn ProxyProvider>>, provider_timeout: Duration) -> Self {
        Self {
            providers,
            provider_timeout,
            pool: RwLock::new(Vec::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Number of candidates currently in the pool
    pub fn available_count(&self) -> usize {
        self.pool.read().len()
    }

    /// Query every provider and replace the pool with what they returned.
    ///
    /// Never fails; returns the new pool size, which may be zero.
    pub async fn refresh(&self) -> usize {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    #[instrument(skip(self), fields(providers = self.providers.len()))]
    async fn refresh_locked(&self) -> usize {
        let queries = self.providers.iter().map(|provider| {
            let provider = provider.clone();
            let timeout = self.provider_timeout;
            async move {
                match tokio::time::timeout(timeout, provider.fetch()).await {
                    Ok(Ok(candidates)) => {
                        debug!(
                            provider = provider.name(),
                            count = candidates.len(),
                            "Provider returned proxies"
                        );
                        candidates
                    }
                    Ok(Err(e)) => {
                        warn!(provider = provider.name(), error = %e, "Proxy provider failed");
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(
                            provider = provider.name(),
                            timeout_secs = timeout.as_secs_f64(),
                            "Proxy provider timed out"
                        );
                        Vec::new()
                    }
                }
            }
        });

        let fresh: Vec<Arc<ProxyCandidate>> = futures::future::join_all(queries)
            .await
            .into_iter()
            .flatten()
            .map(Arc::new)
            .collect();

        let count = fresh.len();
        *self.pool.write() = fresh;

        if count == 0 {
            warn!("Proxy refresh produced no candidates");
        } else {
            info!("Refreshed proxy list. Got {} proxies.", count);
        }

        count
    }

    fn choose(&self) -> Option<ProxyCandidate> {
        let pool = self.pool.read();
        let mut rng = rand::thread_rng();
        pool.choose(&mut rng).map(|candidate| candidate.as_ref().clone())
    }
}

#[async_trait]
impl CandidateSource for ProxySource {
    async fn get_candidate(&self) -> Option<ProxyCandidate> {
        if let Some(candidate) = self.choose() {
            return Some(candidate);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another request may have refilled the pool while we waited.
        if self.available_count() == 0 {
            self.refresh_locked().await;
        }
        drop(_guard);

        self.choose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::ProxyProtocol;

    struct StubProvider {
        entries: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(entries: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                entries,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProxyProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn fetch(&self) -> anyhow::Result<Vec<ProxyCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .entries
                .iter()
                .filter_map(|e| ProxyCandidate::parse(e, ProxyProtocol::Http))
                .collect())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ProxyProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self) -> anyhow::Result<Vec<ProxyCandidate>> {
            anyhow::bail!("connection refused")
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl ProxyProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn fetch(&self) -> anyhow::Result<Vec<ProxyCandidate>> {
            futures::future::pending::<()>().await;
            Ok(Vec::new())
        }
    }

    fn source_with(providers: Vec<Arc<dyn ProxyProvider>>) -> ProxySource {
        ProxySource::new(providers, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_empty_pool_refreshes_once_and_returns_none() {
        let provider = StubProvider::new(vec![]);
        let source = source_with(vec![provider.clone() as Arc<dyn ProxyProvider>]);

        assert!(source.get_candidate().await.is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_pool_refresh_then_draw() {
        let provider = StubProvider::new(vec!["1.1.1.1:80"]);
        let source = source_with(vec![provider.clone() as Arc<dyn ProxyProvider>]);

        let candidate = source.get_candidate().await.unwrap();
        assert_eq!(candidate.address(), "http://1.1.1.1:80");
        assert_eq!(provider.calls(), 1);

        // Pool is populated now, no further refresh
        source.get_candidate().await.unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_instead_of_accumulating() {
        let provider = StubProvider::new(vec!["1.1.1.1:80", "2.2.2.2:80", "2.2.2.2:80"]);
        let source = source_with(vec![provider as Arc<dyn ProxyProvider>]);

        assert_eq!(source.refresh().await, 3);
        assert_eq!(source.refresh().await, 3);
        assert_eq!(source.available_count(), 3);
    }

    #[tokio::test]
    async fn test_refresh_skips_failed_providers() {
        let good = StubProvider::new(vec!["1.1.1.1:80", "2.2.2.2:80"]);
        let source = source_with(vec![
            Arc::new(FailingProvider) as Arc<dyn ProxyProvider>,
            Arc::new(HangingProvider),
            good,
        ]);

        assert_eq!(source.refresh().await, 2);
    }

    #[tokio::test]
    async fn test_total_provider_failure_yields_empty_pool() {
        let source = source_with(vec![
            Arc::new(FailingProvider) as Arc<dyn ProxyProvider>,
            Arc::new(HangingProvider),
        ]);

        assert_eq!(source.refresh().await, 0);
        assert!(source.get_candidate().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_empty_draws_share_refresh() {
        let provider = StubProvider::new(vec!["1.1.1.1:80"]);
        let source = Arc::new(source_with(vec![provider.clone() as Arc<dyn ProxyProvider>]));

        let draws = (0..8).map(|_| {
            let source = source.clone();
            tokio::spawn(async move { source.get_candidate().await })
        });
        for draw in futures::future::join_all(draws).await {
            assert!(draw.unwrap().is_some());
        }

        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_draws_are_uniform() {
        let entries = vec!["1.1.1.1:80", "2.2.2.2:80", "3.3.3.3:80", "4.4.4.4:80"];
        let source = source_with(vec![StubProvider::new(entries.clone()) as Arc<dyn ProxyProvider>]);

        let draws = 20_000;
        let counts = tokio_test::block_on(async {
            source.refresh().await;

            let mut counts: HashMap<String, usize> = HashMap::new();
            for _ in 0..draws {
                let candidate = source.get_candidate().await.unwrap();
                *counts.entry(candidate.address().to_string()).or_default() += 1;
            }
            counts
        });

        assert_eq!(counts.len(), entries.len());
        let expected = draws / entries.len();
        for (address, count) in counts {
            let deviation = count.abs_diff(expected);
            assert!(
                deviation < expected / 10,
                "{} drawn {} times, expected about {}",
                address,
                count,
                expected
            );
        }
    }

    #[tokio::test]
    async fn test_direct_connection_never_yields_proxy() {
        let mut seen = HashSet::new();
        for _ in 0..3 {
            seen.insert(DirectConnection.get_candidate().await);
        }
        assert_eq!(seen.len(), 1);
        assert!(seen.contains(&None));
    }
}
