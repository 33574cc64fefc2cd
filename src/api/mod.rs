//! Remote directory API: transport, session, and the cached read path.
//!
//! `DirectoryBackend` is the seam every consumer talks to. `DirectoryApi` is
//! the raw GraphQL transport; `CachedDirectory` wraps any backend with the
//! dual-layer cache — read-through on list/stats/detail queries, joint
//! invalidation of both layers after write-class mutations. Export goes
//! straight through: it changes no server-visible state and caches nothing.

pub mod client;
pub mod directory;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{EntityKind, QueryCache, RequestKey};
use crate::companies::{CompanyDetail, CompanyStats, CompanySummary};
use crate::errors::DirectoryResult;
use crate::export::{ExportFormat, ExportPayload};
use crate::filters::FilterSet;
use crate::logger::{self, LogTag};
use crate::persistence::UserIdentity;
use crate::query::{Connection, PageFetcher};
use crate::subscription::{PlanTier, SubscriptionState};

pub use client::{HttpClient, RateLimiter};
pub use directory::{DirectoryApi, HttpAuthProvider, ProfileUpdate};
pub use session::{AuthProvider, SessionManager, TokenPair};

/// Which list view an operation serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    Latest,
}

impl ListScope {
    pub fn operation(&self) -> &'static str {
        match self {
            ListScope::All => "companies",
            ListScope::Latest => "latestCompanies",
        }
    }
}

#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    async fn companies(
        &self,
        scope: ListScope,
        filters: &FilterSet,
        after: Option<String>,
        first: usize,
    ) -> DirectoryResult<Connection<CompanySummary>>;

    async fn company(&self, cui: &str) -> DirectoryResult<CompanyDetail>;

    async fn company_stats(&self, filters: &FilterSet) -> DirectoryResult<CompanyStats>;

    async fn export_companies(
        &self,
        filters: &FilterSet,
        format: ExportFormat,
    ) -> DirectoryResult<ExportPayload>;

    async fn subscription_status(&self) -> DirectoryResult<SubscriptionState>;

    async fn update_profile(&self, profile: &ProfileUpdate) -> DirectoryResult<UserIdentity>;

    async fn change_plan(&self, plan: PlanTier) -> DirectoryResult<SubscriptionState>;
}

#[async_trait]
impl DirectoryBackend for DirectoryApi {
    async fn companies(
        &self,
        scope: ListScope,
        filters: &FilterSet,
        after: Option<String>,
        first: usize,
    ) -> DirectoryResult<Connection<CompanySummary>> {
        DirectoryApi::companies(self, scope, filters, after, first).await
    }

    async fn company(&self, cui: &str) -> DirectoryResult<CompanyDetail> {
        DirectoryApi::company(self, cui).await
    }

    async fn company_stats(&self, filters: &FilterSet) -> DirectoryResult<CompanyStats> {
        DirectoryApi::company_stats(self, filters).await
    }

    async fn export_companies(
        &self,
        filters: &FilterSet,
        format: ExportFormat,
    ) -> DirectoryResult<ExportPayload> {
        DirectoryApi::export_companies(self, filters, format).await
    }

    async fn subscription_status(&self) -> DirectoryResult<SubscriptionState> {
        DirectoryApi::subscription_status(self).await
    }

    async fn update_profile(&self, profile: &ProfileUpdate) -> DirectoryResult<UserIdentity> {
        DirectoryApi::update_profile(self, profile).await
    }

    async fn change_plan(&self, plan: PlanTier) -> DirectoryResult<SubscriptionState> {
        DirectoryApi::change_plan(self, plan).await
    }
}

/// Read-through caching wrapper around a backend.
pub struct CachedDirectory {
    inner: Arc<dyn DirectoryBackend>,
    cache: Arc<QueryCache>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn DirectoryBackend>, cache: Arc<QueryCache>) -> Self {
        Self { inner, cache }
    }

    fn list_key(scope: ListScope, filters: &FilterSet, after: &Option<String>, first: usize) -> RequestKey {
        let variables = serde_json::json!({
            "filters": filters.to_variables(),
            "after": after,
            "first": first,
        });
        RequestKey::new(scope.operation(), &variables)
    }
}

#[async_trait]
impl DirectoryBackend for CachedDirectory {
    async fn companies(
        &self,
        scope: ListScope,
        filters: &FilterSet,
        after: Option<String>,
        first: usize,
    ) -> DirectoryResult<Connection<CompanySummary>> {
        let key = Self::list_key(scope, filters, &after, first);
        if let Some(cached) = self.cache.get_request::<Connection<CompanySummary>>(&key) {
            logger::debug(LogTag::Cache, &format!("{} page served from cache", scope.operation()));
            return Ok(cached);
        }

        let page = self.inner.companies(scope, filters, after, first).await?;
        self.cache.put_list_page(key, &page);
        Ok(page)
    }

    async fn company(&self, cui: &str) -> DirectoryResult<CompanyDetail> {
        if let Some(cached) = self.cache.get_entity::<CompanyDetail>(EntityKind::Company, cui) {
            logger::debug(LogTag::Cache, &format!("company {} served from cache", cui));
            return Ok(cached);
        }

        let detail = self.inner.company(cui).await?;
        self.cache.put_entity(EntityKind::Company, cui, &detail);
        Ok(detail)
    }

    async fn company_stats(&self, filters: &FilterSet) -> DirectoryResult<CompanyStats> {
        let key = RequestKey::new(
            "companyStats",
            &serde_json::json!({ "filters": filters.to_variables() }),
        );
        if let Some(cached) = self.cache.get_request::<CompanyStats>(&key) {
            return Ok(cached);
        }

        let stats = self.inner.company_stats(filters).await?;
        self.cache.put_stats(key, &stats);
        Ok(stats)
    }

    async fn export_companies(
        &self,
        filters: &FilterSet,
        format: ExportFormat,
    ) -> DirectoryResult<ExportPayload> {
        // Read-only from the server's perspective: no cache entry, no invalidation.
        self.inner.export_companies(filters, format).await
    }

    async fn subscription_status(&self) -> DirectoryResult<SubscriptionState> {
        self.inner.subscription_status().await
    }

    async fn update_profile(&self, profile: &ProfileUpdate) -> DirectoryResult<UserIdentity> {
        let identity = self.inner.update_profile(profile).await?;
        self.cache.invalidate_all();
        Ok(identity)
    }

    async fn change_plan(&self, plan: PlanTier) -> DirectoryResult<SubscriptionState> {
        let subscription = self.inner.change_plan(plan).await?;
        self.cache.invalidate_all();
        Ok(subscription)
    }
}

/// Binds one list scope onto the backend for the pagination merger.
pub struct ScopedPageFetcher {
    backend: Arc<dyn DirectoryBackend>,
    scope: ListScope,
}

impl ScopedPageFetcher {
    pub fn new(backend: Arc<dyn DirectoryBackend>, scope: ListScope) -> Self {
        Self { backend, scope }
    }
}

#[async_trait]
impl PageFetcher for ScopedPageFetcher {
    async fn fetch_page(
        &self,
        filters: &FilterSet,
        after: Option<String>,
        first: usize,
    ) -> DirectoryResult<Connection<CompanySummary>> {
        self.backend.companies(self.scope, filters, after, first).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cache::DualCacheConfig;
    use crate::companies::CompanyStatus;
    use crate::errors::DirectoryError;
    use crate::query::{Edge, PageInfo};

    #[derive(Default)]
    struct CountingBackend {
        list_calls: AtomicUsize,
        detail_calls: AtomicUsize,
        export_calls: AtomicUsize,
    }

    fn sample_page() -> Connection<CompanySummary> {
        Connection {
            edges: vec![Edge {
                node: CompanySummary {
                    cui: "RO1".into(),
                    name: "Firma".into(),
                    county: "Cluj".into(),
                    city: "Cluj-Napoca".into(),
                    category_code: "6201".into(),
                    employees: None,
                    revenue: None,
                    registered_on: None,
                },
                cursor: "c1".into(),
            }],
            page_info: PageInfo {
                has_next_page: false,
                end_cursor: Some("c1".into()),
            },
            total_count: 1,
        }
    }

    fn sample_detail() -> CompanyDetail {
        CompanyDetail {
            cui: "RO1".into(),
            name: "Firma".into(),
            county: "Cluj".into(),
            city: "Cluj-Napoca".into(),
            category_code: "6201".into(),
            category_label: None,
            status: CompanyStatus::Active,
            address: None,
            phone: None,
            email: None,
            website: None,
            registered_on: None,
            balance_years: vec![],
        }
    }

    #[async_trait]
    impl DirectoryBackend for CountingBackend {
        async fn companies(
            &self,
            _scope: ListScope,
            _filters: &FilterSet,
            _after: Option<String>,
            _first: usize,
        ) -> DirectoryResult<Connection<CompanySummary>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_page())
        }

        async fn company(&self, _cui: &str) -> DirectoryResult<CompanyDetail> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_detail())
        }

        async fn company_stats(&self, _filters: &FilterSet) -> DirectoryResult<CompanyStats> {
            Ok(CompanyStats {
                total_companies: 10,
                active_companies: 9,
                new_this_month: 1,
                top_counties: vec![],
            })
        }

        async fn export_companies(
            &self,
            _filters: &FilterSet,
            _format: ExportFormat,
        ) -> DirectoryResult<ExportPayload> {
            self.export_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExportPayload {
                file_name: "companies.csv".into(),
                content: "cui,name\nRO1,Firma\n".into(),
                mime_type: "text/csv".into(),
            })
        }

        async fn subscription_status(&self) -> DirectoryResult<SubscriptionState> {
            Ok(SubscriptionState::default())
        }

        async fn update_profile(&self, _profile: &ProfileUpdate) -> DirectoryResult<UserIdentity> {
            Err(DirectoryError::Server("not under test".into()))
        }

        async fn change_plan(&self, plan: PlanTier) -> DirectoryResult<SubscriptionState> {
            Ok(SubscriptionState {
                plan,
                renews_on: None,
                monthly_export_quota: 10,
                exports_used: 0,
            })
        }
    }

    fn cached(backend: Arc<CountingBackend>) -> CachedDirectory {
        CachedDirectory::new(backend, Arc::new(QueryCache::new(DualCacheConfig::default())))
    }

    #[tokio::test]
    async fn repeated_list_reads_hit_the_request_cache() {
        let backend = Arc::new(CountingBackend::default());
        let directory = cached(Arc::clone(&backend));
        let filters = FilterSet::default();

        for _ in 0..3 {
            directory
                .companies(ListScope::All, &filters, None, 20)
                .await
                .expect("page");
        }

        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detail_reads_hit_the_entity_cache() {
        let backend = Arc::new(CountingBackend::default());
        let directory = cached(Arc::clone(&backend));

        directory.company("RO1").await.expect("detail");
        directory.company("RO1").await.expect("detail");

        assert_eq!(backend.detail_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn plan_change_invalidates_both_layers() {
        let backend = Arc::new(CountingBackend::default());
        let directory = cached(Arc::clone(&backend));
        let filters = FilterSet::default();

        directory
            .companies(ListScope::All, &filters, None, 20)
            .await
            .expect("page");
        directory.company("RO1").await.expect("detail");

        directory.change_plan(PlanTier::Pro).await.expect("plan");

        directory
            .companies(ListScope::All, &filters, None, 20)
            .await
            .expect("page");
        directory.company("RO1").await.expect("detail");

        // Both reads went back to the network after the write-class op.
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(backend.detail_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn export_bypasses_and_preserves_the_cache() {
        let backend = Arc::new(CountingBackend::default());
        let directory = cached(Arc::clone(&backend));
        let filters = FilterSet::default();

        directory
            .companies(ListScope::All, &filters, None, 20)
            .await
            .expect("page");

        directory
            .export_companies(&filters, ExportFormat::Csv)
            .await
            .expect("export");
        directory
            .export_companies(&filters, ExportFormat::Csv)
            .await
            .expect("export");

        // Export never caches and never invalidates.
        assert_eq!(backend.export_calls.load(Ordering::SeqCst), 2);
        directory
            .companies(ListScope::All, &filters, None, 20)
            .await
            .expect("page");
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scopes_cache_under_distinct_keys() {
        let backend = Arc::new(CountingBackend::default());
        let directory = cached(Arc::clone(&backend));
        let filters = FilterSet::default();

        directory
            .companies(ListScope::All, &filters, None, 20)
            .await
            .expect("page");
        directory
            .companies(ListScope::Latest, &filters, None, 20)
            .await
            .expect("page");

        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);
    }
}
