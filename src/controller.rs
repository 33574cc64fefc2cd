//! Per-view controller: the surface the UI binding layer talks to.
//!
//! One instance owns the filter store and accumulated list of one list view
//! ("all companies" or "latest companies"); the backend, cache layers, local
//! store, and event bus are shared services injected at construction. Filter
//! commits take effect immediately (epoch bump, page state reset) while the
//! matching first-page fetch is debounced behind the configured quiet period.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::api::{DirectoryBackend, ListScope, ProfileUpdate, ScopedPageFetcher};
use crate::companies::{CompanyDetail, CompanyStats};
use crate::config::AppConfig;
use crate::errors::{DirectoryError, DirectoryResult};
use crate::events::{ControllerEvent, EventBus};
use crate::export::{ExportFormat, ExportOrchestrator, ExportedFile};
use crate::filters::{FilterSet, FilterStore, FilterUpdate};
use crate::logger::{self, LogTag};
use crate::persistence::LocalStore;
use crate::query::{Debouncer, PagedQuery, ResultsSnapshot};
use crate::subscription::{Feature, PlanTier, SubscriptionState};

pub struct CompanyListController {
    scope: ListScope,
    filters: Arc<FilterStore>,
    pages: Arc<PagedQuery>,
    backend: Arc<dyn DirectoryBackend>,
    exporter: ExportOrchestrator,
    store: Arc<LocalStore>,
    subscription: RwLock<SubscriptionState>,
    search_debounce: Debouncer,
    filter_debounce: Debouncer,
    events: EventBus,
}

impl CompanyListController {
    pub fn new(
        scope: ListScope,
        backend: Arc<dyn DirectoryBackend>,
        store: Arc<LocalStore>,
        events: EventBus,
        config: &AppConfig,
    ) -> Self {
        let persisted = store.state();
        let filters = Arc::new(FilterStore::with_initial(
            persisted.filters.unwrap_or_default(),
            events.clone(),
        ));
        let fetcher = Arc::new(ScopedPageFetcher::new(Arc::clone(&backend), scope));
        let pages = Arc::new(PagedQuery::new(
            fetcher,
            config.api.page_size,
            events.clone(),
        ));
        let exporter = ExportOrchestrator::new(
            Arc::clone(&backend),
            PathBuf::from(&config.storage.download_dir),
            events.clone(),
        );

        Self {
            scope,
            filters,
            pages,
            backend,
            exporter,
            store,
            subscription: RwLock::new(persisted.subscription.unwrap_or_default()),
            search_debounce: Debouncer::new(Duration::from_millis(config.debounce.search_ms)),
            filter_debounce: Debouncer::new(Duration::from_millis(config.debounce.filters_ms)),
            events,
        }
    }

    pub fn scope(&self) -> ListScope {
        self.scope
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    // ---- filters ----------------------------------------------------------

    pub fn filters(&self) -> FilterSet {
        self.filters.snapshot()
    }

    /// Commit one filter mutation. Page state resets immediately; the
    /// first-page fetch fires after the quiet period (shorter for search).
    pub fn set_filter(&self, update: FilterUpdate) {
        let debouncer = if update.is_search() {
            &self.search_debounce
        } else {
            &self.filter_debounce
        };

        let epoch = self.filters.apply(update);
        self.pages.begin_epoch(epoch);
        self.persist_filters();

        let pages = Arc::clone(&self.pages);
        let snapshot = self.filters.snapshot();
        debouncer.schedule(move || async move {
            pages.fetch_first_page(epoch, &snapshot).await;
        });
    }

    pub fn reset_filters(&self) {
        let epoch = self.filters.reset();
        self.pages.begin_epoch(epoch);
        self.persist_filters();

        let pages = Arc::clone(&self.pages);
        let snapshot = self.filters.snapshot();
        self.filter_debounce.schedule(move || async move {
            pages.fetch_first_page(epoch, &snapshot).await;
        });
    }

    fn persist_filters(&self) {
        let store = Arc::clone(&self.store);
        let snapshot = self.filters.snapshot();
        tokio::spawn(async move {
            if let Err(err) = store.update(|state| state.filters = Some(snapshot)).await {
                logger::warning(
                    LogTag::Storage,
                    &format!("failed to persist filters: {}", err),
                );
            }
        });
    }

    // ---- results ----------------------------------------------------------

    pub fn results(&self) -> ResultsSnapshot {
        self.pages.results()
    }

    /// Fetch the first page for the current filters right away, skipping the
    /// debounce. Used on startup and for explicit reload. Supersedes any
    /// pending debounced fetch.
    pub async fn refresh(&self) {
        self.search_debounce.cancel_pending();
        self.filter_debounce.cancel_pending();
        let epoch = self.filters.epoch();
        self.pages.begin_epoch(epoch);
        let snapshot = self.filters.snapshot();
        self.pages.fetch_first_page(epoch, &snapshot).await;
    }

    pub async fn load_next_page(&self) {
        let snapshot = self.filters.snapshot();
        self.pages.load_next_page(&snapshot).await;
    }

    // ---- entity + stats reads ---------------------------------------------

    pub async fn company(&self, cui: &str) -> DirectoryResult<CompanyDetail> {
        self.backend.company(cui).await
    }

    pub async fn stats(&self) -> DirectoryResult<CompanyStats> {
        let snapshot = self.filters.snapshot();
        self.backend.company_stats(&snapshot).await
    }

    /// First page and registry statistics together, for the initial render.
    pub async fn load_overview(&self) -> DirectoryResult<CompanyStats> {
        self.search_debounce.cancel_pending();
        self.filter_debounce.cancel_pending();
        let epoch = self.filters.epoch();
        self.pages.begin_epoch(epoch);
        let snapshot = self.filters.snapshot();
        let (_, stats) = futures::join!(
            self.pages.fetch_first_page(epoch, &snapshot),
            self.backend.company_stats(&snapshot)
        );
        stats
    }

    // ---- export -----------------------------------------------------------

    /// Export the full result set of the current filter snapshot. The
    /// accumulated list plays no part: two loaded pages of fifty still export
    /// everything the filters match.
    pub async fn export(&self, format: ExportFormat) -> DirectoryResult<ExportedFile> {
        let subscription = self.subscription.read().clone();
        let feature = match format {
            ExportFormat::Csv => Feature::ExportCsv,
            ExportFormat::Xlsx => Feature::ExportXlsx,
        };
        if !subscription.allows(feature) {
            return Err(DirectoryError::PlanLimit {
                feature: feature.as_str().to_string(),
                plan: subscription.plan.as_str().to_string(),
            });
        }

        let snapshot = self.filters.snapshot();
        self.exporter.export(&snapshot, format).await
    }

    // ---- subscription mirror ----------------------------------------------

    pub fn subscription(&self) -> SubscriptionState {
        self.subscription.read().clone()
    }

    pub async fn sync_subscription(&self) -> DirectoryResult<SubscriptionState> {
        let state = self.backend.subscription_status().await?;
        self.install_subscription(state.clone()).await?;
        Ok(state)
    }

    pub async fn change_plan(&self, plan: PlanTier) -> DirectoryResult<SubscriptionState> {
        let state = self.backend.change_plan(plan).await?;
        self.install_subscription(state.clone()).await?;
        Ok(state)
    }

    pub async fn update_profile(&self, profile: &ProfileUpdate) -> DirectoryResult<()> {
        let identity = self.backend.update_profile(profile).await?;
        self.store
            .update(|state| state.identity = Some(identity))
            .await
    }

    async fn install_subscription(&self, state: SubscriptionState) -> DirectoryResult<()> {
        {
            let mut mirror = self.subscription.write();
            *mirror = state.clone();
        }
        self.events.emit(ControllerEvent::SubscriptionUpdated);
        self.store
            .update(|persisted| persisted.subscription = Some(state))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::companies::CompanySummary;
    use crate::export::ExportPayload;
    use crate::persistence::UserIdentity;
    use crate::query::{Connection, Edge, PageInfo};

    fn company(n: usize) -> CompanySummary {
        CompanySummary {
            cui: format!("RO{:07}", n),
            name: format!("Firma {}", n),
            county: "Cluj".into(),
            city: "Cluj-Napoca".into(),
            category_code: "6201".into(),
            employees: None,
            revenue: None,
            registered_on: None,
        }
    }

    fn page(start: usize, len: usize, total: u64, has_next: bool) -> Connection<CompanySummary> {
        let edges = (start..start + len)
            .map(|n| Edge {
                node: company(n),
                cursor: format!("c{}", n),
            })
            .collect::<Vec<_>>();
        let end_cursor = edges.last().map(|e| e.cursor.clone());
        Connection {
            edges,
            page_info: PageInfo {
                has_next_page: has_next,
                end_cursor,
            },
            total_count: total,
        }
    }

    /// Serves two pages of twenty and records what it was asked for.
    struct FakeBackend {
        list_calls: AtomicUsize,
        export_filters: Mutex<Vec<FilterSet>>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                list_calls: AtomicUsize::new(0),
                export_filters: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DirectoryBackend for FakeBackend {
        async fn companies(
            &self,
            _scope: ListScope,
            _filters: &FilterSet,
            after: Option<String>,
            _first: usize,
        ) -> DirectoryResult<Connection<CompanySummary>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            match after {
                None => Ok(page(0, 20, 40, true)),
                Some(_) => Ok(page(20, 20, 40, false)),
            }
        }

        async fn company(&self, cui: &str) -> DirectoryResult<CompanyDetail> {
            Err(DirectoryError::Server(format!("{} not found", cui)))
        }

        async fn company_stats(&self, _filters: &FilterSet) -> DirectoryResult<CompanyStats> {
            Ok(CompanyStats {
                total_companies: 40,
                active_companies: 40,
                new_this_month: 2,
                top_counties: vec![],
            })
        }

        async fn export_companies(
            &self,
            filters: &FilterSet,
            _format: ExportFormat,
        ) -> DirectoryResult<ExportPayload> {
            self.export_filters.lock().push(filters.clone());
            Ok(ExportPayload {
                file_name: "companies.csv".into(),
                content: "cui,name\nRO1,Firma\n".into(),
                mime_type: "text/csv".into(),
            })
        }

        async fn subscription_status(&self) -> DirectoryResult<SubscriptionState> {
            Ok(SubscriptionState {
                plan: PlanTier::Pro,
                renews_on: None,
                monthly_export_quota: 10,
                exports_used: 1,
            })
        }

        async fn update_profile(&self, _profile: &ProfileUpdate) -> DirectoryResult<UserIdentity> {
            Ok(UserIdentity {
                user_id: "u-1".into(),
                email: "ana@example.com".into(),
                display_name: None,
            })
        }

        async fn change_plan(&self, plan: PlanTier) -> DirectoryResult<SubscriptionState> {
            Ok(SubscriptionState {
                plan,
                renews_on: None,
                monthly_export_quota: 20,
                exports_used: 0,
            })
        }
    }

    async fn controller(backend: Arc<FakeBackend>) -> (CompanyListController, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            LocalStore::load(dir.path().join("state.json"))
                .await
                .expect("store"),
        );
        let mut config = AppConfig::default();
        config.debounce.search_ms = 10;
        config.debounce.filters_ms = 10;
        config.storage.download_dir = dir.path().join("downloads").to_string_lossy().into_owned();
        let controller = CompanyListController::new(
            ListScope::All,
            backend,
            store,
            EventBus::new(),
            &config,
        );
        (controller, dir)
    }

    #[tokio::test]
    async fn county_filter_then_two_pages_accumulate_forty() {
        let backend = Arc::new(FakeBackend::new());
        let (controller, _dir) = controller(Arc::clone(&backend)).await;

        controller.set_filter(FilterUpdate::County(Some("Cluj".into())));
        // Quiet period elapses, debounced first page lands.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(controller.results().items.len(), 20);

        controller.load_next_page().await;

        let results = controller.results();
        assert_eq!(results.items.len(), 40);
        assert!(!results.has_next_page);
        let cuis: Vec<_> = results.items.iter().map(|c| c.cui.clone()).collect();
        let expected: Vec<_> = (0..40).map(|n| format!("RO{:07}", n)).collect();
        assert_eq!(cuis, expected);
    }

    #[tokio::test]
    async fn filter_commit_resets_page_state_immediately() {
        let backend = Arc::new(FakeBackend::new());
        let (controller, _dir) = controller(backend).await;

        controller.refresh().await;
        controller.load_next_page().await;
        assert_eq!(controller.results().items.len(), 40);

        controller.set_filter(FilterUpdate::City(Some("Dej".into())));

        // Before the debounced fetch lands, the old epoch's list is gone.
        let results = controller.results();
        assert!(results.items.is_empty());
        assert!(!results.has_next_page);
    }

    #[tokio::test]
    async fn rapid_search_input_fetches_once() {
        let backend = Arc::new(FakeBackend::new());
        let (controller, _dir) = controller(Arc::clone(&backend)).await;

        for term in ["p", "pa", "pan", "pani", "panif"] {
            controller.set_filter(FilterUpdate::Search(Some(term.into())));
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            controller.filters().search.as_deref(),
            Some("panif")
        );
    }

    #[tokio::test]
    async fn export_reads_the_filter_snapshot_not_the_list() {
        let backend = Arc::new(FakeBackend::new());
        let (controller, _dir) = controller(Arc::clone(&backend)).await;

        controller.sync_subscription().await.expect("sync plan");
        controller.set_filter(FilterUpdate::County(Some("Cluj".into())));
        tokio::time::sleep(Duration::from_millis(60)).await;
        // One of two pages materialized.
        let before = controller.results();
        assert_eq!(before.items.len(), 20);

        controller.export(ExportFormat::Csv).await.expect("export");

        let seen = backend.export_filters.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].county.as_deref(), Some("Cluj"));
        // The accumulated list is untouched by the export.
        let after = controller.results();
        assert_eq!(after.items.len(), before.items.len());
    }

    #[tokio::test]
    async fn export_is_gated_by_the_plan() {
        let backend = Arc::new(FakeBackend::new());
        let (controller, _dir) = controller(backend).await;

        // Default mirror is the free plan with no quota.
        let err = controller
            .export(ExportFormat::Csv)
            .await
            .expect_err("gated");
        assert!(matches!(err, DirectoryError::PlanLimit { .. }));

        controller.sync_subscription().await.expect("sync plan");
        controller.export(ExportFormat::Csv).await.expect("allowed");
    }

    #[tokio::test]
    async fn overview_loads_first_page_and_stats_together() {
        let backend = Arc::new(FakeBackend::new());
        let (controller, _dir) = controller(Arc::clone(&backend)).await;

        let stats = controller.load_overview().await.expect("overview");

        assert_eq!(stats.total_companies, 40);
        assert_eq!(controller.results().items.len(), 20);
    }

    #[tokio::test]
    async fn persisted_filters_survive_reconstruction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let store = Arc::new(LocalStore::load(path.clone()).await.expect("store"));
        let mut filters = FilterSet::default();
        filters.apply(FilterUpdate::County(Some("Brasov".into())));
        store
            .update(|state| state.filters = Some(filters.clone()))
            .await
            .expect("seed");

        let config = AppConfig::default();
        let controller = CompanyListController::new(
            ListScope::All,
            Arc::new(FakeBackend::new()),
            store,
            EventBus::new(),
            &config,
        );

        assert_eq!(controller.filters(), filters);
    }
}
