//! Cursor pagination merger.
//!
//! One `PagedQuery` instance owns the accumulated result list of one list
//! view. It is a three-state machine (`Idle`, `FetchingFirstPage`,
//! `FetchingNextPage`) that serializes one fetch at a time:
//!
//! - a filter-epoch change clears the list and cursor (`begin_epoch`), and the
//!   next first-page response *replaces* the list;
//! - `load_next_page` *appends* the returned edges in server order, only from
//!   `Idle` and only while the server reports a next page (on a virgin epoch
//!   it fetches the first page); calls made while a fetch is in flight are
//!   dropped, not queued;
//! - every request is tagged with the epoch it was issued under, and a
//!   response whose epoch no longer matches is discarded at apply time — the
//!   in-flight transfer itself is not cancelled;
//! - fetch errors return the machine to `Idle` without touching the list and
//!   are recorded in `last_error` for the UI; nothing is thrown past this
//!   boundary.
//!
//! Duplicate suppression across pages is the server's cursor contract and is
//! not re-validated here.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::companies::CompanySummary;
use crate::errors::{DirectoryError, DirectoryResult};
use crate::events::{ControllerEvent, EventBus};
use crate::filters::FilterSet;
use crate::logger::{self, LogTag};

use super::connection::{Connection, PageCursor};

/// Seam to the network/cache layer; mocked in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        filters: &FilterSet,
        after: Option<String>,
        first: usize,
    ) -> DirectoryResult<Connection<CompanySummary>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    FetchingFirstPage,
    FetchingNextPage,
}

/// Read-only view of the accumulated list, cloned for the caller.
#[derive(Debug, Clone)]
pub struct ResultsSnapshot {
    pub items: Vec<CompanySummary>,
    pub total_count: u64,
    pub has_next_page: bool,
    pub state: FetchState,
    pub last_error: Option<DirectoryError>,
}

struct PageState {
    state: FetchState,
    epoch: u64,
    /// Whether this epoch has a first page applied; until then a "load more"
    /// request means "load the first page".
    loaded: bool,
    items: Vec<CompanySummary>,
    total_count: u64,
    cursor: PageCursor,
    last_error: Option<DirectoryError>,
}

impl PageState {
    fn new() -> Self {
        Self {
            state: FetchState::Idle,
            epoch: 0,
            loaded: false,
            items: Vec::new(),
            total_count: 0,
            cursor: PageCursor::default(),
            last_error: None,
        }
    }
}

enum NextAction {
    FirstPage(u64),
    NextPage(u64, Option<String>),
    Skip,
}

pub struct PagedQuery {
    fetcher: Arc<dyn PageFetcher>,
    page_size: usize,
    state: Mutex<PageState>,
    events: EventBus,
}

impl PagedQuery {
    pub fn new(fetcher: Arc<dyn PageFetcher>, page_size: usize, events: EventBus) -> Self {
        Self {
            fetcher,
            page_size,
            state: Mutex::new(PageState::new()),
            events,
        }
    }

    pub fn results(&self) -> ResultsSnapshot {
        let state = self.state.lock();
        ResultsSnapshot {
            items: state.items.clone(),
            total_count: state.total_count,
            has_next_page: state.cursor.has_next_page,
            state: state.state,
            last_error: state.last_error.clone(),
        }
    }

    pub fn current_epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Start a new filter epoch: discard the accumulated list and cursor.
    /// Any fetch still in flight for an older epoch will be dropped when its
    /// response arrives.
    pub fn begin_epoch(&self, epoch: u64) {
        let mut state = self.state.lock();
        state.epoch = epoch;
        state.state = FetchState::Idle;
        state.loaded = false;
        state.items.clear();
        state.total_count = 0;
        state.cursor = PageCursor::default();
        state.last_error = None;
    }

    /// Fetch the first page for `epoch`, replacing the accumulated list.
    /// A no-op if the epoch has already been superseded or a fetch is running.
    pub async fn fetch_first_page(&self, epoch: u64, filters: &FilterSet) {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                logger::debug(
                    LogTag::Query,
                    &format!("first-page fetch for superseded epoch {} skipped", epoch),
                );
                return;
            }
            if state.state != FetchState::Idle {
                logger::debug(LogTag::Query, "first-page fetch ignored, fetch in flight");
                return;
            }
            state.state = FetchState::FetchingFirstPage;
        }

        let result = self.fetcher.fetch_page(filters, None, self.page_size).await;
        self.apply_first_page(epoch, result);
    }

    /// Fetch the page after the current cursor and append it. On a virgin
    /// epoch this loads the first page instead. A no-op while a fetch is in
    /// flight or when the server reported no next page.
    pub async fn load_next_page(&self, filters: &FilterSet) {
        let action = {
            let mut state = self.state.lock();
            if state.state != FetchState::Idle {
                logger::debug(LogTag::Query, "load-more ignored, fetch in flight");
                NextAction::Skip
            } else if !state.loaded {
                state.state = FetchState::FetchingFirstPage;
                NextAction::FirstPage(state.epoch)
            } else if !state.cursor.has_next_page {
                logger::debug(LogTag::Query, "load-more ignored, no next page");
                NextAction::Skip
            } else {
                state.state = FetchState::FetchingNextPage;
                NextAction::NextPage(state.epoch, state.cursor.token.clone())
            }
        };

        match action {
            NextAction::FirstPage(epoch) => {
                let result = self.fetcher.fetch_page(filters, None, self.page_size).await;
                self.apply_first_page(epoch, result);
            }
            NextAction::NextPage(epoch, after) => {
                let result = self.fetcher.fetch_page(filters, after, self.page_size).await;
                self.apply_next_page(epoch, result);
            }
            NextAction::Skip => {}
        }
    }

    fn apply_first_page(&self, epoch: u64, result: DirectoryResult<Connection<CompanySummary>>) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            // A newer epoch owns the machine now; this response is stale.
            logger::debug(
                LogTag::Query,
                &format!("dropping first-page response from stale epoch {}", epoch),
            );
            return;
        }
        state.state = FetchState::Idle;

        match result {
            Ok(page) => {
                state.loaded = true;
                state.total_count = page.total_count;
                state.cursor = PageCursor::from_page_info(&page.page_info);
                state.items = page.nodes();
                state.last_error = None;
                self.notify_updated(&state);
            }
            Err(err) => self.record_error(&mut state, err),
        }
    }

    fn apply_next_page(&self, epoch: u64, result: DirectoryResult<Connection<CompanySummary>>) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            logger::debug(
                LogTag::Query,
                &format!("dropping next-page response from stale epoch {}", epoch),
            );
            return;
        }
        state.state = FetchState::Idle;

        match result {
            Ok(page) => {
                state.total_count = page.total_count;
                state.cursor = PageCursor::from_page_info(&page.page_info);
                state.items.extend(page.nodes());
                state.last_error = None;
                self.notify_updated(&state);
            }
            Err(err) => self.record_error(&mut state, err),
        }
    }

    fn notify_updated(&self, state: &PageState) {
        self.events.emit(ControllerEvent::ResultsUpdated {
            count: state.items.len(),
            total_count: state.total_count,
            has_next_page: state.cursor.has_next_page,
        });
    }

    fn record_error(&self, state: &mut PageState, err: DirectoryError) {
        logger::warning(LogTag::Query, &format!("page fetch failed: {}", err));
        self.events.emit(ControllerEvent::FetchFailed {
            message: err.to_string(),
        });
        state.last_error = Some(err);
    }
}
