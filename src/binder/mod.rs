pub mod ready;
pub mod sort;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::listing::error_content::{error_content, percent_encode_component};
use crate::listing::{
    ListingFailure, ListingTransport, PageRequest, PageResponse, RequestSequence, RequestToken,
};
use crate::pages::{self, PageDescriptor, PageSize, PageSizeOptions};
use crate::preferences::{PreferencesStore, ViewPreferences};

pub use ready::{ReadyGroup, ReadyTicket};
pub use sort::{SortEvent, SortState};

#[derive(Clone, Debug)]
pub struct ViewOptions {
    /// Page size used when no preferences are stored.
    pub page_size: PageSize,
    pub sort_default: SortState,
    /// URL of the page hosting the view; `back-url` links in server error
    /// content are pointed here.
    pub current_url: Option<String>,
    pub delete_url: Option<String>,
    pub delete_param: String,
    pub page_sizes: PageSizeOptions,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_size: pages::DEFAULT_PAGE_SIZE,
            sort_default: SortState::default(),
            current_url: None,
            delete_url: None,
            delete_param: "id".to_string(),
            page_sizes: PageSizeOptions::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewPhase {
    Uninitialized,
    Loading { first: bool },
    Ready,
    Error,
    SessionExpired,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub ready: bool,
    pub error: bool,
    pub error_detail: Option<String>,
    pub current_page_index: Option<usize>,
    pub total_count: u64,
    pub items: Vec<Value>,
    pub pages: Vec<PageDescriptor>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            ready: false,
            error: false,
            error_detail: None,
            current_page_index: None,
            total_count: 0,
            items: Vec::new(),
            pages: vec![PageDescriptor {
                start: 0,
                active: true,
            }],
        }
    }
}

/// Page index as handed over by a host; raw strings come straight from UI
/// input and anything that is not a plain non-negative integer means page 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageIndex {
    Number(i64),
    Raw(String),
}

impl PageIndex {
    fn exact(&self) -> Option<usize> {
        match self {
            Self::Number(n) => usize::try_from(*n).ok(),
            Self::Raw(raw) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => {
                // Digit strings too long for usize still name "a page past the end".
                Some(raw.parse().unwrap_or(usize::MAX))
            }
            Self::Raw(_) => None,
        }
    }

    fn clamp(&self, page_count: usize) -> usize {
        self.exact()
            .unwrap_or(0)
            .min(page_count.saturating_sub(1))
    }
}

impl From<usize> for PageIndex {
    fn from(value: usize) -> Self {
        Self::Number(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<i64> for PageIndex {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for PageIndex {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for PageIndex {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<String> for PageIndex {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPurpose {
    Initial,
    Page,
    PageSize,
}

/// A listing request issued by a binder and not yet completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingLoad {
    pub token: RequestToken,
    pub request: PageRequest,
    pub purpose: LoadPurpose,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer request was issued meanwhile; the result was dropped.
    Stale,
    Failed(ListingFailure),
}

/// Drives one paginated view: holds its state, issues listing requests and
/// applies their results.
///
/// The async operations (`init`, `set_page`, `set_sort`, `refresh`,
/// `update_page_size`) run a request to completion. Hosts that issue
/// requests themselves use the `begin_*` methods together with
/// [`ViewBinder::complete`], which drops completions of superseded requests.
pub struct ViewBinder<T, P> {
    name: String,
    transport: T,
    preferences: P,
    options: ViewOptions,
    phase: ViewPhase,
    state: ViewState,
    sort: SortState,
    page_size: PageSize,
    sequence: RequestSequence,
    restore: Option<ViewPreferences>,
    ticket: Option<ReadyTicket>,
}

impl<T: ListingTransport, P: PreferencesStore> ViewBinder<T, P> {
    pub fn new(
        name: impl Into<String>,
        transport: T,
        preferences: P,
        options: ViewOptions,
    ) -> Self {
        let page_size = options.page_size;
        Self {
            name: name.into(),
            transport,
            preferences,
            options,
            phase: ViewPhase::Uninitialized,
            state: ViewState::default(),
            sort: SortState::default(),
            page_size,
            sequence: RequestSequence::default(),
            restore: None,
            ticket: None,
        }
    }

    pub fn with_ready_group(mut self, group: &ReadyGroup) -> Self {
        self.ticket = Some(group.register());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ViewPhase::Ready
    }

    pub fn is_session_expired(&self) -> bool {
        self.phase == ViewPhase::SessionExpired
    }

    pub fn active_page(&self) -> Option<&PageDescriptor> {
        self.state.pages.iter().find(|p| p.active)
    }

    // Async operations

    pub async fn init(&mut self) -> Result<(), ListingFailure> {
        let pending = self.begin_init();
        self.run(pending).await?;
        if let Some(pending) = self.begin_restore() {
            self.run(pending).await?;
        }
        Ok(())
    }

    pub async fn set_page(
        &mut self,
        index: impl Into<PageIndex>,
        force_reload: bool,
    ) -> Result<(), ListingFailure> {
        match self.begin_page(index.into(), force_reload) {
            Some(pending) => self.run(pending).await,
            None => Ok(()),
        }
    }

    pub async fn set_sort(
        &mut self,
        column: Option<&str>,
        event: SortEvent,
    ) -> Result<(), ListingFailure> {
        if self.apply_sort(column, event) {
            self.refresh().await
        } else {
            Ok(())
        }
    }

    pub async fn set_sort_default(
        &mut self,
        column: Option<&str>,
        descending: bool,
    ) -> Result<(), ListingFailure> {
        self.options.sort_default = SortState {
            column: column.map(str::to_string),
            descending: Some(descending),
        };
        self.set_sort(None, SortEvent::default()).await
    }

    pub async fn refresh(&mut self) -> Result<(), ListingFailure> {
        let index = self.state.current_page_index.unwrap_or(0);
        self.set_page(index, true).await
    }

    pub async fn update_page_size(&mut self, page_size: PageSize) -> Result<(), ListingFailure> {
        let pending = self.begin_page_size(page_size);
        self.run(pending).await
    }

    async fn run(&mut self, pending: PendingLoad) -> Result<(), ListingFailure> {
        let result = self.transport.list(&pending.request).await;
        match self.complete(pending, result) {
            LoadOutcome::Applied | LoadOutcome::Stale => Ok(()),
            LoadOutcome::Failed(failure) => Err(failure),
        }
    }

    // Request/completion API

    /// Restores stored preferences and issues the first listing at start 0.
    pub fn begin_init(&mut self) -> PendingLoad {
        // A retried init is a first load again, whatever the last attempt left.
        self.phase = ViewPhase::Uninitialized;
        self.restore = self.preferences.load(&self.name);
        match self.restore {
            Some(prefs) => {
                info!(
                    view = %self.name,
                    page_size = %prefs.page_size,
                    page_index = prefs.page_index,
                    "restored view preferences"
                );
                self.page_size = prefs.page_size;
            }
            None => self.page_size = self.options.page_size,
        }
        self.begin_load(0, LoadPurpose::Initial)
    }

    /// Issues the fetch of the restored page index once the first listing is
    /// applied. Returns `None` (and marks the view ready) when there is
    /// nothing to restore or the restored page is already shown.
    pub fn begin_restore(&mut self) -> Option<PendingLoad> {
        if self.phase != (ViewPhase::Loading { first: true }) {
            return None;
        }
        let Some(prefs) = self.restore.take() else {
            self.mark_ready();
            return None;
        };
        let pending = self.begin_page(prefs.page_index.into(), false);
        if pending.is_none() {
            self.mark_ready();
        }
        pending
    }

    pub fn begin_page(&mut self, index: PageIndex, force_reload: bool) -> Option<PendingLoad> {
        if !force_reload && Some(index.exact().unwrap_or(0)) == self.state.current_page_index {
            debug!(view = %self.name, ?index, "page already shown");
            return None;
        }
        let page_index = index.clamp(self.state.pages.len());
        self.state.current_page_index = Some(page_index);
        let start = self
            .state
            .pages
            .get(page_index)
            .map(|p| p.start)
            .unwrap_or(0);
        Some(self.begin_load(start, LoadPurpose::Page))
    }

    pub fn begin_page_size(&mut self, page_size: PageSize) -> PendingLoad {
        if !self.options.page_sizes.accepts(page_size) {
            debug!(
                view = %self.name,
                %page_size,
                choices = ?self.options.page_sizes.choices(),
                "page size outside the offered choices"
            );
        }
        let active_start = self.active_page().map(|p| p.start).unwrap_or(0);
        self.page_size = page_size;
        let start = pages::reanchor_start(active_start, page_size);
        self.begin_load(start, LoadPurpose::PageSize)
    }

    /// Updates the sort state for one click. Returns whether the listing
    /// should be refreshed, which is only the case once the view is ready.
    pub fn apply_sort(&mut self, column: Option<&str>, event: SortEvent) -> bool {
        let default = self.options.sort_default.clone();
        self.sort.apply(column, event, &default);
        debug!(
            view = %self.name,
            sort = ?self.sort.column,
            desc = ?self.sort.descending,
            "sort changed"
        );
        self.is_ready()
    }

    fn begin_load(&mut self, start: u64, purpose: LoadPurpose) -> PendingLoad {
        let first = matches!(
            self.phase,
            ViewPhase::Uninitialized | ViewPhase::Loading { first: true }
        );
        self.phase = ViewPhase::Loading { first };
        self.state.ready = false;
        let token = self.sequence.issue();
        let request = PageRequest {
            start,
            count: self.page_size,
            sort: self.sort.column.clone(),
            sort_desc: self
                .sort
                .column
                .as_ref()
                .map(|_| self.sort.descending.unwrap_or(false)),
        };
        debug!(
            view = %self.name,
            token = token.value(),
            start,
            count = %self.page_size,
            ?purpose,
            "issuing listing"
        );
        PendingLoad {
            token,
            request,
            purpose,
        }
    }

    /// Applies the result of `pending`, unless a newer request was issued
    /// after it.
    pub fn complete(
        &mut self,
        pending: PendingLoad,
        result: Result<PageResponse, ListingFailure>,
    ) -> LoadOutcome {
        if !self.sequence.is_current(pending.token) {
            debug!(
                view = %self.name,
                token = pending.token.value(),
                "dropping stale listing result"
            );
            return LoadOutcome::Stale;
        }
        match result {
            Ok(page) => {
                self.apply_page(page);
                match pending.purpose {
                    LoadPurpose::Initial if self.restore.is_some() => {}
                    LoadPurpose::Initial => self.mark_ready(),
                    LoadPurpose::Page | LoadPurpose::PageSize => {
                        self.mark_ready();
                        self.store_preferences();
                    }
                }
                LoadOutcome::Applied
            }
            Err(failure) => {
                self.fail(&failure);
                LoadOutcome::Failed(failure)
            }
        }
    }

    fn apply_page(&mut self, page: PageResponse) {
        self.state.error = false;
        self.state.error_detail = None;
        if page.sort.is_some() {
            self.sort.column = page.sort;
        }
        if page.sort_desc.is_some() {
            self.sort.descending = page.sort_desc;
        }
        let (pages, active) = pages::compute_pages(page.total_count, self.page_size, page.start);
        self.state.total_count = page.total_count;
        self.state.items = page.items;
        self.state.pages = pages;
        self.state.current_page_index = Some(active);
    }

    fn mark_ready(&mut self) {
        self.phase = ViewPhase::Ready;
        self.state.ready = true;
        self.settle();
    }

    fn fail(&mut self, failure: &ListingFailure) {
        self.restore = None;
        self.state.ready = false;
        match failure {
            ListingFailure::Unauthorized => {
                warn!(view = %self.name, "listing unauthorized, session expired");
                self.phase = ViewPhase::SessionExpired;
                self.state.error = false;
                self.state.error_detail = None;
            }
            ListingFailure::ServerError { status, body } => {
                warn!(view = %self.name, status, "listing failed with server error");
                self.phase = ViewPhase::Error;
                self.state.error = true;
                self.state.error_detail =
                    Some(error_content(body, self.options.current_url.as_deref()));
            }
            other => {
                warn!(view = %self.name, "listing failed: {other}");
                self.phase = ViewPhase::Error;
                self.state.error = true;
                self.state.error_detail = None;
            }
        }
        self.settle();
    }

    fn settle(&mut self) {
        if let Some(ticket) = self.ticket.as_mut() {
            ticket.release();
        }
    }

    fn store_preferences(&self) {
        let prefs = ViewPreferences {
            page_index: self.state.current_page_index.unwrap_or(0),
            page_size: self.page_size,
        };
        self.preferences.save(&self.name, &prefs);
    }

    // Host helpers

    /// Navigation target deleting the given records, one `<param>=<id>` pair
    /// per record.
    pub fn delete_url<S: AsRef<str>>(&self, ids: &[S]) -> Option<String> {
        let base = self.options.delete_url.as_deref()?;
        if ids.is_empty() {
            return None;
        }
        let param = percent_encode_component(&self.options.delete_param);
        let query = ids
            .iter()
            .map(|id| format!("{param}={}", percent_encode_component(id.as_ref())))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if base.contains('?') { '&' } else { '?' };
        Some(format!("{base}{separator}{query}"))
    }

    /// Whether a page-size selector is worth showing: not when everything
    /// fits on one page of the smallest offered size.
    pub fn page_size_selector_visible(&self) -> bool {
        let smallest = self.options.page_sizes.smallest().unwrap_or(0) as usize;
        !(self.state.pages.len() == 1 && self.state.items.len() <= smallest)
    }
}
