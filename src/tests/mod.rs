use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::binder::{
    LoadOutcome, PageIndex, ReadyGroup, SortEvent, SortState, ViewBinder, ViewOptions, ViewPhase,
};
use crate::listing::{ListingFailure, ListingTransport, PageRequest, PageResponse};
use crate::pages::PageSize;
use crate::preferences::{MemoryPreferencesStore, PreferencesStore, ViewPreferences};

// Serves slices of a fixed record set and records every request it sees.
struct FakeListing {
    total: u64,
    failures: Mutex<VecDeque<ListingFailure>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl FakeListing {
    fn new(total: u64) -> Self {
        Self {
            total,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing_with(self, failure: ListingFailure) -> Self {
        self.failures.lock().unwrap().push_back(failure);
        self
    }

    fn fail_next(&self, failure: ListingFailure) {
        self.failures.lock().unwrap().push_back(failure);
    }

    fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn page(&self, request: &PageRequest) -> PageResponse {
        let end = match request.count.limit() {
            Some(limit) => (request.start + limit).min(self.total),
            None => self.total,
        };
        PageResponse {
            start: request.start,
            total_count: self.total,
            items: (request.start..end).map(|id| json!({ "id": id })).collect(),
            sort: request.sort.clone(),
            sort_desc: request.sort_desc,
        }
    }
}

impl ListingTransport for FakeListing {
    async fn list(&self, request: &PageRequest) -> Result<PageResponse, ListingFailure> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(failure) = self.failures.lock().unwrap().pop_front() {
            return Err(failure);
        }
        Ok(self.page(request))
    }
}

fn view(
    total: u64,
    store: &MemoryPreferencesStore,
) -> ViewBinder<FakeListing, MemoryPreferencesStore> {
    ViewBinder::new(
        "reservations",
        FakeListing::new(total),
        store.clone(),
        ViewOptions::default(),
    )
}

fn item_ids(items: &[Value]) -> Vec<u64> {
    items.iter().filter_map(|i| i["id"].as_u64()).collect()
}

fn starts(view: &ViewBinder<FakeListing, MemoryPreferencesStore>) -> Vec<u64> {
    view.state().pages.iter().map(|p| p.start).collect()
}

#[tokio::test]
async fn init_lists_first_page_with_default_size() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    assert_eq!(view.phase(), ViewPhase::Uninitialized);

    view.init().await.unwrap();

    assert_eq!(view.phase(), ViewPhase::Ready);
    assert!(view.state().ready);
    let requests = view.transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].start, 0);
    assert_eq!(requests[0].count, PageSize::Limited(10));
    assert_eq!(starts(&view), vec![0, 10, 20]);
    assert_eq!(view.state().current_page_index, Some(0));
    assert_eq!(item_ids(&view.state().items), (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn init_restores_stored_page_and_size() {
    let store = MemoryPreferencesStore::new();
    store.save(
        "reservations",
        &ViewPreferences {
            page_index: 2,
            page_size: PageSize::Limited(5),
        },
    );
    let mut view = view(23, &store);

    view.init().await.unwrap();

    let requests = view.transport().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!((requests[0].start, requests[0].count), (0, PageSize::Limited(5)));
    assert_eq!((requests[1].start, requests[1].count), (10, PageSize::Limited(5)));
    assert_eq!(view.phase(), ViewPhase::Ready);
    assert_eq!(view.state().current_page_index, Some(2));
    assert_eq!(item_ids(&view.state().items), vec![10, 11, 12, 13, 14]);
}

#[tokio::test]
async fn init_can_be_retried_after_a_failed_first_load() {
    let store = MemoryPreferencesStore::new();
    store.save(
        "reservations",
        &ViewPreferences {
            page_index: 1,
            page_size: PageSize::Limited(10),
        },
    );
    let group = ReadyGroup::new();
    let mut view = view(23, &store).with_ready_group(&group);
    view.transport()
        .fail_next(ListingFailure::Network("connection reset".to_string()));

    assert!(view.init().await.is_err());
    assert_eq!(view.phase(), ViewPhase::Error);

    view.init().await.unwrap();

    assert_eq!(view.phase(), ViewPhase::Ready);
    assert!(view.state().ready);
    assert!(!view.state().error);
    assert_eq!(view.state().current_page_index, Some(1));
    assert_eq!(item_ids(&view.state().items), (10..20).collect::<Vec<_>>());
    let requests = view.transport().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].start, 10);
    assert!(group.is_ready());
}

#[tokio::test]
async fn restored_first_page_needs_no_second_request() {
    let store = MemoryPreferencesStore::new();
    store.save(
        "reservations",
        &ViewPreferences {
            page_index: 0,
            page_size: PageSize::Limited(15),
        },
    );
    let mut view = view(40, &store);
    view.init().await.unwrap();
    assert_eq!(view.transport().request_count(), 1);
    assert_eq!(view.phase(), ViewPhase::Ready);
}

#[tokio::test]
async fn corrupt_preferences_fall_back_to_defaults() {
    let store = MemoryPreferencesStore::new();
    store.put_raw("reservations", "{\"pageIndex\":");
    let mut view = view(23, &store);
    view.init().await.unwrap();
    assert_eq!(view.transport().request_count(), 1);
    assert_eq!(view.page_size(), PageSize::Limited(10));
    assert_eq!(view.phase(), ViewPhase::Ready);
}

#[tokio::test]
async fn setting_the_current_page_issues_no_request() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();
    view.set_page(0, false).await.unwrap();
    assert_eq!(view.transport().request_count(), 1);

    view.set_page(0, true).await.unwrap();
    assert_eq!(view.transport().request_count(), 2);
}

#[tokio::test]
async fn set_page_persists_preferences() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();
    assert_eq!(store.load("reservations"), None);

    view.set_page(1, false).await.unwrap();
    assert_eq!(item_ids(&view.state().items), (10..20).collect::<Vec<_>>());
    assert_eq!(
        store.load("reservations"),
        Some(ViewPreferences {
            page_index: 1,
            page_size: PageSize::Limited(10),
        })
    );
}

#[tokio::test]
async fn non_numeric_index_behaves_like_page_zero() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();

    view.set_page("abc", false).await.unwrap();
    assert_eq!(view.transport().request_count(), 1);

    view.set_page(2, false).await.unwrap();
    view.set_page("abc", false).await.unwrap();
    let requests = view.transport().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].start, 0);
    assert_eq!(view.state().current_page_index, Some(0));
}

#[tokio::test]
async fn out_of_range_indexes_are_clamped() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();

    view.set_page(9999, false).await.unwrap();
    assert_eq!(view.state().current_page_index, Some(2));
    assert_eq!(view.transport().requests().last().unwrap().start, 20);

    view.set_page(-5, false).await.unwrap();
    assert_eq!(view.state().current_page_index, Some(0));
    assert_eq!(view.transport().requests().last().unwrap().start, 0);
}

#[tokio::test]
async fn refresh_reloads_current_page() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();
    view.set_page(1, false).await.unwrap();

    view.refresh().await.unwrap();

    let requests = view.transport().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].start, 10);
    assert_eq!(view.state().current_page_index, Some(1));
}

#[tokio::test]
async fn sort_changes_refresh_only_when_ready() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);

    view.set_sort(Some("name"), SortEvent::default()).await.unwrap();
    assert_eq!(view.transport().request_count(), 0);

    view.init().await.unwrap();
    let first = &view.transport().requests()[0];
    assert_eq!(first.sort.as_deref(), Some("name"));
    assert_eq!(first.sort_desc, Some(false));

    view.set_sort(Some("name"), SortEvent::default()).await.unwrap();
    assert_eq!(view.sort().descending, Some(true));
    view.set_sort(Some("name"), SortEvent::default()).await.unwrap();
    assert_eq!(view.sort().descending, Some(false));

    let requests = view.transport().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].sort_desc, Some(true));
    assert_eq!(requests[2].sort_desc, Some(false));
}

#[tokio::test]
async fn shift_click_clears_active_sort() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();
    view.set_sort(Some("name"), SortEvent::default()).await.unwrap();

    view.set_sort(Some("name"), SortEvent::shift()).await.unwrap();

    assert_eq!(view.sort(), &SortState::default());
    let last = view.transport().requests().last().cloned().unwrap();
    assert_eq!(last.sort, None);
    assert_eq!(last.sort_desc, None);
}

#[tokio::test]
async fn default_sort_is_restored_without_column() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();
    view.set_sort_default(Some("DATETIME"), true).await.unwrap();
    assert_eq!(view.sort().column.as_deref(), Some("DATETIME"));

    view.set_sort(Some("name"), SortEvent::default()).await.unwrap();
    view.set_sort(None, SortEvent::default()).await.unwrap();

    assert_eq!(view.sort().column.as_deref(), Some("DATETIME"));
    assert_eq!(view.sort().descending, Some(true));
    assert_eq!(view.transport().request_count(), 4);
}

#[tokio::test]
async fn page_size_change_keeps_active_content_visible() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();
    view.set_page(1, false).await.unwrap();
    assert_eq!(view.active_page().unwrap().start, 10);

    view.update_page_size(PageSize::Limited(20)).await.unwrap();

    let last = view.transport().requests().last().cloned().unwrap();
    assert_eq!((last.start, last.count), (0, PageSize::Limited(20)));
    assert_eq!(starts(&view), vec![0, 20]);
    assert_eq!(view.state().current_page_index, Some(0));
    assert!(view.state().pages[0].active);
    assert_eq!(
        store.load("reservations"),
        Some(ViewPreferences {
            page_index: 0,
            page_size: PageSize::Limited(20),
        })
    );
}

#[tokio::test]
async fn unlimited_page_size_lists_everything() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    view.init().await.unwrap();
    view.set_page(2, false).await.unwrap();

    view.update_page_size(PageSize::Unlimited).await.unwrap();

    assert_eq!(starts(&view), vec![0]);
    assert_eq!(view.state().items.len(), 23);
    assert_eq!(store.get_raw("reservations").as_deref(), Some(r#"{"pageIndex":0,"pageSize":-1}"#));
}

#[tokio::test]
async fn unauthorized_expires_the_session_instead_of_inline_error() {
    let store = MemoryPreferencesStore::new();
    let mut view = ViewBinder::new(
        "reservations",
        FakeListing::new(23).failing_with(ListingFailure::Unauthorized),
        store.clone(),
        ViewOptions::default(),
    );

    let err = view.init().await.unwrap_err();

    assert_eq!(err, ListingFailure::Unauthorized);
    assert_eq!(view.phase(), ViewPhase::SessionExpired);
    assert!(view.is_session_expired());
    assert!(!view.state().error);
    assert_eq!(view.state().error_detail, None);
}

#[tokio::test]
async fn server_error_renders_extracted_content() {
    let store = MemoryPreferencesStore::new();
    let options = ViewOptions {
        current_url: Some("/reservation-requests".to_string()),
        ..ViewOptions::default()
    };
    let mut view = ViewBinder::new("reservations", FakeListing::new(23), store.clone(), options);
    view.init().await.unwrap();

    view.transport().fail_next(ListingFailure::ServerError {
        status: 500,
        body: r#"<html><div id="page-content"><p>Failed</p><a href="/report?back-url=/old">report</a></div></html>"#
            .to_string(),
    });
    let err = view.set_page(1, false).await.unwrap_err();

    assert!(matches!(err, ListingFailure::ServerError { status: 500, .. }));
    assert_eq!(view.phase(), ViewPhase::Error);
    assert!(view.state().error);
    assert_eq!(
        view.state().error_detail.as_deref(),
        Some(r#"<p>Failed</p><a href="/report?back-url=%2Freservation-requests">report</a>"#)
    );

    view.refresh().await.unwrap();
    assert_eq!(view.phase(), ViewPhase::Ready);
    assert!(!view.state().error);
    assert_eq!(view.state().error_detail, None);
}

#[tokio::test]
async fn network_failure_shows_generic_error() {
    let store = MemoryPreferencesStore::new();
    let mut view = ViewBinder::new(
        "reservations",
        FakeListing::new(23).failing_with(ListingFailure::Network("connection refused".to_string())),
        store.clone(),
        ViewOptions::default(),
    );
    assert!(view.init().await.is_err());
    assert_eq!(view.phase(), ViewPhase::Error);
    assert!(view.state().error);
    assert_eq!(view.state().error_detail, None);
}

#[test]
fn stale_response_never_overwrites_newer_state() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    let init = view.begin_init();
    let init_page = view.transport().page(&init.request);
    assert_eq!(view.complete(init, Ok(init_page)), LoadOutcome::Applied);

    let older = view.begin_page(PageIndex::from(1), false).unwrap();
    let newer = view.begin_page(PageIndex::from(2), false).unwrap();
    assert!(newer.token > older.token);

    let newer_page = view.transport().page(&newer.request);
    let older_page = view.transport().page(&older.request);
    assert_eq!(view.complete(newer, Ok(newer_page)), LoadOutcome::Applied);
    assert_eq!(view.complete(older, Ok(older_page)), LoadOutcome::Stale);

    assert_eq!(view.state().current_page_index, Some(2));
    assert_eq!(item_ids(&view.state().items), vec![20, 21, 22]);
    assert_eq!(
        store.load("reservations").map(|p| p.page_index),
        Some(2)
    );
}

#[test]
fn stale_failure_is_ignored_too() {
    let store = MemoryPreferencesStore::new();
    let mut view = view(23, &store);
    let older = view.begin_init();
    let newer = view.begin_page(PageIndex::from(0), true).unwrap();
    let newer_page = view.transport().page(&newer.request);
    view.complete(newer, Ok(newer_page));

    assert_eq!(
        view.complete(older, Err(ListingFailure::Unauthorized)),
        LoadOutcome::Stale
    );
    assert_eq!(view.phase(), ViewPhase::Ready);
}

#[tokio::test]
async fn ready_group_waits_for_every_view() {
    let group = ReadyGroup::new();
    let store = MemoryPreferencesStore::new();
    let mut first = view(5, &store).with_ready_group(&group);
    let mut second = ViewBinder::new(
        "rooms",
        FakeListing::new(0).failing_with(ListingFailure::Status { status: 404 }),
        store.clone(),
        ViewOptions::default(),
    )
    .with_ready_group(&group);
    assert_eq!(group.pending(), 2);

    first.init().await.unwrap();
    assert!(!group.is_ready());
    assert!(second.init().await.is_err());
    assert!(group.is_ready());

    first.refresh().await.unwrap();
    assert!(group.is_ready());
}
