//! Request Engine
//!
//! Creation with cross-entity validation against the item catalog, search
//! with a separate total count, partial updates and the bulk operations.
//!
//! Creating a request against an item reads the item's claim flag and then
//! inserts in a separate statement. A claim landing between the two is not
//! detected.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::item::entity::Item;
use crate::item::repository::ItemRepository;
use crate::request::entity::{
    validate_priority, CreateRequest, NewRequest, Request, RequestPatch, RequestRead,
    RequestStatus, DEFAULT_PRIORITY,
};
use crate::request::notifier::{RequestCreatedNotice, RequestNotifier};
use crate::request::query::{RequestFilter, RequestSort};
use crate::request::repository::RequestRepository;
use crate::shared::api_common::Page;
use crate::shared::db;
use crate::shared::error::{PlatformError, Result};

/// One page of a search plus the unpaginated match count
#[derive(Debug)]
pub struct RequestPage {
    pub total: i64,
    pub requests: Vec<Request>,
}

/// A bulk-create payload that was skipped
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkFailure {
    /// Position in the submitted list
    pub index: usize,
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct BulkCreateOutcome {
    pub created: Vec<Request>,
    pub failed: Vec<BulkFailure>,
}

/// Bulk create response body
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkCreateResponse {
    pub created: Vec<RequestRead>,
    pub failed: Vec<BulkFailure>,
}

impl From<BulkCreateOutcome> for BulkCreateResponse {
    fn from(outcome: BulkCreateOutcome) -> Self {
        Self {
            created: outcome.created.into_iter().map(RequestRead::from).collect(),
            failed: outcome.failed,
        }
    }
}

pub struct RequestService {
    requests: Arc<RequestRepository>,
    items: Arc<ItemRepository>,
    notifier: Arc<dyn RequestNotifier>,
}

impl RequestService {
    pub fn new(
        requests: Arc<RequestRepository>,
        items: Arc<ItemRepository>,
        notifier: Arc<dyn RequestNotifier>,
    ) -> Self {
        Self { requests, items, notifier }
    }

    /// Resolve the referenced item, rejecting claimed ones.
    async fn available_item(&self, item_id: i64) -> Result<Item> {
        let item = self
            .items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Item", item_id))?;

        if item.is_claimed {
            return Err(PlatformError::conflict(format!(
                "Item {} has already been claimed",
                item_id
            )));
        }
        Ok(item)
    }

    async fn prepare(&self, payload: CreateRequest, actor_email: &str) -> Result<(NewRequest, Option<Item>)> {
        let item = match payload.item_id {
            Some(item_id) => Some(self.available_item(item_id).await?),
            None => None,
        };

        let title = match (payload.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()), &item) {
            (Some(title), _) => title,
            (None, Some(item)) => format!("Request for {}", item.title),
            (None, None) => {
                return Err(PlatformError::invalid_argument(
                    "title is required when no item is referenced",
                ))
            }
        };

        let priority = validate_priority(payload.priority.unwrap_or(DEFAULT_PRIORITY))?;

        let requester_email = payload
            .requester_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| actor_email.to_string());

        let new_request = NewRequest {
            title,
            description: payload.description.unwrap_or_default(),
            priority,
            requester_email,
            item_id: item.as_ref().map(|i| i.id),
        };
        Ok((new_request, item))
    }

    pub async fn create(&self, payload: CreateRequest, actor_email: &str) -> Result<Request> {
        let (new_request, item) = self.prepare(payload, actor_email).await?;
        let request = self.requests.insert(&new_request, db::now()).await?;

        info!(
            request_id = request.id,
            item_id = ?request.item_id,
            requester = %request.requester_email,
            "Request created"
        );

        let notice = RequestCreatedNotice {
            request_id: request.id,
            requester_email: request.requester_email.clone(),
            owner_email: item.as_ref().map(|i| i.owner_email.clone()),
            item_title: item.map(|i| i.title),
        };
        if let Err(e) = self.notifier.request_created(&notice).await {
            warn!(request_id = request.id, error = %e, "Request notification failed");
        }

        Ok(request)
    }

    pub async fn list(&self, filter: &RequestFilter, sort: RequestSort, page: Page) -> Result<RequestPage> {
        filter.validate()?;

        let total = self.requests.count(filter).await?;
        let requests = self.requests.search(filter, sort, page).await?;

        debug!(total, returned = requests.len(), "Searched requests");
        Ok(RequestPage { total, requests })
    }

    pub async fn get(&self, id: i64) -> Result<Request> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Request", id))
    }

    /// Apply a partial update. `updated_at` always advances.
    pub async fn update(&self, id: i64, patch: RequestPatch) -> Result<Request> {
        let mut request = self.get(id).await?;
        patch.apply(&mut request)?;
        request.updated_at = request.next_updated_at(db::now());

        if !self.requests.update(&request).await? {
            return Err(PlatformError::not_found("Request", id));
        }
        Ok(request)
    }

    /// Idempotent: `Ok(false)` when nothing was there.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self.requests.delete(id).await?;
        if deleted {
            info!(request_id = id, "Request deleted");
        }
        Ok(deleted)
    }

    /// Create each payload independently, in order. Rejected payloads are
    /// reported by index; store failures abort the batch.
    pub async fn bulk_create(&self, payloads: Vec<CreateRequest>, actor_email: &str) -> Result<BulkCreateOutcome> {
        let mut created = Vec::with_capacity(payloads.len());
        let mut failed = Vec::new();

        for (index, payload) in payloads.into_iter().enumerate() {
            match self.create(payload, actor_email).await {
                Ok(request) => created.push(request),
                Err(e) if e.is_infrastructure() => return Err(e),
                Err(e) => {
                    debug!(index, error = %e, "Skipping bulk payload");
                    failed.push(BulkFailure {
                        index,
                        error: e.code().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(created = created.len(), failed = failed.len(), "Bulk create finished");
        Ok(BulkCreateOutcome { created, failed })
    }

    /// Set `status` on every existing id. Returns how many rows matched.
    pub async fn bulk_update_status(&self, ids: &[i64], status: &str) -> Result<u64> {
        let status: RequestStatus = status.parse()?;
        let now = db::now();

        let mut changed = 0;
        for id in ids.iter().copied().collect::<BTreeSet<i64>>() {
            if self.requests.set_status(id, status, now).await? {
                changed += 1;
            }
        }

        info!(changed, status = %status, "Bulk status update finished");
        Ok(changed)
    }

    /// Delete every existing id. Returns how many rows were removed.
    pub async fn bulk_delete(&self, ids: &[i64]) -> Result<u64> {
        let mut deleted = 0;
        for id in ids.iter().copied().collect::<BTreeSet<i64>>() {
            if self.requests.delete(id).await? {
                deleted += 1;
            }
        }

        info!(deleted, "Bulk delete finished");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::entity::NewItem;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<RequestCreatedNotice>>,
        fail: bool,
    }

    #[async_trait]
    impl RequestNotifier for RecordingNotifier {
        async fn request_created(&self, notice: &RequestCreatedNotice) -> Result<()> {
            self.notices.lock().push(notice.clone());
            if self.fail {
                return Err(PlatformError::internal("mail relay down"));
            }
            Ok(())
        }
    }

    struct Fixture {
        service: RequestService,
        items: Arc<ItemRepository>,
        notifier: Arc<RecordingNotifier>,
    }

    async fn fixture_with(notifier: RecordingNotifier) -> Fixture {
        let pool = db::connect_in_memory().await.unwrap();
        db::init_schema(&pool).await.unwrap();

        let items = Arc::new(ItemRepository::new(pool.clone()));
        let notifier = Arc::new(notifier);
        let service = RequestService::new(
            Arc::new(RequestRepository::new(pool)),
            items.clone(),
            notifier.clone(),
        );
        Fixture { service, items, notifier }
    }

    async fn fixture() -> Fixture {
        fixture_with(RecordingNotifier::default()).await
    }

    async fn post_item(items: &ItemRepository, title: &str) -> Item {
        let new_item = NewItem {
            title: title.to_string(),
            description: "gently used".to_string(),
            category: "kitchen".to_string(),
            condition: "good".to_string(),
            location: "Dorm A".to_string(),
            photo_url: None,
            owner_email: "owner@campus.edu".to_string(),
        };
        items.insert(&new_item, db::now()).await.unwrap()
    }

    fn titled(title: &str, priority: i64) -> CreateRequest {
        CreateRequest {
            title: Some(title.to_string()),
            priority: Some(priority),
            ..Default::default()
        }
    }

    const ACTOR: &str = "student@campus.edu";

    #[tokio::test]
    async fn test_create_defaults() {
        let f = fixture().await;
        let item = post_item(&f.items, "Kettle").await;

        let request = f
            .service
            .create(CreateRequest { item_id: Some(item.id), ..Default::default() }, ACTOR)
            .await
            .unwrap();

        assert_eq!(request.title, "Request for Kettle");
        assert_eq!(request.status, RequestStatus::Open);
        assert_eq!(request.priority, DEFAULT_PRIORITY);
        assert_eq!(request.requester_email, ACTOR);
        assert_eq!(request.created_at, request.updated_at);

        let notices = f.notifier.notices.lock();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].request_id, request.id);
        assert_eq!(notices[0].owner_email.as_deref(), Some("owner@campus.edu"));
        assert_eq!(notices[0].item_title.as_deref(), Some("Kettle"));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = fixture().await;

        let missing_title = f.service.create(CreateRequest::default(), ACTOR).await;
        assert!(matches!(missing_title, Err(PlatformError::InvalidArgument { .. })));

        let bad_priority = f.service.create(titled("Need a desk", 7), ACTOR).await;
        assert!(matches!(bad_priority, Err(PlatformError::InvalidArgument { .. })));

        let missing_item = f
            .service
            .create(CreateRequest { item_id: Some(99), ..Default::default() }, ACTOR)
            .await;
        assert!(matches!(missing_item, Err(PlatformError::NotFound { .. })));

        assert!(f.notifier.notices.lock().is_empty());
    }

    #[tokio::test]
    async fn test_claimed_item_conflicts_without_side_effects() {
        let f = fixture().await;
        let item = post_item(&f.items, "Bike").await;

        f.service
            .create(CreateRequest { item_id: Some(item.id), ..Default::default() }, ACTOR)
            .await
            .unwrap();
        assert!(f.items.mark_claimed(item.id).await.unwrap());

        let second = f
            .service
            .create(CreateRequest { item_id: Some(item.id), ..Default::default() }, ACTOR)
            .await;
        assert!(matches!(second, Err(PlatformError::Conflict { .. })));

        let page = f
            .service
            .list(&RequestFilter::default(), RequestSort::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(f.notifier.notices.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_create() {
        let f = fixture_with(RecordingNotifier { fail: true, ..Default::default() }).await;

        let request = f.service.create(titled("Need a lamp", 2), ACTOR).await.unwrap();
        assert_eq!(f.service.get(request.id).await.unwrap(), request);
        assert_eq!(f.notifier.notices.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_priority_filter_and_rank_sort() {
        let f = fixture().await;
        for (n, priority) in [1, 3, 2, 5, 1].into_iter().enumerate() {
            f.service.create(titled(&format!("r{}", n), priority), ACTOR).await.unwrap();
        }

        let filter = RequestFilter { min_priority: Some(1), max_priority: Some(2), ..Default::default() };
        let sort: RequestSort = "-priority".parse().unwrap();
        let page = f.service.list(&filter, sort, Page::default()).await.unwrap();

        let priorities: Vec<i64> = page.requests.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![1, 1, 2]);
        assert_eq!(page.total, 3);
        assert!(page.requests[0].id < page.requests[1].id);
    }

    #[tokio::test]
    async fn test_pages_partition_the_filtered_set() {
        let f = fixture().await;
        for n in 0..7 {
            f.service.create(titled(&format!("need {}", n), 3), ACTOR).await.unwrap();
        }
        f.service.create(titled("other", 1), "else@campus.edu").await.unwrap();

        let filter = RequestFilter { requester_email: Some(ACTOR.into()), ..Default::default() };
        let sort: RequestSort = "id".parse().unwrap();

        let mut seen = Vec::new();
        for offset in [0, 3, 6] {
            let page = f
                .service
                .list(&filter, sort, Page::new(Some(3), Some(offset)).unwrap())
                .await
                .unwrap();
            assert_eq!(page.total, 7);
            seen.extend(page.requests.into_iter().map(|r| r.id));
        }

        let unique: BTreeSet<i64> = seen.iter().copied().collect();
        assert_eq!(seen.len(), 7);
        assert_eq!(unique.len(), 7);
    }

    #[tokio::test]
    async fn test_owner_email_filter_joins_through_item() {
        let f = fixture().await;
        let item = post_item(&f.items, "Desk").await;
        f.service
            .create(CreateRequest { item_id: Some(item.id), ..Default::default() }, ACTOR)
            .await
            .unwrap();
        f.service.create(titled("unbound", 3), ACTOR).await.unwrap();

        let filter = RequestFilter { owner_email: Some("owner@campus.edu".into()), ..Default::default() };
        let page = f.service.list(&filter, RequestSort::default(), Page::default()).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.requests[0].item_id, Some(item.id));
    }

    #[tokio::test]
    async fn test_partial_update_advances_updated_at() {
        let f = fixture().await;
        let request = f.service.create(titled("Need a chair", 4), ACTOR).await.unwrap();

        let patch: RequestPatch = serde_json::from_str(r#"{"status": "closed"}"#).unwrap();
        let updated = f.service.update(request.id, patch).await.unwrap();

        assert_eq!(updated.status, RequestStatus::Closed);
        assert_eq!(updated.title, request.title);
        assert_eq!(updated.priority, request.priority);
        assert!(updated.updated_at > request.updated_at);
        assert_eq!(f.service.get(request.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_bulk_create_skips_and_reports() {
        let f = fixture().await;
        let outcome = f
            .service
            .bulk_create(
                vec![titled("ok one", 1), CreateRequest::default(), titled("ok two", 9), titled("ok three", 5)],
                ACTOR,
            )
            .await
            .unwrap();

        let titles: Vec<&str> = outcome.created.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["ok one", "ok three"]);

        let indexes: Vec<usize> = outcome.failed.iter().map(|f| f.index).collect();
        assert_eq!(indexes, vec![1, 2]);
        assert!(outcome.failed.iter().all(|f| f.error == "INVALID_ARGUMENT"));
    }

    #[tokio::test]
    async fn test_bulk_status_counts_existing_ids_once() {
        let f = fixture().await;
        let a = f.service.create(titled("a", 3), ACTOR).await.unwrap();
        let b = f.service.create(titled("b", 3), ACTOR).await.unwrap();

        let changed = f
            .service
            .bulk_update_status(&[a.id, b.id, b.id, 404], "in_progress")
            .await
            .unwrap();
        assert_eq!(changed, 2);

        let after = f.service.get(a.id).await.unwrap();
        assert_eq!(after.status, RequestStatus::InProgress);
        assert!(after.updated_at > a.updated_at);

        let invalid = f.service.bulk_update_status(&[a.id], "archived").await;
        assert!(matches!(invalid, Err(PlatformError::InvalidArgument { .. })));
        assert_eq!(f.service.get(a.id).await.unwrap().status, RequestStatus::InProgress);
    }

    #[tokio::test]
    async fn test_delete_and_bulk_delete() {
        let f = fixture().await;
        let a = f.service.create(titled("a", 3), ACTOR).await.unwrap();
        let b = f.service.create(titled("b", 3), ACTOR).await.unwrap();
        let c = f.service.create(titled("c", 3), ACTOR).await.unwrap();

        assert!(f.service.delete(a.id).await.unwrap());
        assert!(!f.service.delete(a.id).await.unwrap());

        assert_eq!(f.service.bulk_delete(&[a.id, b.id, c.id, 77]).await.unwrap(), 2);
        assert!(matches!(f.service.get(c.id).await, Err(PlatformError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_created_range_is_half_open() {
        let f = fixture().await;
        let a = f.service.create(titled("a", 3), ACTOR).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let b = f.service.create(titled("b", 3), ACTOR).await.unwrap();
        assert!(a.created_at < b.created_at);

        let filter = RequestFilter {
            created_from: Some(a.created_at),
            created_to: Some(b.created_at),
            ..Default::default()
        };
        let page = f.service.list(&filter, RequestSort::default(), Page::default()).await.unwrap();

        assert_eq!(page.total, 1);
        let ids: Vec<i64> = page.requests.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id]);
    }

    #[tokio::test]
    async fn test_text_query_matches_title_or_description() {
        let f = fixture().await;
        let by_title = f.service.create(titled("Need a DESK lamp", 3), ACTOR).await.unwrap();
        let by_description = f
            .service
            .create(
                CreateRequest {
                    title: Some("Furniture".to_string()),
                    description: Some("any small desk will do".to_string()),
                    ..Default::default()
                },
                ACTOR,
            )
            .await
            .unwrap();
        f.service.create(titled("Need a kettle", 3), ACTOR).await.unwrap();
        f.service.create(titled("100% cotton", 3), ACTOR).await.unwrap();

        let filter = RequestFilter { text_query: Some("desk".to_string()), ..Default::default() };
        let sort: RequestSort = "id".parse().unwrap();
        let page = f.service.list(&filter, sort, Page::default()).await.unwrap();

        assert_eq!(page.total, 2);
        let ids: Vec<i64> = page.requests.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![by_title.id, by_description.id]);

        let literal = RequestFilter { text_query: Some("0%".to_string()), ..Default::default() };
        let page = f.service.list(&literal, RequestSort::default(), Page::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.requests[0].title, "100% cotton");
    }

    #[tokio::test]
    async fn test_create_logs_once_and_notifies_once() {
        use crate::request::notifier::LogNotifier;
        use std::fmt;
        use tracing::field::{Field, Visit};
        use tracing::{Event, Subscriber};
        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        #[derive(Clone, Default)]
        struct Messages(Arc<Mutex<Vec<String>>>);

        struct MessageVisitor(Option<String>);

        impl Visit for MessageVisitor {
            fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
                if field.name() == "message" {
                    self.0 = Some(format!("{:?}", value));
                }
            }
        }

        impl<S: Subscriber> Layer<S> for Messages {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                let mut visitor = MessageVisitor(None);
                event.record(&mut visitor);
                if let Some(message) = visitor.0 {
                    self.0.lock().push(message);
                }
            }
        }

        let pool = db::connect_in_memory().await.unwrap();
        db::init_schema(&pool).await.unwrap();
        let service = RequestService::new(
            Arc::new(RequestRepository::new(pool.clone())),
            Arc::new(ItemRepository::new(pool)),
            Arc::new(LogNotifier),
        );

        let messages = Messages::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(messages.clone()));

        service.create(titled("Need a chair", 3), ACTOR).await.unwrap();

        let logged = messages.0.lock();
        assert_eq!(logged.iter().filter(|m| *m == "Request created").count(), 1);
        assert_eq!(logged.iter().filter(|m| *m == "Request notification").count(), 1);
    }

    #[tokio::test]
    async fn test_item_delete_orphans_requests() {
        let f = fixture().await;
        let item = post_item(&f.items, "Fan").await;
        let request = f
            .service
            .create(CreateRequest { item_id: Some(item.id), ..Default::default() }, ACTOR)
            .await
            .unwrap();

        assert!(f.items.delete(item.id).await.unwrap());

        let orphan = f.service.get(request.id).await.unwrap();
        assert_eq!(orphan.item_id, None);
        assert_eq!(orphan.title, "Request for Fan");
    }
}
