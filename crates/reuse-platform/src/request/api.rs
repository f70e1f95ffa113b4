//! Requests API
//!
//! Every route requires a bearer token. List responses carry the unpaginated
//! match count in `X-Total-Count`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::HeaderName, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::request::entity::{CreateRequest, RequestPatch, RequestRead, RequestStatus};
use crate::request::query::{RequestFilter, RequestSort};
use crate::request::service::{BulkCreateResponse, RequestService};
use crate::shared::api_common::{ChangedResponse, IdsRequest, Page, TOTAL_COUNT_HEADER};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct RequestsState {
    pub request_service: Arc<RequestService>,
}

/// Request search parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestsQuery {
    /// Case-insensitive substring of title or description
    pub q: Option<String>,
    /// open, in_progress or closed
    pub status: Option<String>,
    /// Exact requester email
    pub email: Option<String>,
    /// Owner of the referenced item
    pub owner_email: Option<String>,
    /// Inclusive lower bound on creation time
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on creation time
    pub created_to: Option<DateTime<Utc>>,
    pub min_priority: Option<i64>,
    pub max_priority: Option<i64>,
    /// Field name, `-` prefix for descending (default `-created_at`)
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl RequestsQuery {
    fn into_parts(self) -> Result<(RequestFilter, RequestSort, Page), PlatformError> {
        let page = Page::new(self.limit, self.offset)?;
        let sort = match self.sort.as_deref() {
            Some(s) => s.parse()?,
            None => RequestSort::default(),
        };
        let status = self
            .status
            .as_deref()
            .map(str::parse::<RequestStatus>)
            .transpose()?;

        let filter = RequestFilter {
            text_query: self.q,
            status,
            requester_email: self.email,
            owner_email: self.owner_email,
            created_from: self.created_from,
            created_to: self.created_to,
            min_priority: self.min_priority,
            max_priority: self.max_priority,
        };
        Ok((filter, sort, page))
    }
}

/// Bulk status change body
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkStatusRequest {
    pub ids: Vec<i64>,
    pub status: String,
}

/// Search requests
#[utoipa::path(
    get,
    path = "",
    tag = "requests",
    operation_id = "listRequests",
    params(RequestsQuery),
    responses(
        (status = 200, description = "Matching requests", body = Vec<RequestRead>,
            headers(("x-total-count" = i64, description = "Rows matching the filter"))),
        (status = 400, description = "Invalid filter, sort or pagination"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_requests(
    State(state): State<RequestsState>,
    _auth: Authenticated,
    Query(query): Query<RequestsQuery>,
) -> Result<([(HeaderName, String); 1], Json<Vec<RequestRead>>), PlatformError> {
    let (filter, sort, page) = query.into_parts()?;
    let result = state.request_service.list(&filter, sort, page).await?;

    let headers = [(HeaderName::from_static(TOTAL_COUNT_HEADER), result.total.to_string())];
    let body = result.requests.into_iter().map(RequestRead::from).collect();
    Ok((headers, Json(body)))
}

/// Create a request
#[utoipa::path(
    post,
    path = "",
    tag = "requests",
    operation_id = "createRequest",
    request_body = CreateRequest,
    responses(
        (status = 201, description = "Request created", body = RequestRead),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Referenced item not found"),
        (status = 409, description = "Referenced item already claimed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_request(
    State(state): State<RequestsState>,
    auth: Authenticated,
    Json(payload): Json<CreateRequest>,
) -> Result<(StatusCode, Json<RequestRead>), PlatformError> {
    let request = state.request_service.create(payload, &auth.email).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// Get request by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "requests",
    operation_id = "getRequest",
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request found", body = RequestRead),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_request(
    State(state): State<RequestsState>,
    _auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<RequestRead>, PlatformError> {
    Ok(Json(state.request_service.get(id).await?.into()))
}

/// Update request
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "requests",
    operation_id = "updateRequest",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = RequestPatch,
    responses(
        (status = 200, description = "Request updated", body = RequestRead),
        (status = 400, description = "Null or invalid field"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_request(
    State(state): State<RequestsState>,
    _auth: Authenticated,
    Path(id): Path<i64>,
    Json(patch): Json<RequestPatch>,
) -> Result<Json<RequestRead>, PlatformError> {
    Ok(Json(state.request_service.update(id, patch).await?.into()))
}

/// Delete request
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "requests",
    operation_id = "deleteRequest",
    params(("id" = i64, Path, description = "Request ID")),
    responses((status = 204, description = "Request deleted or absent")),
    security(("bearer_auth" = []))
)]
pub async fn delete_request(
    State(state): State<RequestsState>,
    _auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<StatusCode, PlatformError> {
    state.request_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create several requests
///
/// Payloads are processed in order; rejected ones are reported by index.
#[utoipa::path(
    post,
    path = "/bulk",
    tag = "requests",
    operation_id = "bulkCreateRequests",
    request_body = Vec<CreateRequest>,
    responses((status = 201, description = "Batch processed", body = BulkCreateResponse)),
    security(("bearer_auth" = []))
)]
pub async fn bulk_create_requests(
    State(state): State<RequestsState>,
    auth: Authenticated,
    Json(payloads): Json<Vec<CreateRequest>>,
) -> Result<(StatusCode, Json<BulkCreateResponse>), PlatformError> {
    let outcome = state.request_service.bulk_create(payloads, &auth.email).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// Delete several requests
#[utoipa::path(
    delete,
    path = "/bulk",
    tag = "requests",
    operation_id = "bulkDeleteRequests",
    request_body = IdsRequest,
    responses((status = 204, description = "Existing requests deleted")),
    security(("bearer_auth" = []))
)]
pub async fn bulk_delete_requests(
    State(state): State<RequestsState>,
    _auth: Authenticated,
    Json(body): Json<IdsRequest>,
) -> Result<StatusCode, PlatformError> {
    state.request_service.bulk_delete(&body.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set status on several requests
#[utoipa::path(
    patch,
    path = "/bulk/status",
    tag = "requests",
    operation_id = "bulkUpdateRequestStatus",
    request_body = BulkStatusRequest,
    responses(
        (status = 200, description = "Number of existing requests updated", body = ChangedResponse),
        (status = 400, description = "Unknown status")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_update_status(
    State(state): State<RequestsState>,
    _auth: Authenticated,
    Json(body): Json<BulkStatusRequest>,
) -> Result<Json<ChangedResponse>, PlatformError> {
    let changed = state
        .request_service
        .bulk_update_status(&body.ids, &body.status)
        .await?;
    Ok(Json(ChangedResponse { changed }))
}

pub fn requests_router(state: RequestsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_requests, create_request))
        .routes(routes!(bulk_create_requests, bulk_delete_requests))
        .routes(routes!(bulk_update_status))
        .routes(routes!(get_request, update_request, delete_request))
        .with_state(state)
}
