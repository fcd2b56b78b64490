mod locations;
mod page;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chargemap_client::{MapView, PageContext};
use chargemap_core::LocationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId};

/// `Cache-Control` for the map page: always revalidate.
const PAGE_CACHE_CONTROL: &str = "public, max-age=0, must-revalidate";

#[derive(Clone)]
pub struct AppState {
    pub page: Arc<PageContext>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    worker: String,
    bucket: Option<String>,
    online: bool,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" => StatusCode::BAD_REQUEST,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// View parameters shared by the page and the JSON API.
///
/// `status` is a comma-separated list; `selected` is a location id.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ViewQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub selected: Option<String>,
}

impl ViewQuery {
    pub(super) fn apply_filters(&self, view: &mut MapView) {
        if let Some(search) = &self.search {
            view.set_search(search);
        }
        if let Some(status) = &self.status {
            view.set_status_filters(status.split(','));
        }
    }

    pub(super) fn selected_id(&self) -> Option<LocationId> {
        self.selected
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(LocationId::parse)
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState) -> Router {
    let page_route = get(page::map_page).layer(SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static(PAGE_CACHE_CONTROL),
    ));

    Router::new()
        .route("/", page_route)
        .route("/api/v1/locations", get(locations::list_locations))
        .route("/api/v1/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);
    let online = state.page.connectivity().is_online();

    let data = match state.page.registry().controller() {
        Some(worker) => HealthData {
            status: "ok",
            worker: worker.state().to_string(),
            bucket: Some(worker.bucket().to_owned()),
            online,
        },
        None => {
            tracing::warn!("health check: no offline worker registered");
            HealthData {
                status: "degraded",
                worker: "unregistered".to_owned(),
                bucket: None,
                online,
            }
        }
    };

    (StatusCode::OK, Json(ApiResponse { data, meta }))
}
