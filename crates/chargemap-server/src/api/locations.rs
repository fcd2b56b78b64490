use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chargemap_client::{LoadState, LocationDetail, MapPoint};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta, ViewQuery};

#[derive(Debug, Serialize)]
pub(super) struct LocationsData {
    pub count: usize,
    pub count_text: String,
    pub offline: bool,
    pub points: Vec<MapPoint>,
    pub selected: Option<LocationDetail>,
}

pub(super) async fn list_locations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ApiResponse<LocationsData>>, ApiError> {
    let mut view = state.page.load_view().await;
    if let LoadState::Failed(message) = view.load_state() {
        return Err(ApiError::new(req_id.0, "upstream_error", message.clone()));
    }

    query.apply_filters(&mut view);
    if let Some(id) = query.selected_id() {
        if !view.select(&id) {
            return Err(ApiError::new(
                req_id.0,
                "not_found",
                format!("location {id} not found"),
            ));
        }
    }

    let points = view.points();
    Ok(Json(ApiResponse {
        data: LocationsData {
            count: points.len(),
            count_text: view.count_text(),
            offline: view.is_offline(),
            points,
            selected: view.selected_detail(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
