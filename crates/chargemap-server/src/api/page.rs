use axum::{
    extract::{Query, State},
    response::Html,
};
use chargemap_client::render_page;

use super::{AppState, ViewQuery};

/// Each request is a fresh page load.
pub(super) async fn map_page(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Html<String> {
    let mut view = state.page.load_view().await;
    query.apply_filters(&mut view);
    if let Some(id) = query.selected_id() {
        if !view.select(&id) {
            tracing::debug!(%id, "ignoring selection of unknown location");
        }
    }
    Html(render_page(&view))
}
