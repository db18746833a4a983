//! Dashboard endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::dashboard::DashboardStats};

/// Get library statistics
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    tag = "dashboard",
    responses(
        (status = 200, description = "Library statistics", body = DashboardStats)
    )
)]
pub async fn get_stats(State(state): State<crate::AppState>) -> AppResult<Json<DashboardStats>> {
    let stats = state.services.dashboard.get_stats().await?;
    Ok(Json(stats))
}
