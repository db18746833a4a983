//! Dashboard service

use crate::{error::AppResult, models::dashboard::DashboardStats, repository::Repository};

/// Number of recently added books shown on the dashboard
const RECENT_BOOKS_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
}

impl DashboardService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_stats(&self) -> AppResult<DashboardStats> {
        self.repository.dashboard.get_stats(RECENT_BOOKS_LIMIT).await
    }
}
