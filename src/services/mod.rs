//! Business logic services

pub mod catalog;
pub mod dashboard;
pub mod feedback;
pub mod lending;

use crate::{config::LendingConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    pub feedback: feedback::FeedbackService,
    pub dashboard: dashboard::DashboardService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, lending_config: LendingConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            lending: lending::LendingService::new(repository.clone(), lending_config),
            feedback: feedback::FeedbackService::new(repository.clone()),
            dashboard: dashboard::DashboardService::new(repository.clone()),
            repository,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.storage.ping().await
    }
}
