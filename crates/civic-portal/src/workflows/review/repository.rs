use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationData, ApplicationId, ApplicationStatus, UserId};

/// Single-row write issued by the workflow controller.
///
/// Status and data travel together so a transition and its audit record land atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationUpdate {
    pub status: ApplicationStatus,
    pub application_data: ApplicationData,
    pub updated_at: DateTime<Utc>,
}

/// Persistence collaborator standing in for the hosted database client.
///
/// Implementations must apply each call to one record atomically. No version check is made
/// before `update_application_status`, so concurrent reviewers resolve last-write-wins.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn get_application_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn update_application_status(
        &self,
        id: &ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<Application, RepositoryError>;
    fn list_applications_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn list_all_applications(&self) -> Result<Vec<Application>, RepositoryError>;
    fn delete_application(
        &self,
        id: &ApplicationId,
        owner_id: &UserId,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail or SMS adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub application_id: ApplicationId,
    pub recipient: UserId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
