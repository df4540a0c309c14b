use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::{json, Map, Value};

use crate::config::WorkflowConfig;
use crate::workflows::review::domain::{
    AdminUser, Application, ApplicationData, ApplicationId, ApplicationStatus,
    ApplicationSubmission, DocumentKind, Role, UserId, VettingRecord,
};
use crate::workflows::review::repository::{
    ApplicationRepository, ApplicationUpdate, Notification, NotificationError,
    NotificationPublisher, RepositoryError,
};
use crate::workflows::review::{application_router, ReviewWorkflowService};

pub(super) const OWNER: &str = "citizen-42";

pub(super) fn admin(role: Role) -> AdminUser {
    AdminUser::new(format!("{role}-7"), role)
}

pub(super) fn owner() -> UserId {
    UserId::new(OWNER)
}

pub(super) fn uploads(kinds: &[DocumentKind]) -> BTreeMap<DocumentKind, Vec<String>> {
    kinds
        .iter()
        .map(|kind| (*kind, vec![format!("uploads/{OWNER}/{kind}.pdf")]))
        .collect()
}

pub(super) fn application(status: ApplicationStatus, kinds: &[DocumentKind]) -> Application {
    let submitted_at = Utc
        .with_ymd_and_hms(2026, 3, 2, 9, 30, 0)
        .single()
        .expect("valid timestamp");
    Application {
        id: ApplicationId("app-000100".to_string()),
        owner_id: owner(),
        reference_number: "GOV-2026-000100".to_string(),
        service_name: "City Pass".to_string(),
        status,
        application_data: ApplicationData {
            documents: uploads(kinds),
            ..ApplicationData::default()
        },
        submitted_at,
        updated_at: submitted_at,
    }
}

pub(super) fn verify_all(application: &mut Application) {
    let data = &mut application.application_data;
    let kinds: Vec<DocumentKind> = data.uploaded_kinds().collect();
    for kind in kinds {
        data.document_verifications.set(kind, true);
    }
}

pub(super) fn mark_vetted(application: &mut Application) {
    application.application_data.vetting = Some(VettingRecord {
        completed: true,
        vetted_by: UserId::new("vetting_admin-7"),
        vetted_at: application.submitted_at,
        notes: None,
        completeness_override: false,
    });
}

pub(super) fn all_kinds() -> Vec<DocumentKind> {
    DocumentKind::ALL.to_vec()
}

pub(super) fn submission(kinds: &[DocumentKind]) -> ApplicationSubmission {
    let mut details = Map::new();
    details.insert(
        "personalInfo".to_string(),
        json!({ "fullName": "Ama Mensah", "phone": "+233200000000" }),
    );
    details.insert("category".to_string(), json!("student"));

    ApplicationSubmission {
        owner_id: owner(),
        service_name: "City Pass".to_string(),
        documents: uploads(kinds),
        details,
    }
}

pub(super) fn workflow_config() -> WorkflowConfig {
    WorkflowConfig {
        reference_prefix: "CP".to_string(),
        allow_vetting_override: true,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, id: &ApplicationId) -> Option<Application> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn get_application_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_application_status(
        &self,
        id: &ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.status = update.status;
        record.application_data = update.application_data;
        record.updated_at = update.updated_at;
        Ok(record.clone())
    }

    fn list_applications_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| &application.owner_id == user_id)
            .cloned()
            .collect())
    }

    fn list_all_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn delete_application(
        &self,
        id: &ApplicationId,
        owner_id: &UserId,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get(id) {
            Some(application) if &application.owner_id == owner_id => {
                guard.remove(id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}

/// Serves reads from a snapshot but refuses every write.
pub(super) struct ReadOnlyRepository {
    pub(super) application: Application,
}

impl ApplicationRepository for ReadOnlyRepository {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("read only replica".to_string()))
    }

    fn get_application_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok((&self.application.id == id).then(|| self.application.clone()))
    }

    fn update_application_status(
        &self,
        _id: &ApplicationId,
        _update: ApplicationUpdate,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("read only replica".to_string()))
    }

    fn list_applications_for_user(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(vec![self.application.clone()])
    }

    fn list_all_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(vec![self.application.clone()])
    }

    fn delete_application(
        &self,
        _id: &ApplicationId,
        _owner_id: &UserId,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only replica".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn get_application_by_id(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_application_status(
        &self,
        _id: &ApplicationId,
        _update: ApplicationUpdate,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_applications_for_user(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_all_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_application(
        &self,
        _id: &ApplicationId,
        _owner_id: &UserId,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl NotificationPublisher for OfflineNotifier {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }
}

pub(super) type MemoryService = ReviewWorkflowService<MemoryRepository, MemoryNotifier>;

pub(super) fn build_service() -> (MemoryService, Arc<MemoryRepository>, Arc<MemoryNotifier>) {
    build_service_with(workflow_config())
}

pub(super) fn build_service_with(
    config: WorkflowConfig,
) -> (MemoryService, Arc<MemoryRepository>, Arc<MemoryNotifier>) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = ReviewWorkflowService::new(repository.clone(), notifier.clone(), config);
    (service, repository, notifier)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    application_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
