use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::domain::{
    AdminUser, Application, ApplicationData, ApplicationFilter, ApplicationId, ApplicationStatus,
    ApplicationSubmission, ApprovalRecord, Decision, DocumentKind, DocumentVerificationRecord,
    ReviewAction, UserId, VettingRecord,
};
use super::permissions::{
    action_block_reason, is_admin, is_ready_for_vetting_completion, unverified_documents,
};
use super::presentation::ReviewView;
use super::repository::{
    ApplicationRepository, ApplicationUpdate, Notification, NotificationPublisher,
    RepositoryError,
};
use crate::config::WorkflowConfig;

/// Flag changes applied by one verify-documents call. Absent flags are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentVerificationUpdate {
    #[serde(default)]
    pub national_id_verified: Option<bool>,
    #[serde(default)]
    pub address_proof_verified: Option<bool>,
    #[serde(default)]
    pub category_doc_verified: Option<bool>,
    #[serde(default)]
    pub verified_by: Option<UserId>,
    #[serde(default)]
    pub verification_notes: Option<String>,
}

impl DocumentVerificationUpdate {
    pub fn single(kind: DocumentKind, verified: bool, verified_by: UserId) -> Self {
        let mut update = Self {
            verified_by: Some(verified_by),
            ..Self::default()
        };
        *update.flag_mut(kind) = Some(verified);
        update
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.verification_notes = notes;
        self
    }

    fn flag_mut(&mut self, kind: DocumentKind) -> &mut Option<bool> {
        match kind {
            DocumentKind::NationalId => &mut self.national_id_verified,
            DocumentKind::AddressProof => &mut self.address_proof_verified,
            DocumentKind::CategoryDoc => &mut self.category_doc_verified,
        }
    }

    fn flags(&self) -> Vec<(DocumentKind, bool)> {
        DocumentKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let value = match kind {
                    DocumentKind::NationalId => self.national_id_verified,
                    DocumentKind::AddressProof => self.address_proof_verified,
                    DocumentKind::CategoryDoc => self.category_doc_verified,
                };
                value.map(|verified| (kind, verified))
            })
            .collect()
    }
}

/// Workflow controller composing the permission evaluator, persistence, and notifications.
pub struct ReviewWorkflowService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    config: WorkflowConfig,
    sequence: AtomicU64,
}

impl<R, N> ReviewWorkflowService<R, N>
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, config: WorkflowConfig) -> Self {
        Self {
            repository,
            notifier,
            config,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Accept a new application in `pending` with an empty verification record.
    ///
    /// Ids come from an in-process counter. When the store already holds the minted id (a
    /// restart against persisted data), the counter is advanced past the highest stored id and
    /// the insert is retried once.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<Application, WorkflowError> {
        if submission.owner_id.is_blank() {
            return Err(WorkflowError::Validation("ownerId is required".to_string()));
        }
        let service_name = submission.service_name.trim();
        if service_name.is_empty() {
            return Err(WorkflowError::Validation(
                "serviceName is required".to_string(),
            ));
        }

        let now = Utc::now();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut application = Application {
            id: application_id_for(sequence),
            owner_id: submission.owner_id,
            reference_number: self.reference_number(now, sequence),
            service_name: service_name.to_string(),
            status: ApplicationStatus::Pending,
            application_data: ApplicationData {
                documents: submission.documents,
                document_verifications: DocumentVerificationRecord::default(),
                vetting: None,
                approval: None,
                details: submission.details,
            },
            submitted_at: now,
            updated_at: now,
        };

        let stored = match self.repository.insert(application.clone()) {
            Err(RepositoryError::Conflict) => {
                let sequence = self.resync_sequence()?;
                warn!(
                    colliding_id = %application.id,
                    next_id = %application_id_for(sequence),
                    "application id already stored; sequence advanced past repository"
                );
                application.id = application_id_for(sequence);
                application.reference_number = self.reference_number(now, sequence);
                self.repository.insert(application)?
            }
            result => result?,
        };
        info!(
            application_id = %stored.id,
            reference = %stored.reference_number,
            service = %stored.service_name,
            "application submitted"
        );
        Ok(stored)
    }

    /// Owner-scoped read; someone else's application is reported as missing.
    pub fn get_for_owner(
        &self,
        application_id: &ApplicationId,
        user_id: &UserId,
    ) -> Result<Application, WorkflowError> {
        let application = self.load(application_id)?;
        if &application.owner_id != user_id {
            return Err(WorkflowError::NotFound(application_id.clone()));
        }
        Ok(application)
    }

    pub fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Application>, WorkflowError> {
        let mut applications = self.repository.list_applications_for_user(user_id)?;
        newest_first(&mut applications);
        Ok(applications)
    }

    pub fn list_for_admin(
        &self,
        admin: &AdminUser,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, WorkflowError> {
        require_admin(admin)?;
        let mut applications: Vec<Application> = self
            .repository
            .list_all_applications()?
            .into_iter()
            .filter(|application| filter.matches(application))
            .collect();
        newest_first(&mut applications);
        Ok(applications)
    }

    /// Admin view of one application with the evaluator's verdict on every action.
    pub fn review(
        &self,
        application_id: &ApplicationId,
        admin: &AdminUser,
    ) -> Result<ReviewView, WorkflowError> {
        require_admin(admin)?;
        let application = self.load(application_id)?;
        Ok(ReviewView::build(application, admin))
    }

    /// Complete vetting and move the application to `in_progress`.
    ///
    /// Without `completeness_override` the document gate is re-derived from the stored record;
    /// the override is only honoured when the workflow config allows it.
    pub fn vet(
        &self,
        application_id: &ApplicationId,
        admin: &AdminUser,
        notes: Option<String>,
        completeness_override: bool,
    ) -> Result<Application, WorkflowError> {
        let application = self.load(application_id)?;
        authorize(admin, &application, ReviewAction::Vet)?;

        let forced = completeness_override && self.config.allow_vetting_override;
        if completeness_override && !forced {
            warn!(
                application_id = %application.id,
                admin_id = %admin.id,
                "vetting override requested but disabled; applying document gate"
            );
        }

        if !forced && !is_ready_for_vetting_completion(&application) {
            let missing: Vec<String> = unverified_documents(&application)
                .into_iter()
                .map(str::to_string)
                .collect();
            warn!(
                application_id = %application.id,
                admin_id = %admin.id,
                missing = ?missing,
                "vetting blocked by document gate"
            );
            return Err(WorkflowError::VettingIncomplete { missing });
        }

        if forced {
            warn!(
                application_id = %application.id,
                admin_id = %admin.id,
                "vetting completed with completeness override"
            );
        }

        let now = Utc::now();
        let mut data = application.application_data;
        data.vetting = Some(VettingRecord {
            completed: true,
            vetted_by: admin.id.clone(),
            vetted_at: now,
            notes: clean_notes(notes),
            completeness_override: forced,
        });

        let updated = self.write(
            application_id,
            ApplicationUpdate {
                status: ApplicationStatus::InProgress,
                application_data: data,
                updated_at: now,
            },
        )?;
        info!(
            application_id = %updated.id,
            admin_id = %admin.id,
            role = %admin.role,
            status = %updated.status,
            "application vetted"
        );
        Ok(updated)
    }

    /// Record the terminal decision and notify the applicant.
    pub fn decide(
        &self,
        application_id: &ApplicationId,
        admin: &AdminUser,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<Application, WorkflowError> {
        let application = self.load(application_id)?;
        authorize(admin, &application, decision.action())?;

        let now = Utc::now();
        let mut data = application.application_data;
        data.approval = Some(ApprovalRecord {
            processed_by: admin.id.clone(),
            processed_at: now,
            decision,
            notes: clean_notes(notes),
        });

        let updated = self.write(
            application_id,
            ApplicationUpdate {
                status: decision.target_status(),
                application_data: data,
                updated_at: now,
            },
        )?;
        info!(
            application_id = %updated.id,
            admin_id = %admin.id,
            role = %admin.role,
            status = %updated.status,
            "application decided"
        );

        self.notify_decision(&updated, decision);
        Ok(updated)
    }

    /// Set one document kind's flag. Repeating the same call leaves the flags unchanged.
    pub fn verify_document(
        &self,
        application_id: &ApplicationId,
        kind: DocumentKind,
        verified: bool,
        verified_by: &UserId,
        notes: Option<String>,
    ) -> Result<DocumentVerificationRecord, WorkflowError> {
        let update = DocumentVerificationUpdate::single(kind, verified, verified_by.clone())
            .with_notes(notes);
        let updated = self.verify_documents(application_id, update)?;
        Ok(updated.application_data.document_verifications)
    }

    /// Apply several verification flags in one write. Status is never changed here.
    pub fn verify_documents(
        &self,
        application_id: &ApplicationId,
        update: DocumentVerificationUpdate,
    ) -> Result<Application, WorkflowError> {
        let verified_by = match &update.verified_by {
            Some(id) if !id.is_blank() => id.clone(),
            _ => {
                return Err(WorkflowError::Validation(
                    "verified_by is required".to_string(),
                ))
            }
        };
        let flags = update.flags();
        if flags.is_empty() {
            return Err(WorkflowError::Validation(
                "at least one document verification flag is required".to_string(),
            ));
        }

        let application = self.load(application_id)?;
        let now = Utc::now();
        let status = application.status;
        let mut data = application.application_data;
        let record = &mut data.document_verifications;
        for (kind, verified) in &flags {
            record.set(*kind, *verified);
        }
        record.verified_by = Some(verified_by.clone());
        if let Some(notes) = clean_notes(update.verification_notes) {
            record.verification_notes = Some(notes);
        }
        record.verified_at = Some(now);

        let updated = self.write(
            application_id,
            ApplicationUpdate {
                status,
                application_data: data,
                updated_at: now,
            },
        )?;
        info!(
            application_id = %updated.id,
            verified_by = %verified_by,
            flags = ?flags,
            "document verification updated"
        );
        Ok(updated)
    }

    /// Owner self-service delete, allowed in any status.
    pub fn delete_application(
        &self,
        application_id: &ApplicationId,
        requesting_user_id: &UserId,
    ) -> Result<(), WorkflowError> {
        let application = self.get_for_owner(application_id, requesting_user_id)?;
        self.repository
            .delete_application(&application.id, requesting_user_id)
            .map_err(|err| persistence_error(application_id, err))?;
        info!(
            application_id = %application.id,
            status = %application.status,
            "application deleted by owner"
        );
        Ok(())
    }

    fn load(&self, application_id: &ApplicationId) -> Result<Application, WorkflowError> {
        self.repository
            .get_application_by_id(application_id)?
            .ok_or_else(|| WorkflowError::NotFound(application_id.clone()))
    }

    fn write(
        &self,
        application_id: &ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<Application, WorkflowError> {
        self.repository
            .update_application_status(application_id, update)
            .map_err(|err| persistence_error(application_id, err))
    }

    /// Move the counter past every id already in the store and claim the next value.
    fn resync_sequence(&self) -> Result<u64, WorkflowError> {
        let highest = self
            .repository
            .list_all_applications()?
            .iter()
            .filter_map(|application| sequence_of(&application.id))
            .max()
            .unwrap_or(0);
        self.sequence.fetch_max(highest + 1, Ordering::Relaxed);
        Ok(self.sequence.fetch_add(1, Ordering::Relaxed))
    }

    fn reference_number(&self, now: DateTime<Utc>, sequence: u64) -> String {
        format!(
            "{}-{}-{sequence:06}",
            self.config.reference_prefix,
            now.year()
        )
    }

    fn notify_decision(&self, application: &Application, decision: Decision) {
        let template = match decision {
            Decision::Approve => "application_approved",
            Decision::Reject => "application_rejected",
        };
        let mut details = BTreeMap::new();
        details.insert(
            "reference_number".to_string(),
            application.reference_number.clone(),
        );
        details.insert("service_name".to_string(), application.service_name.clone());
        details.insert("status".to_string(), application.status.label().to_string());

        let notification = Notification {
            template: template.to_string(),
            application_id: application.id.clone(),
            recipient: application.owner_id.clone(),
            details,
        };
        if let Err(err) = self.notifier.publish(notification) {
            warn!(
                application_id = %application.id,
                error = %err,
                "decision notification not delivered"
            );
        }
    }
}

fn application_id_for(sequence: u64) -> ApplicationId {
    ApplicationId(format!("app-{sequence:06}"))
}

fn sequence_of(id: &ApplicationId) -> Option<u64> {
    id.0.strip_prefix("app-")?.parse().ok()
}

fn require_admin(admin: &AdminUser) -> Result<(), WorkflowError> {
    if is_admin(admin) {
        Ok(())
    } else {
        Err(WorkflowError::NotAuthorized(format!(
            "role '{}' cannot access the review queue",
            admin.role
        )))
    }
}

fn authorize(
    admin: &AdminUser,
    application: &Application,
    action: ReviewAction,
) -> Result<(), WorkflowError> {
    match action_block_reason(admin, application, action) {
        None => Ok(()),
        Some(reason) => {
            warn!(
                application_id = %application.id,
                admin_id = %admin.id,
                role = %admin.role,
                action = %action,
                reason = %reason,
                "review action refused"
            );
            Err(WorkflowError::NotAuthorized(reason))
        }
    }
}

fn persistence_error(application_id: &ApplicationId, err: RepositoryError) -> WorkflowError {
    match err {
        RepositoryError::NotFound => WorkflowError::NotFound(application_id.clone()),
        other => WorkflowError::Persistence(other),
    }
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn newest_first(applications: &mut [Application]) {
    applications.sort_by(|a, b| {
        b.submitted_at
            .cmp(&a.submitted_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn describe_missing(missing: &[String]) -> String {
    if missing.is_empty() {
        "no documents have been uploaded".to_string()
    } else {
        format!("unverified documents: {}", missing.join(", "))
    }
}

/// Error raised by the review workflow controller.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("vetting cannot be completed, {}", describe_missing(.missing))]
    VettingIncomplete { missing: Vec<String> },
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Persistence(#[from] RepositoryError),
}
