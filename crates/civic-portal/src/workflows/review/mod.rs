//! Application review workflow: role permissions, the document completeness gate, and the
//! controller that moves applications from intake to a terminal decision.

pub mod domain;
pub mod permissions;
pub mod presentation;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AdminUser, Application, ApplicationData, ApplicationFilter, ApplicationId, ApplicationStatus,
    ApplicationSubmission, ApprovalRecord, Decision, DocumentKind, DocumentVerificationRecord,
    ReviewAction, Role, UserId, VettingRecord,
};
pub use permissions::{
    action_block_reason, can_approve, can_perform_action, can_vet, has_been_vetted, is_admin,
    is_ready_for_vetting_completion, permitted_actions, unverified_documents,
    workflow_status_message,
};
pub use presentation::{present, ActionAvailability, ReviewView, StatusPresentation, StatusTone};
pub use repository::{
    ApplicationRepository, ApplicationUpdate, Notification, NotificationError,
    NotificationPublisher, RepositoryError,
};
pub use router::application_router;
pub use service::{DocumentVerificationUpdate, ReviewWorkflowService, WorkflowError};
