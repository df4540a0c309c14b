//! Role-permission evaluator for the review workflow.
//!
//! Every decision here is a pure function of the acting reviewer and the application snapshot.
//! Unknown roles and half-populated applications are never permitted, and nothing in this module
//! returns an error: callers get a boolean or an explanation string.

use super::domain::{AdminUser, Application, ApplicationStatus, ReviewAction, Role};

pub fn is_admin(user: &AdminUser) -> bool {
    user.role.is_admin()
}

/// `approving_admin` alone cannot vet.
pub fn can_vet(user: &AdminUser) -> bool {
    user.role.grants_vetting()
}

/// `vetting_admin` alone cannot approve.
pub fn can_approve(user: &AdminUser) -> bool {
    user.role.grants_approval()
}

pub fn has_been_vetted(application: &Application) -> bool {
    application
        .application_data
        .vetting
        .as_ref()
        .map(|record| record.completed)
        .unwrap_or(false)
}

/// Labels of uploaded documents still awaiting verification, in canonical kind order.
pub fn unverified_documents(application: &Application) -> Vec<&'static str> {
    let data = &application.application_data;
    data.uploaded_kinds()
        .filter(|kind| !data.document_verifications.is_verified(*kind))
        .map(|kind| kind.label())
        .collect()
}

/// An application with nothing uploaded is never ready, even though nothing is unverified.
pub fn is_ready_for_vetting_completion(application: &Application) -> bool {
    let has_documents = application.application_data.uploaded_kinds().next().is_some();
    has_documents && unverified_documents(application).is_empty()
}

pub fn can_perform_action(
    user: &AdminUser,
    application: &Application,
    action: ReviewAction,
) -> bool {
    action_block_reason(user, application, action).is_none()
}

/// Explains why `action` is unavailable, or `None` when the reviewer may proceed.
///
/// Role checks come before state checks so a reviewer without the capability is told about
/// the role rather than about the application.
pub fn action_block_reason(
    user: &AdminUser,
    application: &Application,
    action: ReviewAction,
) -> Option<String> {
    let status = application.status;
    match action {
        ReviewAction::Vet => {
            if !can_vet(user) {
                Some(format!("role '{}' cannot vet applications", user.role))
            } else if status != ApplicationStatus::Pending {
                Some(format!(
                    "vetting is only available for pending applications (current status: {status})"
                ))
            } else {
                None
            }
        }
        ReviewAction::Approve => {
            if !can_approve(user) {
                Some(format!("role '{}' cannot approve applications", user.role))
            } else if status != ApplicationStatus::InProgress {
                Some(format!(
                    "approval requires an application in progress (current status: {status})"
                ))
            } else if !has_been_vetted(application) {
                Some("application must complete vetting before approval".to_string())
            } else {
                None
            }
        }
        ReviewAction::Reject => {
            if !is_admin(user) {
                Some(format!("role '{}' cannot reject applications", user.role))
            } else if status.is_terminal() {
                Some(format!("application is already {status}"))
            } else {
                None
            }
        }
    }
}

/// Actions the reviewer may take right now, in vet/approve/reject order.
pub fn permitted_actions(user: &AdminUser, application: &Application) -> Vec<ReviewAction> {
    ReviewAction::ALL
        .into_iter()
        .filter(|action| can_perform_action(user, application, *action))
        .collect()
}

/// Short banner text describing where the application sits in review.
pub fn workflow_status_message(application: &Application, role: Role) -> &'static str {
    let vetted = has_been_vetted(application);
    match (application.status, vetted) {
        (ApplicationStatus::Pending, false) => "Awaiting Vetting Process",
        (ApplicationStatus::Pending, true) => "Vetting Complete - Awaiting Status Update",
        (ApplicationStatus::InProgress, false) => "Vetting In Progress",
        (ApplicationStatus::InProgress, true) if role.grants_approval() => "Ready for Decision",
        (ApplicationStatus::InProgress, true) => "Awaiting Approval Decision",
        (ApplicationStatus::Completed, _) => "Application Approved",
        (ApplicationStatus::Rejected, _) => "Application Rejected",
    }
}
