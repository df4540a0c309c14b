use serde::Serialize;

use super::domain::{AdminUser, Application, ApplicationStatus, ReviewAction};
use super::permissions::{
    action_block_reason, has_been_vetted, is_ready_for_vetting_completion, unverified_documents,
    workflow_status_message,
};

/// Visual tone for status badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Warning,
    Info,
    Success,
    Danger,
}

/// Canonical display mapping for a status; the only place screens should source it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPresentation {
    pub status: ApplicationStatus,
    pub display_name: &'static str,
    pub tone: StatusTone,
}

const STATUS_TABLE: [StatusPresentation; 4] = [
    StatusPresentation {
        status: ApplicationStatus::Pending,
        display_name: "Pending Review",
        tone: StatusTone::Warning,
    },
    StatusPresentation {
        status: ApplicationStatus::InProgress,
        display_name: "In Progress",
        tone: StatusTone::Info,
    },
    StatusPresentation {
        status: ApplicationStatus::Completed,
        display_name: "Approved",
        tone: StatusTone::Success,
    },
    StatusPresentation {
        status: ApplicationStatus::Rejected,
        display_name: "Rejected",
        tone: StatusTone::Danger,
    },
];

pub fn present(status: ApplicationStatus) -> StatusPresentation {
    match status {
        ApplicationStatus::Pending => STATUS_TABLE[0],
        ApplicationStatus::InProgress => STATUS_TABLE[1],
        ApplicationStatus::Completed => STATUS_TABLE[2],
        ApplicationStatus::Rejected => STATUS_TABLE[3],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionAvailability {
    pub action: ReviewAction,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Everything an admin screen needs to render one application without re-deriving rules.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub application: Application,
    pub presentation: StatusPresentation,
    pub workflow_message: &'static str,
    pub vetted: bool,
    pub ready_for_vetting_completion: bool,
    pub unverified_documents: Vec<&'static str>,
    pub actions: Vec<ActionAvailability>,
}

impl ReviewView {
    pub fn build(application: Application, reviewer: &AdminUser) -> Self {
        let actions = ReviewAction::ALL
            .into_iter()
            .map(|action| {
                let reason = action_block_reason(reviewer, &application, action);
                ActionAvailability {
                    action,
                    allowed: reason.is_none(),
                    reason,
                }
            })
            .collect();

        Self {
            presentation: present(application.status),
            workflow_message: workflow_status_message(&application, reviewer.role),
            vetted: has_been_vetted(&application),
            ready_for_vetting_completion: is_ready_for_vetting_completion(&application),
            unverified_documents: unverified_documents(&application),
            actions,
            application,
        }
    }
}
