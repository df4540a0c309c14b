use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for portal accounts, both applicants and reviewers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a service application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Completed | ApplicationStatus::Rejected
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Account role as stored on the user profile.
///
/// Unknown strings deserialize to [`Role::Unrecognized`] so every permission check on them
/// fails closed instead of rejecting the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Legacy catch-all reviewer role.
    Admin,
    SuperAdmin,
    ApprovingAdmin,
    VettingAdmin,
    Citizen,
    Business,
    PublicServant,
    Unrecognized,
}

impl Role {
    pub const ADMIN_ROLES: [Role; 4] = [
        Role::Admin,
        Role::SuperAdmin,
        Role::ApprovingAdmin,
        Role::VettingAdmin,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "super_admin" => Role::SuperAdmin,
            "approving_admin" => Role::ApprovingAdmin,
            "vetting_admin" => Role::VettingAdmin,
            "citizen" => Role::Citizen,
            "business" => Role::Business,
            "public_servant" => Role::PublicServant,
            _ => Role::Unrecognized,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
            Role::ApprovingAdmin => "approving_admin",
            Role::VettingAdmin => "vetting_admin",
            Role::Citizen => "citizen",
            Role::Business => "business",
            Role::PublicServant => "public_servant",
            Role::Unrecognized => "unrecognized",
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(
            self,
            Role::Admin | Role::SuperAdmin | Role::ApprovingAdmin | Role::VettingAdmin
        )
    }

    pub const fn grants_vetting(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin | Role::VettingAdmin)
    }

    pub const fn grants_approval(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin | Role::ApprovingAdmin)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer acting on an application. Name and email are display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AdminUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(id),
            role,
            name: None,
            email: None,
        }
    }
}

/// Document kinds the vetting stage verifies, declared in canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    NationalId,
    AddressProof,
    CategoryDoc,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::NationalId,
        DocumentKind::AddressProof,
        DocumentKind::CategoryDoc,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            DocumentKind::NationalId => "national_id",
            DocumentKind::AddressProof => "address_proof",
            DocumentKind::CategoryDoc => "category_doc",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::NationalId => "National ID",
            DocumentKind::AddressProof => "Address Proof",
            DocumentKind::CategoryDoc => "Category-Specific Document",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-kind verification flags plus who last touched them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentVerificationRecord {
    pub national_id_verified: bool,
    pub address_proof_verified: bool,
    pub category_doc_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl DocumentVerificationRecord {
    pub fn is_verified(&self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::NationalId => self.national_id_verified,
            DocumentKind::AddressProof => self.address_proof_verified,
            DocumentKind::CategoryDoc => self.category_doc_verified,
        }
    }

    pub fn set(&mut self, kind: DocumentKind, verified: bool) {
        let flag = match kind {
            DocumentKind::NationalId => &mut self.national_id_verified,
            DocumentKind::AddressProof => &mut self.address_proof_verified,
            DocumentKind::CategoryDoc => &mut self.category_doc_verified,
        };
        *flag = verified;
    }
}

/// Audit entry written when vetting completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VettingRecord {
    pub completed: bool,
    pub vetted_by: UserId,
    pub vetted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Set when the reviewer asserted completeness instead of the document gate deriving it.
    #[serde(default)]
    pub completeness_override: bool,
}

/// Terminal reviewer decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub const fn target_status(self) -> ApplicationStatus {
        match self {
            Decision::Approve => ApplicationStatus::Completed,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }

    pub const fn action(self) -> ReviewAction {
        match self {
            Decision::Approve => ReviewAction::Approve,
            Decision::Reject => ReviewAction::Reject,
        }
    }
}

/// Audit entry written when an approving reviewer decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub processed_by: UserId,
    pub processed_at: DateTime<Utc>,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Reviewer actions gated by the permission evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Vet,
    Approve,
    Reject,
}

impl ReviewAction {
    pub const ALL: [ReviewAction; 3] = [
        ReviewAction::Vet,
        ReviewAction::Approve,
        ReviewAction::Reject,
    ];

    pub const fn verb(self) -> &'static str {
        match self {
            ReviewAction::Vet => "vet",
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Service-specific payload carried by every application.
///
/// `documents` maps each kind to the uploaded file references; the review sub-objects are
/// written by the workflow controller. Any other field the intake form captured is preserved
/// untouched in `details`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationData {
    #[serde(default)]
    pub documents: BTreeMap<DocumentKind, Vec<String>>,
    #[serde(default)]
    pub document_verifications: DocumentVerificationRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vetting: Option<VettingRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalRecord>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ApplicationData {
    /// True when at least one non-blank file reference was uploaded for `kind`.
    pub fn has_document(&self, kind: DocumentKind) -> bool {
        self.documents
            .get(&kind)
            .map(|refs| refs.iter().any(|reference| !reference.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn uploaded_kinds(&self) -> impl Iterator<Item = DocumentKind> + '_ {
        DocumentKind::ALL
            .into_iter()
            .filter(|kind| self.has_document(*kind))
    }
}

/// A single service request moving through review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub owner_id: UserId,
    pub reference_number: String,
    pub service_name: String,
    pub status: ApplicationStatus,
    pub application_data: ApplicationData,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Intake payload as posted by the applicant-facing form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmission {
    pub owner_id: UserId,
    pub service_name: String,
    #[serde(default)]
    pub documents: BTreeMap<DocumentKind, Vec<String>>,
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// Admin listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub service_name: Option<String>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        if let Some(status) = self.status {
            if application.status != status {
                return false;
            }
        }

        match self.service_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => application.service_name.eq_ignore_ascii_case(name),
            _ => true,
        }
    }
}
