use crate::infra::{InMemoryApplicationRepository, InMemoryNotificationPublisher};
use chrono::Utc;
use civic_portal::config::WorkflowConfig;
use civic_portal::error::AppError;
use civic_portal::workflows::review::{
    action_block_reason, unverified_documents, AdminUser, Application, ApplicationData,
    ApplicationId, ApplicationStatus, ApplicationSubmission, Decision, DocumentKind, ReviewAction,
    ReviewView, ReviewWorkflowService, Role, UserId, VettingRecord, WorkflowError,
};
use clap::Args;
use serde::Serialize;
use serde_json::{json, Map};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Service the demo application is filed against.
    #[arg(long, default_value = "Business Permit")]
    pub(crate) service_name: String,
    /// Applicant account that owns the demo application.
    #[arg(long, default_value = "citizen-1")]
    pub(crate) owner: String,
    /// Reference number prefix for the demo run.
    #[arg(long, default_value = civic_portal::config::DEFAULT_REFERENCE_PREFIX)]
    pub(crate) reference_prefix: String,
    /// Finish with a rejection instead of an approval.
    #[arg(long)]
    pub(crate) reject: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        service_name,
        owner,
        reference_prefix,
        reject,
    } = args;

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let notifier = Arc::new(InMemoryNotificationPublisher::default());
    let service = ReviewWorkflowService::new(
        repository,
        notifier.clone(),
        WorkflowConfig {
            reference_prefix,
            allow_vetting_override: false,
        },
    );

    let vetter = AdminUser::new("vetting-officer-1", Role::VettingAdmin);
    let approver = AdminUser::new("approving-officer-1", Role::ApprovingAdmin);

    println!("Application review demo");
    let application = service.submit(demo_submission(&owner, &service_name))?;
    println!(
        "- Received {} ({}) for {} -> status {}",
        application.reference_number, application.id, application.service_name, application.status
    );
    print_unverified(&application);

    match service.vet(&application.id, &vetter, None, false) {
        Err(WorkflowError::VettingIncomplete { missing }) => {
            println!("  Vetting blocked, still unverified: {}", missing.join(", "));
        }
        Err(err) => return Err(err.into()),
        Ok(_) => println!("  Vetting unexpectedly completed before verification"),
    }

    for kind in DocumentKind::ALL {
        let record = service.verify_document(
            &application.id,
            kind,
            true,
            &vetter.id,
            Some(format!("{} checked against original", kind.label())),
        )?;
        println!(
            "  {} verified by {}",
            kind.label(),
            record
                .verified_by
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        );
    }

    let vetted = service.vet(
        &application.id,
        &vetter,
        Some("identity and residence confirmed".to_string()),
        false,
    )?;
    println!("- Vetting complete -> status {}", vetted.status);

    if let Some(reason) = action_block_reason(&vetter, &vetted, ReviewAction::Approve) {
        println!("  {} cannot approve: {}", vetter.role, reason);
    }

    let decision = if reject {
        Decision::Reject
    } else {
        Decision::Approve
    };
    let decided = service.decide(
        &application.id,
        &approver,
        decision,
        Some("decision recorded by demo".to_string()),
    )?;
    println!(
        "- {} by {} -> status {}",
        decision.action().verb(),
        approver.role,
        decided.status
    );

    let view = service.review(&application.id, &approver)?;
    println!("  Workflow message: {}", view.workflow_message);
    for availability in &view.actions {
        match &availability.reason {
            Some(reason) => println!("    - {}: blocked ({})", availability.action.verb(), reason),
            None => println!("    - {}: allowed", availability.action.verb()),
        }
    }

    let events = notifier.events();
    if events.is_empty() {
        println!("  Notifications: none dispatched");
    } else {
        println!("  Notifications:");
        for notification in events {
            println!(
                "    - template={} -> {}",
                notification.template, notification.recipient
            );
        }
    }

    Ok(())
}

#[derive(Args, Debug, Default)]
pub(crate) struct RolesArgs {
    /// Emit the matrix as JSON instead of a table.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct RoleMatrixStage {
    stage: &'static str,
    rows: Vec<RoleMatrixRow>,
}

pub(crate) fn run_roles(args: RolesArgs) -> Result<(), AppError> {
    let stages: Vec<RoleMatrixStage> = [
        ("Fresh pending application", sample_application(false)),
        ("Vetted in-progress application", sample_application(true)),
    ]
    .into_iter()
    .map(|(stage, application)| RoleMatrixStage {
        stage,
        rows: role_matrix(&application),
    })
    .collect();

    if args.json {
        match serde_json::to_string_pretty(&stages) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Role matrix unavailable: {err}"),
        }
        return Ok(());
    }

    for RoleMatrixStage { stage, rows } in stages {
        println!("{stage}");
        for row in rows {
            let cells: Vec<String> = row
                .actions
                .iter()
                .map(|availability| {
                    let mark = if availability.allowed { "yes" } else { "no" };
                    format!("{}={}", availability.action.verb(), mark)
                })
                .collect();
            println!("  {:<16} {}", row.role.as_str(), cells.join("  "));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub(crate) struct RoleMatrixRow {
    pub(crate) role: Role,
    pub(crate) actions: Vec<civic_portal::workflows::review::ActionAvailability>,
}

pub(crate) fn role_matrix(application: &Application) -> Vec<RoleMatrixRow> {
    Role::ADMIN_ROLES
        .into_iter()
        .map(|role| {
            let reviewer = AdminUser::new(format!("{role}-demo"), role);
            RoleMatrixRow {
                role,
                actions: ReviewView::build(application.clone(), &reviewer).actions,
            }
        })
        .collect()
}

fn print_unverified(application: &Application) {
    let labels = unverified_documents(application);
    if labels.is_empty() {
        println!("  No documents awaiting verification");
    } else {
        println!("  Awaiting verification: {}", labels.join(", "));
    }
}

fn demo_submission(owner: &str, service_name: &str) -> ApplicationSubmission {
    let documents: BTreeMap<DocumentKind, Vec<String>> = DocumentKind::ALL
        .into_iter()
        .map(|kind| (kind, vec![format!("uploads/{owner}/{kind}.pdf")]))
        .collect();
    let mut details = Map::new();
    details.insert(
        "personalInfo".to_string(),
        json!({ "fullName": "Demo Applicant", "address": "12 Independence Ave" }),
    );
    details.insert("category".to_string(), json!("general"));

    ApplicationSubmission {
        owner_id: UserId::new(owner),
        service_name: service_name.to_string(),
        documents,
        details,
    }
}

fn sample_application(vetted: bool) -> Application {
    let now = Utc::now();
    let mut data = ApplicationData {
        documents: DocumentKind::ALL
            .into_iter()
            .map(|kind| (kind, vec![format!("uploads/sample/{kind}.pdf")]))
            .collect(),
        ..ApplicationData::default()
    };
    let status = if vetted {
        for kind in DocumentKind::ALL {
            data.document_verifications.set(kind, true);
        }
        data.vetting = Some(VettingRecord {
            completed: true,
            vetted_by: UserId::new("vetting-officer-1"),
            vetted_at: now,
            notes: None,
            completeness_override: false,
        });
        ApplicationStatus::InProgress
    } else {
        ApplicationStatus::Pending
    };

    Application {
        id: ApplicationId("app-sample".to_string()),
        owner_id: UserId::new("citizen-sample"),
        reference_number: "GOV-SAMPLE".to_string(),
        service_name: "Sample Service".to_string(),
        status,
        application_data: data,
        submitted_at: now,
        updated_at: now,
    }
}
