use doc_checker::manifest::{Manifest, OpportunitySummary};
use doc_checker::status::StatusView;
use doc_checker::upload::{Reconciliation, UploadReceipt};
use doc_checker::view::RequirementView;

pub(crate) fn opportunities(index: &OpportunitySummary) {
    if index.is_empty() {
        println!("No opportunities publish a manifest yet.");
        return;
    }

    println!("Opportunities");
    for (id, title) in index.options() {
        if id == title {
            println!("- {id}");
        } else {
            println!("- {id}: {title}");
        }
    }
}

pub(crate) fn manifest_header(manifest: &Manifest) {
    if manifest.title.trim().is_empty() {
        println!("{}", manifest.opportunity_id);
    } else {
        println!("{} ({})", manifest.title, manifest.opportunity_id);
    }
}

pub(crate) fn status_header(view: &StatusView) {
    let checked = view
        .updated_at
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "not yet checked".to_string());
    println!(
        "Submission {} • Overall: {} • {}",
        view.submission_id,
        view.overall.label(),
        checked
    );
}

pub(crate) fn requirements(views: &[RequirementView]) {
    for view in views {
        println!();
        println!(
            "{} [{}]",
            view.requirement.display_label(),
            view.requirement.id
        );
        println!("  {}", view.requirement.limits_line());
        for rule in view.requirement.rule_summary() {
            println!("  {rule}");
        }

        let mut line = format!("  Status: {}", view.status.label());
        if let Some(filename) = &view.filename {
            line.push_str(&format!(" ({filename})"));
        }
        if let Some(percent) = view.progress {
            line.push_str(&format!(" • uploading {percent}%"));
        }
        println!("{line}");
        for message in &view.messages {
            println!("  - {message}");
        }
    }
}

pub(crate) fn receipt(receipt: &UploadReceipt) {
    match &receipt.reconciliation {
        Reconciliation::Applied(view) => println!(
            "{}: uploaded to {} ({})",
            receipt.requirement_id,
            receipt.submission_id,
            view.status_of(&receipt.requirement_id).label()
        ),
        Reconciliation::Skipped { .. } => println!(
            "{}: uploaded to {}, which is no longer the active submission",
            receipt.requirement_id, receipt.submission_id
        ),
    }
}
