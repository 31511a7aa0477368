use std::sync::Arc;

use doc_checker::error::AppError;
use doc_checker::manifest::{Manifest, ManifestUpdate};
use doc_checker::upload::{ProgressEvent, UploadFile};
use doc_checker::DocCheckerSession;
use futures::future::{join_all, try_join_all};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::cli::UploadArgs;
use crate::render;

pub(crate) async fn opportunities(session: &DocCheckerSession) -> Result<(), AppError> {
    let index = session.load_index().await?;
    render::opportunities(&index);
    Ok(())
}

pub(crate) async fn manifest(
    session: &DocCheckerSession,
    opportunity_id: &str,
) -> Result<(), AppError> {
    let manifest = select(session, opportunity_id).await?;
    render::manifest_header(&manifest);
    render::requirements(&session.view());
    Ok(())
}

pub(crate) async fn start(
    session: &DocCheckerSession,
    opportunity_id: &str,
) -> Result<(), AppError> {
    select(session, opportunity_id).await?;
    let submission = session.start_submission().await?;
    println!(
        "Started submission {} for {}",
        submission.submission_id, submission.opportunity_id
    );
    Ok(())
}

pub(crate) async fn upload(session: &DocCheckerSession, args: UploadArgs) -> Result<(), AppError> {
    let manifest = select(session, &args.target.opportunity).await?;
    for file in &args.files {
        if manifest.requirement(&file.requirement_id).is_none() {
            return Err(AppError::Usage(format!(
                "'{}' is not a requirement of {}",
                file.requirement_id, manifest.opportunity_id
            )));
        }
    }

    let files = try_join_all(args.files.iter().map(|arg| async move {
        let file = UploadFile::from_path(&arg.path).await?;
        Ok::<_, AppError>((arg.requirement_id.as_str(), file))
    }))
    .await?;

    let printer = tokio::spawn(print_progress(session.progress().subscribe()));
    let results = join_all(
        files
            .into_iter()
            .map(|(requirement_id, file)| session.upload(requirement_id, file)),
    )
    .await;
    printer.abort();

    let mut last_failure = None;
    for (arg, result) in args.files.iter().zip(results) {
        match result {
            Ok(receipt) => render::receipt(&receipt),
            Err(err) => {
                println!("{}: upload failed: {err}", arg.requirement_id);
                last_failure = Some(err);
            }
        }
    }

    render::requirements(&session.view());
    match last_failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

pub(crate) async fn status(
    session: &DocCheckerSession,
    opportunity_id: &str,
) -> Result<(), AppError> {
    let manifest = select(session, opportunity_id).await?;
    match session.resume().await? {
        Some(view) => {
            render::manifest_header(&manifest);
            render::status_header(&view);
            render::requirements(&session.view());
        }
        None => println!("No submission yet. Run `doc-checker start` or upload a document."),
    }
    Ok(())
}

pub(crate) fn reset(session: &DocCheckerSession) -> Result<(), AppError> {
    let previous = session.submission_id()?;
    session.reset()?;
    match previous {
        Some(id) => println!("Forgot submission {id}"),
        None => println!("No submission stored"),
    }
    Ok(())
}

async fn select(
    session: &DocCheckerSession,
    opportunity_id: &str,
) -> Result<Arc<Manifest>, AppError> {
    match session.select_opportunity(opportunity_id).await? {
        ManifestUpdate::Current(manifest) => Ok(manifest),
        ManifestUpdate::Superseded { requested } => Err(AppError::Usage(format!(
            "manifest for {requested} was superseded by another selection"
        ))),
    }
}

async fn print_progress(mut events: broadcast::Receiver<ProgressEvent>) {
    loop {
        match events.recv().await {
            Ok(ProgressEvent::Advanced {
                requirement_id,
                percent,
            }) => println!("{requirement_id}: {percent}%"),
            Ok(ProgressEvent::Cleared { .. }) => {}
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "progress printer fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}
