use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use doc_checker::config::AppConfig;
use doc_checker::error::AppError;
use doc_checker::{telemetry, DocCheckerSession};

use crate::commands;

const DEFAULT_OPPORTUNITY: &str = "opp-001";

#[derive(Parser, Debug)]
#[command(
    name = "doc-checker",
    about = "Check grant application documents against an opportunity's manifest",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List opportunities that publish a document manifest
    Opportunities,
    /// Show the document requirements for an opportunity
    Manifest(OpportunityArgs),
    /// Start a fresh submission, replacing any stored one
    Start(OpportunityArgs),
    /// Upload one or more documents and print their validation status
    Upload(UploadArgs),
    /// Re-run checks for the stored submission and print every requirement
    Status(OpportunityArgs),
    /// Forget the stored submission
    Reset,
}

#[derive(Args, Debug)]
pub(crate) struct OpportunityArgs {
    /// Opportunity whose manifest applies
    #[arg(long, default_value = DEFAULT_OPPORTUNITY)]
    pub(crate) opportunity: String,
}

#[derive(Args, Debug)]
pub(crate) struct UploadArgs {
    #[command(flatten)]
    pub(crate) target: OpportunityArgs,
    /// Document to upload as <requirement>=<path>; repeat for several files
    #[arg(long = "file", required = true, value_parser = parse_file_arg)]
    pub(crate) files: Vec<FileArg>,
}

#[derive(Debug, Clone)]
pub(crate) struct FileArg {
    pub(crate) requirement_id: String,
    pub(crate) path: PathBuf,
}

fn parse_file_arg(raw: &str) -> Result<FileArg, String> {
    let (requirement_id, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <requirement>=<path>, got '{raw}'"))?;
    let requirement_id = requirement_id.trim();
    let path = path.trim();
    if requirement_id.is_empty() || path.is_empty() {
        return Err(format!("expected <requirement>=<path>, got '{raw}'"));
    }

    Ok(FileArg {
        requirement_id: requirement_id.to_string(),
        path: PathBuf::from(path),
    })
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let session = DocCheckerSession::from_config(&config)?;

    match cli.command {
        Command::Opportunities => commands::opportunities(&session).await,
        Command::Manifest(args) => commands::manifest(&session, &args.opportunity).await,
        Command::Start(args) => commands::start(&session, &args.opportunity).await,
        Command::Upload(args) => commands::upload(&session, args).await,
        Command::Status(args) => commands::status(&session, &args.opportunity).await,
        Command::Reset => commands::reset(&session),
    }
}
