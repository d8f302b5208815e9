use anyhow::{bail, Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use policy_engine::{BatchOutcome, ConsoleSession, SubmissionReport};
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Org unit path (`/Sales`) or id (`id:03ph8a2z1abc`)
    #[arg(long)]
    pub ou: String,

    /// Policy category (default: `defaultCategory` from config)
    #[arg(long)]
    pub category: Option<String>,

    /// Field change as `Schema.field=value`; the schema may omit the category namespace
    #[arg(long = "set", value_name = "SCHEMA.FIELD=VALUE")]
    pub set: Vec<String>,

    /// Reset a schema to inherit from the parent org unit
    #[arg(long = "inherit", value_name = "SCHEMA")]
    pub inherit: Vec<String>,

    /// Print the batches that would be sent and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldChange {
    schema: String,
    field: String,
    raw: String,
}

/// Parse `Schema.field=value`. The value may itself contain `=`.
fn parse_set(arg: &str, namespace: &str) -> Result<FieldChange> {
    let (key, raw) = arg
        .split_once('=')
        .with_context(|| format!("Invalid --set '{}': expected SCHEMA.FIELD=VALUE", arg))?;
    let (schema, field) = key
        .rsplit_once('.')
        .filter(|(schema, field)| !schema.is_empty() && !field.is_empty())
        .with_context(|| format!("Invalid --set '{}': expected SCHEMA.FIELD=VALUE", arg))?;

    Ok(FieldChange {
        schema: qualify(schema, namespace),
        field: field.to_string(),
        raw: raw.to_string(),
    })
}

/// `PrintersSettings` → `chrome.users.appsconfig.PrintersSettings`; dotted names pass through.
fn qualify(schema: &str, namespace: &str) -> String {
    if schema.contains('.') {
        schema.to_string()
    } else {
        format!("{}.{}", namespace, schema)
    }
}

fn record_changes(session: &mut ConsoleSession, args: &EditArgs) -> Result<()> {
    let namespace = session.namespace().to_string();

    for arg in &args.set {
        let change = parse_set(arg, &namespace)?;
        session
            .record_edit(&change.schema, &change.field, &change.raw)
            .with_context(|| format!("Cannot apply --set '{}'", arg))?;
    }
    // Inherit takes precedence, so it is recorded after field edits.
    for schema in &args.inherit {
        let schema = qualify(schema, &namespace);
        session
            .record_inherit(&schema)
            .with_context(|| format!("Cannot apply --inherit '{}'", schema))?;
    }
    Ok(())
}

fn describe(outcome: &BatchOutcome) -> String {
    let color = super::should_use_color();
    match outcome {
        BatchOutcome::NotIssued => "not sent".to_string(),
        BatchOutcome::Applied { count } => {
            let text = format!("✓ applied ({} policies)", count);
            if color {
                text.green().to_string()
            } else {
                text
            }
        }
        BatchOutcome::Failed { message } => {
            let text = format!("✗ failed: {}", message);
            if color {
                text.red().to_string()
            } else {
                text
            }
        }
    }
}

fn print_report(report: &SubmissionReport) {
    println!("Modify:  {}", describe(&report.modify));
    println!("Inherit: {}", describe(&report.inherit));
}

fn failure_messages(report: &SubmissionReport) -> Vec<String> {
    [("modify", &report.modify), ("inherit", &report.inherit)]
        .into_iter()
        .filter_map(|(name, outcome)| match outcome {
            BatchOutcome::Failed { message } => Some(format!("{}: {}", name, message)),
            _ => None,
        })
        .collect()
}

pub async fn run(config_path: Option<&Path>, args: EditArgs) -> Result<()> {
    if args.set.is_empty() && args.inherit.is_empty() {
        bail!("Nothing to change. Use --set SCHEMA.FIELD=VALUE or --inherit SCHEMA.");
    }

    let config = super::load_config(config_path)?;
    let mut session = super::open_session(&config, &args.ou, args.category.as_deref()).await?;
    record_changes(&mut session, &args)?;

    let submission = session.pending_submission();
    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&submission)?);
        return Ok(());
    }
    if submission.is_empty() {
        println!("No changes to submit");
        return Ok(());
    }

    info!(
        ou = %session.selected_ou().path,
        modify = submission.to_modify.len(),
        inherit = submission.to_inherit.len(),
        "submitting changes"
    );
    let report = session.submit().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        bail!("Submission failed: {}", failure_messages(&report).join("; "));
    }
    Ok(())
}
