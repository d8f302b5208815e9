use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use policy_engine::ConsoleSession;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tabled::{settings::style::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Org unit path (`/Sales`) or id (`id:03ph8a2z1abc`)
    #[arg(long, default_value = "/")]
    pub ou: String,

    /// Policy category (default: `defaultCategory` from config)
    #[arg(long)]
    pub category: Option<String>,

    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyView {
    schema_name: String,
    source: String,
    inherited: bool,
    fields: Vec<FieldView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldView {
    name: String,
    field_type: String,
    value: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowOutput {
    org_unit: String,
    category: String,
    namespace: String,
    policies: Vec<PolicyView>,
    unmatched: usize,
}

#[derive(Debug, Tabled)]
struct FieldRow {
    #[tabled(rename = "POLICY")]
    policy: String,
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "VALUE")]
    value: String,
    #[tabled(rename = "TYPE")]
    field_type: String,
    #[tabled(rename = "SOURCE")]
    source: String,
}

fn policy_views(session: &ConsoleSession) -> Vec<PolicyView> {
    session
        .policies()
        .iter()
        .map(|policy| PolicyView {
            schema_name: policy.schema_name.clone(),
            source: session.inheritance_label(policy),
            inherited: session.is_inherited(policy),
            fields: policy
                .fields
                .iter()
                .map(|f| FieldView {
                    name: f.name.clone(),
                    field_type: f.field_type.clone(),
                    value: f.value.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Strip the namespace so the table stays narrow.
fn short_schema<'a>(schema: &'a str, namespace: &str) -> &'a str {
    schema
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(schema)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn colorize_source(source: &str, inherited: bool) -> String {
    if !super::should_use_color() {
        return source.to_string();
    }
    if inherited {
        source.dimmed().to_string()
    } else {
        source.green().to_string()
    }
}

pub async fn run(config_path: Option<&Path>, args: ShowArgs) -> Result<()> {
    let config = super::load_config(config_path)?;
    let session = super::open_session(&config, &args.ou, args.category.as_deref()).await?;
    let policies = policy_views(&session);

    if args.json {
        let output = ShowOutput {
            org_unit: session.selected_ou().path.clone(),
            category: session.category().to_string(),
            namespace: session.namespace().to_string(),
            policies,
            unmatched: session.unmatched().len(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} · {}",
        session.selected_ou().path,
        session.category()
    );

    if policies.is_empty() {
        println!("No policies in {}", session.namespace());
        return Ok(());
    }

    let rows: Vec<FieldRow> = policies
        .iter()
        .flat_map(|policy| {
            let name = short_schema(&policy.schema_name, session.namespace()).to_string();
            let source = colorize_source(&policy.source, policy.inherited);
            policy.fields.iter().map(move |f| FieldRow {
                policy: name.clone(),
                field: f.name.clone(),
                value: display_value(&f.value),
                field_type: f.field_type.clone(),
                source: source.clone(),
            })
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    if !session.unmatched().is_empty() {
        tracing::warn!(
            count = session.unmatched().len(),
            "resolved values without a matching schema were dropped"
        );
    }
    Ok(())
}
