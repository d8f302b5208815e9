use anyhow::{Context, Result};
use clap::Args;
use policy_engine::{OrgDirectory, OrgUnit};
use std::path::Path;
use tabled::{settings::style::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct OrgunitsArgs {
    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Tabled)]
struct OrgUnitRow {
    #[tabled(rename = "PATH")]
    path: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "CHILDREN")]
    children: usize,
}

pub async fn run(config_path: Option<&Path>, args: OrgunitsArgs) -> Result<()> {
    let config = super::load_config(config_path)?;
    let backend = super::connect(&config)?;
    let directory = OrgDirectory::fetch(backend.as_ref())
        .await
        .context("Failed to load org units")?;

    let mut units: Vec<&OrgUnit> = directory.units().iter().collect();
    units.sort_by(|a, b| a.path.cmp(&b.path));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&units)?);
        return Ok(());
    }

    let rows: Vec<OrgUnitRow> = units
        .iter()
        .map(|unit| OrgUnitRow {
            path: indented_path(&unit.path),
            id: unit.id.clone(),
            children: directory.children_of(&unit.id).len(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}

/// `/Sales/EMEA` → `    EMEA`, two spaces per level below the root.
fn indented_path(path: &str) -> String {
    if path == "/" {
        return path.to_string();
    }
    let depth = path.matches('/').count();
    let name = path.rsplit('/').next().unwrap_or(path);
    format!("{}{}", "  ".repeat(depth), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indented_path() {
        assert_eq!(indented_path("/"), "/");
        assert_eq!(indented_path("/Sales"), "  Sales");
        assert_eq!(indented_path("/Sales/EMEA"), "    EMEA");
    }
}
