use anyhow::Result;
use clap::Args;
use policy_engine::categories;
use serde::Serialize;
use tabled::{settings::style::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct CategoriesArgs {
    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct CategoryRow {
    #[tabled(rename = "CATEGORY")]
    category: &'static str,
    #[tabled(rename = "NAMESPACE")]
    namespace: &'static str,
}

pub fn run(args: CategoriesArgs) -> Result<()> {
    let rows: Vec<CategoryRow> = categories::all()
        .map(|(category, namespace)| CategoryRow {
            category,
            namespace,
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}
