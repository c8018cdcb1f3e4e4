use anyhow::Result;
use blockgql_core::Schema;
use blockgql_core::node::suggestions::NodeTemplate;
use colored::Colorize;
use serde_json::{Value, json};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_types(schema: &Schema, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let types: Vec<Value> = schema
                .types
                .values()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "kind": t.kind,
                        "fields": t.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
                        "description": t.description,
                    })
                })
                .collect();
            print_json(&json!({
                "queryType": schema.query_type,
                "mutationType": schema.mutation_type,
                "types": types,
            }))
        }
        OutputFormat::Table => {
            println!("{}: {}", "Query root".cyan(), schema.query_type);
            println!(
                "{}: {}",
                "Mutation root".cyan(),
                schema.mutation_type.as_deref().unwrap_or("(none)")
            );

            let mut builder = Builder::default();
            builder.push_record(["Type", "Kind", "Fields"]);
            for t in schema.types.values().filter(|t| !t.name.starts_with("__")) {
                builder.push_record([
                    t.name.clone(),
                    t.kind.to_string(),
                    t.fields.len().to_string(),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            println!("Total: {}", schema.type_count());
            Ok(())
        }
    }
}

pub fn print_templates(templates: &[NodeTemplate], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(templates)?),
        OutputFormat::Table => {
            if templates.is_empty() {
                println!("No fields.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["Field", "Type", "Block", "Arguments", "Description"]);
            for t in templates {
                let args: Vec<String> = t
                    .parameters
                    .iter()
                    .map(|p| match p.primitive {
                        Some(primitive) => format!("{}: {} ({})", p.name, p.type_name, primitive.as_str()),
                        None => format!("{}: {}", p.name, p.type_name),
                    })
                    .collect();
                builder.push_record([
                    t.field_name.clone(),
                    t.base_type_name.clone(),
                    if t.is_object { "object" } else { "scalar" }.to_string(),
                    args.join(", "),
                    t.description.clone().unwrap_or_default(),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            Ok(())
        }
    }
}
