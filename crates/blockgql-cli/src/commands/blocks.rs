use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use blockgql_core::node::persist::tree_from_xml;
use blockgql_core::{
    EditorSurface, GraphQlClient, NodeState, OperationKind, OperationResponse, QueryNode,
    SchemaSynchronizer, Workspace, compile, compile_operation,
};
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use super::Session;
use crate::cli::{CompileArgs, OutputFormat, RunArgs};
use crate::output::{print_error, print_json, print_success, print_warning};

pub fn load_tree(path: &Path) -> Result<QueryNode> {
    let xml = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    tree_from_xml(&xml).with_context(|| format!("Invalid block tree in {}", path.display()))
}

/// Fetches the schema for the tree's endpoint and revalidates every block.
///
/// Returns the tree and the number of stale blocks.
async fn check_tree(session: &Session, root: QueryNode) -> Result<(QueryNode, usize)> {
    let endpoint = root.endpoint().to_string();
    let sync = SchemaSynchronizer::new(session.cache.clone());
    let mut workspace = Workspace::new();
    let id = workspace.add_root(root);

    let report = sync
        .refresh(
            session.transport.as_ref(),
            &endpoint,
            &session.headers_for(&endpoint),
            &mut workspace,
        )
        .await
        .with_context(|| format!("Failed to introspect {endpoint}"))?;

    workspace.visit_live_nodes(&endpoint, &mut |node| {
        if let NodeState::Stale(condition) = node.state() {
            print_warning(&format!("{} {}: {}", node.id(), node.field_name().bold(), condition));
        }
    });
    if report.stale == 0 {
        print_success(&format!("{} blocks match {}", report.bound, endpoint));
    }

    let root = workspace
        .find(id)
        .cloned()
        .context("Block tree disappeared from the workspace")?;
    Ok((root, report.stale))
}

pub async fn compile_tree(session: &Session, args: &CompileArgs, format: OutputFormat) -> Result<()> {
    let mut root = load_tree(&args.file)?;
    let mut stale = 0;
    if args.check {
        (root, stale) = check_tree(session, root).await?;
    }

    let compiled = compile(&root);
    match format {
        OutputFormat::Json => print_json(&json!({
            "endpoint": root.endpoint(),
            "query": compiled.render(),
            "plan": compiled.fragment.to_host_code(),
            "stale": stale,
        })),
        OutputFormat::Table => {
            if args.plan {
                println!("{}", compiled.fragment.to_host_code());
            } else {
                print!("{}", compiled.render());
            }
            Ok(())
        }
    }
}

pub async fn run_tree(session: &Session, args: &RunArgs, format: OutputFormat) -> Result<()> {
    let root = load_tree(&args.file)?;
    let endpoint = match &args.endpoint {
        Some(arg) => crate::config::resolve_endpoint(&session.config, Some(arg))?,
        None => root.endpoint().to_string(),
    };

    let kind = if args.mutation {
        OperationKind::Mutation
    } else {
        OperationKind::Query
    };
    let name = args.name.as_deref();
    let document = compile_operation(kind, name, std::slice::from_ref(&root)).render();
    debug!(endpoint = %endpoint, bytes = document.len(), "Compiled operation");

    let client = GraphQlClient::new(session.transport.clone(), &endpoint)
        .with_headers(session.headers_for(&endpoint));
    let operation_name = name.unwrap_or(root.field_name());
    let response = match kind {
        OperationKind::Query => client.query(operation_name, &document).await,
        OperationKind::Mutation => client.mutate(operation_name, &document).await,
    }
    .with_context(|| format!("Request to {endpoint} failed"))?;

    match response {
        OperationResponse::Data(data) => match format {
            OutputFormat::Json => print_json(&data),
            OutputFormat::Table => {
                println!("{}: {}", "Operation".cyan(), operation_name);
                print_json(&data)
            }
        },
        OperationResponse::Errors(messages) => {
            for message in &messages {
                print_error(message);
            }
            anyhow::bail!("{endpoint} returned {} error(s)", messages.len())
        }
    }
}
