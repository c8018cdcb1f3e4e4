use anyhow::Result;
use blockgql_core::OperationKind;
use blockgql_core::node::suggestions::SuggestionSource;

use super::Session;
use crate::cli::OutputFormat;
use crate::output::{print_templates, print_types};

pub async fn introspect(session: &Session, endpoint: &str, format: OutputFormat) -> Result<()> {
    let schema = session.fetch_schema(endpoint).await?;
    print_types(&schema, format)
}

pub async fn fields(
    session: &Session,
    endpoint: &str,
    type_name: Option<&str>,
    mutation: bool,
    format: OutputFormat,
) -> Result<()> {
    let schema = session.fetch_schema(endpoint).await?;

    let templates = match type_name {
        Some(name) => session.cache.suggestions(endpoint, name).ok_or_else(|| {
            anyhow::anyhow!("Type `{name}` does not exist at {endpoint}")
        })?,
        None => {
            let kind = if mutation {
                OperationKind::Mutation
            } else {
                OperationKind::Query
            };
            session
                .cache
                .root_suggestions(endpoint, kind)
                .ok_or_else(|| anyhow::anyhow!("{endpoint} has no {} root", kind.keyword()))?
        }
    };

    if type_name.is_some_and(|name| schema.get_type(name).is_some_and(|t| !t.kind.has_fields())) {
        crate::output::print_warning("Only OBJECT and INTERFACE types have fields");
    }
    print_templates(&templates, format)
}
