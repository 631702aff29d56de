//! Inspect command implementation
//!
//! Prints how a reference string is parsed and the query the resolver would
//! run for it, as JSON. Useful when an author's link ends up `wrong-format`.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

use fragment_link::query::Query;
use fragment_link::reference::{parse_reference, SelectorType, TargetDescriptor};

use super::load_config;

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Reference string, e.g. "42|report.xml#sde-123"
    #[arg(value_name = "REFERENCE")]
    pub reference: String,

    /// Project the reference is resolved from, for display
    #[arg(short, long, value_name = "ID")]
    pub project: Option<String>,
}

#[derive(Serialize)]
struct Inspection {
    reference: String,
    target: TargetDescriptor,
    malformed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute the inspect command
pub fn execute(args: InspectArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let target = parse_reference(&args.reference);
    let malformed = target.is_malformed();

    let (query, error) = if malformed {
        (None, Some("reference does not follow the grammar".to_string()))
    } else {
        let query = match target.selector_type {
            SelectorType::Id => Ok(Query::id_match(&config.markup.id_attributes, &target.selector)),
            SelectorType::Xpath => Query::parse(&target.selector),
        };
        match query {
            Ok(query) => (Some(query.to_xpath()), None),
            Err(err) => (None, Some(err.to_string())),
        }
    };

    let inspection = Inspection {
        resolved_project: args
            .project
            .as_deref()
            .map(|current| target.project_or(current).to_string()),
        reference: args.reference,
        target,
        malformed,
        query,
        error,
    };
    println!("{}", serde_json::to_string_pretty(&inspection)?);
    Ok(())
}
