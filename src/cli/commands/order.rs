//! Order command implementation
//!
//! Implements `recipeci order`: print the build order of a selection without
//! building anything.

use anyhow::Result;
use serde_json::json;

use super::{Context, TargetArgs};
use crate::core::planner;

/// Execute the order command
pub fn execute(context: &Context, target: &TargetArgs) -> Result<i32> {
    let settings = context.settings(&target.path)?;
    let (graph, selection) = target.resolve(&settings)?;

    let order = match selection {
        Some(selection) => planner::plan(&graph, &selection, target.level)?.buildable(),
        None => Vec::new(),
    };

    if context.output.json {
        println!("{}", serde_json::to_string_pretty(&json!({ "order": order }))?);
    } else if !context.output.quiet {
        for name in &order {
            println!("{name}");
        }
    }
    Ok(0)
}
