//! The `env_echo` operation: look up a set of names in the environment table.

use crate::env::{EnvTable, PWD, WORKSPACE_SLUG};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TOOL_NAME: &str = "env_echo";

/// Variable name to value, `None` when the variable is unset.
pub type Variables = BTreeMap<String, Option<String>>;

/// Literal tag identifying the tool that produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ToolTag {
    #[serde(rename = "env_echo")]
    EnvEcho,
}

/// Structured content returned by `env_echo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EchoOutput {
    pub tool: ToolTag,
    #[schemars(description = "Key/value pairs for each echoed environment variable.")]
    pub variables: Variables,
}

impl EchoOutput {
    pub fn new(variables: Variables) -> Self {
        Self {
            tool: ToolTag::EnvEcho,
            variables,
        }
    }
}

/// Human-readable rendering of a result, with the server's identity attached.
#[derive(Debug, Serialize)]
struct EchoReport<'a> {
    #[serde(flatten)]
    output: &'a EchoOutput,
    workspace_slug: Option<String>,
    pwd: Option<String>,
}

/// Read each distinct name from `table`.
///
/// Unset variables map to `None`, or are left out entirely when `omit_null`.
pub fn collect_variables<S: AsRef<str>>(table: &dyn EnvTable, keys: &[S], omit_null: bool) -> Variables {
    let mut variables = Variables::new();
    for key in keys {
        let key = key.as_ref();
        if variables.contains_key(key) {
            continue;
        }
        match table.get(key) {
            Some(value) => {
                variables.insert(key.to_string(), Some(value));
            }
            None if omit_null => {}
            None => {
                variables.insert(key.to_string(), None);
            }
        }
    }
    variables
}

/// Pretty JSON of `output` plus the current `WORKSPACE_SLUG` and `PWD`.
pub fn render_text(output: &EchoOutput, table: &dyn EnvTable) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&EchoReport {
        output,
        workspace_slug: table.get(WORKSPACE_SLUG),
        pwd: table.get(PWD),
    })
}
