//! mcp-echo-env - MCP server that echoes environment variables of its own process
//!
//! Exposes a single `env_echo` tool over stdio. See [`lifecycle::run`] for the
//! process entry point.

pub mod config;
pub mod dotenv;
pub mod echo;
pub mod env;
pub mod identity;
pub mod lifecycle;
pub mod logging;
pub mod schema;

use echo::{collect_variables, render_text, EchoOutput, TOOL_NAME};
use env::{EnvTable, ProcessEnv};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::*,
    ErrorData as McpError,
};
use schema::RawArguments;
use std::sync::Arc;

const TOOL_TITLE: &str = "Environment Variable Echo";

#[derive(Debug)]
pub struct EchoServer {
    env: Arc<dyn EnvTable>,
    pub tool_router: ToolRouter<Self>,
}

impl Default for EchoServer {
    fn default() -> Self {
        Self::new(Arc::new(ProcessEnv))
    }
}

impl EchoServer {
    pub fn new(env: Arc<dyn EnvTable>) -> Self {
        let mut tool_router = Self::tool_router();
        if let Some(route) = tool_router.map.get_mut(TOOL_NAME) {
            route.attr.title = Some(TOOL_TITLE.to_string());
            route.attr.input_schema = schema::input_schema();
            route.attr.output_schema = Some(schema::output_schema());
        }

        Self { env, tool_router }
    }

    /// Identity reported during initialization, taken from this package's manifest.
    pub fn implementation() -> Implementation {
        let mut implementation = Implementation::from_build_env();
        implementation.name = env!("CARGO_PKG_NAME").to_string();
        implementation.version = env!("CARGO_PKG_VERSION").to_string();
        implementation
    }

    fn invalid_arguments(message: String) -> CallToolResult {
        CallToolResult::error(vec![Content::text(format!("Invalid arguments: {}", message))])
    }
}

#[rmcp::tool_router]
impl EchoServer {
    #[rmcp::tool(
        name = "env_echo",
        description = "Return the values of requested environment variables from the MCP server process.",
        annotations(read_only_hint = true)
    )]
    pub async fn env_echo(
        &self,
        Parameters(raw): Parameters<RawArguments>,
    ) -> Result<CallToolResult, McpError> {
        let request = match schema::validate(raw.normalize()) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, "Invalid arguments");
                return Ok(Self::invalid_arguments(e.to_string()));
            }
        };
        tracing::debug!(keys = ?request.keys, omit_null = request.omit_null, "env_echo invoked");

        let env = self.env.as_ref();
        let output = EchoOutput::new(collect_variables(env, &request.keys, request.omit_null));

        let text = render_text(&output, env)
            .map_err(|e| McpError::internal_error(format!("Failed to render result: {}", e), None))?;
        let structured = serde_json::to_value(&output)
            .map_err(|e| McpError::internal_error(format!("Failed to encode result: {}", e), None))?;

        let mut result = CallToolResult::success(vec![Content::text(text)]);
        result.structured_content = Some(structured);

        tracing::debug!(variables = output.variables.len(), "env_echo returning payload");
        Ok(result)
    }
}

#[rmcp::tool_handler]
impl ServerHandler for EchoServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Self::implementation(),
            instructions: Some(
                "Call the env_echo tool to inspect environment variables from the MCP server process.".into(),
            ),
        }
    }
}
