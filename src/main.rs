//! mcp-echo-env: MCP server that echoes environment variables
//!
//! Run with: `mcp-echo-env` (serves on stdio)

use mcp_echo_env::env::ProcessEnv;
use mcp_echo_env::lifecycle::{self, RunMode};
use mcp_echo_env::logging::{self, LogConfig};
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

/// Grace period for runtime tasks once the server has stopped. The stdin
/// reader thread blocks until the client writes or hangs up, so it is never
/// waited on.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return fatal(anyhow::Error::new(e).context("failed to build tokio runtime")),
    };

    let result = runtime.block_on(lifecycle::run(RunMode::Stdio));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);

    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fatal(e),
    };
    let _ = std::io::stderr().flush();
    code
}

fn fatal(e: anyhow::Error) -> ExitCode {
    // No-op when startup got far enough to install the subscriber
    logging::init(&LogConfig::from_env(&ProcessEnv));
    tracing::error!("Fatal server error: {:#}", e);
    ExitCode::FAILURE
}
