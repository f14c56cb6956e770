#[cfg(feature = "mcp-server")]
use tanya::run_mcp_stdio;

/// Standalone MCP server using stdio transport (stdin/stdout).
///
/// MCP clients that spawn a process (editors, desktop assistants) read
/// JSON-RPC responses from stdout and write requests to stdin.
///
/// # Example Configuration
///
/// ```json
/// {
///   "mcpServers": {
///     "tanya": {
///       "command": "/path/to/tanya-mcp",
///       "args": []
///     }
///   }
/// }
/// ```
///
/// # Environment Variables
///
/// - `TANYA_LOG`: Set logging level (trace, debug, info, warn, error)
/// - `TANYA_DATA_DIR`: Override data directory location
/// - `OPENAI_API_KEY`: Key for the default hosted answer generator
///
#[cfg(feature = "mcp-server")]
#[tokio::main]
async fn main() {
    if let Err(err) = run_mcp_stdio().await {
        eprintln!("[tanya::mcp] Runtime failed: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "mcp-server"))]
fn main() {
    eprintln!("[tanya::mcp] Build with `--features mcp-server` to enable the MCP stdio server.");
    eprintln!("Example: cargo build --release --bin tanya-mcp --features mcp-server");
    std::process::exit(1);
}
