use anyhow::Result;
use colored::*;
use skill_kernel::{Kernel, KernelConfig};
use skill_kernel::config::TransportKind;

/// Starts the kernel and serves its tool catalog over MCP, blocking until
/// the client disconnects or the process receives a shutdown signal.
pub async fn execute(mut config: KernelConfig, http: bool, host: Option<String>, port: Option<u16>) -> Result<()> {
    if http {
        config.transport.kind = TransportKind::Http;
    }
    if let Some(host) = host {
        config.transport.host = host;
    }
    if let Some(port) = port {
        config.transport.port = port;
    }

    let kernel = Kernel::new(config.clone());
    kernel.start().await?;
    println!(
        "{} kernel started — {} skill(s) registered",
        "✓".green(),
        kernel.registered_skill_count()
    );

    let server = kernel.mcp_server();
    let result = match config.transport.kind {
        TransportKind::Stdio => {
            eprintln!("{} serving over stdio", "→".cyan());
            server.run().await
        }
        TransportKind::Http => {
            eprintln!(
                "{} serving over streaming HTTP at http://{}:{}/mcp",
                "→".cyan(),
                config.transport.host,
                config.transport.port
            );
            server.run_http(&config.transport.host, config.transport.port).await
        }
    };

    kernel.stop().await;
    result
}
