// ABOUTME: Setup command implementation.
// ABOUTME: Prepares the directory skeleton on every server before the first deploy.

use super::connection::connect_all;
use caravel::config::Config;
use caravel::diagnostics::Diagnostics;
use caravel::error::{Error, Result};
use caravel::output::Output;
use caravel::release::prepare_host;
use std::env;

pub async fn setup(config: Config, output: Output) -> Result<()> {
    let context = config.deploy_context(&env::current_dir()?)?;
    let total = config.servers.len();
    let mut diag = Diagnostics::default();

    let connections = connect_all(&config, &output).await;
    connections.report_failures(&output);
    let mut failed = connections.failed.len();

    for connection in &connections.connected {
        let exec = connection.executor();
        output.progress(&format!(
            "  → Preparing {} on {}...",
            context.layout.project_root(),
            exec.host()
        ));
        if let Err(e) = prepare_host(exec, &context).await {
            output.error(&e.to_string());
            failed += 1;
        }
    }

    connections.close(&mut diag).await;

    if failed > 0 {
        return Err(Error::HostsFailed { failed, total });
    }
    output.success(&format!("Prepared {} server(s)", total));
    Ok(())
}
