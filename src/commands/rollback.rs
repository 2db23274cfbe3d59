// ABOUTME: Rollback command implementation.
// ABOUTME: Moves current back one release on every server, then reloads services.

use super::connection::connect_all;
use caravel::config::Config;
use caravel::diagnostics::{Diagnostics, Warning};
use caravel::error::{Error, Result};
use caravel::hooks::HookRunner;
use caravel::output::Output;
use caravel::release::{DeployLock, LockInfo, rollback as rollback_host};

pub async fn rollback(config: Config, force: bool, mut output: Output) -> Result<()> {
    let layout = config.layout();
    let total = config.servers.len();
    let mut diag = Diagnostics::default();

    output.start_timer();
    output.progress(&format!(
        "Rolling back {} on {} server(s)",
        config.application, total
    ));

    let connections = connect_all(&config, &output).await;
    connections.report_failures(&output);
    let mut failed = connections.failed.len();

    for connection in &connections.connected {
        let exec = connection.executor();
        let result = DeployLock::with_lock(
            exec,
            &layout.lock_path(),
            LockInfo::new(Some("rollback".to_string())),
            force,
            rollback_host(exec, &layout),
        )
        .await;

        match result {
            Ok(outcome) => {
                output.progress(&format!(
                    "  ✓ [{}] {} -> {}",
                    outcome.host, outcome.from, outcome.to
                ));
                let hooks = HookRunner::new(exec);
                for service in &config.services.reload {
                    if let Err(e) = hooks.reload(service).await {
                        output.warning(None, &e.to_string());
                        diag.warn(Warning::hook(&e));
                    }
                }
            }
            Err(e) => {
                output.error(&e.to_string());
                failed += 1;
            }
        }
    }

    connections.close(&mut diag).await;

    if failed > 0 {
        return Err(Error::HostsFailed { failed, total });
    }
    output.success("Rollback complete!");
    Ok(())
}
