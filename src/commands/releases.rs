// ABOUTME: Release listing and on-demand pruning commands.
// ABOUTME: Pruning takes the deploy lock so it cannot race a running deploy.

use super::connection::connect_all;
use caravel::config::Config;
use caravel::diagnostics::{Diagnostics, Warning};
use caravel::error::{Error, Result};
use caravel::output::Output;
use caravel::release::{DeployLock, LinkResolver, LockInfo, RetentionPolicy};
use caravel::remote::RemoteExecutor;

/// List releases on every server, newest first, marking the active one.
pub async fn releases(config: Config, output: Output) -> Result<()> {
    let layout = config.layout();
    let total = config.servers.len();
    let mut diag = Diagnostics::default();

    let connections = connect_all(&config, &output).await;
    connections.report_failures(&output);
    let mut failed = connections.failed.len();

    for connection in &connections.connected {
        let exec = connection.executor();
        let listing = async {
            let releases = RetentionPolicy::new(exec, &layout).list_releases().await?;
            let active = LinkResolver::new(exec, &layout).current_release_name().await?;
            Ok::<_, caravel::release::DeployError>((releases, active))
        };

        match listing.await {
            Ok((releases, active)) => {
                output.line(&format!("{}:", exec.host()));
                if releases.is_empty() {
                    output.line("  (no releases)");
                }
                for id in releases {
                    let marker = if active.as_deref() == Some(id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    output.line(&format!("{} {}", marker, id));
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
    Ok(())
}

/// Prune every server down to `keep` releases (or the configured count).
pub async fn prune(config: Config, keep: Option<usize>, output: Output) -> Result<()> {
    let keep = keep.unwrap_or(config.keep_releases);
    let layout = config.layout();
    let total = config.servers.len();
    let mut diag = Diagnostics::default();

    let connections = connect_all(&config, &output).await;
    connections.report_failures(&output);
    let mut failed = connections.failed.len();

    for connection in &connections.connected {
        let exec: &dyn RemoteExecutor = connection.executor();
        output.progress(&format!("  → Pruning {} to {} release(s)...", exec.host(), keep));

        let result = DeployLock::with_lock(
            exec,
            &layout.lock_path(),
            LockInfo::new(Some("prune".to_string())),
            false,
            RetentionPolicy::new(exec, &layout).prune(keep),
        )
        .await;

        match result {
            Ok(report) => {
                for id in &report.removed {
                    output.progress(&format!("    removed {}", id));
                }
                if let Some(id) = &report.protected {
                    output.warning(
                        Some(exec.host()),
                        &format!("kept active release {} outside the window", id),
                    );
                }
                for failure in &report.failures {
                    let warning = Warning::retention(exec.host(), failure);
                    output.warning(None, &warning.message);
                    diag.warn(warning);
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
    match diag.summary() {
        Some(summary) => output.success(&format!("Pruned with {}", summary)),
        None => output.success("Pruned old releases"),
    }
    Ok(())
}
