// ABOUTME: Deploy command implementation.
// ABOUTME: Confirms first, then connects to every server and hands the branch to the coordinator.

use super::connection::{HostConnection, connect_all};
use caravel::config::Config;
use caravel::confirm::{AssumeYes, Confirm, TerminalConfirm};
use caravel::diagnostics::{Diagnostics, Warning};
use caravel::error::{Error, Result};
use caravel::output::Output;
use caravel::release::{DeployReport, HostTarget, ReleaseCoordinator};
use caravel::types::BranchName;
use caravel::vcs::GitCli;
use std::env;

/// Options from the command line.
pub struct DeployArgs<'a> {
    pub branch: &'a str,
    pub destination: Option<&'a str>,
    pub yes: bool,
    pub force: bool,
}

/// Deploy `branch` to all configured servers.
pub async fn deploy(config: Config, args: DeployArgs<'_>, mut output: Output) -> Result<()> {
    let branch = BranchName::new(args.branch)?;
    let cwd = env::current_dir()?;
    let context = config.deploy_context(&cwd)?;
    let vcs = GitCli::new(&cwd);
    let confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalConfirm)
    };
    let mut diag = Diagnostics::default();
    let total = config.servers.len();

    output.start_timer();
    let coordinator = ReleaseCoordinator::new(&context, &vcs, confirm.as_ref(), &output)
        .destination(args.destination.unwrap_or("production"))
        .parallel(config.parallel)
        .force_lock(args.force);

    if !coordinator.confirm(&branch, total) {
        output.success("Deploy cancelled; nothing was changed.");
        return Ok(());
    }

    output.progress(&format!(
        "Deploying {} ({}) to {} server(s)",
        config.application, branch, total
    ));

    let connections = connect_all(&config, &output).await;
    connections.report_failures(&output);
    if connections.connected.is_empty() {
        return Err(Error::HostsFailed {
            failed: total,
            total,
        });
    }

    let outcome = {
        let targets: Vec<HostTarget<'_>> = connections
            .connected
            .iter()
            .map(HostConnection::target)
            .collect();
        coordinator.deploy_confirmed(&branch, &targets).await
    };

    let unreachable = connections.failed.len();
    connections.close(&mut diag).await;

    let report = outcome?;

    collect_warnings(&report, &mut diag);
    if let Some(summary) = diag.summary() {
        output.warning(None, &format!("completed with {}", summary));
    }

    let failed = unreachable + report.failed().count();
    if failed > 0 {
        return Err(Error::HostsFailed { failed, total });
    }

    output.success(&format!("Deployed {} to {} server(s)", report.release, total));
    Ok(())
}

fn collect_warnings(report: &DeployReport, diag: &mut Diagnostics) {
    for host in &report.hosts {
        let Ok(summary) = &host.result else {
            continue;
        };
        for failure in &summary.hooks.failures {
            diag.warn(Warning::hook(failure));
        }
        for failure in &summary.prune.failures {
            diag.warn(Warning::retention(&host.host, failure));
        }
    }
}
