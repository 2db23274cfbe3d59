// ABOUTME: Status command implementation.
// ABOUTME: Prints the resolved configuration without contacting any server.

use caravel::config::Config;
use caravel::error::Result;
use caravel::output::Output;

pub fn status(config: Config, output: Output) -> Result<()> {
    let layout = config.layout();

    output.line(&format!("Application: {}", config.application));
    output.line(&format!("Repository:  {}", config.repository));
    output.line(&format!("Releases:    {}", layout.releases_root()));
    output.line(&format!("Shared:      {}", layout.shared_root()));
    output.line(&format!("Current:     {}", layout.current_path()));
    output.line(&format!("Keep:        {}", config.keep_releases));
    output.line(&format!("Servers:     {}", config.servers.len()));
    for server in config.servers.iter() {
        let kind = if server.local { " (local)" } else { "" };
        output.line(&format!("  {}@{}:{}{}", server.login_user(), server.host, server.port, kind));
    }
    Ok(())
}
