// ABOUTME: Ownership and mode normalization for release and project directories.
// ABOUTME: Directories become 0775 and files 0664; symbolic links are not followed.

use crate::remote::{Invocation, RemoteExecutor, shell};

use super::{DeployError, Owner};

/// Recursively set `owner` on `path`, then normalize modes.
pub async fn fix_permissions(
    exec: &dyn RemoteExecutor,
    path: &str,
    owner: &Owner,
) -> Result<(), DeployError> {
    let quoted = shell::quote(path);
    let commands = [
        format!(
            "chown -RfHh {} {}",
            shell::quote(&format!("{}:{}", owner.user, owner.group)),
            quoted
        ),
        format!("find {} -type d -exec chmod 0775 {{}} +", quoted),
        format!("find {} -type f -exec chmod 0664 {{}} +", quoted),
    ];

    for command in commands {
        exec.run(&Invocation::new(command).elevated())
            .await
            .map_err(|e| DeployError::Permission {
                host: exec.host().to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            })?;
    }

    Ok(())
}
