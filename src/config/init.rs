// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented caravel.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::AppName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(
    dir: &Path,
    application: Option<&str>,
    repository: Option<&str>,
    force: bool,
) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(name) = application {
        config.application = AppName::new(name).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.project_root = format!("/var/www/{}", config.application);
    }

    if let Some(repo) = repository {
        config.repository = repo.to_string();
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(config_path)
}

fn generate_template_yaml(config: &Config) -> String {
    let first_server = config.servers.first();
    format!(
        r#"application: {}
repository: {}
project_root: {}
servers:
  - host: {}
    port: {}
    user: {}
keep_releases: {}

# Paths inside each release linked into {}/shared
shared:
  - .env
  # - [wp-content/uploads, uploads]

# Local paths copied into each release after cloning
upload: []
  # - [dist, public/dist]

services:
  restart: []
  reload: []
  # reload: [nginx]

# Run inside the new release after services restart; failures are reported, not fatal
after_deploy: []

owner:
  user: {}
  group: {}
"#,
        config.application,
        config.repository,
        config.project_root,
        first_server.host,
        first_server.port,
        first_server.user.as_deref().unwrap_or("deploy"),
        config.keep_releases,
        config.project_root,
        config.owner.user,
        config.owner.group,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_yaml_parses_back() {
        let yaml = generate_template_yaml(&Config::template());
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.application.as_str(), "my-app");
        assert_eq!(config.shared.len(), 1);
        assert!(config.upload.is_empty());
    }

    #[test]
    fn init_uses_application_for_project_root() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), Some("shop"), Some("git@example.com:shop.git"), false).unwrap();

        let config = Config::load(&dir.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config.application.as_str(), "shop");
        assert_eq!(config.project_root, "/var/www/shop");
        assert_eq!(config.repository, "git@example.com:shop.git");
    }
}
