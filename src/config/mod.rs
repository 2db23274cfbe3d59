// ABOUTME: Configuration types and parsing for caravel.yml.
// ABOUTME: Handles YAML parsing, load-time validation, and destination merging.

mod deserialize;
mod env_value;
mod init;
mod server;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;
pub use server::ServerConfig;

use crate::error::{Error, Result};
use crate::hooks::HookSettings;
use crate::release::{DeployContext, ReleaseLayout};
use crate::types::{AppName, LinkMapping};
use deserialize::{
    deserialize_keep_releases, deserialize_keep_releases_option,
    deserialize_servers, deserialize_servers_option,
};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "caravel.yml";
pub const CONFIG_FILENAME_ALT: &str = "caravel.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".caravel/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub application: AppName,

    /// Clone URL the remote hosts fetch release tags from.
    pub repository: String,

    /// Absolute directory holding `releases/`, `shared/` and `current`.
    pub project_root: String,

    #[serde(default)]
    pub releases_path: Option<String>,

    #[serde(default)]
    pub shared_path: Option<String>,

    #[serde(default)]
    pub current_path: Option<String>,

    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: NonEmpty<ServerConfig>,

    #[serde(
        default = "default_keep_releases",
        deserialize_with = "deserialize_keep_releases"
    )]
    pub keep_releases: usize,

    #[serde(default)]
    pub shared: Vec<LinkMapping>,

    #[serde(default)]
    pub upload: Vec<LinkMapping>,

    #[serde(default)]
    pub services: ServicesConfig,

    #[serde(default)]
    pub after_deploy: Vec<String>,

    #[serde(default)]
    pub stop_on_error: bool,

    #[serde(default)]
    pub owner: Owner,

    #[serde(default)]
    pub environment: HashMap<String, EnvValue>,

    #[serde(default = "default_sudo")]
    pub sudo: String,

    #[serde(default)]
    pub parallel: bool,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,

    #[serde(default)]
    pub destinations: HashMap<String, Destination>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Destination {
    #[serde(default, deserialize_with = "deserialize_servers_option")]
    pub servers: Option<NonEmpty<ServerConfig>>,

    #[serde(default)]
    pub project_root: Option<String>,

    #[serde(default, deserialize_with = "deserialize_keep_releases_option")]
    pub keep_releases: Option<usize>,

    #[serde(default)]
    pub services: Option<ServicesConfig>,

    #[serde(default)]
    pub after_deploy: Option<Vec<String>>,

    #[serde(default)]
    pub owner: Option<Owner>,

    #[serde(default)]
    pub environment: HashMap<String, EnvValue>,
}

/// Services touched after every deploy, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub restart: Vec<String>,
    #[serde(default)]
    pub reload: Vec<String>,
}

/// Ownership applied recursively to each release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Owner {
    #[serde(default = "default_owner")]
    pub user: String,
    #[serde(default = "default_owner")]
    pub group: String,
}

impl Default for Owner {
    fn default() -> Self {
        Self {
            user: default_owner(),
            group: default_owner(),
        }
    }
}

fn default_owner() -> String {
    "www-data".to_string()
}

/// Names the shell accepts after `export`: `[A-Za-z_][A-Za-z0-9_]*`.
fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn default_keep_releases() -> usize {
    5
}

fn default_sudo() -> String {
    "sudo -n".to_string()
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Checks that serde cannot express on its own.
    fn validate(&self) -> Result<()> {
        let paths = [
            Some(&self.project_root),
            self.releases_path.as_ref(),
            self.shared_path.as_ref(),
            self.current_path.as_ref(),
        ];
        for path in paths.into_iter().flatten() {
            if !path.starts_with('/') {
                return Err(Error::InvalidConfig(format!(
                    "paths must be absolute: {}",
                    path
                )));
            }
        }

        if self.repository.trim().is_empty() {
            return Err(Error::InvalidConfig("repository cannot be empty".to_string()));
        }

        let mut services = self.services.restart.iter().chain(&self.services.reload);
        if let Some(bad) = services.find(|s| s.trim().is_empty() || s.contains(char::is_whitespace)) {
            return Err(Error::InvalidConfig(format!(
                "invalid service name: {:?}",
                bad
            )));
        }

        let destination_env = self.destinations.values().flat_map(|d| d.environment.keys());
        if let Some(bad) = self
            .environment
            .keys()
            .chain(destination_env)
            .find(|k| !is_env_name(k))
        {
            return Err(Error::InvalidConfig(format!(
                "invalid environment variable name: {:?}",
                bad
            )));
        }

        if self.owner.user.trim().is_empty() || self.owner.group.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "owner user and group cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn for_destination(&self, name: &str) -> Result<Config> {
        let dest = self
            .destinations
            .get(name)
            .ok_or_else(|| Error::UnknownDestination(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref servers) = dest.servers {
            merged.servers = servers.clone();
        }

        if let Some(ref root) = dest.project_root {
            merged.project_root = root.clone();
        }

        if let Some(keep) = dest.keep_releases {
            merged.keep_releases = keep;
        }

        if let Some(ref services) = dest.services {
            merged.services = services.clone();
        }

        if let Some(ref commands) = dest.after_deploy {
            merged.after_deploy = commands.clone();
        }

        if let Some(ref owner) = dest.owner {
            merged.owner = owner.clone();
        }

        // Deep merge environment
        for (k, v) in &dest.environment {
            merged.environment.insert(k.clone(), v.clone());
        }

        merged.validate()?;
        Ok(merged)
    }

    /// Remote directory layout derived from `project_root` and overrides.
    pub fn layout(&self) -> ReleaseLayout {
        let defaults = ReleaseLayout::under(&self.project_root);
        ReleaseLayout::new(
            &self.project_root,
            self.releases_path.as_deref().unwrap_or(defaults.releases_root()),
            self.shared_path.as_deref().unwrap_or(defaults.shared_root()),
            self.current_path.as_deref().unwrap_or(defaults.current_path()),
        )
    }

    /// Build the context every deploy component receives.
    ///
    /// `local_root` is the directory upload sources are resolved against.
    /// Environment references are resolved here, once per deploy.
    pub fn deploy_context(&self, local_root: &Path) -> Result<DeployContext> {
        Ok(DeployContext {
            application: self.application.clone(),
            repository: self.repository.clone(),
            layout: self.layout(),
            shared: self.shared.clone(),
            uploads: self.upload.clone(),
            upload_root: local_root.to_path_buf(),
            keep_releases: self.keep_releases,
            hooks: HookSettings {
                restart: self.services.restart.clone(),
                reload: self.services.reload.clone(),
                after_deploy: self.after_deploy.clone(),
                stop_on_error: self.stop_on_error,
                environment: resolve_env_map(&self.environment)?,
            },
            owner: self.owner.clone(),
        })
    }

    pub fn template() -> Self {
        Config {
            application: AppName::new("my-app").expect("template name is valid"),
            repository: "git@github.com:example/my-app.git".to_string(),
            project_root: "/var/www/my-app".to_string(),
            releases_path: None,
            shared_path: None,
            current_path: None,
            servers: NonEmpty::new(ServerConfig {
                host: "server.example.com".to_string(),
                port: 22,
                user: Some("deploy".to_string()),
                key: None,
                trust_first_connection: true,
                local: false,
            }),
            keep_releases: default_keep_releases(),
            shared: vec![],
            upload: vec![],
            services: ServicesConfig::default(),
            after_deploy: vec![],
            stop_on_error: false,
            owner: Owner::default(),
            environment: HashMap::new(),
            sudo: default_sudo(),
            parallel: false,
            command_timeout: default_command_timeout(),
            destinations: HashMap::new(),
        }
    }
}
