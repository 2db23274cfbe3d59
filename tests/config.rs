// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, env var resolution, destination merging and deploy contexts.

use caravel::config::*;
use caravel::error::Error;
use caravel::types::LinkMapping;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const MINIMAL: &str = r#"
application: shop
repository: git@example.com:shop.git
project_root: /var/www/shop
servers:
  - web1.example.com
"#;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.application.as_str(), "shop");
        assert_eq!(config.repository, "git@example.com:shop.git");
        assert_eq!(config.project_root, "/var/www/shop");
        assert_eq!(config.servers.len(), 1);
    }

    #[test]
    fn minimal_config_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.keep_releases, 5);
        assert_eq!(config.sudo, "sudo -n");
        assert_eq!(config.command_timeout, Duration::from_secs(300));
        assert_eq!(config.owner, Owner::default());
        assert_eq!(config.owner.user, "www-data");
        assert!(!config.parallel);
        assert!(!config.stop_on_error);
        assert!(config.shared.is_empty());
        assert!(config.upload.is_empty());
        assert_eq!(config.services, ServicesConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
application: shop
repository: git@example.com:shop.git
project_root: /var/www/shop
releases_path: /data/shop/releases
servers:
  - host: web1.example.com
    key: ~/.ssh/deploy
  - deploy@web2.example.com:2222
keep_releases: 3
shared:
  - .env
  - [wp-content/uploads, uploads]
upload:
  - [dist, public/dist]
services:
  restart: [php8.2-fpm]
  reload: [nginx]
after_deploy:
  - php artisan migrate --force
stop_on_error: true
owner:
  user: deploy
  group: www-data
environment:
  APP_ENV: production
sudo: doas
parallel: true
command_timeout: 2m
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[1].user.as_deref(), Some("deploy"));
        assert_eq!(config.servers[1].port, 2222);
        assert_eq!(config.keep_releases, 3);
        assert_eq!(
            config.shared,
            vec![
                LinkMapping::same(".env").unwrap(),
                LinkMapping::new("wp-content/uploads", "uploads").unwrap(),
            ]
        );
        assert_eq!(config.upload[0].target(), "public/dist");
        assert_eq!(config.services.restart, vec!["php8.2-fpm"]);
        assert_eq!(config.services.reload, vec!["nginx"]);
        assert!(config.stop_on_error);
        assert_eq!(config.owner.user, "deploy");
        assert_eq!(config.sudo, "doas");
        assert!(config.parallel);
        assert_eq!(config.command_timeout, Duration::from_secs(120));
        assert_eq!(config.layout().releases_root(), "/data/shop/releases");
        assert_eq!(config.layout().shared_root(), "/var/www/shop/shared");
    }

    #[test]
    fn parse_local_server() {
        let yaml = r#"
application: shop
repository: /srv/git/shop.git
project_root: /tmp/shop
servers:
  - host: localhost
    local: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.servers[0].local);
    }
}

mod validation {
    use super::*;

    fn with(extra: &str) -> String {
        format!("{MINIMAL}{extra}")
    }

    #[test]
    fn keep_releases_zero_rejected() {
        let err = Config::from_yaml(&with("keep_releases: 0\n")).unwrap_err();
        assert!(err.to_string().contains("keep_releases must be at least 1"));
    }

    #[test]
    fn relative_project_root_rejected() {
        let yaml = MINIMAL.replace("/var/www/shop", "var/www/shop");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn uppercase_application_rejected() {
        let yaml = MINIMAL.replace("application: shop", "application: Shop");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn empty_server_list_rejected() {
        let yaml = r#"
application: shop
repository: git@example.com:shop.git
project_root: /var/www/shop
servers: []
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("at least one server"));
    }

    #[test]
    fn escaping_shared_path_rejected() {
        let err = Config::from_yaml(&with("shared:\n  - ../etc\n")).unwrap_err();
        assert!(err.to_string().contains(".."));
    }

    #[test]
    fn environment_key_with_dash_rejected() {
        let err = Config::from_yaml(&with("environment:\n  APP-ENV: production\n")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("APP-ENV")));
    }

    #[test]
    fn environment_key_with_shell_syntax_rejected() {
        let err = Config::from_yaml(&with("environment:\n  \"X;touch pwned\": \"1\"\n"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn destination_environment_key_rejected() {
        let yaml = with("destinations:\n  staging:\n    environment:\n      1ST: x\n");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("1ST")));
    }

    #[test]
    fn underscore_environment_keys_accepted() {
        let config = Config::from_yaml(&with("environment:\n  _PRIVATE: a\n  APP_ENV2: b\n")).unwrap();
        assert_eq!(config.environment.len(), 2);
    }

    #[test]
    fn service_with_spaces_rejected() {
        let err =
            Config::from_yaml(&with("services:\n  restart: [\"php fpm\"]\n")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}

mod servers {
    use super::*;

    #[test]
    fn parse_host_only() {
        let server = ServerConfig::parse("example.com").unwrap();
        assert_eq!(server.host, "example.com");
        assert_eq!(server.port, 22);
        assert!(server.user.is_none());
    }

    #[test]
    fn parse_user_host_port() {
        let server = ServerConfig::parse("deploy@example.com:2222").unwrap();
        assert_eq!(server.user.as_deref(), Some("deploy"));
        assert_eq!(server.host, "example.com");
        assert_eq!(server.port, 2222);
        assert_eq!(server.rsync_destination(), "deploy@example.com");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(ServerConfig::parse("").is_err());
        assert!(ServerConfig::parse("@example.com").is_err());
        assert!(ServerConfig::parse("example.com:ssh").is_err());
    }
}

mod env_resolution {
    use super::*;

    #[test]
    fn resolves_literals_env_and_defaults() {
        let mut env_map = HashMap::new();
        env_map.insert("KEY".to_string(), EnvValue::Literal("literal".to_string()));
        env_map.insert(
            "FROM_ENV".to_string(),
            EnvValue::FromEnv {
                var: "CARAVEL_TEST_VAR".to_string(),
                default: None,
            },
        );
        env_map.insert(
            "WITH_DEFAULT".to_string(),
            EnvValue::FromEnv {
                var: "CARAVEL_MISSING_VAR".to_string(),
                default: Some("default_value".to_string()),
            },
        );

        temp_env::with_var("CARAVEL_TEST_VAR", Some("from_environment"), || {
            let resolved = resolve_env_map(&env_map).unwrap();

            assert_eq!(resolved.get("KEY"), Some(&"literal".to_string()));
            assert_eq!(
                resolved.get("FROM_ENV"),
                Some(&"from_environment".to_string())
            );
            assert_eq!(
                resolved.get("WITH_DEFAULT"),
                Some(&"default_value".to_string())
            );
        });
    }

    #[test]
    fn missing_env_without_default_fails() {
        let value = EnvValue::FromEnv {
            var: "CARAVEL_UNSET_VAR".to_string(),
            default: None,
        };
        temp_env::with_var_unset("CARAVEL_UNSET_VAR", || {
            assert!(matches!(value.resolve(), Err(Error::MissingEnvVar(v)) if v == "CARAVEL_UNSET_VAR"));
        });
    }

    #[test]
    fn env_reference_parses_from_yaml() {
        let yaml = format!(
            "{MINIMAL}environment:\n  DB_PASSWORD:\n    env: CARAVEL_DB_PASSWORD\n    default: secret\n"
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(
            config.environment.get("DB_PASSWORD"),
            Some(&EnvValue::FromEnv {
                var: "CARAVEL_DB_PASSWORD".to_string(),
                default: Some("secret".to_string()),
            })
        );
    }
}

mod destinations {
    use super::*;

    const WITH_DESTINATIONS: &str = r#"
application: shop
repository: git@example.com:shop.git
project_root: /var/www/shop
servers:
  - web1.example.com
keep_releases: 5
environment:
  APP_ENV: production
  LOG_LEVEL: info
destinations:
  staging:
    servers:
      - staging.example.com
    project_root: /var/www/shop-staging
    keep_releases: 2
    services:
      reload: [nginx]
    environment:
      APP_ENV: staging
"#;

    #[test]
    fn destination_overrides_fields() {
        let config = Config::from_yaml(WITH_DESTINATIONS).unwrap();
        let merged = config.for_destination("staging").unwrap();
        assert_eq!(merged.servers[0].host, "staging.example.com");
        assert_eq!(merged.project_root, "/var/www/shop-staging");
        assert_eq!(merged.keep_releases, 2);
        assert_eq!(merged.services.reload, vec!["nginx"]);
        assert_eq!(merged.layout().current_path(), "/var/www/shop-staging/current");
    }

    #[test]
    fn destination_merges_env() {
        let config = Config::from_yaml(WITH_DESTINATIONS).unwrap();
        let merged = config.for_destination("staging").unwrap();
        assert_eq!(
            merged.environment.get("APP_ENV"),
            Some(&EnvValue::Literal("staging".to_string()))
        );
        assert_eq!(
            merged.environment.get("LOG_LEVEL"),
            Some(&EnvValue::Literal("info".to_string()))
        );
    }

    #[test]
    fn unknown_destination_fails() {
        let config = Config::from_yaml(WITH_DESTINATIONS).unwrap();
        let err = config.for_destination("qa").unwrap_err();
        assert!(matches!(err, Error::UnknownDestination(name) if name == "qa"));
    }
}

mod context {
    use super::*;

    #[test]
    fn deploy_context_carries_settings() {
        let yaml = format!(
            "{MINIMAL}keep_releases: 3\nshared: [.env]\nservices:\n  restart: [php-fpm]\nafter_deploy: [\"make cache\"]\nenvironment:\n  APP_ENV: production\n"
        );
        let config = Config::from_yaml(&yaml).unwrap();
        let ctx = config.deploy_context(Path::new("/home/me/shop")).unwrap();

        assert_eq!(ctx.application.as_str(), "shop");
        assert_eq!(ctx.keep_releases, 3);
        assert_eq!(ctx.layout.releases_root(), "/var/www/shop/releases");
        assert_eq!(ctx.upload_root, Path::new("/home/me/shop"));
        assert_eq!(ctx.shared, vec![LinkMapping::same(".env").unwrap()]);
        assert_eq!(ctx.hooks.restart, vec!["php-fpm"]);
        assert_eq!(ctx.hooks.after_deploy, vec!["make cache"]);
        assert_eq!(
            ctx.hooks.environment.get("APP_ENV").map(String::as_str),
            Some("production")
        );
    }

    #[test]
    fn deploy_context_fails_on_missing_env() {
        let yaml = format!("{MINIMAL}environment:\n  TOKEN:\n    env: CARAVEL_NO_SUCH_TOKEN\n");
        let config = Config::from_yaml(&yaml).unwrap();
        temp_env::with_var_unset("CARAVEL_NO_SUCH_TOKEN", || {
            let err = config.deploy_context(Path::new(".")).unwrap_err();
            assert!(matches!(err, Error::MissingEnvVar(_)));
        });
    }
}
