use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const ENV_ENDPOINT: &str = "LOGSHIP_ENDPOINT";
pub const ENV_API_KEY: &str = "LOGSHIP_API_KEY";
pub const ENV_API_SECRET: &str = "LOGSHIP_API_SECRET";
pub const ENV_IGNORED_SOURCES: &str = "LOGSHIP_IGNORED_SOURCES";

lazy_static! {
    static ref UNEXPANDED_VAR: Regex =
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("failed creating regex");
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Whether validation insists on a collector endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRequirement {
    Required,
    /// Dry runs print entries instead of sending them
    Optional,
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with(path, EndpointRequirement::Required)
}

pub fn load_config_with(path: &Path, endpoint: EndpointRequirement) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut config = parse_config(&yaml_string)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config, endpoint)?;

    Ok(config)
}

/// Build a config from `LOGSHIP_*` environment variables alone
pub fn load_config_from_env(endpoint: EndpointRequirement) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config, endpoint)?;
    Ok(config)
}

/// Expand `$env{VAR}` references, parse the YAML and expand `~` in paths.
/// Does not validate.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;
    for source in config.sources.files.values_mut() {
        source.path = expand_tilde(&source.path);
    }
    Ok(config)
}

/// Comment lines are not config; references in them are ignored
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded: Vec<String> = yaml_string
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(|line| UNEXPANDED_VAR.captures_iter(line))
        .map(|cap| cap[1].to_string())
        .collect();

    if unexpanded.is_empty() {
        return Ok(());
    }

    unexpanded.sort();
    unexpanded.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}\n\
         \n\
         Either export them or replace the $env{{...}} references in the config file",
        unexpanded.join(", ")
    )))
}

/// Non-empty `LOGSHIP_*` variables take precedence over file values
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(endpoint) = lookup(ENV_ENDPOINT) {
        config.sender.endpoint = endpoint;
    }
    if let Some(key) = lookup(ENV_API_KEY) {
        config.sender.api_key = key;
    }
    if let Some(secret) = lookup(ENV_API_SECRET) {
        config.sender.api_secret = secret;
    }
    if let Some(ignored) = lookup(ENV_IGNORED_SOURCES) {
        config.sources.ignored = parse_comma_list(&ignored);
    }
}

fn parse_comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn validate_config(config: &Config, endpoint: EndpointRequirement) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if endpoint == EndpointRequirement::Required && config.sender.endpoint.trim().is_empty() {
        errors.push(format!(
            "sender.endpoint is required (or set {})",
            ENV_ENDPOINT
        ));
    }

    if config.pipeline.dedup_ttl.is_zero() {
        errors.push("pipeline.dedup_ttl must be greater than zero".to_string());
    }

    if config.pipeline.queue_capacity == 0 {
        errors.push("pipeline.queue_capacity must be greater than zero".to_string());
    }

    let mut file_ids: Vec<&String> = config.sources.files.keys().collect();
    file_ids.sort();
    for id in file_ids {
        let source = &config.sources.files[id];
        if source.path.as_os_str().is_empty() {
            errors.push(format!("sources.files.{}: path must not be empty", id));
        }
        if config.sources.ignored.contains(id) {
            tracing::warn!(source_id = %id, "File source is configured but also ignored");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_parse_minimal() {
        let config = parse_config("sender:\n  endpoint: http://collector/logs\n").unwrap();
        assert_eq!(config.sender.endpoint, "http://collector/logs");
        assert!(validate_config(&config, EndpointRequirement::Required).is_ok());
    }

    #[test]
    fn test_unset_env_var_is_error() {
        let result = parse_config("sender:\n  api_key: $env{LOGSHIP_TEST_SURELY_UNSET_VAR}\n");
        match result {
            Err(ConfigError::Validation(msg)) => {
                assert!(msg.contains("LOGSHIP_TEST_SURELY_UNSET_VAR"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unset_env_var_in_comment_is_ignored() {
        let yaml = "# set $env{LOGSHIP_TEST_COMMENTED_VAR} to override\n\
                    sender:\n  endpoint: http://collector/logs\n";
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.sender.endpoint, "http://collector/logs");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_ENDPOINT, "https://override/ingest"),
            (ENV_API_KEY, "k"),
            (ENV_API_SECRET, ""),
            (ENV_IGNORED_SOURCES, "kube-system, , sidecar"),
        ]);
        let mut config = parse_config("sender:\n  endpoint: http://file\n  api_secret: s\n").unwrap();

        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.sender.endpoint, "https://override/ingest");
        assert_eq!(config.sender.api_key, "k");
        // Empty variables do not clobber file values
        assert_eq!(config.sender.api_secret, "s");
        assert_eq!(config.sources.ignored, vec!["kube-system", "sidecar"]);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.pipeline.dedup_ttl = Duration::ZERO;
        config.pipeline.queue_capacity = 0;

        match validate_config(&config, EndpointRequirement::Required) {
            Err(ConfigError::ValidationList(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation list, got {:?}", other),
        }
    }

    #[test]
    fn test_dry_run_does_not_need_endpoint() {
        let config = Config::default();
        assert!(validate_config(&config, EndpointRequirement::Optional).is_ok());
        assert!(validate_config(&config, EndpointRequirement::Required).is_err());
    }
}
