pub mod generate;
pub mod parse;
pub mod types;

use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

pub use parse::{load_config, load_config_from_env, load_config_with, ConfigError, EndpointRequirement};
pub use types::{
    BackpressureStrategy, Config, FileSourceConfig, JournaldConfig, PipelineConfig, ReadStart,
    SenderConfig, SourcesConfig,
};

lazy_static! {
    static ref ENV_VAR: Regex =
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("failed creating regex");
}

/// Expands `$env{VAR_NAME}` references in a string.
/// Unset variables are left unchanged so they can be reported later.
pub fn expand_env_vars(text: &str) -> String {
    ENV_VAR
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// Replaces a leading `~` with the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Per-user config location, also where `config init` writes
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/logship/config.yml"))
}

/// Resolves the config file path. Returns the first of:
/// 1. Explicit path (with tilde expansion)
/// 2. ~/.config/logship/config.yml
/// 3. /etc/logship/config.yml
///
/// `None` means the agent runs from environment variables alone.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/logship/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_single() {
        std::env::set_var("LOGSHIP_TEST_EXPAND_ONE", "test_value");
        let result = expand_env_vars("path/$env{LOGSHIP_TEST_EXPAND_ONE}/file");
        assert_eq!(result, "path/test_value/file");
        std::env::remove_var("LOGSHIP_TEST_EXPAND_ONE");
    }

    #[test]
    fn test_expand_env_vars_partial() {
        std::env::set_var("LOGSHIP_TEST_EXPAND_SET", "exists");
        let result = expand_env_vars("$env{LOGSHIP_TEST_EXPAND_SET}/$env{LOGSHIP_TEST_EXPAND_UNSET}");
        assert_eq!(result, "exists/$env{LOGSHIP_TEST_EXPAND_UNSET}");
        std::env::remove_var("LOGSHIP_TEST_EXPAND_SET");
    }

    #[test]
    fn test_expand_env_vars_ignores_shell_syntax() {
        assert_eq!(expand_env_vars("${HOME}:$PATH"), "${HOME}:$PATH");
    }

    #[test]
    fn test_expand_tilde_with_path() {
        let expanded = expand_tilde(Path::new("~/logs/app.log"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("logs/app.log"));
        }
    }

    #[test]
    fn test_expand_tilde_no_expansion() {
        assert_eq!(expand_tilde(Path::new("/var/log/syslog")), Path::new("/var/log/syslog"));
        assert_eq!(expand_tilde(Path::new("relative/path")), Path::new("relative/path"));
    }

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(
            resolve_config_path(Some(Path::new("/tmp/custom.yml"))),
            Some(PathBuf::from("/tmp/custom.yml"))
        );
    }
}
