//! Bot token resolution.
//!
//! Priority: explicit `--token`, then `TG_BOT_TOKEN`, then the config file
//! (`~/.tgbot-cli/config.json` unless `--config` points elsewhere).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable consulted when no explicit token is given.
pub const TOKEN_ENV: &str = "TG_BOT_TOKEN";

/// Inputs for token resolution. Empty strings count as unset.
#[derive(Debug, Clone, Default)]
pub struct TokenOptions {
    pub token: Option<String>,
    pub config_path: Option<PathBuf>,
    pub profile: Option<String>,
}

/// Structured config file.
#[derive(Deserialize, Debug, Default)]
struct FileConfig {
    #[serde(default)]
    active_profile: String,
    #[serde(default)]
    profiles: HashMap<String, ProfileConfig>,
}

#[derive(Deserialize, Debug, Default)]
struct ProfileConfig {
    #[serde(default)]
    token: String,
}

/// Get the default config file path (~/.tgbot-cli/config.json).
pub fn default_config_path() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::config("resolve home dir: could not determine home directory"))?;

    Ok(home.home_dir().join(".tgbot-cli").join("config.json"))
}

/// Resolve the bot token, reading `TG_BOT_TOKEN` from the process environment.
pub fn resolve_token(opts: &TokenOptions) -> Result<String> {
    resolve_token_with_env(opts, std::env::var(TOKEN_ENV).ok())
}

/// Resolve the bot token with the environment value supplied by the caller.
pub fn resolve_token_with_env(opts: &TokenOptions, env_token: Option<String>) -> Result<String> {
    if let Some(token) = non_empty(opts.token.as_deref()) {
        return Ok(token.to_string());
    }

    if let Some(token) = non_empty(env_token.as_deref()) {
        tracing::debug!("Using token from {}", TOKEN_ENV);
        return Ok(token.to_string());
    }

    let path = match &opts.config_path {
        Some(path) if !path.as_os_str().is_empty() => path.clone(),
        _ => default_config_path()?,
    };

    token_from_file(&path, non_empty(opts.profile.as_deref()))
}

fn token_from_file(path: &Path, profile: Option<&str>) -> Result<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::config(format!(
                "token not found: use --token / {} / {}",
                TOKEN_ENV,
                path.display()
            )));
        }
        Err(e) => return Err(Error::config(format!("read config: {}", e))),
    };

    let content = String::from_utf8_lossy(&bytes);
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::config("config is empty"));
    }

    // Anything that is not a JSON object is the token itself.
    if !trimmed.starts_with('{') {
        tracing::debug!("Using raw token text from {}", path.display());
        return Ok(trimmed.to_string());
    }

    let config: FileConfig = serde_json::from_str(trimmed)
        .map_err(|e| Error::config(format!("parse config json: {}", e)))?;

    let profile = match profile {
        Some(p) => p,
        None if !config.active_profile.is_empty() => config.active_profile.as_str(),
        None => {
            return Err(Error::config(
                "no profile specified and active_profile is empty",
            ))
        }
    };

    let entry = config
        .profiles
        .get(profile)
        .ok_or_else(|| Error::config(format!("profile {:?} not found", profile)))?;

    if entry.token.is_empty() {
        return Err(Error::config(format!("profile {:?} has empty token", profile)));
    }

    tracing::debug!("Using token from profile {:?} in {}", profile, path.display());
    Ok(entry.token.clone())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn file_opts(path: PathBuf) -> TokenOptions {
        TokenOptions {
            config_path: Some(path),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_token_wins_over_env() {
        let opts = TokenOptions {
            token: Some("flag-token".to_string()),
            ..Default::default()
        };
        let token = resolve_token_with_env(&opts, Some("env-token".to_string())).unwrap();
        assert_eq!(token, "flag-token");
    }

    #[test]
    fn test_env_token_used_without_flag() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "file-token");
        let token = resolve_token_with_env(&file_opts(path), Some("env-token".to_string())).unwrap();
        assert_eq!(token, "env-token");
    }

    #[test]
    fn test_empty_flag_falls_through_to_env() {
        let opts = TokenOptions {
            token: Some(String::new()),
            ..Default::default()
        };
        let token = resolve_token_with_env(&opts, Some("env-token".to_string())).unwrap();
        assert_eq!(token, "env-token");
    }

    #[test]
    fn test_raw_file_token_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "raw-file-token\n");
        let token = resolve_token_with_env(&file_opts(path), None).unwrap();
        assert_eq!(token, "raw-file-token");
    }

    #[test]
    fn test_raw_file_with_invalid_utf8_is_read_lossily() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"123:abc\xff\n").unwrap();
        let token = resolve_token_with_env(&file_opts(path), None).unwrap();
        assert_eq!(token, "123:abc\u{fffd}");
    }

    #[test]
    fn test_json_active_profile() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"active_profile":"dev","profiles":{"dev":{"token":"json-token"}}}"#,
        );
        let token = resolve_token_with_env(&file_opts(path), Some(String::new())).unwrap();
        assert_eq!(token, "json-token");
    }

    #[test]
    fn test_json_explicit_profile_overrides_active() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"active_profile":"dev","profiles":{"dev":{"token":"dev-token"},"prod":{"token":"prod-token"}}}"#,
        );
        let opts = TokenOptions {
            config_path: Some(path),
            profile: Some("prod".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_token_with_env(&opts, None).unwrap(), "prod-token");
    }

    #[test]
    fn test_json_without_any_profile() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"profiles":{"dev":{"token":"x"}}}"#);
        let err = resolve_token_with_env(&file_opts(path), None).unwrap_err();
        assert!(err.to_string().contains("active_profile is empty"));
    }

    #[test]
    fn test_json_unknown_profile() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"active_profile":"qa","profiles":{}}"#);
        let err = resolve_token_with_env(&file_opts(path), None).unwrap_err();
        assert!(err.to_string().contains(r#"profile "qa" not found"#));
    }

    #[test]
    fn test_json_empty_profile_token() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"active_profile":"dev","profiles":{"dev":{"token":""}}}"#);
        let err = resolve_token_with_env(&file_opts(path), None).unwrap_err();
        assert!(err.to_string().contains(r#"profile "dev" has empty token"#));
    }

    #[test]
    fn test_whitespace_only_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "  \n\t");
        let err = resolve_token_with_env(&file_opts(path), None).unwrap_err();
        assert_eq!(err.to_string(), "config is empty");
    }

    #[test]
    fn test_missing_file_names_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        let err = resolve_token_with_env(&file_opts(path), None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("TG_BOT_TOKEN"));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_malformed_json_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{\"active_profile\":");
        let err = resolve_token_with_env(&file_opts(path), None).unwrap_err();
        assert!(err.to_string().starts_with("parse config json"));
    }
}
