//! Shared config/credentials file resolution: honors `AWS_PROFILE`, `AWS_CONFIG_FILE`,
//! and `AWS_SHARED_CREDENTIALS_FILE` the way the CLI and other SDKs do, and exposes the
//! merged profile section the credentials and region provider chains consult.

pub mod ini;

use std::env;
use std::path::PathBuf;

use log::trace;

use ini::IniDocument;

/// The active profile name, from `AWS_PROFILE`, defaulting to `"default"`.
pub fn active_profile() -> String {
    env::var("AWS_PROFILE").unwrap_or_else(|_| "default".to_string())
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

pub fn config_file_path() -> PathBuf {
    env::var_os("AWS_CONFIG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().unwrap_or_default().join(".aws").join("config"))
}

pub fn credentials_file_path() -> PathBuf {
    env::var_os("AWS_SHARED_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().unwrap_or_default().join(".aws").join("credentials"))
}

/// Reads and parses a file, returning an empty document if it doesn't exist. Missing
/// shared config files are a normal, common case (explicit env/arg credentials only),
/// not an error.
async fn read_ini(path: &std::path::Path) -> IniDocument {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => IniDocument::parse(&text),
        Err(e) => {
            trace!("no shared config file at {:?}: {}", path, e);
            IniDocument::default()
        }
    }
}

/// Looks up `key` in the active profile's section of the credentials file, falling back
/// to the config file's `[profile <name>]` (or `[default]`) section.
pub async fn lookup(key: &str) -> Option<String> {
    let profile = active_profile();

    let creds = read_ini(&credentials_file_path()).await;
    if let Some(value) = creds.section(&profile).and_then(|s| s.get(key)) {
        return Some(value.to_string());
    }

    let config = read_ini(&config_file_path()).await;
    let section_name = if profile == "default" {
        "default".to_string()
    } else {
        format!("profile {}", profile)
    };
    config.section(&section_name).and_then(|s| s.get(key)).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_yield_no_lookup() {
        std::env::set_var("AWS_CONFIG_FILE", "/nonexistent/config-for-tests");
        std::env::set_var("AWS_SHARED_CREDENTIALS_FILE", "/nonexistent/credentials-for-tests");
        assert_eq!(lookup("region").await, None);
    }
}
