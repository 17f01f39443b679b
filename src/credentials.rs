//! API credential storage.
//!
//! The key lives in the `GOOGLE_API_KEY` environment variable or as a single
//! `GOOGLE_API_KEY=<key>` line in a local env file. The environment wins.

use std::path::Path;

use crate::core::{Error, Result};

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Resolve the API key: environment first, then the env file.
pub fn load_api_key(env_file: &Path) -> Result<String> {
    if let Ok(key) = std::env::var(API_KEY_VAR) {
        let key = key.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    read_env_file(env_file)?.ok_or(Error::MissingApiKey)
}

/// Read the key line from an env file. A missing file is not an error.
pub fn read_env_file(env_file: &Path) -> Result<Option<String>> {
    let contents = match std::fs::read_to_string(env_file) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(contents.lines().find_map(parse_key_line))
}

fn parse_key_line(line: &str) -> Option<String> {
    let line = line.trim();
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (name, value) = line.split_once('=')?;
    if name.trim() != API_KEY_VAR {
        return None;
    }
    let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Overwrite the env file with a single key line.
pub fn save_api_key(env_file: &Path, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::EmptyApiKey);
    }
    if let Some(parent) = env_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(env_file, format!("{}={}\n", API_KEY_VAR, key))?;
    log::info!("API key saved to {}", env_file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_read() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let env_file = temp_dir.path().join(".env");
        save_api_key(&env_file, "  abc123 ").unwrap();

        assert_eq!(
            std::fs::read_to_string(&env_file).unwrap(),
            "GOOGLE_API_KEY=abc123\n"
        );
        assert_eq!(read_env_file(&env_file).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let env_file = temp_dir.path().join(".env");
        assert!(matches!(save_api_key(&env_file, "   "), Err(Error::EmptyApiKey)));
        assert!(!env_file.exists());
    }

    #[test]
    fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        assert!(read_env_file(&temp_dir.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn test_parse_key_line_variants() {
        assert_eq!(parse_key_line("GOOGLE_API_KEY=k1").as_deref(), Some("k1"));
        assert_eq!(parse_key_line("export GOOGLE_API_KEY=\"k2\"").as_deref(), Some("k2"));
        assert_eq!(parse_key_line("OTHER=x"), None);
        assert_eq!(parse_key_line("GOOGLE_API_KEY="), None);
        assert_eq!(parse_key_line("# comment"), None);
    }
}
