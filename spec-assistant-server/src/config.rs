use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_EXPORT_KEYS: usize = 1000;
pub const DEFAULT_WORKSHEET_NAME: &str = "Extracted Keys";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Directory for the extraction history database.
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Exports with more keys than this are refused.
    pub max_export_keys: usize,
    pub worksheet_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            state_dir: PathBuf::from("."),
            max_export_keys: DEFAULT_MAX_EXPORT_KEYS,
            worksheet_name: DEFAULT_WORKSHEET_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| non_blank(lookup(name));

        let port = var("PORT")
            .map(|v| v.trim().parse::<u16>())
            .transpose()
            .context("PORT must be a valid number")?
            .unwrap_or(DEFAULT_PORT);

        let state_dir = var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let max_export_keys = var("MAX_EXPORT_KEYS")
            .map(|v| v.trim().parse::<usize>())
            .transpose()
            .context("MAX_EXPORT_KEYS must be a valid number")?
            .unwrap_or(DEFAULT_MAX_EXPORT_KEYS);

        let worksheet_name = var("WORKSHEET_NAME")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_WORKSHEET_NAME.to_string());
        validate_worksheet_name(&worksheet_name)?;

        Ok(Config {
            port,
            state_dir,
            max_export_keys,
            worksheet_name,
        })
    }
}

/// Treat missing, empty and whitespace-only values as unset.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Excel sheet names are at most 31 characters and exclude `[]:*?/\`.
fn validate_worksheet_name(name: &str) -> Result<()> {
    if name.chars().count() > 31 {
        anyhow::bail!("WORKSHEET_NAME must be at most 31 characters, got {:?}", name);
    }
    if let Some(c) = name.chars().find(|c| "[]:*?/\\".contains(*c)) {
        anyhow::bail!("WORKSHEET_NAME must not contain {:?}", c);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.state_dir, PathBuf::from("."));
        assert_eq!(config.max_export_keys, 1000);
        assert_eq!(config.worksheet_name, "Extracted Keys");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("STATE_DIR", "/var/lib/spec-assistant"),
            ("MAX_EXPORT_KEYS", "50"),
            ("WORKSHEET_NAME", "Review"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/spec-assistant"));
        assert_eq!(config.max_export_keys, 50);
        assert_eq!(config.worksheet_name, "Review");
    }

    #[test]
    fn test_whitespace_only_is_unset() {
        let config = config_from(&[("PORT", "  "), ("WORKSHEET_NAME", "\t")]).unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.worksheet_name, "Extracted Keys");
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_invalid_worksheet_name_is_an_error() {
        assert!(config_from(&[("WORKSHEET_NAME", "Keys/Values")]).is_err());
        assert!(config_from(&[("WORKSHEET_NAME", &"x".repeat(32))]).is_err());
    }
}
