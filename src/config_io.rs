use std::io::Read;
use std::path::Path;

use crate::{EngineConfig, Error, Result};

const DEFAULT_MAX_CONFIG_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

pub fn parse_config(raw: &str, format: ConfigFormat) -> Result<EngineConfig> {
    match format {
        ConfigFormat::Json => serde_json::from_str(raw)
            .map_err(|err| Error::InvalidConfig(format!("invalid json config: {err}"))),
        ConfigFormat::Toml => toml::from_str(raw)
            .map_err(|err| Error::InvalidConfig(format!("invalid toml config: {err}"))),
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
    load_config_limited(path, DEFAULT_MAX_CONFIG_BYTES)
}

/// Load and validate an engine config file with a byte limit.
///
/// Format detection is by file extension:
/// - `.json` => JSON
/// - `.toml` or no extension => TOML
pub fn load_config_limited(path: impl AsRef<Path>, max_bytes: u64) -> Result<EngineConfig> {
    if max_bytes == 0 {
        return Err(Error::InvalidConfig("max config bytes must be > 0".to_string()));
    }

    let path = path.as_ref();
    let meta = std::fs::metadata(path).map_err(|err| Error::io_path("metadata", path, err))?;
    if !meta.is_file() {
        return Err(Error::InvalidConfig(format!(
            "config path {} is not a regular file",
            path.display()
        )));
    }

    let limit = max_bytes.saturating_add(1);
    let mut bytes = Vec::<u8>::new();
    std::fs::File::open(path)
        .map_err(|err| Error::io_path("open", path, err))?
        .take(limit)
        .read_to_end(&mut bytes)
        .map_err(|err| Error::io_path("read", path, err))?;

    if bytes.len() as u64 > max_bytes {
        return Err(Error::InvalidConfig(format!(
            "config file {} is larger than {max_bytes} bytes",
            path.display()
        )));
    }

    let raw = std::str::from_utf8(&bytes).map_err(|_| {
        Error::InvalidConfig(format!("config file {} is not valid UTF-8", path.display()))
    })?;
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => ConfigFormat::Json,
        Some("toml") | None => ConfigFormat::Toml,
        Some(other) => {
            return Err(Error::InvalidConfig(format!(
                "unsupported config format {other:?}; expected .toml or .json"
            )));
        }
    };
    let config = parse_config(raw, format)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_with_partial_limits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.toml");
        let root = dir.path().display().to_string().replace('\\', "\\\\");
        std::fs::write(
            &path,
            format!(
                "root = \"{root}\"\n\n\
                 [limits]\nmax_list_entries = 20\n\n\
                 [ignore]\nextra_patterns = [\"*.log\"]\n"
            ),
        )
        .expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.limits.max_list_entries, 20);
        assert_eq!(config.limits.max_search_matches, 100);
        assert_eq!(config.ignore.extra_patterns, vec!["*.log".to_string()]);
        assert!(config.ignore.use_defaults);
    }

    #[test]
    fn loads_json_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.json");
        let raw = serde_json::json!({ "root": dir.path() }).to_string();
        std::fs::write(&path, raw).expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "root: /tmp\n").expect("write");

        let err = load_config(&path).expect_err("should reject");
        assert!(matches!(err, Error::InvalidConfig(_)), "{err:?}");
    }

    #[test]
    fn rejects_oversized_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "#".repeat(64)).expect("write");

        let err = load_config_limited(&path, 16).expect_err("should reject");
        assert!(err.to_string().contains("larger than 16 bytes"));
    }
}
