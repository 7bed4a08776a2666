mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./hlsforge.toml",
        "~/.config/hlsforge/config.toml",
        "/etc/hlsforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.parser.initial_read_size == 0 {
        anyhow::bail!("parser.initial_read_size must be greater than 0");
    }
    if config.parser.max_buffer_size < config.parser.initial_read_size {
        anyhow::bail!(
            "parser.max_buffer_size ({}) is smaller than parser.initial_read_size ({})",
            config.parser.max_buffer_size,
            config.parser.initial_read_size
        );
    }

    validate_muxer("hls_muxer", &config.hls_muxer)?;

    for id in config.applications.keys() {
        let Some(app) = config.application(id) else {
            continue;
        };
        if app.origin_path.is_empty() {
            anyhow::bail!("Application '{}' has no origin_path", id);
        }
        validate_muxer(&format!("applications.{id}.hls_muxer"), &app.hls_muxer)?;

        if let Some(dir) = app.origin_dir() {
            if !dir.exists() {
                tracing::warn!("Origin path of application '{}' does not exist: {:?}", id, dir);
            }
        }
    }

    Ok(())
}

fn validate_muxer(section: &str, muxer: &HlsMuxerConfig) -> Result<()> {
    if muxer.segment_length == 0 {
        anyhow::bail!("{section}.segment_length must be greater than 0");
    }
    if !(0.0..1.0).contains(&muxer.tolerance) {
        anyhow::bail!(
            "{section}.tolerance must be in [0, 1), got {}",
            muxer.tolerance
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate_config(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.parser.cache_ttl_secs, 86_400);
        assert_eq!(config.parser.initial_read_size, 200 * 1024);
        assert_eq!(config.parser.max_buffer_size, 16 * 1024 * 1024);
        assert_eq!(config.hls_muxer.segment_length, 10_000);

        let app = config.application("hls").unwrap();
        assert_eq!(app.origin_path, "./media");
        assert!(!app.is_remote());
        assert!(config.application("vod").is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert!(config.applications.contains_key("hls"));
        assert!(config.server.cors);
    }

    #[test]
    fn test_application_overrides_merge_over_global() {
        let config = parse(
            r#"
            [hls_muxer]
            segment_length = 6000
            absolute_base_url = "https://cdn.example.com/"
            absolute_segment_urls = true

            [applications.vod]
            origin_path = "https://origin.example.com/media"

            [applications.vod.hls_muxer]
            segment_length = 4000
            absolute_index_urls = true
            "#,
        )
        .unwrap();

        let app = config.application("vod").unwrap();
        assert!(app.is_remote());
        assert_eq!(app.origin_dir(), None);
        assert_eq!(app.hls_muxer.segment_length, 4000);
        assert_eq!(app.hls_muxer.tolerance, 0.05);
        assert!(app.hls_muxer.absolute_index_urls);
        assert!(app.hls_muxer.absolute_segment_urls);
        assert_eq!(
            app.hls_muxer.absolute_base_url.as_deref(),
            Some("https://cdn.example.com/")
        );

        // Declaring applications replaces the default set
        assert!(config.application("hls").is_none());
    }

    #[test]
    fn test_validation_errors() {
        assert!(parse("[server]\nport = 0").is_err());
        assert!(parse("[parser]\ninitial_read_size = 0").is_err());
        assert!(parse("[parser]\ninitial_read_size = 4096\nmax_buffer_size = 1024").is_err());
        assert!(parse("[hls_muxer]\ntolerance = 1.5").is_err());
        assert!(parse(
            r#"
            [applications.bad]
            origin_path = "/srv"
            [applications.bad.hls_muxer]
            segment_length = 0
            "#
        )
        .is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debug = true\n[server]\nport = 9000").unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(config.debug);
        assert_eq!(config.server.port, 9000);

        let explicit = load_config_or_default(Some(file.path())).unwrap();
        assert_eq!(explicit.server.port, 9000);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = load_config(Path::new("/nonexistent/hlsforge.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
