use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub parser: ParserConfig,

    /// Muxer defaults shared by every application.
    #[serde(default)]
    pub hls_muxer: HlsMuxerConfig,

    #[serde(default = "default_applications")]
    pub applications: HashMap<String, ApplicationConfig>,

    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            parser: ParserConfig::default(),
            hls_muxer: HlsMuxerConfig::default(),
            applications: default_applications(),
            debug: false,
        }
    }
}

impl Config {
    /// Resolve an application by id, merging its muxer overrides over the
    /// global `[hls_muxer]` section.
    pub fn application(&self, id: &str) -> Option<Application> {
        let app = self.applications.get(id)?;
        Some(Application {
            id: id.to_string(),
            origin_path: app.origin_path.clone(),
            hls_muxer: app.hls_muxer.merged_over(&self.hls_muxer),
        })
    }
}

fn default_applications() -> HashMap<String, ApplicationConfig> {
    HashMap::from([(
        "hls".to_string(),
        ApplicationConfig {
            origin_path: "./media".to_string(),
            hls_muxer: HlsMuxerOverrides::default(),
        },
    )])
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Send permissive CORS headers
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Gzip playlists and JSON for clients that accept it
    #[serde(default)]
    pub gzip: bool,

    #[serde(default)]
    pub cache_control: CacheControlConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: true,
            gzip: false,
            cache_control: CacheControlConfig::default(),
        }
    }
}

/// `Cache-Control: max-age` values in seconds. Unset means no header.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheControlConfig {
    #[serde(default)]
    pub playlist_max_age: Option<u64>,

    #[serde(default)]
    pub segment_max_age: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserConfig {
    /// Lifetime of cached source metadata
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// First read size when looking for the moov box (bytes)
    #[serde(default = "default_initial_read_size")]
    pub initial_read_size: usize,

    /// Largest read before giving up on finding the moov box (bytes)
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,

    /// Timeout of a single remote range request
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
}

fn default_cache_ttl() -> u64 {
    86_400
}
fn default_cache_max_entries() -> usize {
    1024
}
fn default_initial_read_size() -> usize {
    200 * 1024
}
fn default_max_buffer_size() -> usize {
    16 * 1024 * 1024
}
fn default_remote_timeout() -> u64 {
    5
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            cache_max_entries: default_cache_max_entries(),
            initial_read_size: default_initial_read_size(),
            max_buffer_size: default_max_buffer_size(),
            remote_timeout_secs: default_remote_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HlsMuxerConfig {
    /// Target segment length in milliseconds
    #[serde(default = "default_segment_length")]
    pub segment_length: u64,

    /// Fraction of the target a video segment may fall short by
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Base for absolute URLs; `http://localhost:<port>` when unset
    #[serde(default)]
    pub absolute_base_url: Option<String>,

    #[serde(default)]
    pub absolute_index_urls: bool,

    #[serde(default)]
    pub absolute_segment_urls: bool,
}

fn default_segment_length() -> u64 {
    10_000
}
fn default_tolerance() -> f64 {
    0.05
}

impl Default for HlsMuxerConfig {
    fn default() -> Self {
        Self {
            segment_length: default_segment_length(),
            tolerance: default_tolerance(),
            absolute_base_url: None,
            absolute_index_urls: false,
            absolute_segment_urls: false,
        }
    }
}

/// Per-application muxer settings; unset fields fall back to `[hls_muxer]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HlsMuxerOverrides {
    #[serde(default)]
    pub segment_length: Option<u64>,

    #[serde(default)]
    pub tolerance: Option<f64>,

    #[serde(default)]
    pub absolute_base_url: Option<String>,

    #[serde(default)]
    pub absolute_index_urls: Option<bool>,

    #[serde(default)]
    pub absolute_segment_urls: Option<bool>,
}

impl HlsMuxerOverrides {
    pub fn merged_over(&self, base: &HlsMuxerConfig) -> HlsMuxerConfig {
        HlsMuxerConfig {
            segment_length: self.segment_length.unwrap_or(base.segment_length),
            tolerance: self.tolerance.unwrap_or(base.tolerance),
            absolute_base_url: self
                .absolute_base_url
                .clone()
                .or_else(|| base.absolute_base_url.clone()),
            absolute_index_urls: self.absolute_index_urls.unwrap_or(base.absolute_index_urls),
            absolute_segment_urls: self
                .absolute_segment_urls
                .unwrap_or(base.absolute_segment_urls),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplicationConfig {
    /// Local directory or `http(s)://` URL prefix the media paths live under
    pub origin_path: String,

    #[serde(default)]
    pub hls_muxer: HlsMuxerOverrides,
}

/// An application with its effective muxer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub id: String,
    pub origin_path: String,
    pub hls_muxer: HlsMuxerConfig,
}

impl Application {
    /// Whether sources of this application are read over HTTP.
    pub fn is_remote(&self) -> bool {
        self.origin_path.starts_with("http://") || self.origin_path.starts_with("https://")
    }

    /// Local origin directory, when not remote.
    pub fn origin_dir(&self) -> Option<PathBuf> {
        (!self.is_remote()).then(|| PathBuf::from(self.origin_path.as_str()))
    }
}
