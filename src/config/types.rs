use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Storage locations for raw uploads and converted HLS output.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Directory containing raw source video files (read-only input).
    #[serde(default = "default_videos_dir")]
    pub videos_dir: PathBuf,

    /// Directory receiving one HLS subdirectory per collection.
    #[serde(default = "default_hls_dir")]
    pub hls_dir: PathBuf,
}

fn default_videos_dir() -> PathBuf {
    PathBuf::from("./videos")
}
fn default_hls_dir() -> PathBuf {
    PathBuf::from("./hls")
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            videos_dir: default_videos_dir(),
            hls_dir: default_hls_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Maximum number of ffmpeg processes running at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_max_parallel() -> usize {
    2
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelsConfig {
    /// Maximum number of simultaneously active viewing sessions.
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,

    /// Seconds of inactivity before an admitted session loses its slot.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// How often the idle-eviction task runs.
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_secs: u64,
}

fn default_max_channels() -> usize {
    13
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_eviction_interval() -> u64 {
    30
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            max_channels: default_max_channels(),
            idle_timeout_secs: default_idle_timeout(),
            eviction_interval_secs: default_eviction_interval(),
        }
    }
}
