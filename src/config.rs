//! Service configuration loaded from environment variables.
//!
//! `main` loads a `.env` file (if present) before calling
//! [`Settings::from_env`]; CLI flags override individual values afterwards.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Slider position the web UI starts at (~50 KiB).
pub const DEFAULT_SLIDER_POSITION: u16 = 243;

/// Maximum slider position accepted for `max_file_size`.
pub const MAX_SLIDER_POSITION: u16 = 500;

/// Default byte limit per file for CLI ingests.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accepted `Host` header values; `*.domain` wildcards and `*` are allowed.
    pub allowed_hosts: Vec<String>,
    /// Ingest requests per client IP per minute, 0 disables limiting.
    pub rate_limit_per_minute: u32,
    /// Characters of content returned inline before cropping.
    pub max_display_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub tmp_dir: PathBuf,
    pub clone_timeout_secs: u64,
    pub max_files: usize,
    pub max_total_size: u64,
    pub max_depth: usize,
    pub max_concurrent: usize,
    /// Lets local directories be used as sources (CLI and tests only).
    pub allow_local_sources: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                allowed_hosts: default_allowed_hosts(),
                rate_limit_per_minute: 10,
                max_display_size: 300_000,
            },
            ingest: IngestConfig {
                tmp_dir: std::env::temp_dir().join("gitingest"),
                clone_timeout_secs: 60,
                max_files: 10_000,
                max_total_size: 500 * 1024 * 1024,
                max_depth: 20,
                max_concurrent: 4,
                allow_local_sources: false,
            },
            cache: CacheConfig {
                ttl_secs: 3600,
                capacity: 256,
            },
        }
    }
}

fn default_allowed_hosts() -> Vec<String> {
    ["gitingest.com", "*.gitingest.com", "localhost", "127.0.0.1"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid {} value", key))),
        Err(_) => Ok(default),
    }
}

impl Settings {
    /// Load settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let allowed_hosts = match std::env::var("ALLOWED_HOSTS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
            _ => defaults.server.allowed_hosts,
        };

        let tmp_dir = std::env::var("GITINGEST_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.ingest.tmp_dir);

        Ok(Self {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or(defaults.server.host),
                port: env_or("PORT", defaults.server.port)?,
                allowed_hosts,
                rate_limit_per_minute: env_or(
                    "RATE_LIMIT_PER_MINUTE",
                    defaults.server.rate_limit_per_minute,
                )?,
                max_display_size: env_or("MAX_DISPLAY_SIZE", defaults.server.max_display_size)?,
            },
            ingest: IngestConfig {
                tmp_dir,
                clone_timeout_secs: env_or(
                    "CLONE_TIMEOUT_SECS",
                    defaults.ingest.clone_timeout_secs,
                )?,
                max_files: env_or("MAX_FILES", defaults.ingest.max_files)?,
                max_total_size: env_or("MAX_TOTAL_SIZE_BYTES", defaults.ingest.max_total_size)?,
                max_depth: env_or("MAX_DIRECTORY_DEPTH", defaults.ingest.max_depth)?,
                max_concurrent: env_or("MAX_CONCURRENT_INGESTS", defaults.ingest.max_concurrent)?,
                allow_local_sources: env_or(
                    "ALLOW_LOCAL_SOURCES",
                    defaults.ingest.allow_local_sources,
                )?,
            },
            cache: CacheConfig {
                ttl_secs: env_or("DIGEST_CACHE_TTL_SECS", defaults.cache.ttl_secs)?,
                capacity: env_or("DIGEST_CACHE_CAPACITY", defaults.cache.capacity)?,
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config("PORT must be greater than 0".to_string()));
        }
        if self.server.allowed_hosts.is_empty() {
            return Err(AppError::Config("ALLOWED_HOSTS must not be empty".to_string()));
        }
        if self.ingest.clone_timeout_secs == 0 {
            return Err(AppError::Config(
                "CLONE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        let ingest = &self.ingest;
        if ingest.max_files == 0 || ingest.max_total_size == 0 || ingest.max_depth == 0 {
            return Err(AppError::Config("Ingest limits must be greater than 0".to_string()));
        }
        if self.ingest.max_concurrent == 0 {
            return Err(AppError::Config(
                "MAX_CONCURRENT_INGESTS must be greater than 0".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(AppError::Config(
                "DIGEST_CACHE_CAPACITY must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
