// src/config.rs

//! Configuration loading utilities.
//!
//! Effective feed settings are layered as defaults < environment (`ZHIHU_*`)
//! < config file. Custom request headers come from `ZHIHU_HEADER_<NAME>`
//! variables, overridden by the headers file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Endpoint, FeedConfig, FileConfig};

/// Prefix of environment variables carrying custom request headers.
pub const HEADER_ENV_PREFIX: &str = "ZHIHU_HEADER_";

/// Config file names looked up in the data directory, first match wins.
pub const CONFIG_FILES: [&str; 2] = ["zhihu-config.toml", "zhihu-config.json"];

/// Header override file names looked up in the data directory, first match wins.
pub const HEADER_FILES: [&str; 2] = ["zhihu-headers.json", "zhihu-headers.toml"];

/// Parse a TOML or JSON file, chosen by extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(toml::from_str(&content)?)
    }
}

/// Load an optional file.
///
/// A missing file is silent; a file that cannot be parsed is logged and
/// treated as absent.
pub fn load_optional<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match load_file(path) {
        Ok(value) => Some(value),
        Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No file at {}", path.display());
            None
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}. Ignoring it.", path.display(), e);
            None
        }
    }
}

/// First existing candidate in `dir`, or the first candidate if none exists.
fn pick_file(dir: &Path, candidates: &[&str]) -> PathBuf {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .unwrap_or_else(|| dir.join(candidates[0]))
}

/// Resolve the effective settings from the data directory and process environment.
pub fn load_all(data_dir: &Path, base: FeedConfig) -> FeedConfig {
    let config_path = pick_file(data_dir, &CONFIG_FILES);
    let file: FileConfig = load_optional(&config_path).unwrap_or_default();
    if let Ok(keys) = serde_json::to_value(&file).map(|v| present_keys(&v)) {
        if !keys.is_empty() {
            log::info!(
                "Loaded config overrides from {}: {}",
                config_path.display(),
                keys.join(", ")
            );
        }
    }

    let headers_path = pick_file(data_dir, &HEADER_FILES);
    let file_headers: BTreeMap<String, String> = load_optional(&headers_path).unwrap_or_default();
    if !file_headers.is_empty() {
        log::info!(
            "Loaded {} header overrides from {}",
            file_headers.len(),
            headers_path.display()
        );
    }

    let env: BTreeMap<String, String> = std::env::vars().collect();
    let config = resolve(base, &file, &env, &file_headers);
    log_summary(&config);
    config
}

/// Merge the sources over `base`.
pub fn resolve(
    base: FeedConfig,
    file: &FileConfig,
    env: &BTreeMap<String, String>,
    file_headers: &BTreeMap<String, String>,
) -> FeedConfig {
    let env_str = |key: &str| env.get(key).map(String::as_str).filter(|v| !v.is_empty());
    let env_value = |key: &str| env_str(key).map(|v| Value::String(v.to_string()));
    let number = |file_value: &Option<Value>, key: &str, allow_zero: bool| {
        file_value
            .as_ref()
            .and_then(|v| read_number(v, allow_zero))
            .or_else(|| env_value(key).and_then(|v| read_number(&v, allow_zero)))
    };

    let question_id = file
        .question_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .or_else(|| env_str("ZHIHU_QUESTION_ID"))
        .map(str::to_string)
        .unwrap_or(base.question_id);

    let endpoint = file
        .endpoint
        .as_deref()
        .or_else(|| env_str("ZHIHU_ENDPOINT"))
        .map(Endpoint::parse)
        .unwrap_or(base.endpoint);

    // The default include list follows the endpoint actually chosen.
    let include = file
        .include
        .as_deref()
        .or_else(|| env_str("ZHIHU_INCLUDE"))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if endpoint == base.endpoint {
                base.include.clone()
            } else {
                endpoint.default_include().to_string()
            }
        });

    let sort_by = file
        .sort_by
        .as_deref()
        .or_else(|| env_str("ZHIHU_SORT_BY"))
        .map(str::to_string)
        .unwrap_or(base.sort_by);

    let api_base = file
        .api_base
        .as_deref()
        .or_else(|| env_str("ZHIHU_API_BASE"))
        .map(str::to_string)
        .unwrap_or(base.api_base);

    let page_size = number(&file.page_size, "ZHIHU_PAGE_SIZE", false)
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(base.page_size);
    let max_pages = number(&file.max_pages, "ZHIHU_MAX_PAGES", false)
        .map(|n| n.min(u32::MAX as u64) as u32)
        .or(base.max_pages);
    let page_delay_ms =
        number(&file.page_delay_ms, "ZHIHU_PAGE_DELAY_MS", true).unwrap_or(base.page_delay_ms);
    let refresh_interval_ms = number(&file.refresh_interval_ms, "ZHIHU_REFRESH_INTERVAL_MS", false)
        .unwrap_or(base.refresh_interval_ms);
    let request_timeout_secs =
        number(&file.request_timeout_secs, "ZHIHU_REQUEST_TIMEOUT_SECS", false)
            .or(base.request_timeout_secs);

    let mut extra_headers = base.extra_headers;
    extra_headers.extend(env_headers(env));
    for (name, value) in file_headers {
        if !value.is_empty() {
            extra_headers.insert(name.to_lowercase(), value.clone());
        }
    }

    FeedConfig {
        question_id,
        endpoint,
        include,
        sort_by,
        page_size,
        max_pages,
        page_delay_ms,
        refresh_interval_ms,
        request_timeout_secs,
        api_base,
        extra_headers,
    }
}

/// Collect `ZHIHU_HEADER_X_ZSE_93=...` style variables as `x-zse-93`.
pub fn env_headers(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    env.iter()
        .filter(|(_, value)| !value.is_empty())
        .filter_map(|(key, value)| {
            let name = key.strip_prefix(HEADER_ENV_PREFIX)?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_lowercase().replace('_', "-"), value.clone()))
        })
        .collect()
}

/// Read a whole number from a JSON/TOML value or a string.
///
/// Non-finite, negative and (unless `allow_zero`) zero values are rejected.
fn read_number(value: &Value, allow_zero: bool) -> Option<u64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let n = n.trunc();
    if !n.is_finite() || n < 0.0 || (n == 0.0 && !allow_zero) {
        return None;
    }
    Some(n as u64)
}

fn present_keys(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn log_summary(config: &FeedConfig) {
    log::info!(
        "config: question={}, endpoint={}, sortBy={}, pageSize={}, maxPages={}, delay={}ms, refresh={}ms",
        config.question_id,
        config.endpoint,
        config.sort_by,
        config.page_size,
        config
            .max_pages
            .map_or_else(|| "∞".to_string(), |n| n.to_string()),
        config.page_delay_ms,
        config.refresh_interval_ms,
    );
    log::debug!("config: include=\"{}\"", config.include);
    if !config.extra_headers.is_empty() {
        let names: Vec<&str> = config.extra_headers.keys().map(String::as_str).collect();
        log::info!("Including custom headers: {}", names.join(", "));
    }
}
