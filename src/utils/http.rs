// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};

use crate::error::{AppError, Result};
use crate::models::FeedConfig;
use crate::models::defaults;
use crate::utils::url::question_url;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &FeedConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Header set sent with every page request.
///
/// Base headers first, then the custom ones, which may replace them.
pub fn build_headers(config: &FeedConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(defaults::USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(defaults::ACCEPT));
    headers.insert(
        REFERER,
        HeaderValue::from_str(&question_url(&config.question_id))
            .map_err(|e| AppError::config(format!("Invalid referer: {e}")))?,
    );

    for (name, value) in &config.extra_headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::config(format!("Invalid header name {name:?}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| AppError::config(format!("Invalid value for header {name:?}: {e}")))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_headers_override_base() {
        let mut config = FeedConfig::default();
        config
            .extra_headers
            .insert("user-agent".into(), "custom/1.0".into());
        config.extra_headers.insert("cookie".into(), "z_c0=abc".into());

        let headers = build_headers(&config).unwrap();
        assert_eq!(headers[USER_AGENT], "custom/1.0");
        assert_eq!(headers["cookie"], "z_c0=abc");
        assert_eq!(headers[REFERER], "https://www.zhihu.com/question/800718032");
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut config = FeedConfig::default();
        config.extra_headers.insert("bad header".into(), "x".into());
        assert!(matches!(build_headers(&config), Err(AppError::Config(_))));
    }
}
