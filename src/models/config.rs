//! Application configuration structures.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Which question sub-resource to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// Mixed feed whose items wrap a `target` answer
    #[default]
    Feeds,
    /// Plain answer list, supports `sort_by`
    Answers,
}

impl Endpoint {
    /// Lenient parse: anything other than `answers` means `feeds`.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("answers") {
            Endpoint::Answers
        } else {
            Endpoint::Feeds
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Feeds => "feeds",
            Endpoint::Answers => "answers",
        }
    }

    /// Default `include` field list for this endpoint.
    pub fn default_include(&self) -> &'static str {
        match self {
            Endpoint::Feeds => defaults::FEEDS_INCLUDE,
            Endpoint::Answers => defaults::ANSWERS_INCLUDE,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective feed settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub question_id: String,
    pub endpoint: Endpoint,
    /// Value of the `include` query parameter
    pub include: String,
    /// Value of `sort_by`, only sent to the `answers` endpoint
    pub sort_by: String,
    pub page_size: u32,
    /// `None` means no cap
    pub max_pages: Option<u32>,
    pub page_delay_ms: u64,
    pub refresh_interval_ms: u64,
    /// Per-request timeout; `None` leaves the transport default
    pub request_timeout_secs: Option<u64>,
    /// Root of the upstream API
    pub api_base: String,
    /// Custom request headers, lowercase names
    pub extra_headers: BTreeMap<String, String>,
}

impl FeedConfig {
    /// Defaults of the long-running server.
    pub fn server_defaults() -> Self {
        Self {
            question_id: defaults::QUESTION_ID.to_string(),
            endpoint: Endpoint::Feeds,
            include: Endpoint::Feeds.default_include().to_string(),
            sort_by: defaults::SORT_BY.to_string(),
            page_size: defaults::PAGE_SIZE,
            max_pages: None,
            page_delay_ms: defaults::SERVER_PAGE_DELAY_MS,
            refresh_interval_ms: defaults::REFRESH_INTERVAL_MS,
            request_timeout_secs: None,
            api_base: defaults::API_BASE.to_string(),
            extra_headers: BTreeMap::new(),
        }
    }

    /// Defaults of short-lived serverless invocations: fewer pages, shorter delay.
    pub fn serverless_defaults() -> Self {
        Self {
            max_pages: Some(defaults::SERVERLESS_MAX_PAGES),
            page_delay_ms: defaults::SERVERLESS_PAGE_DELAY_MS,
            ..Self::server_defaults()
        }
    }

    /// First-page URL of the configured endpoint, without query parameters.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/questions/{}/{}",
            self.api_base.trim_end_matches('/'),
            self.question_id,
            self.endpoint
        )
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Expiry hint for backing stores: twice the refresh interval.
    pub fn cache_ttl(&self) -> Duration {
        self.refresh_interval() * 2
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.question_id.trim().is_empty() {
            return Err(AppError::config("questionId is empty"));
        }
        if !self.question_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::config(format!(
                "questionId must be alphanumeric, got {:?}",
                self.question_id
            )));
        }
        if self.page_size == 0 {
            return Err(AppError::config("pageSize must be > 0"));
        }
        if self.max_pages == Some(0) {
            return Err(AppError::config("maxPages must be > 0"));
        }
        if self.refresh_interval_ms == 0 {
            return Err(AppError::config("refreshIntervalMs must be > 0"));
        }
        url::Url::parse(&self.endpoint_url())?;
        Ok(())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::server_defaults()
    }
}

/// Overrides read from the config file. Every field is optional; numbers are
/// kept as raw values so bad entries can fall back instead of failing the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub page_size: Option<serde_json::Value>,
    #[serde(default)]
    pub max_pages: Option<serde_json::Value>,
    #[serde(default)]
    pub page_delay_ms: Option<serde_json::Value>,
    #[serde(default)]
    pub refresh_interval_ms: Option<serde_json::Value>,
    #[serde(default)]
    pub request_timeout_secs: Option<serde_json::Value>,
    #[serde(default)]
    pub api_base: Option<String>,
}

/// Process server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub bind_addr: SocketAddr,
    /// Directory holding the config files and the disk cache
    pub data_dir: PathBuf,
    /// Path segment under `/api/`
    pub resource: String,
}

impl ServerConfig {
    /// Load server settings from environment variables.
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("ZHIHU_BIND_ADDR")
            .unwrap_or_else(|_| defaults::BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|e| AppError::config(format!("Invalid ZHIHU_BIND_ADDR {bind_addr:?}: {e}")))?;

        let data_dir = std::env::var("ZHIHU_DATA_DIR")
            .unwrap_or_else(|_| defaults::DATA_DIR.to_string())
            .into();

        let resource =
            std::env::var("ZHIHU_RESOURCE").unwrap_or_else(|_| defaults::RESOURCE.to_string());

        Ok(Self {
            bind_addr,
            data_dir,
            resource,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 3000).into(),
            data_dir: defaults::DATA_DIR.into(),
            resource: defaults::RESOURCE.to_string(),
        }
    }
}

pub mod defaults {
    pub const QUESTION_ID: &str = "800718032";
    pub const QUESTION_TITLE: &str = "你最近在读的书是哪一本？";
    pub const AUTHOR_NAME: &str = "知乎用户";

    pub const SITE_URL: &str = "https://www.zhihu.com";
    pub const API_BASE: &str = "https://www.zhihu.com/api/v4";
    pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    pub const ACCEPT: &str = "application/json, text/plain, */*";

    pub const SORT_BY: &str = "created";
    pub const PAGE_SIZE: u32 = 10;
    pub const SERVER_PAGE_DELAY_MS: u64 = 1500;
    pub const SERVERLESS_PAGE_DELAY_MS: u64 = 1000;
    pub const SERVERLESS_MAX_PAGES: u32 = 5;
    pub const REFRESH_INTERVAL_MS: u64 = 15 * 60 * 1000;

    pub const BIND_ADDR: &str = "127.0.0.1:3000";
    pub const DATA_DIR: &str = "data";
    pub const RESOURCE: &str = "zhihu";

    pub const FEEDS_INCLUDE: &str = "data[*].is_normal,admin_closed_comment,reward_info,is_collapsed,annotation_action,annotation_detail,collapse_reason,is_sticky,collapsed_by,suggest_edit,comment_count,can_comment,content,editable_content,attachment,voteup_count,reshipment_settings,comment_permission,created_time,updated_time,review_info,relevant_info,question,excerpt,is_labeled,paid_info,paid_info_content,reaction_instruction,segment_infos,allow_segment_interaction,relationship.is_authorized,is_author,voting,is_thanked,is_nothelp;data[*].author.follower_count,vip_info,kvip_info,badge[*].topics;data[*].settings.table_of_content.enabled";
    pub const ANSWERS_INCLUDE: &str = "data[*].is_normal,content,comment_count,voteup_count,created_time,updated_time,question,excerpt,author";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(FeedConfig::default().validate().is_ok());
        assert!(FeedConfig::serverless_defaults().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let config = FeedConfig {
            page_size: 0,
            ..FeedConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_path_like_question_id() {
        let config = FeedConfig {
            question_id: "../1".into(),
            ..FeedConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn endpoint_parse_is_lenient() {
        assert_eq!(Endpoint::parse("ANSWERS"), Endpoint::Answers);
        assert_eq!(Endpoint::parse("feeds"), Endpoint::Feeds);
        assert_eq!(Endpoint::parse("bogus"), Endpoint::Feeds);
    }

    #[test]
    fn endpoint_url_joins_base() {
        let config = FeedConfig {
            api_base: "http://localhost:9000/".into(),
            question_id: "42".into(),
            endpoint: Endpoint::Answers,
            ..FeedConfig::default()
        };
        assert_eq!(config.endpoint_url(), "http://localhost:9000/questions/42/answers");
    }

    #[test]
    fn cache_ttl_doubles_interval() {
        let config = FeedConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(30 * 60));
    }
}
