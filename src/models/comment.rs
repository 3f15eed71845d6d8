// src/models/comment.rs

//! Canonical, output-facing records served to the widget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The question the answers belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Author block of a comment. Every field defaults to an empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub profile_url: String,
}

/// One answer, normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: Author,
    #[serde(default)]
    pub excerpt: String,
    /// HTML-stripped body
    #[serde(default)]
    pub content_text: String,
    #[serde(default)]
    pub voteup_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub thanks_count: u64,
    /// Unix seconds
    #[serde(default)]
    pub created_at: i64,
    pub answer_url: String,
}

/// The full result of one refresh, as cached and persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPayload {
    pub question: Question,
    pub comments: Vec<Comment>,
    #[serde(with = "iso_millis")]
    pub fetched_at: DateTime<Utc>,
    pub total: usize,
}

impl CommentsPayload {
    pub fn new(question: Question, comments: Vec<Comment>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            question,
            total: comments.len(),
            comments,
            fetched_at,
        }
    }

    /// Whether the payload is older than `max_age`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now.signed_duration_since(self.fetched_at) > max_age
    }

    /// Slice of the full comment list; `total` keeps the full length.
    pub fn page(&self, query: PageQuery) -> CommentsPage {
        let start = query.offset.min(self.comments.len());
        let end = start.saturating_add(query.limit).min(self.comments.len());

        CommentsPage {
            question: self.question.clone(),
            comments: self.comments[start..end].to_vec(),
            fetched_at: self.fetched_at,
            total: self.total,
        }
    }
}

/// A read request window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub offset: usize,
    pub limit: usize,
}

impl PageQuery {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

/// Response body of a paginated read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPage {
    pub question: Question,
    pub comments: Vec<Comment>,
    #[serde(with = "iso_millis")]
    pub fetched_at: DateTime<Utc>,
    pub total: usize,
}

/// ISO-8601 timestamps with millisecond precision, e.g. `2025-01-01T08:00:00.000Z`.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payload(n: usize) -> CommentsPayload {
        let comments = (0..n)
            .map(|i| Comment {
                id: i.to_string(),
                author: Author::default(),
                excerpt: String::new(),
                content_text: String::new(),
                voteup_count: 0,
                comment_count: 0,
                thanks_count: 0,
                created_at: 0,
                answer_url: format!("https://www.zhihu.com/question/1/answer/{i}"),
            })
            .collect();
        let question = Question {
            id: "1".into(),
            title: "t".into(),
            url: "https://www.zhihu.com/question/1".into(),
        };
        CommentsPayload::new(question, comments, Utc.timestamp_opt(0, 0).unwrap())
    }

    #[test]
    fn page_sizes_follow_bounds() {
        let p = payload(25);
        for (offset, limit) in [(0, 10), (20, 10), (25, 10), (30, 10), (5, 0), (3, usize::MAX)] {
            let expected = limit.min(25usize.saturating_sub(offset));
            let page = p.page(PageQuery::new(offset, limit));
            assert_eq!(page.comments.len(), expected, "offset={offset} limit={limit}");
            assert_eq!(page.total, 25);
        }
    }

    #[test]
    fn successive_pages_reconstruct_the_list() {
        let p = payload(23);
        let mut ids = Vec::new();
        let mut offset = 0;
        loop {
            let page = p.page(PageQuery::new(offset, 10));
            if page.comments.is_empty() {
                break;
            }
            ids.extend(page.comments.into_iter().map(|c| c.id));
            offset += 10;
        }
        let all: Vec<String> = p.comments.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, all);
    }

    #[test]
    fn fetched_at_serializes_with_millis() {
        let mut p = payload(1);
        p.fetched_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        let json = serde_json::to_value(&p).unwrap();

        assert_eq!(json["fetchedAt"], "2025-03-01T12:30:00.000Z");
        assert_eq!(json["comments"][0]["answerUrl"], "https://www.zhihu.com/question/1/answer/0");
        assert_eq!(json["total"], 1);

        let back: CommentsPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn staleness_uses_strict_greater_than() {
        let p = payload(0);
        let max_age = chrono::Duration::minutes(15);
        assert!(!p.is_stale(p.fetched_at + max_age, max_age));
        assert!(p.is_stale(p.fetched_at + max_age + chrono::Duration::milliseconds(1), max_age));
    }
}
