// src/models/feed.rs

//! Raw upstream shapes returned by the question `feeds` and `answers` endpoints.
//!
//! Upstream is loose about types (ids arrive as numbers or strings) and about
//! which fields are present, so everything except `data` is optional here and
//! the normalizer decides on fallbacks.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One page (or the concatenation of several pages) of the upstream feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeedPage {
    #[serde(default)]
    pub data: Vec<RawFeedItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

/// Cursor and termination hints attached to a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub is_end: Option<bool>,

    /// Opaque URL of the next page, used verbatim
    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub need_force_login: Option<bool>,

    /// Total number of answers as reported by upstream
    #[serde(default)]
    pub totals: Option<u64>,
}

impl Paging {
    pub fn is_end(&self) -> bool {
        self.is_end.unwrap_or(false)
    }

    pub fn needs_login(&self) -> bool {
        self.need_force_login.unwrap_or(false)
    }

    /// The next cursor, if upstream gave a non-empty one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next.as_deref().filter(|next| !next.is_empty())
    }
}

/// A feed entry: either a wrapper around a target answer (`feeds`) or an
/// answer itself (`answers`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeedItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<RawAnswer>,

    #[serde(flatten)]
    pub answer: RawAnswer,
}

impl RawFeedItem {
    /// Resolve the answer carried by this item.
    ///
    /// Returns `None` for wrappers around something other than an answer.
    pub fn resolve(&self) -> Option<&RawAnswer> {
        match &self.target {
            Some(target) => match self.target_type.as_deref() {
                None | Some("answer") => Some(target),
                Some(_) => None,
            },
            None => Some(&self.answer),
        }
    }
}

/// An answer as upstream describes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnswer {
    #[serde(default, deserialize_with = "loose_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    /// HTML body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voteup_count: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thanks_count: Option<i64>,

    /// Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<RawAuthor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<RawQuestion>,
}

impl RawAnswer {
    /// The answer id, if present and non-empty.
    pub fn answer_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAuthor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// API URL of the member, used when no profile token is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default, deserialize_with = "loose_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Accept ids sent as strings or numbers.
fn loose_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_become_strings() {
        let json = r#"{"data":[{"target_type":"answer","target":{"id":12345,"question":{"id":800718032,"title":"Q"}}}]}"#;
        let page: RawFeedPage = serde_json::from_str(json).unwrap();

        let answer = page.data[0].resolve().unwrap();
        assert_eq!(answer.answer_id(), Some("12345"));
        assert_eq!(
            answer.question.as_ref().unwrap().id.as_deref(),
            Some("800718032")
        );
    }

    #[test]
    fn bare_answers_resolve_to_themselves() {
        let json = r#"{"data":[{"id":"7","excerpt":"hi","voteup_count":3}]}"#;
        let page: RawFeedPage = serde_json::from_str(json).unwrap();

        let answer = page.data[0].resolve().unwrap();
        assert_eq!(answer.answer_id(), Some("7"));
        assert_eq!(answer.voteup_count, Some(3));
    }

    #[test]
    fn non_answer_targets_do_not_resolve() {
        let json = r#"{"data":[{"target_type":"article","target":{"id":"9"}}]}"#;
        let page: RawFeedPage = serde_json::from_str(json).unwrap();
        assert!(page.data[0].resolve().is_none());
    }

    #[test]
    fn paging_hints() {
        let json = r#"{"is_end":false,"next":"","need_force_login":true,"totals":42}"#;
        let paging: Paging = serde_json::from_str(json).unwrap();

        assert!(!paging.is_end());
        assert!(paging.needs_login());
        assert_eq!(paging.next_cursor(), None);
        assert_eq!(paging.totals, Some(42));
    }

    #[test]
    fn null_and_empty_ids_are_missing() {
        let json = r#"{"data":[{"id":null},{"id":""},{"id":true}]}"#;
        let page: RawFeedPage = serde_json::from_str(json).unwrap();
        assert!(page.data.iter().all(|item| item.answer.answer_id().is_none()));
    }
}
