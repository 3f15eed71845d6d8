// src/services/normalize.rs

//! Turns the raw upstream feed into the canonical payload.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::defaults;
use crate::models::{Author, Comment, CommentsPayload, Question, RawAnswer, RawFeedPage};
use crate::utils::html::html_to_plain_text;
use crate::utils::url::{answer_url, profile_url, question_url};

/// Maps raw feed items onto [`Comment`]s for one configured question.
#[derive(Debug, Clone)]
pub struct Normalizer {
    question_id: String,
}

impl Normalizer {
    pub fn new(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
        }
    }

    /// Normalize with `fetched_at` set to now.
    pub fn normalize(&self, feed: &RawFeedPage) -> CommentsPayload {
        self.normalize_at(feed, Utc::now())
    }

    /// Normalize with an explicit `fetched_at`.
    ///
    /// Items without an answer id are dropped, and only the first
    /// occurrence of each id is kept, in upstream order.
    pub fn normalize_at(&self, feed: &RawFeedPage, fetched_at: DateTime<Utc>) -> CommentsPayload {
        let mut seen = HashSet::new();
        let mut comments = Vec::with_capacity(feed.data.len());
        let mut skipped = 0usize;

        for item in &feed.data {
            let Some(answer) = item.resolve() else {
                skipped += 1;
                continue;
            };
            let Some(id) = answer.answer_id() else {
                skipped += 1;
                continue;
            };
            if !seen.insert(id) {
                log::debug!("Duplicate answer {} dropped", id);
                continue;
            }
            comments.push(self.comment(answer, id));
        }

        if skipped > 0 {
            log::debug!("Skipped {} feed items without an answer", skipped);
        }

        CommentsPayload::new(self.question(feed), comments, fetched_at)
    }

    /// Question block built from the configured id only.
    pub fn fallback_question(&self) -> Question {
        Question {
            id: self.question_id.clone(),
            title: defaults::QUESTION_TITLE.to_string(),
            url: question_url(&self.question_id),
        }
    }

    fn question(&self, feed: &RawFeedPage) -> Question {
        let found = feed
            .data
            .iter()
            .map(|item| item.target.as_ref().unwrap_or(&item.answer))
            .find_map(|answer| answer.question.as_ref());

        let Some(raw) = found else {
            return self.fallback_question();
        };
        let id = non_empty(raw.id.as_deref()).unwrap_or(&self.question_id);
        Question {
            id: id.to_string(),
            title: non_empty(raw.title.as_deref())
                .unwrap_or(defaults::QUESTION_TITLE)
                .to_string(),
            url: question_url(id),
        }
    }

    fn comment(&self, answer: &RawAnswer, id: &str) -> Comment {
        let author = answer.author.as_ref();
        let question_id = answer
            .question
            .as_ref()
            .and_then(|q| non_empty(q.id.as_deref()))
            .unwrap_or(&self.question_id);

        let excerpt = answer.excerpt.as_deref().unwrap_or_default().trim();
        let body = non_empty(answer.content.as_deref()).unwrap_or(excerpt);

        Comment {
            id: id.to_string(),
            author: Author {
                name: non_empty(author.and_then(|a| a.name.as_deref()))
                    .unwrap_or(defaults::AUTHOR_NAME)
                    .to_string(),
                headline: author
                    .and_then(|a| a.headline.clone())
                    .unwrap_or_default(),
                avatar_url: author
                    .and_then(|a| a.avatar_url.clone())
                    .unwrap_or_default(),
                profile_url: profile_url(
                    author.and_then(|a| a.url_token.as_deref()),
                    author.and_then(|a| a.url.as_deref()),
                ),
            },
            excerpt: excerpt.to_string(),
            content_text: html_to_plain_text(body),
            voteup_count: count(answer.voteup_count),
            comment_count: count(answer.comment_count),
            thanks_count: count(answer.thanks_count),
            created_at: answer.created_time.unwrap_or(0),
            answer_url: answer_url(question_id, id),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn count(value: Option<i64>) -> u64 {
    value.unwrap_or(0).max(0) as u64
}
