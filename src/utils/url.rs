// src/utils/url.rs

//! Site URL builders.

use crate::models::defaults::SITE_URL;

/// Public page of a question.
///
/// # Examples
/// ```
/// use zhihu_comments::utils::url::question_url;
///
/// assert_eq!(question_url("42"), "https://www.zhihu.com/question/42");
/// ```
pub fn question_url(question_id: &str) -> String {
    format!("{SITE_URL}/question/{question_id}")
}

/// Public page of an answer.
pub fn answer_url(question_id: &str, answer_id: &str) -> String {
    format!("{SITE_URL}/question/{question_id}/answer/{answer_id}")
}

/// Profile page of a member, preferring the profile token over a raw URL.
///
/// # Examples
/// ```
/// use zhihu_comments::utils::url::profile_url;
///
/// assert_eq!(profile_url(Some("alice"), None), "https://www.zhihu.com/people/alice");
/// assert_eq!(profile_url(None, Some("https://x/y")), "https://x/y");
/// assert_eq!(profile_url(None, None), "");
/// ```
pub fn profile_url(url_token: Option<&str>, raw_url: Option<&str>) -> String {
    match url_token.filter(|token| !token.is_empty()) {
        Some(token) => format!("{SITE_URL}/people/{token}"),
        None => raw_url.unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_url() {
        assert_eq!(
            answer_url("800718032", "123"),
            "https://www.zhihu.com/question/800718032/answer/123"
        );
    }

    #[test]
    fn test_empty_token_uses_raw_url() {
        assert_eq!(
            profile_url(Some(""), Some("https://api.zhihu.com/people/abc")),
            "https://api.zhihu.com/people/abc"
        );
    }
}
