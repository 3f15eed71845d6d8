// src/utils/html.rs

//! HTML to plain text conversion for answer bodies.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z0-9]+);").expect("valid regex")
});
static AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("valid regex"));
static HORIZONTAL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));

/// Convert an HTML fragment to plain text.
///
/// Script and style blocks are dropped, `<br>`, `</p>` and `</div>` become
/// line breaks, other tags are removed, common entities are decoded, and
/// whitespace is collapsed so paragraphs are separated by exactly one `\n`.
///
/// # Examples
/// ```
/// use zhihu_comments::utils::html::html_to_plain_text;
///
/// assert_eq!(html_to_plain_text("<p>A</p><p>B</p>"), "A\nB");
/// assert_eq!(html_to_plain_text("x &amp; y &#65;"), "x & y A");
/// ```
pub fn html_to_plain_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let text = SCRIPT_BLOCK.replace_all(html, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);

    let text = AROUND_NEWLINE.replace_all(&text, "\n");
    let text = HORIZONTAL_RUN.replace_all(&text, " ");
    text.trim().to_string()
}

/// Decode the named entities upstream actually emits plus numeric references.
///
/// Unknown names and invalid code points are left untouched.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs() {
        assert_eq!(html_to_plain_text("<p>A</p><p>B</p>"), "A\nB");
        assert_eq!(html_to_plain_text("<p>A</p>\n\n<p>  B </p>"), "A\nB");
    }

    #[test]
    fn test_entities() {
        assert_eq!(html_to_plain_text("x &amp; y &#65;"), "x & y A");
        assert_eq!(decode_entities("&#x4e2d;&#X6587;"), "中文");
        assert_eq!(decode_entities("&lt;b&gt; &quot;q&quot; &apos;"), "<b> \"q\" '");
        assert_eq!(decode_entities("&copy; &#xD800;"), "&copy; &#xD800;");
    }

    #[test]
    fn test_script_and_style_removed() {
        let html = "<style>.a{color:red}</style><p>Hi</p><SCRIPT type=\"x\">alert(1)</SCRIPT>";
        assert_eq!(html_to_plain_text(html), "Hi");
    }

    #[test]
    fn test_breaks_and_divs() {
        assert_eq!(html_to_plain_text("a<br>b<br/>c<BR />d"), "a\nb\nc\nd");
        assert_eq!(html_to_plain_text("<div>x</div><div>y</div>"), "x\ny");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(
            html_to_plain_text("  one \t two&nbsp;&nbsp;three  "),
            "one two three"
        );
        assert_eq!(html_to_plain_text("<b>bold</b>text"), "bold text");
    }

    #[test]
    fn test_empty() {
        assert_eq!(html_to_plain_text(""), "");
        assert_eq!(html_to_plain_text("<p></p><br>"), "");
    }
}
