//! HTML to plain text for synthesis context.

use std::io::Cursor;

/// Render width handed to html2text. Wrapping width is irrelevant once
/// whitespace is collapsed, it just has to be sane.
const RENDER_WIDTH: usize = 100;

const STRIP_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// Turns a page body into collapsed plain text capped at `max_chars`
/// characters. Returns the text and whether it was cut off.
pub(crate) fn page_text(html: &str, max_chars: usize) -> (String, bool) {
    let cleaned = strip_tag_blocks(html);
    let text = html_to_text(&cleaned);
    truncate_chars(&norm_ws(&text), max_chars)
}

fn html_to_text(html: &str) -> String {
    html2text::from_read(Cursor::new(html.as_bytes()), RENDER_WIDTH)
        .unwrap_or_else(|_| html.to_string())
}

/// Removes `<script>`, `<style>` and `<noscript>` blocks wholesale.
/// An unclosed block swallows the rest of the document.
fn strip_tag_blocks(html: &str) -> String {
    let mut out = html.to_string();
    for tag in STRIP_TAGS {
        let open = format!("<{tag}");
        let close = format!("</{tag}>");
        loop {
            // ASCII lowering keeps byte offsets valid in `out`.
            let lower = out.to_ascii_lowercase();
            let Some(start) = lower.find(&open) else { break };
            match lower[start + open.len()..].find(&close) {
                Some(rel) => {
                    let end = start + open.len() + rel + close.len();
                    out.replace_range(start..end, " ");
                }
                None => {
                    out.truncate(start);
                    break;
                }
            }
        }
    }
    out
}

/// Collapses all whitespace runs to single spaces and trims the ends.
fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters, never splitting a code point.
fn truncate_chars(s: &str, max: usize) -> (String, bool) {
    let mut count = 0;
    for (idx, _) in s.char_indices() {
        if count == max {
            return (s[..idx].to_string(), true);
        }
        count += 1;
    }
    (s.to_string(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_style_blocks() {
        let html = "<html><head><style>body{color:red}</style></head>\
                    <body><script src=\"x.js\">var a=1;</script>Visible \
                    <noscript>enable js</noscript>text</body></html>";
        let (text, truncated) = page_text(html, 2_000);
        assert!(text.contains("Visible"));
        assert!(text.contains("text"));
        assert!(!text.contains("color:red"));
        assert!(!text.contains("var a=1"));
        assert!(!text.contains("enable js"));
        assert!(!truncated);
    }

    #[test]
    fn strip_is_case_insensitive() {
        let html = "<SCRIPT>nope</SCRIPT>yes";
        assert!(!strip_tag_blocks(html).contains("nope"));
        assert!(strip_tag_blocks(html).contains("yes"));
    }

    #[test]
    fn unclosed_script_swallows_the_rest() {
        let html = "before<script>var x = 1; trailing garbage";
        let out = strip_tag_blocks(html);
        assert_eq!(out, "before");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(norm_ws("  a \n\n b\t\tc  "), "a b c");
        assert_eq!(norm_ws(""), "");
    }

    #[test]
    fn truncates_on_character_boundaries() {
        let s = "héllo wörld";
        let (out, truncated) = truncate_chars(s, 4);
        assert_eq!(out, "héll");
        assert!(truncated);
        let (out, truncated) = truncate_chars(s, 100);
        assert_eq!(out, s);
        assert!(!truncated);
    }

    #[test]
    fn page_text_caps_characters_not_bytes() {
        let html = format!("<p>{}</p>", "é".repeat(3_000));
        let (text, truncated) = page_text(&html, 2_000);
        assert!(truncated);
        assert_eq!(text.chars().count(), 2_000);
    }

    #[test]
    fn page_text_renders_simple_markup() {
        let (text, _) = page_text("<p>One</p><p>Two</p>", 2_000);
        assert!(text.contains("One"));
        assert!(text.contains("Two"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn truncation_respects_the_char_bound(s in ".*", max in 0usize..64) {
                let (out, truncated) = truncate_chars(&s, max);
                prop_assert!(out.chars().count() <= max);
                prop_assert!(s.starts_with(&out));
                prop_assert_eq!(truncated, s.chars().count() > max);
            }
        }
    }
}
