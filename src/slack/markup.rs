//! Slack markup translation.
//!
//! Slack escapes `&`, `<` and `>` in message text and encodes mentions
//! and links as bracketed spans such as `<@U123|kenny>` or
//! `<https://example.com|example>`. IRC wants plain text.

use fancy_regex::Regex;
use sha2::{Digest, Sha256};

use super::directory::DirectoryLookup;

/// Translates Slack message text into IRC-ready plain text.
#[derive(Debug, Clone)]
pub struct MarkupTranslator {
    /// Pattern for a bracketed span without nested brackets.
    span_pattern: Regex,
    /// Whether `:shortcode:` emoji are replaced with unicode.
    expand_emoji: bool,
}

impl Default for MarkupTranslator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MarkupTranslator {
    pub fn new(expand_emoji: bool) -> Self {
        Self {
            span_pattern: Regex::new(r"<([^<>]*)>").expect("span pattern is a valid regex"),
            expand_emoji,
        }
    }

    /// Render every bracketed span as display text.
    pub fn render_for_display<D: DirectoryLookup + ?Sized>(&self, text: &str, directory: &D) -> String {
        self.span_pattern
            .replace_all(text, |caps: &fancy_regex::Captures| -> String {
                render_span(&caps[1], directory)
            })
            .to_string()
    }

    /// Full Slack -> IRC pipeline: render spans, decode entities, then
    /// expand emoji when enabled.
    pub fn translate_for_irc<D: DirectoryLookup + ?Sized>(&self, text: &str, directory: &D) -> String {
        let rendered = self.render_for_display(text, directory);
        let decoded = decode_entities(&rendered);
        if self.expand_emoji {
            expand_emoji(&decoded)
        } else {
            decoded
        }
    }
}

/// Render the body of one `<...>` span.
fn render_span<D: DirectoryLookup + ?Sized>(body: &str, directory: &D) -> String {
    let (target, label) = match body.split_once('|') {
        Some((target, label)) => (target, Some(label)),
        None => (body, None),
    };

    if let Some(id) = target.strip_prefix('#') {
        return match (directory.channel_name(id), label) {
            (Some(name), _) => name.to_string(),
            (None, Some(label)) => format!("#{}", label),
            (None, None) => target.to_string(),
        };
    }

    if let Some(id) = target.strip_prefix('@') {
        return match (directory.user_name(id), label) {
            (Some(name), _) => format!("@{}", name),
            (None, Some(label)) => format!("@{}", label),
            (None, None) => target.to_string(),
        };
    }

    if let Some(special) = target.strip_prefix('!') {
        return match label {
            Some(label) => label.to_string(),
            None => format!("@{}", special),
        };
    }

    label.unwrap_or(target).to_string()
}

/// Undo Slack's HTML entity escaping.
///
/// `&amp;` is decoded last so that `&amp;lt;` becomes `&lt;` rather than `<`.
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Replace known `:shortcode:` sequences with unicode emoji.
///
/// Unknown shortcodes are left untouched, and their closing colon may
/// still open the next shortcode.
pub fn expand_emoji(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(':') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let code_len = after
            .find(|c: char| !is_shortcode_char(c))
            .unwrap_or(after.len());

        if code_len > 0 && after[code_len..].starts_with(':') {
            let shortcode = after[..code_len].to_lowercase();
            if let Some(emoji) = emojis::get_by_shortcode(&shortcode) {
                result.push_str(emoji.as_str());
                rest = &after[code_len + 1..];
                continue;
            }
        }

        result.push(':');
        rest = after;
    }

    result.push_str(rest);
    result
}

fn is_shortcode_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '+'
}

/// Deterministic avatar URL for a relayed IRC nickname.
pub fn icon_url(display_name: &str) -> String {
    format!(
        "https://www.gravatar.com/avatar/{:x}?d=identicon",
        Sha256::digest(display_name.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct FixedDirectory {
        channels: HashMap<&'static str, &'static str>,
        users: HashMap<&'static str, &'static str>,
    }

    impl DirectoryLookup for FixedDirectory {
        fn channel_name(&self, id: &str) -> Option<&str> {
            self.channels.get(id).copied()
        }

        fn user_name(&self, id: &str) -> Option<&str> {
            self.users.get(id).copied()
        }
    }

    fn directory() -> FixedDirectory {
        FixedDirectory {
            channels: HashMap::from([("C1", "#general")]),
            users: HashMap::from([("U1", "kenny")]),
        }
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &amp; c"), "a <b> & c");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("no entities"), "no entities");
    }

    #[test]
    fn test_render_mentions() {
        let translator = MarkupTranslator::new(false);
        let dir = directory();

        assert_eq!(
            translator.render_for_display("hi <@U1>, see <#C1>", &dir),
            "hi @kenny, see #general"
        );
        assert_eq!(
            translator.render_for_display("<@U1|old-name> and <#C1|old>", &dir),
            "@kenny and #general"
        );
    }

    #[test]
    fn test_render_unresolved_ids() {
        let translator = MarkupTranslator::new(false);
        let dir = directory();

        assert_eq!(translator.render_for_display("<@U9>", &dir), "@U9");
        assert_eq!(translator.render_for_display("<@U9|ghost>", &dir), "@ghost");
        assert_eq!(translator.render_for_display("<#C9>", &dir), "#C9");
        assert_eq!(translator.render_for_display("<#C9|random>", &dir), "#random");
    }

    #[test]
    fn test_render_special_mentions() {
        let translator = MarkupTranslator::new(false);
        let dir = directory();

        assert_eq!(translator.render_for_display("<!here> hi", &dir), "@here hi");
        assert_eq!(
            translator.render_for_display("<!subteam^S1|@devs>", &dir),
            "@devs"
        );
    }

    #[test]
    fn test_render_links() {
        let translator = MarkupTranslator::new(false);
        let dir = directory();

        assert_eq!(
            translator.render_for_display("see <https://example.com>", &dir),
            "see https://example.com"
        );
        assert_eq!(
            translator.render_for_display("see <https://example.com|the site>", &dir),
            "see the site"
        );
    }

    #[test]
    fn test_translate_for_irc_pipeline() {
        let translator = MarkupTranslator::new(true);
        let dir = directory();

        assert_eq!(
            translator.translate_for_irc("<@U1> &lt;3 :+1: <https://a.b/?x=1&amp;y=2>", &dir),
            "@kenny <3 👍 https://a.b/?x=1&y=2"
        );
    }

    #[test]
    fn test_translate_without_emoji_expansion() {
        let translator = MarkupTranslator::new(false);
        let dir = directory();

        assert_eq!(translator.translate_for_irc(":+1: ok", &dir), ":+1: ok");
    }

    #[test]
    fn test_expand_emoji_unknown_untouched() {
        assert_eq!(expand_emoji(":not_an_emoji_code:"), ":not_an_emoji_code:");
        assert_eq!(expand_emoji("at 10:30:45"), "at 10:30:45");
        assert_eq!(expand_emoji("a : b"), "a : b");
    }

    #[test]
    fn test_expand_emoji_after_unknown() {
        assert_eq!(expand_emoji(":nope:+1:"), ":nope👍");
    }

    #[test]
    fn test_icon_url_is_deterministic() {
        let url = icon_url("alice");
        assert_eq!(url, icon_url("alice"));
        assert_ne!(url, icon_url("bob"));
        assert!(url.starts_with("https://www.gravatar.com/avatar/"));
        assert!(url.ends_with("?d=identicon"));
        // 64 hex characters of SHA-256
        let hash = &url["https://www.gravatar.com/avatar/".len()..url.len() - "?d=identicon".len()];
        assert_eq!(hash.len(), 64);
    }
}
