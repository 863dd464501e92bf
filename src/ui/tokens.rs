//! Markup tokens
//!
//! UI text is written with bracketed tokens such as `{h1}` or `{dim}` that
//! expand to ANSI escape sequences at flush time. Unknown `{...}` groups are
//! left as-is when expanding and removed when stripping.

/// Token to ANSI sequence table
pub const TOKENS: &[(&str, &str)] = &[
    // Text formatting
    ("{b}", "\x1b[1;33m"),
    ("{/b}", "\x1b[22m\x1b[39m"),
    ("{dim}", "\x1b[90m"),
    ("{text}", "\x1b[0m\x1b[39m"),
    ("{reset}", "\x1b[0m\x1b[39m\x1b[49m"),
    ("{/fg}", "\x1b[39m"),
    // Headings
    ("{h1}", "\x1b[1;38;5;208m"),
    ("{h2}", "\x1b[1;34m"),
    // Selection
    ("{section}", "\x1b[1m"),
    ("{/section}", "\x1b[0m"),
    // Marked for deletion
    ("{strike}", "\x1b[48;5;52m"),
    ("{/strike}", "\x1b[49m"),
    // Screen control
    ("{clear_screen}", "\x1b[2J"),
    ("{clear_line}", "\x1b[2K"),
    ("{home}", "\x1b[H"),
    ("{clear_below}", "\x1b[0J"),
    ("{hide_cursor}", "\x1b[?25l"),
    ("{show_cursor}", "\x1b[?25h"),
];

/// Sequence written after every expanded line
pub const RESET: &str = "\x1b[0m\x1b[39m\x1b[49m";

/// Look up the ANSI sequence for a token such as `{b}`
pub fn lookup(token: &str) -> Option<&'static str> {
    TOKENS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, seq)| *seq)
}

/// Replace every `{...}` group (shortest match) using `replace`
fn substitute<F>(text: &str, mut replace: F) -> String
where
    F: FnMut(&str) -> Option<&'static str>,
{
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail[1..].find(|c: char| c == '}' || c == '\n') {
            Some(close) if tail.as_bytes()[close + 1] == b'}' => {
                let group = &tail[..close + 2];
                match replace(group) {
                    Some(seq) => out.push_str(seq),
                    None => out.push_str(group),
                }
                rest = &tail[close + 2..];
            }
            _ => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Expand known tokens to ANSI sequences
pub fn expand(text: &str) -> String {
    substitute(text, lookup)
}

/// Remove every `{...}` group
pub fn strip(text: &str) -> String {
    substitute(text, |_| Some(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_known_tokens() {
        assert_eq!(expand("{b}x{/b}"), "\x1b[1;33mx\x1b[22m\x1b[39m");
        assert_eq!(expand("{h1}Title{reset}"), "\x1b[1;38;5;208mTitle\x1b[0m\x1b[39m\x1b[49m");
        assert_eq!(expand("{section}a{/section}"), "\x1b[1ma\x1b[0m");
    }

    #[test]
    fn test_expand_leaves_unknown() {
        assert_eq!(expand("{nope} {b}"), "{nope} \x1b[1;33m");
        assert_eq!(expand("a { b"), "a { b");
        // Shortest group starts at the first brace
        assert_eq!(expand("{{b}"), "{{b}");
    }

    #[test]
    fn test_strip() {
        assert_eq!(strip("{dim}Search:{/fg} {anything}x"), "Search: x");
        assert_eq!(strip("no tokens"), "no tokens");
        assert_eq!(strip("open { only"), "open { only");
    }

    #[test]
    fn test_lookup_table() {
        assert_eq!(lookup("{clear_below}"), Some("\x1b[0J"));
        assert_eq!(lookup("{reset}"), Some(RESET));
        assert_eq!(lookup("{missing}"), None);
        assert_eq!(TOKENS.len(), 18);
    }
}
