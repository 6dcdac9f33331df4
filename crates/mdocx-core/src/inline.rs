//! Inline markdown parsing
//!
//! Scans left to right for the earliest inline construct, the way a
//! small hand parser does: escapes, code spans, images, links,
//! autolinks, strong, strikethrough and emphasis. Anything unmatched is
//! plain text.

use std::sync::OnceLock;

use regex::Regex;

use mdocx_ast::{FormatType, Image, Inline, Link};

struct InlinePatterns {
    escape: Regex,
    code: Regex,
    image: Regex,
    link: Regex,
    autolink: Regex,
    strong: Regex,
    strike: Regex,
    emphasis: Regex,
}

fn patterns() -> &'static InlinePatterns {
    static PATTERNS: OnceLock<InlinePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| InlinePatterns {
        escape: Regex::new(r"\\([\\`*_{}\[\]()#+\-.!|~<>])").expect("valid regex"),
        code: Regex::new(r"`([^`]+)`").expect("valid regex"),
        image: Regex::new(r#"!\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)
            .expect("valid regex"),
        link: Regex::new(r#"\[([^\]]+)\]\(\s*<?([^)\s>]*)>?(?:\s+"[^"]*")?\s*\)"#)
            .expect("valid regex"),
        autolink: Regex::new(r"<((?:https?|ftp)://[^>\s]+|mailto:[^>\s]+)>").expect("valid regex"),
        strong: Regex::new(r"\*\*([^*]+?)\*\*|__([^_]+?)__").expect("valid regex"),
        strike: Regex::new(r"~~([^~]+?)~~").expect("valid regex"),
        emphasis: Regex::new(r"\*([^*\s][^*]*?)\*|\b_([^_\s][^_]*?)_\b").expect("valid regex"),
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Escape,
    Code,
    Image,
    Link,
    Autolink,
    Strong,
    Strike,
    Emphasis,
}

/// Parse inline formatting in text
pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let p = patterns();
    // Order breaks ties between matches starting at the same offset
    let candidates: [(Kind, &Regex); 8] = [
        (Kind::Escape, &p.escape),
        (Kind::Code, &p.code),
        (Kind::Image, &p.image),
        (Kind::Link, &p.link),
        (Kind::Autolink, &p.autolink),
        (Kind::Strong, &p.strong),
        (Kind::Strike, &p.strike),
        (Kind::Emphasis, &p.emphasis),
    ];

    let mut result = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let earliest = candidates
            .iter()
            .filter_map(|(kind, re)| re.captures(remaining).map(|c| (*kind, c)))
            .min_by_key(|(_, caps)| caps.get(0).map(|m| m.start()).unwrap_or(usize::MAX));

        let Some((kind, caps)) = earliest else {
            push_text(&mut result, remaining);
            break;
        };
        let Some(whole) = caps.get(0) else {
            push_text(&mut result, remaining);
            break;
        };

        if whole.start() > 0 {
            push_text(&mut result, &remaining[..whole.start()]);
        }

        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
        let first_of = |a: usize, b: usize| {
            caps.get(a)
                .or_else(|| caps.get(b))
                .map(|m| m.as_str())
                .unwrap_or("")
        };

        match kind {
            Kind::Escape => push_text(&mut result, group(1)),
            Kind::Code => result.push(Inline::Format(
                FormatType::Code,
                Box::new(Inline::Text(group(1).to_string())),
            )),
            Kind::Image => result.push(Inline::Image(Image {
                alt: group(1).to_string(),
                src: group(2).to_string(),
            })),
            Kind::Link => result.push(Inline::Link(Link {
                url: group(2).to_string(),
                text: parse_inlines(group(1)),
            })),
            Kind::Autolink => result.push(Inline::Link(Link {
                url: group(1).to_string(),
                text: vec![Inline::Text(group(1).to_string())],
            })),
            Kind::Strong => result.push(formatted(FormatType::Bold, first_of(1, 2))),
            Kind::Strike => result.push(formatted(FormatType::Strikethrough, group(1))),
            Kind::Emphasis => result.push(formatted(FormatType::Italic, first_of(1, 2))),
        }

        remaining = &remaining[whole.end()..];
    }

    if result.is_empty() && text.is_empty() {
        result.push(Inline::Text(String::new()));
    }

    result
}

fn formatted(format_type: FormatType, content: &str) -> Inline {
    let mut inner = parse_inlines(content);
    let inner = if inner.len() == 1 {
        inner.remove(0)
    } else {
        Inline::Span(inner)
    };
    Inline::Format(format_type, Box::new(inner))
}

/// Append text, merging with a preceding text node
pub(crate) fn push_text(out: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}

/// Append inlines, merging adjacent text nodes
pub(crate) fn extend_inlines(out: &mut Vec<Inline>, inlines: Vec<Inline>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => push_text(out, &text),
            other => out.push(other),
        }
    }
}
