//! Inline elements for text content
//!
//! This module defines inline elements that appear within blocks,
//! such as formatted text, links, and images.

use serde::{Deserialize, Serialize};

/// Inline content element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inline {
    /// Plain text
    Text(String),
    /// Formatted text (bold, italic, etc.)
    Format(FormatType, Box<Inline>),
    /// A group of inlines sharing one parent
    Span(Vec<Inline>),
    /// A hyperlink
    Link(Link),
    /// An inline image
    Image(Image),
    /// A hard line break
    Break,
}

impl Inline {
    /// Concatenate the visible text of this inline, dropping formatting
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Inline::Text(text) => out.push_str(text),
            Inline::Format(_, inner) => inner.collect_text(out),
            Inline::Span(inlines) => inlines.iter().for_each(|i| i.collect_text(out)),
            Inline::Link(link) => link.text.iter().for_each(|i| i.collect_text(out)),
            Inline::Image(image) => out.push_str(&image.alt),
            Inline::Break => out.push(' '),
        }
    }
}

/// Plain text of a run of inlines
pub fn plain_text(inlines: &[Inline]) -> String {
    inlines.iter().map(Inline::plain_text).collect()
}

/// Text formatting types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatType {
    /// Bold/strong text
    Bold,
    /// Italic/emphasis text
    Italic,
    /// Underlined text (no markdown syntax of its own, kept from packages)
    Underline,
    /// Strikethrough text
    Strikethrough,
    /// Inline code
    Code,
}

/// A hyperlink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Link target as written in the source
    pub url: String,
    /// Link text
    pub text: Vec<Inline>,
}

/// An inline image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Image source path or URL
    pub src: String,
    /// Alternative text
    pub alt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_text() {
        let bold = Inline::Format(
            FormatType::Bold,
            Box::new(Inline::Text("important".to_string())),
        );
        if let Inline::Format(FormatType::Bold, inner) = bold {
            assert_eq!(*inner, Inline::Text("important".to_string()));
        } else {
            panic!("Expected Bold format");
        }
    }

    #[test]
    fn test_plain_text_flattens_nesting() {
        let inlines = vec![
            Inline::Text("See ".to_string()),
            Inline::Link(Link {
                url: "#intro".to_string(),
                text: vec![Inline::Format(
                    FormatType::Italic,
                    Box::new(Inline::Text("the intro".to_string())),
                )],
            }),
            Inline::Text(".".to_string()),
        ];
        assert_eq!(plain_text(&inlines), "See the intro.");
    }
}
