//! Mermaid fence detection
//!
//! A diagram block opens with a line that is exactly three backticks
//! followed by `mermaid`, and closes with a line of exactly three
//! backticks. Trailing whitespace (including `\r`) is ignored on both
//! fence lines. An opening fence with no closing fence is not a block.

/// Location of one diagram block in the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// Byte offset of the opening fence
    pub start: usize,
    /// Byte offset just past the closing fence (before its line ending)
    pub end: usize,
    /// Lines between the fences, joined with `\n`
    pub source: String,
    /// 1-based line number of the opening fence
    pub line: usize,
}

const OPEN_FENCE: &str = "```mermaid";
const CLOSE_FENCE: &str = "```";

/// Find every mermaid block in `text`, in order
pub fn find_mermaid_blocks(text: &str) -> Vec<DiagramBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(usize, usize, Vec<&str>)> = None;
    let mut offset = 0;

    for (index, raw) in text.split_inclusive('\n').enumerate() {
        let line = raw.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_end();

        match open.as_mut() {
            None => {
                if trimmed == OPEN_FENCE {
                    open = Some((offset, index + 1, Vec::new()));
                }
            }
            Some((start, line_no, lines)) => {
                if trimmed == CLOSE_FENCE {
                    blocks.push(DiagramBlock {
                        start: *start,
                        end: offset + line.len(),
                        source: lines.join("\n"),
                        line: *line_no,
                    });
                    open = None;
                } else {
                    lines.push(line);
                }
            }
        }

        offset += raw.len();
    }

    blocks
}

/// Replace blocks with new text, leaving everything else byte-identical.
///
/// `replacements` pairs a block with its replacement; blocks must be in
/// document order and non-overlapping.
pub fn splice(text: &str, replacements: &[(&DiagramBlock, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (block, replacement) in replacements {
        out.push_str(&text[cursor..block.start]);
        out.push_str(replacement);
        cursor = block.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_single_block() {
        let text = "Intro\n\n```mermaid\ngraph TD\n  A-->B\n```\n\nOutro\n";
        let blocks = find_mermaid_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "graph TD\n  A-->B");
        assert_eq!(blocks[0].line, 3);
        assert_eq!(&text[blocks[0].start..blocks[0].end], "```mermaid\ngraph TD\n  A-->B\n```");
    }

    #[test]
    fn test_other_languages_ignored() {
        let text = "```rust\nfn main() {}\n```\n```mermaid-ish\nx\n```\n";
        assert!(find_mermaid_blocks(text).is_empty());
    }

    #[test]
    fn test_unclosed_fence_is_not_a_block() {
        let text = "```mermaid\ngraph TD\nA-->B\n";
        assert!(find_mermaid_blocks(text).is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "```mermaid\r\ngraph LR\r\n```\r\nafter";
        let blocks = find_mermaid_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "graph LR");
        assert_eq!(&text[blocks[0].end..], "\r\nafter");
    }

    #[test]
    fn test_splice_keeps_untouched_blocks() {
        let text = "a\n```mermaid\none\n```\nb\n```mermaid\ntwo\n```\nc";
        let blocks = find_mermaid_blocks(text);
        assert_eq!(blocks.len(), 2);
        let out = splice(text, &[(&blocks[1], "IMG".to_string())]);
        assert_eq!(out, "a\n```mermaid\none\n```\nb\nIMG\nc");
    }
}
