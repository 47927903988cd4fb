use std::ops::Range;

use pulldown_cmark::{CodeBlockKind as CmarkBlockKind, CowStr, Event, Options, Parser, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeBlockKind {
    Fence,
    Indented,
}

impl CodeBlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CodeBlockKind::Fence => "fence",
            CodeBlockKind::Indented => "code_block",
        }
    }
}

/// A code block lifted out of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: CodeBlockKind,
    /// Full info string of a fence; empty for indented blocks.
    pub info: String,
    pub content: String,
    pub range: Range<usize>,
}

impl Token {
    fn open(kind: CmarkBlockKind<'_>, range: Range<usize>) -> Self {
        let (kind, info) = match kind {
            CmarkBlockKind::Fenced(info) => (CodeBlockKind::Fence, info.to_string()),
            CmarkBlockKind::Indented => (CodeBlockKind::Indented, String::new()),
        };
        Self {
            kind,
            info,
            content: String::new(),
            range,
        }
    }

    /// First word of the info string, if any.
    pub fn language(&self) -> Option<&str> {
        self.info.split_whitespace().next()
    }

    pub(crate) fn to_events(&self) -> [Event<'_>; 3] {
        let kind = match self.kind {
            CodeBlockKind::Fence => CmarkBlockKind::Fenced(CowStr::Borrowed(&self.info)),
            CodeBlockKind::Indented => CmarkBlockKind::Indented,
        };
        [
            Event::Start(Tag::CodeBlock(kind.clone())),
            Event::Text(CowStr::Borrowed(&self.content)),
            Event::End(Tag::CodeBlock(kind)),
        ]
    }
}

pub(crate) enum Segment<'a> {
    Events(Vec<Event<'a>>),
    Code(usize),
}

/// A parsed document: runs of ordinary events interleaved with code tokens.
pub struct Document<'a> {
    pub(crate) segments: Vec<Segment<'a>>,
    tokens: Vec<Token>,
}

impl Document<'_> {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

pub fn tokenize(source: &str, options: Options) -> Document<'_> {
    let mut segments = Vec::new();
    let mut tokens = Vec::new();
    let mut pending = Vec::new();
    let mut current: Option<Token> = None;

    for (event, range) in Parser::new_ext(source, options).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                if !pending.is_empty() {
                    segments.push(Segment::Events(std::mem::take(&mut pending)));
                }
                current = Some(Token::open(kind, range));
            }
            Event::End(Tag::CodeBlock(_)) => {
                if let Some(token) = current.take() {
                    segments.push(Segment::Code(tokens.len()));
                    tokens.push(token);
                }
            }
            Event::Text(text) => match current.as_mut() {
                Some(token) => token.content.push_str(&text),
                None => pending.push(Event::Text(text)),
            },
            other => pending.push(other),
        }
    }

    if !pending.is_empty() {
        segments.push(Segment::Events(pending));
    }

    Document { segments, tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifts_fenced_and_indented_blocks() {
        let source = "# Title\n\n```css\na {}\nb {}\n```\n\ntext\n\n    indented\n";
        let document = tokenize(source, Options::empty());

        let tokens = document.tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, CodeBlockKind::Fence);
        assert_eq!(tokens[0].info, "css");
        assert_eq!(tokens[0].content, "a {}\nb {}\n");
        assert_eq!(tokens[1].kind, CodeBlockKind::Indented);
        assert_eq!(tokens[1].content, "indented\n");
        assert!(source[tokens[0].range.clone()].starts_with("```css"));
    }

    #[test]
    fn language_is_first_word_of_info() {
        let document = tokenize("```rust ignore\nfn main() {}\n```\n", Options::empty());
        assert_eq!(document.tokens()[0].language(), Some("rust"));
        assert_eq!(document.tokens()[0].info, "rust ignore");
    }

    #[test]
    fn indented_blocks_have_no_language() {
        let document = tokenize("    plain\n", Options::empty());
        assert_eq!(document.tokens()[0].language(), None);
    }

    #[test]
    fn interleaves_segments_in_source_order() {
        let document = tokenize("para\n\n```\nx\n```\n\nmore\n", Options::empty());
        let shape: Vec<&str> = document
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Events(_) => "events",
                Segment::Code(_) => "code",
            })
            .collect();
        assert_eq!(shape, vec!["events", "code", "events"]);
    }
}
