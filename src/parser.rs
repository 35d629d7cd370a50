/// Recursive-descent parser producing a span-annotated value tree
///
/// Every node remembers where it came from in the source so that edits can
/// be expressed as byte splices instead of re-serializing the whole file.

use crate::error::DescriptorError;
use crate::lexer::{tokenize, SectionMarker, Span, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Text),
    Array(Array),
    Dict(Dict),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub value: String,
    pub quoted: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub items: Vec<Item>,
    /// From `(` through `)`
    pub span: Span,
}

/// An array element; its span runs from the value through the trailing comma
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub value: Value,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dict {
    pub entries: Vec<Entry>,
    /// From `{` through `}`
    pub span: Span,
}

/// A `key = value;` pair; its span runs from the key through the semicolon
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Text,
    pub value: Value,
    pub span: Span,
}

impl Value {
    pub fn span(&self) -> Span {
        match self {
            Value::String(text) => text.span,
            Value::Array(array) => array.span,
            Value::Dict(dict) => dict.span,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(&text.value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

impl Dict {
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key.value == key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entry(key).map(|e| &e.value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

impl Array {
    /// String elements, in order, skipping nested containers
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| item.value.as_str())
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.value.as_str() == Some(value))
    }
}

/// Parsed descriptor: the root dictionary plus the section markers seen
#[derive(Debug, Clone)]
pub struct Document {
    pub root: Dict,
    pub markers: Vec<SectionMarker>,
}

pub fn parse(src: &str) -> Result<Document, DescriptorError> {
    let (tokens, markers) = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };

    let root = match parser.next("root dictionary")? {
        Token {
            kind: TokenKind::OpenBrace,
            span,
        } => parser.dict(span.start)?,
        other => return Err(unexpected(&other, "root dictionary")),
    };

    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(unexpected(extra, "end of input"));
    }

    Ok(Document { root, markers })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn unexpected(token: &Token, expected: &'static str) -> DescriptorError {
    DescriptorError::Unexpected {
        found: token.kind.describe(),
        expected,
        offset: token.span.start,
    }
}

impl Parser {
    fn next(&mut self, expected: &'static str) -> Result<Token, DescriptorError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(DescriptorError::UnexpectedEof(expected))?;
        self.pos += 1;
        Ok(token)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn value(&mut self) -> Result<Value, DescriptorError> {
        let token = self.next("value")?;
        match token.kind {
            TokenKind::Text { value, quoted } => Ok(Value::String(Text {
                value,
                quoted,
                span: token.span,
            })),
            TokenKind::OpenBrace => self.dict(token.span.start).map(Value::Dict),
            TokenKind::OpenParen => self.array(token.span.start).map(Value::Array),
            _ => Err(unexpected(&token, "value")),
        }
    }

    /// Parses the remainder of a dictionary whose `{` started at `open`
    fn dict(&mut self, open: usize) -> Result<Dict, DescriptorError> {
        let mut entries = Vec::new();
        loop {
            let token = self.next("key or `}`")?;
            let key = match token.kind {
                TokenKind::CloseBrace => {
                    return Ok(Dict {
                        entries,
                        span: Span::new(open, token.span.end),
                    })
                }
                TokenKind::Text { value, quoted } => Text {
                    value,
                    quoted,
                    span: token.span,
                },
                _ => return Err(unexpected(&token, "key or `}`")),
            };

            let equals = self.next("`=`")?;
            if equals.kind != TokenKind::Equals {
                return Err(unexpected(&equals, "`=`"));
            }

            let value = self.value()?;

            let semicolon = self.next("`;`")?;
            if semicolon.kind != TokenKind::Semicolon {
                return Err(unexpected(&semicolon, "`;`"));
            }

            entries.push(Entry {
                span: Span::new(key.span.start, semicolon.span.end),
                key,
                value,
            });
        }
    }

    /// Parses the remainder of an array whose `(` started at `open`
    fn array(&mut self, open: usize) -> Result<Array, DescriptorError> {
        let mut items = Vec::new();
        loop {
            if let Some(Token {
                kind: TokenKind::CloseParen,
                span,
            }) = self.peek()
            {
                let close = span.end;
                self.pos += 1;
                return Ok(Array {
                    items,
                    span: Span::new(open, close),
                });
            }

            let value = self.value()?;
            let start = value.span().start;
            let mut end = value.span().end;

            match self.peek() {
                Some(Token {
                    kind: TokenKind::Comma,
                    span,
                }) => {
                    end = span.end;
                    self.pos += 1;
                }
                Some(Token {
                    kind: TokenKind::CloseParen,
                    ..
                }) => {}
                Some(other) => return Err(unexpected(other, "`,` or `)`")),
                None => return Err(DescriptorError::UnexpectedEof("`,` or `)`")),
            }

            items.push(Item {
                value,
                span: Span::new(start, end),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_structure() {
        let src = "// !$*UTF8*$!\n{\n\tobjects = {\n\t\tA = {isa = PBXGroup; children = (B, C); };\n\t};\n}\n";
        let doc = parse(src).unwrap();
        let objects = doc.root.get("objects").and_then(Value::as_dict).unwrap();
        let group = objects.get("A").and_then(Value::as_dict).unwrap();
        assert_eq!(group.get_str("isa"), Some("PBXGroup"));

        let children = group.get("children").and_then(Value::as_array).unwrap();
        assert_eq!(children.strings().collect::<Vec<_>>(), vec!["B", "C"]);
        assert_eq!(children.position("C"), Some(1));
    }

    #[test]
    fn test_entry_span_covers_key_through_semicolon() {
        let src = "{ path = main.swift; }";
        let doc = parse(src).unwrap();
        let entry = doc.root.entry("path").unwrap();
        assert_eq!(&src[entry.span.start..entry.span.end], "path = main.swift;");
        assert_eq!(&src[doc.root.span.start..doc.root.span.end], src);
    }

    #[test]
    fn test_item_span_includes_comment_and_comma() {
        let src = "{ files = (\n\t\tA /* a.swift in Sources */,\n\t\tB\n\t); }";
        let doc = parse(src).unwrap();
        let files = doc.root.get("files").and_then(Value::as_array).unwrap();
        let first = &files.items[0];
        assert_eq!(&src[first.span.start..first.span.end], "A /* a.swift in Sources */,");
        let second = &files.items[1];
        assert_eq!(&src[second.span.start..second.span.end], "B");
    }

    #[test]
    fn test_missing_semicolon_is_reported() {
        let err = parse("{ a = b }").unwrap_err();
        assert_eq!(
            err,
            DescriptorError::Unexpected {
                found: "`}`".to_string(),
                expected: "`;`",
                offset: 8,
            }
        );
    }

    #[test]
    fn test_truncated_input_is_reported() {
        assert_eq!(
            parse("{ a = (b, ").unwrap_err(),
            DescriptorError::UnexpectedEof("value")
        );
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        assert!(matches!(
            parse("{ } extra").unwrap_err(),
            DescriptorError::Unexpected { expected: "end of input", .. }
        ));
    }
}
