/// Tokenizer for the OpenStep property-list dialect used by `project.pbxproj`
///
/// Comments are dropped from the token stream, except that
/// `/* Begin X section */` and `/* End X section */` markers are collected
/// separately so that callers can find the section boundaries later.

use crate::error::DescriptorError;

/// Half-open byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Span { start: at, end: at }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Equals,
    Semicolon,
    Comma,
    Text { value: String, quoted: bool },
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::OpenBrace => "`{`".to_string(),
            TokenKind::CloseBrace => "`}`".to_string(),
            TokenKind::OpenParen => "`(`".to_string(),
            TokenKind::CloseParen => "`)`".to_string(),
            TokenKind::Equals => "`=`".to_string(),
            TokenKind::Semicolon => "`;`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Text { value, .. } => format!("string `{}`", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// A `/* Begin <isa> section */` or `/* End <isa> section */` comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMarker {
    pub isa: String,
    pub begin: bool,
    pub span: Span,
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    markers: Vec<SectionMarker>,
}

pub fn tokenize(src: &str) -> Result<(Vec<Token>, Vec<SectionMarker>), DescriptorError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok((tokens, lexer.markers))
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            markers: Vec::new(),
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, DescriptorError> {
        self.skip_trivia()?;

        let start = self.pos;
        let Some(&byte) = self.bytes.get(start) else {
            return Ok(None);
        };

        let punct = match byte {
            b'{' => Some(TokenKind::OpenBrace),
            b'}' => Some(TokenKind::CloseBrace),
            b'(' => Some(TokenKind::OpenParen),
            b')' => Some(TokenKind::CloseParen),
            b'=' => Some(TokenKind::Equals),
            b';' => Some(TokenKind::Semicolon),
            b',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = punct {
            self.pos += 1;
            return Ok(Some(Token {
                kind,
                span: Span::new(start, self.pos),
            }));
        }

        // Strings: quoted, or a bare run of word characters
        if byte == b'"' || byte == b'\'' {
            return self.quoted(byte).map(Some);
        }

        Ok(Some(self.bare()))
    }

    fn skip_trivia(&mut self) -> Result<(), DescriptorError> {
        loop {
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.bytes[self.pos..].starts_with(b"/*") {
                let start = self.pos;
                let body_start = start + 2;
                let Some(close) = self.src[body_start..].find("*/") else {
                    return Err(DescriptorError::UnterminatedComment(start));
                };
                let body_end = body_start + close;
                self.pos = body_end + 2;
                let src = self.src;
                self.record_marker(&src[body_start..body_end], Span::new(start, self.pos));
            } else if self.bytes[self.pos..].starts_with(b"//") {
                while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else {
                return Ok(());
            }
        }
    }

    fn record_marker(&mut self, body: &str, span: Span) {
        let body = body.trim();
        let (rest, begin) = if let Some(rest) = body.strip_prefix("Begin ") {
            (rest, true)
        } else if let Some(rest) = body.strip_prefix("End ") {
            (rest, false)
        } else {
            return;
        };

        if let Some(isa) = rest.strip_suffix(" section") {
            self.markers.push(SectionMarker {
                isa: isa.trim().to_string(),
                begin,
                span,
            });
        }
    }

    fn quoted(&mut self, quote: u8) -> Result<Token, DescriptorError> {
        let start = self.pos;
        let mut i = start + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b if b == quote => {
                    self.pos = i + 1;
                    let raw = &self.src[start + 1..i];
                    return Ok(Token {
                        kind: TokenKind::Text {
                            value: unescape(raw),
                            quoted: true,
                        },
                        span: Span::new(start, self.pos),
                    });
                }
                _ => i += 1,
            }
        }
        Err(DescriptorError::UnterminatedString(start))
    }

    fn bare(&mut self) -> Token {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_whitespace() || b"{}()=;,\"".contains(&b) {
                break;
            }
            if self.bytes[self.pos..].starts_with(b"/*") || self.bytes[self.pos..].starts_with(b"//") {
                break;
            }
            self.pos += 1;
        }
        Token {
            kind: TokenKind::Text {
                value: self.src[start..self.pos].to_string(),
                quoted: false,
            },
            span: Span::new(start, self.pos),
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('U') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\U");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Quote a string the way Xcode writes values in `project.pbxproj`
///
/// Bare words made only of `[A-Za-z0-9_$/:.]` are left unquoted; anything
/// else (including the empty string) is wrapped in double quotes with
/// backslash escapes.
pub fn quote(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.'));
    if bare {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().0.into_iter().map(|t| t.kind).collect()
    }

    fn text(value: &str, quoted: bool) -> TokenKind {
        TokenKind::Text {
            value: value.to_string(),
            quoted,
        }
    }

    #[test]
    fn test_punctuation_and_bare_words() {
        assert_eq!(
            kinds("{isa = PBXGroup; children = (A, B, ); }"),
            vec![
                TokenKind::OpenBrace,
                text("isa", false),
                TokenKind::Equals,
                text("PBXGroup", false),
                TokenKind::Semicolon,
                text("children", false),
                TokenKind::Equals,
                TokenKind::OpenParen,
                text("A", false),
                TokenKind::Comma,
                text("B", false),
                TokenKind::Comma,
                TokenKind::CloseParen,
                TokenKind::Semicolon,
                TokenKind::CloseBrace,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("// !$*UTF8*$!\nA /* main.swift */ = B;"),
            vec![
                text("A", false),
                TokenKind::Equals,
                text("B", false),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_section_markers_are_recorded() {
        let src = "/* Begin PBXBuildFile section */\n/* End PBXBuildFile section */\n";
        let (tokens, markers) = tokenize(src).unwrap();
        assert!(tokens.is_empty());
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].isa, "PBXBuildFile");
        assert!(markers[0].begin);
        assert_eq!(markers[0].span, Span::new(0, 32));
        assert!(!markers[1].begin);
    }

    #[test]
    fn test_quoted_string_escapes() {
        let (tokens, _) = tokenize(r#"shellScript = "\"${SRCROOT}/run.sh\"\n";"#).unwrap();
        assert_eq!(tokens[2].kind, text("\"${SRCROOT}/run.sh\"\n", true));
    }

    #[test]
    fn test_quoted_string_spans_include_quotes() {
        let (tokens, _) = tokenize(r#"sourceTree = "<group>";"#).unwrap();
        assert_eq!(tokens[2].span, Span::new(13, 22));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize("path = \"abc").unwrap_err(),
            DescriptorError::UnterminatedString(7)
        );
    }

    #[test]
    fn test_unterminated_comment() {
        assert_eq!(
            tokenize("A /* oops").unwrap_err(),
            DescriptorError::UnterminatedComment(2)
        );
    }

    #[test]
    fn test_quote_bare_and_special_values() {
        assert_eq!(quote("main.swift"), "main.swift");
        assert_eq!(quote("$(TARGET_NAME)"), "\"$(TARGET_NAME)\"");
        assert_eq!(quote("<group>"), "\"<group>\"");
        assert_eq!(quote("dwarf-with-dsym"), "\"dwarf-with-dsym\"");
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("a\"b\n"), "\"a\\\"b\\n\"");
    }

    #[test]
    fn test_unicode_escape() {
        assert_eq!(unescape("\\U00e9t\\U00e9"), "été");
    }
}
