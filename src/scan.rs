//! Lexical scanner: classifies raw schema text into quoting-aware segments.
//!
//! The scanner's only job is to decide which stretches of the input are code
//! and which are comments, quoted spans, or dollar-quoted blocks, so that
//! punctuation inside the latter is never mistaken for statement structure.
//! Both `'...'` strings and `"..."` identifiers become quoted segments; the
//! statement tokenizer re-distinguishes them by their delimiter.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    LineComment,
    BlockComment,
    /// A `'...'` string literal or `"..."` quoted identifier, delimiters
    /// included.
    QuotedString,
    /// A `$tag$ ... $tag$` block, markers included.
    DollarQuoted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Raw text, including delimiters.
    pub text: String,
    /// 1-based line on which the segment starts.
    pub line: u32,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unterminated string literal starting on line {0}")]
    UnterminatedString(u32),
    #[error("unterminated quoted identifier starting on line {0}")]
    UnterminatedIdent(u32),
    #[error("unterminated block comment starting on line {0}")]
    UnterminatedComment(u32),
    #[error("unterminated dollar-quoted block ${tag}$ starting on line {line}")]
    UnterminatedDollarQuote { tag: String, line: u32 },
}

impl ScanError {
    pub fn line(&self) -> u32 {
        match self {
            Self::UnterminatedString(line)
            | Self::UnterminatedIdent(line)
            | Self::UnterminatedComment(line) => *line,
            Self::UnterminatedDollarQuote { line, .. } => *line,
        }
    }
}

/// Scan raw schema text into classified segments.
pub fn scan(input: &str) -> Result<Vec<Segment>, ScanError> {
    Scanner::new(input).scan()
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current();
        if c == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
        c
    }

    fn scan(mut self) -> Result<Vec<Segment>, ScanError> {
        let mut segments = Vec::new();
        let mut code = String::new();
        let mut code_line = self.line;

        macro_rules! flush_code {
            () => {
                if !code.is_empty() {
                    segments.push(Segment {
                        kind: SegmentKind::Code,
                        text: std::mem::take(&mut code),
                        line: code_line,
                    });
                }
            };
        }

        while let Some(c) = self.current() {
            match c {
                '-' if self.peek() == Some('-') => {
                    flush_code!();
                    segments.push(self.read_line_comment());
                }
                '/' if self.peek() == Some('*') => {
                    flush_code!();
                    segments.push(self.read_block_comment()?);
                }
                '\'' => {
                    flush_code!();
                    segments.push(self.read_quoted('\'')?);
                }
                '"' => {
                    flush_code!();
                    segments.push(self.read_quoted('"')?);
                }
                '$' => {
                    if let Some(tag) = self.dollar_tag() {
                        flush_code!();
                        segments.push(self.read_dollar_quoted(tag)?);
                    } else {
                        if code.is_empty() {
                            code_line = self.line;
                        }
                        code.push(c);
                        self.bump();
                    }
                }
                _ => {
                    if code.is_empty() {
                        code_line = self.line;
                    }
                    code.push(c);
                    self.bump();
                }
            }
        }
        flush_code!();

        Ok(segments)
    }

    fn read_line_comment(&mut self) -> Segment {
        let line = self.line;
        let mut text = String::new();
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        Segment {
            kind: SegmentKind::LineComment,
            text,
            line,
        }
    }

    /// Block comments nest, per PostgreSQL.
    fn read_block_comment(&mut self) -> Result<Segment, ScanError> {
        let line = self.line;
        let mut text = String::new();
        text.push(self.bump().unwrap_or('/'));
        text.push(self.bump().unwrap_or('*'));
        let mut depth = 1u32;
        loop {
            match self.current() {
                None => return Err(ScanError::UnterminatedComment(line)),
                Some('*') if self.peek() == Some('/') => {
                    text.push('*');
                    text.push('/');
                    self.bump();
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    text.push('/');
                    text.push('*');
                    self.bump();
                    self.bump();
                    depth += 1;
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        Ok(Segment {
            kind: SegmentKind::BlockComment,
            text,
            line,
        })
    }

    /// Read a `'...'` or `"..."` span with doubled-quote escaping.
    fn read_quoted(&mut self, quote: char) -> Result<Segment, ScanError> {
        let line = self.line;
        let mut text = String::new();
        text.push(self.bump().unwrap_or(quote));
        loop {
            match self.current() {
                None => {
                    return Err(if quote == '\'' {
                        ScanError::UnterminatedString(line)
                    } else {
                        ScanError::UnterminatedIdent(line)
                    });
                }
                Some(c) if c == quote => {
                    text.push(c);
                    self.bump();
                    if self.current() == Some(quote) {
                        // doubled quote escape, still inside the span
                        text.push(quote);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        Ok(Segment {
            kind: SegmentKind::QuotedString,
            text,
            line,
        })
    }

    /// If the cursor sits on a `$tag$` opener, return its tag without
    /// consuming anything. A lone `$` (e.g. a positional parameter) is code.
    fn dollar_tag(&self) -> Option<String> {
        let mut i = self.pos + 1;
        let mut tag = String::new();
        while let Some(&c) = self.chars.get(i) {
            if c == '$' {
                return Some(tag);
            }
            if c.is_alphanumeric() || c == '_' {
                tag.push(c);
                i += 1;
            } else {
                return None;
            }
        }
        None
    }

    fn read_dollar_quoted(&mut self, tag: String) -> Result<Segment, ScanError> {
        let line = self.line;
        let marker: Vec<char> = format!("${tag}$").chars().collect();
        let mut text = String::new();
        for _ in 0..marker.len() {
            if let Some(c) = self.bump() {
                text.push(c);
            }
        }
        loop {
            if self.pos >= self.chars.len() {
                return Err(ScanError::UnterminatedDollarQuote { tag, line });
            }
            if self.chars[self.pos..].starts_with(&marker) {
                for _ in 0..marker.len() {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                break;
            }
            if let Some(c) = self.bump() {
                text.push(c);
            }
        }
        Ok(Segment {
            kind: SegmentKind::DollarQuoted,
            text,
            line,
        })
    }
}
