//! SQL tokenizer for individual DDL statements.
//!
//! Operates on statement text produced by the splitter, so comments are
//! already gone; quoted spans and dollar-quoted blocks are re-read here as
//! single tokens.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Create,
    Alter,
    Add,
    Table,
    Only,
    Type,
    As,
    Enum,
    Do,
    If,
    Exists,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    Check,
    Constraint,
    Index,
    On,
    Delete,
    Update,
    Cascade,
    Restrict,
    Set,
    No,
    Action,
    Where,

    // Identifiers and literals
    Ident(String),
    /// A `"..."` identifier; case preserved exactly.
    Quoted(String),
    /// A `'...'` string literal, content only.
    Str(String),
    Num(String),
    /// Body of a `$tag$ ... $tag$` block, markers stripped.
    DollarQuoted(String),

    // Symbols
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Dot,
    /// A run of operator characters, e.g. `::` or `<>`.
    Op(String),

    Eof,
}

impl Token {
    /// The text of an identifier-like token (quoted or not).
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Ident(s) | Token::Quoted(s) => Some(s),
            _ => None,
        }
    }

    /// Does this token spell the given bare word, case-insensitively?
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(word))
    }

    /// Render the token back to SQL-ish text, for opaque-expression capture.
    pub fn sql(&self) -> String {
        match self {
            Token::Create => "CREATE".into(),
            Token::Alter => "ALTER".into(),
            Token::Add => "ADD".into(),
            Token::Table => "TABLE".into(),
            Token::Only => "ONLY".into(),
            Token::Type => "TYPE".into(),
            Token::As => "AS".into(),
            Token::Enum => "ENUM".into(),
            Token::Do => "DO".into(),
            Token::If => "IF".into(),
            Token::Exists => "EXISTS".into(),
            Token::Primary => "PRIMARY".into(),
            Token::Key => "KEY".into(),
            Token::Foreign => "FOREIGN".into(),
            Token::References => "REFERENCES".into(),
            Token::Not => "NOT".into(),
            Token::Null => "NULL".into(),
            Token::Unique => "UNIQUE".into(),
            Token::Default => "DEFAULT".into(),
            Token::Check => "CHECK".into(),
            Token::Constraint => "CONSTRAINT".into(),
            Token::Index => "INDEX".into(),
            Token::On => "ON".into(),
            Token::Delete => "DELETE".into(),
            Token::Update => "UPDATE".into(),
            Token::Cascade => "CASCADE".into(),
            Token::Restrict => "RESTRICT".into(),
            Token::Set => "SET".into(),
            Token::No => "NO".into(),
            Token::Action => "ACTION".into(),
            Token::Where => "WHERE".into(),
            Token::Ident(s) => s.clone(),
            Token::Quoted(s) => format!("\"{}\"", s.replace('"', "\"\"")),
            Token::Str(s) => format!("'{}'", s.replace('\'', "''")),
            Token::Num(s) => s.clone(),
            Token::DollarQuoted(body) => format!("$${body}$$"),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::LBracket => "[".into(),
            Token::RBracket => "]".into(),
            Token::Comma => ",".into(),
            Token::Semicolon => ";".into(),
            Token::Dot => ".".into(),
            Token::Op(s) => s.clone(),
            Token::Eof => String::new(),
        }
    }
}

/// Render a token slice back to readable SQL-ish text. The result is inert
/// display data, not something the parser interprets.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        let piece = token.sql();
        if piece.is_empty() {
            continue;
        }
        let tight_before = matches!(
            token,
            Token::RParen
                | Token::RBracket
                | Token::Comma
                | Token::Dot
                | Token::Semicolon
                | Token::LBracket
        ) || matches!(token, Token::Op(s) if s == "::");
        let tight_after_prev = matches!(prev, Some(Token::LParen | Token::LBracket | Token::Dot))
            || matches!(prev, Some(Token::Op(s)) if s == "::");
        let call_paren = matches!(token, Token::LParen)
            && matches!(prev, Some(Token::Ident(_) | Token::Quoted(_)));
        if !out.is_empty() && !tight_before && !tight_after_prev && !call_paren {
            out.push(' ');
        }
        out.push_str(&piece);
        prev = Some(token);
    }
    out
}

const OP_CHARS: &str = ":=<>!+-*/%|^~&@#?";

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    fn read_quoted(&mut self, quote: char) -> String {
        self.advance(); // opening quote
        let mut text = String::new();
        while let Some(c) = self.current() {
            if c == quote {
                if self.peek() == Some(quote) {
                    text.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // closing quote
                    break;
                }
            } else {
                text.push(c);
                self.advance();
            }
        }
        text
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        let mut has_dot = false;
        if self.current() == Some('-') {
            num.push('-');
            self.advance();
        }
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    /// If the cursor sits on a `$tag$` opener, read the whole block and
    /// return its body. Splitter-validated input always terminates; a
    /// truncated block degrades to "rest of statement is the body".
    fn try_read_dollar_quoted(&mut self) -> Option<String> {
        let mut i = self.pos + 1;
        let mut tag = String::new();
        loop {
            match self.chars.get(i) {
                Some('$') => break,
                Some(&c) if c.is_alphanumeric() || c == '_' => {
                    tag.push(c);
                    i += 1;
                }
                _ => return None,
            }
        }
        let marker: Vec<char> = format!("${tag}$").chars().collect();
        self.pos += marker.len();
        let mut body = String::new();
        loop {
            if self.pos >= self.chars.len() {
                break;
            }
            if self.chars[self.pos..].starts_with(&marker) {
                self.pos += marker.len();
                break;
            }
            body.push(self.chars[self.pos]);
            self.pos += 1;
        }
        Some(body)
    }

    fn keyword_or_ident(&self, s: String) -> Token {
        match s.to_uppercase().as_str() {
            "CREATE" => Token::Create,
            "ALTER" => Token::Alter,
            "ADD" => Token::Add,
            "TABLE" => Token::Table,
            "ONLY" => Token::Only,
            "TYPE" => Token::Type,
            "AS" => Token::As,
            "ENUM" => Token::Enum,
            "DO" => Token::Do,
            "IF" => Token::If,
            "EXISTS" => Token::Exists,
            "PRIMARY" => Token::Primary,
            "KEY" => Token::Key,
            "FOREIGN" => Token::Foreign,
            "REFERENCES" => Token::References,
            "NOT" => Token::Not,
            "NULL" => Token::Null,
            "UNIQUE" => Token::Unique,
            "DEFAULT" => Token::Default,
            "CHECK" => Token::Check,
            "CONSTRAINT" => Token::Constraint,
            "INDEX" => Token::Index,
            "ON" => Token::On,
            "DELETE" => Token::Delete,
            "UPDATE" => Token::Update,
            "CASCADE" => Token::Cascade,
            "RESTRICT" => Token::Restrict,
            "SET" => Token::Set,
            "NO" => Token::No,
            "ACTION" => Token::Action,
            "WHERE" => Token::Where,
            _ => Token::Ident(s),
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            match self.current() {
                None => return Token::Eof,

                Some('(') => {
                    self.advance();
                    return Token::LParen;
                }
                Some(')') => {
                    self.advance();
                    return Token::RParen;
                }
                Some('[') => {
                    self.advance();
                    return Token::LBracket;
                }
                Some(']') => {
                    self.advance();
                    return Token::RBracket;
                }
                Some(',') => {
                    self.advance();
                    return Token::Comma;
                }
                Some(';') => {
                    self.advance();
                    return Token::Semicolon;
                }
                Some('.') => {
                    self.advance();
                    return Token::Dot;
                }

                Some('"') => return Token::Quoted(self.read_quoted('"')),
                Some('\'') => return Token::Str(self.read_quoted('\'')),

                Some('$') => {
                    if let Some(body) = self.try_read_dollar_quoted() {
                        return Token::DollarQuoted(body);
                    }
                    // a lone $ (positional parameter etc.) becomes an op run
                    let mut op = String::from('$');
                    self.advance();
                    while let Some(c) = self.current() {
                        if c.is_ascii_digit() {
                            op.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    return Token::Op(op);
                }

                Some('-') if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                    return Token::Num(self.read_number());
                }

                Some(c) if c.is_ascii_digit() => {
                    return Token::Num(self.read_number());
                }

                Some(c) if c.is_alphabetic() || c == '_' => {
                    let ident = self.read_identifier();
                    return self.keyword_or_ident(ident);
                }

                Some(c) if OP_CHARS.contains(c) => {
                    let mut op = String::new();
                    while let Some(c) = self.current() {
                        if OP_CHARS.contains(c) {
                            op.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    return Token::Op(op);
                }

                Some(_) => {
                    // unknown character, skip
                    self.advance();
                    continue;
                }
            }
        }
    }

    /// Collect all tokens, Eof-terminated.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_tokens() {
        let tokens = Lexer::new("CREATE TABLE users (id INT)").tokenize();
        assert_eq!(
            tokens,
            vec![
                Token::Create,
                Token::Table,
                Token::Ident("users".to_string()),
                Token::LParen,
                Token::Ident("id".to_string()),
                Token::Ident("INT".to_string()),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_identifier_preserves_case() {
        let tokens = Lexer::new(r#""BankAccountID" uuid"#).tokenize();
        assert_eq!(tokens[0], Token::Quoted("BankAccountID".to_string()));
        assert_eq!(tokens[1], Token::Ident("uuid".to_string()));
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let tokens = Lexer::new("not null primary key").tokenize();
        assert_eq!(
            tokens,
            vec![Token::Not, Token::Null, Token::Primary, Token::Key, Token::Eof]
        );
    }

    #[test]
    fn test_string_and_cast() {
        let tokens = Lexer::new("'EUR'::text").tokenize();
        assert_eq!(
            tokens,
            vec![
                Token::Str("EUR".to_string()),
                Token::Op("::".to_string()),
                Token::Ident("text".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_array_suffix() {
        let tokens = Lexer::new("tags TEXT[]").tokenize();
        assert_eq!(tokens[2], Token::LBracket);
        assert_eq!(tokens[3], Token::RBracket);
    }

    #[test]
    fn test_dollar_quoted_body() {
        let tokens = Lexer::new("DO $x$ SELECT 1; $x$").tokenize();
        assert_eq!(tokens[0], Token::Do);
        assert_eq!(tokens[1], Token::DollarQuoted(" SELECT 1; ".to_string()));
    }

    #[test]
    fn test_escaped_quotes() {
        let tokens = Lexer::new(r#"'it''s' "a""b""#).tokenize();
        assert_eq!(tokens[0], Token::Str("it's".to_string()));
        assert_eq!(tokens[1], Token::Quoted("a\"b".to_string()));
    }

    #[test]
    fn test_render_tokens_check_expression() {
        let tokens = Lexer::new("price > 0 AND tax >= 0").tokenize();
        let inner = &tokens[..tokens.len() - 1];
        assert_eq!(render_tokens(inner), "price > 0 AND tax >= 0");
    }

    #[test]
    fn test_render_function_call() {
        let tokens = Lexer::new("now()").tokenize();
        assert_eq!(render_tokens(&tokens[..tokens.len() - 1]), "now()");
    }

    #[test]
    fn test_render_cast() {
        let tokens = Lexer::new("'EUR' :: text").tokenize();
        assert_eq!(render_tokens(&tokens[..tokens.len() - 1]), "'EUR'::text");
    }

    #[test]
    fn test_render_parenthesized_args() {
        let tokens = Lexer::new("coalesce ( a , 0 )").tokenize();
        // `(` after an identifier renders tight, like a call
        assert_eq!(render_tokens(&tokens[..tokens.len() - 1]), "coalesce(a, 0)");
    }
}
