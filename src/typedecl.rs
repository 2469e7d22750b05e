//! Enumerated type declaration parsing.
//!
//! Handles the direct `CREATE TYPE ... AS ENUM (...)` form and the same
//! declaration nested inside an anonymous `DO $$ ... $$` block used to guard
//! against re-creation. The guard's condition and control flow are never
//! evaluated; the block body is simply re-scanned for declarations.

use crate::diag::{DiagKind, Diagnostic, LineRange};
use crate::lexer::{Lexer, Token, render_tokens};
use crate::model::EnumType;
use crate::{scan, split};

/// Parse a `CREATE TYPE` statement. Returns the enum, or None with a
/// diagnostic when the statement is not a usable enum declaration.
pub(crate) fn parse_create_type(
    tokens: &[Token],
    lines: LineRange,
    diags: &mut Vec<Diagnostic>,
) -> Option<EnumType> {
    let mut pos = 0;
    if tokens.get(pos) != Some(&Token::Create) {
        return None;
    }
    pos += 1;
    if tokens.get(pos) != Some(&Token::Type) {
        return None;
    }
    pos += 1;

    let mut name = tokens.get(pos)?.name()?.to_string();
    pos += 1;
    if tokens.get(pos) == Some(&Token::Dot) {
        // schema-qualified; keep the bare type name
        pos += 1;
        name = tokens.get(pos)?.name()?.to_string();
        pos += 1;
    }

    if tokens.get(pos) != Some(&Token::As) || tokens.get(pos + 1) != Some(&Token::Enum) {
        diags.push(Diagnostic::warning(
            DiagKind::UnsupportedConstruct,
            lines,
            format!(
                "CREATE TYPE {} is not an enum declaration: {}",
                name,
                render_tokens(&tokens[..tokens.len().saturating_sub(1)])
            ),
        ));
        return None;
    }
    pos += 2;

    if tokens.get(pos) != Some(&Token::LParen) {
        diags.push(Diagnostic::warning(
            DiagKind::MalformedStatement,
            lines,
            format!("enum type {name} is missing its label list"),
        ));
        return None;
    }
    pos += 1;

    let mut labels = Vec::new();
    loop {
        match tokens.get(pos) {
            Some(Token::Str(label)) => {
                labels.push(label.clone());
                pos += 1;
            }
            Some(Token::Comma) => pos += 1,
            Some(Token::RParen) => break,
            _ => {
                diags.push(Diagnostic::warning(
                    DiagKind::MalformedStatement,
                    lines,
                    format!("enum type {name} has a non-literal label"),
                ));
                return None;
            }
        }
    }

    Some(EnumType {
        name,
        labels,
        line: lines.start,
    })
}

/// Scan a `DO $$ ... $$` statement's body for enum declarations.
pub(crate) fn parse_guarded_block(
    tokens: &[Token],
    lines: LineRange,
    diags: &mut Vec<Diagnostic>,
) -> Vec<EnumType> {
    let Some(body) = tokens.iter().find_map(|t| match t {
        Token::DollarQuoted(body) => Some(body.as_str()),
        _ => None,
    }) else {
        diags.push(Diagnostic::warning(
            DiagKind::MalformedStatement,
            lines,
            "DO statement has no dollar-quoted body",
        ));
        return Vec::new();
    };

    // The outer scan proved the input well-terminated, so a failure here is
    // confined to the block and degrades to a warning.
    let segments = match scan::scan(body) {
        Ok(segments) => segments,
        Err(e) => {
            diags.push(Diagnostic::warning(
                DiagKind::MalformedStatement,
                lines,
                format!("unreadable DO block body: {e}"),
            ));
            return Vec::new();
        }
    };

    let mut enums = Vec::new();
    for statement in split::split(&segments) {
        let inner = Lexer::new(&statement.text).tokenize();
        // The declaration may be buried behind IF/THEN guard syntax within
        // the same inner statement; search for it rather than anchoring at
        // the statement head.
        for i in 0..inner.len() {
            if inner[i] == Token::Create && inner.get(i + 1) == Some(&Token::Type) {
                if let Some(e) = parse_create_type(&inner[i..], lines, diags) {
                    enums.push(e);
                }
                break;
            }
        }
    }
    enums
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> Vec<Token> {
        Lexer::new(text).tokenize()
    }

    #[test]
    fn test_direct_enum_declaration() {
        let tokens = lex("CREATE TYPE order_status AS ENUM ('NEW', 'PAID', 'SHIPPED')");
        let mut diags = Vec::new();
        let e = parse_create_type(&tokens, LineRange::single(4), &mut diags).unwrap();
        assert_eq!(e.name, "order_status");
        assert_eq!(e.labels, vec!["NEW", "PAID", "SHIPPED"]);
        assert_eq!(e.line, 4);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_schema_qualified_enum() {
        let tokens = lex("CREATE TYPE public.currency AS ENUM ('EUR', 'USD')");
        let mut diags = Vec::new();
        let e = parse_create_type(&tokens, LineRange::single(1), &mut diags).unwrap();
        assert_eq!(e.name, "currency");
    }

    #[test]
    fn test_non_enum_type_is_unsupported() {
        let tokens = lex("CREATE TYPE point2d AS (x float8, y float8)");
        let mut diags = Vec::new();
        assert!(parse_create_type(&tokens, LineRange::single(1), &mut diags).is_none());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagKind::UnsupportedConstruct);
    }

    #[test]
    fn test_guarded_enum_declaration() {
        let statement = r#"DO $$
BEGIN
    IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'kyc_status_enum') THEN
        CREATE TYPE kyc_status_enum AS ENUM ('PENDING', 'APPROVED', 'REJECTED');
    END IF;
END
$$"#;
        let tokens = lex(statement);
        let mut diags = Vec::new();
        let enums = parse_guarded_block(&tokens, LineRange::new(1, 7), &mut diags);
        assert_eq!(enums.len(), 1);
        assert_eq!(enums[0].name, "kyc_status_enum");
        assert_eq!(enums[0].labels, vec!["PENDING", "APPROVED", "REJECTED"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_guarded_block_with_two_declarations() {
        let statement = "DO $$ BEGIN \
            CREATE TYPE a_enum AS ENUM ('A'); \
            CREATE TYPE b_enum AS ENUM ('B'); \
            END $$";
        let tokens = lex(statement);
        let mut diags = Vec::new();
        let enums = parse_guarded_block(&tokens, LineRange::single(1), &mut diags);
        assert_eq!(enums.len(), 2);
        assert_eq!(enums[1].name, "b_enum");
    }

    #[test]
    fn test_do_without_body() {
        let tokens = lex("DO LANGUAGE plpgsql");
        let mut diags = Vec::new();
        let enums = parse_guarded_block(&tokens, LineRange::single(1), &mut diags);
        assert!(enums.is_empty());
        assert_eq!(diags[0].kind, DiagKind::MalformedStatement);
    }
}
