//! pgerd - parse PostgreSQL DDL into a queryable schema model.
//!
//! Input is the `CREATE TYPE` / `CREATE TABLE` subset of a pg_dump-style
//! schema file; output is a [`model::SchemaModel`] with resolved foreign-key
//! relationships plus a diagnostics list. Diagram rendering, command-line
//! handling, and live-database reflection are external collaborators that
//! consume the model; they never re-parse text.

pub mod diag;
pub mod dump;
pub mod lexer;
pub mod model;
pub mod scan;
pub mod split;

mod resolver;
mod table;
mod typedecl;

use wasm_bindgen::prelude::*;

use diag::{DiagKind, Diagnostic, LineRange};
use lexer::{Lexer, Token};
use model::SchemaModel;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse DDL text into a schema model.
///
/// Never fails and holds no state across calls: an unterminated span halts
/// parsing with a single fatal diagnostic, every other problem degrades to a
/// warning on a best-effort model.
pub fn parse_schema(input: &str) -> SchemaModel {
    let segments = match scan::scan(input) {
        Ok(segments) => segments,
        Err(e) => {
            return SchemaModel {
                diagnostics: vec![Diagnostic::fatal(
                    DiagKind::UnterminatedSpan,
                    LineRange::single(e.line()),
                    e.to_string(),
                )],
                ..Default::default()
            };
        }
    };
    let statements = split::split(&segments);
    tracing::debug!(statements = statements.len(), "split schema text");

    let mut enums = Vec::new();
    let mut tables = Vec::new();
    let mut pending = Vec::new();
    let mut diagnostics = Vec::new();

    for statement in &statements {
        let tokens = Lexer::new(&statement.text).tokenize();
        match (&tokens[0], tokens.get(1).unwrap_or(&Token::Eof)) {
            (Token::Create, Token::Table) => {
                if let Some(table) =
                    table::parse_create_table(&tokens, statement.lines, &mut diagnostics)
                {
                    tables.push(table);
                }
            }
            (Token::Create, Token::Type) => {
                if let Some(e) =
                    typedecl::parse_create_type(&tokens, statement.lines, &mut diagnostics)
                {
                    enums.push(e);
                }
            }
            (Token::Do, _) => {
                enums.extend(typedecl::parse_guarded_block(
                    &tokens,
                    statement.lines,
                    &mut diagnostics,
                ));
            }
            (Token::Alter, Token::Table) => {
                if let Some(p) =
                    table::parse_alter_table(&tokens, statement.lines, &mut diagnostics)
                {
                    pending.push(p);
                }
            }
            (Token::Create, Token::Unique) => {
                if let Some(p) =
                    table::parse_unique_index(&tokens, statement.lines, &mut diagnostics)
                {
                    pending.push(p);
                }
            }
            (Token::Create, Token::Index) => {} // plain indexes carry no model data
            (Token::Create, _) | (Token::Alter, _) => {} // other object kinds
            (Token::Eof, _) => {}
            (first, _) if is_auxiliary(first) => {}
            _ => {
                tracing::warn!(lines = %statement.lines, "skipping unrecognized statement");
                diagnostics.push(Diagnostic::warning(
                    DiagKind::MalformedStatement,
                    statement.lines,
                    format!(
                        "unrecognized statement: {}",
                        statement_head(&statement.text)
                    ),
                ));
            }
        }
    }

    resolver::resolve(enums, tables, pending, diagnostics)
}

/// Statements a schema dump routinely carries that hold no model
/// information. Skipped without a diagnostic; warning on each would bury the
/// diagnostics that matter.
fn is_auxiliary(first: &Token) -> bool {
    const AUX_WORDS: &[&str] = &[
        "SELECT",
        "INSERT",
        "COPY",
        "GRANT",
        "REVOKE",
        "COMMENT",
        "BEGIN",
        "COMMIT",
        "ROLLBACK",
        "START",
        "END",
        "DROP",
        "TRUNCATE",
        "VACUUM",
        "ANALYZE",
        "EXPLAIN",
        "LOCK",
        "RESET",
        "SHOW",
        "ABORT",
        "CLUSTER",
        "REINDEX",
        "REFRESH",
        "CALL",
        "NOTIFY",
        "LISTEN",
        "UNLISTEN",
        "PREPARE",
        "DEALLOCATE",
        "DISCARD",
        "SAVEPOINT",
        "RELEASE",
        "VALUES",
        "WITH",
    ];
    match first {
        Token::Set | Token::Delete | Token::Update | Token::Table => true,
        Token::Ident(s) => AUX_WORDS.iter().any(|w| s.eq_ignore_ascii_case(w)),
        _ => false,
    }
}

fn statement_head(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    let head: String = line.chars().take(60).collect();
    if head.len() < text.trim().len() {
        format!("{head}...")
    } else {
        head
    }
}

/// Parse DDL source and return the schema model as JSON.
#[wasm_bindgen(js_name = "parseSchema")]
pub fn parse_schema_json(source: &str) -> Result<String, String> {
    let model = parse_schema(source);
    serde_json::to_string(&model).map_err(|e| e.to_string())
}

/// Parse DDL source and return a plain structural dump of the model.
#[wasm_bindgen(js_name = "schemaDump")]
pub fn schema_dump(source: &str) -> String {
    dump::dump(&parse_schema(source))
}
