//! Table declaration parsing.
//!
//! Splits a `CREATE TABLE` body into items at top-level commas, classifies
//! each item as a column definition or a table-level constraint, and extracts
//! both. Also takes in the two statement shapes that attach constraints to a
//! table declared elsewhere: `ALTER TABLE ... ADD [CONSTRAINT ...]` and
//! `CREATE UNIQUE INDEX ... ON ...`.

use crate::diag::{DiagKind, Diagnostic, LineRange};
use crate::lexer::{Token, render_tokens};
use crate::model::{Column, Constraint, Table};

/// A constraint parsed from a statement that targets a table declared
/// elsewhere; attached during resolution so declaration order never matters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingConstraint {
    pub table: String,
    pub constraint: Constraint,
    pub lines: LineRange,
}

/// How a table body item begins, decided by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Column,
    TableConstraint,
    Unsupported,
}

fn classify_item(item: &[Token]) -> ItemKind {
    let mut i = 0;
    if item.first() == Some(&Token::Constraint) {
        i = 1;
        if item.get(i).is_some_and(|t| t.name().is_some()) {
            i = 2;
        }
    }
    match item.get(i) {
        Some(Token::Primary | Token::Foreign | Token::Unique | Token::Check) => {
            ItemKind::TableConstraint
        }
        Some(t) if t.is_word("like") || t.is_word("exclude") => ItemKind::Unsupported,
        Some(Token::Ident(_) | Token::Quoted(_)) if i == 0 => ItemKind::Column,
        _ => ItemKind::Unsupported,
    }
}

/// Parse a `CREATE TABLE` statement into a Table.
pub(crate) fn parse_create_table(
    tokens: &[Token],
    lines: LineRange,
    diags: &mut Vec<Diagnostic>,
) -> Option<Table> {
    let mut cur = Cursor::new(tokens);
    cur.eat(&Token::Create);
    cur.eat(&Token::Table);
    if cur.eat(&Token::If) {
        cur.eat(&Token::Not);
        cur.eat(&Token::Exists);
    }

    let Some((schema, name)) = cur.take_qualified_name() else {
        diags.push(Diagnostic::warning(
            DiagKind::MalformedStatement,
            lines,
            "CREATE TABLE without a table name",
        ));
        return None;
    };

    if !cur.eat(&Token::LParen) {
        diags.push(Diagnostic::warning(
            DiagKind::MalformedStatement,
            lines,
            format!("table {name} has no column list"),
        ));
        return None;
    }

    let items = split_body_items(&mut cur);
    // anything after the closing paren (WITH, TABLESPACE, ...) is storage
    // detail with no model counterpart

    let mut columns: Vec<Column> = Vec::new();
    let mut constraints: Vec<Constraint> = Vec::new();

    for item in &items {
        if item.is_empty() {
            continue;
        }
        match classify_item(item) {
            ItemKind::Column => {
                if let Some((column, inline)) = parse_column(item, &name, lines, diags) {
                    columns.push(column);
                    constraints.extend(inline);
                }
            }
            ItemKind::TableConstraint => {
                let mut item_cur = Cursor::new(item);
                let constraint_name = take_constraint_name(&mut item_cur);
                if let Some(constraint) =
                    parse_constraint_body(&mut item_cur, constraint_name, lines, diags)
                {
                    constraints.push(constraint);
                }
            }
            ItemKind::Unsupported => {
                let text = render_tokens(item);
                diags.push(Diagnostic::warning(
                    DiagKind::UnsupportedConstruct,
                    lines,
                    format!("table {name}: unsupported item kept as opaque text: {text}"),
                ));
                constraints.push(Constraint::Other { name: None, text });
            }
        }
    }

    // columns named by a table-level primary key are key columns too
    let pk_columns: Vec<String> = constraints
        .iter()
        .find_map(|c| match c {
            Constraint::PrimaryKey { columns, .. } => Some(columns.clone()),
            _ => None,
        })
        .unwrap_or_default();
    for column in &mut columns {
        if pk_columns.iter().any(|p| p.eq_ignore_ascii_case(&column.name)) {
            column.primary_key = true;
        }
    }

    // an inline PRIMARY KEY marker stands in for a table-level constraint
    if !constraints
        .iter()
        .any(|c| matches!(c, Constraint::PrimaryKey { .. }))
    {
        let inline_pk: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        if !inline_pk.is_empty() {
            constraints.insert(
                0,
                Constraint::PrimaryKey {
                    name: None,
                    columns: inline_pk,
                },
            );
        }
    }

    Some(Table {
        schema,
        name,
        columns,
        constraints,
        lines,
    })
}

/// Parse `ALTER TABLE ... ADD [CONSTRAINT name] <constraint>`. Every other
/// ALTER action carries no model information and returns None silently.
pub(crate) fn parse_alter_table(
    tokens: &[Token],
    lines: LineRange,
    diags: &mut Vec<Diagnostic>,
) -> Option<PendingConstraint> {
    let mut cur = Cursor::new(tokens);
    cur.eat(&Token::Alter);
    if !cur.eat(&Token::Table) {
        return None;
    }
    cur.eat(&Token::Only);
    if cur.eat(&Token::If) {
        cur.eat(&Token::Exists);
    }

    let (_, table) = cur.take_qualified_name()?;

    if !cur.eat(&Token::Add) {
        return None;
    }
    let name = take_constraint_name(&mut cur);
    match cur.current() {
        Token::Primary | Token::Foreign | Token::Unique | Token::Check => {
            let constraint = parse_constraint_body(&mut cur, name, lines, diags)?;
            Some(PendingConstraint {
                table,
                constraint,
                lines,
            })
        }
        _ if name.is_some() => {
            // named constraint of a kind we do not model
            let text = render_tokens(cur.rest());
            diags.push(Diagnostic::warning(
                DiagKind::UnsupportedConstruct,
                lines,
                format!("table {table}: unsupported constraint kept as opaque text: {text}"),
            ));
            Some(PendingConstraint {
                table,
                constraint: Constraint::Other { name, text },
                lines,
            })
        }
        _ => None, // ADD COLUMN and friends
    }
}

/// Parse `CREATE UNIQUE INDEX ... ON table (cols) [WHERE expr]` into a
/// pending Unique constraint. Expression indexes are skipped.
pub(crate) fn parse_unique_index(
    tokens: &[Token],
    lines: LineRange,
    _diags: &mut Vec<Diagnostic>,
) -> Option<PendingConstraint> {
    let mut cur = Cursor::new(tokens);
    cur.eat(&Token::Create);
    if !cur.eat(&Token::Unique) {
        return None;
    }
    if !cur.eat(&Token::Index) {
        return None;
    }
    if cur.current().is_word("concurrently") {
        cur.advance();
    }
    if cur.eat(&Token::If) {
        cur.eat(&Token::Not);
        cur.eat(&Token::Exists);
    }
    let name = cur.take_name(); // index name is optional
    if !cur.eat(&Token::On) {
        return None;
    }
    cur.eat(&Token::Only);
    let (_, table) = cur.take_qualified_name()?;
    if cur.current().is_word("using") {
        cur.advance();
        cur.advance(); // access method
    }
    if *cur.current() != Token::LParen {
        return None;
    }

    let key = cur.collect_parenthesized_inner();
    let mut columns = Vec::new();
    for element in split_at_top_level_commas(&key) {
        // simple column keys only; an expression key has no column to anchor
        let mut names = element.iter().filter_map(|t| t.name());
        let first = names.next()?;
        if element[0].name() != Some(first)
            || element[1..]
                .iter()
                .any(|t| !matches!(t, Token::Ident(_)))
        {
            return None;
        }
        columns.push(first.to_string());
    }
    if columns.is_empty() {
        return None;
    }

    let mut partial_where = None;
    loop {
        match cur.current() {
            Token::Where => {
                cur.advance();
                partial_where = Some(render_tokens(cur.rest()));
                break;
            }
            Token::LParen => cur.skip_parenthesized(),
            Token::Eof => break,
            _ => cur.advance(),
        }
    }

    Some(PendingConstraint {
        table,
        constraint: Constraint::Unique {
            name,
            columns,
            partial_where,
        },
        lines,
    })
}

fn take_constraint_name(cur: &mut Cursor) -> Option<String> {
    if cur.eat(&Token::Constraint) {
        cur.take_name()
    } else {
        None
    }
}

/// Parse a constraint starting at its keyword (PRIMARY/FOREIGN/UNIQUE/CHECK).
fn parse_constraint_body(
    cur: &mut Cursor,
    name: Option<String>,
    lines: LineRange,
    diags: &mut Vec<Diagnostic>,
) -> Option<Constraint> {
    match cur.current().clone() {
        Token::Primary => {
            cur.advance();
            cur.eat(&Token::Key);
            let columns = cur.parse_column_list();
            if columns.is_empty() {
                diags.push(Diagnostic::warning(
                    DiagKind::MalformedStatement,
                    lines,
                    "PRIMARY KEY constraint without columns",
                ));
                return None;
            }
            Some(Constraint::PrimaryKey { name, columns })
        }
        Token::Foreign => {
            cur.advance();
            cur.eat(&Token::Key);
            let columns = cur.parse_column_list();
            if !cur.eat(&Token::References) {
                diags.push(Diagnostic::warning(
                    DiagKind::MalformedStatement,
                    lines,
                    "FOREIGN KEY constraint without REFERENCES clause",
                ));
                return None;
            }
            let (_, target) = cur.take_qualified_name()?;
            let target_columns = cur.parse_column_list();
            let (on_delete, on_update) = parse_ref_actions(cur);
            Some(Constraint::ForeignKey {
                name,
                columns,
                target,
                target_columns,
                on_delete,
                on_update,
            })
        }
        Token::Unique => {
            cur.advance();
            let columns = cur.parse_column_list();
            let partial_where = if cur.eat(&Token::Where) {
                Some(render_tokens(cur.rest()))
            } else {
                None
            };
            Some(Constraint::Unique {
                name,
                columns,
                partial_where,
            })
        }
        Token::Check => {
            cur.advance();
            if *cur.current() != Token::LParen {
                diags.push(Diagnostic::warning(
                    DiagKind::MalformedStatement,
                    lines,
                    "CHECK constraint without a parenthesized expression",
                ));
                return None;
            }
            let expression = render_tokens(&cur.collect_parenthesized_inner());
            Some(Constraint::Check { name, expression })
        }
        _ => None,
    }
}

/// `ON DELETE <action>` / `ON UPDATE <action>` pairs, in either order.
fn parse_ref_actions(cur: &mut Cursor) -> (Option<String>, Option<String>) {
    let mut on_delete = None;
    let mut on_update = None;
    while cur.eat(&Token::On) {
        let is_delete = match cur.current() {
            Token::Delete => {
                cur.advance();
                true
            }
            Token::Update => {
                cur.advance();
                false
            }
            _ => break,
        };
        let action = match cur.current() {
            Token::Cascade => {
                cur.advance();
                Some("CASCADE".to_string())
            }
            Token::Restrict => {
                cur.advance();
                Some("RESTRICT".to_string())
            }
            Token::Set => {
                cur.advance();
                match cur.current() {
                    Token::Null => {
                        cur.advance();
                        Some("SET NULL".to_string())
                    }
                    Token::Default => {
                        cur.advance();
                        Some("SET DEFAULT".to_string())
                    }
                    _ => None,
                }
            }
            Token::No => {
                cur.advance();
                if cur.eat(&Token::Action) {
                    Some("NO ACTION".to_string())
                } else {
                    None
                }
            }
            _ => None,
        };
        match (is_delete, action) {
            (true, Some(action)) => on_delete = Some(action),
            (false, Some(action)) => on_update = Some(action),
            (_, None) => break,
        }
    }
    (on_delete, on_update)
}

/// Parse one column definition item: name, raw type text, inline modifiers.
/// Inline UNIQUE / CHECK / REFERENCES become table constraints over this
/// single column.
fn parse_column(
    item: &[Token],
    table: &str,
    lines: LineRange,
    diags: &mut Vec<Diagnostic>,
) -> Option<(Column, Vec<Constraint>)> {
    let mut cur = Cursor::new(item);
    let name = cur.take_name()?;

    // raw type: words, parameters, array suffix
    let mut type_tokens: Vec<Token> = Vec::new();
    let mut depth = 0u32;
    loop {
        match cur.current() {
            Token::Ident(_) | Token::Quoted(_) | Token::Num(_) => {
                type_tokens.push(cur.current().clone());
                cur.advance();
            }
            Token::LParen => {
                depth += 1;
                type_tokens.push(Token::LParen);
                cur.advance();
            }
            Token::RParen if depth > 0 => {
                depth -= 1;
                type_tokens.push(Token::RParen);
                cur.advance();
            }
            Token::Comma if depth > 0 => {
                type_tokens.push(Token::Comma);
                cur.advance();
            }
            Token::LBracket => {
                type_tokens.push(Token::LBracket);
                cur.advance();
            }
            Token::RBracket => {
                type_tokens.push(Token::RBracket);
                cur.advance();
            }
            _ => break,
        }
    }
    if type_tokens.is_empty() {
        diags.push(Diagnostic::warning(
            DiagKind::MalformedStatement,
            lines,
            format!("table {table}: column {name} has no type"),
        ));
        return None;
    }
    let declared_type = type_text(&type_tokens);

    let mut nullable = true;
    let mut primary_key = false;
    let mut default = None;
    let mut inline: Vec<Constraint> = Vec::new();
    let mut pending_name: Option<String> = None;

    loop {
        match cur.current().clone() {
            Token::Not => {
                cur.advance();
                if cur.eat(&Token::Null) {
                    nullable = false;
                }
            }
            Token::Null => {
                cur.advance();
            }
            Token::Primary => {
                cur.advance();
                cur.eat(&Token::Key);
                primary_key = true;
                nullable = false;
            }
            Token::Unique => {
                cur.advance();
                inline.push(Constraint::Unique {
                    name: pending_name.take(),
                    columns: vec![name.clone()],
                    partial_where: None,
                });
            }
            Token::Default => {
                cur.advance();
                default = Some(collect_default(&mut cur));
            }
            Token::References => {
                cur.advance();
                let Some((_, target)) = cur.take_qualified_name() else {
                    diags.push(Diagnostic::warning(
                        DiagKind::MalformedStatement,
                        lines,
                        format!("table {table}: column {name} REFERENCES without a target"),
                    ));
                    break;
                };
                let target_columns = cur.parse_column_list();
                let (on_delete, on_update) = parse_ref_actions(&mut cur);
                inline.push(Constraint::ForeignKey {
                    name: pending_name.take(),
                    columns: vec![name.clone()],
                    target,
                    target_columns,
                    on_delete,
                    on_update,
                });
            }
            Token::Check => {
                cur.advance();
                if *cur.current() == Token::LParen {
                    let expression = render_tokens(&cur.collect_parenthesized_inner());
                    inline.push(Constraint::Check {
                        name: pending_name.take(),
                        expression,
                    });
                }
            }
            Token::Constraint => {
                cur.advance();
                pending_name = cur.take_name();
            }
            Token::LParen => cur.skip_parenthesized(),
            Token::Eof => break,
            _ => cur.advance(), // COLLATE, GENERATED, storage words
        }
    }

    Some((
        Column {
            name,
            declared_type,
            nullable,
            default,
            primary_key,
        },
        inline,
    ))
}

/// Default expressions run to the next modifier keyword at depth zero; the
/// text is opaque and never evaluated.
fn collect_default(cur: &mut Cursor) -> String {
    let mut tokens: Vec<Token> = Vec::new();
    loop {
        match cur.current() {
            Token::Eof
            | Token::Not
            | Token::Unique
            | Token::Primary
            | Token::References
            | Token::Check
            | Token::Constraint => break,
            Token::LParen => tokens.extend(cur.collect_parenthesized()),
            _ => {
                tokens.push(cur.current().clone());
                cur.advance();
            }
        }
    }
    render_tokens(&tokens)
}

/// Render raw type tokens: spaces between words, parameters and array
/// brackets attached.
fn type_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev_word = false;
    for token in tokens {
        let word = matches!(token, Token::Ident(_) | Token::Quoted(_) | Token::Num(_));
        if word && prev_word {
            out.push(' ');
        }
        out.push_str(&token.sql());
        prev_word = word;
    }
    out
}

/// Split a CREATE TABLE body into items at depth-zero commas; the cursor ends
/// past the body's closing paren.
fn split_body_items(cur: &mut Cursor) -> Vec<Vec<Token>> {
    let mut items = Vec::new();
    let mut item: Vec<Token> = Vec::new();
    let mut depth = 0u32;
    loop {
        match cur.current() {
            Token::Eof => {
                if !item.is_empty() {
                    items.push(item);
                }
                break;
            }
            Token::LParen => {
                depth += 1;
                item.push(Token::LParen);
                cur.advance();
            }
            Token::RParen => {
                if depth == 0 {
                    cur.advance();
                    if !item.is_empty() {
                        items.push(item);
                    }
                    break;
                }
                depth -= 1;
                item.push(Token::RParen);
                cur.advance();
            }
            Token::Comma if depth == 0 => {
                cur.advance();
                items.push(std::mem::take(&mut item));
            }
            t => {
                item.push(t.clone());
                cur.advance();
            }
        }
    }
    items
}

fn split_at_top_level_commas(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut out = Vec::new();
    let mut element: Vec<Token> = Vec::new();
    let mut depth = 0u32;
    for token in tokens {
        match token {
            Token::LParen => {
                depth += 1;
                element.push(token.clone());
            }
            Token::RParen => {
                depth = depth.saturating_sub(1);
                element.push(token.clone());
            }
            Token::Comma if depth == 0 => out.push(std::mem::take(&mut element)),
            t => element.push(t.clone()),
        }
    }
    if !element.is_empty() {
        out.push(element);
    }
    out
}

/// Token cursor shared by the declaration parsers.
struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn rest(&self) -> &[Token] {
        let end = self
            .tokens
            .iter()
            .position(|t| *t == Token::Eof)
            .unwrap_or(self.tokens.len());
        &self.tokens[self.pos.min(end)..end]
    }

    /// Take an identifier-like token.
    fn take_name(&mut self) -> Option<String> {
        let name = self.current().name()?.to_string();
        self.advance();
        Some(name)
    }

    /// Take `[schema.]name`, returning (schema, name).
    fn take_qualified_name(&mut self) -> Option<(Option<String>, String)> {
        let first = self.take_name()?;
        if *self.current() == Token::Dot {
            self.advance();
            let second = self.take_name()?;
            Some((Some(first), second))
        } else {
            Some((None, first))
        }
    }

    /// `(a, b, c)` as names in order; an absent list is empty. Non-name
    /// tokens inside the list are skipped.
    fn parse_column_list(&mut self) -> Vec<String> {
        let mut columns = Vec::new();
        if !self.eat(&Token::LParen) {
            return columns;
        }
        let mut depth = 0u32;
        loop {
            match self.current() {
                Token::Eof => break,
                Token::RParen => {
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                    depth -= 1;
                    self.advance();
                }
                Token::LParen => {
                    depth += 1;
                    self.advance();
                }
                Token::Ident(_) | Token::Quoted(_) if depth == 0 => {
                    if let Some(name) = self.take_name() {
                        columns.push(name);
                    }
                }
                _ => self.advance(),
            }
        }
        columns
    }

    /// Consume a balanced parenthesized group, returning it with parens.
    fn collect_parenthesized(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        if *self.current() != Token::LParen {
            return tokens;
        }
        tokens.push(Token::LParen);
        self.advance();
        let mut depth = 1u32;
        loop {
            match self.current() {
                Token::Eof => break,
                Token::LParen => {
                    depth += 1;
                    tokens.push(Token::LParen);
                    self.advance();
                }
                Token::RParen => {
                    depth -= 1;
                    tokens.push(Token::RParen);
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                }
                t => {
                    tokens.push(t.clone());
                    self.advance();
                }
            }
        }
        tokens
    }

    /// Like collect_parenthesized, without the outermost parens.
    fn collect_parenthesized_inner(&mut self) -> Vec<Token> {
        let mut tokens = self.collect_parenthesized();
        if tokens.first() == Some(&Token::LParen) {
            tokens.remove(0);
        }
        if tokens.last() == Some(&Token::RParen) {
            tokens.pop();
        }
        tokens
    }

    fn skip_parenthesized(&mut self) {
        let _ = self.collect_parenthesized();
    }
}
